//! Job folder persistence: `metadata.json` and `transcript.txt`.

use std::path::{Path, PathBuf};

use shortgen_models::JobMetadata;

use crate::error::WorkerResult;

pub const METADATA_FILE: &str = "metadata.json";
pub const TRANSCRIPT_FILE: &str = "transcript.txt";

/// Write `metadata.json` into `job_dir`, replacing any previous version.
pub async fn write_metadata(job_dir: &Path, metadata: &JobMetadata) -> WorkerResult<PathBuf> {
    let path = job_dir.join(METADATA_FILE);
    let tmp = job_dir.join(format!("{}.tmp", METADATA_FILE));
    let json = serde_json::to_vec_pretty(metadata)?;

    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, &path).await?;
    Ok(path)
}

pub async fn read_metadata(job_dir: &Path) -> WorkerResult<JobMetadata> {
    let bytes = tokio::fs::read(job_dir.join(METADATA_FILE)).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub async fn write_transcript(job_dir: &Path, transcript: &str) -> WorkerResult<PathBuf> {
    let path = job_dir.join(TRANSCRIPT_FILE);
    tokio::fs::write(&path, transcript).await?;
    Ok(path)
}
