//! Retention of finished jobs.

use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use shortgen_queue::JobStore;

/// Remove finished jobs not updated for longer than `max_age`, along with
/// their result folders. Returns how many jobs were removed.
pub async fn cleanup_old_jobs(store: &JobStore, results_dir: &Path, max_age: Duration) -> usize {
    let max_age = chrono::Duration::from_std(max_age).unwrap_or_else(|_| chrono::Duration::days(36_500));
    let removed = store.remove_older_than(max_age).await;

    for record in &removed {
        let dir = results_dir.join(record.job_id.as_str());
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(job_id = %record.job_id, "Failed to remove {}: {}", dir.display(), e),
        }
    }

    if !removed.is_empty() {
        info!("Cleaned up {} old jobs", removed.len());
    }
    removed.len()
}
