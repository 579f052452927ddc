//! Highlight generator binary.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{error, info, warn};

use shortgen_models::{DurationBounds, JobStatus};
use shortgen_queue::{JobStore, ProgressChannel, ProgressKind};
use shortgen_worker::{
    cleanup_old_jobs, init_tracing, metrics, Collaborators, JobExecutor, ProcessingContext,
    WorkerConfig,
};

/// Cut short highlight clips out of long videos.
#[derive(Debug, Parser)]
#[command(name = "shortgen", version)]
struct Cli {
    /// Videos to process
    #[arg(required = true)]
    videos: Vec<PathBuf>,

    /// Highlights per video
    #[arg(long)]
    highlights: Option<usize>,

    /// Minimum clip length in seconds
    #[arg(long)]
    min_duration: Option<f64>,

    /// Maximum clip length in seconds
    #[arg(long)]
    max_duration: Option<f64>,

    /// Upload clips to YouTube (requires YOUTUBE_ACCESS_TOKEN)
    #[arg(long)]
    upload: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    dotenvy::dotenv().ok();

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    init_tracing(use_json).context("failed to initialise tracing")?;

    let cli = Cli::parse();

    let mut config = WorkerConfig::from_env();
    if let Some(n) = cli.highlights {
        config.num_highlights = n;
    }
    if cli.min_duration.is_some() || cli.max_duration.is_some() {
        config.duration_bounds = DurationBounds::new(
            cli.min_duration.unwrap_or(config.duration_bounds.min),
            cli.max_duration.unwrap_or(config.duration_bounds.max),
        );
    }
    config.validate().context("invalid configuration")?;
    if cli.upload && !config.youtube.is_enabled() {
        bail!("--upload requires YOUTUBE_ACCESS_TOKEN");
    }
    info!("Worker config: {:?}", config);

    if let Some(addr) = &config.metrics_addr {
        metrics::init_metrics(addr)?;
        info!("Serving metrics on {}", addr);
    }

    tokio::fs::create_dir_all(&config.results_dir)
        .await
        .with_context(|| format!("failed to create {}", config.results_dir.display()))?;

    let collaborators = Collaborators::from_config(&config)?;
    let store = JobStore::new();
    let progress = ProgressChannel::default();
    let executor = JobExecutor::new(ProcessingContext::new(
        config.clone(),
        store.clone(),
        progress.clone(),
        collaborators,
    ));
    let handle = executor.handle();
    let mut events = progress.subscribe();
    let mut executor_task = tokio::spawn(executor.run());

    let cleanup_store = store.clone();
    let results_dir = config.results_dir.clone();
    let retention = config.job_retention;
    let cleanup_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(3600));
        loop {
            interval.tick().await;
            cleanup_old_jobs(&cleanup_store, &results_dir, retention).await;
        }
    });

    let mut pending = HashSet::new();
    for video in &cli.videos {
        let job = config.job_for(video).with_upload(cli.upload);
        match handle.submit(job).await {
            Ok(job_id) => {
                info!(job_id = %job_id, "Submitted {}", video.display());
                pending.insert(job_id);
            }
            Err(e) => error!("Could not submit {}: {}", video.display(), e),
        }
    }

    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received shutdown signal");
            shutdown_handle.shutdown();
        }
    });

    let mut finished_early = None;
    while !pending.is_empty() {
        let received = tokio::select! {
            received = events.recv() => received,
            joined = &mut executor_task => {
                finished_early = Some(joined);
                break;
            }
        };
        let event = match received {
            Ok(event) => event,
            Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                warn!("Missed {} progress events", n);
                continue;
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        };
        match &event.kind {
            ProgressKind::Progress { value } => info!(job_id = %event.job_id, "{}%", value),
            ProgressKind::HighlightCut { index, total, filename } => {
                info!(job_id = %event.job_id, "Cut {} ({}/{})", filename, index + 1, total)
            }
            ProgressKind::Done { clips } => info!(job_id = %event.job_id, "Done, {} clips", clips),
            ProgressKind::Error { message } => error!(job_id = %event.job_id, "{}", message),
            ProgressKind::Log { .. } => {}
        }
        if event.is_final() {
            pending.remove(&event.job_id);
        }
    }

    handle.shutdown();
    let joined = match finished_early {
        Some(joined) => joined,
        None => executor_task.await,
    };
    joined.context("executor task panicked")??;
    cleanup_task.abort();

    let mut completed = 0;
    for record in store.list().await {
        match record.status {
            JobStatus::Complete => {
                completed += 1;
                println!("{} -> {} clips", record.video_name, record.result_files.len());
                for file in &record.result_files {
                    println!("  {}", file.display());
                }
            }
            status => {
                println!(
                    "{} -> {}: {}",
                    record.video_name,
                    status,
                    record.error_message.as_deref().unwrap_or("")
                );
            }
        }
    }

    if completed < cli.videos.len() {
        bail!(
            "{} of {} jobs did not complete",
            cli.videos.len() - completed,
            cli.videos.len()
        );
    }
    Ok(())
}
