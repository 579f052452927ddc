//! Job executor.
//!
//! [`JobExecutor::run`] pulls jobs off the queue and runs each one as its own
//! task, at most `max_concurrent_jobs` at a time. The [`ExecutorHandle`] it
//! hands out submits, cancels and stops.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{watch, Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use shortgen_models::{HighlightJob, JobId, JobRecord, JobStatus};
use shortgen_queue::{JobQueue, JobReceiver, JobStore, ProgressChannel};

use crate::error::{WorkerError, WorkerResult};
use crate::metrics;
use crate::processor::{process_job, ProcessingContext};

/// Time a job gets to stop after its cancel signal fires.
const CANCEL_GRACE: Duration = Duration::from_secs(10);

type CancelMap = Arc<Mutex<HashMap<JobId, Arc<watch::Sender<bool>>>>>;

/// Submits, cancels and stops jobs of a running [`JobExecutor`].
#[derive(Clone)]
pub struct ExecutorHandle {
    queue: JobQueue,
    store: JobStore,
    progress: ProgressChannel,
    cancels: CancelMap,
    shutdown: Arc<watch::Sender<bool>>,
}

impl ExecutorHandle {
    /// Record and enqueue a job.
    ///
    /// The record is dropped again when the queue rejects the job, so a
    /// duplicate submission leaves only the original behind.
    pub async fn submit(&self, job: HighlightJob) -> WorkerResult<JobId> {
        let job_id = job.id.clone();
        self.store
            .insert(JobRecord::new(job_id.clone(), job.video_file_name()))
            .await?;

        match self.queue.enqueue(job).await {
            Ok(id) => {
                metrics::record_job_enqueued();
                self.progress.log(&id, "Job queued");
                Ok(id)
            }
            Err(e) => {
                self.store.remove(&job_id).await;
                Err(e.into())
            }
        }
    }

    /// Cancel a queued or processing job.
    ///
    /// A queued job is marked cancelled immediately. A processing job is
    /// signalled and marked cancelled once its pipeline stops.
    pub async fn cancel(&self, job_id: &JobId) -> WorkerResult<()> {
        let signalled = match self.cancels.lock().await.get(job_id) {
            Some(tx) => {
                tx.send_replace(true);
                true
            }
            None => false,
        };

        match self
            .store
            .transition(job_id, JobStatus::Queued, JobStatus::Cancelled)
            .await
        {
            Ok(_) => {
                info!(job_id = %job_id, "Cancelled queued job");
                metrics::record_job_cancelled();
                self.progress.error(job_id, "Job was cancelled");
                Ok(())
            }
            Err(_) if signalled => {
                info!(job_id = %job_id, "Cancellation requested");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Ask the executor to stop taking jobs and wind down.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    pub fn progress(&self) -> &ProgressChannel {
        &self.progress
    }
}

/// Job executor that processes jobs from the queue.
pub struct JobExecutor {
    ctx: Arc<ProcessingContext>,
    queue: JobQueue,
    receiver: JobReceiver,
    job_semaphore: Arc<Semaphore>,
    shutdown: Arc<watch::Sender<bool>>,
    cancels: CancelMap,
    in_flight: Arc<AtomicUsize>,
}

impl JobExecutor {
    /// Create an executor with its own queue sized from the config.
    pub fn new(ctx: ProcessingContext) -> Self {
        let (queue, receiver) = JobQueue::new(ctx.config.queue_capacity);
        let job_semaphore = Arc::new(Semaphore::new(ctx.config.max_concurrent_jobs.max(1)));
        let (shutdown, _) = watch::channel(false);

        Self {
            ctx: Arc::new(ctx),
            queue,
            receiver,
            job_semaphore,
            shutdown: Arc::new(shutdown),
            cancels: Arc::new(Mutex::new(HashMap::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn handle(&self) -> ExecutorHandle {
        ExecutorHandle {
            queue: self.queue.clone(),
            store: self.ctx.store.clone(),
            progress: self.ctx.progress.clone(),
            cancels: Arc::clone(&self.cancels),
            shutdown: Arc::clone(&self.shutdown),
        }
    }

    /// Run until shutdown is requested.
    ///
    /// Jobs still queued at shutdown are cancelled. In-flight jobs get the
    /// shutdown timeout to finish before they are cancelled too.
    pub async fn run(mut self) -> WorkerResult<()> {
        info!(
            "Starting job executor with {} max concurrent jobs",
            self.ctx.config.max_concurrent_jobs
        );

        let mut shutdown_rx = self.shutdown.subscribe();
        let mut tasks = JoinSet::new();

        loop {
            let permit = tokio::select! {
                biased;
                _ = stopped(&mut shutdown_rx) => break,
                permit = Arc::clone(&self.job_semaphore).acquire_owned() => {
                    permit.map_err(|_| WorkerError::job_failed("Semaphore closed"))?
                }
            };

            let job = tokio::select! {
                biased;
                _ = stopped(&mut shutdown_rx) => break,
                job = self.receiver.recv() => match job {
                    Some(job) => job,
                    None => break,
                },
            };

            while let Some(joined) = tasks.try_join_next() {
                Self::log_join(joined);
            }

            let (cancel_tx, cancel_rx) = watch::channel(false);
            let cancel_tx = Arc::new(cancel_tx);
            self.cancels
                .lock()
                .await
                .insert(job.id.clone(), Arc::clone(&cancel_tx));

            debug!(job_id = %job.id, "Dispatching job");
            tasks.spawn(Self::execute_job(
                Arc::clone(&self.ctx),
                self.queue.clone(),
                Arc::clone(&self.cancels),
                Arc::clone(&self.in_flight),
                job,
                cancel_tx,
                cancel_rx,
                permit,
            ));
        }

        info!("Shutdown signal received, stopping executor");
        self.receiver.close();
        while let Some(job) = self.receiver.recv().await {
            self.drop_queued(job).await;
        }

        info!("Waiting for {} in-flight jobs to complete...", tasks.len());
        let drained = tokio::time::timeout(self.ctx.config.shutdown_timeout, async {
            while let Some(joined) = tasks.join_next().await {
                Self::log_join(joined);
            }
        })
        .await;

        if drained.is_err() {
            warn!("Shutdown timeout reached, cancelling {} jobs", tasks.len());
            for tx in self.cancels.lock().await.values() {
                tx.send_replace(true);
            }
            let stopped = tokio::time::timeout(CANCEL_GRACE, async {
                while let Some(joined) = tasks.join_next().await {
                    Self::log_join(joined);
                }
            })
            .await;
            if stopped.is_err() {
                error!("Aborting {} jobs that ignored cancellation", tasks.len());
                tasks.abort_all();
            }
        }

        info!("Job executor stopped");
        Ok(())
    }

    /// Cancel a job that was still queued at shutdown.
    async fn drop_queued(&self, job: HighlightJob) {
        let store = &self.ctx.store;
        if store
            .transition(&job.id, JobStatus::Queued, JobStatus::Cancelled)
            .await
            .is_ok()
        {
            metrics::record_job_cancelled();
            self.ctx.progress.error(&job.id, "Worker shutting down");
        }
        self.queue.release(&job).await;
    }

    #[allow(clippy::too_many_arguments)]
    async fn execute_job(
        ctx: Arc<ProcessingContext>,
        queue: JobQueue,
        cancels: CancelMap,
        in_flight: Arc<AtomicUsize>,
        job: HighlightJob,
        cancel_tx: Arc<watch::Sender<bool>>,
        cancel_rx: watch::Receiver<bool>,
        permit: OwnedSemaphorePermit,
    ) {
        let _permit = permit;
        let job_id = job.id.clone();

        match ctx
            .store
            .transition(&job_id, JobStatus::Queued, JobStatus::Processing)
            .await
        {
            Ok(_) => {
                metrics::set_jobs_in_flight(in_flight.fetch_add(1, Ordering::SeqCst) + 1);
                info!(job_id = %job_id, "Executing job");
                Self::run_job(&ctx, &job, &cancel_tx, &cancel_rx).await;
                metrics::set_jobs_in_flight(in_flight.fetch_sub(1, Ordering::SeqCst) - 1);
            }
            Err(e) => info!(job_id = %job_id, "Skipping job: {}", e),
        }

        cancels.lock().await.remove(&job_id);
        queue.release(&job).await;
    }

    /// Run the pipeline under the job timeout and record the outcome.
    async fn run_job(
        ctx: &ProcessingContext,
        job: &HighlightJob,
        cancel_tx: &watch::Sender<bool>,
        cancel_rx: &watch::Receiver<bool>,
    ) {
        let job_id = &job.id;
        let started = Instant::now();
        let timeout = ctx.config.job_timeout;

        let run = process_job(ctx, job, cancel_rx);
        tokio::pin!(run);
        let result = tokio::select! {
            result = &mut run => result,
            _ = tokio::time::sleep(timeout) => {
                warn!(job_id = %job_id, "Job timed out after {:?}", timeout);
                cancel_tx.send_replace(true);
                if tokio::time::timeout(CANCEL_GRACE, &mut run).await.is_err() {
                    warn!(job_id = %job_id, "Job did not stop after timeout");
                }
                Err(WorkerError::Timeout(timeout.as_secs()))
            }
        };

        match result {
            Ok(output) => {
                let clips = output.result_files.len();
                match ctx
                    .store
                    .complete(job_id, output.result_files, output.metadata.highlights)
                    .await
                {
                    Ok(_) => {
                        metrics::record_job_completed(started.elapsed().as_secs_f64());
                        ctx.progress.done(job_id, clips);
                    }
                    Err(e) => error!(job_id = %job_id, "Failed to record completion: {}", e),
                }
            }
            Err(e) if e.is_cancellation() => {
                info!(job_id = %job_id, "Job cancelled");
                if let Err(e) = ctx.store.cancel(job_id).await {
                    warn!(job_id = %job_id, "Failed to record cancellation: {}", e);
                }
                metrics::record_job_cancelled();
                ctx.progress.error(job_id, "Job was cancelled");
            }
            Err(e) => {
                error!(job_id = %job_id, "Job failed: {}", e);
                if let Err(store_err) = ctx.store.fail(job_id, e.to_string()).await {
                    warn!(job_id = %job_id, "Failed to record failure: {}", store_err);
                }
                metrics::record_job_failed(failure_reason(&e));
                ctx.progress.error(job_id, e.to_string());
            }
        }
    }

    fn log_join(joined: Result<(), tokio::task::JoinError>) {
        if let Err(e) = joined {
            if e.is_panic() {
                error!("Job task panicked: {}", e);
            }
        }
    }
}

/// Resolves once shutdown is requested.
async fn stopped(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

/// Low-cardinality label for the failure metric.
fn failure_reason(err: &WorkerError) -> &'static str {
    match err {
        WorkerError::Timeout(_) => "timeout",
        WorkerError::Media(_) => "media",
        WorkerError::TranscriptionFailed(_) => "transcription",
        WorkerError::SceneAnalysisFailed(_) => "scene_analysis",
        WorkerError::UploadFailed(_) | WorkerError::UploadRejected(_) => "upload",
        WorkerError::Io(_) | WorkerError::Json(_) => "io",
        _ => "processing",
    }
}
