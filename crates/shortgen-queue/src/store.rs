//! Concurrent job status store.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Duration;
use shortgen_models::{HighlightMetadata, JobId, JobRecord, JobStatus};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{QueueError, QueueResult};

/// Shared map of job records.
///
/// Every mutation happens under the write lock, so a status check and the
/// change it guards are atomic.
#[derive(Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<JobId, JobRecord>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new record.
    pub async fn insert(&self, record: JobRecord) -> QueueResult<()> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&record.job_id) {
            return Err(QueueError::JobExists(record.job_id));
        }
        debug!(job_id = %record.job_id, "Registered job record");
        jobs.insert(record.job_id.clone(), record);
        Ok(())
    }

    pub async fn get(&self, job_id: &JobId) -> Option<JobRecord> {
        self.jobs.read().await.get(job_id).cloned()
    }

    /// All records, oldest first.
    pub async fn list(&self) -> Vec<JobRecord> {
        let mut records: Vec<JobRecord> = self.jobs.read().await.values().cloned().collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        records
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Record progress of a processing job. Progress never decreases.
    pub async fn update_progress(
        &self,
        job_id: &JobId,
        progress: u8,
        step: Option<String>,
    ) -> QueueResult<JobRecord> {
        self.modify(job_id, |record| {
            if record.status != JobStatus::Processing {
                return Err(QueueError::invalid_transition(
                    job_id,
                    record.status,
                    JobStatus::Processing,
                ));
            }
            record.set_progress(progress, step);
            Ok(())
        })
        .await
    }

    /// Move `job_id` from `expected` to `next`.
    ///
    /// Fails when the current status is not `expected` or the edge is not
    /// legal, leaving the record untouched.
    pub async fn transition(
        &self,
        job_id: &JobId,
        expected: JobStatus,
        next: JobStatus,
    ) -> QueueResult<JobRecord> {
        self.modify(job_id, |record| {
            if record.status != expected || !expected.can_transition_to(next) {
                return Err(QueueError::invalid_transition(job_id, record.status, next));
            }
            match next {
                JobStatus::Cancelled => record.cancel(),
                status => record.set_status(status),
            }
            Ok(())
        })
        .await
    }

    /// Mark a processing job complete with its outputs.
    pub async fn complete(
        &self,
        job_id: &JobId,
        result_files: Vec<PathBuf>,
        metadata: Vec<HighlightMetadata>,
    ) -> QueueResult<JobRecord> {
        let record = self
            .modify(job_id, |record| {
                if !record.status.can_transition_to(JobStatus::Complete) {
                    return Err(QueueError::invalid_transition(
                        job_id,
                        record.status,
                        JobStatus::Complete,
                    ));
                }
                record.complete(result_files, metadata);
                Ok(())
            })
            .await?;
        info!(job_id = %job_id, "Job complete");
        Ok(record)
    }

    /// Mark a queued or processing job failed.
    pub async fn fail(&self, job_id: &JobId, error: impl Into<String>) -> QueueResult<JobRecord> {
        let error = error.into();
        self.modify(job_id, |record| {
            if !record.status.can_transition_to(JobStatus::Failed) {
                return Err(QueueError::invalid_transition(
                    job_id,
                    record.status,
                    JobStatus::Failed,
                ));
            }
            record.fail(error);
            Ok(())
        })
        .await
    }

    /// Mark a queued or processing job cancelled.
    pub async fn cancel(&self, job_id: &JobId) -> QueueResult<JobRecord> {
        self.modify(job_id, |record| {
            if !record.status.can_transition_to(JobStatus::Cancelled) {
                return Err(QueueError::invalid_transition(
                    job_id,
                    record.status,
                    JobStatus::Cancelled,
                ));
            }
            record.cancel();
            Ok(())
        })
        .await
    }

    pub async fn remove(&self, job_id: &JobId) -> Option<JobRecord> {
        self.jobs.write().await.remove(job_id)
    }

    /// Remove terminal records not updated for longer than `max_age`.
    ///
    /// Active jobs are never removed.
    pub async fn remove_older_than(&self, max_age: Duration) -> Vec<JobRecord> {
        let mut jobs = self.jobs.write().await;
        let expired: Vec<JobId> = jobs
            .values()
            .filter(|r| r.is_terminal() && r.is_older_than(max_age))
            .map(|r| r.job_id.clone())
            .collect();

        expired
            .iter()
            .filter_map(|id| jobs.remove(id))
            .collect()
    }

    async fn modify<F>(&self, job_id: &JobId, f: F) -> QueueResult<JobRecord>
    where
        F: FnOnce(&mut JobRecord) -> QueueResult<()>,
    {
        let mut jobs = self.jobs.write().await;
        let record = jobs
            .get_mut(job_id)
            .ok_or_else(|| QueueError::JobNotFound(job_id.clone()))?;
        f(record)?;
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with(id: &str) -> (JobStore, JobId) {
        let store = JobStore::new();
        let job_id = JobId::from_string(id);
        store
            .insert(JobRecord::new(job_id.clone(), "video.mp4"))
            .await
            .unwrap();
        (store, job_id)
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let (store, id) = store_with("job-1").await;
        let err = store.insert(JobRecord::new(id, "other.mp4")).await.unwrap_err();
        assert!(matches!(err, QueueError::JobExists(_)));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_happy_path() {
        let (store, id) = store_with("job-1").await;
        store
            .transition(&id, JobStatus::Queued, JobStatus::Processing)
            .await
            .unwrap();
        let rec = store
            .update_progress(&id, 40, Some("Transcribing".into()))
            .await
            .unwrap();
        assert_eq!(rec.progress, 40);

        let rec = store
            .complete(&id, vec![PathBuf::from("highlight_1.mp4")], Vec::new())
            .await
            .unwrap();
        assert_eq!(rec.status, JobStatus::Complete);
        assert_eq!(rec.progress, 100);
    }

    #[tokio::test]
    async fn test_transition_is_compare_and_set() {
        let (store, id) = store_with("job-1").await;
        let err = store
            .transition(&id, JobStatus::Processing, JobStatus::Complete)
            .await
            .unwrap_err();
        match err {
            QueueError::InvalidTransition { from, to, .. } => {
                assert_eq!(from, JobStatus::Queued);
                assert_eq!(to, JobStatus::Complete);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.get(&id).await.unwrap().status, JobStatus::Queued);
    }

    #[tokio::test]
    async fn test_terminal_state_is_final() {
        let (store, id) = store_with("job-1").await;
        store.cancel(&id).await.unwrap();

        assert!(store.fail(&id, "late failure").await.is_err());
        assert!(store.complete(&id, Vec::new(), Vec::new()).await.is_err());
        assert!(store.update_progress(&id, 90, None).await.is_err());
        assert!(store
            .transition(&id, JobStatus::Cancelled, JobStatus::Processing)
            .await
            .is_err());

        let rec = store.get(&id).await.unwrap();
        assert_eq!(rec.status, JobStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_concurrent_transitions_single_winner() {
        let (store, id) = store_with("job-1").await;
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                store
                    .transition(&id, JobStatus::Queued, JobStatus::Processing)
                    .await
                    .is_ok()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let store = JobStore::new();
        let err = store.fail(&JobId::from_string("nope"), "x").await.unwrap_err();
        assert!(matches!(err, QueueError::JobNotFound(_)));
    }

    #[tokio::test]
    async fn test_remove_older_than_keeps_active_jobs() {
        let store = JobStore::new();
        let done = JobId::from_string("done");
        let running = JobId::from_string("running");
        store.insert(JobRecord::new(done.clone(), "a.mp4")).await.unwrap();
        store.insert(JobRecord::new(running.clone(), "b.mp4")).await.unwrap();
        store.fail(&done, "boom").await.unwrap();
        store
            .transition(&running, JobStatus::Queued, JobStatus::Processing)
            .await
            .unwrap();

        let removed = store.remove_older_than(Duration::seconds(-1)).await;
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].job_id, done);
        assert!(store.get(&running).await.is_some());

        assert!(store.remove_older_than(Duration::hours(1)).await.is_empty());
    }

    #[tokio::test]
    async fn test_list_sorted_by_creation() {
        let store = JobStore::new();
        for i in 0..3 {
            store
                .insert(JobRecord::new(JobId::from_string(format!("job-{i}")), "v.mp4"))
                .await
                .unwrap();
        }
        let list = store.list().await;
        assert_eq!(list.len(), 3);
        assert!(list.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }
}
