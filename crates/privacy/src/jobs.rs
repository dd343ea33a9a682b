//! Organization-scoped deletion jobs: the queue the cascade worker polls.
//!
//! A job becomes eligible only once its `scheduled_for` grace period has
//! passed. Running jobs carry a lease so an interrupted worker's jobs are
//! reclaimed instead of staying `Running` forever.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use orbit_content::CategoryOutcome;
use orbit_core::{OrbitError, OrbitResult};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Job lifecycle status. Queued -> Running -> Succeeded | Failed;
/// Failed -> Queued is an external retry transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

/// An organization-scoped hard-deletion task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionJob {
    pub id: Uuid,
    pub org_id: Uuid,
    pub status: JobStatus,
    /// Eligible for processing only once this time has passed.
    pub scheduled_for: DateTime<Utc>,
    pub lease_expires_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Set only on `Failed`.
    pub last_error: Option<String>,
    /// Per-category results of the most recent cascade attempt. The job can
    /// report `Succeeded` while individual categories failed; this list is
    /// where that detail lives.
    pub category_results: Vec<CategoryOutcome>,
}

/// Deletion-job queue backed by DashMap.
pub struct DeletionQueue {
    jobs: DashMap<Uuid, DeletionJob>,
}

impl Default for DeletionQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl DeletionQueue {
    pub fn new() -> Self {
        Self {
            jobs: DashMap::new(),
        }
    }

    /// Enqueue a job for an organization, or surface the existing
    /// non-terminal one so racing admins do not stack duplicates.
    pub fn enqueue_or_get(&self, org_id: Uuid, scheduled_for: DateTime<Utc>) -> DeletionJob {
        if let Some(existing) = self
            .jobs
            .iter()
            .find(|e| e.value().org_id == org_id && !e.value().status.is_terminal())
        {
            return existing.value().clone();
        }

        let job = DeletionJob {
            id: Uuid::new_v4(),
            org_id,
            status: JobStatus::Queued,
            scheduled_for,
            lease_expires_at: None,
            started_at: None,
            finished_at: None,
            last_error: None,
            category_results: Vec::new(),
        };
        info!(job_id = %job.id, org_id = %org_id, scheduled_for = %scheduled_for, "Deletion job enqueued");
        self.jobs.insert(job.id, job.clone());
        job
    }

    pub fn get(&self, id: Uuid) -> Option<DeletionJob> {
        self.jobs.get(&id).map(|e| e.value().clone())
    }

    pub fn list(&self) -> Vec<DeletionJob> {
        self.jobs.iter().map(|e| e.value().clone()).collect()
    }

    /// Queued jobs whose grace period has expired, oldest expiry first,
    /// capped at `limit`.
    pub fn due_batch(&self, now: DateTime<Utc>, limit: usize) -> Vec<DeletionJob> {
        let mut due: Vec<DeletionJob> = self
            .jobs
            .iter()
            .filter(|e| e.value().status == JobStatus::Queued && e.value().scheduled_for <= now)
            .map(|e| e.value().clone())
            .collect();
        due.sort_by_key(|j| j.scheduled_for);
        due.truncate(limit);
        due
    }

    /// Queued -> Running with a lease.
    pub fn mark_running(
        &self,
        id: Uuid,
        lease_until: DateTime<Utc>,
    ) -> OrbitResult<DeletionJob> {
        let mut entry = self
            .jobs
            .get_mut(&id)
            .ok_or_else(|| OrbitError::NotFound(format!("deletion job {id}")))?;
        if entry.status != JobStatus::Queued {
            return Err(invalid_transition(entry.status, JobStatus::Running));
        }
        entry.status = JobStatus::Running;
        entry.started_at = Some(Utc::now());
        entry.lease_expires_at = Some(lease_until);
        Ok(entry.clone())
    }

    /// Running -> Succeeded, attaching the per-category results.
    pub fn mark_succeeded(
        &self,
        id: Uuid,
        results: Vec<CategoryOutcome>,
    ) -> OrbitResult<DeletionJob> {
        let mut entry = self
            .jobs
            .get_mut(&id)
            .ok_or_else(|| OrbitError::NotFound(format!("deletion job {id}")))?;
        if entry.status != JobStatus::Running {
            return Err(invalid_transition(entry.status, JobStatus::Succeeded));
        }
        entry.status = JobStatus::Succeeded;
        entry.finished_at = Some(Utc::now());
        entry.lease_expires_at = None;
        entry.category_results = results;
        Ok(entry.clone())
    }

    /// Running -> Failed with the error's message. The job stays retryable
    /// via [`DeletionQueue::requeue`].
    pub fn mark_failed(&self, id: Uuid, reason: &str) -> OrbitResult<DeletionJob> {
        let mut entry = self
            .jobs
            .get_mut(&id)
            .ok_or_else(|| OrbitError::NotFound(format!("deletion job {id}")))?;
        if entry.status != JobStatus::Running {
            return Err(invalid_transition(entry.status, JobStatus::Failed));
        }
        entry.status = JobStatus::Failed;
        entry.finished_at = Some(Utc::now());
        entry.lease_expires_at = None;
        entry.last_error = Some(reason.to_string());
        Ok(entry.clone())
    }

    /// Failed -> Queued. Requested by an operator or the admin API, never by
    /// the worker itself.
    pub fn requeue(&self, id: Uuid) -> OrbitResult<DeletionJob> {
        let mut entry = self
            .jobs
            .get_mut(&id)
            .ok_or_else(|| OrbitError::NotFound(format!("deletion job {id}")))?;
        if entry.status != JobStatus::Failed {
            return Err(invalid_transition(entry.status, JobStatus::Queued));
        }
        entry.status = JobStatus::Queued;
        entry.started_at = None;
        entry.finished_at = None;
        entry.lease_expires_at = None;
        entry.last_error = None;
        info!(job_id = %id, "Deletion job requeued");
        Ok(entry.clone())
    }

    /// Reset Running jobs whose lease has expired back to Queued. Returns the
    /// number reclaimed.
    pub fn reclaim_expired(&self, now: DateTime<Utc>) -> usize {
        let expired: Vec<Uuid> = self
            .jobs
            .iter()
            .filter(|e| {
                e.value().status == JobStatus::Running
                    && e.value()
                        .lease_expires_at
                        .map(|lease| lease <= now)
                        .unwrap_or(true)
            })
            .map(|e| *e.key())
            .collect();
        for id in &expired {
            if let Some(mut entry) = self.jobs.get_mut(id) {
                entry.status = JobStatus::Queued;
                entry.started_at = None;
                entry.lease_expires_at = None;
            }
        }
        expired.len()
    }

    /// Drop other still-queued jobs for the same organization; a retry may
    /// have queued a duplicate. Returns the number removed.
    pub fn remove_others_for_org(&self, org_id: Uuid, keep: Uuid) -> usize {
        let duplicates: Vec<Uuid> = self
            .jobs
            .iter()
            .filter(|e| {
                e.value().org_id == org_id
                    && *e.key() != keep
                    && e.value().status == JobStatus::Queued
            })
            .map(|e| *e.key())
            .collect();
        for id in &duplicates {
            self.jobs.remove(id);
        }
        duplicates.len()
    }
}

fn invalid_transition(from: JobStatus, to: JobStatus) -> OrbitError {
    OrbitError::InvalidTransition {
        from: from.as_str().to_string(),
        to: to.as_str().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_due_batch_orders_and_filters() {
        let queue = DeletionQueue::new();
        let now = Utc::now();

        let late = queue.enqueue_or_get(Uuid::new_v4(), now - Duration::hours(1));
        let early = queue.enqueue_or_get(Uuid::new_v4(), now - Duration::hours(5));
        // Still inside its grace period.
        queue.enqueue_or_get(Uuid::new_v4(), now + Duration::hours(24));

        let batch = queue.due_batch(now, 10);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].id, early.id);
        assert_eq!(batch[1].id, late.id);

        let capped = queue.due_batch(now, 1);
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].id, early.id);
    }

    #[test]
    fn test_enqueue_or_get_surfaces_existing() {
        let queue = DeletionQueue::new();
        let org = Uuid::new_v4();
        let now = Utc::now();

        let first = queue.enqueue_or_get(org, now);
        let second = queue.enqueue_or_get(org, now + Duration::hours(1));
        assert_eq!(first.id, second.id);
        assert_eq!(queue.list().len(), 1);
    }

    #[test]
    fn test_lifecycle_and_requeue() {
        let queue = DeletionQueue::new();
        let job = queue.enqueue_or_get(Uuid::new_v4(), Utc::now());
        let lease = Utc::now() + Duration::minutes(15);

        let running = queue.mark_running(job.id, lease).unwrap();
        assert_eq!(running.status, JobStatus::Running);
        // Double pickup is rejected.
        assert!(queue.mark_running(job.id, lease).is_err());

        let failed = queue.mark_failed(job.id, "org lookup timed out").unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.last_error.as_deref(), Some("org lookup timed out"));

        let requeued = queue.requeue(job.id).unwrap();
        assert_eq!(requeued.status, JobStatus::Queued);
        assert!(requeued.last_error.is_none());

        queue.mark_running(job.id, lease).unwrap();
        let succeeded = queue.mark_succeeded(job.id, Vec::new()).unwrap();
        assert_eq!(succeeded.status, JobStatus::Succeeded);
        // Terminal: requeue only applies to Failed jobs.
        assert!(queue.requeue(job.id).is_err());
    }

    #[test]
    fn test_reclaim_expired_leases() {
        let queue = DeletionQueue::new();
        let now = Utc::now();
        let job = queue.enqueue_or_get(Uuid::new_v4(), now - Duration::hours(1));

        queue
            .mark_running(job.id, now - Duration::minutes(1))
            .unwrap();
        assert_eq!(queue.reclaim_expired(now), 1);
        assert_eq!(queue.get(job.id).unwrap().status, JobStatus::Queued);

        // A live lease is left alone.
        queue
            .mark_running(job.id, now + Duration::minutes(15))
            .unwrap();
        assert_eq!(queue.reclaim_expired(now), 0);
        assert_eq!(queue.get(job.id).unwrap().status, JobStatus::Running);
    }

    #[test]
    fn test_remove_others_for_org() {
        let queue = DeletionQueue::new();
        let org = Uuid::new_v4();
        let now = Utc::now();

        let keeper = queue.enqueue_or_get(org, now);
        // Force a duplicate past enqueue_or_get by completing the first.
        queue.mark_running(keeper.id, now).unwrap();
        queue.mark_failed(keeper.id, "boom").unwrap();
        let duplicate = queue.enqueue_or_get(org, now);
        assert_ne!(keeper.id, duplicate.id);
        queue.requeue(keeper.id).unwrap();

        assert_eq!(queue.remove_others_for_org(org, keeper.id), 1);
        assert!(queue.get(duplicate.id).is_none());
        assert!(queue.get(keeper.id).is_some());
    }
}
