//! Cascade deletion worker.
//!
//! Invoked on a schedule rather than resident: each invocation reclaims
//! expired leases, picks up a bounded batch of due jobs, and processes them
//! strictly one at a time. Concurrent cascades over the same dependency
//! graph would race on referential order, and the batch is small enough
//! that sequential processing is the correct trade.

use crate::jobs::{DeletionJob, DeletionQueue};
use crate::ledger::{DsrKind, DsrLedger, DsrStatus};
use chrono::{Duration, Utc};
use orbit_content::{CascadePlan, CategoryOutcome, ContentStore};
use orbit_core::config::PrivacyConfig;
use orbit_core::{OrbitError, OrbitResult};
use orbit_platform::{AuditRecorder, OrgDirectory};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Outcome of one worker invocation. Per-category detail stays on the job
/// records and in logs; callers only get the count.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RunSummary {
    pub processed: usize,
}

/// Sequential batch processor for organization deletion jobs.
pub struct DeletionWorker {
    queue: Arc<DeletionQueue>,
    store: Arc<ContentStore>,
    orgs: Arc<OrgDirectory>,
    ledger: Arc<DsrLedger>,
    audit: Arc<AuditRecorder>,
    plan: CascadePlan,
    batch_size: usize,
    lease_timeout: Duration,
}

impl DeletionWorker {
    pub fn new(
        queue: Arc<DeletionQueue>,
        store: Arc<ContentStore>,
        orgs: Arc<OrgDirectory>,
        ledger: Arc<DsrLedger>,
        audit: Arc<AuditRecorder>,
        config: &PrivacyConfig,
    ) -> Self {
        Self {
            queue,
            store,
            orgs,
            ledger,
            audit,
            plan: CascadePlan::current(),
            batch_size: config.batch_size,
            lease_timeout: Duration::seconds(config.lease_timeout_secs as i64),
        }
    }

    /// One scheduled invocation: a bounded, complete unit of work.
    pub fn run_once(&self) -> RunSummary {
        let now = Utc::now();

        let reclaimed = self.queue.reclaim_expired(now);
        if reclaimed > 0 {
            warn!(reclaimed, "Reclaimed deletion jobs with expired leases");
        }

        let batch = self.queue.due_batch(now, self.batch_size);
        let mut processed = 0;
        for job in batch {
            match self.process(job.id) {
                Ok(finished) => {
                    processed += 1;
                    info!(
                        job_id = %finished.id,
                        org_id = %finished.org_id,
                        status = finished.status.as_str(),
                        "Deletion job processed"
                    );
                }
                Err(e) => {
                    // Lost a race for the job, or it vanished; move on.
                    warn!(job_id = %job.id, error = %e, "Skipping deletion job");
                }
            }
        }

        metrics::counter!("privacy.deletion_jobs.processed").increment(processed as u64);
        info!(processed, "Deletion worker run complete");
        RunSummary { processed }
    }

    /// Execute a single job's cascade and return the finished job record
    /// (`Succeeded`, or `Failed` with `last_error` set and the job left
    /// retryable).
    pub fn process(&self, job_id: Uuid) -> OrbitResult<DeletionJob> {
        let lease_until = Utc::now() + self.lease_timeout;
        let job = self.queue.mark_running(job_id, lease_until)?;

        match self.cascade(&job) {
            Ok(results) => self.queue.mark_succeeded(job.id, results),
            Err(e) => {
                let reason = e.to_string();
                warn!(job_id = %job.id, org_id = %job.org_id, error = %reason, "Deletion job failed");
                self.queue.mark_failed(job.id, &reason)
            }
        }
    }

    /// The ordered cascade for one organization.
    ///
    /// A per-category failure is recorded and skipped over; only an error at
    /// the organization-lookup level aborts the job.
    fn cascade(&self, job: &DeletionJob) -> OrbitResult<Vec<CategoryOutcome>> {
        let org = self
            .orgs
            .try_get_org(job.org_id)
            .map_err(OrbitError::Store)?;

        // Captured before memberships go away, so the subjects' ledger
        // entries can be resolved afterwards.
        let members = self.orgs.members_of_org(job.org_id);

        let mut results = Vec::with_capacity(self.plan.steps.len());
        let mut failed_categories = 0;
        for category in &self.plan.steps {
            let outcome = self.store.delete_for_org(*category, job.org_id);
            match &outcome {
                CategoryOutcome::Deleted { rows, .. } => {
                    if *rows > 0 {
                        info!(job_id = %job.id, category = %category, rows, "Category cleared");
                    }
                }
                CategoryOutcome::NotApplicable { .. } => {}
                CategoryOutcome::Failed { reason, .. } => {
                    failed_categories += 1;
                    warn!(
                        job_id = %job.id,
                        org_id = %job.org_id,
                        category = %category,
                        reason = %reason,
                        "Category deletion failed; continuing cascade"
                    );
                }
            }
            results.push(outcome);
        }

        let members_removed = self.orgs.remove_members_of_org(job.org_id);
        let duplicates_removed = self.queue.remove_others_for_org(job.org_id, job.id);
        let org_removed = self.orgs.remove_org(job.org_id);

        // Close out the subjects' deletion requests now that the cascade ran.
        for member in &members {
            for request in self.ledger.list_for_subject(member.user_id) {
                if request.kind == DsrKind::Deletion && request.status == DsrStatus::Processing {
                    if let Err(e) = self.ledger.complete(request.id) {
                        warn!(request_id = %request.id, error = %e, "Could not complete deletion request");
                    }
                }
            }
        }

        self.audit.record(
            Uuid::nil(),
            "deletion_job.processed",
            "organization",
            &job.org_id.to_string(),
            serde_json::json!({
                "job_id": job.id,
                "org_name": org.as_ref().map(|o| o.name.clone()),
                "plan_version": self.plan.version,
                "failed_categories": failed_categories,
                "members_removed": members_removed,
                "duplicate_jobs_removed": duplicates_removed,
                "org_removed": org_removed,
            }),
        );

        Ok(results)
    }
}
