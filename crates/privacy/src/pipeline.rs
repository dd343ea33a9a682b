//! Privacy pipeline: the admin-facing orchestration over the request
//! ledger, deletion queue, organization directory, and audit recorder.
//!
//! Every administrative entry point resolves the actor's roles and gates on
//! Admin rank before touching state; authorization failures reject loudly,
//! never degrade.

use crate::export::{ExportCollector, Snapshot};
use crate::jobs::{DeletionJob, DeletionQueue};
use crate::ledger::{DataSubjectRequest, DsrKind, DsrLedger, DsrStatus};
use crate::worker::DeletionWorker;
use chrono::{Duration, Utc};
use orbit_core::config::PrivacyConfig;
use orbit_core::{OrbitError, OrbitResult};
use orbit_platform::{AuditRecorder, OrgDirectory, Role, RoleDirectory};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub struct PrivacyPipeline {
    ledger: Arc<DsrLedger>,
    queue: Arc<DeletionQueue>,
    orgs: Arc<OrgDirectory>,
    roles: Arc<RoleDirectory>,
    audit: Arc<AuditRecorder>,
    collector: ExportCollector,
    worker: Arc<DeletionWorker>,
    grace_period: Duration,
}

impl PrivacyPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ledger: Arc<DsrLedger>,
        queue: Arc<DeletionQueue>,
        orgs: Arc<OrgDirectory>,
        roles: Arc<RoleDirectory>,
        audit: Arc<AuditRecorder>,
        collector: ExportCollector,
        worker: Arc<DeletionWorker>,
        config: &PrivacyConfig,
    ) -> Self {
        Self {
            ledger,
            queue,
            orgs,
            roles,
            audit,
            collector,
            worker,
            grace_period: Duration::hours(config.grace_period_hours as i64),
        }
    }

    /// Submit an export or deletion request on the subject's behalf.
    pub fn create_request(&self, subject_id: Uuid, kind: DsrKind) -> DataSubjectRequest {
        let request = self.ledger.create(subject_id, kind);
        self.audit.record(
            subject_id,
            "dsr.created",
            "data_subject_request",
            &request.id.to_string(),
            serde_json::json!({"kind": kind}),
        );
        metrics::counter!("privacy.requests.created").increment(1);
        request
    }

    /// Admin-only: move a request into `Processing`.
    ///
    /// For a deletion request, the organization's deletion job is scheduled
    /// (or surfaced) before the ledger transition becomes visible, so no
    /// caller ever observes `Processing` without the deletion queued.
    pub fn advance_to_processing(
        &self,
        request_id: Uuid,
        actor_id: Uuid,
    ) -> OrbitResult<DataSubjectRequest> {
        self.require_admin(actor_id)?;

        let request = self
            .ledger
            .get(request_id)
            .ok_or_else(|| OrbitError::NotFound(format!("data-subject request {request_id}")))?;
        if request.status != DsrStatus::Pending {
            return Err(OrbitError::InvalidTransition {
                from: request.status.as_str().to_string(),
                to: DsrStatus::Processing.as_str().to_string(),
            });
        }

        if request.kind == DsrKind::Deletion {
            let org = self.orgs.org_of_user(request.subject_id).ok_or_else(|| {
                OrbitError::NotFound(format!("organization for subject {}", request.subject_id))
            })?;
            let job = self
                .queue
                .enqueue_or_get(org.id, Utc::now() + self.grace_period);
            self.orgs.mark_pending_deletion(org.id);
            info!(
                request_id = %request_id,
                org_id = %org.id,
                job_id = %job.id,
                scheduled_for = %job.scheduled_for,
                "Organization deletion scheduled"
            );
        }

        let updated = self.ledger.mark_processing(request_id, actor_id)?;
        self.audit.record(
            actor_id,
            "dsr.advanced",
            "data_subject_request",
            &request_id.to_string(),
            serde_json::json!({"kind": updated.kind, "subject_id": updated.subject_id}),
        );
        metrics::counter!("privacy.requests.advanced").increment(1);
        Ok(updated)
    }

    /// Serve an export snapshot. Does not transition any ledger entry: a
    /// request may be served ephemerally while still `Pending`.
    pub fn serve_export(&self, subject_id: Uuid) -> OrbitResult<Snapshot> {
        let snapshot = self.collector.collect(subject_id)?;
        metrics::counter!("privacy.exports.served").increment(1);
        Ok(snapshot)
    }

    /// Admin-only: run one deletion job's cascade immediately, bypassing the
    /// scheduled worker (the grace period has to have expired regardless —
    /// the job must be in `Queued`).
    pub fn process_job(&self, job_id: Uuid, actor_id: Uuid) -> OrbitResult<DeletionJob> {
        self.require_admin(actor_id)?;
        self.audit.record(
            actor_id,
            "deletion_job.triggered",
            "deletion_job",
            &job_id.to_string(),
            serde_json::json!({}),
        );
        self.worker.process(job_id)
    }

    /// Admin-only: reset a `Failed` job back to `Queued` for retry.
    pub fn requeue_job(&self, job_id: Uuid, actor_id: Uuid) -> OrbitResult<DeletionJob> {
        self.require_admin(actor_id)?;
        let job = self.queue.requeue(job_id)?;
        self.audit.record(
            actor_id,
            "deletion_job.requeued",
            "deletion_job",
            &job_id.to_string(),
            serde_json::json!({"org_id": job.org_id}),
        );
        Ok(job)
    }

    pub fn get_request(&self, id: Uuid) -> Option<DataSubjectRequest> {
        self.ledger.get(id)
    }

    pub fn list_requests_for_subject(&self, subject_id: Uuid) -> Vec<DataSubjectRequest> {
        self.ledger.list_for_subject(subject_id)
    }

    pub fn get_job(&self, id: Uuid) -> Option<DeletionJob> {
        self.queue.get(id)
    }

    fn require_admin(&self, actor_id: Uuid) -> OrbitResult<()> {
        if !self.roles.user_can_access(actor_id, Role::Admin) {
            return Err(OrbitError::Unauthorized {
                required: Role::Admin.to_string(),
            });
        }
        Ok(())
    }
}
