//! Integration test for the full request -> cascade deletion flow.

use orbit_content::{Category, ContentStore};
use orbit_core::config::PrivacyConfig;
use orbit_platform::tenancy::PlanTier;
use orbit_platform::{AuditRecorder, OrgDirectory, Role, RoleDirectory};
use orbit_privacy::{
    DeletionQueue, DeletionWorker, DsrKind, DsrLedger, DsrStatus, ExportCollector, JobStatus,
    PrivacyPipeline,
};
use std::sync::Arc;
use uuid::Uuid;

struct World {
    pipeline: PrivacyPipeline,
    worker: Arc<DeletionWorker>,
    queue: Arc<DeletionQueue>,
    orgs: Arc<OrgDirectory>,
    roles: Arc<RoleDirectory>,
    store: Arc<ContentStore>,
    audit: Arc<AuditRecorder>,
}

/// Wire the whole core with a zero-hour grace period so jobs are
/// immediately eligible.
fn world() -> World {
    let config = PrivacyConfig {
        grace_period_hours: 0,
        ..PrivacyConfig::default()
    };

    let ledger = Arc::new(DsrLedger::new());
    let queue = Arc::new(DeletionQueue::new());
    let orgs = Arc::new(OrgDirectory::new());
    let roles = Arc::new(RoleDirectory::new());
    let audit = Arc::new(AuditRecorder::new());
    let store = Arc::new(ContentStore::new());
    let collector = ExportCollector::new(store.clone(), orgs.clone());
    let worker = Arc::new(DeletionWorker::new(
        queue.clone(),
        store.clone(),
        orgs.clone(),
        ledger.clone(),
        audit.clone(),
        &config,
    ));
    let pipeline = PrivacyPipeline::new(
        ledger,
        queue.clone(),
        orgs.clone(),
        roles.clone(),
        audit.clone(),
        collector,
        worker.clone(),
        &config,
    );

    World {
        pipeline,
        worker,
        queue,
        orgs,
        roles,
        store,
        audit,
    }
}

#[test]
fn test_deletion_request_to_completed_cascade() {
    let w = world();

    let subject = Uuid::new_v4();
    let org = w
        .orgs
        .create_org("Full Flow Org".into(), subject, PlanTier::Professional);
    w.store.seed_demo_content(org.id, subject);
    assert!(w.store.count_for_org(org.id) > 0);

    let admin = Uuid::new_v4();
    w.roles.assign(admin, Role::Admin);

    // Subject files the request; the confirmation is immediate, the hard
    // deletion is not.
    let request = w.pipeline.create_request(subject, DsrKind::Deletion);
    assert_eq!(request.status, DsrStatus::Pending);

    // Admin authorizes it: the job must exist before Processing is visible.
    let advanced = w.pipeline.advance_to_processing(request.id, admin).unwrap();
    assert_eq!(advanced.status, DsrStatus::Processing);
    let jobs = w.queue.list();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].org_id, org.id);

    // One scheduled run takes the org and everything it owns.
    let summary = w.worker.run_once();
    assert_eq!(summary.processed, 1);

    let job = w.queue.get(jobs[0].id).unwrap();
    assert_eq!(job.status, JobStatus::Succeeded);
    assert_eq!(w.store.count_for_org(org.id), 0);
    assert!(w.orgs.get_org(org.id).is_none());

    // The subject's request is closed out and the audit chain holds.
    assert_eq!(
        w.pipeline.get_request(request.id).unwrap().status,
        DsrStatus::Completed
    );
    let verification = w.audit.verify_chain();
    assert!(verification.chain_intact);
    assert!(verification.total_entries >= 3);
}

#[test]
fn test_export_flow_returns_only_populated_categories() {
    let w = world();

    let subject = Uuid::new_v4();
    let org = w
        .orgs
        .create_org("Export Flow Org".into(), subject, PlanTier::Starter);
    w.store.insert(
        Category::Notifications,
        org.id,
        subject,
        serde_json::json!({"kind": "digest"}),
    );
    w.store.insert(
        Category::Notifications,
        org.id,
        subject,
        serde_json::json!({"kind": "mention"}),
    );

    let request = w.pipeline.create_request(subject, DsrKind::Export);
    assert_eq!(request.status, DsrStatus::Pending);

    // Export requests are served synchronously, without a job.
    let snapshot = w.pipeline.serve_export(subject).unwrap();
    assert_eq!(snapshot.subject_id, subject);
    assert_eq!(snapshot.categories.len(), 1);
    assert_eq!(snapshot.categories["notifications"].len(), 2);
    assert!(w.queue.list().is_empty());

    // Serving ephemerally leaves the ledger entry Pending.
    assert_eq!(
        w.pipeline.get_request(request.id).unwrap().status,
        DsrStatus::Pending
    );
}

#[test]
fn test_failed_job_requeue_roundtrip() {
    let w = world();

    let subject = Uuid::new_v4();
    let org = w
        .orgs
        .create_org("Retry Flow Org".into(), subject, PlanTier::Free);
    w.store.insert(
        Category::Campaigns,
        org.id,
        subject,
        serde_json::json!({"name": "Retry Me"}),
    );

    let admin = Uuid::new_v4();
    w.roles.assign(admin, Role::Admin);

    let request = w.pipeline.create_request(subject, DsrKind::Deletion);
    w.pipeline.advance_to_processing(request.id, admin).unwrap();
    let job_id = w.queue.list()[0].id;

    // First run dies on the directory lookup.
    w.orgs.inject_fault("directory unavailable");
    w.worker.run_once();
    let failed = w.queue.get(job_id).unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert!(failed.last_error.is_some());

    // Admin requeues through the pipeline; the retry completes cleanly.
    w.orgs.clear_fault();
    w.pipeline.requeue_job(job_id, admin).unwrap();
    assert_eq!(w.worker.run_once().processed, 1);
    assert_eq!(w.queue.get(job_id).unwrap().status, JobStatus::Succeeded);
    assert!(w.orgs.get_org(org.id).is_none());
    assert_eq!(w.store.count_for_org(org.id), 0);
}
