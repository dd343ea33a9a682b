//! Privacy core: GDPR data-subject requests, export collection, and the
//! asynchronous cascading deletion of an organization's data.

pub mod export;
pub mod jobs;
pub mod ledger;
pub mod pipeline;
pub mod worker;

pub use export::{ExportCollector, Snapshot};
pub use jobs::{DeletionJob, DeletionQueue, JobStatus};
pub use ledger::{DataSubjectRequest, DsrKind, DsrLedger, DsrStatus};
pub use pipeline::PrivacyPipeline;
pub use worker::{DeletionWorker, RunSummary};
