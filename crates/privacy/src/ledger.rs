//! Data-subject request ledger: durable records of export/deletion requests
//! and their forward-only status transitions.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use orbit_core::{OrbitError, OrbitResult};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// What the subject asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DsrKind {
    /// Data export / access.
    Export,
    /// Right to be forgotten.
    Deletion,
}

/// Request lifecycle status. Transitions only move forward along
/// Pending -> Processing -> Completed | Failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DsrStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl DsrStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DsrStatus::Pending => "pending",
            DsrStatus::Processing => "processing",
            DsrStatus::Completed => "completed",
            DsrStatus::Failed => "failed",
        }
    }
}

/// A data-subject request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSubjectRequest {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub kind: DsrKind,
    pub status: DsrStatus,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Set only when an admin advances the request.
    pub processed_by: Option<Uuid>,
    pub failure_reason: Option<String>,
}

/// Request ledger backed by DashMap.
pub struct DsrLedger {
    requests: DashMap<Uuid, DataSubjectRequest>,
}

impl Default for DsrLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl DsrLedger {
    pub fn new() -> Self {
        Self {
            requests: DashMap::new(),
        }
    }

    /// Insert a new `Pending` request. No authorization: subjects may always
    /// request their own export or deletion.
    pub fn create(&self, subject_id: Uuid, kind: DsrKind) -> DataSubjectRequest {
        let request = DataSubjectRequest {
            id: Uuid::new_v4(),
            subject_id,
            kind,
            status: DsrStatus::Pending,
            created_at: Utc::now(),
            processed_at: None,
            completed_at: None,
            processed_by: None,
            failure_reason: None,
        };
        info!(request_id = %request.id, kind = ?request.kind, "Data-subject request created");
        self.requests.insert(request.id, request.clone());
        request
    }

    pub fn get(&self, id: Uuid) -> Option<DataSubjectRequest> {
        self.requests.get(&id).map(|e| e.value().clone())
    }

    /// A subject's requests, newest first.
    pub fn list_for_subject(&self, subject_id: Uuid) -> Vec<DataSubjectRequest> {
        let mut requests: Vec<DataSubjectRequest> = self
            .requests
            .iter()
            .filter(|e| e.value().subject_id == subject_id)
            .map(|e| e.value().clone())
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        requests
    }

    /// Pending -> Processing, recording who advanced it.
    pub fn mark_processing(&self, id: Uuid, actor_id: Uuid) -> OrbitResult<DataSubjectRequest> {
        let mut entry = self
            .requests
            .get_mut(&id)
            .ok_or_else(|| OrbitError::NotFound(format!("data-subject request {id}")))?;
        if entry.status != DsrStatus::Pending {
            return Err(invalid_transition(entry.status, DsrStatus::Processing));
        }
        entry.status = DsrStatus::Processing;
        entry.processed_at = Some(Utc::now());
        entry.processed_by = Some(actor_id);
        Ok(entry.clone())
    }

    /// Processing -> Completed. Terminal and immutable afterwards.
    pub fn complete(&self, id: Uuid) -> OrbitResult<DataSubjectRequest> {
        let mut entry = self
            .requests
            .get_mut(&id)
            .ok_or_else(|| OrbitError::NotFound(format!("data-subject request {id}")))?;
        if entry.status != DsrStatus::Processing {
            return Err(invalid_transition(entry.status, DsrStatus::Completed));
        }
        entry.status = DsrStatus::Completed;
        entry.completed_at = Some(Utc::now());
        info!(request_id = %id, "Data-subject request completed");
        Ok(entry.clone())
    }

    /// Processing -> Failed with a reason. Terminal.
    pub fn fail(&self, id: Uuid, reason: &str) -> OrbitResult<DataSubjectRequest> {
        let mut entry = self
            .requests
            .get_mut(&id)
            .ok_or_else(|| OrbitError::NotFound(format!("data-subject request {id}")))?;
        if entry.status != DsrStatus::Processing {
            return Err(invalid_transition(entry.status, DsrStatus::Failed));
        }
        entry.status = DsrStatus::Failed;
        entry.completed_at = Some(Utc::now());
        entry.failure_reason = Some(reason.to_string());
        Ok(entry.clone())
    }
}

fn invalid_transition(from: DsrStatus, to: DsrStatus) -> OrbitError {
    OrbitError::InvalidTransition {
        from: from.as_str().to_string(),
        to: to.as_str().to_string(),
    }
}
