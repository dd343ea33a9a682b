//! Audit logging: tamper-evident append-only store of administrative
//! mutations with cryptographic hash chaining.
//!
//! Entries are written synchronously by the component performing the
//! mutation; they are never updated or deleted.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;
use uuid::Uuid;

/// A single audit entry with tamper-evident hash chaining.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub sequence: u64,
    /// The administrator (or the nil UUID system actor) performing the action.
    pub actor_id: Uuid,
    pub action: String,
    pub target_type: String,
    pub target_id: String,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
    /// SHA-256 hash of this entry's content.
    pub entry_hash: String,
    /// Hash of the previous entry in the chain (genesis marker for the first).
    pub previous_hash: String,
}

/// Result of verifying the audit chain integrity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainVerification {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub tampered_sequences: Vec<u64>,
    pub chain_intact: bool,
}

/// Append-only audit recorder with hash chaining.
pub struct AuditRecorder {
    entries: DashMap<Uuid, AuditLogEntry>,
    sequence: parking_lot::Mutex<u64>,
    last_hash: parking_lot::Mutex<String>,
}

impl Default for AuditRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditRecorder {
    /// Create a new empty recorder with genesis hash.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            sequence: parking_lot::Mutex::new(0),
            last_hash: parking_lot::Mutex::new("genesis".to_string()),
        }
    }

    /// Append an entry for an administrative mutation.
    pub fn record(
        &self,
        actor_id: Uuid,
        action: &str,
        target_type: &str,
        target_id: &str,
        details: serde_json::Value,
    ) -> AuditLogEntry {
        let entry = AuditLogEntry {
            id: Uuid::new_v4(),
            sequence: 0,
            actor_id,
            action: action.to_string(),
            target_type: target_type.to_string(),
            target_id: target_id.to_string(),
            details,
            created_at: Utc::now(),
            entry_hash: String::new(),
            previous_hash: String::new(),
        };
        let chained = self.chain_entry(entry);
        info!(
            entry_id = %chained.id,
            sequence = chained.sequence,
            actor_id = %chained.actor_id,
            action = %chained.action,
            target = %chained.target_type,
            "Audit entry recorded"
        );
        self.entries.insert(chained.id, chained.clone());
        chained
    }

    /// Chain an entry: assign sequence, compute hash, link to previous.
    fn chain_entry(&self, mut entry: AuditLogEntry) -> AuditLogEntry {
        let mut seq = self.sequence.lock();
        *seq += 1;
        entry.sequence = *seq;

        let mut prev_hash = self.last_hash.lock();
        entry.previous_hash = prev_hash.clone();

        let hash = sha256_hex(&chain_content(&entry));
        entry.entry_hash = hash.clone();
        *prev_hash = hash;

        entry
    }

    /// Verify the integrity of the audit chain.
    pub fn verify_chain(&self) -> ChainVerification {
        let mut entries: Vec<AuditLogEntry> =
            self.entries.iter().map(|e| e.value().clone()).collect();
        entries.sort_by_key(|e| e.sequence);

        let total = entries.len();
        let mut valid = 0;
        let mut tampered = Vec::new();
        let mut expected_prev = "genesis".to_string();

        for entry in &entries {
            if entry.previous_hash != expected_prev {
                tampered.push(entry.sequence);
            } else if sha256_hex(&chain_content(entry)) == entry.entry_hash {
                valid += 1;
            } else {
                tampered.push(entry.sequence);
            }
            expected_prev = entry.entry_hash.clone();
        }

        ChainVerification {
            total_entries: total,
            valid_entries: valid,
            tampered_sequences: tampered,
            chain_intact: valid == total,
        }
    }

    /// Query entries, newest first, with optional actor and action filters.
    pub fn query(
        &self,
        actor_id: Option<Uuid>,
        action: Option<&str>,
        limit: usize,
    ) -> Vec<AuditLogEntry> {
        let mut results: Vec<AuditLogEntry> = self
            .entries
            .iter()
            .filter(|e| {
                let entry = e.value();
                if let Some(actor) = actor_id {
                    if entry.actor_id != actor {
                        return false;
                    }
                }
                if let Some(a) = action {
                    if entry.action != a {
                        return false;
                    }
                }
                true
            })
            .map(|e| e.value().clone())
            .collect();

        results.sort_by(|a, b| b.sequence.cmp(&a.sequence));
        results.truncate(limit);
        results
    }
}

fn chain_content(entry: &AuditLogEntry) -> String {
    format!(
        "{}:{}:{}:{}:{}:{}:{}",
        entry.sequence,
        entry.actor_id,
        entry.action,
        entry.target_type,
        entry.target_id,
        entry.created_at.to_rfc3339(),
        entry.previous_hash,
    )
}

/// Compute SHA-256 hex digest.
fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}
