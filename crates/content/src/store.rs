//! In-memory content store backed by DashMap.
//!
//! Production: the category tables live in PostgreSQL and belong to their
//! owning subsystems; this store provides the same delete/collect surface
//! for development and testing.

use crate::categories::Category;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use orbit_core::{OrbitError, OrbitResult};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Uniform row shape for every cascade/export target table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnedRecord {
    pub id: Uuid,
    pub category: Category,
    pub org_id: Uuid,
    pub subject_id: Uuid,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Tagged result of one per-category deletion attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CategoryOutcome {
    /// Rows removed; zero rows is still success.
    Deleted { category: Category, rows: usize },
    /// The category table is not part of this deployment's data model.
    NotApplicable { category: Category },
    /// The delete call itself failed.
    Failed { category: Category, reason: String },
}

/// Thread-safe in-memory store for all org/user-owned content tables.
pub struct ContentStore {
    /// Category tables registered in this deployment.
    tables: DashMap<Category, ()>,
    records: DashMap<Uuid, OwnedRecord>,
    /// Simulated per-category store faults, set by tests and chaos drills.
    faults: DashMap<Category, String>,
}

impl Default for ContentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentStore {
    /// Store with every category table registered.
    pub fn new() -> Self {
        Self::with_categories(&Category::all())
    }

    /// Store limited to a subset of category tables, for deployments whose
    /// data model does not carry every category.
    pub fn with_categories(categories: &[Category]) -> Self {
        let tables = DashMap::new();
        for category in categories {
            tables.insert(*category, ());
        }
        info!(tables = tables.len(), "Content store initialized (in-memory)");
        Self {
            tables,
            records: DashMap::new(),
            faults: DashMap::new(),
        }
    }

    pub fn is_registered(&self, category: Category) -> bool {
        self.tables.contains_key(&category)
    }

    /// Insert a row into a category table.
    pub fn insert(
        &self,
        category: Category,
        org_id: Uuid,
        subject_id: Uuid,
        payload: serde_json::Value,
    ) -> OwnedRecord {
        let record = OwnedRecord {
            id: Uuid::new_v4(),
            category,
            org_id,
            subject_id,
            payload,
            created_at: Utc::now(),
        };
        self.records.insert(record.id, record.clone());
        record
    }

    /// A subject's rows in one category, oldest first.
    ///
    /// Unregistered categories read as empty; a faulted category surfaces a
    /// store error for the caller to degrade on.
    pub fn records_for_subject(
        &self,
        category: Category,
        subject_id: Uuid,
    ) -> OrbitResult<Vec<OwnedRecord>> {
        if let Some(reason) = self.faults.get(&category) {
            return Err(OrbitError::Store(reason.value().clone()));
        }
        let mut rows: Vec<OwnedRecord> = self
            .records
            .iter()
            .filter(|e| e.value().category == category && e.value().subject_id == subject_id)
            .map(|e| e.value().clone())
            .collect();
        rows.sort_by_key(|r| r.created_at);
        Ok(rows)
    }

    /// Delete every row an organization owns in one category.
    ///
    /// Idempotent: deleting zero matching rows reports `Deleted { rows: 0 }`.
    pub fn delete_for_org(&self, category: Category, org_id: Uuid) -> CategoryOutcome {
        if !self.is_registered(category) {
            return CategoryOutcome::NotApplicable { category };
        }
        if let Some(reason) = self.faults.get(&category) {
            return CategoryOutcome::Failed {
                category,
                reason: reason.value().clone(),
            };
        }

        let ids: Vec<Uuid> = self
            .records
            .iter()
            .filter(|e| e.value().category == category && e.value().org_id == org_id)
            .map(|e| *e.key())
            .collect();
        for id in &ids {
            self.records.remove(id);
        }
        CategoryOutcome::Deleted {
            category,
            rows: ids.len(),
        }
    }

    /// Total rows an organization owns across all categories.
    pub fn count_for_org(&self, org_id: Uuid) -> usize {
        self.records
            .iter()
            .filter(|e| e.value().org_id == org_id)
            .count()
    }

    /// Rows an organization owns in one category.
    pub fn count_category_for_org(&self, category: Category, org_id: Uuid) -> usize {
        self.records
            .iter()
            .filter(|e| e.value().category == category && e.value().org_id == org_id)
            .count()
    }

    /// Make one category's operations fail with `reason` until cleared.
    pub fn inject_fault(&self, category: Category, reason: &str) {
        self.faults.insert(category, reason.to_string());
    }

    /// Clear an injected fault.
    pub fn clear_fault(&self, category: Category) {
        self.faults.remove(&category);
    }

    /// Seed a handful of rows for one member of a demo organization.
    pub fn seed_demo_content(&self, org_id: Uuid, subject_id: Uuid) {
        self.insert(
            Category::Profile,
            org_id,
            subject_id,
            serde_json::json!({"display_name": "Demo User", "timezone": "UTC"}),
        );
        self.insert(
            Category::BrandProfiles,
            org_id,
            subject_id,
            serde_json::json!({"name": "Demo Brand", "tone": "playful", "palette": ["#1A2B3C", "#FFD166"]}),
        );
        for campaign in ["Spring Launch", "Newsletter Push", "Evergreen Social"] {
            self.insert(
                Category::Campaigns,
                org_id,
                subject_id,
                serde_json::json!({"name": campaign, "channel": "social"}),
            );
        }
        self.insert(
            Category::ScheduledPosts,
            org_id,
            subject_id,
            serde_json::json!({"caption": "We're live!", "platform": "instagram"}),
        );
        self.insert(
            Category::Notifications,
            org_id,
            subject_id,
            serde_json::json!({"kind": "campaign_published", "read": false}),
        );
        self.insert(
            Category::UsageEvents,
            org_id,
            subject_id,
            serde_json::json!({"event": "editor_opened"}),
        );
        info!(org_id = %org_id, "Demo content seeded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_for_org_idempotent() {
        let store = ContentStore::new();
        let org = Uuid::new_v4();
        let subject = Uuid::new_v4();

        store.insert(Category::Campaigns, org, subject, serde_json::json!({"n": 1}));
        store.insert(Category::Campaigns, org, subject, serde_json::json!({"n": 2}));

        assert_eq!(
            store.delete_for_org(Category::Campaigns, org),
            CategoryOutcome::Deleted {
                category: Category::Campaigns,
                rows: 2
            }
        );
        // Re-running against an emptied table is success, not an error.
        assert_eq!(
            store.delete_for_org(Category::Campaigns, org),
            CategoryOutcome::Deleted {
                category: Category::Campaigns,
                rows: 0
            }
        );
    }

    #[test]
    fn test_unregistered_category_not_applicable() {
        let store = ContentStore::with_categories(&[Category::Campaigns]);
        let org = Uuid::new_v4();

        assert_eq!(
            store.delete_for_org(Category::VideoJobs, org),
            CategoryOutcome::NotApplicable {
                category: Category::VideoJobs
            }
        );
        // Reads on an unregistered category are simply empty.
        assert!(store
            .records_for_subject(Category::VideoJobs, Uuid::new_v4())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_injected_fault_surfaces() {
        let store = ContentStore::new();
        let org = Uuid::new_v4();
        store.inject_fault(Category::Leads, "connection reset");

        match store.delete_for_org(Category::Leads, org) {
            CategoryOutcome::Failed { reason, .. } => assert_eq!(reason, "connection reset"),
            other => panic!("expected Failed, got {other:?}"),
        }
        assert!(store.records_for_subject(Category::Leads, org).is_err());

        store.clear_fault(Category::Leads);
        assert!(matches!(
            store.delete_for_org(Category::Leads, org),
            CategoryOutcome::Deleted { rows: 0, .. }
        ));
    }

    #[test]
    fn test_records_for_subject_scoped_and_ordered() {
        let store = ContentStore::new();
        let org = Uuid::new_v4();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let first = store.insert(Category::Notifications, org, alice, serde_json::json!({"n": 1}));
        let second = store.insert(Category::Notifications, org, alice, serde_json::json!({"n": 2}));
        store.insert(Category::Notifications, org, bob, serde_json::json!({"n": 3}));

        let rows = store.records_for_subject(Category::Notifications, alice).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, first.id);
        assert_eq!(rows[1].id, second.id);
    }
}
