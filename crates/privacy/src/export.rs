//! Export collector: on-demand aggregation of everything a subject owns,
//! serialized for download by the caller.

use chrono::{DateTime, Utc};
use orbit_content::{Category, ContentStore, OwnedRecord};
use orbit_core::{OrbitError, OrbitResult};
use orbit_platform::OrgDirectory;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// A point-in-time export of one subject's data: table name -> rows.
///
/// Zero-row categories are omitted to keep exports compact. Collection is
/// not transactional; concurrent mutation by the subject can leave a
/// category partially stale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub subject_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub categories: BTreeMap<String, Vec<serde_json::Value>>,
}

/// Read-only snapshot collector over the content store.
pub struct ExportCollector {
    store: Arc<ContentStore>,
    orgs: Arc<OrgDirectory>,
}

impl ExportCollector {
    pub fn new(store: Arc<ContentStore>, orgs: Arc<OrgDirectory>) -> Self {
        Self { store, orgs }
    }

    /// Collect every category of the subject's rows.
    ///
    /// A single category's lookup failing does not abort the collection: the
    /// failure is logged and that category is omitted.
    pub fn collect(&self, subject_id: Uuid) -> OrbitResult<Snapshot> {
        if self.orgs.org_of_user(subject_id).is_none() {
            return Err(OrbitError::NotFound(format!("subject {subject_id}")));
        }

        let mut categories = BTreeMap::new();
        for category in Category::all() {
            match self.store.records_for_subject(category, subject_id) {
                Ok(rows) => {
                    if !rows.is_empty() {
                        categories.insert(
                            category.as_str().to_string(),
                            rows.into_iter().map(export_row).collect(),
                        );
                    }
                }
                Err(e) => {
                    warn!(
                        subject_id = %subject_id,
                        category = %category,
                        error = %e,
                        "Category lookup failed; omitting it from the export"
                    );
                }
            }
        }

        Ok(Snapshot {
            subject_id,
            generated_at: Utc::now(),
            categories,
        })
    }
}

fn export_row(record: OwnedRecord) -> serde_json::Value {
    serde_json::json!({
        "id": record.id,
        "created_at": record.created_at,
        "data": record.payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbit_platform::tenancy::PlanTier;

    fn collector() -> (ExportCollector, Arc<ContentStore>, Arc<OrgDirectory>) {
        let store = Arc::new(ContentStore::new());
        let orgs = Arc::new(OrgDirectory::new());
        (
            ExportCollector::new(store.clone(), orgs.clone()),
            store,
            orgs,
        )
    }

    #[test]
    fn test_empty_categories_are_omitted() {
        let (collector, store, orgs) = collector();
        let subject = Uuid::new_v4();
        let org = orgs.create_org("Export Org".into(), subject, PlanTier::Starter);

        // Two notifications, zero campaigns.
        store.insert(
            Category::Notifications,
            org.id,
            subject,
            serde_json::json!({"kind": "weekly_digest"}),
        );
        store.insert(
            Category::Notifications,
            org.id,
            subject,
            serde_json::json!({"kind": "post_published"}),
        );

        let snapshot = collector.collect(subject).unwrap();
        assert_eq!(snapshot.categories.len(), 1);
        assert_eq!(snapshot.categories["notifications"].len(), 2);
        assert!(!snapshot.categories.contains_key("campaigns"));
    }

    #[test]
    fn test_unknown_subject_is_not_found() {
        let (collector, _store, _orgs) = collector();
        assert!(matches!(
            collector.collect(Uuid::new_v4()),
            Err(OrbitError::NotFound(_))
        ));
    }

    #[test]
    fn test_failing_category_degrades_not_aborts() {
        let (collector, store, orgs) = collector();
        let subject = Uuid::new_v4();
        let org = orgs.create_org("Flaky Org".into(), subject, PlanTier::Free);

        store.insert(
            Category::Leads,
            org.id,
            subject,
            serde_json::json!({"email": "lead@example.com"}),
        );
        store.insert(
            Category::Campaigns,
            org.id,
            subject,
            serde_json::json!({"name": "Fall Promo"}),
        );
        store.inject_fault(Category::Leads, "connection reset");

        let snapshot = collector.collect(subject).unwrap();
        assert!(snapshot.categories.contains_key("campaigns"));
        // The failing category is omitted rather than failing the export.
        assert!(!snapshot.categories.contains_key("leads"));
    }
}
