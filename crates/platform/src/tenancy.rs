//! Organization directory: organizations and memberships.
//!
//! Organizations are the billing and data-ownership boundary. The privacy
//! pipeline uses this directory for the subject -> organization join and for
//! the final membership/organization removal at the end of a cascade.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Organization lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgStatus {
    Active,
    Suspended,
    /// A deletion job has been scheduled for this organization.
    PendingDeletion,
}

/// SaaS pricing tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    Free,
    Starter,
    Professional,
    Enterprise,
}

/// A single organization in the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub plan: PlanTier,
    pub owner_id: Uuid,
    pub status: OrgStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user's membership in an organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub id: Uuid,
    pub org_id: Uuid,
    pub user_id: Uuid,
    pub joined_at: DateTime<Utc>,
}

/// Organization and membership directory backed by DashMap.
pub struct OrgDirectory {
    orgs: DashMap<Uuid, Organization>,
    memberships: DashMap<Uuid, Membership>,
    /// Simulated directory fault, set by tests and chaos drills.
    fault: parking_lot::Mutex<Option<String>>,
}

impl Default for OrgDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl OrgDirectory {
    pub fn new() -> Self {
        Self {
            orgs: DashMap::new(),
            memberships: DashMap::new(),
            fault: parking_lot::Mutex::new(None),
        }
    }

    /// Create a new organization; the owner becomes its first member.
    pub fn create_org(&self, name: String, owner_id: Uuid, plan: PlanTier) -> Organization {
        let now = Utc::now();
        let slug = name
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '-' })
            .collect::<String>();

        let org = Organization {
            id: Uuid::new_v4(),
            name,
            slug,
            plan,
            owner_id,
            status: OrgStatus::Active,
            created_at: now,
            updated_at: now,
        };

        info!(org_id = %org.id, org_name = %org.name, "Organization created");
        self.orgs.insert(org.id, org.clone());
        self.add_member(org.id, owner_id);
        org
    }

    pub fn get_org(&self, id: Uuid) -> Option<Organization> {
        self.orgs.get(&id).map(|e| e.value().clone())
    }

    /// Fallible lookup used by the deletion worker: a directory fault here
    /// aborts the whole job rather than a single category.
    pub fn try_get_org(&self, id: Uuid) -> Result<Option<Organization>, String> {
        if let Some(reason) = self.fault.lock().clone() {
            return Err(reason);
        }
        Ok(self.get_org(id))
    }

    /// Make directory lookups fail with `reason` until cleared.
    pub fn inject_fault(&self, reason: &str) {
        *self.fault.lock() = Some(reason.to_string());
    }

    /// Clear an injected fault.
    pub fn clear_fault(&self) {
        *self.fault.lock() = None;
    }

    pub fn list_orgs(&self) -> Vec<Organization> {
        self.orgs.iter().map(|e| e.value().clone()).collect()
    }

    /// Flag an organization whose deletion job has been scheduled.
    pub fn mark_pending_deletion(&self, id: Uuid) -> Option<Organization> {
        if let Some(mut entry) = self.orgs.get_mut(&id) {
            entry.status = OrgStatus::PendingDeletion;
            entry.updated_at = Utc::now();
            info!(org_id = %id, "Organization marked pending deletion");
            Some(entry.clone())
        } else {
            None
        }
    }

    pub fn add_member(&self, org_id: Uuid, user_id: Uuid) -> Membership {
        let membership = Membership {
            id: Uuid::new_v4(),
            org_id,
            user_id,
            joined_at: Utc::now(),
        };
        self.memberships.insert(membership.id, membership.clone());
        membership
    }

    /// The organization a user belongs to, if any.
    pub fn org_of_user(&self, user_id: Uuid) -> Option<Organization> {
        self.memberships
            .iter()
            .find(|e| e.value().user_id == user_id)
            .and_then(|e| self.get_org(e.value().org_id))
    }

    pub fn members_of_org(&self, org_id: Uuid) -> Vec<Membership> {
        self.memberships
            .iter()
            .filter(|e| e.value().org_id == org_id)
            .map(|e| e.value().clone())
            .collect()
    }

    /// Delete all memberships of an organization. Zero rows is a no-op.
    pub fn remove_members_of_org(&self, org_id: Uuid) -> usize {
        let ids: Vec<Uuid> = self
            .memberships
            .iter()
            .filter(|e| e.value().org_id == org_id)
            .map(|e| *e.key())
            .collect();
        for id in &ids {
            self.memberships.remove(id);
        }
        ids.len()
    }

    /// Delete the organization record. Returns `false` when already absent.
    pub fn remove_org(&self, id: Uuid) -> bool {
        let removed = self.orgs.remove(&id).is_some();
        if removed {
            info!(org_id = %id, "Organization removed");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_org_and_member_join() {
        let dir = OrgDirectory::new();
        let owner = Uuid::new_v4();
        let org = dir.create_org("Acme Studios".into(), owner, PlanTier::Professional);

        assert_eq!(org.slug, "acme-studios");
        assert_eq!(org.status, OrgStatus::Active);

        // Owner membership is created automatically.
        let found = dir.org_of_user(owner).unwrap();
        assert_eq!(found.id, org.id);

        let member = Uuid::new_v4();
        dir.add_member(org.id, member);
        assert_eq!(dir.members_of_org(org.id).len(), 2);
    }

    #[test]
    fn test_removal_is_idempotent() {
        let dir = OrgDirectory::new();
        let org = dir.create_org("Ghost Org".into(), Uuid::new_v4(), PlanTier::Free);

        assert_eq!(dir.remove_members_of_org(org.id), 1);
        assert_eq!(dir.remove_members_of_org(org.id), 0);

        assert!(dir.remove_org(org.id));
        assert!(!dir.remove_org(org.id));
        assert!(dir.get_org(org.id).is_none());
    }

    #[test]
    fn test_mark_pending_deletion() {
        let dir = OrgDirectory::new();
        let org = dir.create_org("Sunset Inc".into(), Uuid::new_v4(), PlanTier::Starter);

        let updated = dir.mark_pending_deletion(org.id).unwrap();
        assert_eq!(updated.status, OrgStatus::PendingDeletion);
        assert!(dir.mark_pending_deletion(Uuid::new_v4()).is_none());
    }
}
