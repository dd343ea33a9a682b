//! Role authority: ordered privilege levels and the role-assignment registry.
//!
//! Every administrative entry point in the privacy pipeline resolves the
//! actor's assigned roles here and gates on [`can_access`] before mutating
//! any state.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;
use uuid::Uuid;

/// Privilege level, ordered from least to most privileged.
///
/// Variant order is the rank order, so `Ord` on the enum agrees with
/// [`Role::rank`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    ReadOnly,
    User,
    Admin,
    SuperAdmin,
}

impl Role {
    /// Stable integer rank used for comparisons.
    pub fn rank(self) -> u8 {
        match self {
            Role::ReadOnly => 0,
            Role::User => 1,
            Role::Admin => 2,
            Role::SuperAdmin => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::ReadOnly => "read_only",
            Role::User => "user",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }

    /// All role variants, least privileged first.
    pub fn all() -> Vec<Role> {
        vec![Role::ReadOnly, Role::User, Role::Admin, Role::SuperAdmin]
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Highest-ranked role among `assigned`.
///
/// An empty set means the account predates role records and gets the
/// `User` default; a sole `ReadOnly` assignment stays `ReadOnly`.
pub fn highest_role(assigned: &[Role]) -> Role {
    assigned.iter().copied().max().unwrap_or(Role::User)
}

/// `true` iff the highest assigned role meets the required minimum.
pub fn can_access(assigned: &[Role], required: Role) -> bool {
    highest_role(assigned).rank() >= required.rank()
}

/// Persisted role assignments, user -> roles.
pub struct RoleDirectory {
    assignments: DashMap<Uuid, Vec<Role>>,
}

impl Default for RoleDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl RoleDirectory {
    pub fn new() -> Self {
        Self {
            assignments: DashMap::new(),
        }
    }

    /// Assign a role to a user. Returns `true` when newly assigned.
    pub fn assign(&self, user_id: Uuid, role: Role) -> bool {
        let mut entry = self.assignments.entry(user_id).or_default();
        if entry.contains(&role) {
            return false;
        }
        entry.push(role);
        info!(user_id = %user_id, role = %role, "Role assigned");
        true
    }

    /// Remove a role from a user. Returns `true` when actually removed.
    pub fn revoke(&self, user_id: Uuid, role: Role) -> bool {
        if let Some(mut entry) = self.assignments.get_mut(&user_id) {
            let before = entry.len();
            entry.retain(|r| *r != role);
            let removed = entry.len() < before;
            if removed {
                info!(user_id = %user_id, role = %role, "Role revoked");
            }
            removed
        } else {
            false
        }
    }

    /// All roles recorded for a user (empty when none are recorded).
    pub fn roles_of(&self, user_id: Uuid) -> Vec<Role> {
        self.assignments
            .get(&user_id)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }

    /// Resolve the user's assignments and check them against `required`.
    pub fn user_can_access(&self, user_id: Uuid, required: Role) -> bool {
        can_access(&self.roles_of(user_id), required)
    }
}
