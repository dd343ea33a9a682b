//! Platform capabilities shared by the privacy core: role authority,
//! audit logging, and the organization directory.

pub mod audit;
pub mod roles;
pub mod tenancy;

pub use audit::AuditRecorder;
pub use roles::{can_access, highest_role, Role, RoleDirectory};
pub use tenancy::OrgDirectory;
