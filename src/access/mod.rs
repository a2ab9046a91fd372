//! Principals, permissions, and authorization.

mod guard;
mod permission;
mod principal;

pub use guard::{authorize, PermissionStage};
pub use permission::{Permission, Role, RoleConfig, RoleTable, ADMINISTRATOR_MASK};
pub use principal::Principal;
