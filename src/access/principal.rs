//! Request principals.

use super::permission::{Permission, RoleTable};

/// The client a request runs as, fixed for the request's lifetime.
///
/// The identity string doubles as the rate-limit scoping key: typically a
/// client address for anonymous traffic and an account id for authenticated
/// traffic. Authentication itself happens upstream; this type only carries
/// its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    identity: String,
    permissions: Permission,
}

impl Principal {
    /// A principal with an explicit permission mask.
    pub fn new(identity: impl Into<String>, permissions: Permission) -> Self {
        Self {
            identity: identity.into(),
            permissions,
        }
    }

    /// An unauthenticated principal: identified for quota scoping, granted
    /// nothing.
    pub fn anonymous(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            permissions: Permission::empty(),
        }
    }

    /// A principal granted a named role's mask, falling back to the table's
    /// default role when the name is unknown. None when neither resolves.
    pub fn from_role(
        identity: impl Into<String>,
        role_name: &str,
        roles: &RoleTable,
    ) -> Option<Self> {
        let role = roles.get(role_name).or_else(|| roles.default_role())?;
        Some(Self {
            identity: identity.into(),
            permissions: role.permissions(),
        })
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn permissions(&self) -> Permission {
        self.permissions
    }

    /// True when every bit of `required` is present in this principal's mask.
    pub fn can(&self, required: Permission) -> bool {
        self.permissions.contains(required)
    }

    /// True for principals carrying the administer bit.
    pub fn is_administrator(&self) -> bool {
        self.can(Permission::ADMINISTER)
    }
}
