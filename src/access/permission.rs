//! Permission masks and the role table.

use std::collections::HashMap;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TollgateError};

bitflags! {
    /// Capability bits granted to a principal.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permission: u8 {
        /// Follow other users.
        const FOLLOW     = 0x01;
        /// Comment on content.
        const COMMENT    = 0x02;
        /// Publish content.
        const WRITE      = 0x04;
        /// Moderate content from other users.
        const MODERATE   = 0x08;
        /// Full administrative access.
        const ADMINISTER = 0x80;
    }
}

/// The catch-all administrator mask. Covers every bit, defined or not, so
/// administrator checks keep passing when new capability bits are added.
pub const ADMINISTRATOR_MASK: u8 = 0xff;

/// A role's entry in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleConfig {
    /// Permission mask granted by this role
    pub permissions: u8,

    /// Whether principals without an assigned role fall back to this one
    #[serde(default)]
    pub default: bool,
}

/// A named permission mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    name: String,
    permissions: Permission,
    default: bool,
}

impl Role {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn permissions(&self) -> Permission {
        self.permissions
    }

    pub fn is_default(&self) -> bool {
        self.default
    }
}

/// The validated set of roles for a deployment.
///
/// Validation runs once at setup; lookups afterwards cannot fail.
#[derive(Debug, Clone, Default)]
pub struct RoleTable {
    roles: HashMap<String, Role>,
}

impl RoleTable {
    /// Build and validate a role table from configuration.
    ///
    /// Rejected configurations: masks with bits outside the defined set on
    /// non-administrator roles, administrator roles that do not cover every
    /// other role's bits, and more than one default role.
    pub fn from_config(config: &HashMap<String, RoleConfig>) -> Result<Self> {
        let mut roles = HashMap::with_capacity(config.len());

        for (name, role_config) in config {
            let permissions = Permission::from_bits_retain(role_config.permissions);
            if !permissions.contains(Permission::ADMINISTER)
                && role_config.permissions & !Permission::all().bits() != 0
            {
                return Err(TollgateError::Config(format!(
                    "role '{}' has unknown permission bits: {:#04x}",
                    name, role_config.permissions
                )));
            }
            roles.insert(
                name.clone(),
                Role {
                    name: name.clone(),
                    permissions,
                    default: role_config.default,
                },
            );
        }

        let defaults = roles.values().filter(|role| role.default).count();
        if defaults > 1 {
            return Err(TollgateError::Config(
                "more than one default role configured".into(),
            ));
        }

        for admin in roles
            .values()
            .filter(|role| role.permissions.contains(Permission::ADMINISTER))
        {
            for other in roles.values() {
                if !admin.permissions.contains(other.permissions) {
                    return Err(TollgateError::Config(format!(
                        "administrator role '{}' (mask {:#04x}) must cover role '{}' (mask {:#04x})",
                        admin.name,
                        admin.permissions.bits(),
                        other.name,
                        other.permissions.bits()
                    )));
                }
            }
        }

        Ok(Self { roles })
    }

    /// The classic table: user (default), moderator, administrator.
    pub fn builtin() -> Self {
        let user = Permission::FOLLOW | Permission::COMMENT | Permission::WRITE;
        let moderator = user | Permission::MODERATE;
        let administrator = Permission::from_bits_retain(ADMINISTRATOR_MASK);

        let mut roles = HashMap::new();
        roles.insert(
            "user".to_string(),
            Role {
                name: "user".to_string(),
                permissions: user,
                default: true,
            },
        );
        roles.insert(
            "moderator".to_string(),
            Role {
                name: "moderator".to_string(),
                permissions: moderator,
                default: false,
            },
        );
        roles.insert(
            "administrator".to_string(),
            Role {
                name: "administrator".to_string(),
                permissions: administrator,
                default: false,
            },
        );
        Self { roles }
    }

    /// Look up a role by name.
    pub fn get(&self, name: &str) -> Option<&Role> {
        self.roles.get(name)
    }

    /// The role principals fall back to, if one is configured.
    pub fn default_role(&self) -> Option<&Role> {
        self.roles.values().find(|role| role.default)
    }

    /// Number of roles in the table.
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}
