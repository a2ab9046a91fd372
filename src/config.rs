//! Configuration management for Tollgate.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::access::{Permission, RoleConfig, RoleTable, ADMINISTRATOR_MASK};
use crate::error::{Result, TollgateError};
use crate::ratelimit::QuotaRules;
use crate::store::StoreConfig;

/// Main configuration for the Tollgate middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TollgateConfig {
    /// Quota store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Quota rules
    #[serde(default)]
    pub quotas: QuotaRules,

    /// Role table, keyed by role name
    #[serde(default = "default_roles")]
    pub roles: HashMap<String, RoleConfig>,
}

impl Default for TollgateConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            quotas: QuotaRules::default(),
            roles: default_roles(),
        }
    }
}

fn default_roles() -> HashMap<String, RoleConfig> {
    let user = Permission::FOLLOW | Permission::COMMENT | Permission::WRITE;
    let moderator = user | Permission::MODERATE;

    let mut roles = HashMap::new();
    roles.insert(
        "user".to_string(),
        RoleConfig {
            permissions: user.bits(),
            default: true,
        },
    );
    roles.insert(
        "moderator".to_string(),
        RoleConfig {
            permissions: moderator.bits(),
            default: false,
        },
    );
    roles.insert(
        "administrator".to_string(),
        RoleConfig {
            permissions: ADMINISTRATOR_MASK,
            default: false,
        },
    );
    roles
}

impl TollgateConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: TollgateConfig = serde_yaml::from_str(yaml)
            .map_err(|e| TollgateError::Config(format!("Failed to parse configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section, including role table consistency.
    pub fn validate(&self) -> Result<()> {
        self.store.validate()?;
        self.quotas.validate()?;
        RoleTable::from_config(&self.roles)?;
        Ok(())
    }

    /// Build the role table from the configured roles.
    pub fn role_table(&self) -> Result<RoleTable> {
        RoleTable::from_config(&self.roles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TollgateConfig::default();

        assert_eq!(config.store.url, "redis://127.0.0.1:6379");
        assert_eq!(config.quotas.default.limit, 1000);
        assert!(config.roles.contains_key("administrator"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() -> anyhow::Result<()> {
        let yaml = r#"
store:
  url: redis://cache.internal:6379
  key_prefix: edge
  op_timeout_ms: 250
quotas:
  default:
    limit: 300
    period_secs: 60
  endpoints:
    items.create:
      limit: 30
      period_secs: 60
roles:
  reader:
    permissions: 3
    default: true
  administrator:
    permissions: 255
"#;
        let config = TollgateConfig::from_yaml(yaml)?;

        assert_eq!(config.store.key_prefix, "edge");
        assert_eq!(config.quotas.endpoints["items.create"].limit, 30);

        let roles = config.role_table()?;
        assert_eq!(roles.len(), 2);
        assert_eq!(roles.default_role().unwrap().name(), "reader");
        Ok(())
    }

    #[test]
    fn test_missing_sections_use_defaults() -> anyhow::Result<()> {
        let config = TollgateConfig::from_yaml("{}")?;

        assert_eq!(config.store.url, "redis://127.0.0.1:6379");
        assert_eq!(config.quotas.default.limit, 1000);

        let roles = config.role_table()?;
        assert_eq!(roles.default_role().unwrap().name(), "user");
        assert!(roles
            .get("administrator")
            .unwrap()
            .permissions()
            .contains(Permission::ADMINISTER));
        Ok(())
    }

    #[test]
    fn test_default_roles_match_builtin_table() {
        let config = TollgateConfig::default();
        let from_config = config.role_table().unwrap();
        let builtin = RoleTable::builtin();

        for name in ["user", "moderator", "administrator"] {
            assert_eq!(
                from_config.get(name).unwrap().permissions(),
                builtin.get(name).unwrap().permissions(),
            );
        }
    }

    #[test]
    fn test_invalid_role_table_is_rejected() {
        let yaml = r#"
roles:
  broken:
    permissions: 16
"#;
        let err = TollgateConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_invalid_quota_is_rejected() {
        let yaml = r#"
quotas:
  default:
    limit: 0
    period_secs: 60
"#;
        assert!(TollgateConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let err = TollgateConfig::from_file("/nonexistent/tollgate.yml").unwrap_err();
        assert!(matches!(err, TollgateError::Io(_)));
    }
}
