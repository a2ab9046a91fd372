//! Quota rules configuration and lookup.
//!
//! Rules map endpoints to policies. An exact endpoint match wins; everything
//! else falls through to the default rule.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::error::{Result, TollgateError};

use super::limiter::RatePolicy;

/// A single quota rule from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaRule {
    /// Requests allowed per window
    pub limit: u64,
    /// Window period in seconds
    pub period_secs: u64,
}

impl QuotaRule {
    fn to_policy(&self) -> Result<RatePolicy> {
        RatePolicy::new(self.limit, self.period_secs)
    }
}

/// Per-endpoint quota rules with a default fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaRules {
    /// Rule applied when no endpoint-specific rule matches
    #[serde(default = "default_rule")]
    pub default: QuotaRule,

    /// Endpoint-specific overrides, keyed by endpoint name
    #[serde(default)]
    pub endpoints: HashMap<String, QuotaRule>,
}

impl Default for QuotaRules {
    fn default() -> Self {
        Self {
            default: default_rule(),
            endpoints: HashMap::new(),
        }
    }
}

fn default_rule() -> QuotaRule {
    QuotaRule {
        limit: 1000,
        period_secs: 60,
    }
}

impl QuotaRules {
    /// Create rules with only the default policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load rules from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading quota rules");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load rules from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let rules: QuotaRules = serde_yaml::from_str(yaml)
            .map_err(|e| TollgateError::Config(format!("Failed to parse quota rules: {}", e)))?;
        rules.validate()?;
        Ok(rules)
    }

    /// Reject rules with zero limits or zero periods.
    pub fn validate(&self) -> Result<()> {
        self.default.to_policy().map_err(|_| {
            TollgateError::Config("default quota rule: limit and period must be positive".into())
        })?;
        for (endpoint, rule) in &self.endpoints {
            rule.to_policy().map_err(|_| {
                TollgateError::Config(format!(
                    "quota rule for endpoint '{}': limit and period must be positive",
                    endpoint
                ))
            })?;
        }
        Ok(())
    }

    /// The policy for an endpoint: its exact-match override or the default.
    pub fn policy_for(&self, endpoint: &str) -> RatePolicy {
        let rule = self.endpoints.get(endpoint).unwrap_or(&self.default);
        rule.to_policy().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_rules() {
        let yaml = r#"
default:
  limit: 100
  period_secs: 60
endpoints:
  items.create:
    limit: 10
    period_secs: 60
"#;
        let rules = QuotaRules::from_yaml(yaml).unwrap();
        assert_eq!(rules.default.limit, 100);
        assert_eq!(rules.endpoints["items.create"].limit, 10);
    }

    #[test]
    fn test_policy_for_prefers_exact_match() {
        let yaml = r#"
default:
  limit: 100
  period_secs: 60
endpoints:
  items.create:
    limit: 10
    period_secs: 900
"#;
        let rules = QuotaRules::from_yaml(yaml).unwrap();

        let policy = rules.policy_for("items.create");
        assert_eq!(policy.limit(), 10);
        assert_eq!(policy.period_secs(), 900);

        let policy = rules.policy_for("items.list");
        assert_eq!(policy.limit(), 100);
        assert_eq!(policy.period_secs(), 60);
    }

    #[test]
    fn test_missing_sections_fall_back_to_defaults() {
        let rules = QuotaRules::from_yaml("{}").unwrap();
        assert_eq!(rules.default.limit, 1000);
        assert_eq!(rules.default.period_secs, 60);
        assert!(rules.endpoints.is_empty());
    }

    #[test]
    fn test_zero_limit_is_rejected() {
        let yaml = r#"
endpoints:
  items.create:
    limit: 0
    period_secs: 60
"#;
        let err = QuotaRules::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("items.create"));
    }

    #[test]
    fn test_zero_period_is_rejected() {
        let yaml = r#"
default:
  limit: 10
  period_secs: 0
"#;
        assert!(QuotaRules::from_yaml(yaml).is_err());
    }
}
