use crate::error::{RateLimitError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Rate limiter configuration document.
///
/// ```yaml
/// global:
///   limit: 1000
///   window: 60
/// per_user:
///   limit: 100
///   window: 60
/// endpoints:
///   /api/data:
///     limit: 50
///     window: 60
/// ```
///
/// `global` and `per_user` are mandatory; they are optional here only so that
/// a missing section surfaces as a configuration error from [`validate`]
/// rather than as a parse error.
///
/// [`validate`]: RateLimiterConfig::validate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Limit applied to every request
    #[serde(default)]
    pub global: Option<ScopeLimitConfig>,
    /// Limit applied per caller identity (IP, API key, user id, ...)
    #[serde(default)]
    pub per_user: Option<ScopeLimitConfig>,
    /// Limits applied per endpoint name
    #[serde(default)]
    pub endpoints: HashMap<String, ScopeLimitConfig>,
}

/// Raw limit/window pair as written in the configuration document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeLimitConfig {
    /// Maximum number of admitted actions per window
    pub limit: i64,
    /// Window length in seconds
    pub window: i64,
}

impl ScopeLimitConfig {
    pub fn new(limit: i64, window: i64) -> Self {
        Self { limit, window }
    }
}

/// Validated, immutable limit for one scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeLimit {
    limit: u64,
    window: Duration,
}

impl ScopeLimit {
    /// Create a scope limit, rejecting a zero limit or an empty window
    pub fn new(limit: u64, window: Duration) -> Result<Self> {
        if limit == 0 {
            return Err(RateLimitError::Config(
                "Scope limit must be > 0".to_string(),
            ));
        }
        if window.is_zero() {
            return Err(RateLimitError::Config(
                "Scope window must be > 0".to_string(),
            ));
        }
        Ok(Self { limit, window })
    }

    /// Maximum number of admitted actions per window
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Window length
    pub fn window(&self) -> Duration {
        self.window
    }
}

impl TryFrom<&ScopeLimitConfig> for ScopeLimit {
    type Error = RateLimitError;

    fn try_from(raw: &ScopeLimitConfig) -> Result<Self> {
        if raw.limit <= 0 || raw.window <= 0 {
            return Err(RateLimitError::Config(format!(
                "limit and window must be > 0 (limit: {}, window: {})",
                raw.limit, raw.window
            )));
        }
        Ok(Self {
            limit: raw.limit as u64,
            window: Duration::from_secs(raw.window as u64),
        })
    }
}

impl RateLimiterConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| RateLimitError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.global_limit()?;
        self.per_user_limit()?;
        self.endpoint_limits()?;
        Ok(())
    }

    /// Validated global scope limit
    pub fn global_limit(&self) -> Result<ScopeLimit> {
        let global = self.global.as_ref().ok_or_else(|| {
            RateLimitError::Config("global rate limiter config is required".to_string())
        })?;
        ScopeLimit::try_from(global)
            .map_err(|e| RateLimitError::Config(format!("invalid global config: {}", e)))
    }

    /// Validated per-user scope limit
    pub fn per_user_limit(&self) -> Result<ScopeLimit> {
        let per_user = self
            .per_user
            .as_ref()
            .ok_or_else(|| RateLimitError::Config("user config is required".to_string()))?;
        ScopeLimit::try_from(per_user)
            .map_err(|e| RateLimitError::Config(format!("invalid per_user config: {}", e)))
    }

    /// Validated per-endpoint scope limits
    pub fn endpoint_limits(&self) -> Result<HashMap<String, ScopeLimit>> {
        let mut limits = HashMap::with_capacity(self.endpoints.len());
        for (name, raw) in &self.endpoints {
            if name.is_empty() {
                return Err(RateLimitError::Config(
                    "invalid endpoint config: endpoint name cannot be empty".to_string(),
                ));
            }
            let limit = ScopeLimit::try_from(raw).map_err(|e| {
                RateLimitError::Config(format!("invalid endpoint config for {}: {}", name, e))
            })?;
            limits.insert(name.clone(), limit);
        }
        Ok(limits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_config() {
        let yaml = r#"
global:
  limit: 1000
  window: 60
per_user:
  limit: 100
  window: 60
endpoints:
  /api/data:
    limit: 50
    window: 30
"#;

        let config = RateLimiterConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.global, Some(ScopeLimitConfig::new(1000, 60)));
        assert_eq!(config.per_user, Some(ScopeLimitConfig::new(100, 60)));
        assert_eq!(config.endpoints.len(), 1);
        assert!(config.validate().is_ok());

        let endpoints = config.endpoint_limits().unwrap();
        let data = endpoints.get("/api/data").unwrap();
        assert_eq!(data.limit(), 50);
        assert_eq!(data.window(), Duration::from_secs(30));
    }

    #[test]
    fn test_endpoints_default_to_empty() {
        let yaml = r#"
global: { limit: 2, window: 1 }
per_user: { limit: 1, window: 1 }
"#;

        let config = RateLimiterConfig::from_yaml(yaml).unwrap();
        assert!(config.endpoints.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_global() {
        let config = RateLimiterConfig {
            per_user: Some(ScopeLimitConfig::new(5, 60)),
            ..Default::default()
        };

        let err = config.validate().unwrap_err();
        assert!(err
            .to_string()
            .contains("global rate limiter config is required"));
    }

    #[test]
    fn test_missing_per_user() {
        let config = RateLimiterConfig {
            global: Some(ScopeLimitConfig::new(10, 60)),
            ..Default::default()
        };

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("user config is required"));
    }

    #[test]
    fn test_non_positive_values() {
        let config = RateLimiterConfig {
            global: Some(ScopeLimitConfig::new(0, 60)),
            per_user: Some(ScopeLimitConfig::new(5, 60)),
            ..Default::default()
        };
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("invalid global config"));

        let config = RateLimiterConfig {
            global: Some(ScopeLimitConfig::new(10, 60)),
            per_user: Some(ScopeLimitConfig::new(5, -1)),
            ..Default::default()
        };
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("invalid per_user config"));
    }

    #[test]
    fn test_invalid_endpoint_entries() {
        let yaml = r#"
global: { limit: 10, window: 60 }
per_user: { limit: 5, window: 60 }
endpoints:
  /foo: { limit: 5, window: -1 }
"#;
        let config = RateLimiterConfig::from_yaml(yaml).unwrap();
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("invalid endpoint config"));

        let mut config = RateLimiterConfig {
            global: Some(ScopeLimitConfig::new(10, 60)),
            per_user: Some(ScopeLimitConfig::new(5, 60)),
            ..Default::default()
        };
        config
            .endpoints
            .insert(String::new(), ScopeLimitConfig::new(1, 1));
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("endpoint name cannot be empty"));
    }

    #[test]
    fn test_malformed_yaml() {
        let result = RateLimiterConfig::from_yaml("global: [1, 2");
        assert!(matches!(result, Err(RateLimitError::Config(_))));
    }

    #[test]
    fn test_scope_limit_new() {
        assert!(ScopeLimit::new(0, Duration::from_secs(1)).is_err());
        assert!(ScopeLimit::new(1, Duration::ZERO).is_err());

        let limit = ScopeLimit::new(3, Duration::from_millis(250)).unwrap();
        assert_eq!(limit.limit(), 3);
        assert_eq!(limit.window(), Duration::from_millis(250));
    }
}
