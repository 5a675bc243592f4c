use serde::{Deserialize, Serialize};

use crate::error::{CacheError, CacheResult};

/// Namespace prefix used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "ofb_";

/// Configuration for the offline cache.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Prefix reserved for cache entries in the durable store. Every key the
    /// cache writes starts with it, and [`crate::clear_all`] removes every
    /// key that does.
    pub namespace: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl CacheConfig {
    /// A configuration with a custom namespace.
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// Reject namespaces that would make the cache's keys ambiguous.
    ///
    /// An empty namespace would let `clear_all` delete foreign entries, and a
    /// `/` would be confused with the path part of a key.
    pub fn validate(&self) -> CacheResult<()> {
        if self.namespace.is_empty() {
            return Err(CacheError::InvalidConfig(
                "namespace must not be empty".into(),
            ));
        }
        if self.namespace.contains('/') {
            return Err(CacheError::InvalidConfig(format!(
                "namespace must not contain '/': {:?}",
                self.namespace
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = CacheConfig::default();
        assert_eq!(c.namespace, "ofb_");
        assert!(c.validate().is_ok());
    }

    #[test]
    fn empty_namespace_is_invalid() {
        let err = CacheConfig::with_namespace("").validate().unwrap_err();
        assert!(matches!(err, CacheError::InvalidConfig(_)));
    }

    #[test]
    fn slash_in_namespace_is_invalid() {
        assert!(CacheConfig::with_namespace("app/").validate().is_err());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let c: CacheConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(c, CacheConfig::default());
        let c: CacheConfig = serde_json::from_str(r#"{"namespace":"app_"}"#).unwrap();
        assert_eq!(c.namespace, "app_");
    }
}
