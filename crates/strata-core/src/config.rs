//! Engine configuration.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Configuration for the dispatch engine.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct EngineConfig {
    /// Actor reported as the origin of notifications.
    #[builder(default = "default_actor()")]
    #[serde(default = "default_actor")]
    pub actor: String,

    /// Directory holding user packages; deleting an entry directly inside it
    /// requests package metadata regeneration.
    #[builder(default = "default_package_dir()")]
    #[serde(default = "default_package_dir")]
    pub package_dir: String,

    /// Capacity of the notification broadcast channel.
    #[builder(default = "64")]
    #[serde(default = "default_notification_capacity")]
    pub notification_capacity: usize,
}

fn default_actor() -> String {
    "system".to_string()
}

fn default_package_dir() -> String {
    "home:///.packages".to_string()
}

fn default_notification_capacity() -> usize {
    64
}

impl EngineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(capacity) = self.notification_capacity {
            if capacity == 0 {
                return Err("Notification capacity must be at least 1".to_string());
            }
        }
        if let Some(ref actor) = self.actor {
            if actor.is_empty() {
                return Err("Actor cannot be empty".to_string());
            }
        }
        Ok(())
    }
}

impl EngineConfig {
    /// Create a new engine config builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            actor: default_actor(),
            package_dir: default_package_dir(),
            notification_capacity: default_notification_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = EngineConfig::builder()
            .actor("alice")
            .notification_capacity(8usize)
            .build()
            .unwrap();

        assert_eq!(config.actor, "alice");
        assert_eq!(config.notification_capacity, 8);
        assert_eq!(config.package_dir, "home:///.packages");
    }

    #[test]
    fn test_config_rejects_zero_capacity() {
        let result = EngineConfig::builder().notification_capacity(0usize).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_config_deserialize_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{ "actor": "bob" }"#).unwrap();
        assert_eq!(config.actor, "bob");
        assert_eq!(config.notification_capacity, 64);
    }
}
