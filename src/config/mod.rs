use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable prefix. Nested keys are separated by `__`,
/// e.g. `CONTEXTUAL__CACHE__MAX_ENTRIES`.
pub const ENV_PREFIX: &str = "CONTEXTUAL";

/// Default configuration file name (without extension), looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "contextual";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub activation: ActivationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: u64,
    pub ttl_seconds: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true, max_entries: 10_000, ttl_seconds: 300 }
    }
}

/// What to do when a request names a layer no registered base method carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnknownLayerPolicy {
    /// Fail with `LayerError::UnknownLayer`.
    #[default]
    Reject,
    /// Drop the request silently.
    Ignore,
}

impl std::fmt::Display for UnknownLayerPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnknownLayerPolicy::Reject => write!(f, "reject"),
            UnknownLayerPolicy::Ignore => write!(f, "ignore"),
        }
    }
}

impl std::str::FromStr for UnknownLayerPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reject" => Ok(UnknownLayerPolicy::Reject),
            "ignore" => Ok(UnknownLayerPolicy::Ignore),
            _ => Err(format!("Invalid unknown-layer policy: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivationConfig {
    pub unknown_layer: UnknownLayerPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: "contextual=info".to_string(), json: false }
    }
}

impl Config {
    /// Load from `contextual.{toml,yaml,json}` in the working directory (optional)
    /// and `CONTEXTUAL__*` environment variables.
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(DEFAULT_CONFIG_FILE).required(false))
            .add_source(environment())
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Load from an explicit file, still letting environment variables override it.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from(path).required(true))
            .add_source(environment())
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn from_toml_str(source: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_config_default_values() {
        let config = Config::default();

        assert!(config.cache.enabled);
        assert_eq!(config.cache.max_entries, 10_000);
        assert_eq!(config.cache.ttl_seconds, 300);
        assert_eq!(config.cache.ttl(), Duration::from_secs(300));

        assert_eq!(config.activation.unknown_layer, UnknownLayerPolicy::Reject);

        assert_eq!(config.logging.filter, "contextual=info");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_policy_display() {
        assert_eq!(UnknownLayerPolicy::Reject.to_string(), "reject");
        assert_eq!(UnknownLayerPolicy::Ignore.to_string(), "ignore");
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("reject".parse::<UnknownLayerPolicy>().unwrap(), UnknownLayerPolicy::Reject);
        assert_eq!("IGNORE".parse::<UnknownLayerPolicy>().unwrap(), UnknownLayerPolicy::Ignore);
        assert!("maybe".parse::<UnknownLayerPolicy>().is_err());
    }

    #[test]
    fn test_config_deserialization_partial() {
        let json = r#"{
            "cache": { "max_entries": 5000 },
            "activation": { "unknown_layer": "ignore" }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.cache.enabled);
        assert_eq!(config.cache.max_entries, 5000);
        assert_eq!(config.cache.ttl_seconds, 300);
        assert_eq!(config.activation.unknown_layer, UnknownLayerPolicy::Ignore);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_toml_round_trip_of_defaults() {
        let config = Config::default();
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("[cache]"));
        assert!(text.contains("unknown_layer = \"reject\""));
        assert_eq!(Config::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_from_toml_rejects_bad_policy() {
        let result = Config::from_toml_str("[activation]\nunknown_layer = \"sometimes\"\n");
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_load_without_sources_uses_defaults() {
        let config = Config::load().unwrap();
        assert_eq!(config.cache.max_entries, CacheConfig::default().max_entries);
    }

    #[test]
    #[serial]
    fn test_load_reads_environment_overrides() {
        unsafe {
            std::env::set_var("CONTEXTUAL__CACHE__ENABLED", "false");
            std::env::set_var("CONTEXTUAL__ACTIVATION__UNKNOWN_LAYER", "ignore");
        }

        let config = Config::load();

        unsafe {
            std::env::remove_var("CONTEXTUAL__CACHE__ENABLED");
            std::env::remove_var("CONTEXTUAL__ACTIVATION__UNKNOWN_LAYER");
        }

        let config = config.unwrap();
        assert!(!config.cache.enabled);
        assert_eq!(config.activation.unknown_layer, UnknownLayerPolicy::Ignore);
    }
}
