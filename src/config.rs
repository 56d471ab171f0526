//! Resolver configuration loaded from TOML.

use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "dns-walker.toml";

/// a.root-servers.net
pub const DEFAULT_ROOT_HINT: Ipv4Addr = Ipv4Addr::new(198, 41, 0, 4);

/// Settings for the iterative resolver.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// Root nameserver every walk starts from.
    #[serde(default = "default_root_hint")]
    pub root_hint: Ipv4Addr,

    /// Port nameservers listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// How long one hop may wait for a reply, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Extra attempts against the same server after a failed hop.
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Servers one walk may query before giving up.
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,

    /// How deeply nameserver-name lookups may nest.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            root_hint: default_root_hint(),
            port: default_port(),
            timeout_ms: default_timeout_ms(),
            retries: default_retries(),
            max_hops: default_max_hops(),
            max_depth: default_max_depth(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_root_hint() -> Ipv4Addr {
    DEFAULT_ROOT_HINT
}

fn default_port() -> u16 {
    53
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_retries() -> u32 {
    1
}

fn default_max_hops() -> usize {
    16
}

fn default_max_depth() -> usize {
    4
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ResolverConfig {
    /// Loads configuration from file or falls back to defaults.
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. `dns-walker.toml` in the current directory
    /// 3. Default configuration
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let config = if let Some(path) = path {
            Self::from_file(path)?
        } else if Path::new(DEFAULT_CONFIG_FILE).exists() {
            Self::from_file(DEFAULT_CONFIG_FILE)?
        } else {
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Validation("port cannot be 0".to_string()));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::Validation("timeout_ms cannot be 0".to_string()));
        }
        if self.max_hops == 0 {
            return Err(ConfigError::Validation("max_hops cannot be 0".to_string()));
        }
        if self.max_depth == 0 {
            return Err(ConfigError::Validation("max_depth cannot be 0".to_string()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ResolverConfig::default();
        assert_eq!(config.root_hint, Ipv4Addr::new(198, 41, 0, 4));
        assert_eq!(config.port, 53);
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.retries, 1);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ResolverConfig::from_toml(
            r#"
            root_hint = "199.9.14.201"
            timeout_ms = 1500

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.root_hint, Ipv4Addr::new(199, 9, 14, 201));
        assert_eq!(config.timeout(), Duration::from_millis(1500));
        assert_eq!(config.port, 53);
        assert_eq!(config.max_hops, 16);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(
            ResolverConfig::from_toml("").unwrap(),
            ResolverConfig::default()
        );
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            ResolverConfig::from_toml("root_hint = \"not-an-ip\""),
            Err(ConfigError::Parse(_))
        ));

        let config = ResolverConfig {
            max_hops: 0,
            ..ResolverConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));

        let config = ResolverConfig {
            timeout_ms: 0,
            ..ResolverConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = ResolverConfig::load(Some("/nonexistent/dns-walker.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead(path, _) if path.ends_with("dns-walker.toml")));
    }
}
