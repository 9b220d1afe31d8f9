//! Monitor configuration loading from TOML files.
//!
//! Default location: `/etc/netmond/<daemon>.conf`. A missing file yields the
//! defaults; a malformed file is an error.

use crate::error::{NetmondError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Record-store (Redis) connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis host.
    #[serde(default = "default_redis_host")]
    pub host: String,

    /// Redis port.
    #[serde(default = "default_redis_port")]
    pub port: u16,

    /// Redis database number.
    #[serde(default)]
    pub db: u32,

    /// Optional password. Usually left unset here and supplied through the
    /// per-worker secret lookup instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Capture facility settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Explicit interface list. Empty means all non-loopback interfaces.
    #[serde(default)]
    pub interfaces: Vec<String>,

    /// Override for the worker's capture filter expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    /// Capture snapshot length in bytes.
    #[serde(default = "default_snaplen")]
    pub snaplen: i32,

    /// Whether to put interfaces into promiscuous mode.
    #[serde(default = "default_promiscuous")]
    pub promiscuous: bool,
}

/// Complete monitor daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub redis: RedisConfig,

    #[serde(default)]
    pub capture: CaptureConfig,
}

fn default_redis_host() -> String {
    "127.0.0.1".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

fn default_snaplen() -> i32 {
    65535
}

fn default_promiscuous() -> bool {
    true
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: default_redis_host(),
            port: default_redis_port(),
            db: 0,
            password: None,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interfaces: Vec::new(),
            filter: None,
            snaplen: default_snaplen(),
            promiscuous: default_promiscuous(),
        }
    }
}

impl RedisConfig {
    /// Returns the Redis connection URI.
    pub fn uri(&self) -> String {
        match &self.password {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                password, self.host, self.port, self.db
            ),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }
}

impl MonitorConfig {
    /// Load configuration from file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                NetmondError::Config(format!("failed to parse {}: {}", path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(NetmondError::Io(e)),
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.redis.port == 0 {
            return Err(NetmondError::Config("redis.port must be > 0".to_string()));
        }
        if self.capture.snaplen <= 0 {
            return Err(NetmondError::Config(
                "capture.snaplen must be > 0".to_string(),
            ));
        }
        if let Some(filter) = &self.capture.filter {
            if filter.trim().is_empty() {
                return Err(NetmondError::Config(
                    "capture.filter must not be blank".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = MonitorConfig::default();
        assert_eq!(config.redis.host, "127.0.0.1");
        assert_eq!(config.redis.port, 6379);
        assert_eq!(config.redis.db, 0);
        assert_eq!(config.capture.snaplen, 65535);
        assert!(config.capture.promiscuous);
        assert!(config.capture.interfaces.is_empty());
    }

    #[test]
    fn test_redis_uri() {
        let config = RedisConfig::default();
        assert_eq!(config.uri(), "redis://127.0.0.1:6379/0");

        let with_password = RedisConfig {
            password: Some("hunter2".to_string()),
            ..RedisConfig::default()
        };
        assert_eq!(with_password.uri(), "redis://:hunter2@127.0.0.1:6379/0");
    }

    #[test]
    fn test_toml_partial_deserialization() {
        let toml_str = r#"
[redis]
host = "10.0.0.7"

[capture]
interfaces = ["wlx0023cafebabe"]
"#;
        let config: MonitorConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.redis.host, "10.0.0.7");
        assert_eq!(config.redis.port, 6379);
        assert_eq!(config.capture.interfaces, vec!["wlx0023cafebabe"]);
        assert_eq!(config.capture.snaplen, 65535);
    }

    #[test]
    fn test_validate_rejects_zero_port() {
        let mut config = MonitorConfig::default();
        config.redis.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_filter() {
        let mut config = MonitorConfig::default();
        config.capture.filter = Some("   ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_nonexistent_file_defaults() {
        let config = MonitorConfig::load_or_default("/nonexistent/netmond.conf").unwrap();
        assert_eq!(config.redis.host, "127.0.0.1");
    }

    #[test]
    fn test_load_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.conf");
        std::fs::write(&path, "not = [valid").unwrap();
        assert!(MonitorConfig::load_or_default(&path).is_err());
    }
}
