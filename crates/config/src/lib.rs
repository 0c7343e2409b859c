//! # Config - extractor settings
//!
//! Every setting the extractor needs is carried in an [`ExtractorConfig`]
//! value that the caller builds once and hands to the extractor. Nothing
//! below the CLI reads process environment on its own.
//!
//! ## Environment variables
//!
//! ```text
//! TLOG_CONTAINER_PREFIX  key prefix of container-log records (default: "container_")
//! TLOG_WRITE_BUFFER_KB   output file buffer size in KiB       (default: 64)
//! TLOG_LOG               tracing filter directive             (default: "info")
//! ```

use thiserror::Error;

/// Key prefix YARN uses for records holding a container's log files.
pub const DEFAULT_CONTAINER_PREFIX: &str = "container_";

/// Default output buffer size in KiB.
pub const DEFAULT_WRITE_BUFFER_KB: usize = 64;

/// Default tracing filter.
pub const DEFAULT_LOG_FILTER: &str = "info";

pub const ENV_CONTAINER_PREFIX: &str = "TLOG_CONTAINER_PREFIX";
pub const ENV_WRITE_BUFFER_KB: &str = "TLOG_WRITE_BUFFER_KB";
pub const ENV_LOG_FILTER: &str = "TLOG_LOG";

/// Errors raised while loading configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was set but could not be parsed.
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Settings injected into the extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorConfig {
    /// Records whose key starts with this prefix hold container log files.
    pub container_key_prefix: String,
    /// Capacity of the buffer in front of every output file, in bytes.
    pub write_buffer_bytes: usize,
    /// Filter directive for the tracing subscriber (e.g. `"info"`, `"extractor=debug"`).
    pub log_filter: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            container_key_prefix: DEFAULT_CONTAINER_PREFIX.to_string(),
            write_buffer_bytes: DEFAULT_WRITE_BUFFER_KB * 1024,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl ExtractorConfig {
    /// Loads the configuration from the process environment, falling back
    /// to the defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration through `lookup`, which returns the raw value
    /// of a variable or `None` when it is unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(prefix) = lookup(ENV_CONTAINER_PREFIX) {
            if prefix.is_empty() {
                return Err(ConfigError::Invalid {
                    key: ENV_CONTAINER_PREFIX,
                    value: prefix,
                    reason: "prefix must not be empty".to_string(),
                });
            }
            config.container_key_prefix = prefix;
        }

        if let Some(raw) = lookup(ENV_WRITE_BUFFER_KB) {
            let kb: usize = raw.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::Invalid {
                    key: ENV_WRITE_BUFFER_KB,
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?;
            if kb == 0 {
                return Err(ConfigError::Invalid {
                    key: ENV_WRITE_BUFFER_KB,
                    value: raw,
                    reason: "buffer size must be at least 1 KiB".to_string(),
                });
            }
            config.write_buffer_bytes = kb * 1024;
        }

        if let Some(filter) = lookup(ENV_LOG_FILTER) {
            config.log_filter = filter;
        }

        Ok(config)
    }

    /// Returns `true` if `key` names a container-log record.
    #[must_use]
    pub fn is_container_key(&self, key: &str) -> bool {
        key.starts_with(&self.container_key_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = ExtractorConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, ExtractorConfig::default());
        assert_eq!(config.container_key_prefix, "container_");
        assert_eq!(config.write_buffer_bytes, 64 * 1024);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn overrides_are_applied() {
        let config = ExtractorConfig::from_lookup(lookup_from(&[
            (ENV_CONTAINER_PREFIX, "ctr-"),
            (ENV_WRITE_BUFFER_KB, "8"),
            (ENV_LOG_FILTER, "debug"),
        ]))
        .unwrap();

        assert_eq!(config.container_key_prefix, "ctr-");
        assert_eq!(config.write_buffer_bytes, 8 * 1024);
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn bad_buffer_size_is_rejected() {
        let err = ExtractorConfig::from_lookup(lookup_from(&[(ENV_WRITE_BUFFER_KB, "lots")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key, .. } if key == ENV_WRITE_BUFFER_KB));

        let err = ExtractorConfig::from_lookup(lookup_from(&[(ENV_WRITE_BUFFER_KB, "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn empty_prefix_is_rejected() {
        let err = ExtractorConfig::from_lookup(lookup_from(&[(ENV_CONTAINER_PREFIX, "")]))
            .unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn container_key_classification() {
        let config = ExtractorConfig::default();
        assert!(config.is_container_key("container_1520000000000_0001_01_000001"));
        assert!(!config.is_container_key("VERSION"));
        assert!(!config.is_container_key("APPLICATION_OWNER"));
        assert!(!config.is_container_key("Container_001"));
    }
}
