use std::time::Duration;

use serde::{Deserialize, Serialize};
use skein_store::DispatchConfig;

use crate::error::{StreamError, StreamResult};

/// Configuration for a [`Stream`](crate::Stream) handle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Concurrent upload attempts per blob; all must agree on the address.
    pub redundancy: usize,
    /// Download cap for node documents.
    pub max_node_size: u64,
    /// Download cap for payload chunks.
    pub max_payload_size: u64,
    /// Bound on every single upload or download attempt.
    pub transfer_timeout: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            redundancy: 2,
            max_node_size: 4 * 1024 * 1024,
            max_payload_size: 64 * 1024 * 1024,
            transfer_timeout: Duration::from_secs(60),
        }
    }
}

impl StreamConfig {
    /// Parse a configuration from TOML. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> StreamResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| StreamError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> StreamResult<String> {
        toml::to_string(self).map_err(|e| StreamError::Config(e.to_string()))
    }

    /// Reject values no stream can operate with.
    pub fn validate(&self) -> StreamResult<()> {
        if self.redundancy == 0 {
            return Err(StreamError::Config("redundancy must be at least 1".into()));
        }
        if self.transfer_timeout.is_zero() {
            return Err(StreamError::Config("transfer_timeout must be non-zero".into()));
        }
        Ok(())
    }

    /// Upload dispatcher settings derived from this configuration.
    pub fn dispatch(&self) -> DispatchConfig {
        DispatchConfig {
            redundancy: self.redundancy,
            timeout: self.transfer_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = StreamConfig::default();
        assert_eq!(c.redundancy, 2);
        assert_eq!(c.transfer_timeout, Duration::from_secs(60));
        assert_eq!(c.max_node_size, 4 * 1024 * 1024);
        assert_eq!(c.max_payload_size, 64 * 1024 * 1024);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = StreamConfig::from_toml_str("redundancy = 3\nmax_payload_size = 1024\n").unwrap();
        assert_eq!(c.redundancy, 3);
        assert_eq!(c.max_payload_size, 1024);
        assert_eq!(c.transfer_timeout, Duration::from_secs(60));
    }

    #[test]
    fn toml_roundtrip() {
        let c = StreamConfig {
            redundancy: 4,
            transfer_timeout: Duration::from_millis(1500),
            ..Default::default()
        };
        let text = c.to_toml_string().unwrap();
        assert_eq!(StreamConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn invalid_values_rejected() {
        let err = StreamConfig::from_toml_str("redundancy = 0").unwrap_err();
        assert!(matches!(err, StreamError::Config(_)));
        assert!(StreamConfig::from_toml_str("redundancy = \"two\"").is_err());
    }

    #[test]
    fn dispatch_follows_stream_settings() {
        let c = StreamConfig {
            redundancy: 3,
            transfer_timeout: Duration::from_secs(5),
            ..Default::default()
        };
        let d = c.dispatch();
        assert_eq!(d.redundancy, 3);
        assert_eq!(d.timeout, Duration::from_secs(5));
    }
}
