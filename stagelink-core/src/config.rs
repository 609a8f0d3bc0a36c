use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::events::DuplicatePolicy;

/// Engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub request: RequestConfig,
    pub room: RoomConfig,
    pub observer: ObserverConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Default timeout in seconds for tracked requests when the caller
    /// passes none; 0 disables timeout supervision
    pub default_timeout_seconds: u64,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            default_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Default seat count for rooms created with seat control enabled but
    /// no explicit max_seat_count
    pub default_seat_count: usize,
    /// Hard cap on max_seat_count
    pub max_seat_count: usize,
    /// Maximum members per room, 0 for unlimited
    pub max_member_count: usize,
    /// Maximum simultaneous cross-room connections per room
    pub max_connected_room_count: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            default_seat_count: 8,
            max_seat_count: 64,
            max_member_count: 0,
            max_connected_room_count: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObserverConfig {
    /// Duplicate registration policy for every observer registry
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::DeliverTwice,
        }
    }
}

impl Config {
    /// Load configuration from an optional file plus `STAGELINK_`-prefixed
    /// environment overrides, falling back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        builder
            .add_source(Environment::with_prefix("STAGELINK").separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.request.default_timeout_seconds, 30);
        assert_eq!(config.room.default_seat_count, 8);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.observer.duplicate_policy, DuplicatePolicy::DeliverTwice);
    }

    #[test]
    fn test_load_without_file() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.room.max_connected_room_count, 4);
    }
}
