//! Spatial settings
//!
//! Every field has a default, so a settings file only needs to name what it
//! overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// What a full bucket does with one more entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapacityPolicy {
    /// Grow the bucket past its nominal capacity and warn once per bucket.
    #[default]
    Grow,
    /// Refuse the insert with `SpatialError::CapacityExceeded`.
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialSettings {
    pub grid: GridConfig,
    pub broad_phase: BroadPhaseConfig,
    pub nearby: NearbyCacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Edge length of a square cell, in world units.
    pub cell_size: f32,
    /// Nominal entities per cell; buckets are preallocated to this size.
    pub bucket_capacity: usize,
    pub capacity_policy: CapacityPolicy,
    /// Largest number of cells one entity may cover; bigger boxes are refused.
    pub max_cells_per_entity: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadPhaseConfig {
    /// Pool threads besides the calling thread. Zero scans serially.
    pub worker_threads: usize,
    /// Pairs reserved per buffer up front.
    pub pair_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NearbyCacheConfig {
    pub origin_epsilon: f32,
    pub radius_epsilon: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_size: 64.0,
            bucket_capacity: 32,
            capacity_policy: CapacityPolicy::Grow,
            max_cells_per_entity: 1024,
        }
    }
}

impl Default for BroadPhaseConfig {
    fn default() -> Self {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            worker_threads: cores.saturating_sub(1).min(7),
            pair_capacity: 1000,
        }
    }
}

impl Default for NearbyCacheConfig {
    fn default() -> Self {
        Self {
            origin_epsilon: 0.5,
            radius_epsilon: 0.5,
        }
    }
}

impl Default for SpatialSettings {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            broad_phase: BroadPhaseConfig::default(),
            nearby: NearbyCacheConfig::default(),
        }
    }
}

impl SpatialSettings {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.grid.cell_size.is_finite() && self.grid.cell_size > 0.0) {
            return Err(ConfigError::Invalid {
                field: "grid.cell_size",
                reason: format!("must be positive and finite, got {}", self.grid.cell_size),
            });
        }
        if self.grid.bucket_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "grid.bucket_capacity",
                reason: "must be at least 1".into(),
            });
        }
        if self.grid.max_cells_per_entity == 0 {
            return Err(ConfigError::Invalid {
                field: "grid.max_cells_per_entity",
                reason: "must be at least 1".into(),
            });
        }
        for (field, value) in [
            ("nearby.origin_epsilon", self.nearby.origin_epsilon),
            ("nearby.radius_epsilon", self.nearby.radius_epsilon),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be finite and non-negative, got {value}"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let settings =
            SpatialSettings::from_json_str(r#"{ "grid": { "capacity_policy": "reject" } }"#)
                .unwrap();
        assert_eq!(settings.grid.capacity_policy, CapacityPolicy::Reject);
        assert_eq!(settings.grid.cell_size, 64.0);
        assert_eq!(settings.grid.bucket_capacity, 32);
        assert_eq!(settings.nearby.origin_epsilon, 0.5);
    }

    #[test]
    fn zero_cell_size_is_rejected() {
        let err = SpatialSettings::from_json_str(r#"{ "grid": { "cell_size": 0.0 } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "grid.cell_size", .. }));
    }

    #[test]
    fn zero_cell_limit_is_rejected() {
        let err = SpatialSettings::from_json_str(r#"{ "grid": { "max_cells_per_entity": 0 } }"#)
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { field: "grid.max_cells_per_entity", .. }
        ));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(
            SpatialSettings::from_json_str("{ grid"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn defaults_survive_a_json_round_trip() {
        let json = SpatialSettings::default().to_json_pretty().unwrap();
        let back = SpatialSettings::from_json_str(&json).unwrap();
        assert_eq!(back.grid.capacity_policy, CapacityPolicy::Grow);
        assert!(back.broad_phase.worker_threads <= 7);
    }
}
