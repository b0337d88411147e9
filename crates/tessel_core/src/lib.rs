//! Tessel Core
//!
//! Spatial partitioning for a tick-based simulation:
//! - Uniform hash grid per map with multi-cell membership
//! - Parallel broad phase with duplicate-free pair output
//! - Cached "nearby entities" queries
//! - Deterministic time and math

pub mod config;
pub mod math;
pub mod spatial;
pub mod time;

pub use glam;

pub use config::{ConfigError, SpatialSettings};
pub use spatial::{SpatialContext, SpatialError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
