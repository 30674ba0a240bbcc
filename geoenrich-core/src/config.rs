//! Tunable parameters for the boundary and street indexes.

use thiserror::Error;

/// Errors returned when validating index configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// A size or precision parameter was zero, negative or not finite.
    #[error("{field} must be a positive, finite number (got {value})")]
    NotPositive {
        /// Name of the offending parameter.
        field: &'static str,
        /// Value supplied.
        value: f64,
    },
    /// County and municipality levels must differ.
    #[error("county and municipality admin levels must differ (both {level})")]
    DuplicateLevel {
        /// The level configured for both tiers.
        level: u8,
    },
}

/// Parameters for [`AdminBoundaryIndex`](crate::AdminBoundaryIndex).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AdminIndexConfig {
    /// OSM `admin_level` treated as a county.
    pub county_level: u8,
    /// OSM `admin_level` treated as a municipality.
    pub municipality_level: u8,
    /// Grid step, in degrees, used to truncate coordinates for the cache.
    pub cache_precision_deg: f64,
}

impl Default for AdminIndexConfig {
    fn default() -> Self {
        Self {
            county_level: 4,
            municipality_level: 7,
            cache_precision_deg: 0.01,
        }
    }
}

impl AdminIndexConfig {
    /// Check that the levels are distinct and the cache precision is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.county_level == self.municipality_level {
            return Err(ConfigError::DuplicateLevel {
                level: self.county_level,
            });
        }
        positive("cache_precision_deg", self.cache_precision_deg)
    }
}

/// Parameters for [`StreetIndex`](crate::StreetIndex).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StreetIndexConfig {
    /// Edge length of a grid cell in degrees.
    pub cell_size_deg: f64,
    /// Largest ring, in cells, searched around the query cell.
    pub max_ring: u32,
    /// Matches further away than this many metres are rejected.
    pub max_distance_m: f64,
    /// Grid step, in degrees, used to truncate coordinates for the cache.
    pub cache_precision_deg: f64,
}

impl Default for StreetIndexConfig {
    fn default() -> Self {
        Self {
            cell_size_deg: 0.005,
            max_ring: 10,
            max_distance_m: 100.0,
            cache_precision_deg: 0.001,
        }
    }
}

impl StreetIndexConfig {
    /// Check that every size and precision parameter is positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("cell_size_deg", self.cell_size_deg)?;
        positive("max_distance_m", self.max_distance_m)?;
        positive("cache_precision_deg", self.cache_precision_deg)
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

/// Truncate a coordinate onto a `precision`-degree grid.
///
/// Truncation is toward zero, so the cells either side of the equator and
/// the prime meridian are twice as wide as the rest. Only used as a cache key.
pub(crate) fn truncated_key(coord: geo::Coord<f64>, precision: f64) -> (i64, i64) {
    (
        (coord.y / precision).trunc() as i64,
        (coord.x / precision).trunc() as i64,
    )
}
