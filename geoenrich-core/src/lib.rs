//! Core spatial structures for the geoenrich pipeline.
//!
//! Responsibilities:
//! - Store node and way coordinates compactly, keyed by OSM identifier.
//! - Resolve which county and municipality contain a coordinate.
//! - Resolve the nearest named street within a bounded radius.
//! - Describe the enriched record handed to downstream writers.
//!
//! Boundaries:
//! - No I/O. Sources, collectors and sinks live in `geoenrich-data`.
//!
//! Coordinates are WGS84 `geo::Coord<f64>` values with `x = longitude` and
//! `y = latitude`. Use [`lat_lon`] when the natural order reads better.

#![forbid(unsafe_code)]

use geo::Coord;

pub mod admin;
pub mod config;
pub mod geometry;
pub mod record;
pub mod store;
pub mod street;

pub use admin::{AdminBoundaryIndex, AdminBoundaryIndexBuilder, AdministrativeBoundary};
pub use config::{AdminIndexConfig, ConfigError, StreetIndexConfig};
pub use geometry::{BoundingBox, centroid};
pub use record::{EnrichedRecord, EntityKind, RegionRef, Tags};
pub use store::CoordinateStore;
pub use street::{StreetIndex, StreetIndexBuilder};

/// Build a coordinate from a latitude and longitude in degrees.
///
/// # Examples
/// ```
/// use geoenrich_core::lat_lon;
///
/// let oslo = lat_lon(59.91, 10.75);
/// assert_eq!(oslo.y, 59.91);
/// assert_eq!(oslo.x, 10.75);
/// ```
#[must_use]
pub const fn lat_lon(lat: f64, lon: f64) -> Coord<f64> {
    Coord { x: lon, y: lat }
}
