//! County and municipality lookup by point-in-polygon.
//!
//! Boundaries are assembled by a [`AdminBoundaryIndexBuilder`] and frozen into
//! an [`AdminBoundaryIndex`]. Each query resolves the two tiers independently:
//!
//! 1. ray casting against every ring, smallest bounding box wins;
//! 2. otherwise the nearest centroid among boxes containing the point;
//! 3. otherwise the nearest centroid overall.
//!
//! The last step means a non-empty tier always answers, which keeps points
//! just off the coast or in gaps between boundaries attributed to something.

use std::collections::HashMap;

use geo::Coord;

use crate::config::{AdminIndexConfig, truncated_key};
use crate::geometry::{BoundingBox, centroid, degree_distance, ring_contains};

/// A named county or municipality polygon.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AdministrativeBoundary {
    /// OSM relation identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// OSM `admin_level`.
    pub admin_level: u8,
    /// Official reference code, e.g. the municipality number.
    pub reference: Option<String>,
    /// ISO 3166-1 alpha-2 country code.
    pub country_code: String,
    /// Simple average of the ring vertices.
    pub centroid: Coord<f64>,
    /// Bounds of the ring vertices.
    pub bbox: Option<BoundingBox>,
    /// Ring vertices, member ways joined in relation order.
    pub boundary_nodes: Vec<Coord<f64>>,
}

impl AdministrativeBoundary {
    /// Assemble a boundary, deriving centroid and bounds from `boundary_nodes`.
    ///
    /// Returns `None` when `boundary_nodes` is empty, since no centroid exists.
    ///
    /// # Examples
    /// ```
    /// use geoenrich_core::{AdministrativeBoundary, lat_lon};
    ///
    /// let ring = vec![lat_lon(0.0, 0.0), lat_lon(0.0, 2.0), lat_lon(2.0, 2.0), lat_lon(2.0, 0.0)];
    /// let boundary = AdministrativeBoundary::from_ring(1, "Testcounty", 4, None, "NO", ring)
    ///     .expect("non-empty ring");
    /// assert_eq!(boundary.centroid, lat_lon(1.0, 1.0));
    /// assert!(boundary.contains(lat_lon(1.0, 1.0)));
    /// ```
    #[must_use]
    pub fn from_ring(
        id: i64,
        name: impl Into<String>,
        admin_level: u8,
        reference: Option<String>,
        country_code: impl Into<String>,
        boundary_nodes: Vec<Coord<f64>>,
    ) -> Option<Self> {
        let centroid = centroid(&boundary_nodes)?;
        Some(Self {
            id,
            name: name.into(),
            admin_level,
            reference,
            country_code: country_code.into(),
            centroid,
            bbox: BoundingBox::from_coords(&boundary_nodes),
            boundary_nodes,
        })
    }

    /// Ray-casting containment against the boundary ring.
    #[must_use]
    pub fn contains(&self, coord: Coord<f64>) -> bool {
        ring_contains(&self.boundary_nodes, coord)
    }

    fn bbox_area(&self) -> f64 {
        self.bbox.map_or(f64::INFINITY, |bbox| bbox.area())
    }

    fn bbox_contains(&self, coord: Coord<f64>) -> bool {
        self.bbox.is_some_and(|bbox| bbox.contains(coord))
    }
}

/// Collects boundaries before freezing them into an [`AdminBoundaryIndex`].
#[derive(Debug, Default)]
pub struct AdminBoundaryIndexBuilder {
    config: AdminIndexConfig,
    counties: Vec<AdministrativeBoundary>,
    municipalities: Vec<AdministrativeBoundary>,
}

impl AdminBoundaryIndexBuilder {
    /// Start an empty builder using `config` to classify levels.
    #[must_use]
    pub fn new(config: AdminIndexConfig) -> Self {
        Self {
            config,
            counties: Vec::new(),
            municipalities: Vec::new(),
        }
    }

    /// File `boundary` under its tier.
    ///
    /// Returns `false`, dropping the boundary, when its level is neither the
    /// county nor the municipality level.
    pub fn add(&mut self, boundary: AdministrativeBoundary) -> bool {
        if boundary.admin_level == self.config.county_level {
            self.counties.push(boundary);
            true
        } else if boundary.admin_level == self.config.municipality_level {
            self.municipalities.push(boundary);
            true
        } else {
            log::debug!(
                "ignoring boundary {} ({}) at admin level {}",
                boundary.id,
                boundary.name,
                boundary.admin_level
            );
            false
        }
    }

    /// Freeze the collected boundaries into a queryable index.
    #[must_use]
    pub fn build(self) -> AdminBoundaryIndex {
        AdminBoundaryIndex {
            cache_precision: self.config.cache_precision_deg,
            counties: self.counties,
            municipalities: self.municipalities,
            cache: HashMap::new(),
        }
    }
}

type CachedPair = (Option<usize>, Option<usize>);

/// Immutable set of counties and municipalities with a lookup cache.
#[derive(Debug)]
pub struct AdminBoundaryIndex {
    cache_precision: f64,
    counties: Vec<AdministrativeBoundary>,
    municipalities: Vec<AdministrativeBoundary>,
    cache: HashMap<(i64, i64), CachedPair>,
}

impl AdminBoundaryIndex {
    /// Resolve the county and municipality for `coord`, consulting the cache.
    ///
    /// The cache key truncates `coord` to the configured grid (about 1.1 km by
    /// default), so nearby points share the first answer computed for their
    /// cell. Only the cache is written; boundaries never change.
    ///
    /// # Examples
    /// ```
    /// use geoenrich_core::{AdminBoundaryIndexBuilder, AdminIndexConfig, AdministrativeBoundary, lat_lon};
    ///
    /// let ring = vec![lat_lon(59.5, 9.5), lat_lon(59.5, 10.5), lat_lon(60.5, 10.5), lat_lon(60.5, 9.5)];
    /// let mut builder = AdminBoundaryIndexBuilder::new(AdminIndexConfig::default());
    /// builder.add(AdministrativeBoundary::from_ring(1, "Testcounty", 4, None, "NO", ring).expect("ring"));
    /// let mut index = builder.build();
    ///
    /// let (county, municipality) = index.find_county_and_municipality(lat_lon(60.0, 10.0));
    /// assert_eq!(county.map(|c| c.name.as_str()), Some("Testcounty"));
    /// assert!(municipality.is_none());
    /// ```
    pub fn find_county_and_municipality(
        &mut self,
        coord: Coord<f64>,
    ) -> (Option<&AdministrativeBoundary>, Option<&AdministrativeBoundary>) {
        let key = truncated_key(coord, self.cache_precision);
        let (county, municipality) = match self.cache.get(&key) {
            Some(&pair) => pair,
            None => {
                let pair = (
                    resolve(&self.counties, coord),
                    resolve(&self.municipalities, coord),
                );
                self.cache.insert(key, pair);
                pair
            }
        };
        (
            county.and_then(|index| self.counties.get(index)),
            municipality.and_then(|index| self.municipalities.get(index)),
        )
    }

    /// Resolve without reading or writing the cache.
    #[must_use]
    pub fn locate(
        &self,
        coord: Coord<f64>,
    ) -> (Option<&AdministrativeBoundary>, Option<&AdministrativeBoundary>) {
        (
            resolve(&self.counties, coord).and_then(|index| self.counties.get(index)),
            resolve(&self.municipalities, coord).and_then(|index| self.municipalities.get(index)),
        )
    }

    /// All counties in insertion order.
    #[must_use]
    pub fn counties(&self) -> &[AdministrativeBoundary] {
        &self.counties
    }

    /// All municipalities in insertion order.
    #[must_use]
    pub fn municipalities(&self) -> &[AdministrativeBoundary] {
        &self.municipalities
    }

    /// Number of cached grid cells.
    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

fn resolve(boundaries: &[AdministrativeBoundary], coord: Coord<f64>) -> Option<usize> {
    smallest_containing(boundaries, coord)
        .or_else(|| nearest_centroid(boundaries, coord, |boundary| boundary.bbox_contains(coord)))
        .or_else(|| nearest_centroid(boundaries, coord, |_| true))
}

fn smallest_containing(boundaries: &[AdministrativeBoundary], coord: Coord<f64>) -> Option<usize> {
    boundaries
        .iter()
        .enumerate()
        .filter(|(_, boundary)| boundary.contains(coord))
        .min_by(|(_, left), (_, right)| left.bbox_area().total_cmp(&right.bbox_area()))
        .map(|(index, _)| index)
}

fn nearest_centroid<F>(
    boundaries: &[AdministrativeBoundary],
    coord: Coord<f64>,
    eligible: F,
) -> Option<usize>
where
    F: Fn(&AdministrativeBoundary) -> bool,
{
    boundaries
        .iter()
        .enumerate()
        .filter(|(_, boundary)| eligible(boundary))
        .min_by(|(_, left), (_, right)| {
            degree_distance(left.centroid, coord).total_cmp(&degree_distance(right.centroid, coord))
        })
        .map(|(index, _)| index)
}
