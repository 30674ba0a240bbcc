//! Nearest named street lookup over a uniform grid.
//!
//! Every street polyline is split into two-point segments. Each segment is
//! registered under every grid cell its bounding box touches, so a query only
//! has to look at the cells around it. Cell membership is decided in degrees;
//! the final distance check is in metres using a local equirectangular
//! projection around the query point.

use std::collections::{HashMap, HashSet};

use geo::Coord;

use crate::config::{StreetIndexConfig, truncated_key};
use crate::geometry::BoundingBox;

const METRES_PER_DEGREE: f64 = 111_000.0;

type Cell = (i64, i64);

/// One edge of a named street polyline; `name` indexes the name table.
#[derive(Debug, Clone, PartialEq)]
struct StreetSegment {
    name: usize,
    start: Coord<f64>,
    end: Coord<f64>,
}

impl StreetSegment {
    /// Distance in metres from `point` to the closest point on the segment.
    fn distance_m(&self, point: Coord<f64>) -> f64 {
        let lon_scale = METRES_PER_DEGREE * point.y.to_radians().cos();
        let project = |coord: Coord<f64>| Coord {
            x: (coord.x - point.x) * lon_scale,
            y: (coord.y - point.y) * METRES_PER_DEGREE,
        };
        let start = project(self.start);
        let end = project(self.end);
        let direction = end - start;
        let length_sq = direction.x * direction.x + direction.y * direction.y;
        let t = if length_sq > 0.0 {
            ((-start.x * direction.x - start.y * direction.y) / length_sq).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let closest = start + direction * t;
        closest.x.hypot(closest.y)
    }
}

/// Collects street geometry before freezing it into a [`StreetIndex`].
#[derive(Debug, Default)]
pub struct StreetIndexBuilder {
    config: StreetIndexConfig,
    names: Vec<String>,
    segments: Vec<StreetSegment>,
    grid: HashMap<Cell, Vec<usize>>,
}

impl StreetIndexBuilder {
    /// Start an empty builder with the given grid parameters.
    #[must_use]
    pub fn new(config: StreetIndexConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Split a street polyline into segments and register each one.
    ///
    /// Polylines with fewer than two vertices contribute nothing. Returns the
    /// number of segments added.
    ///
    /// # Examples
    /// ```
    /// use geoenrich_core::{StreetIndexBuilder, StreetIndexConfig, lat_lon};
    ///
    /// let mut builder = StreetIndexBuilder::new(StreetIndexConfig::default());
    /// let added = builder.add_street(
    ///     "Storgata",
    ///     &[lat_lon(59.91, 10.75), lat_lon(59.912, 10.752), lat_lon(59.914, 10.751)],
    /// );
    /// assert_eq!(added, 2);
    /// assert_eq!(builder.add_street("Lonely", &[lat_lon(59.9, 10.7)]), 0);
    /// ```
    pub fn add_street(&mut self, name: &str, coords: &[Coord<f64>]) -> usize {
        if coords.len() < 2 {
            return 0;
        }
        let name_index = self.names.len();
        self.names.push(name.to_owned());
        let mut added = 0;
        for pair in coords.windows(2) {
            let [start, end] = pair else { continue };
            let Some(bbox) = BoundingBox::from_coords(pair) else {
                continue;
            };
            let segment_index = self.segments.len();
            for cell in cells_covering(&bbox, self.config.cell_size_deg) {
                self.grid.entry(cell).or_default().push(segment_index);
            }
            self.segments.push(StreetSegment {
                name: name_index,
                start: *start,
                end: *end,
            });
            added += 1;
        }
        added
    }

    /// Number of segments registered so far.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Freeze the collected segments into a queryable index.
    #[must_use]
    pub fn build(self) -> StreetIndex {
        StreetIndex {
            config: self.config,
            names: self.names,
            segments: self.segments,
            grid: self.grid,
            cache: HashMap::new(),
        }
    }
}

/// Immutable street segments with a grid and a nearest-street cache.
#[derive(Debug)]
pub struct StreetIndex {
    config: StreetIndexConfig,
    names: Vec<String>,
    segments: Vec<StreetSegment>,
    grid: HashMap<Cell, Vec<usize>>,
    cache: HashMap<Cell, Option<usize>>,
}

impl StreetIndex {
    /// Name of the nearest street within the configured radius.
    ///
    /// Answers are cached per truncated grid cell (about 100 m by default),
    /// including the absence of a match.
    ///
    /// # Examples
    /// ```
    /// use geoenrich_core::{StreetIndexBuilder, StreetIndexConfig, lat_lon};
    ///
    /// let mut builder = StreetIndexBuilder::new(StreetIndexConfig::default());
    /// builder.add_street("Storgata", &[lat_lon(59.91, 10.75), lat_lon(59.91, 10.76)]);
    /// let mut index = builder.build();
    ///
    /// assert_eq!(index.find_nearest_street(lat_lon(59.9103, 10.755)), Some("Storgata"));
    /// assert_eq!(index.find_nearest_street(lat_lon(59.95, 10.755)), None);
    /// ```
    pub fn find_nearest_street(&mut self, coord: Coord<f64>) -> Option<&str> {
        let key = truncated_key(coord, self.config.cache_precision_deg);
        let segment = match self.cache.get(&key) {
            Some(&cached) => cached,
            None => {
                let resolved = self.nearest_segment(coord);
                self.cache.insert(key, resolved);
                resolved
            }
        };
        segment.and_then(|index| self.name_of(index))
    }

    /// Resolve without reading or writing the cache.
    #[must_use]
    pub fn locate(&self, coord: Coord<f64>) -> Option<&str> {
        self.nearest_segment(coord)
            .and_then(|index| self.name_of(index))
    }

    /// Number of indexed segments.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Number of cached grid cells.
    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    fn name_of(&self, segment: usize) -> Option<&str> {
        let name = self.segments.get(segment)?.name;
        self.names.get(name).map(String::as_str)
    }

    fn nearest_segment(&self, coord: Coord<f64>) -> Option<usize> {
        let cell_size = self.config.cell_size_deg;
        let centre = cell_of(coord, cell_size);
        // Longitude cells shrink with latitude, so the narrow side of a cell
        // bounds how close the next ring can be.
        let ring_step_m = cell_size * METRES_PER_DEGREE * coord.y.to_radians().cos().abs();
        let mut seen = HashSet::new();
        let mut best: Option<(usize, f64)> = None;

        for ring in 0..=self.config.max_ring {
            let radius = i64::from(ring);
            for cell in ring_cells(centre, radius) {
                let Some(candidates) = self.grid.get(&cell) else {
                    continue;
                };
                for &index in candidates {
                    if !seen.insert(index) {
                        continue;
                    }
                    let Some(segment) = self.segments.get(index) else {
                        continue;
                    };
                    let distance = segment.distance_m(coord);
                    if best.is_none_or(|(_, current)| distance < current) {
                        best = Some((index, distance));
                    }
                }
            }
            // Anything in ring + 1 is at least `ring` whole cells away.
            let next_ring_min_m = f64::from(ring) * ring_step_m;
            if best.is_some_and(|(_, distance)| next_ring_min_m >= distance)
                || next_ring_min_m > self.config.max_distance_m
            {
                break;
            }
        }

        best.filter(|(_, distance)| *distance <= self.config.max_distance_m)
            .map(|(index, _)| index)
    }
}

fn cell_of(coord: Coord<f64>, cell_size: f64) -> Cell {
    (
        (coord.y / cell_size).floor() as i64,
        (coord.x / cell_size).floor() as i64,
    )
}

fn cells_covering(bbox: &BoundingBox, cell_size: f64) -> impl Iterator<Item = Cell> {
    let (min_row, min_col) = cell_of(
        Coord {
            x: bbox.min_lon(),
            y: bbox.min_lat(),
        },
        cell_size,
    );
    let (max_row, max_col) = cell_of(
        Coord {
            x: bbox.max_lon(),
            y: bbox.max_lat(),
        },
        cell_size,
    );
    (min_row..=max_row).flat_map(move |row| (min_col..=max_col).map(move |col| (row, col)))
}

/// Cells whose Chebyshev distance from `centre` is exactly `radius`.
fn ring_cells((row, col): Cell, radius: i64) -> Vec<Cell> {
    if radius == 0 {
        return vec![(row, col)];
    }
    let mut cells = Vec::new();
    for offset in -radius..=radius {
        cells.push((row - radius, col + offset));
        cells.push((row + radius, col + offset));
    }
    for offset in (1 - radius)..radius {
        cells.push((row + offset, col - radius));
        cells.push((row + offset, col + radius));
    }
    cells
}
