//! Planar geometry helpers working directly in degrees.
//!
//! Nothing here is geodesic: centroids are plain averages and distances are
//! Euclidean in degree space. That is adequate for ranking candidates within
//! one country but not for measuring anything.

use geo::{BoundingRect, Coord, LineString, Rect};

const CENTROID_SCALE: f64 = 1_000_000.0;

/// Average the latitudes and longitudes of `coords`.
///
/// Each component is rounded to six fractional digits (half away from zero)
/// so serialised centroids are stable. Returns `None` for an empty slice.
///
/// # Examples
/// ```
/// use geoenrich_core::{centroid, lat_lon};
///
/// let square = [lat_lon(0.0, 0.0), lat_lon(0.0, 2.0), lat_lon(2.0, 2.0), lat_lon(2.0, 0.0)];
/// assert_eq!(centroid(&square), Some(lat_lon(1.0, 1.0)));
/// assert_eq!(centroid(&[]), None);
/// ```
#[must_use]
pub fn centroid(coords: &[Coord<f64>]) -> Option<Coord<f64>> {
    if coords.is_empty() {
        return None;
    }
    let count = coords.len() as f64;
    let (sum_x, sum_y) = coords
        .iter()
        .fold((0.0, 0.0), |(x, y), coord| (x + coord.x, y + coord.y));
    Some(Coord {
        x: round_to_scale(sum_x / count),
        y: round_to_scale(sum_y / count),
    })
}

fn round_to_scale(value: f64) -> f64 {
    (value * CENTROID_SCALE).round() / CENTROID_SCALE
}

/// Axis-aligned latitude/longitude bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    rect: Rect<f64>,
}

impl BoundingBox {
    /// Derive the bounds of `coords`, or `None` when the slice is empty.
    ///
    /// # Examples
    /// ```
    /// use geoenrich_core::{BoundingBox, lat_lon};
    ///
    /// let bbox = BoundingBox::from_coords(&[lat_lon(1.0, 2.0), lat_lon(3.0, 5.0)])
    ///     .expect("non-empty input");
    /// assert_eq!(bbox.min_lat(), 1.0);
    /// assert_eq!(bbox.max_lon(), 5.0);
    /// assert!(bbox.contains(lat_lon(2.0, 3.0)));
    /// assert_eq!(bbox.area(), 6.0);
    /// ```
    #[must_use]
    pub fn from_coords(coords: &[Coord<f64>]) -> Option<Self> {
        LineString::from(coords.to_vec())
            .bounding_rect()
            .map(|rect| Self { rect })
    }

    /// Minimum latitude.
    #[must_use]
    pub fn min_lat(&self) -> f64 {
        self.rect.min().y
    }

    /// Maximum latitude.
    #[must_use]
    pub fn max_lat(&self) -> f64 {
        self.rect.max().y
    }

    /// Minimum longitude.
    #[must_use]
    pub fn min_lon(&self) -> f64 {
        self.rect.min().x
    }

    /// Maximum longitude.
    #[must_use]
    pub fn max_lon(&self) -> f64 {
        self.rect.max().x
    }

    /// Inclusive point containment.
    #[must_use]
    pub fn contains(&self, coord: Coord<f64>) -> bool {
        (self.min_lat()..=self.max_lat()).contains(&coord.y)
            && (self.min_lon()..=self.max_lon()).contains(&coord.x)
    }

    /// Area in square degrees.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.rect.width() * self.rect.height()
    }
}

/// Even-odd ray casting against an implicitly closed ring.
///
/// Rings with fewer than three vertices contain nothing. Holes, multiple
/// rings and the antimeridian are not handled.
#[must_use]
pub fn ring_contains(ring: &[Coord<f64>], point: Coord<f64>) -> bool {
    if ring.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut previous = ring.last().copied().unwrap_or(point);
    for &current in ring {
        let straddles = (current.x > point.x) != (previous.x > point.x);
        if straddles {
            let crossing_lat = (previous.y - current.y) * (point.x - current.x)
                / (previous.x - current.x)
                + current.y;
            if point.y < crossing_lat {
                inside = !inside;
            }
        }
        previous = current;
    }
    inside
}

/// Euclidean distance in degrees between two coordinates.
#[must_use]
pub fn degree_distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}
