//! The enriched record emitted once per accepted entity.

use std::collections::BTreeMap;
use std::fmt;

use geo::Coord;

use crate::AdministrativeBoundary;

/// OpenStreetMap-style key/value tags, ordered by key.
pub type Tags = BTreeMap<String, String>;

/// Which kind of OSM element a record was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum EntityKind {
    /// A single point.
    Node,
    /// An ordered list of nodes.
    Way,
    /// A collection of members with roles.
    Relation,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
        })
    }
}

/// Name and reference code of a resolved administrative region.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegionRef {
    /// Display name, e.g. `Vestland`.
    pub name: String,
    /// Official reference code, e.g. `46`, when tagged.
    pub code: Option<String>,
}

impl From<&AdministrativeBoundary> for RegionRef {
    fn from(boundary: &AdministrativeBoundary) -> Self {
        Self {
            name: boundary.name.clone(),
            code: boundary.reference.clone(),
        }
    }
}

/// A named entity annotated with its region and nearest street.
///
/// # Examples
/// ```
/// use geoenrich_core::{EnrichedRecord, EntityKind, Tags, lat_lon};
///
/// let record = EnrichedRecord {
///     id: 7,
///     kind: EntityKind::Node,
///     name: "Cafe".into(),
///     location: lat_lon(60.5, 10.5),
///     county: None,
///     municipality: None,
///     street: Some("Storgata".into()),
///     tags: Tags::from([("amenity".into(), "cafe".into())]),
/// };
/// assert_eq!(record.kind.to_string(), "node");
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnrichedRecord {
    /// OSM identifier of the source element.
    pub id: i64,
    /// Kind of the source element.
    pub kind: EntityKind,
    /// Value of the `name` tag.
    pub name: String,
    /// Node position or averaged centroid.
    pub location: Coord<f64>,
    /// County containing (or nearest to) the location.
    pub county: Option<RegionRef>,
    /// Municipality containing (or nearest to) the location.
    pub municipality: Option<RegionRef>,
    /// Nearest named street within the search radius.
    pub street: Option<String>,
    /// Original tags, kept for downstream scoring.
    pub tags: Tags,
}
