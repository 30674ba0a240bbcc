//! Entity sources: where the pipeline's filtered scans come from.
//!
//! Every stage opens a fresh scan, so a source must be re-readable. Kind and
//! tag selection travel with the [`EntityFilter`] so that implementations
//! can discard unwanted elements before allocating owned entities.

use std::cell::Cell;
use std::path::PathBuf;

use geoenrich_core::Tags;
use thiserror::Error;

use crate::entity::{Entity, EntityFilter};

mod pbf;

pub use pbf::{PbfSource, PbfStream};

/// Errors returned while opening or reading an entity source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The file could not be opened.
    #[error("failed to open OSM PBF file at {path:?}")]
    Open {
        /// Underlying decoder error.
        #[source]
        source: osmpbf::Error,
        /// File that failed to open.
        path: PathBuf,
    },
    /// A blob could not be decoded.
    #[error("failed to decode OSM PBF data in {path:?}")]
    Decode {
        /// Underlying decoder error.
        #[source]
        source: osmpbf::Error,
        /// File being decoded.
        path: PathBuf,
    },
    /// The file holds no blobs, or its first blob is not an `OSMHeader`.
    #[error("{path:?} does not start with an OSM PBF header")]
    NotPbf {
        /// File that was opened.
        path: PathBuf,
    },
    /// The decoding thread could not be started.
    #[error("failed to start decoder thread for {path:?}")]
    Spawn {
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
        /// File the thread would have decoded.
        path: PathBuf,
    },
    /// The decoding thread panicked before closing its channel.
    #[error("decoder thread for {path:?} panicked")]
    WorkerPanicked {
        /// File being decoded.
        path: PathBuf,
    },
}

/// A re-readable stream of OSM entities.
pub trait EntitySource {
    /// Iterator returned by [`EntitySource::scan`].
    type Stream: Iterator<Item = Result<Entity, SourceError>>;

    /// Start a new pass over the source yielding entities accepted by `filter`.
    fn scan(&self, filter: &EntityFilter) -> Result<Self::Stream, SourceError>;
}

/// In-memory entity list, mainly for tests and embedding.
///
/// # Examples
/// ```
/// use geoenrich_core::{EntityKind, Tags, lat_lon};
/// use geoenrich_data::{Entity, EntityFilter, EntitySource, MemorySource, Node};
///
/// let source = MemorySource::new(vec![Entity::Node(Node {
///     id: 1,
///     location: lat_lon(60.0, 10.0),
///     tags: Tags::new(),
/// })]);
/// let count = source.scan(&EntityFilter::only(EntityKind::Way))?.count();
/// assert_eq!(count, 0);
/// assert_eq!(source.scan_count(), 1);
/// # Ok::<(), geoenrich_data::SourceError>(())
/// ```
#[derive(Debug, Default)]
pub struct MemorySource {
    entities: Vec<Entity>,
    scans: Cell<usize>,
}

impl MemorySource {
    /// Wrap `entities`; scans yield them in this order.
    #[must_use]
    pub const fn new(entities: Vec<Entity>) -> Self {
        Self {
            entities,
            scans: Cell::new(0),
        }
    }

    /// Number of scans started so far.
    #[must_use]
    pub fn scan_count(&self) -> usize {
        self.scans.get()
    }
}

impl FromIterator<Entity> for MemorySource {
    fn from_iter<I: IntoIterator<Item = Entity>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl EntitySource for MemorySource {
    type Stream = std::vec::IntoIter<Result<Entity, SourceError>>;

    fn scan(&self, filter: &EntityFilter) -> Result<Self::Stream, SourceError> {
        self.scans.set(self.scans.get() + 1);
        let selected: Vec<_> = self
            .entities
            .iter()
            .filter(|entity| filter.wants(entity.kind()))
            .map(|entity| {
                let mut owned = entity.clone();
                if !filter.wants_tags() {
                    strip_tags(&mut owned);
                }
                owned
            })
            .filter(|entity| filter.accepts(entity))
            .map(Ok)
            .collect();
        Ok(selected.into_iter())
    }
}

fn strip_tags(entity: &mut Entity) {
    let tags: &mut Tags = match entity {
        Entity::Node(node) => &mut node.tags,
        Entity::Way(way) => &mut way.tags,
        Entity::Relation(relation) => &mut relation.tags,
    };
    tags.clear();
}
