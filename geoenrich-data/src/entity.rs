//! Owned OSM elements and the filters used to select them during a scan.

use std::fmt;
use std::sync::Arc;

use geo::Coord;
use geoenrich_core::{EntityKind, Tags};

/// A tagged point.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// OSM node identifier.
    pub id: i64,
    /// WGS84 position, `x = longitude`, `y = latitude`.
    pub location: Coord<f64>,
    /// Node tags; empty when the scan did not ask for tags.
    pub tags: Tags,
}

/// An ordered list of node references.
#[derive(Debug, Clone, PartialEq)]
pub struct Way {
    /// OSM way identifier.
    pub id: i64,
    /// Referenced node identifiers, in order.
    pub node_ids: Vec<i64>,
    /// Way tags.
    pub tags: Tags,
}

/// Kind of element a relation member points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// A node member.
    Node,
    /// A way member.
    Way,
    /// A nested relation.
    Relation,
}

/// One member of a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationMember {
    /// Kind of the referenced element.
    pub kind: MemberKind,
    /// Identifier of the referenced element.
    pub id: i64,
    /// Member role, e.g. `outer` or `admin_centre`. Empty when untagged.
    pub role: String,
}

/// A collection of members with roles.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    /// OSM relation identifier.
    pub id: i64,
    /// Members in relation order.
    pub members: Vec<RelationMember>,
    /// Relation tags.
    pub tags: Tags,
}

/// Any element yielded by an [`EntitySource`](crate::EntitySource).
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    /// A point.
    Node(Node),
    /// A polyline or closed ring.
    Way(Way),
    /// A multipolygon, route, boundary or other grouping.
    Relation(Relation),
}

impl Entity {
    /// Identifier of the wrapped element.
    #[must_use]
    pub const fn id(&self) -> i64 {
        match self {
            Self::Node(node) => node.id,
            Self::Way(way) => way.id,
            Self::Relation(relation) => relation.id,
        }
    }

    /// Kind of the wrapped element.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Node(_) => EntityKind::Node,
            Self::Way(_) => EntityKind::Way,
            Self::Relation(_) => EntityKind::Relation,
        }
    }

    /// Tags of the wrapped element.
    #[must_use]
    pub const fn tags(&self) -> &Tags {
        match self {
            Self::Node(node) => &node.tags,
            Self::Way(way) => &way.tags,
            Self::Relation(relation) => &relation.tags,
        }
    }
}

type Predicate = Arc<dyn Fn(&Entity) -> bool + Send + Sync>;

/// Selects which entities a scan yields.
///
/// The kind set and the `with_tags` flag are applied by sources before an
/// element is converted into an owned [`Entity`]; the predicate runs on the
/// converted entity but still on the decoding side of the channel.
///
/// # Examples
/// ```
/// use geoenrich_core::EntityKind;
/// use geoenrich_data::EntityFilter;
///
/// let filter = EntityFilter::only(EntityKind::Relation)
///     .with_predicate(|entity| entity.tags().contains_key("boundary"));
/// assert!(filter.wants(EntityKind::Relation));
/// assert!(!filter.wants(EntityKind::Node));
/// ```
#[derive(Clone)]
pub struct EntityFilter {
    nodes: bool,
    ways: bool,
    relations: bool,
    with_tags: bool,
    predicate: Option<Predicate>,
}

impl EntityFilter {
    /// Accept every entity.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            nodes: true,
            ways: true,
            relations: true,
            with_tags: true,
            predicate: None,
        }
    }

    /// Accept only entities of `kind`.
    #[must_use]
    pub const fn only(kind: EntityKind) -> Self {
        Self {
            nodes: matches!(kind, EntityKind::Node),
            ways: matches!(kind, EntityKind::Way),
            relations: matches!(kind, EntityKind::Relation),
            with_tags: true,
            predicate: None,
        }
    }

    /// Additionally require `predicate` to hold.
    #[must_use]
    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Entity) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Skip decoding tags; yielded entities carry empty tag maps.
    ///
    /// Predicates then see empty tags too, so only combine this with
    /// predicates that look at identifiers or geometry.
    #[must_use]
    pub fn without_tags(mut self) -> Self {
        self.with_tags = false;
        self
    }

    /// Whether entities of `kind` can pass this filter.
    #[must_use]
    pub const fn wants(&self, kind: EntityKind) -> bool {
        match kind {
            EntityKind::Node => self.nodes,
            EntityKind::Way => self.ways,
            EntityKind::Relation => self.relations,
        }
    }

    /// Whether sources should decode tags.
    #[must_use]
    pub const fn wants_tags(&self) -> bool {
        self.with_tags
    }

    /// Whether `entity` passes both the kind set and the predicate.
    #[must_use]
    pub fn accepts(&self, entity: &Entity) -> bool {
        self.wants(entity.kind())
            && self
                .predicate
                .as_ref()
                .is_none_or(|predicate| predicate(entity))
    }
}

impl Default for EntityFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Debug for EntityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityFilter")
            .field("nodes", &self.nodes)
            .field("ways", &self.ways)
            .field("relations", &self.relations)
            .field("with_tags", &self.with_tags)
            .field("predicate", &self.predicate.is_some())
            .finish()
    }
}
