//! Stages 2 and 3: which nodes matter, then where they are.

use std::collections::HashSet;
use std::sync::Arc;

use geoenrich_core::{CoordinateStore, EntityKind};
use log::debug;

use super::for_each_entity;
use crate::config::PipelineConfig;
use crate::entity::{Entity, EntityFilter, MemberKind};
use crate::source::{EntitySource, SourceError};
use crate::tags;

/// Initial phase: POI relation members still to be scanned.
#[derive(Debug)]
pub struct AwaitingMembers;

/// Second phase: relation members known, ways still to be scanned.
#[derive(Debug)]
pub struct AwaitingWays {
    poi_way_ids: Arc<HashSet<i64>>,
    node_ids: HashSet<i64>,
}

/// Two-pass collector of the node identifiers later stages must resolve.
///
/// The phase parameter makes the order explicit: relation members are read
/// first, because a way only becomes relevant once some POI relation
/// references it.
///
/// # Examples
/// ```
/// use std::collections::HashSet;
/// use std::sync::Arc;
/// use geoenrich_data::{MemorySource, PipelineConfig, RequiredNodeCollector};
///
/// # fn main() -> Result<(), geoenrich_data::SourceError> {
/// let config = PipelineConfig::default();
/// let source = MemorySource::default();
/// let required = RequiredNodeCollector::new(&config, Arc::new(HashSet::new()))
///     .collect_relation_members(&source)?
///     .collect_way_nodes(&source)?;
/// assert!(required.node_ids.is_empty());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RequiredNodeCollector<'a, Phase> {
    config: &'a PipelineConfig,
    admin_way_ids: Arc<HashSet<i64>>,
    phase: Phase,
}

/// Output of stage 2.
#[derive(Debug, Clone, Default)]
pub struct RequiredNodes {
    /// Nodes referenced by relevant ways or POI relations.
    pub node_ids: Arc<HashSet<i64>>,
    /// Ways that are members of POI relations.
    pub poi_way_ids: Arc<HashSet<i64>>,
}

impl<'a> RequiredNodeCollector<'a, AwaitingMembers> {
    /// Start collecting, given the member ways found by stage 1.
    #[must_use]
    pub const fn new(config: &'a PipelineConfig, admin_way_ids: Arc<HashSet<i64>>) -> Self {
        Self {
            config,
            admin_way_ids,
            phase: AwaitingMembers,
        }
    }

    /// Scan POI relations and remember their way and node members.
    pub fn collect_relation_members<S>(
        self,
        source: &S,
    ) -> Result<RequiredNodeCollector<'a, AwaitingWays>, SourceError>
    where
        S: EntitySource + ?Sized,
    {
        let poi_keys = self.config.poi_keys.clone();
        let filter = EntityFilter::only(EntityKind::Relation)
            .with_predicate(move |entity| tags::is_poi(entity.tags(), &poi_keys));
        let mut poi_way_ids = HashSet::new();
        let mut node_ids = HashSet::new();
        for_each_entity(source, &filter, |entity| {
            let Entity::Relation(relation) = entity else {
                return;
            };
            for member in relation.members {
                match member.kind {
                    MemberKind::Way => {
                        poi_way_ids.insert(member.id);
                    }
                    MemberKind::Node => {
                        node_ids.insert(member.id);
                    }
                    MemberKind::Relation => {
                        debug!("ignoring nested relation {} in {}", member.id, relation.id);
                    }
                }
            }
        })?;
        Ok(RequiredNodeCollector {
            config: self.config,
            admin_way_ids: self.admin_way_ids,
            phase: AwaitingWays {
                poi_way_ids: Arc::new(poi_way_ids),
                node_ids,
            },
        })
    }
}

impl RequiredNodeCollector<'_, AwaitingWays> {
    /// Scan ways and collect the nodes of every relevant one.
    ///
    /// A way is relevant when it belongs to an admin boundary or a POI
    /// relation, is itself a POI, or is a named street.
    pub fn collect_way_nodes<S>(self, source: &S) -> Result<RequiredNodes, SourceError>
    where
        S: EntitySource + ?Sized,
    {
        let AwaitingWays {
            poi_way_ids,
            mut node_ids,
        } = self.phase;
        let filter = relevant_ways(self.config, &self.admin_way_ids, &poi_way_ids);
        for_each_entity(source, &filter, |entity| {
            if let Entity::Way(way) = entity {
                node_ids.extend(way.node_ids);
            }
        })?;
        Ok(RequiredNodes {
            node_ids: Arc::new(node_ids),
            poi_way_ids,
        })
    }
}

/// Ways that are boundary members, POI relation members, POIs or streets.
pub(crate) fn relevant_ways(
    config: &PipelineConfig,
    admin_way_ids: &Arc<HashSet<i64>>,
    poi_way_ids: &Arc<HashSet<i64>>,
) -> EntityFilter {
    let admin = Arc::clone(admin_way_ids);
    let poi = Arc::clone(poi_way_ids);
    let poi_keys = config.poi_keys.clone();
    EntityFilter::only(EntityKind::Way).with_predicate(move |entity| {
        let id = entity.id();
        let tags = entity.tags();
        admin.contains(&id)
            || poi.contains(&id)
            || tags::is_street(tags)
            || tags::is_poi(tags, &poi_keys)
    })
}

/// Stage 3: stores the coordinates of exactly the required nodes.
#[derive(Debug)]
pub struct NodeCoordinateCollector<'a> {
    config: &'a PipelineConfig,
    required: Arc<HashSet<i64>>,
}

impl<'a> NodeCoordinateCollector<'a> {
    /// Collector for the identifiers produced by stage 2.
    #[must_use]
    pub const fn new(config: &'a PipelineConfig, required: Arc<HashSet<i64>>) -> Self {
        Self { config, required }
    }

    /// Scan nodes, skipping tag decoding, and store the required ones.
    pub fn collect<S>(&self, source: &S) -> Result<CoordinateStore, SourceError>
    where
        S: EntitySource + ?Sized,
    {
        let required = Arc::clone(&self.required);
        let filter = EntityFilter::only(EntityKind::Node)
            .without_tags()
            .with_predicate(move |entity| required.contains(&entity.id()));
        let mut store = CoordinateStore::with_capacity(self.config.node_store_capacity);
        for_each_entity(source, &filter, |entity| {
            if let Entity::Node(node) = entity {
                store.put(node.id, node.location);
            }
        })?;
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Node, Relation, RelationMember, Way};
    use crate::source::MemorySource;
    use geoenrich_core::{Tags, lat_lon};
    use rstest::{fixture, rstest};

    fn way(id: i64, node_ids: Vec<i64>, pairs: &[(&str, &str)]) -> Entity {
        Entity::Way(Way {
            id,
            node_ids,
            tags: crate::tags::collect_tags(pairs.iter().copied()),
        })
    }

    #[fixture]
    fn source() -> MemorySource {
        MemorySource::new(vec![
            Entity::Relation(Relation {
                id: 100,
                members: vec![
                    RelationMember {
                        kind: MemberKind::Way,
                        id: 3,
                        role: "outer".into(),
                    },
                    RelationMember {
                        kind: MemberKind::Node,
                        id: 50,
                        role: String::new(),
                    },
                ],
                tags: Tags::from([
                    ("name".into(), "Bryggen".into()),
                    ("tourism".into(), "attraction".into()),
                ]),
            }),
            way(1, vec![10, 11], &[]),
            way(2, vec![20, 21], &[("highway", "primary"), ("name", "Storgata")]),
            way(3, vec![30, 31], &[]),
            way(4, vec![40, 41], &[("highway", "track")]),
            way(5, vec![60, 61], &[("name", "Park"), ("leisure", "park")]),
        ])
    }

    #[rstest]
    fn gathers_nodes_of_relevant_ways(source: MemorySource) {
        let config = PipelineConfig::default();
        let required = RequiredNodeCollector::new(&config, Arc::new(HashSet::from([1])))
            .collect_relation_members(&source)
            .expect("members")
            .collect_way_nodes(&source)
            .expect("ways");
        let expected = HashSet::from([10, 11, 20, 21, 30, 31, 50, 60, 61]);
        assert_eq!(*required.node_ids, expected);
        assert_eq!(*required.poi_way_ids, HashSet::from([3]));
        assert_eq!(source.scan_count(), 2);
    }

    #[rstest]
    fn stores_only_required_nodes() {
        let source = MemorySource::new(vec![
            Entity::Node(Node {
                id: 1,
                location: lat_lon(60.0, 10.0),
                tags: Tags::new(),
            }),
            Entity::Node(Node {
                id: 2,
                location: lat_lon(61.0, 11.0),
                tags: Tags::new(),
            }),
        ]);
        let config = PipelineConfig::default();
        let store = NodeCoordinateCollector::new(&config, Arc::new(HashSet::from([2])))
            .collect(&source)
            .expect("nodes");
        assert_eq!(store.len(), 1);
        assert!(store.get(1).is_none());
        let stored = store.get(2).expect("node 2");
        assert!((stored.y - 61.0).abs() < 1e-5);
    }
}
