//! Stage 5: turn POI entities into enriched records.

use geo::Coord;
use geoenrich_core::{
    AdminBoundaryIndex, CoordinateStore, EnrichedRecord, RegionRef, StreetIndex, centroid,
};
use log::debug;

use crate::entity::{Entity, MemberKind, Relation, Way};
use crate::tags;

/// Resolves locations and regions for the final scan.
///
/// Holds the stage 3 node store read-only and the way centroid store
/// mutably, since centroids of POI ways are computed and cached on demand.
#[derive(Debug)]
pub(crate) struct Enricher<'a> {
    pub(crate) admin: AdminBoundaryIndex,
    pub(crate) streets: Option<StreetIndex>,
    pub(crate) nodes: &'a CoordinateStore,
    pub(crate) way_centroids: CoordinateStore,
    pub(crate) skipped: usize,
}

impl Enricher<'_> {
    /// Build a record for `entity`, or count it as skipped.
    pub(crate) fn enrich(&mut self, entity: Entity) -> Option<EnrichedRecord> {
        let record = self.try_enrich(entity);
        if record.is_none() {
            self.skipped += 1;
        }
        record
    }

    fn try_enrich(&mut self, entity: Entity) -> Option<EnrichedRecord> {
        let kind = entity.kind();
        let id = entity.id();
        let Some(name) = tags::name(entity.tags()).map(str::to_owned) else {
            debug!("{kind} {id} has no name; skipping");
            return None;
        };
        let (location, street_lookup, tags) = match entity {
            Entity::Node(node) => (Some(node.location), true, node.tags),
            Entity::Way(way) => (self.way_location(&way), false, way.tags),
            Entity::Relation(relation) => (self.relation_location(&relation), false, relation.tags),
        };
        let Some(location) = location else {
            debug!("{kind} {id} ({name}) has unresolved geometry; skipping");
            return None;
        };
        let (county, municipality) = self.admin.find_county_and_municipality(location);
        let county = county.map(RegionRef::from);
        let municipality = municipality.map(RegionRef::from);
        let street = self
            .streets
            .as_mut()
            .filter(|_| street_lookup)
            .and_then(|index| index.find_nearest_street(location))
            .map(str::to_owned);
        Some(EnrichedRecord {
            id,
            kind,
            name,
            location,
            county,
            municipality,
            street,
            tags,
        })
    }

    fn way_location(&mut self, way: &Way) -> Option<Coord<f64>> {
        if let Some(cached) = self.way_centroids.get(way.id) {
            return Some(cached);
        }
        let coords = way
            .node_ids
            .iter()
            .map(|&id| self.nodes.get(id))
            .collect::<Option<Vec<_>>>()?;
        let center = centroid(&coords)?;
        self.way_centroids.put(way.id, center);
        Some(center)
    }

    /// Average of member node positions and member way centroids; `None`
    /// when any node or way member is unresolved.
    fn relation_location(&self, relation: &Relation) -> Option<Coord<f64>> {
        let coords = relation
            .members
            .iter()
            .filter_map(|member| match member.kind {
                MemberKind::Node => Some(self.nodes.get(member.id)),
                MemberKind::Way => Some(self.way_centroids.get(member.id)),
                MemberKind::Relation => None,
            })
            .collect::<Option<Vec<_>>>()?;
        centroid(&coords)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Node, RelationMember};
    use geoenrich_core::{
        AdminBoundaryIndexBuilder, AdminIndexConfig, AdministrativeBoundary, StreetIndexBuilder,
        StreetIndexConfig, Tags, lat_lon,
    };
    use rstest::{fixture, rstest};

    fn named(name: &str) -> Tags {
        Tags::from([
            ("name".into(), name.into()),
            ("amenity".into(), "cafe".into()),
        ])
    }

    #[fixture]
    fn nodes() -> CoordinateStore {
        let mut store = CoordinateStore::default();
        store.put(1, lat_lon(60.0, 10.0));
        store.put(2, lat_lon(60.0, 10.2));
        store.put(3, lat_lon(60.2, 10.2));
        store
    }

    fn enricher(nodes: &CoordinateStore) -> Enricher<'_> {
        let ring = vec![
            lat_lon(59.5, 9.5),
            lat_lon(59.5, 10.5),
            lat_lon(60.5, 10.5),
            lat_lon(60.5, 9.5),
        ];
        let mut admin = AdminBoundaryIndexBuilder::new(AdminIndexConfig::default());
        admin.add(
            AdministrativeBoundary::from_ring(1, "Testcounty", 4, None, "NO", ring).expect("ring"),
        );
        let mut streets = StreetIndexBuilder::new(StreetIndexConfig::default());
        streets.add_street("Storgata", &[lat_lon(60.0, 9.99), lat_lon(60.0, 10.01)]);
        Enricher {
            admin: admin.build(),
            streets: Some(streets.build()),
            nodes,
            way_centroids: CoordinateStore::default(),
            skipped: 0,
        }
    }

    #[rstest]
    fn nodes_get_region_and_street(nodes: CoordinateStore) {
        let mut enricher = enricher(&nodes);
        let record = enricher
            .enrich(Entity::Node(Node {
                id: 7,
                location: lat_lon(60.0003, 10.0),
                tags: named("Cafe"),
            }))
            .expect("record");
        assert_eq!(record.county.map(|c| c.name).as_deref(), Some("Testcounty"));
        assert_eq!(record.street.as_deref(), Some("Storgata"));
        assert!(record.municipality.is_none());
    }

    #[rstest]
    fn ways_get_cached_centroids_without_street(nodes: CoordinateStore) {
        let mut enricher = enricher(&nodes);
        let record = enricher
            .enrich(Entity::Way(Way {
                id: 8,
                node_ids: vec![1, 2],
                tags: named("Square"),
            }))
            .expect("record");
        assert_eq!(record.location, lat_lon(60.0, 10.1));
        assert!(record.street.is_none());
        assert!(enricher.way_centroids.contains(8));
    }

    #[rstest]
    fn relations_with_unresolved_members_are_skipped(nodes: CoordinateStore) {
        let mut enricher = enricher(&nodes);
        let relation = Relation {
            id: 9,
            members: vec![
                RelationMember {
                    kind: MemberKind::Node,
                    id: 3,
                    role: String::new(),
                },
                RelationMember {
                    kind: MemberKind::Way,
                    id: 404,
                    role: "outer".into(),
                },
            ],
            tags: named("Fortress"),
        };
        assert!(enricher.enrich(Entity::Relation(relation)).is_none());
        assert_eq!(enricher.skipped, 1);
    }

    #[rstest]
    fn unnamed_entities_are_skipped(nodes: CoordinateStore) {
        let mut enricher = enricher(&nodes);
        let node = Entity::Node(Node {
            id: 10,
            location: lat_lon(60.0, 10.0),
            tags: Tags::new(),
        });
        assert!(enricher.enrich(node).is_none());
        assert_eq!(enricher.skipped, 1);
    }
}
