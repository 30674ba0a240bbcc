//! Stage 4: resolve way geometry for boundaries, centroids and streets.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use geo::Coord;
use geoenrich_core::{CoordinateStore, StreetIndexBuilder, centroid};
use log::debug;

use super::for_each_entity;
use super::nodes::relevant_ways;
use crate::config::PipelineConfig;
use crate::entity::{Entity, Way};
use crate::source::{EntitySource, SourceError};
use crate::tags;

/// Output of stage 4.
#[derive(Debug)]
pub struct WayGeometry {
    /// Fully resolved coordinates of boundary member ways.
    pub admin_way_coords: HashMap<i64, Vec<Coord<f64>>>,
    /// Centroids of boundary and POI relation member ways.
    pub way_centroids: CoordinateStore,
    /// Named streets with at least two resolved vertices.
    pub streets: StreetIndexBuilder,
}

/// Resolves relevant ways against the node coordinate store.
#[derive(Debug)]
pub struct WayGeometryCollector<'a> {
    config: &'a PipelineConfig,
    nodes: &'a CoordinateStore,
    admin_way_ids: Arc<HashSet<i64>>,
    poi_way_ids: Arc<HashSet<i64>>,
}

impl<'a> WayGeometryCollector<'a> {
    /// Collector over the node coordinates stored by stage 3.
    #[must_use]
    pub const fn new(
        config: &'a PipelineConfig,
        nodes: &'a CoordinateStore,
        admin_way_ids: Arc<HashSet<i64>>,
        poi_way_ids: Arc<HashSet<i64>>,
    ) -> Self {
        Self {
            config,
            nodes,
            admin_way_ids,
            poi_way_ids,
        }
    }

    /// Scan ways once and resolve every relevant one.
    pub fn collect<S>(&self, source: &S) -> Result<WayGeometry, SourceError>
    where
        S: EntitySource + ?Sized,
    {
        let mut geometry = WayGeometry {
            admin_way_coords: HashMap::new(),
            way_centroids: CoordinateStore::with_capacity(self.config.way_store_capacity),
            streets: StreetIndexBuilder::new(self.config.street.clone()),
        };
        let filter = relevant_ways(self.config, &self.admin_way_ids, &self.poi_way_ids);
        for_each_entity(source, &filter, |entity| {
            if let Entity::Way(way) = entity {
                self.resolve(&way, &mut geometry);
            }
        })?;
        Ok(geometry)
    }

    fn resolve(&self, way: &Way, geometry: &mut WayGeometry) {
        let coords: Vec<_> = way
            .node_ids
            .iter()
            .filter_map(|&id| self.nodes.get(id))
            .collect();
        let complete = !coords.is_empty() && coords.len() == way.node_ids.len();
        let is_admin = self.admin_way_ids.contains(&way.id);
        let is_member = is_admin || self.poi_way_ids.contains(&way.id);

        if is_member {
            match centroid(&coords).filter(|_| complete) {
                Some(center) => geometry.way_centroids.put(way.id, center),
                None => debug!(
                    "way {} resolved {} of {} nodes; no centroid",
                    way.id,
                    coords.len(),
                    way.node_ids.len()
                ),
            }
        }
        if let Some(name) = tags::name(&way.tags).filter(|_| tags::is_street(&way.tags)) {
            geometry.streets.add_street(name, &coords);
        }
        if is_admin && complete {
            geometry.admin_way_coords.insert(way.id, coords);
        }
    }
}
