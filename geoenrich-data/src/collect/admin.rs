//! Stage 1: administrative boundary relations.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use geo::Coord;
use geoenrich_core::{
    AdminBoundaryIndex, AdminBoundaryIndexBuilder, AdminIndexConfig, AdministrativeBoundary,
    EntityKind,
};
use log::{debug, warn};

use super::for_each_entity;
use crate::config::PipelineConfig;
use crate::entity::{Entity, EntityFilter, MemberKind, Relation};
use crate::source::{EntitySource, SourceError};
use crate::tags;

/// What stage 1 keeps of a boundary relation until its ring is assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminRelationData {
    /// Relation identifier.
    pub id: i64,
    /// Value of `name`.
    pub name: String,
    /// Parsed `admin_level`.
    pub admin_level: u8,
    /// `ref` or a national reference number.
    pub reference: Option<String>,
    /// Resolved ISO country code.
    pub country_code: String,
    /// Outer member ways, in relation order.
    pub way_ids: Vec<i64>,
}

/// Output of stage 1.
#[derive(Debug, Default)]
pub struct AdminRelations {
    /// Accepted relations in scan order.
    pub relations: Vec<AdminRelationData>,
    /// Union of every accepted relation's member ways.
    pub way_ids: Arc<HashSet<i64>>,
}

/// Selects county and municipality relations and records their outer ways.
#[derive(Debug)]
pub struct AdminRelationCollector<'a> {
    config: &'a PipelineConfig,
}

impl<'a> AdminRelationCollector<'a> {
    /// Collector for the levels configured in `config.admin`.
    #[must_use]
    pub const fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Relations tagged `boundary=administrative` at a configured level.
    #[must_use]
    pub fn filter(&self) -> EntityFilter {
        let levels = [
            self.config.admin.county_level,
            self.config.admin.municipality_level,
        ];
        EntityFilter::only(EntityKind::Relation).with_predicate(move |entity| {
            let tags = entity.tags();
            tags::is_admin_boundary(tags)
                && tags::admin_level(tags).is_some_and(|level| levels.contains(&level))
        })
    }

    /// Scan `source` once and keep every usable boundary relation.
    pub fn collect<S>(&self, source: &S) -> Result<AdminRelations, SourceError>
    where
        S: EntitySource + ?Sized,
    {
        let mut relations = Vec::new();
        let mut way_ids = HashSet::new();
        for_each_entity(source, &self.filter(), |entity| {
            let Entity::Relation(relation) = entity else {
                return;
            };
            if let Some(data) = self.accept(&relation) {
                way_ids.extend(data.way_ids.iter().copied());
                relations.push(data);
            }
        })?;
        Ok(AdminRelations {
            relations,
            way_ids: Arc::new(way_ids),
        })
    }

    /// Extract boundary data, or `None` when the relation is unusable.
    #[must_use]
    pub fn accept(&self, relation: &Relation) -> Option<AdminRelationData> {
        let tags = &relation.tags;
        let Some(name) = tags::name(tags) else {
            debug!("admin relation {} has no name; skipping", relation.id);
            return None;
        };
        let admin_level = tags::admin_level(tags)?;
        let fallback = self.config.default_country_code.as_deref();
        let Some(country_code) = tags::country_code(tags, fallback) else {
            debug!("admin relation {} ({name}) has no country code; skipping", relation.id);
            return None;
        };
        let way_ids = relation
            .members
            .iter()
            .filter(|member| {
                member.kind == MemberKind::Way && matches!(member.role.as_str(), "outer" | "")
            })
            .map(|member| member.id)
            .collect();
        Some(AdminRelationData {
            id: relation.id,
            name: name.to_owned(),
            admin_level,
            reference: tags::reference_code(tags),
            country_code,
            way_ids,
        })
    }
}

/// Assemble boundary rings from resolved member ways and index them.
///
/// Each ring is the concatenation of its member ways' coordinates in
/// relation order. Members that did not resolve are left out of the ring;
/// a relation with no resolved members is dropped.
#[must_use]
pub fn build_boundaries<S: std::hash::BuildHasher>(
    relations: Vec<AdminRelationData>,
    way_coords: &HashMap<i64, Vec<Coord<f64>>, S>,
    config: AdminIndexConfig,
) -> AdminBoundaryIndex {
    let mut builder = AdminBoundaryIndexBuilder::new(config);
    for relation in relations {
        let mut ring = Vec::new();
        let mut missing = 0_usize;
        for way_id in &relation.way_ids {
            match way_coords.get(way_id) {
                Some(coords) => ring.extend_from_slice(coords),
                None => missing += 1,
            }
        }
        if missing > 0 {
            warn!(
                "admin relation {} ({}) is missing {missing} of {} member ways",
                relation.id,
                relation.name,
                relation.way_ids.len()
            );
        }
        let boundary = AdministrativeBoundary::from_ring(
            relation.id,
            relation.name,
            relation.admin_level,
            relation.reference,
            relation.country_code,
            ring,
        );
        match boundary {
            Some(boundary) => {
                builder.add(boundary);
            }
            None => warn!("admin relation {} has no resolvable geometry", relation.id),
        }
    }
    builder.build()
}
