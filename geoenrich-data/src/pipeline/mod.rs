//! The five-stage enrichment pipeline.
//!
//! Stages run strictly in order, each as its own filtered scan over the
//! source. Every stage hands the next an owned result; builders are frozen
//! into immutable indexes before the enrichment scan starts.

use std::fmt;
use std::path::Path;

use geoenrich_core::ConfigError;
use log::info;
use serde::Serialize;
use thiserror::Error;

use crate::collect::{
    AdminRelationCollector, NodeCoordinateCollector, RequiredNodeCollector, WayGeometryCollector,
    build_boundaries,
};
use crate::config::PipelineConfig;
use crate::entity::EntityFilter;
use crate::sink::{RecordSink, SinkError};
use crate::source::{EntitySource, PbfSource, SourceError};
use crate::tags;

mod enrich;

use enrich::Enricher;

/// A pipeline pass, used to attribute failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Scan for administrative boundary relations.
    AdminRelations,
    /// Scan for members of point-of-interest relations.
    RelationMembers,
    /// Scan for the nodes of relevant ways.
    WayNodes,
    /// Scan storing required node coordinates.
    NodeCoordinates,
    /// Scan resolving way geometry and building the indexes.
    BuildIndexes,
    /// Final scan producing enriched records.
    Enrich,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AdminRelations => "admin relations",
            Self::RelationMembers => "relation members",
            Self::WayNodes => "way nodes",
            Self::NodeCoordinates => "node coordinates",
            Self::BuildIndexes => "build indexes",
            Self::Enrich => "enrich",
        })
    }
}

/// Errors returned by [`Pipeline`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The configuration failed validation.
    #[error("invalid pipeline configuration")]
    Config(#[from] ConfigError),
    /// The source could not be opened before the first stage.
    #[error("failed to open entity source")]
    Open(#[source] SourceError),
    /// A scan failed.
    #[error("{stage} stage failed to read the source")]
    Scan {
        /// Stage whose scan failed.
        stage: Stage,
        /// Underlying source error.
        #[source]
        source: SourceError,
    },
    /// The sink rejected a record.
    #[error("{stage} stage failed to write output")]
    Sink {
        /// Stage that was writing.
        stage: Stage,
        /// Underlying sink error.
        #[source]
        source: SinkError,
    },
}

/// Counts gathered during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    /// Boundary relations accepted by stage 1.
    pub admin_relations: usize,
    /// Distinct node identifiers required by later stages.
    pub required_nodes: usize,
    /// Node coordinates actually found and stored.
    pub node_coordinates: usize,
    /// Way centroids stored, including those computed during enrichment.
    pub way_centroids: usize,
    /// Counties in the boundary index.
    pub counties: usize,
    /// Municipalities in the boundary index.
    pub municipalities: usize,
    /// Segments in the street index.
    pub street_segments: usize,
    /// Records handed to the sink.
    pub records: usize,
    /// POI entities dropped for lacking a name or geometry.
    pub skipped: usize,
}

/// Runs the stages over an [`EntitySource`] and feeds a [`RecordSink`].
///
/// # Examples
/// ```
/// use geoenrich_core::{EnrichedRecord, Tags, lat_lon};
/// use geoenrich_data::{Entity, MemorySource, Node, Pipeline, PipelineConfig};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let source = MemorySource::new(vec![Entity::Node(Node {
///     id: 1,
///     location: lat_lon(60.5, 10.5),
///     tags: Tags::from([("name".into(), "Cafe".into()), ("amenity".into(), "cafe".into())]),
/// })]);
/// let mut records: Vec<EnrichedRecord> = Vec::new();
/// let report = Pipeline::new(PipelineConfig::default())?.run(&source, &mut records)?;
/// assert_eq!(report.records, 1);
/// assert!(records[0].county.is_none());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Validate `config` and wrap it.
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Settings this pipeline runs with.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run all stages against `source`, writing records to `sink`.
    pub fn run<S, K>(&self, source: &S, sink: &mut K) -> Result<PipelineReport, PipelineError>
    where
        S: EntitySource + ?Sized,
        K: RecordSink + ?Sized,
    {
        let config = &self.config;
        let mut report = PipelineReport::default();

        let admin = AdminRelationCollector::new(config)
            .collect(source)
            .map_err(scan_error(Stage::AdminRelations))?;
        report.admin_relations = admin.relations.len();
        info!(
            "{}: {} relations, {} member ways",
            Stage::AdminRelations,
            admin.relations.len(),
            admin.way_ids.len()
        );

        let members = RequiredNodeCollector::new(config, admin.way_ids.clone())
            .collect_relation_members(source)
            .map_err(scan_error(Stage::RelationMembers))?;
        info!("{}: done", Stage::RelationMembers);
        let required = members
            .collect_way_nodes(source)
            .map_err(scan_error(Stage::WayNodes))?;
        report.required_nodes = required.node_ids.len();
        info!(
            "{}: {} required nodes, {} POI relation ways",
            Stage::WayNodes,
            required.node_ids.len(),
            required.poi_way_ids.len()
        );

        let nodes = NodeCoordinateCollector::new(config, required.node_ids.clone())
            .collect(source)
            .map_err(scan_error(Stage::NodeCoordinates))?;
        report.node_coordinates = nodes.len();
        info!("{}: {} stored", Stage::NodeCoordinates, nodes.len());

        let geometry = WayGeometryCollector::new(
            config,
            &nodes,
            admin.way_ids.clone(),
            required.poi_way_ids.clone(),
        )
        .collect(source)
        .map_err(scan_error(Stage::BuildIndexes))?;
        let boundaries = build_boundaries(
            admin.relations,
            &geometry.admin_way_coords,
            config.admin.clone(),
        );
        report.counties = boundaries.counties().len();
        report.municipalities = boundaries.municipalities().len();
        report.street_segments = geometry.streets.segment_count();
        info!(
            "{}: {} counties, {} municipalities, {} street segments, {} way centroids",
            Stage::BuildIndexes,
            report.counties,
            report.municipalities,
            report.street_segments,
            geometry.way_centroids.len()
        );

        let mut enricher = Enricher {
            admin: boundaries,
            streets: config.resolve_streets.then(|| geometry.streets.build()),
            nodes: &nodes,
            way_centroids: geometry.way_centroids,
            skipped: 0,
        };
        let poi_keys = config.poi_keys.clone();
        let filter =
            EntityFilter::all().with_predicate(move |entity| tags::is_poi(entity.tags(), &poi_keys));
        for entity in source
            .scan(&filter)
            .map_err(scan_error(Stage::Enrich))?
        {
            let entity = entity.map_err(scan_error(Stage::Enrich))?;
            if let Some(record) = enricher.enrich(entity) {
                sink.write(record).map_err(sink_error(Stage::Enrich))?;
                report.records += 1;
            }
        }
        sink.flush().map_err(sink_error(Stage::Enrich))?;
        report.skipped = enricher.skipped;
        report.way_centroids = enricher.way_centroids.len();
        info!(
            "{}: {} records, {} skipped",
            Stage::Enrich,
            report.records,
            report.skipped
        );
        Ok(report)
    }
}

fn scan_error(stage: Stage) -> impl Fn(SourceError) -> PipelineError {
    move |source| PipelineError::Scan { stage, source }
}

fn sink_error(stage: Stage) -> impl Fn(SinkError) -> PipelineError {
    move |source| PipelineError::Sink { stage, source }
}

/// Enrich every point of interest in an OSM PBF file.
///
/// # Examples
/// ```no_run
/// use geoenrich_core::EnrichedRecord;
/// use geoenrich_data::{PipelineConfig, enrich_osm_pbf};
///
/// # fn main() -> Result<(), geoenrich_data::PipelineError> {
/// let mut records: Vec<EnrichedRecord> = Vec::new();
/// let report = enrich_osm_pbf("norway-latest.osm.pbf", PipelineConfig::default(), &mut records)?;
/// println!("{} records, {} skipped", report.records, report.skipped);
/// # Ok(())
/// # }
/// ```
pub fn enrich_osm_pbf<K>(
    path: impl AsRef<Path>,
    config: PipelineConfig,
    sink: &mut K,
) -> Result<PipelineReport, PipelineError>
where
    K: RecordSink + ?Sized,
{
    let pipeline = Pipeline::new(config)?;
    let source = PbfSource::open(path)
        .map_err(PipelineError::Open)?
        .with_channel_capacity(pipeline.config().channel_capacity);
    pipeline.run(&source, sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Stage::AdminRelations, "admin relations")]
    #[case(Stage::BuildIndexes, "build indexes")]
    fn stages_have_readable_names(#[case] stage: Stage, #[case] expected: &str) {
        assert_eq!(stage.to_string(), expected);
    }

    #[rstest]
    fn invalid_configuration_is_rejected() {
        let config = PipelineConfig {
            channel_capacity: 0,
            ..PipelineConfig::default()
        };
        assert!(Pipeline::new(config).is_err());
    }

    #[rstest]
    fn scan_errors_carry_the_stage() {
        let error = scan_error(Stage::WayNodes)(SourceError::WorkerPanicked {
            path: "x.osm.pbf".into(),
        });
        assert_eq!(error.to_string(), "way nodes stage failed to read the source");
    }
}
