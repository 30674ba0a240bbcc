//! Ingestion and enrichment pipeline for the geoenrich engine.
//!
//! Responsibilities:
//! - Read OSM entities from PBF files (or memory) through filtered scans.
//! - Collect boundary relations, required nodes and way geometry in
//!   successive passes.
//! - Enrich points of interest with their county, municipality and nearest
//!   street, and hand the records to a sink.
//!
//! Boundaries:
//! - Lookup structures and geometry live in `geoenrich-core`.
//! - Output formats belong to callers; this crate only defines [`RecordSink`].
//!
//! Invariants:
//! - Stages run strictly in order; each scan has one producer and one
//!   consumer.
//! - Decoded entities are buffered in a bounded channel.
//! - No global mutable state.

#![forbid(unsafe_code)]

pub mod collect;
pub mod config;
pub mod entity;
pub mod pipeline;
pub mod sink;
pub mod source;
pub mod tags;

pub use collect::{
    AdminRelationCollector, AdminRelationData, AdminRelations, NodeCoordinateCollector,
    RequiredNodeCollector, RequiredNodes, WayGeometry, WayGeometryCollector, build_boundaries,
};
pub use config::{DEFAULT_POI_KEYS, PipelineConfig};
pub use entity::{Entity, EntityFilter, MemberKind, Node, Relation, RelationMember, Way};
pub use pipeline::{Pipeline, PipelineError, PipelineReport, Stage, enrich_osm_pbf};
pub use sink::{RecordSink, SinkError};
pub use source::{EntitySource, MemorySource, PbfSource, PbfStream, SourceError};
