//! Facade crate for the geoenrich OSM enrichment engine.
//!
//! This crate re-exports the core lookup types and, behind the default
//! `pipeline` feature, the entity sources and the enrichment pipeline.

#![forbid(unsafe_code)]

pub use geoenrich_core::{
    AdminBoundaryIndex, AdminBoundaryIndexBuilder, AdminIndexConfig, AdministrativeBoundary,
    BoundingBox, ConfigError, CoordinateStore, EnrichedRecord, EntityKind, RegionRef,
    StreetIndex, StreetIndexBuilder, StreetIndexConfig, Tags, centroid, lat_lon,
};

#[cfg(feature = "pipeline")]
pub use geoenrich_data::{
    Entity, EntityFilter, EntitySource, MemorySource, PbfSource, Pipeline, PipelineConfig,
    PipelineError, PipelineReport, RecordSink, SinkError, SourceError, enrich_osm_pbf,
};
