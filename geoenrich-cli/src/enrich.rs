//! Enrich command implementation.

use std::io::BufWriter;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use geoenrich_data::{EntitySource, PbfSource, Pipeline, PipelineConfig, PipelineReport};
use geoenrich_fs::EntryKind;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{ARG_OSM_PBF, ARG_OUTPUT, CliError, DEFAULT_OUTPUT, ENV_OSM_PBF, JsonLinesSink};

/// CLI arguments for the `enrich` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Run the enrichment pipeline over an OSM PBF extract and \
                 write one JSON record per named point of interest. Paths and \
                 lookup settings can come from CLI flags, configuration \
                 files, or environment variables.",
    about = "Enrich points of interest with county, municipality and street"
)]
#[ortho_config(prefix = "GEOENRICH")]
pub(crate) struct EnrichArgs {
    /// Path to the OpenStreetMap PBF file.
    #[arg(long = ARG_OSM_PBF, value_name = "path")]
    #[serde(default)]
    pub(crate) osm_pbf: Option<Utf8PathBuf>,
    /// Destination JSON Lines file (defaults to `enriched.jsonl`).
    #[arg(long = ARG_OUTPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
    /// OSM `admin_level` treated as a county.
    #[arg(long, value_name = "level")]
    #[serde(default)]
    pub(crate) county_level: Option<u8>,
    /// OSM `admin_level` treated as a municipality.
    #[arg(long, value_name = "level")]
    #[serde(default)]
    pub(crate) municipality_level: Option<u8>,
    /// Largest distance, in metres, at which a street still matches.
    #[arg(long, value_name = "metres")]
    #[serde(default)]
    pub(crate) street_radius: Option<f64>,
    /// Country code assumed for boundaries without country tags (`NO`
    /// unless set; an empty value skips such boundaries).
    #[arg(long, value_name = "code")]
    #[serde(default)]
    pub(crate) default_country: Option<String>,
    /// Whether to attach the nearest street to node records.
    #[arg(long, value_name = "bool")]
    #[serde(default)]
    pub(crate) resolve_streets: Option<bool>,
    /// Entities buffered between the decoder thread and the pipeline.
    #[arg(long, value_name = "count")]
    #[serde(default)]
    pub(crate) channel_capacity: Option<usize>,
}

impl EnrichArgs {
    pub(crate) fn into_config(self) -> Result<EnrichConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        EnrichConfig::try_from(merged)
    }
}

/// Resolved `enrich` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EnrichConfig {
    pub(crate) osm_pbf: Utf8PathBuf,
    pub(crate) output: Utf8PathBuf,
    pub(crate) pipeline: PipelineConfig,
}

impl EnrichConfig {
    pub(crate) fn validate(&self) -> Result<(), CliError> {
        self.pipeline.validate()?;
        match inspect(&self.osm_pbf, ARG_OSM_PBF)? {
            EntryKind::File => {}
            EntryKind::Missing => {
                return Err(CliError::MissingSourceFile {
                    field: ARG_OSM_PBF,
                    path: self.osm_pbf.clone(),
                });
            }
            EntryKind::Directory | EntryKind::Other => {
                return Err(CliError::SourcePathNotFile {
                    field: ARG_OSM_PBF,
                    path: self.osm_pbf.clone(),
                });
            }
        }
        if inspect(&self.output, ARG_OUTPUT)? == EntryKind::Directory {
            return Err(CliError::OutputIsDirectory {
                path: self.output.clone(),
            });
        }
        Ok(())
    }
}

fn inspect(path: &Utf8Path, field: &'static str) -> Result<EntryKind, CliError> {
    geoenrich_fs::entry_kind(path).map_err(|source| CliError::InspectPath {
        field,
        path: path.to_path_buf(),
        source,
    })
}

impl TryFrom<EnrichArgs> for EnrichConfig {
    type Error = CliError;

    fn try_from(args: EnrichArgs) -> Result<Self, Self::Error> {
        let osm_pbf = args.osm_pbf.ok_or(CliError::MissingArgument {
            field: ARG_OSM_PBF,
            env: ENV_OSM_PBF,
        })?;
        let output = args
            .output
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_OUTPUT));

        let mut pipeline = PipelineConfig::default();
        if let Some(level) = args.county_level {
            pipeline.admin.county_level = level;
        }
        if let Some(level) = args.municipality_level {
            pipeline.admin.municipality_level = level;
        }
        if let Some(radius) = args.street_radius {
            pipeline.street.max_distance_m = radius;
        }
        if let Some(code) = args.default_country {
            pipeline.default_country_code = Some(code).filter(|code| !code.is_empty());
        }
        if let Some(enabled) = args.resolve_streets {
            pipeline.resolve_streets = enabled;
        }
        if let Some(capacity) = args.channel_capacity {
            pipeline.channel_capacity = capacity;
        }

        Ok(Self {
            osm_pbf,
            output,
            pipeline,
        })
    }
}

pub(crate) fn run_enrich(args: EnrichArgs) -> Result<PipelineReport, CliError> {
    let config = args.into_config()?;
    config.validate()?;
    let source = PbfSource::open(config.osm_pbf.as_std_path())
        .map_err(geoenrich_data::PipelineError::Open)?
        .with_channel_capacity(config.pipeline.channel_capacity);
    enrich_into_output(&config, &source)
}

/// Run the pipeline over `source` and write records to `config.output`.
pub(crate) fn enrich_into_output<S>(config: &EnrichConfig, source: &S) -> Result<PipelineReport, CliError>
where
    S: EntitySource + ?Sized,
{
    let pipeline = Pipeline::new(config.pipeline.clone())?;
    let file = geoenrich_fs::create_file(&config.output).map_err(|source| {
        CliError::CreateOutput {
            path: config.output.clone(),
            source,
        }
    })?;
    let mut sink = JsonLinesSink::new(BufWriter::new(file));
    let report = pipeline.run(source, &mut sink)?;
    info!(
        "wrote {} records to {} ({} skipped)",
        report.records, config.output, report.skipped
    );
    Ok(report)
}
