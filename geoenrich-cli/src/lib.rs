//! Command-line interface for enriching OSM extracts.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};

mod enrich;
mod error;
mod sink;

pub use error::CliError;
pub use sink::JsonLinesSink;

use enrich::{EnrichArgs, run_enrich};

pub(crate) const ARG_OSM_PBF: &str = "osm-pbf";
pub(crate) const ARG_OUTPUT: &str = "output";
pub(crate) const ENV_OSM_PBF: &str = "GEOENRICH_CMDS_ENRICH_OSM_PBF";
pub(crate) const DEFAULT_OUTPUT: &str = "enriched.jsonl";

/// Run the CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Enrich(args) => {
            run_enrich(*args)?;
        }
    }
    Ok(())
}

#[derive(Debug, Parser)]
#[command(
    name = "geoenrich",
    about = "Annotate OSM points of interest with their region and street",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Enrich every named point of interest in an OSM PBF extract.
    Enrich(Box<EnrichArgs>),
}

#[cfg(test)]
mod tests;
