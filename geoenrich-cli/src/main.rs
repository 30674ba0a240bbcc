//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use geoenrich_cli::CliError;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match geoenrich_cli::run() {
        Ok(()) => {}
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            log::error!("{err}");
            let mut source = std::error::Error::source(&err);
            while let Some(cause) = source {
                log::error!("  caused by: {cause}");
                source = cause.source();
            }
            std::process::exit(1);
        }
    }
}
