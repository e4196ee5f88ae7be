//! This is the `goprop` app.
#![deny(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![warn(missing_docs)]

use clap::{Parser, Subcommand};
use goprop::{ancestors, common, propagate};

/// CLI parser based on clap.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Propagation of Gene Ontology annotations",
    long_about = "goprop propagates gene-to-term annotations along the is_a and part_of \
    relations of the Gene Ontology so that every gene carries the full closure of terms \
    implied by its direct annotations"
)]
struct Cli {
    /// Commonly used arguments
    #[command(flatten)]
    common: common::Args,

    /// The sub command to run
    #[command(subcommand)]
    command: Commands,
}

/// Enum supporting the parsing of sub commands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Propagate annotations to the ancestor closure
    Propagate(propagate::Args),
    /// Print the ancestors of terms
    Ancestors(ancestors::Args),
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Build a tracing subscriber according to the configuration in `cli.common`.
    let collector = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(match cli.common.verbose.log_level() {
            Some(level) => match level {
                log::Level::Error => tracing::Level::ERROR,
                log::Level::Warn => tracing::Level::WARN,
                log::Level::Info => tracing::Level::INFO,
                log::Level::Debug => tracing::Level::DEBUG,
                log::Level::Trace => tracing::Level::TRACE,
            },
            None => tracing::Level::INFO,
        })
        .compact()
        .finish();

    // Install collector and go into sub commands.
    tracing::subscriber::with_default(collector, || {
        match &cli.command {
            Commands::Propagate(args) => {
                propagate::run(&cli.common, args)?;
            }
            Commands::Ancestors(args) => {
                ancestors::run(&cli.common, args)?;
            }
        }

        Ok::<(), anyhow::Error>(())
    })?;

    Ok(())
}
