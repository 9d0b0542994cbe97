//! A tool that provisions open-government census datasets into PostGIS.
//!
//! # Overview
//!
//! `opendata-pg` downloads a fixed set of open-government datasets (the 2011
//! census indicators per census section and the municipality boundary layer),
//! loads them into a PostGIS database under an idempotent schema, and
//! materializes a derived analytical table joining the two on the combined
//! municipal identifier. Imports run through the external `ogr2ogr`
//! conversion tool, streaming archive members via GDAL's `/vsizip/` virtual
//! filesystem.
//!
//! # Quick Start
//!
//! ```bash
//! opendata-pg init                 # write catalog.toml, then edit [database]
//! opendata-pg fetch                # download the source archives
//! opendata-pg load                 # provision tables, import, build the view
//! opendata-pg report               # run the canned analytical queries
//! ```
//!
//! # Behavior Notes
//!
//! A failing member file is skipped by default and surfaced in the import
//! summary; pass `--on-file-error abort` to stop the batch at the first
//! failure instead. `load --append` keeps existing tables rather than
//! dropping and recreating them. `ogr2ogr` (GDAL) must be on `PATH`, and the
//! target database needs the PostGIS extension installed.

use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand};
use opendata_pg::Result;

mod commands;

use crate::commands::{
    FetchArgs, InitArgs, LoadArgs, LogLevel, ReportArgs, fetch_datasets, init_config, init_logging, load_datasets, run_reports,
};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "opendata-pg", version, about)]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a default configuration file
    Init(InitArgs),
    /// Download the source archives into the download directory
    Fetch(FetchArgs),
    /// Provision tables, import both datasets, and materialize the analytical view
    Load(LoadArgs),
    /// Run the canned analytical queries against the materialized view
    Report(ReportArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    match &cli.command {
        Command::Init(args) => init_config(args),
        Command::Fetch(args) => fetch_datasets(args).await,
        Command::Load(args) => load_datasets(args).await,
        Command::Report(args) => run_reports(args).await,
    }
}
