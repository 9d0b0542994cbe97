use crate::commands::common::load_settings;
use camino::Utf8PathBuf;
use clap::Parser;
use opendata_pg::db::Database;
use opendata_pg::ingest::batch::{BatchSummary, OnFileError, import_archive};
use opendata_pg::ingest::ogr::OgrTool;
use opendata_pg::ingest::{geo, view};
use opendata_pg::{Result, datasets};

/// Log target for the load pipeline
const LOG_TARGET: &str = "      load";

#[derive(Parser, Debug)]
pub struct LoadArgs {
    /// Path to configuration file
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Append to existing tables instead of dropping and recreating them
    #[arg(long)]
    pub append: bool,

    /// What to do when one file's import fails
    #[arg(long, value_name = "POLICY", default_value = "skip")]
    pub on_file_error: OnFileError,
}

/// Run the whole ingestion pipeline: census batch import, boundary-layer
/// import, then materialization of the analytical view.
pub async fn load_datasets(args: &LoadArgs) -> Result<()> {
    let settings = load_settings(args.config.as_ref())?;
    let overwrite = !args.append;

    let db = Database::connect(&settings.database).await?;
    let tool = OgrTool::new(&settings.database);

    let census = datasets::census_sections();
    let summary = import_archive(&db, &tool, &census, &settings.download.dir, overwrite, args.on_file_error).await?;
    print_summary(&census.dest.dotted(), &summary);

    // A failed boundary import is logged and the run continues; the view
    // step validates its prerequisites and reports what is missing.
    let boundaries = datasets::municipal_boundaries();
    if let Err(e) = geo::import_boundaries(&tool, &boundaries, &settings.download.dir).await {
        log::error!(target: LOG_TARGET, "boundary import failed, continuing: {e}");
    }

    view::materialize(&db, overwrite).await?;
    println!("Analytical view {} is ready.", datasets::VIEW_DEST.dotted());
    Ok(())
}

fn print_summary(dest: &str, summary: &BatchSummary) {
    println!(
        "Imported {} of {} files into {dest} ({} rows).",
        summary.loaded, summary.attempted, summary.rows
    );

    if !summary.is_complete() {
        println!("{} file(s) were skipped:", summary.failed.len());
        for (member, error) in &summary.failed {
            println!("  {member}: {error}");
        }
    }
}
