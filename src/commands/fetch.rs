use crate::commands::common::load_settings;
use camino::Utf8PathBuf;
use clap::Parser;
use opendata_pg::{Result, datasets, fetch};

#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// Path to configuration file
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,
}

/// Download the source archives into the configured download directory.
pub async fn fetch_datasets(args: &FetchArgs) -> Result<()> {
    let settings = load_settings(args.config.as_ref())?;
    let dir = &settings.download.dir;

    let census = datasets::census_sections();
    fetch::download(census.url, &dir.join(census.archive_file)).await?;

    let boundaries = datasets::municipal_boundaries();
    fetch::download(boundaries.url, &dir.join(boundaries.archive_file)).await?;

    println!("Source archives ready in {dir}");
    Ok(())
}
