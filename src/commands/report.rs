use crate::commands::common::load_settings;
use camino::Utf8PathBuf;
use clap::Parser;
use opendata_pg::db::Database;
use opendata_pg::{Result, report};
use owo_colors::OwoColorize;

#[derive(Parser, Debug)]
pub struct ReportArgs {
    /// Path to configuration file
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Province for the population density report
    #[arg(long, value_name = "NAME", default_value = "Milano")]
    pub province: String,
}

/// Run the two canned analytical queries against the materialized view.
pub async fn run_reports(args: &ReportArgs) -> Result<()> {
    let settings = load_settings(args.config.as_ref())?;
    let db = Database::connect(&settings.database).await?;

    println!("{}", format!("Population density by municipality, province of {}", args.province).bold());
    print_query(&db, &report::density_sql(&args.province)).await?;

    println!();
    println!("{}", "Top 10 provinces by university-educated population share".bold());
    print_query(&db, &report::top_provinces_sql()).await?;

    Ok(())
}

async fn print_query(db: &Database, sql: &str) -> Result<()> {
    match db.execute(sql).await? {
        Some(output) => print!("{}", report::render_table(&output)),
        None => println!("(no rows)"),
    }
    Ok(())
}
