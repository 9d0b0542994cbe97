use camino::Utf8PathBuf;
use clap::Parser;
use opendata_pg::Result;
use opendata_pg::config::Settings;
use opendata_pg::config::settings::DEFAULT_CONFIG_FILE;

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Output configuration file path
    #[arg(value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub output: Utf8PathBuf,
}

pub fn init_config(args: &InitArgs) -> Result<()> {
    let settings = Settings::default();
    settings.save(&args.output)?;
    println!("Generated default configuration file: {}", args.output);
    println!("Edit the [database] section before running `opendata-pg load`.");
    Ok(())
}
