//! Setup shared by every subcommand.

use camino::Utf8PathBuf;
use clap::ValueEnum;
use opendata_pg::Result;
use opendata_pg::config::Settings;
use opendata_pg::config::settings::DEFAULT_CONFIG_FILE;

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    None,
    /// Only error messages
    Error,
    /// Warning and error messages
    Warn,
    /// Info, warning, and error messages
    Info,
    /// Debug and above messages
    Debug,
    /// All messages including trace
    Trace,
}

/// Initialize logger based on log level
pub fn init_logging(log_level: LogLevel) {
    if log_level == LogLevel::None {
        return;
    }

    let level = match log_level {
        LogLevel::None => return, // Already checked above, but being explicit
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };

    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(matches!(log_level, LogLevel::Debug) || matches!(log_level, LogLevel::Trace))
        .init();
}

/// Load the run configuration from the given path or the default location.
pub fn load_settings(config: Option<&Utf8PathBuf>) -> Result<Settings> {
    let default = Utf8PathBuf::from(DEFAULT_CONFIG_FILE);
    Settings::load(config.unwrap_or(&default))
}
