//! Subcommand entry points.

mod common;
mod fetch;
mod init;
mod load;
mod report;

pub use common::{LogLevel, init_logging};
pub use fetch::{FetchArgs, fetch_datasets};
pub use init::{InitArgs, init_config};
pub use load::{LoadArgs, load_datasets};
pub use report::{ReportArgs, run_reports};
