pub mod settings;

pub use settings::{DatabaseSettings, DownloadSettings, Settings};
