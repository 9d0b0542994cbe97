use crate::Result;
use camino::{Utf8Path, Utf8PathBuf};
use core::fmt::Write as _;
use ohno::{IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;

/// Default configuration file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "catalog.toml";

/// Where downloaded source archives are kept.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DownloadSettings {
    /// Directory the `fetch` command writes archives into and the `load` command reads them from
    pub dir: Utf8PathBuf,
}

/// Connection parameters for the target database.
///
/// The same credentials serve both the long-lived connection held by the
/// pipeline and the connection string handed to the external conversion tool.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
}

impl DatabaseSettings {
    /// Connection configuration for the pipeline's own database connection.
    #[must_use]
    pub fn client_config(&self) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        let _ = config
            .host(&self.host)
            .port(self.port)
            .dbname(&self.name)
            .user(&self.user)
            .password(&self.password);
        config
    }

    /// GDAL-style connection string passed to the external conversion tool.
    #[must_use]
    pub fn ogr_conn_str(&self) -> String {
        let mut conn = format!(
            "PG:host={} port={} dbname={} user={}",
            self.host, self.port, self.name, self.user
        );

        if !self.password.is_empty() {
            let _ = write!(conn, " password={}", self.password);
        }

        conn
    }
}

/// Immutable run configuration, loaded once at startup and passed by
/// reference into every component that needs it.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub download: DownloadSettings,
    pub database: DatabaseSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            download: DownloadSettings {
                dir: Utf8PathBuf::from("downloads"),
            },
            database: DatabaseSettings {
                host: "localhost".to_string(),
                port: 5432,
                name: "opendata".to_string(),
                user: "postgres".to_string(),
                password: String::new(),
            },
        }
    }
}

impl Settings {
    /// Load configuration from a file
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable, or unparseable
    pub fn load(config_path: &Utf8Path) -> Result<Self> {
        let text = match fs::read_to_string(config_path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(app_err!(
                    "configuration file '{config_path}' not found, run `opendata-pg init` to create one"
                ));
            }
            Err(e) => return Err(e).into_app_err_with(|| format!("reading configuration from {config_path}")),
        };

        toml::from_str(&text).into_app_err_with(|| format!("parsing configuration from {config_path}"))
    }

    /// Save configuration to a file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save(&self, output_path: &Utf8Path) -> Result<()> {
        let text = toml::to_string_pretty(self).into_app_err_with(|| format!("serializing configuration for {output_path}"))?;
        fs::write(output_path, text).into_app_err_with(|| format!("writing configuration to {output_path}"))?;
        Ok(())
    }
}
