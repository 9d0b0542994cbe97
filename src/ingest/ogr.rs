use crate::Result;
use crate::config::DatabaseSettings;
use crate::db::TableRef;
use camino::Utf8PathBuf;
use core::time::Duration;
use ohno::{IntoAppError, bail};
use tokio::process::Command;

/// Log target for external tool invocations
const LOG_TARGET: &str = "       ogr";

/// Virtual-filesystem prefix that lets the conversion tool stream a member
/// out of a zip archive without extracting it to disk.
pub const VSIZIP_PREFIX: &str = "/vsizip/";

const OGR_BINARY: &str = "ogr2ogr";

/// A hung conversion process would otherwise block the pipeline forever.
const TOOL_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// One external-tool invocation unit: a source path, its destination table,
/// and whether the path addresses a member inside a zip archive.
#[derive(Debug, Clone)]
pub struct ImportJob {
    /// Source path; for archive members this is `<archive-path>/<member-relative-path>`
    pub source: Utf8PathBuf,
    pub dest: TableRef,
    pub in_archive: bool,
    /// Field delimiter of the delimited source, passed through to the tool
    pub delimiter: u8,
}

impl ImportJob {
    /// The path handed to the conversion tool: rewritten with the
    /// virtual-archive prefix if and only if the job addresses an archive
    /// member; a plain path is passed through unchanged.
    #[must_use]
    pub fn tool_source(&self) -> String {
        if self.in_archive {
            format!("{VSIZIP_PREFIX}{}", self.source)
        } else {
            self.source.to_string()
        }
    }
}

/// Seam for the batch orchestrator, so per-file failure handling is testable
/// without spawning the real conversion tool.
pub trait ImportTool {
    /// Append the rows of one source file into its destination table.
    async fn append(&self, job: &ImportJob) -> Result<()>;
}

/// Invokes the external vector/tabular conversion utility against the
/// configured database.
#[derive(Debug)]
pub struct OgrTool {
    conn: String,
}

impl OgrTool {
    #[must_use]
    pub fn new(settings: &DatabaseSettings) -> Self {
        Self {
            conn: settings.ogr_conn_str(),
        }
    }

    /// Arguments for an append-mode import of a delimited source, empty
    /// string fields treated as null.
    #[must_use]
    pub fn append_args(&self, job: &ImportJob) -> Vec<String> {
        vec![
            "-f".to_string(),
            "PostgreSQL".to_string(),
            self.conn.clone(),
            job.tool_source(),
            "-nln".to_string(),
            job.dest.dotted(),
            "-append".to_string(),
            "-oo".to_string(),
            "EMPTY_STRING_AS_NULL=YES".to_string(),
            "-oo".to_string(),
            format!("SEPARATOR={}", separator_name(job.delimiter)),
        ]
    }

    /// Arguments for an overwrite-mode import of a standalone vector dataset,
    /// geometries forced to a single polygon-collection subtype and automatic
    /// precision snapping disabled.
    #[must_use]
    pub fn vector_args(&self, source: &str, dest: TableRef) -> Vec<String> {
        vec![
            "-f".to_string(),
            "PostgreSQL".to_string(),
            self.conn.clone(),
            source.to_string(),
            "-nln".to_string(),
            dest.dotted(),
            "-overwrite".to_string(),
            "-nlt".to_string(),
            "MULTIPOLYGON".to_string(),
            "-lco".to_string(),
            "PRECISION=NO".to_string(),
        ]
    }

    /// Overwrite-mode import of a standalone vector dataset.
    pub async fn import_vector(&self, source: &str, dest: TableRef) -> Result<()> {
        let args = self.vector_args(source, dest);
        let output = run_tool_with_timeout(&args).await?;
        check_tool_output(&output, source)
    }
}

impl ImportTool for OgrTool {
    async fn append(&self, job: &ImportJob) -> Result<()> {
        let args = self.append_args(job);
        let output = run_tool_with_timeout(&args).await?;
        check_tool_output(&output, &job.tool_source())
    }
}

fn separator_name(delimiter: u8) -> &'static str {
    match delimiter {
        b';' => "SEMICOLON",
        b'\t' => "TAB",
        b' ' => "SPACE",
        _ => "COMMA",
    }
}

fn check_tool_output(output: &std::process::Output, source: &str) -> Result<()> {
    if !output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "{OGR_BINARY} failed on '{source}' ({}): {} {}",
            output.status,
            stdout.trim(),
            stderr.trim()
        );
    }
    Ok(())
}

async fn run_tool_with_timeout(args: &[String]) -> Result<std::process::Output> {
    log::debug!(target: LOG_TARGET, "running {OGR_BINARY} {}", args.join(" "));

    let child = Command::new(OGR_BINARY)
        .args(args)
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .into_app_err_with(|| format!("could not spawn {OGR_BINARY}, is GDAL installed?"))?;

    match tokio::time::timeout(TOOL_TIMEOUT, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(e).into_app_err_with(|| format!("{OGR_BINARY} failed to run")),
        Err(_) => {
            bail!("{OGR_BINARY} timed out after {} seconds", TOOL_TIMEOUT.as_secs());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::{ExitStatus, Output};

    const DEST: TableRef = TableRef {
        schema: "istat",
        table: "census_sections",
    };

    fn job(in_archive: bool) -> ImportJob {
        ImportJob {
            source: Utf8PathBuf::from("downloads/sezioni.zip/R01_indicatori_2011_sezioni.csv"),
            dest: DEST,
            in_archive,
            delimiter: b';',
        }
    }

    fn tool() -> OgrTool {
        OgrTool {
            conn: "PG:host=localhost port=5432 dbname=opendata user=postgres".to_string(),
        }
    }

    #[test]
    fn test_archive_member_gets_vsizip_prefix() {
        assert_eq!(
            job(true).tool_source(),
            "/vsizip/downloads/sezioni.zip/R01_indicatori_2011_sezioni.csv"
        );
    }

    #[test]
    fn test_plain_path_passes_through_unchanged() {
        assert_eq!(job(false).tool_source(), "downloads/sezioni.zip/R01_indicatori_2011_sezioni.csv");
    }

    #[test]
    fn test_append_args_shape() {
        let args = tool().append_args(&job(true));
        assert!(args.contains(&"-append".to_string()));
        assert!(args.contains(&"EMPTY_STRING_AS_NULL=YES".to_string()));
        assert!(args.contains(&"SEPARATOR=SEMICOLON".to_string()));
        assert!(args.contains(&"istat.census_sections".to_string()));
        assert!(!args.contains(&"-overwrite".to_string()));
    }

    #[test]
    fn test_vector_args_shape() {
        let args = tool().vector_args("/vsizip/downloads/limiti.zip/Com2011_WGS84/Com2011_WGS84.shp", DEST);
        assert!(args.contains(&"-overwrite".to_string()));
        assert!(args.contains(&"MULTIPOLYGON".to_string()));
        assert!(args.contains(&"PRECISION=NO".to_string()));
        assert!(!args.contains(&"-append".to_string()));
    }

    #[test]
    fn test_separator_names() {
        assert_eq!(separator_name(b';'), "SEMICOLON");
        assert_eq!(separator_name(b','), "COMMA");
        assert_eq!(separator_name(b'\t'), "TAB");
    }

    #[test]
    fn test_check_tool_output_failure_carries_captured_output() {
        #[cfg(unix)]
        let status = {
            use std::os::unix::process::ExitStatusExt;
            ExitStatus::from_raw(256) // Exit code 1
        };

        #[cfg(windows)]
        let status = {
            use std::os::windows::process::ExitStatusExt;
            ExitStatus::from_raw(1)
        };

        let output = Output {
            status,
            stdout: b"0 features written".to_vec(),
            stderr: b"ERROR 1: no such layer".to_vec(),
        };

        let err = check_tool_output(&output, "bad.csv").unwrap_err();
        let text = err.to_string();
        assert!(text.contains("bad.csv"));
        assert!(text.contains("no such layer"));
    }

    #[test]
    fn test_check_tool_output_success() {
        #[cfg(unix)]
        let status = {
            use std::os::unix::process::ExitStatusExt;
            ExitStatus::from_raw(0)
        };

        #[cfg(windows)]
        let status = {
            use std::os::windows::process::ExitStatusExt;
            ExitStatus::from_raw(0)
        };

        let output = Output {
            status,
            stdout: vec![],
            stderr: vec![],
        };

        check_tool_output(&output, "good.csv").unwrap();
    }
}
