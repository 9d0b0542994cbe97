use crate::Result;
use crate::datasets::DataSource;
use crate::db::Database;
use crate::ingest::ogr::{ImportJob, ImportTool};
use crate::ingest::{provision, schema};
use camino::Utf8Path;
use clap::ValueEnum;
use core::ops::RangeInclusive;
use ohno::EnrichableExt;
use std::time::Instant;

/// Log target for batch imports
const LOG_TARGET: &str = "     batch";

/// Enumeration rule for the member files of one archive.
///
/// The rule is injected data, not a constant wired into the orchestrator, so
/// a differently-structured dataset gets its own rule instead of silently
/// under-importing.
#[derive(Debug, Clone)]
pub enum MemberSet {
    /// A naming template applied over a zero-padded numeric suffix range.
    /// The template's `{n}` placeholder is replaced by each padded index.
    Indexed {
        template: &'static str,
        width: usize,
        range: RangeInclusive<u32>,
    },
    /// An explicit list of member names.
    Fixed(Vec<String>),
}

impl MemberSet {
    /// Expand the rule into the expected member names, in order.
    #[must_use]
    pub fn members(&self) -> Vec<String> {
        match self {
            Self::Indexed { template, width, range } => {
                let width = *width;
                range
                    .clone()
                    .map(|index| template.replace("{n}", &format!("{index:0width$}")))
                    .collect()
            }
            Self::Fixed(names) => names.clone(),
        }
    }
}

/// What to do when one file's import tool invocation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OnFileError {
    /// Log the failure, skip the file, continue with the rest of the batch
    #[default]
    Skip,
    /// Abort the batch on the first failing file
    Abort,
}

/// Structured outcome of one batch import.
#[derive(Debug)]
pub struct BatchSummary {
    /// Member files the orchestrator tried to import
    pub attempted: usize,
    /// Member files the tool imported without error
    pub loaded: usize,
    /// `(member source, error)` per failed file
    pub failed: Vec<(String, String)>,
    /// Row count of the destination table after the batch
    pub rows: i64,
}

impl BatchSummary {
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Import every expected member of one archive into its destination table.
///
/// Infers the schema from the dataset's sample member, provisions the
/// destination, runs one tool invocation per member, then reports the
/// resulting row count. Under [`OnFileError::Skip`] a failing file reduces
/// the final count but never stops the batch or the count query.
pub async fn import_archive<T: ImportTool>(
    db: &Database,
    tool: &T,
    source: &DataSource,
    download_dir: &Utf8Path,
    overwrite: bool,
    on_file_error: OnFileError,
) -> Result<BatchSummary> {
    let archive_path = download_dir.join(source.archive_file);
    log::info!(target: LOG_TARGET, "importing dataset '{}' from '{archive_path}'", source.name);

    let inferred = schema::infer_from_archive(&archive_path, source.sample_member, source.delimiter)
        .map_err(|e| e.enrich_with(|| format!("cannot import dataset '{}'", source.name)))?;

    provision::ensure_schema(db, source.dest.schema).await?;
    provision::provision(db, source.dest, &inferred, overwrite).await?;

    let jobs: Vec<ImportJob> = source
        .members
        .members()
        .into_iter()
        .map(|member| ImportJob {
            source: archive_path.join(member),
            dest: source.dest,
            in_archive: true,
            delimiter: source.delimiter,
        })
        .collect();

    let (loaded, failed) = drive_jobs(tool, &jobs, on_file_error).await?;

    let rows = db.count(source.dest).await?;
    log::info!(
        target: LOG_TARGET,
        "dataset '{}': {loaded}/{} files imported, {rows} rows in {}",
        source.name,
        jobs.len(),
        source.dest.dotted()
    );

    Ok(BatchSummary {
        attempted: jobs.len(),
        loaded,
        failed,
        rows,
    })
}

/// Run the jobs strictly in sequence, applying the per-file failure policy.
///
/// Returns the number of successful jobs plus the failures that were skipped.
pub async fn drive_jobs<T: ImportTool>(tool: &T, jobs: &[ImportJob], on_file_error: OnFileError) -> Result<(usize, Vec<(String, String)>)> {
    let mut loaded = 0;
    let mut failed = Vec::new();

    for job in jobs {
        let start = Instant::now();
        match tool.append(job).await {
            Ok(()) => {
                loaded += 1;
                log::info!(target: LOG_TARGET, "imported '{}' in {:.3}s", job.source, start.elapsed().as_secs_f64());
            }
            Err(e) => match on_file_error {
                OnFileError::Skip => {
                    log::warn!(target: LOG_TARGET, "skipping '{}': {e}", job.source);
                    failed.push((job.source.to_string(), e.to_string()));
                }
                OnFileError::Abort => {
                    return Err(e.enrich_with(|| format!("aborting batch at '{}'", job.source)));
                }
            },
        }
    }

    Ok((loaded, failed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::TableRef;
    use camino::Utf8PathBuf;
    use ohno::app_err;
    use std::sync::Mutex;

    const DEST: TableRef = TableRef {
        schema: "istat",
        table: "census_sections",
    };

    struct StubTool {
        fail_on: Option<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    impl ImportTool for StubTool {
        async fn append(&self, job: &ImportJob) -> Result<()> {
            self.calls.lock().unwrap().push(job.source.to_string());
            if let Some(marker) = self.fail_on {
                if job.source.as_str().contains(marker) {
                    return Err(app_err!("simulated tool failure"));
                }
            }
            Ok(())
        }
    }

    fn jobs_for(members: &[String]) -> Vec<ImportJob> {
        members
            .iter()
            .map(|m| ImportJob {
                source: Utf8PathBuf::from("downloads/sezioni.zip").join(m),
                dest: DEST,
                in_archive: true,
                delimiter: b';',
            })
            .collect()
    }

    fn census_members() -> Vec<String> {
        MemberSet::Indexed {
            template: "R{n}_indicatori_2011_sezioni.csv",
            width: 2,
            range: 1..=19,
        }
        .members()
    }

    #[test]
    fn test_indexed_member_set_is_zero_padded_and_inclusive() {
        let members = census_members();
        assert_eq!(members.len(), 19);
        assert_eq!(members[0], "R01_indicatori_2011_sezioni.csv");
        assert_eq!(members[18], "R19_indicatori_2011_sezioni.csv");
    }

    #[test]
    fn test_fixed_member_set_passes_through() {
        let set = MemberSet::Fixed(vec!["a.csv".to_string(), "b.csv".to_string()]);
        assert_eq!(set.members(), ["a.csv", "b.csv"]);
    }

    #[tokio::test]
    async fn test_skip_policy_continues_past_a_failed_file() {
        let members = census_members();
        let jobs = jobs_for(&members);
        let tool = StubTool {
            fail_on: Some("R07"),
            calls: Mutex::new(Vec::new()),
        };

        let (loaded, failed) = drive_jobs(&tool, &jobs, OnFileError::Skip).await.unwrap();

        assert_eq!(loaded, 18);
        assert_eq!(failed.len(), 1);
        assert!(failed[0].0.contains("R07"));

        // every index after the failure was still invoked, in order
        let calls = tool.calls.lock().unwrap();
        assert_eq!(calls.len(), 19);
        assert!(calls[18].contains("R19"));
    }

    #[tokio::test]
    async fn test_abort_policy_stops_at_the_failed_file() {
        let members = census_members();
        let jobs = jobs_for(&members);
        let tool = StubTool {
            fail_on: Some("R07"),
            calls: Mutex::new(Vec::new()),
        };

        let result = drive_jobs(&tool, &jobs, OnFileError::Abort).await;

        assert!(result.is_err());
        assert_eq!(tool.calls.lock().unwrap().len(), 7);
    }

    #[tokio::test]
    async fn test_all_files_succeeding_reports_no_failures() {
        let jobs = jobs_for(&census_members());
        let tool = StubTool {
            fail_on: None,
            calls: Mutex::new(Vec::new()),
        };

        let (loaded, failed) = drive_jobs(&tool, &jobs, OnFileError::Skip).await.unwrap();
        assert_eq!(loaded, 19);
        assert!(failed.is_empty());
    }

    #[tokio::test]
    #[ignore = "This test needs a local PostGIS database and ogr2ogr, run explicitly with --ignored"]
    async fn test_end_to_end_import_of_a_small_archive() {
        use crate::config::DatabaseSettings;
        use crate::ingest::ogr::OgrTool;
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let download_dir = camino::Utf8Path::from_path(dir.path()).unwrap();

        let archive = download_dir.join("sample.zip");
        let file = std::fs::File::create(&archive).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer.start_file("data.csv", zip::write::SimpleFileOptions::default()).unwrap();
        writer.write_all(b"id,pop,uni\n1,100,10\n2,250,40\n3,80,5\n").unwrap();
        writer.finish().unwrap();

        let settings = DatabaseSettings {
            host: std::env::var("PGHOST").unwrap_or_else(|_| "localhost".to_string()),
            port: 5432,
            name: std::env::var("PGDATABASE").unwrap_or_else(|_| "opendata".to_string()),
            user: std::env::var("PGUSER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("PGPASSWORD").unwrap_or_default(),
        };

        let db = crate::db::Database::connect(&settings).await.unwrap();
        let tool = OgrTool::new(&settings);
        let source = crate::datasets::DataSource {
            name: "end-to-end sample",
            url: "",
            archive_file: "sample.zip",
            members: MemberSet::Fixed(vec!["data.csv".to_string()]),
            sample_member: "data.csv",
            delimiter: b',',
            dest: TableRef {
                schema: "istat",
                table: "e2e_sample",
            },
        };

        let summary = import_archive(&db, &tool, &source, download_dir, true, OnFileError::Skip).await.unwrap();

        assert!(summary.is_complete());
        assert_eq!(summary.loaded, 1);
        assert_eq!(summary.rows, 3);

        let _ = db.execute("DROP TABLE IF EXISTS \"istat\".\"e2e_sample\" CASCADE").await.unwrap();
    }
}
