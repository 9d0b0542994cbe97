use crate::Result;
use camino::Utf8Path;
use ohno::{EnrichableExt, IntoAppError};
use std::fs::File;

/// Log target for schema inference
const LOG_TARGET: &str = "    schema";

/// Every inferred column gets this type. The census indicator files carry
/// integer counts only, so the importer collapses all columns to one numeric
/// kind instead of running real type inference.
pub const INFERRED_SQL_TYPE: &str = "integer";

/// One `(name, declared type)` pair of an inferred schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub sql_type: &'static str,
}

/// Ordered column list derived from the header row of one sample member.
///
/// Column order and names come verbatim from the sample file; the inferred
/// schema is computed once per dataset, right before table creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferredSchema {
    pub columns: Vec<ColumnSpec>,
}

/// Derive a schema from one delimited member of a zip archive.
///
/// The sample member must exist and parse as delimited text with a header
/// row; there is no fallback schema, so any failure here aborts the batch
/// import that requested it.
pub fn infer_from_archive(archive_path: &Utf8Path, member: &str, delimiter: u8) -> Result<InferredSchema> {
    infer_from_archive_inner(archive_path, member, delimiter)
        .map_err(|e| e.enrich_with(|| format!("schema inference from member '{member}' of '{archive_path}' failed")))
}

fn infer_from_archive_inner(archive_path: &Utf8Path, member: &str, delimiter: u8) -> Result<InferredSchema> {
    let file = File::open(archive_path).into_app_err_with(|| format!("could not open archive '{archive_path}'"))?;
    let mut archive = zip::ZipArchive::new(file).into_app_err_with(|| format!("could not read '{archive_path}' as a zip archive"))?;
    let entry = archive
        .by_name(member)
        .into_app_err_with(|| format!("archive has no member '{member}'"))?;

    let mut reader = csv::ReaderBuilder::new().delimiter(delimiter).has_headers(true).from_reader(entry);

    let headers = reader.headers().into_app_err("could not parse the header row")?;
    if headers.is_empty() {
        return Err(ohno::app_err!("sample member has an empty header row"));
    }

    let columns = headers
        .iter()
        .map(|name| ColumnSpec {
            name: name.to_string(),
            sql_type: INFERRED_SQL_TYPE,
        })
        .collect::<Vec<_>>();

    log::debug!(target: LOG_TARGET, "inferred {} columns from '{member}'", columns.len());
    Ok(InferredSchema { columns })
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_zip(dir: &Utf8Path, members: &[(&str, &str)]) -> Utf8PathBuf {
        let path = dir.join("sample.zip");
        let file = File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        for (name, content) in members {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
        path
    }

    fn temp_dir() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_header_names_and_order_are_verbatim() {
        let (_guard, dir) = temp_dir();
        let archive = write_zip(&dir, &[("r01.csv", "CODPRO;CODCOM;P1;P47\n1;2;3;4\n")]);

        let schema = infer_from_archive(&archive, "r01.csv", b';').unwrap();
        let names: Vec<&str> = schema.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["CODPRO", "CODCOM", "P1", "P47"]);
        assert!(schema.columns.iter().all(|c| c.sql_type == INFERRED_SQL_TYPE));
    }

    #[test]
    fn test_comma_delimited_sample() {
        let (_guard, dir) = temp_dir();
        let archive = write_zip(&dir, &[("data.csv", "id,pop,uni\n1,10,2\n")]);

        let schema = infer_from_archive(&archive, "data.csv", b',').unwrap();
        let names: Vec<&str> = schema.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["id", "pop", "uni"]);
    }

    #[test]
    fn test_missing_member_is_an_error() {
        let (_guard, dir) = temp_dir();
        let archive = write_zip(&dir, &[("r01.csv", "A;B\n1;2\n")]);

        let err = infer_from_archive(&archive, "r99.csv", b';').unwrap_err();
        assert!(err.to_string().contains("r99.csv"));
    }

    #[test]
    fn test_missing_archive_is_an_error() {
        let missing = Utf8PathBuf::from("definitely/not/here.zip");
        assert!(infer_from_archive(&missing, "r01.csv", b';').is_err());
    }
}
