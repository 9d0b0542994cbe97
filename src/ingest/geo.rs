use crate::Result;
use crate::datasets::VectorSource;
use crate::ingest::ogr::{OgrTool, VSIZIP_PREFIX};
use camino::Utf8Path;
use std::time::Instant;

/// Log target for geospatial imports
const LOG_TARGET: &str = "       geo";

/// Tool-side path of the vector file, streamed straight out of its archive.
#[must_use]
pub fn vector_tool_source(download_dir: &Utf8Path, source: &VectorSource) -> String {
    format!("{VSIZIP_PREFIX}{}/{}", download_dir.join(source.archive_file), source.member)
}

/// Import the boundary layer into its destination table.
///
/// Overwrite semantics are the tool's own drop-and-recreate; geometries are
/// forced to MULTIPOLYGON and precision snapping is disabled (see
/// [`OgrTool::vector_args`]). The caller decides whether a failure here stops
/// the pipeline; by policy it is logged and the run continues.
pub async fn import_boundaries(tool: &OgrTool, source: &VectorSource, download_dir: &Utf8Path) -> Result<()> {
    let tool_source = vector_tool_source(download_dir, source);
    log::info!(target: LOG_TARGET, "importing '{}' from '{tool_source}'", source.name);

    let start = Instant::now();
    tool.import_vector(&tool_source, source.dest).await?;

    log::info!(
        target: LOG_TARGET,
        "imported '{}' into {} in {:.3}s",
        source.name,
        source.dest.dotted(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
