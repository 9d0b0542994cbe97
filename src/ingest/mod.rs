//! The ingestion-and-provisioning pipeline: schema inference from a sample
//! archive member, idempotent table (re)creation, bulk imports through the
//! external conversion tool, and materialization of the analytical view.

pub mod batch;
pub mod geo;
pub mod ogr;
pub mod provision;
pub mod schema;
pub mod view;

pub use batch::{BatchSummary, MemberSet, OnFileError, import_archive};
pub use ogr::{ImportJob, ImportTool, OgrTool};
pub use schema::{ColumnSpec, InferredSchema};
