//! opendata-pg crate
//!
//! This crate is an implementation detail of the `opendata-pg` tool. This crate's API is fluid and may change without warning
//! and in a semver-incompatible way.

/// Result type alias using `ohno::AppError` as the default error type.
pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

#[doc(hidden)]
pub mod config;

#[doc(hidden)]
pub mod datasets;

#[doc(hidden)]
pub mod db;

#[doc(hidden)]
pub mod fetch;

#[doc(hidden)]
pub mod ingest;

#[doc(hidden)]
pub mod report;
