#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Persistence boundary for window analysis results.
//!
//! Flattens in-memory [`AnalysisResult`](window_map_analysis_models::AnalysisResult)
//! values into primitive-typed rows, keeps an append-only history where
//! "latest" is a query rather than mutable shared state, and serves
//! read-side ranking queries from already-computed summaries without ever
//! re-invoking the randomization engine. No database driver lives here;
//! the host persists the rows however it likes.

pub mod queries;
pub mod serialize;
pub mod store;

use thiserror::Error;

/// Errors at the serialization boundary.
#[derive(Debug, Error)]
pub enum StorageError {
    /// JSON encoding of a nested column failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
