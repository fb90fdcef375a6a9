#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Spatial binning and randomization-testing engine for the geographic
//! window hypothesis.
//!
//! The pipeline runs Grid -> Quartile -> Index -> NullModel per resolution:
//! reports are binned into fixed-size cells, cells are stratified by
//! reporting volume, each cell gets an observed-vs-expected window index,
//! and a Monte Carlo permutation engine decides whether cross-category
//! co-occurrence exceeds an independence null model. The orchestrator
//! repeats the pipeline across several resolutions to guard against
//! bin-size artifacts.
//!
//! Every invocation is a self-contained computation over an immutable
//! record slice; nothing here performs I/O.

pub mod grid;
pub mod null_model;
pub mod orchestrator;
pub mod quartiles;
pub mod stats;
pub mod window_index;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

/// `|z|` at or above this is considered a detected window effect.
///
/// Three standard deviations keeps the false-positive tail below ~0.3% per
/// pairing under an approximately normal null.
pub const SIGNIFICANCE_THRESHOLD: f64 = 3.0;

/// Null standard deviations below this are treated as zero variance.
pub const VARIANCE_EPSILON: f64 = 1e-9;

/// Errors rejected before any computation begins, or raised while binning.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The record set was empty; there is nothing to analyze.
    #[error("Record set is empty")]
    EmptyRecordSet,

    /// Cell size must be a positive, finite number of kilometers.
    #[error("Invalid cell size: {cell_size_km} km (must be positive and finite)")]
    InvalidCellSize {
        /// The rejected cell size.
        cell_size_km: f64,
    },

    /// Shuffle count must be at least 1.
    #[error("Invalid shuffle count: {shuffle_count} (must be >= 1)")]
    InvalidShuffleCount {
        /// The rejected shuffle count.
        shuffle_count: u32,
    },

    /// A record carried an out-of-range or non-finite coordinate.
    #[error("Record {record_id} has invalid coordinates ({latitude}, {longitude})")]
    InvalidCoordinate {
        /// Upstream id of the offending record.
        record_id: String,
        /// The record's latitude.
        latitude: f64,
        /// The record's longitude.
        longitude: f64,
    },
}

/// Cooperative cancellation signal for the Monte Carlo engine.
///
/// Checked between shuffle iterations; a cancelled run returns best-effort
/// statistics explicitly marked incomplete rather than a silently
/// truncated result. Clones share the same underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a new, un-cancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
