#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Result types for the spatial window analysis pipeline.
//!
//! Cells, pairing statistics, and analysis results are recomputed fresh on
//! every invocation and persisted append-only; nothing in this crate is
//! mutated after an analysis completes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use window_map_sighting_models::SightingCategory;

/// Default number of Monte Carlo shuffle iterations.
pub const DEFAULT_SHUFFLE_COUNT: u32 = 1000;

/// Activity-volume quartile of a cell, from lowest to highest reporting
/// volume. Used to stratify the null model so that detected window effects
/// cannot be explained by quartile-level reporting-rate differences.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PopulationQuartile {
    /// Quartile 1: lowest reporting volume
    Lowest = 1,
    /// Quartile 2
    Low = 2,
    /// Quartile 3
    High = 3,
    /// Quartile 4: highest reporting volume
    Highest = 4,
}

impl PopulationQuartile {
    /// Returns the numeric quartile value (1-4).
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Creates a quartile from a zero-based bucket position (0-3).
    #[must_use]
    pub const fn from_bucket(bucket: usize) -> Option<Self> {
        match bucket {
            0 => Some(Self::Lowest),
            1 => Some(Self::Low),
            2 => Some(Self::High),
            3 => Some(Self::Highest),
            _ => None,
        }
    }
}

/// Qualitative interpretation of a cell's window index relative to the
/// population of cells at the same resolution.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum WindowLabel {
    /// Co-occurrence at least two standard deviations above the mean.
    StrongWindow,
    /// Co-occurrence between one and two standard deviations above the mean.
    Elevated,
    /// Co-occurrence within one standard deviation of the mean.
    Typical,
    /// Co-occurrence at least one standard deviation below the mean.
    Deficit,
}

/// A discretized geographic bucket at one resolution.
///
/// Invariants: the category counts sum to `total_count`, and
/// `distinct_category_count` is the number of categories with a non-zero
/// count. Cells are rebuilt from scratch on every analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    /// Deterministic key embedding resolution, row, and column.
    pub cell_id: String,
    /// Latitude of the cell center in decimal degrees.
    pub center_lat: f64,
    /// Longitude of the cell center in decimal degrees.
    pub center_lng: f64,
    /// Nominal cell edge length in kilometers.
    pub resolution_km: f64,
    /// Report count per phenomenon category.
    pub counts_by_category: BTreeMap<SightingCategory, u64>,
    /// Total reports binned into this cell.
    pub total_count: u64,
    /// Number of categories present (count > 0).
    pub distinct_category_count: u32,
    /// Activity-volume quartile, once assigned.
    pub population_quartile: Option<PopulationQuartile>,
    /// Observed-over-expected joint occurrence ratio.
    pub window_index: f64,
}

impl Cell {
    /// Returns the report count for one category (0 if absent).
    #[must_use]
    pub fn count(&self, category: SightingCategory) -> u64 {
        self.counts_by_category.get(&category).copied().unwrap_or(0)
    }
}

/// Null-model comparison for one unordered category pair at one resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingStatistic {
    /// First category of the unordered pair.
    pub category_a: SightingCategory,
    /// Second category of the unordered pair.
    pub category_b: SightingCategory,
    /// Joint-presence count observed in the real data: the number of cells
    /// where both categories appear.
    pub observed_statistic: f64,
    /// Mean of the statistic across null shuffles.
    pub null_mean: f64,
    /// Standard deviation of the statistic across null shuffles.
    pub null_std: f64,
    /// `(observed - null_mean) / null_std`, or 0 when variance is
    /// insufficient.
    pub z_score: f64,
    /// Whether this pairing alone crossed the significance threshold.
    pub window_effect_detected: bool,
    /// `true` when the null distribution had (near-)zero variance, so no
    /// meaningful z-score exists. Distinct from "tested, no effect found".
    pub insufficient_variance: bool,
}

impl PairingStatistic {
    /// Human-readable pairing label, e.g. `"UFO+CRYPTID"`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}+{}", self.category_a.as_ref(), self.category_b.as_ref())
    }
}

/// Null-model comparison for the full-overlap tuple: cells where every
/// phenomenon category is present at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlapStatistic {
    /// Number of cells with all categories present in the real data.
    pub observed_statistic: f64,
    /// Mean of the statistic across null shuffles.
    pub null_mean: f64,
    /// Standard deviation of the statistic across null shuffles.
    pub null_std: f64,
    /// `(observed - null_mean) / null_std`, or 0 when variance is
    /// insufficient.
    pub z_score: f64,
    /// `true` when the null distribution had (near-)zero variance.
    pub insufficient_variance: bool,
}

/// Summary of one Monte Carlo randomization run (global or stratified).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonteCarloRun {
    /// One entry per unordered category pair.
    pub pairings: Vec<PairingStatistic>,
    /// The all-categories-present overlap statistic.
    pub full_overlap: OverlapStatistic,
    /// Label of the pairing with the largest `|z_score|`.
    pub strongest_pairing: String,
    /// z-score of the strongest pairing.
    pub strongest_z_score: f64,
    /// `true` when any pairing's `|z_score|` crossed the threshold.
    pub window_effect_detected: bool,
    /// Shuffle iterations actually performed.
    pub shuffles_completed: u32,
    /// `false` when the run was cancelled before finishing; the statistics
    /// are then best-effort over `shuffles_completed` iterations.
    pub complete: bool,
}

/// The outcome of one analysis invocation at one resolution. Append-only:
/// a new record is produced per invocation and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// When the analysis ran.
    pub analysis_date: DateTime<Utc>,
    /// Grid resolution analyzed, in kilometers.
    pub resolution_km: f64,
    /// Number of non-empty cells at this resolution.
    pub total_cells: u64,
    /// Shuffle iterations requested.
    pub shuffle_count: u32,
    /// Global (unstratified) per-pairing null-model statistics.
    pub pairings: Vec<PairingStatistic>,
    /// Global full-overlap statistic.
    pub full_overlap: OverlapStatistic,
    /// Label of the pairing with the largest `|z_score|`.
    pub strongest_pairing: String,
    /// z-score of the strongest pairing.
    pub strongest_z_score: f64,
    /// `true` when any pairing crossed the significance threshold.
    pub window_effect_detected: bool,
    /// Wall-clock duration of the full pipeline for this resolution.
    pub computation_time_ms: u64,
    /// Shuffle iterations actually performed by the global run.
    pub shuffles_completed: u32,
    /// `false` when the global run was cancelled mid-flight.
    pub complete: bool,
    /// Quartile-stratified run, when requested.
    pub stratified_results: Option<MonteCarloRun>,
}

/// A resolution that failed during a multi-resolution analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionFailure {
    /// The resolution that failed, in kilometers.
    pub resolution_km: f64,
    /// Why it failed.
    pub message: String,
}

/// Results of one multi-resolution invocation: one analysis per completed
/// resolution (input order preserved) plus any per-resolution failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiResolutionResult {
    /// Completed analyses, in requested-resolution order.
    pub analyses: Vec<AnalysisResult>,
    /// Resolutions that failed without aborting the rest.
    pub failures: Vec<ResolutionFailure>,
}

/// Tunables for one analysis invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOptions {
    /// Monte Carlo shuffle iterations (must be >= 1).
    pub shuffle_count: u32,
    /// Whether to additionally run the quartile-stratified null model.
    pub include_stratified: bool,
    /// Base RNG seed for bit-exact reproducibility; `None` draws from OS
    /// entropy.
    pub seed: Option<u64>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            shuffle_count: DEFAULT_SHUFFLE_COUNT,
            include_stratified: false,
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quartile_values_are_one_based() {
        assert_eq!(PopulationQuartile::Lowest.value(), 1);
        assert_eq!(PopulationQuartile::Highest.value(), 4);
        assert_eq!(
            PopulationQuartile::from_bucket(0),
            Some(PopulationQuartile::Lowest)
        );
        assert_eq!(PopulationQuartile::from_bucket(4), None);
    }

    #[test]
    fn pairing_label_joins_wire_names() {
        let pairing = PairingStatistic {
            category_a: SightingCategory::Ufo,
            category_b: SightingCategory::Cryptid,
            observed_statistic: 5.0,
            null_mean: 2.0,
            null_std: 1.0,
            z_score: 3.0,
            window_effect_detected: true,
            insufficient_variance: false,
        };
        assert_eq!(pairing.label(), "UFO+CRYPTID");
    }

    #[test]
    fn default_options_match_documented_defaults() {
        let options = AnalysisOptions::default();
        assert_eq!(options.shuffle_count, DEFAULT_SHUFFLE_COUNT);
        assert!(!options.include_stratified);
        assert!(options.seed.is_none());
    }

    #[test]
    fn cell_count_defaults_to_zero_for_absent_category() {
        let cell = Cell {
            cell_id: "50.0km-280-123".to_string(),
            center_lat: 40.0,
            center_lng: -105.0,
            resolution_km: 50.0,
            counts_by_category: BTreeMap::from([(SightingCategory::Ufo, 3)]),
            total_count: 3,
            distinct_category_count: 1,
            population_quartile: None,
            window_index: 0.0,
        };
        assert_eq!(cell.count(SightingCategory::Ufo), 3);
        assert_eq!(cell.count(SightingCategory::Haunting), 0);
    }

    #[test]
    fn window_label_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&WindowLabel::StrongWindow).unwrap();
        assert_eq!(json, "\"STRONG_WINDOW\"");
    }
}
