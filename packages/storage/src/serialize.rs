//! Flattens an [`AnalysisResult`] into a persistence-ready row.
//!
//! Scalar fields become primitive columns; the nested pairing and
//! stratified structures become JSON-encoded string columns. Timestamps
//! are RFC 3339 with fixed millisecond precision so the same result always
//! flattens to the same bytes.

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use window_map_analysis_models::AnalysisResult;

use crate::StorageError;

/// A flattened, persistence-ready analysis record.
///
/// Every field is either a primitive or a JSON string; numeric fields keep
/// full `f64` precision through serde_json's shortest-roundtrip float
/// encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRow {
    /// Analysis timestamp, RFC 3339 with millisecond precision.
    pub analysis_date: String,
    /// Grid resolution in kilometers.
    pub resolution_km: f64,
    /// Non-empty cells at this resolution.
    pub total_cells: u64,
    /// Shuffle iterations requested.
    pub shuffle_count: u32,
    /// Shuffle iterations actually performed.
    pub shuffles_completed: u32,
    /// Whether the run finished uncancelled.
    pub complete: bool,
    /// JSON-encoded `Vec<PairingStatistic>`.
    pub pairings_json: String,
    /// JSON-encoded `OverlapStatistic`.
    pub full_overlap_json: String,
    /// Label of the strongest pairing, e.g. `"UFO+CRYPTID"`.
    pub strongest_pairing: String,
    /// z-score of the strongest pairing.
    pub strongest_z_score: f64,
    /// Whether any pairing crossed the significance threshold.
    pub window_effect_detected: bool,
    /// Pipeline wall-clock duration in milliseconds.
    pub computation_time_ms: u64,
    /// JSON-encoded stratified `MonteCarloRun`, when one was requested.
    pub stratified_json: Option<String>,
}

/// Flattens `result` into an [`AnalysisRow`].
///
/// Pure and idempotent: the same result always produces an identical row.
///
/// # Errors
///
/// Returns [`StorageError::Serialization`] if JSON encoding of a nested
/// column fails.
pub fn to_db_format(result: &AnalysisResult) -> Result<AnalysisRow, StorageError> {
    let stratified_json = result
        .stratified_results
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    Ok(AnalysisRow {
        analysis_date: result
            .analysis_date
            .to_rfc3339_opts(SecondsFormat::Millis, true),
        resolution_km: result.resolution_km,
        total_cells: result.total_cells,
        shuffle_count: result.shuffle_count,
        shuffles_completed: result.shuffles_completed,
        complete: result.complete,
        pairings_json: serde_json::to_string(&result.pairings)?,
        full_overlap_json: serde_json::to_string(&result.full_overlap)?,
        strongest_pairing: result.strongest_pairing.clone(),
        strongest_z_score: result.strongest_z_score,
        window_effect_detected: result.window_effect_detected,
        computation_time_ms: result.computation_time_ms,
        stratified_json,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone as _, Utc};
    use window_map_analysis_models::{OverlapStatistic, PairingStatistic};
    use window_map_sighting_models::SightingCategory;

    use super::*;

    fn sample_result() -> AnalysisResult {
        let pairing = PairingStatistic {
            category_a: SightingCategory::Ufo,
            category_b: SightingCategory::Cryptid,
            observed_statistic: 17.0,
            null_mean: 9.131_415_926_535_9,
            null_std: 2.718_281_828_459_045,
            z_score: 2.894_712_3,
            window_effect_detected: false,
            insufficient_variance: false,
        };
        AnalysisResult {
            analysis_date: Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap(),
            resolution_km: 50.0,
            total_cells: 128,
            shuffle_count: 1000,
            pairings: vec![pairing],
            full_overlap: OverlapStatistic {
                observed_statistic: 4.0,
                null_mean: 1.2,
                null_std: 0.9,
                z_score: 3.111,
                insufficient_variance: false,
            },
            strongest_pairing: "UFO+CRYPTID".to_string(),
            strongest_z_score: 2.894_712_3,
            window_effect_detected: false,
            computation_time_ms: 842,
            shuffles_completed: 1000,
            complete: true,
            stratified_results: None,
        }
    }

    #[test]
    fn flattening_is_idempotent() {
        let result = sample_result();
        let first = to_db_format(&result).unwrap();
        let second = to_db_format(&result).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn timestamp_is_rfc3339_with_millis() {
        let row = to_db_format(&sample_result()).unwrap();
        assert_eq!(row.analysis_date, "2026-03-14T09:26:53.000Z");
    }

    #[test]
    fn nested_columns_round_trip_with_full_precision() {
        let result = sample_result();
        let row = to_db_format(&result).unwrap();

        let pairings: Vec<PairingStatistic> = serde_json::from_str(&row.pairings_json).unwrap();
        assert_eq!(pairings, result.pairings);

        let overlap: OverlapStatistic = serde_json::from_str(&row.full_overlap_json).unwrap();
        assert_eq!(overlap, result.full_overlap);
    }

    #[test]
    fn stratified_column_absent_when_not_requested() {
        let row = to_db_format(&sample_result()).unwrap();
        assert!(row.stratified_json.is_none());
    }
}
