//! Runs the full Grid -> Quartile -> Index -> NullModel pipeline, once per
//! requested resolution.
//!
//! A genuine window phenomenon should show elevated co-occurrence at more
//! than one spatial scale; repeating the test across several cell sizes
//! guards against the modifiable-areal-unit artifact. Resolutions are
//! evaluated independently: one resolution's failure is recorded and the
//! rest still complete, and no automatic cross-resolution combination is
//! performed.

use std::time::Instant;

use chrono::Utc;
use window_map_analysis_models::{
    AnalysisOptions, AnalysisResult, MultiResolutionResult, ResolutionFailure,
};
use window_map_sighting_models::SightingRecord;

use crate::grid::assign_to_grid;
use crate::null_model::{run_monte_carlo, run_stratified_monte_carlo};
use crate::quartiles::assign_population_quartiles;
use crate::window_index::compute_window_indices;
use crate::{AnalysisError, CancellationToken};

/// Runs one full analysis at a single resolution.
///
/// # Errors
///
/// Returns [`AnalysisError`] for an empty record set, a shuffle count below
/// 1, an invalid cell size, or an out-of-range coordinate, all rejected
/// before any randomization begins.
pub fn run_analysis(
    records: &[SightingRecord],
    resolution_km: f64,
    options: &AnalysisOptions,
    cancel: Option<&CancellationToken>,
) -> Result<AnalysisResult, AnalysisError> {
    validate(records, options)?;

    let started = Instant::now();

    let mut cells = assign_to_grid(records, resolution_km)?;
    assign_population_quartiles(&mut cells);
    let distribution = compute_window_indices(&mut cells);
    log::debug!(
        "Window index distribution at {resolution_km} km: mean {:.4}, std {:.4}",
        distribution.mean,
        distribution.std_dev
    );

    let global = run_monte_carlo(&cells, options.shuffle_count, options.seed, cancel);
    let stratified_results = options.include_stratified.then(|| {
        run_stratified_monte_carlo(&cells, options.shuffle_count, options.seed, cancel)
    });

    #[allow(clippy::cast_possible_truncation)]
    let computation_time_ms = started.elapsed().as_millis() as u64;

    log::info!(
        "Analysis at {resolution_km} km: {} cells, strongest pairing {} (z = {:.2}), \
         window effect: {}, {computation_time_ms} ms",
        cells.len(),
        global.strongest_pairing,
        global.strongest_z_score,
        global.window_effect_detected
    );

    Ok(AnalysisResult {
        analysis_date: Utc::now(),
        resolution_km,
        total_cells: cells.len() as u64,
        shuffle_count: options.shuffle_count,
        pairings: global.pairings,
        full_overlap: global.full_overlap,
        strongest_pairing: global.strongest_pairing,
        strongest_z_score: global.strongest_z_score,
        window_effect_detected: global.window_effect_detected,
        computation_time_ms,
        shuffles_completed: global.shuffles_completed,
        complete: global.complete,
        stratified_results,
    })
}

/// Runs the pipeline once per requested resolution.
///
/// Record-set and option validation happens once, up front. Per-resolution
/// errors (for example a non-positive cell size) land in
/// [`MultiResolutionResult::failures`] without aborting the remaining
/// resolutions.
///
/// # Errors
///
/// Returns [`AnalysisError`] only for input problems shared by every
/// resolution: an empty record set or an invalid shuffle count.
pub fn run_multi_resolution_analysis(
    records: &[SightingRecord],
    resolutions: &[f64],
    options: &AnalysisOptions,
    cancel: Option<&CancellationToken>,
) -> Result<MultiResolutionResult, AnalysisError> {
    validate(records, options)?;

    let mut analyses = Vec::with_capacity(resolutions.len());
    let mut failures = Vec::new();

    for &resolution_km in resolutions {
        match run_analysis(records, resolution_km, options, cancel) {
            Ok(result) => analyses.push(result),
            Err(error) => {
                log::error!("Resolution {resolution_km} km failed: {error}");
                failures.push(ResolutionFailure {
                    resolution_km,
                    message: error.to_string(),
                });
            }
        }
    }

    Ok(MultiResolutionResult { analyses, failures })
}

fn validate(records: &[SightingRecord], options: &AnalysisOptions) -> Result<(), AnalysisError> {
    if records.is_empty() {
        return Err(AnalysisError::EmptyRecordSet);
    }
    if options.shuffle_count < 1 {
        return Err(AnalysisError::InvalidShuffleCount {
            shuffle_count: options.shuffle_count,
        });
    }
    Ok(())
}
