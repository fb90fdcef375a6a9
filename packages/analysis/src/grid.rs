//! Bins geolocated reports into fixed-size grid cells.
//!
//! Binning convention: latitude is divided into bands of
//! `cell_size_km / 111.32` degrees. Longitude bin width is computed per
//! latitude band from the band's *center* latitude
//! (`cell_size_km / (111.32 * cos(center_lat))`), so cells approximate
//! constant physical area instead of shrinking toward the poles. The same
//! convention is applied at every resolution; cross-resolution comparisons
//! depend on it.

use std::collections::BTreeMap;

use window_map_analysis_models::Cell;
use window_map_sighting_models::{CATEGORY_COUNT, SightingCategory, SightingRecord};

use crate::AnalysisError;

/// Kilometers per degree of latitude (and of longitude at the equator).
pub const KM_PER_DEGREE: f64 = 111.32;

/// Floor for `cos(latitude)` so longitude bins stay finite near the poles.
const MIN_COS_LAT: f64 = 0.01;

struct CellAccumulator {
    center_lat: f64,
    center_lng: f64,
    counts: [u64; CATEGORY_COUNT],
}

/// Bins `records` into cells of roughly `cell_size_km` x `cell_size_km`.
///
/// Deterministic: identical input and resolution produce an identical cell
/// list, ordered by cell id. Empty input yields an empty list. Cell ids
/// embed the resolution tag, so ids from different resolutions never
/// collide.
///
/// # Errors
///
/// Returns [`AnalysisError::InvalidCellSize`] for a non-positive or
/// non-finite cell size, and [`AnalysisError::InvalidCoordinate`] for any
/// record with out-of-range coordinates. Coordinate validity is the
/// caller's contract; invalid rows are rejected, never coerced.
pub fn assign_to_grid(
    records: &[SightingRecord],
    cell_size_km: f64,
) -> Result<Vec<Cell>, AnalysisError> {
    if !cell_size_km.is_finite() || cell_size_km <= 0.0 {
        return Err(AnalysisError::InvalidCellSize { cell_size_km });
    }

    let lat_step = cell_size_km / KM_PER_DEGREE;
    #[allow(clippy::cast_possible_truncation)]
    let max_row = ((180.0 / lat_step).ceil() as i64 - 1).max(0);

    let mut cells: BTreeMap<String, CellAccumulator> = BTreeMap::new();

    for record in records {
        if !record.has_valid_coordinates() {
            return Err(AnalysisError::InvalidCoordinate {
                record_id: record.id.clone(),
                latitude: record.latitude,
                longitude: record.longitude,
            });
        }

        #[allow(clippy::cast_possible_truncation)]
        let row = (((record.latitude + 90.0) / lat_step).floor() as i64).clamp(0, max_row);
        #[allow(clippy::cast_precision_loss)]
        let center_lat = (row as f64 + 0.5).mul_add(lat_step, -90.0);

        let cos_lat = center_lat.to_radians().cos().max(MIN_COS_LAT);
        let lng_step = cell_size_km / (KM_PER_DEGREE * cos_lat);
        #[allow(clippy::cast_possible_truncation)]
        let max_col = ((360.0 / lng_step).ceil() as i64 - 1).max(0);
        #[allow(clippy::cast_possible_truncation)]
        let col = (((record.longitude + 180.0) / lng_step).floor() as i64).clamp(0, max_col);
        #[allow(clippy::cast_precision_loss)]
        let center_lng = (col as f64 + 0.5).mul_add(lng_step, -180.0);

        let cell_id = format!("{cell_size_km:.1}km-{row}-{col}");

        let entry = cells.entry(cell_id).or_insert_with(|| CellAccumulator {
            center_lat,
            center_lng,
            counts: [0; CATEGORY_COUNT],
        });
        entry.counts[record.category.index()] += 1;
    }

    let assigned = cells
        .into_iter()
        .map(|(cell_id, acc)| {
            let counts_by_category: BTreeMap<SightingCategory, u64> = SightingCategory::all()
                .iter()
                .filter_map(|&category| {
                    let count = acc.counts[category.index()];
                    (count > 0).then_some((category, count))
                })
                .collect();
            let total_count: u64 = acc.counts.iter().sum();
            #[allow(clippy::cast_possible_truncation)]
            let distinct_category_count = counts_by_category.len() as u32;

            Cell {
                cell_id,
                center_lat: acc.center_lat,
                center_lng: acc.center_lng,
                resolution_km: cell_size_km,
                counts_by_category,
                total_count,
                distinct_category_count,
                population_quartile: None,
                window_index: 0.0,
            }
        })
        .collect::<Vec<_>>();

    log::debug!(
        "Binned {} records into {} cells at {cell_size_km} km",
        records.len(),
        assigned.len()
    );

    Ok(assigned)
}
