//! Read-side ranking over already-computed cell summaries.
//!
//! Operates purely on persisted/previously-computed window indices; it
//! never re-invokes the randomization engine. Interpretation uses the
//! distribution across the full cell population, then ranking filters and
//! orders the requested subset.

use serde::{Deserialize, Serialize};
use window_map_analysis::stats::RunningStats;
use window_map_analysis::window_index::interpret_window_index;
use window_map_analysis_models::{Cell, WindowLabel};

/// One entry of a top-windows ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedWindow {
    /// 1-based rank by window index, descending.
    pub rank: u32,
    /// Cell key.
    pub cell_id: String,
    /// Latitude of the cell center.
    pub center_lat: f64,
    /// Longitude of the cell center.
    pub center_lng: f64,
    /// The cell's window index.
    pub window_index: f64,
    /// Total reports in the cell.
    pub total_count: u64,
    /// Number of distinct categories present.
    pub distinct_category_count: u32,
    /// Qualitative interpretation against the cell population.
    pub label: WindowLabel,
}

/// Returns cells with at least `min_distinct_categories` categories
/// present, ordered by window index descending (ties broken by cell id),
/// with rank and qualitative label attached. `limit` caps the list;
/// `None` returns every match.
#[must_use]
pub fn rank_windows(
    cells: &[Cell],
    min_distinct_categories: u32,
    limit: Option<usize>,
) -> Vec<RankedWindow> {
    let mut distribution = RunningStats::new();
    for cell in cells {
        distribution.push(cell.window_index);
    }
    let (mean, std_dev) = (distribution.mean(), distribution.std_dev());

    let mut matches: Vec<&Cell> = cells
        .iter()
        .filter(|cell| cell.distinct_category_count >= min_distinct_categories)
        .collect();
    matches.sort_by(|a, b| {
        b.window_index
            .partial_cmp(&a.window_index)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.cell_id.cmp(&b.cell_id))
    });
    if let Some(limit) = limit {
        matches.truncate(limit);
    }

    matches
        .into_iter()
        .enumerate()
        .map(|(i, cell)| {
            #[allow(clippy::cast_possible_truncation)]
            let rank = i as u32 + 1;
            RankedWindow {
                rank,
                cell_id: cell.cell_id.clone(),
                center_lat: cell.center_lat,
                center_lng: cell.center_lng,
                window_index: cell.window_index,
                total_count: cell.total_count,
                distinct_category_count: cell.distinct_category_count,
                label: interpret_window_index(cell.window_index, mean, std_dev),
            }
        })
        .collect()
}
