//! Per-cell observed-vs-expected joint occurrence ("window index").
//!
//! For a cell with total count `t` and per-category counts `n_c`, observed
//! joint occurrence is `sum over pairs (a < b) of n_a * n_b / t` (the
//! cross-category pair density), and expected joint occurrence under
//! independence at global rates is `sum over pairs of p_a * p_b * t`. The
//! index is their ratio: 1.0 means exactly chance co-occurrence, above 1
//! excess, below 1 deficit.

use window_map_analysis_models::{Cell, WindowLabel};
use window_map_sighting_models::{CATEGORY_COUNT, SightingCategory};

use crate::stats::RunningStats;

/// Mean and standard deviation of the window index across a cell
/// population, used by [`interpret_window_index`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexDistribution {
    /// Mean window index over all cells.
    pub mean: f64,
    /// Standard deviation of the window index over all cells.
    pub std_dev: f64,
}

/// Computes each category's share of all binned reports.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn global_category_rates(cells: &[Cell]) -> [f64; CATEGORY_COUNT] {
    let mut totals = [0u64; CATEGORY_COUNT];
    for cell in cells {
        for (&category, &count) in &cell.counts_by_category {
            totals[category.index()] += count;
        }
    }

    let grand_total: u64 = totals.iter().sum();
    if grand_total == 0 {
        return [0.0; CATEGORY_COUNT];
    }

    totals.map(|t| t as f64 / grand_total as f64)
}

/// Computes one cell's window index against global category rates.
///
/// An empty cell, or one where the expected joint occurrence is zero (a
/// degenerate rate distribution), yields 0.0, never NaN or infinity.
#[must_use]
pub fn window_index(cell: &Cell, global_rates: &[f64; CATEGORY_COUNT]) -> f64 {
    if cell.total_count == 0 {
        return 0.0;
    }

    #[allow(clippy::cast_precision_loss)]
    let t = cell.total_count as f64;

    let mut observed = 0.0;
    let mut expected = 0.0;
    for (a, &cat_a) in SightingCategory::all().iter().enumerate() {
        for &cat_b in &SightingCategory::all()[a + 1..] {
            #[allow(clippy::cast_precision_loss)]
            let (n_a, n_b) = (cell.count(cat_a) as f64, cell.count(cat_b) as f64);
            observed += n_a * n_b / t;
            expected += global_rates[cat_a.index()] * global_rates[cat_b.index()] * t;
        }
    }

    if expected <= 0.0 {
        return 0.0;
    }
    observed / expected
}

/// Writes the window index onto every cell and returns the population
/// mean/std used for qualitative interpretation.
pub fn compute_window_indices(cells: &mut [Cell]) -> IndexDistribution {
    let rates = global_category_rates(cells);

    let mut distribution = RunningStats::new();
    for cell in cells.iter_mut() {
        cell.window_index = window_index(cell, &rates);
        distribution.push(cell.window_index);
    }

    IndexDistribution {
        mean: distribution.mean(),
        std_dev: distribution.std_dev(),
    }
}

/// Classifies a window index against the cell population.
///
/// z = (index - mean) / std: z >= 2 is a strong window, z >= 1 elevated,
/// |z| < 1 typical, z <= -1 a deficit. A zero std (uniform population)
/// resolves to z = 0, i.e. typical, rather than dividing by zero.
#[must_use]
pub fn interpret_window_index(
    index: f64,
    population_mean: f64,
    population_std_dev: f64,
) -> WindowLabel {
    let z = if population_std_dev > 0.0 {
        (index - population_mean) / population_std_dev
    } else {
        0.0
    };

    if z >= 2.0 {
        WindowLabel::StrongWindow
    } else if z >= 1.0 {
        WindowLabel::Elevated
    } else if z <= -1.0 {
        WindowLabel::Deficit
    } else {
        WindowLabel::Typical
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn cell_with_counts(id: &str, counts: &[(SightingCategory, u64)]) -> Cell {
        let counts_by_category: BTreeMap<SightingCategory, u64> =
            counts.iter().copied().filter(|&(_, n)| n > 0).collect();
        let total_count = counts_by_category.values().sum();
        #[allow(clippy::cast_possible_truncation)]
        let distinct_category_count = counts_by_category.len() as u32;
        Cell {
            cell_id: id.to_string(),
            center_lat: 0.0,
            center_lng: 0.0,
            resolution_km: 50.0,
            counts_by_category,
            total_count,
            distinct_category_count,
            population_quartile: None,
            window_index: 0.0,
        }
    }

    #[test]
    fn empty_cell_yields_zero_not_nan() {
        let cell = cell_with_counts("empty", &[]);
        let index = window_index(&cell, &[1.0 / 3.0; CATEGORY_COUNT]);
        assert!(index.abs() < f64::EPSILON);
        assert!(index.is_finite());
    }

    #[test]
    fn balanced_cell_at_global_rates_scores_one() {
        // 9 reports, 3 per category, global rates 1/3 each: observed joint
        // = 3 pairs * (3*3/9) = 3; expected = 3 pairs * (1/9 * 9) = 3.
        let cell = cell_with_counts(
            "balanced",
            &[
                (SightingCategory::Ufo, 3),
                (SightingCategory::Cryptid, 3),
                (SightingCategory::Haunting, 3),
            ],
        );
        let index = window_index(&cell, &[1.0 / 3.0; CATEGORY_COUNT]);
        assert!((index - 1.0).abs() < 1e-12, "index was {index}");
    }

    #[test]
    fn single_category_cell_scores_zero_observed() {
        let cell = cell_with_counts("solo", &[(SightingCategory::Ufo, 10)]);
        let index = window_index(&cell, &[1.0 / 3.0; CATEGORY_COUNT]);
        assert!(index.abs() < f64::EPSILON);
    }

    #[test]
    fn rate_proportional_population_scores_one_everywhere() {
        // Every cell carries categories in exact global proportion, so each
        // index must be 1 within floating tolerance.
        let mut cells: Vec<Cell> = (0..10)
            .map(|i| {
                cell_with_counts(
                    &format!("c{i}"),
                    &[
                        (SightingCategory::Ufo, 10),
                        (SightingCategory::Cryptid, 10),
                        (SightingCategory::Haunting, 10),
                    ],
                )
            })
            .collect();

        let distribution = compute_window_indices(&mut cells);
        for cell in &cells {
            assert!(
                (cell.window_index - 1.0).abs() < 1e-9,
                "cell {} index {}",
                cell.cell_id,
                cell.window_index
            );
        }
        assert!((distribution.mean - 1.0).abs() < 1e-9);
        assert!(distribution.std_dev < 1e-9);
    }

    #[test]
    fn global_rates_sum_to_one() {
        let cells = vec![
            cell_with_counts("a", &[(SightingCategory::Ufo, 6)]),
            cell_with_counts(
                "b",
                &[(SightingCategory::Cryptid, 3), (SightingCategory::Haunting, 1)],
            ),
        ];
        let rates = global_category_rates(&cells);
        let sum: f64 = rates.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert!((rates[SightingCategory::Ufo.index()] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn interpretation_cut_points() {
        assert_eq!(interpret_window_index(3.0, 1.0, 1.0), WindowLabel::StrongWindow);
        assert_eq!(interpret_window_index(2.5, 1.0, 1.0), WindowLabel::Elevated);
        assert_eq!(interpret_window_index(1.2, 1.0, 1.0), WindowLabel::Typical);
        assert_eq!(interpret_window_index(-0.5, 1.0, 1.0), WindowLabel::Deficit);
    }

    #[test]
    fn zero_std_resolves_to_typical() {
        assert_eq!(interpret_window_index(5.0, 1.0, 0.0), WindowLabel::Typical);
    }
}
