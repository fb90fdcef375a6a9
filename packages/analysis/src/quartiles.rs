//! Ranks cells into activity-volume quartiles.
//!
//! Regions with more total reports are more likely to show multiple
//! categories by chance alone. Splitting cells into four volume strata lets
//! the stratified null model shuffle only within same-volume groups,
//! separating genuine geographic clustering from the reporting-density
//! confound.

use window_map_analysis_models::{Cell, PopulationQuartile};

/// Assigns every cell a [`PopulationQuartile`] by total report count.
///
/// Cells are ranked ascending by `total_count`, ties broken by `cell_id`,
/// then split into four buckets of size `n/4` rounded down or up (the
/// remainder goes to the lowest quartiles), covering every cell exactly
/// once. With fewer than four cells the upper quartiles are left empty.
pub fn assign_population_quartiles(cells: &mut [Cell]) {
    let n = cells.len();
    if n == 0 {
        return;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        cells[a]
            .total_count
            .cmp(&cells[b].total_count)
            .then_with(|| cells[a].cell_id.cmp(&cells[b].cell_id))
    });

    let base = n / 4;
    let remainder = n % 4;

    let mut position = 0;
    for bucket in 0..4 {
        let size = base + usize::from(bucket < remainder);
        let Some(quartile) = PopulationQuartile::from_bucket(bucket) else {
            break;
        };
        for &cell_index in &order[position..position + size] {
            cells[cell_index].population_quartile = Some(quartile);
        }
        position += size;
    }

    log::debug!("Assigned population quartiles to {n} cells");
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn cell(id: &str, total: u64) -> Cell {
        Cell {
            cell_id: id.to_string(),
            center_lat: 0.0,
            center_lng: 0.0,
            resolution_km: 50.0,
            counts_by_category: BTreeMap::new(),
            total_count: total,
            distinct_category_count: 0,
            population_quartile: None,
            window_index: 0.0,
        }
    }

    fn bucket_sizes(cells: &[Cell]) -> [usize; 4] {
        let mut sizes = [0usize; 4];
        for c in cells {
            let quartile = c.population_quartile.expect("every cell assigned");
            sizes[quartile.value() as usize - 1] += 1;
        }
        sizes
    }

    #[test]
    fn partitions_evenly_when_divisible() {
        let mut cells: Vec<Cell> = (0..8).map(|i| cell(&format!("c{i}"), i)).collect();
        assign_population_quartiles(&mut cells);
        assert_eq!(bucket_sizes(&cells), [2, 2, 2, 2]);
    }

    #[test]
    fn bucket_sizes_differ_by_at_most_one() {
        for n in [4u64, 5, 6, 7, 11, 13] {
            let mut cells: Vec<Cell> = (0..n).map(|i| cell(&format!("c{i:03}"), i)).collect();
            assign_population_quartiles(&mut cells);

            let sizes = bucket_sizes(&cells);
            let total: usize = sizes.iter().sum();
            assert_eq!(total, n as usize, "n={n}: every cell covered once");

            let floor = n as usize / 4;
            let ceil = floor + usize::from(n % 4 != 0);
            for size in sizes {
                assert!(size == floor || size == ceil, "n={n}: bad bucket size {size}");
                assert!(size > 0, "n={n}: quartile left empty");
            }
        }
    }

    #[test]
    fn highest_volume_cells_land_in_highest_quartile() {
        let mut cells = vec![
            cell("a", 1),
            cell("b", 5),
            cell("c", 10),
            cell("d", 100),
        ];
        assign_population_quartiles(&mut cells);
        assert_eq!(cells[0].population_quartile, Some(PopulationQuartile::Lowest));
        assert_eq!(
            cells[3].population_quartile,
            Some(PopulationQuartile::Highest)
        );
    }

    #[test]
    fn ties_break_deterministically_by_cell_id() {
        let mut first = vec![cell("a", 5), cell("b", 5), cell("c", 5), cell("d", 5)];
        let mut second = first.clone();
        assign_population_quartiles(&mut first);
        assign_population_quartiles(&mut second);
        assert_eq!(first, second);
        // Lexicographically smallest id ranks lowest on equal counts.
        assert_eq!(first[0].population_quartile, Some(PopulationQuartile::Lowest));
        assert_eq!(
            first[3].population_quartile,
            Some(PopulationQuartile::Highest)
        );
    }

    #[test]
    fn fewer_than_four_cells_still_covered() {
        let mut cells = vec![cell("a", 1), cell("b", 2)];
        assign_population_quartiles(&mut cells);
        assert!(cells.iter().all(|c| c.population_quartile.is_some()));
    }

    #[test]
    fn empty_slice_is_a_no_op() {
        let mut cells: Vec<Cell> = Vec::new();
        assign_population_quartiles(&mut cells);
        assert!(cells.is_empty());
    }
}
