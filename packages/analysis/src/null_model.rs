//! Monte Carlo null-model engine for cross-category co-occurrence.
//!
//! Decides whether observed co-occurrence exceeds what independent,
//! geography-blind category assignment would produce given the same
//! per-cell totals. Each iteration permutes the category labels of a
//! shuffle group's records and deals them back to the group's cells with
//! every cell's total count held fixed, equivalent to
//! multivariate-hypergeometric reshuffling. The pairing statistic is the
//! joint-presence count: the number of cells where both categories of a
//! pair appear; the full-overlap statistic counts cells where every
//! category appears. The identical definition is applied to observed and
//! null data.
//!
//! The global and stratified procedures are one parametrized algorithm:
//! the global run uses a single shuffle group holding all cells, the
//! stratified run one group per population quartile, so labels never cross
//! quartile boundaries and quartile-level reporting-rate differences
//! cannot masquerade as a window effect.

use std::collections::BTreeMap;
use std::thread;

use rand::rngs::StdRng;
use rand::seq::SliceRandom as _;
use rand::SeedableRng as _;
use window_map_analysis_models::{
    Cell, MonteCarloRun, OverlapStatistic, PairingStatistic, PopulationQuartile,
};
use window_map_sighting_models::{CATEGORY_COUNT, SightingCategory};

use crate::{CancellationToken, SIGNIFICANCE_THRESHOLD, VARIANCE_EPSILON};
use crate::stats::RunningStats;

/// Fixed number of worker chunks the shuffle iterations are split across.
///
/// A constant (rather than detected parallelism) keeps seeded runs
/// bit-exact on any machine: chunk boundaries and the merge order never
/// change.
const SHUFFLE_CHUNKS: usize = 4;

/// One independently shuffled unit: a set of cells and the category labels
/// of every record binned into them.
struct ShuffleGroup {
    /// `(slot in the dense count table, cell total)` per member cell.
    members: Vec<(usize, u32)>,
    /// Dense category index of each record in the group, the permutation
    /// pool.
    pool: Vec<u8>,
}

/// Runs the global (unstratified) permutation test.
#[must_use]
pub fn run_monte_carlo(
    cells: &[Cell],
    shuffle_count: u32,
    seed: Option<u64>,
    cancel: Option<&CancellationToken>,
) -> MonteCarloRun {
    run_permutation_test(cells, shuffle_count, seed, cancel, None)
}

/// Runs the permutation test stratified by population quartile: labels are
/// only ever reshuffled within a quartile, never across.
#[must_use]
pub fn run_stratified_monte_carlo(
    cells: &[Cell],
    shuffle_count: u32,
    seed: Option<u64>,
    cancel: Option<&CancellationToken>,
) -> MonteCarloRun {
    run_permutation_test(
        cells,
        shuffle_count,
        seed,
        cancel,
        Some(&|cell: &Cell| {
            cell.population_quartile
                .map_or(0, PopulationQuartile::value)
        }),
    )
}

/// The shared permutation algorithm behind both public entry points.
///
/// `stratify_key` maps each cell to its shuffle group; `None` puts every
/// cell into one global group.
fn run_permutation_test(
    cells: &[Cell],
    shuffle_count: u32,
    seed: Option<u64>,
    cancel: Option<&CancellationToken>,
    stratify_key: Option<&dyn Fn(&Cell) -> u8>,
) -> MonteCarloRun {
    let pairs = category_pairs();
    let cell_counts = dense_counts(cells);
    let observed = presence_statistics(&cell_counts, &pairs);
    let category_totals = category_totals(&cell_counts);

    let groups = build_groups(cells, &cell_counts, stratify_key);
    let group_count = groups.len();

    log::debug!(
        "Permutation test over {} cells, {group_count} shuffle group(s), {shuffle_count} iterations",
        cells.len()
    );

    let (accumulated, shuffles_completed) =
        run_shuffle_chunks(&groups, cells.len(), &pairs, shuffle_count, seed, cancel);

    let complete = shuffles_completed == shuffle_count;
    if !complete {
        log::warn!(
            "Permutation test cancelled after {shuffles_completed}/{shuffle_count} iterations; \
             returning best-effort statistics"
        );
    }

    summarize(&pairs, &observed, &accumulated, &category_totals, shuffles_completed, complete)
}

/// All unordered category pairs, as dense index tuples.
fn category_pairs() -> Vec<(SightingCategory, SightingCategory)> {
    let all = SightingCategory::all();
    let mut pairs = Vec::with_capacity(all.len() * (all.len() - 1) / 2);
    for (i, &a) in all.iter().enumerate() {
        for &b in &all[i + 1..] {
            pairs.push((a, b));
        }
    }
    pairs
}

/// Per-cell dense count arrays, in cell order.
fn dense_counts(cells: &[Cell]) -> Vec<[u32; CATEGORY_COUNT]> {
    cells
        .iter()
        .map(|cell| {
            let mut counts = [0u32; CATEGORY_COUNT];
            for (&category, &count) in &cell.counts_by_category {
                #[allow(clippy::cast_possible_truncation)]
                let count = count.min(u64::from(u32::MAX)) as u32;
                counts[category.index()] = count;
            }
            counts
        })
        .collect()
}

fn category_totals(cell_counts: &[[u32; CATEGORY_COUNT]]) -> [u64; CATEGORY_COUNT] {
    let mut totals = [0u64; CATEGORY_COUNT];
    for counts in cell_counts {
        for (total, &count) in totals.iter_mut().zip(counts.iter()) {
            *total += u64::from(count);
        }
    }
    totals
}

/// Joint-presence count per pair plus the full-overlap count, computed the
/// same way for observed and shuffled data.
fn presence_statistics(
    cell_counts: &[[u32; CATEGORY_COUNT]],
    pairs: &[(SightingCategory, SightingCategory)],
) -> Vec<f64> {
    let mut stats = vec![0.0; pairs.len() + 1];
    for counts in cell_counts {
        for (k, &(a, b)) in pairs.iter().enumerate() {
            if counts[a.index()] > 0 && counts[b.index()] > 0 {
                stats[k] += 1.0;
            }
        }
        if counts.iter().all(|&c| c > 0) {
            stats[pairs.len()] += 1.0;
        }
    }
    stats
}

fn build_groups(
    cells: &[Cell],
    cell_counts: &[[u32; CATEGORY_COUNT]],
    stratify_key: Option<&dyn Fn(&Cell) -> u8>,
) -> Vec<ShuffleGroup> {
    let mut by_key: BTreeMap<u8, ShuffleGroup> = BTreeMap::new();

    for (slot, (cell, counts)) in cells.iter().zip(cell_counts).enumerate() {
        let key = stratify_key.map_or(0, |key_fn| key_fn(cell));
        let group = by_key.entry(key).or_insert_with(|| ShuffleGroup {
            members: Vec::new(),
            pool: Vec::new(),
        });

        let total: u32 = counts.iter().sum();
        group.members.push((slot, total));
        for &category in SightingCategory::all() {
            let count = counts[category.index()];
            #[allow(clippy::cast_possible_truncation)]
            group
                .pool
                .extend(std::iter::repeat_n(category.index() as u8, count as usize));
        }
    }

    by_key.into_values().collect()
}

/// Splits the iterations across [`SHUFFLE_CHUNKS`] scoped worker threads
/// and merges their Welford partials in chunk order.
fn run_shuffle_chunks(
    groups: &[ShuffleGroup],
    cell_count: usize,
    pairs: &[(SightingCategory, SightingCategory)],
    shuffle_count: u32,
    seed: Option<u64>,
    cancel: Option<&CancellationToken>,
) -> (Vec<RunningStats>, u32) {
    let stat_count = pairs.len() + 1;
    let base = shuffle_count / SHUFFLE_CHUNKS as u32;
    let extra = shuffle_count % SHUFFLE_CHUNKS as u32;

    let partials: Vec<Option<(Vec<RunningStats>, u32)>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..SHUFFLE_CHUNKS)
            .map(|chunk| {
                let iterations = base + u32::from((chunk as u32) < extra);
                let rng = match seed {
                    Some(base_seed) => StdRng::seed_from_u64(chunk_seed(base_seed, chunk)),
                    None => StdRng::from_os_rng(),
                };
                let cancel = cancel.cloned();
                scope.spawn(move || {
                    shuffle_worker(groups, cell_count, pairs, iterations, rng, cancel.as_ref())
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(partial) => Some(partial),
                Err(_) => {
                    log::error!("Shuffle worker panicked; dropping its partial statistics");
                    None
                }
            })
            .collect()
    });

    let mut accumulated = vec![RunningStats::new(); stat_count];
    let mut completed = 0u32;
    for partial in partials.into_iter().flatten() {
        let (worker_stats, worker_completed) = partial;
        for (merged, chunk_stats) in accumulated.iter_mut().zip(worker_stats) {
            merged.merge(chunk_stats);
        }
        completed += worker_completed;
    }

    (accumulated, completed)
}

/// Derives a per-chunk seed from the base seed; chunks must not share RNG
/// streams.
const fn chunk_seed(base: u64, chunk: usize) -> u64 {
    base.wrapping_add((chunk as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// One worker chunk: permute each group's pool, deal labels back to the
/// group's cells, accumulate the presence statistics. Checks for
/// cancellation between iterations.
fn shuffle_worker(
    groups: &[ShuffleGroup],
    cell_count: usize,
    pairs: &[(SightingCategory, SightingCategory)],
    iterations: u32,
    mut rng: StdRng,
    cancel: Option<&CancellationToken>,
) -> (Vec<RunningStats>, u32) {
    let mut accumulated = vec![RunningStats::new(); pairs.len() + 1];
    let mut pools: Vec<Vec<u8>> = groups.iter().map(|g| g.pool.clone()).collect();
    let mut scratch = vec![[0u32; CATEGORY_COUNT]; cell_count];
    let mut completed = 0u32;

    for _ in 0..iterations {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            break;
        }

        scratch.fill([0; CATEGORY_COUNT]);
        for (group, pool) in groups.iter().zip(pools.iter_mut()) {
            pool.shuffle(&mut rng);
            let mut cursor = 0usize;
            for &(slot, total) in &group.members {
                for &label in &pool[cursor..cursor + total as usize] {
                    scratch[slot][label as usize] += 1;
                }
                cursor += total as usize;
            }
        }

        let stats = presence_statistics(&scratch, pairs);
        for (acc, value) in accumulated.iter_mut().zip(stats) {
            acc.push(value);
        }
        completed += 1;
    }

    (accumulated, completed)
}

/// Turns accumulated null distributions into pairing statistics.
fn summarize(
    pairs: &[(SightingCategory, SightingCategory)],
    observed: &[f64],
    accumulated: &[RunningStats],
    category_totals: &[u64; CATEGORY_COUNT],
    shuffles_completed: u32,
    complete: bool,
) -> MonteCarloRun {
    let z_for = |observed: f64, stats: &RunningStats, degenerate: bool| -> (f64, bool) {
        let std = stats.std_dev();
        if degenerate || std <= VARIANCE_EPSILON || stats.count() < 2 {
            (0.0, true)
        } else {
            ((observed - stats.mean()) / std, false)
        }
    };

    let pairings: Vec<PairingStatistic> = pairs
        .iter()
        .enumerate()
        .map(|(k, &(category_a, category_b))| {
            let absent = category_totals[category_a.index()] == 0
                || category_totals[category_b.index()] == 0;
            let (z_score, insufficient_variance) = z_for(observed[k], &accumulated[k], absent);
            PairingStatistic {
                category_a,
                category_b,
                observed_statistic: observed[k],
                null_mean: accumulated[k].mean(),
                null_std: accumulated[k].std_dev(),
                z_score,
                window_effect_detected: !insufficient_variance
                    && z_score.abs() >= SIGNIFICANCE_THRESHOLD,
                insufficient_variance,
            }
        })
        .collect();

    let overlap_index = pairs.len();
    let any_absent = category_totals.iter().any(|&t| t == 0);
    let (overlap_z, overlap_insufficient) = z_for(
        observed[overlap_index],
        &accumulated[overlap_index],
        any_absent,
    );
    let full_overlap = OverlapStatistic {
        observed_statistic: observed[overlap_index],
        null_mean: accumulated[overlap_index].mean(),
        null_std: accumulated[overlap_index].std_dev(),
        z_score: overlap_z,
        insufficient_variance: overlap_insufficient,
    };

    let strongest = pairings
        .iter()
        .max_by(|a, b| {
            a.z_score
                .abs()
                .partial_cmp(&b.z_score.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    let (strongest_pairing, strongest_z_score) = strongest
        .map_or_else(|| (String::new(), 0.0), |p| (p.label(), p.z_score));

    MonteCarloRun {
        window_effect_detected: pairings.iter().any(|p| p.window_effect_detected),
        pairings,
        full_overlap,
        strongest_pairing,
        strongest_z_score,
        shuffles_completed,
        complete,
    }
}
