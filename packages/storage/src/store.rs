//! Append-only history of serialized analysis rows.
//!
//! Replaces the "most recent analysis" mutable global the platform used to
//! carry: every invocation appends an immutable timestamped row, and
//! "latest" is a query over that history.

use crate::serialize::AnalysisRow;

/// Append-only store of analysis rows. Rows are never mutated or removed.
#[derive(Debug, Clone, Default)]
pub struct AnalysisStore {
    rows: Vec<AnalysisRow>,
}

impl AnalysisStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one row to the history.
    pub fn append(&mut self, row: AnalysisRow) {
        log::debug!(
            "Appending analysis row: {} km at {}",
            row.resolution_km,
            row.analysis_date
        );
        self.rows.push(row);
    }

    /// The full history, in append order.
    #[must_use]
    pub fn history(&self) -> &[AnalysisRow] {
        &self.rows
    }

    /// The most recent row by analysis timestamp.
    ///
    /// Fixed-precision RFC 3339 timestamps order lexicographically, so no
    /// parsing is needed. Ties (same millisecond) resolve to the
    /// later-appended row.
    #[must_use]
    pub fn latest(&self) -> Option<&AnalysisRow> {
        self.rows
            .iter()
            .enumerate()
            .max_by(|(i, a), (j, b)| {
                a.analysis_date
                    .cmp(&b.analysis_date)
                    .then_with(|| i.cmp(j))
            })
            .map(|(_, row)| row)
    }

    /// The most recent row for one resolution.
    #[must_use]
    pub fn latest_for_resolution(&self, resolution_km: f64) -> Option<&AnalysisRow> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| (row.resolution_km - resolution_km).abs() < f64::EPSILON)
            .max_by(|(i, a), (j, b)| {
                a.analysis_date
                    .cmp(&b.analysis_date)
                    .then_with(|| i.cmp(j))
            })
            .map(|(_, row)| row)
    }

    /// Number of rows in the history.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the history is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(date: &str, resolution_km: f64) -> AnalysisRow {
        AnalysisRow {
            analysis_date: date.to_string(),
            resolution_km,
            total_cells: 10,
            shuffle_count: 100,
            shuffles_completed: 100,
            complete: true,
            pairings_json: "[]".to_string(),
            full_overlap_json: "{}".to_string(),
            strongest_pairing: String::new(),
            strongest_z_score: 0.0,
            window_effect_detected: false,
            computation_time_ms: 5,
            stratified_json: None,
        }
    }

    #[test]
    fn empty_store_has_no_latest() {
        let store = AnalysisStore::new();
        assert!(store.is_empty());
        assert!(store.latest().is_none());
    }

    #[test]
    fn latest_is_a_query_not_insertion_order() {
        let mut store = AnalysisStore::new();
        store.append(row("2026-03-14T10:00:00.000Z", 50.0));
        store.append(row("2026-03-14T09:00:00.000Z", 50.0));

        let latest = store.latest().unwrap();
        assert_eq!(latest.analysis_date, "2026-03-14T10:00:00.000Z");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn latest_for_resolution_filters_first() {
        let mut store = AnalysisStore::new();
        store.append(row("2026-03-14T09:00:00.000Z", 25.0));
        store.append(row("2026-03-14T10:00:00.000Z", 50.0));
        store.append(row("2026-03-14T11:00:00.000Z", 25.0));

        let latest_25 = store.latest_for_resolution(25.0).unwrap();
        assert_eq!(latest_25.analysis_date, "2026-03-14T11:00:00.000Z");
        let latest_50 = store.latest_for_resolution(50.0).unwrap();
        assert_eq!(latest_50.analysis_date, "2026-03-14T10:00:00.000Z");
        assert!(store.latest_for_resolution(5.0).is_none());
    }

    #[test]
    fn history_preserves_append_order() {
        let mut store = AnalysisStore::new();
        store.append(row("2026-03-14T10:00:00.000Z", 50.0));
        store.append(row("2026-03-14T09:00:00.000Z", 25.0));
        let dates: Vec<&str> = store
            .history()
            .iter()
            .map(|r| r.analysis_date.as_str())
            .collect();
        assert_eq!(
            dates,
            vec!["2026-03-14T10:00:00.000Z", "2026-03-14T09:00:00.000Z"]
        );
    }
}
