//! Streaming mean/variance accumulation for the Monte Carlo engine.
//!
//! Welford's algorithm keeps the running mean and sum of squared deviations
//! (M2) instead of naive sum / sum-of-squares, which loses precision at
//! shuffle counts in the thousands. The pairwise `merge` lets worker chunks
//! accumulate independently and combine without precision loss.

/// Streaming mean/variance accumulator (Welford).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    /// Creates an empty accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
        }
    }

    /// Feeds one observation.
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        #[allow(clippy::cast_precision_loss)]
        let n = self.count as f64;
        let delta = value - self.mean;
        self.mean += delta / n;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    /// Combines another accumulator into this one (Chan's pairwise update).
    ///
    /// Merge order is deterministic for a fixed chunking, so seeded runs
    /// reproduce bit-exact results regardless of thread scheduling.
    pub fn merge(&mut self, other: Self) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other;
            return;
        }

        #[allow(clippy::cast_precision_loss)]
        let (n_a, n_b) = (self.count as f64, other.count as f64);
        let total = n_a + n_b;
        let delta = other.mean - self.mean;

        self.mean = (delta * n_b).mul_add(1.0 / total, self.mean);
        self.m2 += other.m2 + delta * delta * n_a * n_b / total;
        self.count += other.count;
    }

    /// Number of observations accumulated.
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Mean of the observations (0 when empty).
    #[must_use]
    pub const fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample standard deviation (0 with fewer than two observations).
    #[must_use]
    pub fn std_dev(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let variance = self.m2 / (self.count - 1) as f64;
        variance.max(0.0).sqrt()
    }
}
