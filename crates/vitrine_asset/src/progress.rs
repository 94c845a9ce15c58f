//! Progress accounting across all underlying fetches
//!
//! Counts settled fetches against the total fixed at load time,
//! independent of logical asset boundaries. A material with three channel
//! textures contributes three units, not one.

/// Monotonic settled-unit counter
#[derive(Debug, Clone, Default)]
pub struct ProgressAggregator {
    settled: usize,
    total: usize,
}

impl ProgressAggregator {
    /// Total is fixed here, before any fetch begins
    pub fn new(total: usize) -> Self {
        Self { settled: 0, total }
    }

    /// Record one settlement and return the updated `(settled, total)`
    pub fn on_settled(&mut self) -> (usize, usize) {
        debug_assert!(self.settled < self.total, "settlement beyond total");
        self.settled = (self.settled + 1).min(self.total);
        (self.settled, self.total)
    }

    /// Completion ratio in [0, 1]. An empty load reports 0; the zero-asset
    /// case completes through the gate's fast path instead.
    pub fn ratio(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.settled as f32 / self.total as f32
        }
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.settled == self.total
    }

    pub fn settled(&self) -> usize {
        self.settled
    }

    pub fn total(&self) -> usize {
        self.total
    }
}
