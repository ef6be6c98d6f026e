//! Batch progress tracking

use serde::{Deserialize, Serialize};

/// Progress of one batch run
///
/// Only the batch orchestrator advances this; everyone else reads snapshots.
/// `current` never decreases within a run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgressState {
    /// Probes resolved so far (successfully or not)
    pub current: usize,
    /// Probes in the batch
    pub total: usize,
    /// `round(current / total * 100)`
    pub percent: f64,
}

impl ProgressState {
    /// Fresh progress for a batch of `total` probes
    pub fn start(total: usize) -> Self {
        Self {
            current: 0,
            total,
            percent: 0.0,
        }
    }

    /// Record one resolved probe
    pub fn advance(&mut self) {
        if self.current < self.total {
            self.current += 1;
        }
        self.percent = Self::percent_of(self.current, self.total);
    }

    /// Mark the run finished
    pub fn complete(&mut self) {
        self.current = self.total;
        self.percent = 100.0;
    }

    pub fn is_complete(&self) -> bool {
        self.current == self.total && self.percent >= 100.0
    }

    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.current)
    }

    pub fn percent_of(current: usize, total: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        (current as f64 / total as f64 * 100.0).round()
    }
}
