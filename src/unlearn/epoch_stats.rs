use std::sync::Arc;

use serde::{Serialize, Deserialize};

use crate::metrics::EvalMetrics;

/// Per-epoch statistics emitted by `unlearn_loop`.
///
/// The same value is published into the run status and, when a
/// `progress_tx` channel is configured, sent to the receiver at the end of
/// every completed epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Total epochs requested for this run.
    pub total_epochs: usize,
    /// Metrics over the full training set, forget class included.
    pub train: EvalMetrics,
    /// Metrics over the held-out test set.
    pub test: EvalMetrics,
    /// `epoch / total_epochs * 100`.
    pub progress: f64,
    /// Linear extrapolation of the remaining wall-clock time in seconds.
    pub eta_secs: f64,
    /// Wall-clock duration of this single epoch in milliseconds.
    pub elapsed_ms: u64,
}

/// Position inside the retain-only training pass, reported after each
/// optimizer step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchProgress {
    /// 1-based epoch number.
    pub epoch: usize,
    /// 1-based batch number within the epoch.
    pub batch: usize,
    pub num_batches: usize,
    pub loss: f64,
}

/// Callback invoked after every training step.
pub type BatchHook = Arc<dyn Fn(BatchProgress) + Send + Sync>;

/// `elapsed / epochs_done * total - elapsed`, floored at zero.
pub fn estimate_remaining(elapsed_secs: f64, epochs_done: usize, total_epochs: usize) -> f64 {
    if epochs_done == 0 {
        return 0.0;
    }
    let projected = elapsed_secs / epochs_done as f64 * total_epochs as f64;
    (projected - elapsed_secs).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eta_is_linear_and_never_negative() {
        assert_eq!(estimate_remaining(10.0, 1, 4), 30.0);
        assert_eq!(estimate_remaining(10.0, 4, 4), 0.0);
        assert_eq!(estimate_remaining(10.0, 0, 4), 0.0);
        assert_eq!(estimate_remaining(10.0, 5, 4), 0.0);
    }
}
