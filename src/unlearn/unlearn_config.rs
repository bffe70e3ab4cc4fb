use std::sync::mpsc;

use crate::unlearn::epoch_stats::{BatchHook, EpochStats};

/// Configuration for an `unlearn_loop` run.
///
/// # Fields
/// - `epochs`        — total number of passes over the retain set
/// - `num_classes`   — width of the per-class accuracy tables
/// - `yield_every`   — give up the time slice after this many mini-batches
///                     so status readers on other threads stay responsive
/// - `model_name`, `dataset_name`, `learning_rate` — embedded in the saved
///                     artifact's file name
/// - `progress_tx`   — optional channel sender; one `EpochStats` is sent per
///                     completed epoch. A dropped receiver is ignored.
/// - `batch_hook`    — optional callback run after every optimizer step
pub struct UnlearnConfig {
    pub epochs: usize,
    pub num_classes: usize,
    pub yield_every: usize,
    pub model_name: String,
    pub dataset_name: String,
    pub learning_rate: f64,
    pub progress_tx: Option<mpsc::Sender<EpochStats>>,
    pub batch_hook: Option<BatchHook>,
}

impl UnlearnConfig {
    /// Creates a minimal `UnlearnConfig` with no progress channel and no hook.
    pub fn new(
        epochs: usize,
        num_classes: usize,
        model_name: impl Into<String>,
        dataset_name: impl Into<String>,
        learning_rate: f64,
    ) -> Self {
        UnlearnConfig {
            epochs,
            num_classes,
            yield_every: 10,
            model_name: model_name.into(),
            dataset_name: dataset_name.into(),
            learning_rate,
            progress_tx: None,
            batch_hook: None,
        }
    }

    /// File name the finished model is saved under.
    pub fn artifact_name(&self) -> String {
        crate::artifacts::ArtifactStore::unlearned_filename(
            &self.model_name,
            &self.dataset_name,
            self.epochs,
            self.learning_rate,
        )
    }
}
