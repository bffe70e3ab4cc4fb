use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::device::ComputeDevice;
use crate::unlearn::epoch_stats::EpochStats;

/// Progress and metrics of the current (or last) unlearning run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnlearningStatus {
    pub is_unlearning: bool,
    pub cancel_requested: bool,
    pub forget_class: Option<usize>,
    pub current_epoch: usize,
    pub total_epochs: usize,
    /// 0–100.
    pub progress: f64,
    /// Full training set (forget class included) loss of the last epoch.
    pub current_loss: f64,
    pub current_accuracy: f64,
    pub test_loss: f64,
    pub test_accuracy: f64,
    pub train_class_accuracies: BTreeMap<usize, f64>,
    pub test_class_accuracies: BTreeMap<usize, f64>,
    /// Lowest train loss seen this run; `None` before the first epoch.
    pub best_loss: Option<f64>,
    pub best_accuracy: f64,
    pub best_test_accuracy: f64,
    pub start_time: Option<DateTime<Utc>>,
    /// Seconds.
    pub estimated_time_remaining: f64,
    pub device: Option<ComputeDevice>,
    pub umap_embeddings: Vec<[f64; 2]>,
    pub svg_files: Vec<PathBuf>,
}

/// Shared handle to one run's status: one writer (the run), many readers.
///
/// Every update takes the lock once and rewrites all fields it touches, so a
/// snapshot never mixes two epochs. Cancellation lives in a separate atomic
/// flag so the training loop can poll it between mini-batches without
/// locking.
#[derive(Debug, Clone, Default)]
pub struct StatusHandle {
    inner: Arc<Mutex<UnlearningStatus>>,
    cancel: Arc<AtomicBool>,
}

impl StatusHandle {
    pub fn new() -> Self {
        StatusHandle::default()
    }

    fn lock(&self) -> MutexGuard<'_, UnlearningStatus> {
        // A panicking writer must not wedge the status in "running".
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Consistent copy of the whole record.
    pub fn snapshot(&self) -> UnlearningStatus {
        let mut snap = self.lock().clone();
        snap.cancel_requested = self.cancel.load(Ordering::SeqCst);
        snap
    }

    pub fn is_unlearning(&self) -> bool {
        self.lock().is_unlearning
    }

    /// Asks the active run to stop. Returns `false` (and records nothing)
    /// when no run is active.
    pub fn request_cancel(&self) -> bool {
        let st = self.lock();
        if st.is_unlearning {
            self.cancel.store(true, Ordering::SeqCst);
        }
        st.is_unlearning
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Marks the handle busy if it is idle, replacing the previous run's
    /// record with a fresh one. Returns whether the claim succeeded.
    pub fn try_claim(&self) -> bool {
        let mut st = self.lock();
        if st.is_unlearning {
            return false;
        }
        *st = UnlearningStatus { is_unlearning: true, ..UnlearningStatus::default() };
        self.cancel.store(false, Ordering::SeqCst);
        true
    }

    /// Resets the record for a new run. A cancellation already requested for
    /// this run is kept.
    pub fn begin(&self, forget_class: usize, total_epochs: usize, device: ComputeDevice) {
        let mut st = self.lock();
        *st = UnlearningStatus {
            is_unlearning: true,
            forget_class: Some(forget_class),
            total_epochs,
            device: Some(device),
            ..UnlearningStatus::default()
        };
    }

    /// Records the wall-clock start of the epoch loop.
    pub fn start_clock(&self, total_epochs: usize) {
        let mut st = self.lock();
        st.start_time = Some(Utc::now());
        st.total_epochs = total_epochs;
    }

    /// Publishes one finished epoch in a single critical section.
    pub fn publish_epoch(&self, stats: &EpochStats) {
        let mut st = self.lock();
        st.current_epoch = stats.epoch;
        st.total_epochs = stats.total_epochs;
        st.progress = stats.progress;

        st.current_loss = stats.train.loss;
        st.current_accuracy = stats.train.accuracy;
        st.train_class_accuracies = stats.train.class_accuracies.clone();
        st.test_loss = stats.test.loss;
        st.test_accuracy = stats.test.accuracy;
        st.test_class_accuracies = stats.test.class_accuracies.clone();

        st.best_loss = Some(st.best_loss.map_or(stats.train.loss, |b| b.min(stats.train.loss)));
        st.best_accuracy = st.best_accuracy.max(stats.train.accuracy);
        st.best_test_accuracy = st.best_test_accuracy.max(stats.test.accuracy);

        st.estimated_time_remaining = stats.eta_secs;
    }

    pub fn set_visualization(&self, points: Vec<[f64; 2]>, svg_files: Vec<PathBuf>) {
        let mut st = self.lock();
        st.umap_embeddings = points;
        st.svg_files = svg_files;
    }

    /// Clears the running and cancel flags. Called on every exit path.
    pub fn finish(&self) {
        let mut st = self.lock();
        st.is_unlearning = false;
        st.cancel_requested = false;
        self.cancel.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::EvalMetrics;

    fn metrics(loss: f64, accuracy: f64) -> EvalMetrics {
        EvalMetrics {
            loss,
            accuracy,
            class_accuracies: (0..10).map(|c| (c, accuracy)).collect(),
        }
    }

    fn stats(epoch: usize, loss: f64, acc: f64, test_acc: f64) -> EpochStats {
        EpochStats {
            epoch,
            total_epochs: 3,
            train: metrics(loss, acc),
            test: metrics(loss, test_acc),
            progress: epoch as f64 / 3.0 * 100.0,
            eta_secs: 1.0,
            elapsed_ms: 5,
        }
    }

    #[test]
    fn best_values_are_monotonic() {
        let status = StatusHandle::new();
        status.begin(2, 3, ComputeDevice::Cpu);

        status.publish_epoch(&stats(1, 0.9, 60.0, 55.0));
        status.publish_epoch(&stats(2, 1.2, 40.0, 70.0));
        let snap = status.snapshot();
        assert_eq!(snap.best_loss, Some(0.9));
        assert_eq!(snap.best_accuracy, 60.0);
        assert_eq!(snap.best_test_accuracy, 70.0);
        assert_eq!(snap.current_loss, 1.2);

        status.publish_epoch(&stats(3, 0.5, 65.0, 50.0));
        let snap = status.snapshot();
        assert_eq!(snap.best_loss, Some(0.5));
        assert_eq!(snap.best_accuracy, 65.0);
        assert_eq!(snap.best_test_accuracy, 70.0);
        assert_eq!(snap.progress, 100.0);
    }

    #[test]
    fn cancel_only_registers_while_running_and_finish_clears_it() {
        let status = StatusHandle::new();
        assert!(!status.request_cancel());
        assert!(!status.is_cancel_requested());

        assert!(status.try_claim());
        assert!(!status.try_claim());
        assert!(status.request_cancel());
        assert!(status.snapshot().cancel_requested);

        status.finish();
        let snap = status.snapshot();
        assert!(!snap.is_unlearning);
        assert!(!snap.cancel_requested);
    }

    #[test]
    fn begin_resets_previous_run_but_keeps_pending_cancel() {
        let status = StatusHandle::new();
        status.begin(1, 3, ComputeDevice::Cpu);
        status.publish_epoch(&stats(1, 0.1, 99.0, 99.0));
        status.finish();

        assert!(status.try_claim());
        status.request_cancel();
        status.begin(4, 5, ComputeDevice::Cpu);
        let snap = status.snapshot();
        assert_eq!(snap.forget_class, Some(4));
        assert_eq!(snap.current_epoch, 0);
        assert_eq!(snap.best_loss, None);
        assert!(snap.cancel_requested);
    }

    #[test]
    fn claim_clears_the_previous_run() {
        let status = StatusHandle::new();
        status.begin(1, 3, ComputeDevice::Cpu);
        status.publish_epoch(&stats(3, 0.2, 90.0, 80.0));
        status.set_visualization(vec![[0.0, 1.0]], vec![PathBuf::from("a.svg")]);
        status.finish();

        assert!(status.try_claim());
        let snap = status.snapshot();
        assert!(snap.is_unlearning);
        assert_eq!(snap.progress, 0.0);
        assert_eq!(snap.current_epoch, 0);
        assert_eq!(snap.best_loss, None);
        assert_eq!(snap.best_accuracy, 0.0);
        assert!(snap.test_class_accuracies.is_empty());
        assert!(snap.svg_files.is_empty());
        assert_eq!(snap.forget_class, None);
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let status = StatusHandle::new();
        status.begin(0, 1, ComputeDevice::Cpu);
        let json = serde_json::to_value(status.snapshot()).unwrap();
        assert_eq!(json["is_unlearning"], true);
        assert_eq!(json["device"], "cpu");
    }
}
