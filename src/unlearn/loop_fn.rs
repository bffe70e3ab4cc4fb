use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use tracing::{debug, info};

use crate::artifacts::ArtifactStore;
use crate::data::Loaders;
use crate::error::Result;
use crate::loss::CrossEntropyLoss;
use crate::metrics::evaluate;
use crate::network::{Mode, Network};
use crate::optim::Optimizer;
use crate::unlearn::epoch_stats::{estimate_remaining, BatchProgress, EpochStats};
use crate::unlearn::status::StatusHandle;
use crate::unlearn::unlearn_config::UnlearnConfig;

/// How the epoch loop ended.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopOutcome {
    /// Every epoch ran and the model was saved.
    Completed { model_path: PathBuf, epochs: usize },
    /// Stopped on request; nothing was saved.
    Cancelled { epochs_completed: usize },
}

/// Fine-tunes `network` on the retain set for `config.epochs` epochs,
/// evaluating on the full training set and the test set after each one.
///
/// # Arguments
/// - `network`   — modified in place
/// - `loaders`   — retain (reshuffled per epoch), full and test views
/// - `optimizer` — carries the learning rate and its own state
/// - `status`    — receives one consistent update per completed epoch and is
///                 polled for cancellation between mini-batches
/// - `store`     — where the model is written after the last epoch
///
/// # Cancellation
/// Checked before every epoch and before every mini-batch. A cancelled
/// epoch is abandoned without evaluation, so the status keeps describing
/// the last completed epoch. A request arriving after the final epoch has
/// no effect.
pub fn unlearn_loop(
    network: &mut Network,
    loaders: &mut Loaders,
    criterion: &CrossEntropyLoss,
    optimizer: &mut dyn Optimizer,
    status: &StatusHandle,
    store: &ArtifactStore,
    config: &UnlearnConfig,
) -> Result<LoopOutcome> {
    let run_start = Instant::now();
    status.start_clock(config.epochs);
    let mut completed = 0;

    for epoch in 1..=config.epochs {
        if status.is_cancel_requested() {
            info!(epoch, "cancellation requested, stopping before epoch");
            return Ok(LoopOutcome::Cancelled { epochs_completed: completed });
        }

        let t_start = Instant::now();

        // ── Retain-only pass ──────────────────────────────────────────────
        let Some(retain_loss) = run_retain_pass(network, loaders, criterion, optimizer, status, config, epoch)? else {
            info!(epoch, "cancellation requested, abandoning epoch");
            return Ok(LoopOutcome::Cancelled { epochs_completed: completed });
        };

        // ── Evaluation ────────────────────────────────────────────────────
        let train = evaluate(network, &loaders.full, criterion, config.num_classes)?;
        let test = evaluate(network, &loaders.test, criterion, config.num_classes)?;
        completed = epoch;

        let stats = EpochStats {
            epoch,
            total_epochs: config.epochs,
            train,
            test,
            progress: epoch as f64 / config.epochs as f64 * 100.0,
            eta_secs: estimate_remaining(run_start.elapsed().as_secs_f64(), epoch, config.epochs),
            elapsed_ms: t_start.elapsed().as_millis() as u64,
        };
        status.publish_epoch(&stats);

        info!(
            "epoch {}/{}: retain loss {:.4}, train loss {:.4} acc {:.2}%, test loss {:.4} acc {:.2}%, eta {:.1}s",
            epoch, config.epochs, retain_loss,
            stats.train.loss, stats.train.accuracy,
            stats.test.loss, stats.test.accuracy,
            stats.eta_secs
        );
        debug!(train = ?stats.train.class_accuracies, test = ?stats.test.class_accuracies, "per-class accuracy");

        if let Some(ref tx) = config.progress_tx {
            if tx.send(stats).is_err() {
                debug!("progress receiver dropped");
            }
        }
        thread::yield_now();
    }

    let model_path = store.save(network, &config.artifact_name())?;
    Ok(LoopOutcome::Completed { model_path, epochs: completed })
}

/// One pass of mini-batch updates over the retain set. Returns the mean
/// batch loss, or `None` if cancellation interrupted the pass.
fn run_retain_pass(
    network: &mut Network,
    loaders: &mut Loaders,
    criterion: &CrossEntropyLoss,
    optimizer: &mut dyn Optimizer,
    status: &StatusHandle,
    config: &UnlearnConfig,
    epoch: usize,
) -> Result<Option<f64>> {
    network.set_mode(Mode::Train);
    loaders.retain.reshuffle();
    let num_batches = loaders.retain.num_batches();
    let yield_every = config.yield_every.max(1);
    let mut total_loss = 0.0;

    for (i, batch) in loaders.retain.iter().enumerate() {
        if status.is_cancel_requested() {
            return Ok(None);
        }
        let logits = network.forward(&batch.inputs)?;
        let (loss, grad) = criterion.loss_and_grad(&logits, &batch.targets)?;
        let grads = network.backward(&grad)?;
        optimizer.step(network, &grads)?;
        total_loss += loss;

        if let Some(ref hook) = config.batch_hook {
            hook(BatchProgress { epoch, batch: i + 1, num_batches, loss });
        }
        if (i + 1) % yield_every == 0 {
            thread::yield_now();
        }
    }

    Ok(Some(total_loss / num_batches.max(1) as f64))
}
