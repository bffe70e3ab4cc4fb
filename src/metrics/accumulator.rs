use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::DataLoader;
use crate::error::Result;
use crate::loss::CrossEntropyLoss;
use crate::network::Network;

/// Loss and accuracy over one full pass of a loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalMetrics {
    /// Sum of per-batch mean losses divided by the number of batches.
    pub loss: f64,
    /// Percent of samples classified correctly.
    pub accuracy: f64,
    /// Percent correct per true class; keys are exactly `0..num_classes`.
    pub class_accuracies: BTreeMap<usize, f64>,
}

/// Per-class hit counters.
#[derive(Debug, Clone)]
pub struct ClassTally {
    correct: Vec<usize>,
    total: Vec<usize>,
}

impl ClassTally {
    pub fn new(num_classes: usize) -> Self {
        ClassTally { correct: vec![0; num_classes], total: vec![0; num_classes] }
    }

    pub fn record(&mut self, predicted: usize, label: usize) {
        if label < self.total.len() {
            self.total[label] += 1;
            if predicted == label {
                self.correct[label] += 1;
            }
        }
    }

    pub fn correct(&self) -> usize {
        self.correct.iter().sum()
    }

    pub fn total(&self) -> usize {
        self.total.iter().sum()
    }

    /// Classes without samples report 0.
    pub fn accuracies(&self) -> BTreeMap<usize, f64> {
        self.correct.iter().zip(&self.total).enumerate()
            .map(|(c, (&hit, &n))| (c, percent(hit, n)))
            .collect()
    }
}

pub(crate) fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 { 0.0 } else { 100.0 * part as f64 / whole as f64 }
}

/// One inference pass over `loader`.
///
/// Borrows the network immutably: no gradients, no cached state, no
/// parameter changes. An empty loader yields zero loss and accuracy.
pub fn accumulate(
    network: &Network,
    loader: &DataLoader,
    criterion: &CrossEntropyLoss,
    num_classes: usize,
) -> Result<EvalMetrics> {
    let mut loss_sum = 0.0;
    let mut batches = 0usize;
    let mut tally = ClassTally::new(num_classes);

    for batch in loader.iter() {
        let logits = network.infer(&batch.inputs)?;
        loss_sum += criterion.loss(&logits, &batch.targets)?;
        batches += 1;
        for (predicted, &label) in logits.argmax_rows().into_iter().zip(&batch.targets) {
            tally.record(predicted, label);
        }
    }

    Ok(EvalMetrics {
        loss: if batches == 0 { 0.0 } else { loss_sum / batches as f64 },
        accuracy: percent(tally.correct(), tally.total()),
        class_accuracies: tally.accuracies(),
    })
}
