use crate::error::{Result, UnlearnError};
use crate::math::Matrix;

/// Multi-class cross-entropy over raw logits with integer class targets.
///
/// The softmax is folded into the loss, so the gradient w.r.t. the logits
/// is `(softmax(z) - onehot(y)) / batch`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossEntropyLoss;

/// Small epsilon added inside log() to prevent log(0) = -inf.
const EPS: f64 = 1e-12;

impl CrossEntropyLoss {
    pub fn new() -> Self {
        CrossEntropyLoss
    }

    /// Mean loss over the batch.
    pub fn loss(&self, logits: &Matrix, targets: &[usize]) -> Result<f64> {
        check_targets(logits, targets)?;
        if targets.is_empty() {
            return Ok(0.0);
        }
        let total: f64 = logits.data.iter().zip(targets)
            .map(|(row, &t)| -(softmax(row)[t] + EPS).ln())
            .sum();
        Ok(total / targets.len() as f64)
    }

    /// Mean loss and its gradient w.r.t. the logits.
    pub fn loss_and_grad(&self, logits: &Matrix, targets: &[usize]) -> Result<(f64, Matrix)> {
        check_targets(logits, targets)?;
        let n = targets.len().max(1) as f64;
        let mut total = 0.0;
        let mut grad = Matrix::zeros(logits.rows, logits.cols);
        for ((row, &t), g) in logits.data.iter().zip(targets).zip(grad.data.iter_mut()) {
            let p = softmax(row);
            total -= (p[t] + EPS).ln();
            for (j, (gj, pj)) in g.iter_mut().zip(p.iter()).enumerate() {
                let y = if j == t { 1.0 } else { 0.0 };
                *gj = (pj - y) / n;
            }
        }
        Ok((total / n, grad))
    }
}

/// Numerically stable softmax of one row.
pub fn softmax(row: &[f64]) -> Vec<f64> {
    let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = row.iter().map(|&x| (x - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

fn check_targets(logits: &Matrix, targets: &[usize]) -> Result<()> {
    if targets.len() != logits.rows {
        return Err(UnlearnError::shape(
            format!("{} targets", logits.rows),
            format!("{} targets", targets.len()),
        ));
    }
    if let Some(&bad) = targets.iter().find(|&&t| t >= logits.cols) {
        return Err(UnlearnError::Data(format!(
            "target class {} out of range for {} logits", bad, logits.cols
        )));
    }
    Ok(())
}
