use serde::{Deserialize, Serialize};

use crate::error::{Result, UnlearnError};

/// Immutable input to one unlearning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnlearningRequest {
    /// Class whose samples are withheld from training.
    pub forget_class: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub seed: u64,
}

impl UnlearningRequest {
    /// Rejects requests that could only train on nothing or diverge at once.
    pub fn validate(&self, num_classes: usize) -> Result<()> {
        if self.forget_class >= num_classes {
            return Err(UnlearnError::InvalidRequest(format!(
                "forget_class {} outside 0..{}", self.forget_class, num_classes
            )));
        }
        if self.epochs == 0 {
            return Err(UnlearnError::InvalidRequest("epochs must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(UnlearnError::InvalidRequest("batch_size must be at least 1".into()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(UnlearnError::InvalidRequest(format!(
                "learning_rate must be a positive number, got {}", self.learning_rate
            )));
        }
        Ok(())
    }

    /// Dataset description used in artifact names, e.g.
    /// `CIFAR10_without_class_3`.
    pub fn dataset_description(&self, dataset_name: &str) -> String {
        format!("{}_without_class_{}", dataset_name, self.forget_class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> UnlearningRequest {
        UnlearningRequest { forget_class: 3, epochs: 2, batch_size: 128, learning_rate: 0.01, seed: 1111 }
    }

    #[test]
    fn accepts_a_sane_request() {
        request().validate(10).unwrap();
        assert_eq!(request().dataset_description("CIFAR10"), "CIFAR10_without_class_3");
    }

    #[test]
    fn rejects_out_of_range_and_degenerate_values() {
        let bad = [
            UnlearningRequest { forget_class: 10, ..request() },
            UnlearningRequest { epochs: 0, ..request() },
            UnlearningRequest { batch_size: 0, ..request() },
            UnlearningRequest { learning_rate: 0.0, ..request() },
            UnlearningRequest { learning_rate: f64::NAN, ..request() },
        ];
        for r in bad {
            assert!(matches!(r.validate(10), Err(UnlearnError::InvalidRequest(_))), "{:?}", r);
        }
    }
}
