use crate::error::{Result, UnlearnError};
use crate::math::Matrix;

/// In-memory labelled dataset: flat `f32` features plus one class target
/// per sample.
#[derive(Debug, Clone)]
pub struct Dataset {
    features: Vec<f32>,
    dim: usize,
    targets: Vec<usize>,
    num_classes: usize,
}

impl Dataset {
    pub fn new(features: Vec<f32>, dim: usize, targets: Vec<usize>, num_classes: usize) -> Result<Dataset> {
        if dim == 0 {
            return Err(UnlearnError::Data("feature dimension must be at least 1".into()));
        }
        if features.len() != dim * targets.len() {
            return Err(UnlearnError::Data(format!(
                "{} feature values do not fit {} samples of dimension {}",
                features.len(), targets.len(), dim
            )));
        }
        if let Some(&bad) = targets.iter().find(|&&t| t >= num_classes) {
            return Err(UnlearnError::Data(format!("label {} outside 0..{}", bad, num_classes)));
        }
        Ok(Dataset { features, dim, targets, num_classes })
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Class label of every sample, in dataset order.
    pub fn targets(&self) -> &[usize] {
        &self.targets
    }

    pub fn sample(&self, index: usize) -> (&[f32], usize) {
        let start = index * self.dim;
        (&self.features[start..start + self.dim], self.targets[index])
    }

    /// Indices of every sample whose label is not `class`, in dataset order.
    pub fn indices_excluding(&self, class: usize) -> Vec<usize> {
        self.targets.iter().enumerate()
            .filter(|(_, &t)| t != class)
            .map(|(i, _)| i)
            .collect()
    }

    /// Stacks the given samples into a (len, dim) batch.
    pub fn gather(&self, indices: &[usize]) -> (Matrix, Vec<usize>) {
        let mut rows = Vec::with_capacity(indices.len());
        let mut labels = Vec::with_capacity(indices.len());
        for &i in indices {
            let (x, y) = self.sample(i);
            rows.push(x.iter().map(|&v| v as f64).collect());
            labels.push(y);
        }
        (Matrix { rows: rows.len(), cols: self.dim, data: rows }, labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_samples() -> Dataset {
        Dataset::new(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0], 2, vec![0, 2, 1], 3).unwrap()
    }

    #[test]
    fn rejects_inconsistent_lengths_and_labels() {
        assert!(Dataset::new(vec![0.0; 5], 2, vec![0, 1], 2).is_err());
        assert!(Dataset::new(vec![0.0; 4], 2, vec![0, 2], 2).is_err());
    }

    #[test]
    fn excluding_keeps_dataset_order() {
        let ds = three_samples();
        assert_eq!(ds.indices_excluding(2), vec![0, 2]);
    }

    #[test]
    fn gather_builds_rows_in_requested_order() {
        let ds = three_samples();
        let (x, y) = ds.gather(&[2, 0]);
        assert_eq!(x.data, vec![vec![4.0, 5.0], vec![0.0, 1.0]]);
        assert_eq!(y, vec![1, 0]);
    }
}
