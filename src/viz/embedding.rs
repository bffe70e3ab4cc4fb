use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::Result;
use crate::math::Matrix;

/// 2-D coordinates for each input row plus the plot files written for them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Embedding {
    pub points: Vec<[f64; 2]>,
    /// Artifact name → file path, ordered by name.
    pub artifacts: BTreeMap<String, PathBuf>,
}

/// Visualization service: projects per-sample activations to the plane.
pub trait EmbeddingService: Send + Sync {
    fn compute_embeddings(&self, activations: &Matrix, labels: &[usize], forget_class: usize) -> Result<Embedding>;
}
