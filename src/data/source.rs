use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::data::dataset::Dataset;
use crate::error::{Result, UnlearnError};
use crate::math::Matrix;

/// Data loading service: produces the train and test splits of one dataset.
pub trait DataSource: Send + Sync {
    /// Dataset name embedded in artifact file names (e.g. `CIFAR10`).
    fn name(&self) -> &str;

    fn num_classes(&self) -> usize;

    /// Returns `(train, test)`.
    fn load(&self) -> Result<(Dataset, Dataset)>;
}

/// Gaussian class blobs.
///
/// Each class gets a centre drawn uniformly from `[-1, 1]^dim`; samples are
/// the centre plus isotropic noise of standard deviation `spread`. Samples
/// are interleaved by class (0, 1, 2, ..., 0, 1, ...). Everything derives
/// from `seed`, so two loads are identical.
#[derive(Debug, Clone)]
pub struct BlobsSource {
    pub dim: usize,
    pub num_classes: usize,
    pub train_per_class: usize,
    pub test_per_class: usize,
    pub spread: f64,
    pub seed: u64,
}

impl Default for BlobsSource {
    fn default() -> Self {
        BlobsSource {
            dim: 16,
            num_classes: 10,
            train_per_class: 100,
            test_per_class: 20,
            spread: 0.35,
            seed: 7,
        }
    }
}

impl BlobsSource {
    fn generate(&self, centres: &[Vec<f64>], per_class: usize, rng: &mut StdRng) -> Result<Dataset> {
        let n = per_class * self.num_classes;
        let mut features = Vec::with_capacity(n * self.dim);
        let mut targets = Vec::with_capacity(n);
        for i in 0..n {
            let class = i % self.num_classes;
            for &c in &centres[class] {
                let noise = Matrix::sample_standard_normal(rng) * self.spread;
                features.push((c + noise) as f32);
            }
            targets.push(class);
        }
        Dataset::new(features, self.dim, targets, self.num_classes)
    }
}

impl DataSource for BlobsSource {
    fn name(&self) -> &str {
        "BLOBS"
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn load(&self) -> Result<(Dataset, Dataset)> {
        if self.num_classes == 0 || self.dim == 0 {
            return Err(UnlearnError::Data("blobs need at least one class and one dimension".into()));
        }
        let mut rng = StdRng::seed_from_u64(self.seed);
        let centres: Vec<Vec<f64>> = (0..self.num_classes)
            .map(|_| (0..self.dim).map(|_| rng.gen_range(-1.0..=1.0)).collect())
            .collect();
        let train = self.generate(&centres, self.train_per_class, &mut rng)?;
        let test = self.generate(&centres, self.test_per_class, &mut rng)?;
        Ok((train, test))
    }
}
