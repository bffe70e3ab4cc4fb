use std::sync::Arc;

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::data::dataset::Dataset;
use crate::error::{Result, UnlearnError};
use crate::math::Matrix;

/// One mini-batch: stacked inputs and their class targets.
#[derive(Debug, Clone)]
pub struct Batch {
    pub inputs: Matrix,
    pub targets: Vec<usize>,
}

/// Mini-batch view over a shared dataset.
///
/// The view owns an index list into the dataset. Unshuffled loaders keep the
/// order they were built with; shuffled loaders permute it on `reshuffle`
/// with their own seeded RNG, so the sequence of epoch orders is a function
/// of the seed alone.
#[derive(Debug, Clone)]
pub struct DataLoader {
    dataset: Arc<Dataset>,
    indices: Vec<usize>,
    batch_size: usize,
    rng: Option<StdRng>,
}

impl DataLoader {
    /// Every sample in dataset order.
    pub fn new(dataset: Arc<Dataset>, batch_size: usize) -> DataLoader {
        let indices = (0..dataset.len()).collect();
        DataLoader::subset(dataset, indices, batch_size)
    }

    /// Only the given samples, in the given order.
    pub fn subset(dataset: Arc<Dataset>, indices: Vec<usize>, batch_size: usize) -> DataLoader {
        DataLoader { dataset, indices, batch_size: batch_size.max(1), rng: None }
    }

    /// Turns this loader into one that reshuffles from `seed`.
    pub fn shuffled(mut self, seed: u64) -> DataLoader {
        self.rng = Some(StdRng::seed_from_u64(seed));
        self
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    /// Sample indices in current iteration order.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of samples in the view.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn num_batches(&self) -> usize {
        self.indices.len().div_ceil(self.batch_size)
    }

    /// Draws a new permutation for the next epoch. No-op when unshuffled.
    pub fn reshuffle(&mut self) {
        if let Some(rng) = self.rng.as_mut() {
            self.indices.shuffle(rng);
        }
    }

    /// Iterates batches in current order. Every batch holds `batch_size`
    /// samples except possibly the last.
    pub fn iter(&self) -> Batches<'_> {
        Batches { loader: self, pos: 0 }
    }
}

pub struct Batches<'a> {
    loader: &'a DataLoader,
    pos: usize,
}

impl Iterator for Batches<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        let n = self.loader.indices.len();
        if self.pos >= n {
            return None;
        }
        let end = (self.pos + self.loader.batch_size).min(n);
        let (inputs, targets) = self.loader.dataset.gather(&self.loader.indices[self.pos..end]);
        self.pos = end;
        Some(Batch { inputs, targets })
    }
}

/// The three views one unlearning run works with.
#[derive(Debug, Clone)]
pub struct Loaders {
    /// Forget class removed, reshuffled every epoch; drives weight updates.
    pub retain: DataLoader,
    /// Every class in dataset order; post-epoch evaluation only.
    pub full: DataLoader,
    /// Held-out set.
    pub test: DataLoader,
}

/// Builds retain-only, full and test loaders.
///
/// Fails when removing `forget_class` leaves no training samples or the test
/// set is empty, so a run never trains on nothing.
pub fn build_loaders(
    train: Arc<Dataset>,
    test: Arc<Dataset>,
    batch_size: usize,
    forget_class: usize,
    shuffle_seed: u64,
) -> Result<Loaders> {
    if train.dim() != test.dim() {
        return Err(UnlearnError::Data(format!(
            "train dimension {} differs from test dimension {}", train.dim(), test.dim()
        )));
    }
    if test.is_empty() {
        return Err(UnlearnError::Data("test set is empty".into()));
    }
    let retain_indices = train.indices_excluding(forget_class);
    if retain_indices.is_empty() {
        return Err(UnlearnError::EmptyRetainSet { forget_class });
    }

    Ok(Loaders {
        retain: DataLoader::subset(train.clone(), retain_indices, batch_size).shuffled(shuffle_seed),
        full: DataLoader::new(train, batch_size),
        test: DataLoader::new(test, batch_size),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labelled(targets: Vec<usize>) -> Arc<Dataset> {
        let n = targets.len();
        let features = (0..n).map(|i| i as f32).collect();
        Arc::new(Dataset::new(features, 1, targets, 3).unwrap())
    }

    #[test]
    fn last_batch_may_be_short() {
        let loader = DataLoader::new(labelled(vec![0, 1, 2, 0, 1]), 2);
        let sizes: Vec<usize> = loader.iter().map(|b| b.targets.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(loader.num_batches(), 3);
    }

    #[test]
    fn retain_view_excludes_forget_class_and_full_keeps_order() {
        let train = labelled(vec![0, 1, 2, 1, 0, 2]);
        let test = labelled(vec![0, 1]);
        let mut loaders = build_loaders(train, test, 4, 1, 9).unwrap();
        loaders.retain.reshuffle();

        let mut retained: Vec<usize> = loaders.retain.indices().to_vec();
        retained.sort_unstable();
        assert_eq!(retained, vec![0, 2, 4, 5]);
        assert_eq!(loaders.full.indices(), &[0, 1, 2, 3, 4, 5]);
        assert!(loaders.retain.iter().all(|b| !b.targets.contains(&1)));
    }

    #[test]
    fn same_seed_gives_same_epoch_orders() {
        let make = || build_loaders(labelled((0..40).map(|i| i % 3).collect()), labelled(vec![0]), 8, 2, 1111).unwrap();
        let (mut a, mut b) = (make(), make());
        for _ in 0..3 {
            a.retain.reshuffle();
            b.retain.reshuffle();
            assert_eq!(a.retain.indices(), b.retain.indices());
        }
    }

    #[test]
    fn only_forget_class_samples_is_rejected() {
        let res = build_loaders(labelled(vec![2, 2]), labelled(vec![0]), 4, 2, 0);
        assert!(matches!(res, Err(UnlearnError::EmptyRetainSet { forget_class: 2 })));
    }
}
