#![allow(dead_code)]

use std::path::Path;

use forget_nn::device::{CpuProbe, DeviceProbe};
use forget_nn::{BlobsSource, DataSource, Dataset, NetworkSpec, Result, Settings, UnlearnEnv, UnlearningRequest};

/// Blobs presented under the CIFAR-10 name, so artifact names match the
/// real dataset's.
pub struct NamedBlobs {
    pub name: &'static str,
    pub blobs: BlobsSource,
}

impl DataSource for NamedBlobs {
    fn name(&self) -> &str {
        self.name
    }

    fn num_classes(&self) -> usize {
        self.blobs.num_classes
    }

    fn load(&self) -> Result<(Dataset, Dataset)> {
        self.blobs.load()
    }
}

pub const DIM: usize = 8;

pub fn blobs() -> BlobsSource {
    BlobsSource { dim: DIM, num_classes: 10, train_per_class: 30, test_per_class: 5, ..BlobsSource::default() }
}

pub fn settings(root: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.paths.model_dir = root.join("unlearned_models");
    settings.paths.data_dir = root.join("data");
    settings.visualization.output_dir = root.join("viz");
    settings
}

pub fn env(root: &Path) -> UnlearnEnv {
    let source = NamedBlobs { name: "CIFAR10", blobs: blobs() };
    let probes: Vec<Box<dyn DeviceProbe>> = vec![Box::new(CpuProbe)];
    UnlearnEnv::new(settings(root), NetworkSpec::mlp("resnet18", DIM, &[16], 10), Box::new(source))
        .with_probes(probes)
}

pub fn request(epochs: usize, batch_size: usize) -> UnlearningRequest {
    UnlearningRequest { forget_class: 3, epochs, batch_size, learning_rate: 0.01, seed: 1111 }
}
