pub mod dataset;
pub mod loader;
pub mod source;
pub mod cifar;

pub use dataset::Dataset;
pub use loader::{build_loaders, Batch, DataLoader, Loaders};
pub use source::{BlobsSource, DataSource};
pub use cifar::Cifar10Source;
