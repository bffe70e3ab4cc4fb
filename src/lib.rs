pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod data;
pub mod device;
pub mod metrics;
pub mod unlearn;
pub mod viz;
pub mod artifacts;
pub mod store;
pub mod config;
pub mod error;

// Convenience re-exports
pub use math::Matrix;
pub use activation::ActivationFunction;
pub use layers::Layer;
pub use network::{Network, NetworkSpec};
pub use loss::CrossEntropyLoss;
pub use optim::{Adam, Optimizer};
pub use data::{BlobsSource, Cifar10Source, DataSource, Dataset};
pub use metrics::EvalMetrics;
pub use unlearn::{run_unlearning, StatusHandle, UnlearnEnv, UnlearnService, UnlearningOutcome, UnlearningRequest, UnlearningStatus};
pub use artifacts::ArtifactStore;
pub use store::DataStore;
pub use config::Settings;
pub use error::{Result, UnlearnError};
