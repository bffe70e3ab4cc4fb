pub mod activations;
pub mod embedding;
pub mod pca;
pub mod svg;

pub use activations::extract_activations;
pub use embedding::{Embedding, EmbeddingService};
pub use pca::PcaProjector;
