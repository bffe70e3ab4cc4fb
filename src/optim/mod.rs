pub mod adam;

pub use adam::Adam;

use crate::error::Result;
use crate::layers::LayerGrads;
use crate::network::Network;

/// Applies one parameter update from per-layer gradients.
pub trait Optimizer {
    fn step(&mut self, network: &mut Network, grads: &[LayerGrads]) -> Result<()>;
}
