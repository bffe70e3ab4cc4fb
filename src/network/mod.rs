pub mod network;
pub mod spec;

pub use network::{Mode, Network};
pub use spec::{NetworkSpec, LayerSpec};
