use crate::data::DataLoader;
use crate::error::Result;
use crate::math::Matrix;
use crate::network::Network;

/// Output of the first `depth` layers for every sample of `loader`, one row
/// per sample in loader order.
pub fn extract_activations(network: &Network, loader: &DataLoader, depth: usize) -> Result<Matrix> {
    let mut out = Matrix::default();
    for batch in loader.iter() {
        out.append_rows(network.hidden(&batch.inputs, depth)?)?;
    }
    Ok(out)
}

/// Depth of the penultimate layer (the logits for single-layer networks).
pub fn penultimate_depth(network: &Network) -> usize {
    network.layers.len().saturating_sub(1).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::data::Dataset;
    use crate::network::NetworkSpec;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn one_row_per_sample_at_requested_depth() {
        let net = NetworkSpec::mlp("n", 2, &[5, 3], 4).build(&mut StdRng::seed_from_u64(2)).unwrap();
        let ds = Arc::new(Dataset::new(vec![0.0; 14], 2, vec![0, 1, 2, 3, 0, 1, 2], 4).unwrap());
        let loader = DataLoader::new(ds, 3);

        let depth = penultimate_depth(&net);
        assert_eq!(depth, 2);
        let acts = extract_activations(&net, &loader, depth).unwrap();
        assert_eq!(acts.shape_str(), "7x3");
    }
}
