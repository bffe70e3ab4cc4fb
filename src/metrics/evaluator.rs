use crate::data::DataLoader;
use crate::error::Result;
use crate::loss::CrossEntropyLoss;
use crate::metrics::accumulator::{accumulate, EvalMetrics};
use crate::network::{Mode, Network};

/// Evaluates `network` in inference mode and restores its previous mode
/// afterwards, whether or not evaluation succeeded.
pub fn evaluate(
    network: &mut Network,
    loader: &DataLoader,
    criterion: &CrossEntropyLoss,
    num_classes: usize,
) -> Result<EvalMetrics> {
    let previous = network.set_mode(Mode::Eval);
    let result = accumulate(network, loader, criterion, num_classes);
    network.set_mode(previous);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::data::Dataset;
    use crate::network::NetworkSpec;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn restores_training_mode_and_leaves_weights_alone() {
        let mut net = NetworkSpec::mlp("n", 2, &[4], 2).build(&mut StdRng::seed_from_u64(5)).unwrap();
        let before = net.layers[0].weights.clone();
        let ds = Arc::new(Dataset::new(vec![0.5, -0.5, 1.0, 2.0], 2, vec![0, 1], 2).unwrap());

        let m = evaluate(&mut net, &DataLoader::new(ds, 1), &CrossEntropyLoss, 2).unwrap();
        assert_eq!(net.mode(), Mode::Train);
        assert_eq!(net.layers[0].weights, before);
        assert!(m.class_accuracies.values().all(|a| (0.0..=100.0).contains(a)));
    }
}
