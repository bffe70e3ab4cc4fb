use std::path::Path;

use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::error::{Result, UnlearnError};
use crate::layers::{Layer, LayerGrads};
use crate::math::Matrix;
use crate::network::spec::LayerSpec;

/// Whether forward passes record state for backpropagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Train,
    Eval,
}

/// Feed-forward classifier producing one logit per class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub name: String,
    pub layers: Vec<Layer>,
    #[serde(skip)]
    mode: Mode,
}

impl Network {
    pub(crate) fn new<R: Rng + ?Sized>(name: String, specs: &[LayerSpec], rng: &mut R) -> Network {
        let layers = specs.iter()
            .map(|s| Layer::new(s.size, s.input_size, s.activation, rng))
            .collect();
        Network { name, layers, mode: Mode::Train }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switches mode and returns the previous one. Entering `Eval` drops any
    /// cached forward state.
    pub fn set_mode(&mut self, mode: Mode) -> Mode {
        if mode == Mode::Eval {
            self.layers.iter_mut().for_each(Layer::clear_cache);
        }
        std::mem::replace(&mut self.mode, mode)
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map(Layer::input_size).unwrap_or(0)
    }

    pub fn num_classes(&self) -> usize {
        self.layers.last().map(|l| l.size).unwrap_or(0)
    }

    pub fn parameter_count(&self) -> usize {
        self.layers.iter()
            .map(|l| l.weights.rows * l.weights.cols + l.biases.cols)
            .sum()
    }

    /// Forward pass. In `Train` mode every layer caches what `backward` needs.
    pub fn forward(&mut self, input: &Matrix) -> Result<Matrix> {
        match self.mode {
            Mode::Eval => self.infer(input),
            Mode::Train => {
                self.check_input(input)?;
                let mut current = input.clone();
                for layer in &mut self.layers {
                    current = layer.feed_from(current)?;
                }
                Ok(current)
            }
        }
    }

    /// Logits for a batch, without mutating anything.
    pub fn infer(&self, input: &Matrix) -> Result<Matrix> {
        self.hidden(input, self.layers.len())
    }

    /// Output of the first `depth` layers (`depth == layers.len()` gives
    /// the logits). Used for representation extraction.
    pub fn hidden(&self, input: &Matrix, depth: usize) -> Result<Matrix> {
        if depth == 0 || depth > self.layers.len() {
            return Err(UnlearnError::InvalidRequest(format!(
                "layer depth {} outside 1..={}", depth, self.layers.len()
            )));
        }
        self.check_input(input)?;
        let mut current = self.layers[0].infer(input)?;
        for layer in &self.layers[1..depth] {
            current = layer.infer(&current)?;
        }
        Ok(current)
    }

    /// Backpropagates ∂L/∂logits through the cached forward pass.
    /// Returns gradients in layer order.
    pub fn backward(&mut self, grad_logits: &Matrix) -> Result<Vec<LayerGrads>> {
        let mut grads = Vec::with_capacity(self.layers.len());
        let mut delta = grad_logits.clone();
        for (i, layer) in self.layers.iter_mut().enumerate().rev() {
            let (g, grad_input) = layer.backward(i, &delta)?;
            grads.push(g);
            delta = grad_input;
        }
        grads.reverse();
        Ok(grads)
    }

    fn check_input(&self, input: &Matrix) -> Result<()> {
        if input.cols != self.input_size() {
            return Err(UnlearnError::shape(
                format!("batch with {} features", self.input_size()),
                input.shape_str(),
            ));
        }
        Ok(())
    }

    /// Serializes the network weights to a pretty-printed JSON file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path).map_err(|e| UnlearnError::io(path, e))?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self).map_err(|e| UnlearnError::json(path, e))
    }

    /// Deserializes a network from a JSON file previously written by `save_json`.
    pub fn load_json(path: &Path) -> Result<Network> {
        let file = std::fs::File::open(path).map_err(|e| UnlearnError::io(path, e))?;
        let reader = std::io::BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| UnlearnError::json(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NetworkSpec;
    use rand::{rngs::StdRng, SeedableRng};

    fn tiny() -> Network {
        NetworkSpec::mlp("tiny", 3, &[4], 2).build(&mut StdRng::seed_from_u64(11)).unwrap()
    }

    #[test]
    fn eval_mode_forward_leaves_no_cache() {
        let mut net = tiny();
        let x = Matrix::from_rows(vec![vec![0.1, 0.2, 0.3]]).unwrap();
        assert_eq!(net.set_mode(Mode::Eval), Mode::Train);
        let logits = net.forward(&x).unwrap();
        assert_eq!(logits.cols, 2);
        assert!(matches!(net.backward(&logits), Err(UnlearnError::NoForwardCache { layer: 1 })));
    }

    #[test]
    fn train_forward_then_backward_yields_parameter_shaped_grads() {
        let mut net = tiny();
        let x = Matrix::from_rows(vec![vec![0.1, 0.2, 0.3], vec![1.0, 0.0, -1.0]]).unwrap();
        let logits = net.forward(&x).unwrap();
        let grads = net.backward(&logits).unwrap();
        assert_eq!(grads.len(), 2);
        assert_eq!(grads[0].weights.shape_str(), "3x4");
        assert_eq!(grads[1].biases.shape_str(), "1x2");
    }

    #[test]
    fn hidden_returns_penultimate_width() {
        let net = tiny();
        let x = Matrix::from_rows(vec![vec![0.0, 1.0, 2.0]]).unwrap();
        assert_eq!(net.hidden(&x, 1).unwrap().cols, 4);
        assert!(net.hidden(&x, 3).is_err());
    }

    #[test]
    fn wrong_feature_count_is_a_shape_error() {
        let net = tiny();
        let x = Matrix::zeros(1, 5);
        assert!(matches!(net.infer(&x), Err(UnlearnError::ShapeMismatch { .. })));
    }

    #[test]
    fn saved_network_reloads_with_identical_weights() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.json");
        let net = tiny();
        net.save_json(&path).unwrap();
        let back = Network::load_json(&path).unwrap();
        assert_eq!(back.layers[0].weights, net.layers[0].weights);
        assert_eq!(back.name, "tiny");
    }
}
