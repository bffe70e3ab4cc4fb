use std::path::Path;

use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activation::ActivationFunction;
use crate::error::{Result, UnlearnError};
use crate::network::network::Network;

/// Describes one layer in a network specification.
///
/// Fields:
/// - `size`       — number of neurons in this layer
/// - `input_size` — number of neurons feeding into this layer (i.e. the output
///                  size of the previous layer, or the raw input dimension for
///                  the first layer)
/// - `activation` — activation function applied after the linear transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub size: usize,
    pub input_size: usize,
    pub activation: ActivationFunction,
}

/// A serializable description of a classifier architecture.
///
/// `NetworkSpec` is the model construction service: every run builds a fresh
/// `Network` from it. Its `name` is the model name embedded in artifact
/// file names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub name: String,
    /// Ordered list of layer descriptions (input → logits).
    pub layers: Vec<LayerSpec>,
}

impl NetworkSpec {
    /// Multi-layer perceptron: ReLU hidden layers and an identity (logit)
    /// output layer of width `num_classes`.
    pub fn mlp(name: impl Into<String>, input_size: usize, hidden: &[usize], num_classes: usize) -> NetworkSpec {
        let mut layers = Vec::with_capacity(hidden.len() + 1);
        let mut fan_in = input_size;
        for &size in hidden {
            layers.push(LayerSpec { size, input_size: fan_in, activation: ActivationFunction::Relu });
            fan_in = size;
        }
        layers.push(LayerSpec { size: num_classes, input_size: fan_in, activation: ActivationFunction::Identity });
        NetworkSpec { name: name.into(), layers }
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map(|l| l.input_size).unwrap_or(0)
    }

    pub fn num_classes(&self) -> usize {
        self.layers.last().map(|l| l.size).unwrap_or(0)
    }

    /// Checks that layer widths chain and no layer is empty.
    pub fn validate(&self) -> Result<()> {
        if self.layers.is_empty() {
            return Err(UnlearnError::InvalidRequest(format!("network '{}' has no layers", self.name)));
        }
        for (i, pair) in self.layers.windows(2).enumerate() {
            if pair[0].size != pair[1].input_size {
                return Err(UnlearnError::shape(
                    format!("layer {} input_size {}", i + 1, pair[0].size),
                    format!("{}", pair[1].input_size),
                ));
            }
        }
        if let Some(i) = self.layers.iter().position(|l| l.size == 0 || l.input_size == 0) {
            return Err(UnlearnError::InvalidRequest(format!("layer {} of '{}' has zero width", i, self.name)));
        }
        Ok(())
    }

    /// Builds a freshly initialised network. Initial weights depend only on
    /// the spec and the RNG state.
    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Network> {
        self.validate()?;
        Ok(Network::new(self.name.clone(), &self.layers, rng))
    }

    /// Serializes the spec to a pretty-printed JSON file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path).map_err(|e| UnlearnError::io(path, e))?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self).map_err(|e| UnlearnError::json(path, e))
    }

    /// Deserializes a `NetworkSpec` from a JSON file.
    pub fn load_json(path: &Path) -> Result<NetworkSpec> {
        let file = std::fs::File::open(path).map_err(|e| UnlearnError::io(path, e))?;
        let reader = std::io::BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| UnlearnError::json(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn mlp_chains_layer_widths() {
        let spec = NetworkSpec::mlp("mlp", 12, &[8, 4], 3);
        spec.validate().unwrap();
        assert_eq!(spec.input_size(), 12);
        assert_eq!(spec.num_classes(), 3);
        assert_eq!(spec.layers[2].activation, ActivationFunction::Identity);
    }

    #[test]
    fn broken_chain_is_rejected() {
        let mut spec = NetworkSpec::mlp("mlp", 12, &[8], 3);
        spec.layers[1].input_size = 7;
        assert!(spec.build(&mut StdRng::seed_from_u64(0)).is_err());
    }

    #[test]
    fn spec_json_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spec.json");
        let spec = NetworkSpec::mlp("resnet18", 6, &[5], 10);
        spec.save_json(&path).unwrap();
        assert_eq!(NetworkSpec::load_json(&path).unwrap(), spec);
    }
}
