use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::{activation::ActivationFunction, error::{Result, UnlearnError}, math::Matrix};

/// Gradients of one dense layer, shaped like its parameters.
#[derive(Debug, Clone)]
pub struct LayerGrads {
    pub weights: Matrix,
    pub biases: Matrix,
}

/// State captured by a training-mode forward pass for the backward pass.
#[derive(Debug, Clone)]
struct ForwardCache {
    input: Matrix,
    pre_activation: Matrix,
}

/// Fully connected layer: `a = σ(x·W + b)` over a batch of row vectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub size: usize,
    /// Shape (input_size, size).
    pub weights: Matrix,
    /// Shape (1, size).
    pub biases: Matrix,
    pub activator: ActivationFunction,
    #[serde(skip)]
    cache: Option<ForwardCache>,
}

impl Layer {
    /// He-initialised weights, zero biases.
    pub fn new<R: Rng + ?Sized>(
        size: usize,
        input_size: usize,
        activation: ActivationFunction,
        rng: &mut R,
    ) -> Layer {
        Layer {
            size,
            weights: Matrix::he(input_size, size, rng),
            biases: Matrix::zeros(1, size),
            activator: activation,
            cache: None,
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.rows
    }

    /// Forward pass without touching cached state.
    pub fn infer(&self, input: &Matrix) -> Result<Matrix> {
        let z = input.matmul(&self.weights)?.add_row(&self.biases)?;
        Ok(z.map(|x| self.activator.function(x)))
    }

    /// Forward pass that keeps input and pre-activation for `backward`.
    pub fn feed_from(&mut self, input: Matrix) -> Result<Matrix> {
        let z = input.matmul(&self.weights)?.add_row(&self.biases)?;
        let a = z.map(|x| self.activator.function(x));
        self.cache = Some(ForwardCache { input, pre_activation: z });
        Ok(a)
    }

    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    pub fn clear_cache(&mut self) {
        self.cache = None;
    }

    /// Consumes the cached forward state.
    ///
    /// `grad_output` is ∂L/∂a for this layer. Returns the parameter gradients
    /// and ∂L/∂x for the layer below.
    pub fn backward(&mut self, index: usize, grad_output: &Matrix) -> Result<(LayerGrads, Matrix)> {
        let cache = self.cache.take().ok_or(UnlearnError::NoForwardCache { layer: index })?;

        // δ = ∂L/∂a ⊙ σ'(z)
        let act_derivative = cache.pre_activation.map(|x| self.activator.derivative(x));
        let delta = grad_output.hadamard(&act_derivative)?;

        let weights = cache.input.transpose().matmul(&delta)?;
        let biases = delta.sum_rows();
        let grad_input = delta.matmul(&self.weights.transpose())?;

        Ok((LayerGrads { weights, biases }, grad_input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn identity_layer() -> Layer {
        let mut layer = Layer::new(2, 2, ActivationFunction::Identity, &mut StdRng::seed_from_u64(1));
        layer.weights = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        layer.biases = Matrix::from_rows(vec![vec![0.5, -0.5]]).unwrap();
        layer
    }

    #[test]
    fn infer_does_not_cache() {
        let layer = identity_layer();
        let x = Matrix::from_rows(vec![vec![1.0, 1.0]]).unwrap();
        let out = layer.infer(&x).unwrap();
        assert_eq!(out.data, vec![vec![4.5, 5.5]]);
        assert!(!layer.has_cache());
    }

    #[test]
    fn backward_matches_hand_computed_gradients() {
        let mut layer = identity_layer();
        let x = Matrix::from_rows(vec![vec![1.0, 2.0], vec![0.0, 1.0]]).unwrap();
        layer.feed_from(x).unwrap();

        let grad_out = Matrix::from_rows(vec![vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        let (grads, grad_in) = layer.backward(0, &grad_out).unwrap();

        assert_eq!(grads.weights.data, vec![vec![1.0, 0.0], vec![2.0, 1.0]]);
        assert_eq!(grads.biases.data, vec![vec![1.0, 1.0]]);
        assert_eq!(grad_in.data, vec![vec![1.0, 3.0], vec![2.0, 4.0]]);
        assert!(!layer.has_cache());
    }

    #[test]
    fn backward_without_forward_fails() {
        let mut layer = identity_layer();
        let g = Matrix::zeros(1, 2);
        assert!(matches!(layer.backward(3, &g), Err(UnlearnError::NoForwardCache { layer: 3 })));
    }

    #[test]
    fn relu_masks_gradient_of_inactive_units() {
        let mut layer = identity_layer();
        layer.activator = ActivationFunction::Relu;
        layer.biases = Matrix::from_rows(vec![vec![-10.0, 0.0]]).unwrap();
        layer.feed_from(Matrix::from_rows(vec![vec![1.0, 1.0]]).unwrap()).unwrap();
        let (grads, _) = layer.backward(0, &Matrix::from_rows(vec![vec![1.0, 1.0]]).unwrap()).unwrap();
        assert_eq!(grads.biases.data, vec![vec![0.0, 1.0]]);
    }
}
