use crate::error::{Result, UnlearnError};
use crate::layers::LayerGrads;
use crate::math::Matrix;
use crate::network::Network;
use crate::optim::Optimizer;

/// First and second moment estimates for one layer.
#[derive(Debug, Clone)]
struct Moments {
    m_w: Matrix,
    v_w: Matrix,
    m_b: Matrix,
    v_b: Matrix,
}

/// Adam with bias-corrected moment estimates.
///
/// Moment buffers are allocated lazily on the first step so one optimizer
/// value can be created before the network it drives.
#[derive(Debug, Clone)]
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub eps: f64,
    t: u64,
    moments: Vec<Moments>,
}

impl Adam {
    /// `beta1 = 0.9`, `beta2 = 0.999`, `eps = 1e-8`.
    pub fn new(learning_rate: f64) -> Adam {
        Adam { learning_rate, beta1: 0.9, beta2: 0.999, eps: 1e-8, t: 0, moments: Vec::new() }
    }

    pub fn steps_taken(&self) -> u64 {
        self.t
    }

    fn update(&self, param: &Matrix, m: &Matrix, v: &Matrix) -> Result<Matrix> {
        let c1 = 1.0 - self.beta1.powi(self.t as i32);
        let c2 = 1.0 - self.beta2.powi(self.t as i32);
        let step = m.zip_map(v, |m, v| {
            let m_hat = m / c1;
            let v_hat = v / c2;
            self.learning_rate * m_hat / (v_hat.sqrt() + self.eps)
        })?;
        param.zip_map(&step, |p, s| p - s)
    }
}

fn next_moments(beta1: f64, beta2: f64, m: &Matrix, v: &Matrix, g: &Matrix) -> Result<(Matrix, Matrix)> {
    let m = m.zip_map(g, |m, g| beta1 * m + (1.0 - beta1) * g)?;
    let v = v.zip_map(g, |v, g| beta2 * v + (1.0 - beta2) * g * g)?;
    Ok((m, v))
}

impl Optimizer for Adam {
    fn step(&mut self, network: &mut Network, grads: &[LayerGrads]) -> Result<()> {
        if grads.len() != network.layers.len() {
            return Err(UnlearnError::shape(
                format!("{} layer gradients", network.layers.len()),
                format!("{}", grads.len()),
            ));
        }
        if self.moments.is_empty() {
            self.moments = network.layers.iter()
                .map(|l| Moments {
                    m_w: Matrix::zeros(l.weights.rows, l.weights.cols),
                    v_w: Matrix::zeros(l.weights.rows, l.weights.cols),
                    m_b: Matrix::zeros(l.biases.rows, l.biases.cols),
                    v_b: Matrix::zeros(l.biases.rows, l.biases.cols),
                })
                .collect();
        }
        self.t += 1;

        for i in 0..grads.len() {
            let (m_w, v_w) = next_moments(self.beta1, self.beta2, &self.moments[i].m_w, &self.moments[i].v_w, &grads[i].weights)?;
            let (m_b, v_b) = next_moments(self.beta1, self.beta2, &self.moments[i].m_b, &self.moments[i].v_b, &grads[i].biases)?;

            let layer = &mut network.layers[i];
            layer.weights = self.update(&layer.weights, &m_w, &v_w)?;
            layer.biases = self.update(&layer.biases, &m_b, &v_b)?;

            self.moments[i] = Moments { m_w, v_w, m_b, v_b };
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NetworkSpec;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn first_step_moves_each_weight_by_learning_rate() {
        let mut net = NetworkSpec::mlp("n", 2, &[], 2).build(&mut StdRng::seed_from_u64(3)).unwrap();
        let before = net.layers[0].weights.clone();
        let grads = vec![LayerGrads {
            weights: Matrix::from_rows(vec![vec![0.5, -2.0], vec![1e-3, 0.0]]).unwrap(),
            biases: Matrix::from_rows(vec![vec![1.0, -1.0]]).unwrap(),
        }];

        let mut adam = Adam::new(0.01);
        adam.step(&mut net, &grads).unwrap();

        // With bias correction the first update is lr * sign(g).
        let after = &net.layers[0].weights;
        assert!((before.data[0][0] - after.data[0][0] - 0.01).abs() < 1e-6);
        assert!((before.data[0][1] - after.data[0][1] + 0.01).abs() < 1e-6);
        assert_eq!(before.data[1][1], after.data[1][1]);
        assert_eq!(adam.steps_taken(), 1);
    }

    #[test]
    fn gradient_count_must_match_layers() {
        let mut net = NetworkSpec::mlp("n", 2, &[3], 2).build(&mut StdRng::seed_from_u64(3)).unwrap();
        let mut adam = Adam::new(0.01);
        assert!(adam.step(&mut net, &[]).is_err());
    }
}
