use std::collections::BTreeMap;
use std::path::PathBuf;

use rand::{rngs::StdRng, SeedableRng};
use tracing::info;

use crate::error::{Result, UnlearnError};
use crate::math::Matrix;
use crate::viz::embedding::{Embedding, EmbeddingService};
use crate::viz::svg::{render_scatter, PlotStyle};

const POWER_ITERATIONS: usize = 100;

/// Linear projection onto the two leading principal directions.
///
/// Directions come from power iteration on the centred data with a start
/// vector drawn from `random_state`, so the output is reproducible. Writes
/// `embedding_all.svg` and `embedding_forget.svg` into `output_dir`.
#[derive(Debug, Clone)]
pub struct PcaProjector {
    pub output_dir: PathBuf,
    pub random_state: u64,
}

impl PcaProjector {
    pub fn new(output_dir: impl Into<PathBuf>, random_state: u64) -> Self {
        PcaProjector { output_dir: output_dir.into(), random_state }
    }

    fn write_svg(&self, name: &str, svg: String) -> Result<PathBuf> {
        let path = self.output_dir.join(name);
        std::fs::write(&path, svg).map_err(|e| UnlearnError::io(&path, e))?;
        Ok(path)
    }
}

impl EmbeddingService for PcaProjector {
    fn compute_embeddings(&self, activations: &Matrix, labels: &[usize], forget_class: usize) -> Result<Embedding> {
        if activations.rows == 0 {
            return Err(UnlearnError::Data("no activations to project".into()));
        }
        if labels.len() != activations.rows {
            return Err(UnlearnError::shape(
                format!("{} labels", activations.rows),
                format!("{}", labels.len()),
            ));
        }

        let points = project_2d(activations, self.random_state)?;

        std::fs::create_dir_all(&self.output_dir).map_err(|e| UnlearnError::io(&self.output_dir, e))?;
        let mut artifacts = BTreeMap::new();
        artifacts.insert(
            "all".to_owned(),
            self.write_svg("embedding_all.svg", render_scatter(&points, labels, forget_class, PlotStyle::ByClass))?,
        );
        artifacts.insert(
            "forget".to_owned(),
            self.write_svg("embedding_forget.svg", render_scatter(&points, labels, forget_class, PlotStyle::ForgetVsRest))?,
        );
        info!(samples = points.len(), dir = %self.output_dir.display(), "wrote embedding plots");

        Ok(Embedding { points, artifacts })
    }
}

/// Centres the rows and projects them onto the top two principal directions.
pub fn project_2d(x: &Matrix, seed: u64) -> Result<Vec<[f64; 2]>> {
    let n = x.rows.max(1) as f64;
    let mean = x.sum_rows().map(|s| s / n);
    let centred = x.add_row(&mean.map(|m| -m))?;

    let mut rng = StdRng::seed_from_u64(seed);
    let first = leading_direction(&centred, &[], &mut rng)?;
    let second = leading_direction(&centred, &[first.clone()], &mut rng)?;

    let basis = Matrix::from_rows(vec![first, second])?.transpose();
    let projected = centred.matmul(&basis)?;
    Ok(projected.data.into_iter().map(|r| [r[0], r[1]]).collect())
}

/// Power iteration for the dominant eigenvector of XᵀX, restricted to the
/// complement of `exclude`. Returns a zero vector for rank-deficient input.
fn leading_direction(x: &Matrix, exclude: &[Vec<f64>], rng: &mut StdRng) -> Result<Vec<f64>> {
    let d = x.cols;
    let mut v: Vec<f64> = (0..d).map(|_| Matrix::sample_standard_normal(rng)).collect();
    orthogonalize(&mut v, exclude);
    if !normalize(&mut v) {
        return Ok(vec![0.0; d]);
    }
    let xt = x.transpose();
    for _ in 0..POWER_ITERATIONS {
        let xv = x.matmul(&Matrix { rows: d, cols: 1, data: v.iter().map(|&e| vec![e]).collect() })?;
        let mut next: Vec<f64> = xt.matmul(&xv)?.data.into_iter().map(|r| r[0]).collect();
        orthogonalize(&mut next, exclude);
        if !normalize(&mut next) {
            return Ok(vec![0.0; d]);
        }
        v = next;
    }
    Ok(v)
}

fn orthogonalize(v: &mut [f64], against: &[Vec<f64>]) {
    for u in against {
        let dot: f64 = v.iter().zip(u).map(|(a, b)| a * b).sum();
        v.iter_mut().zip(u).for_each(|(a, b)| *a -= dot * b);
    }
}

fn normalize(v: &mut [f64]) -> bool {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm < 1e-12 {
        return false;
    }
    v.iter_mut().for_each(|x| *x /= norm);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_dominant_axis() {
        // Variance almost entirely along the second feature.
        let rows: Vec<Vec<f64>> = (0..20)
            .map(|i| vec![0.01 * (i % 2) as f64, i as f64, 0.0])
            .collect();
        let x = Matrix::from_rows(rows).unwrap();
        let points = project_2d(&x, 42).unwrap();

        let spread_first = points.iter().map(|p| p[0].abs()).fold(0.0, f64::max);
        let spread_second = points.iter().map(|p| p[1].abs()).fold(0.0, f64::max);
        assert!(spread_first > 9.0);
        assert!(spread_second < 0.1);
    }

    #[test]
    fn writes_both_plots_and_reports_them_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let projector = PcaProjector::new(dir.path().join("viz"), 42);
        let x = Matrix::from_rows(vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![2.0, 2.0]]).unwrap();

        let emb = projector.compute_embeddings(&x, &[0, 1, 1], 1).unwrap();
        assert_eq!(emb.points.len(), 3);
        assert_eq!(emb.artifacts.keys().collect::<Vec<_>>(), vec!["all", "forget"]);
        for path in emb.artifacts.values() {
            let svg = std::fs::read_to_string(path).unwrap();
            assert!(svg.starts_with("<svg"));
        }
    }

    #[test]
    fn label_count_must_match_rows() {
        let projector = PcaProjector::new(std::env::temp_dir(), 0);
        let x = Matrix::zeros(2, 2);
        assert!(projector.compute_embeddings(&x, &[0], 0).is_err());
    }
}
