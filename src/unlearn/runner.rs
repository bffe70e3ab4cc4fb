use std::path::PathBuf;
use std::sync::{mpsc, Arc};

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::artifacts::ArtifactStore;
use crate::config::Settings;
use crate::data::{build_loaders, DataLoader, DataSource, Loaders};
use crate::device::{default_probes, select_device, ComputeDevice, DeviceProbe};
use crate::error::{Result, UnlearnError};
use crate::loss::CrossEntropyLoss;
use crate::network::{Network, NetworkSpec};
use crate::optim::Adam;
use crate::unlearn::epoch_stats::{BatchHook, EpochStats};
use crate::unlearn::loop_fn::{unlearn_loop, LoopOutcome};
use crate::unlearn::request::UnlearningRequest;
use crate::unlearn::status::StatusHandle;
use crate::unlearn::unlearn_config::UnlearnConfig;
use crate::viz::activations::penultimate_depth;
use crate::viz::{extract_activations, EmbeddingService, PcaProjector};

/// Collaborators a run needs besides its request.
pub struct UnlearnEnv {
    pub settings: Settings,
    pub network_spec: NetworkSpec,
    pub source: Box<dyn DataSource>,
    pub embeddings: Box<dyn EmbeddingService>,
    pub probes: Vec<Box<dyn DeviceProbe>>,
    pub progress_tx: Option<mpsc::Sender<EpochStats>>,
    pub batch_hook: Option<BatchHook>,
}

impl UnlearnEnv {
    /// Default collaborators: PCA plots in `settings.visualization.output_dir`
    /// and the standard device probe order.
    pub fn new(settings: Settings, network_spec: NetworkSpec, source: Box<dyn DataSource>) -> Self {
        let embeddings = Box::new(PcaProjector::new(
            settings.visualization.output_dir.clone(),
            settings.visualization.random_state,
        ));
        UnlearnEnv {
            settings,
            network_spec,
            source,
            embeddings,
            probes: default_probes(),
            progress_tx: None,
            batch_hook: None,
        }
    }

    pub fn with_embeddings(mut self, embeddings: Box<dyn EmbeddingService>) -> Self {
        self.embeddings = embeddings;
        self
    }

    pub fn with_probes(mut self, probes: Vec<Box<dyn DeviceProbe>>) -> Self {
        self.probes = probes;
        self
    }

    pub fn with_progress(mut self, tx: mpsc::Sender<EpochStats>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn with_batch_hook(mut self, hook: BatchHook) -> Self {
        self.batch_hook = Some(hook);
        self
    }

    pub fn artifact_store(&self) -> ArtifactStore {
        ArtifactStore::new(self.settings.paths.model_dir.clone())
    }
}

/// Independent seeds for the random streams of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSeeds {
    pub init: u64,
    pub shuffle: u64,
    pub subset: u64,
}

/// Expands the request seed into one seed per random stream.
pub fn derive_seeds(seed: u64) -> RunSeeds {
    let mut rng = StdRng::seed_from_u64(seed);
    RunSeeds { init: rng.gen(), shuffle: rng.gen(), subset: rng.gen() }
}

/// Everything built before the first epoch.
pub struct PreparedRun {
    pub network: Network,
    pub loaders: Loaders,
    pub device: ComputeDevice,
    pub seeds: RunSeeds,
}

/// Validates the request, picks the device, loads the data and builds the
/// freshly initialised network. Two calls with equal requests produce equal
/// weights and equal retain orderings.
pub fn prepare(request: &UnlearningRequest, env: &UnlearnEnv) -> Result<PreparedRun> {
    let num_classes = env.source.num_classes();
    request.validate(num_classes)?;
    if env.network_spec.num_classes() != num_classes {
        return Err(UnlearnError::InvalidRequest(format!(
            "network '{}' has {} outputs but {} has {} classes",
            env.network_spec.name, env.network_spec.num_classes(), env.source.name(), num_classes
        )));
    }
    let seeds = derive_seeds(request.seed);

    let device = select_device(&env.probes);
    info!("using device {}", device);

    let (train, test) = env.source.load()?;
    if train.dim() != env.network_spec.input_size() {
        return Err(UnlearnError::Data(format!(
            "{} samples have {} features, network '{}' expects {}",
            env.source.name(), train.dim(), env.network_spec.name, env.network_spec.input_size()
        )));
    }
    info!("loaded {}: {} train / {} test samples", env.source.name(), train.len(), test.len());
    let loaders = build_loaders(
        Arc::new(train),
        Arc::new(test),
        request.batch_size,
        request.forget_class,
        seeds.shuffle,
    )?;

    let network = env.network_spec.build(&mut StdRng::seed_from_u64(seeds.init))?;
    Ok(PreparedRun { network, loaders, device, seeds })
}

/// Result of a whole run.
#[derive(Debug, Clone, PartialEq)]
pub enum UnlearningOutcome {
    Completed { model_path: PathBuf, epochs: usize, svg_files: Vec<PathBuf> },
    Cancelled { epochs_completed: usize },
}

/// Clears the running and cancel flags however the run ends.
struct RunGuard<'a>(&'a StatusHandle);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.finish();
    }
}

/// Unlearns `request.forget_class` by fine-tuning a fresh network on every
/// other class, then renders embedding plots of the result.
///
/// `status` is reset when the run starts and its running/cancel flags are
/// cleared on every exit path, including errors and panics.
pub fn run_unlearning(request: &UnlearningRequest, status: &StatusHandle, env: &UnlearnEnv) -> Result<UnlearningOutcome> {
    let _guard = RunGuard(status);
    info!(
        "starting unlearning of class {} ({} epochs, batch {}, lr {}, seed {})",
        request.forget_class, request.epochs, request.batch_size, request.learning_rate, request.seed
    );

    let PreparedRun { mut network, mut loaders, device, seeds } = prepare(request, env)?;
    status.begin(request.forget_class, request.epochs, device);

    let mut optimizer = Adam::new(request.learning_rate);
    let config = UnlearnConfig {
        yield_every: env.settings.training.yield_every,
        progress_tx: env.progress_tx.clone(),
        batch_hook: env.batch_hook.clone(),
        ..UnlearnConfig::new(
            request.epochs,
            env.source.num_classes(),
            network.name.clone(),
            request.dataset_description(env.source.name()),
            request.learning_rate,
        )
    };

    let outcome = unlearn_loop(
        &mut network,
        &mut loaders,
        &CrossEntropyLoss,
        &mut optimizer,
        status,
        &env.artifact_store(),
        &config,
    );

    match outcome {
        Ok(LoopOutcome::Cancelled { epochs_completed }) => {
            info!("unlearning cancelled after {} epoch(s)", epochs_completed);
            Ok(UnlearningOutcome::Cancelled { epochs_completed })
        }
        Ok(LoopOutcome::Completed { model_path, epochs }) => {
            let svg_files = if status.is_cancel_requested() {
                info!("cancellation requested after the last epoch, skipping visualization");
                Vec::new()
            } else if env.settings.visualization.sample_size == 0 {
                debug!("visualization sample size is 0, skipping visualization");
                Vec::new()
            } else {
                visualize(&network, &loaders, request.forget_class, seeds.subset, status, env)?
            };
            info!("unlearning finished, model at {}", model_path.display());
            Ok(UnlearningOutcome::Completed { model_path, epochs, svg_files })
        }
        Err(e) => {
            warn!("unlearning failed: {}", e);
            Err(e)
        }
    }
}

/// Projects penultimate-layer activations of a random training subset and
/// stores the points and plot paths (ordered by artifact name) in `status`.
fn visualize(
    network: &Network,
    loaders: &Loaders,
    forget_class: usize,
    subset_seed: u64,
    status: &StatusHandle,
    env: &UnlearnEnv,
) -> Result<Vec<PathBuf>> {
    let vis = &env.settings.visualization;
    let full = loaders.full.dataset().clone();

    let mut indices: Vec<usize> = (0..full.len()).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(subset_seed));
    indices.truncate(vis.sample_size);
    let labels: Vec<usize> = indices.iter().map(|&i| full.targets()[i]).collect();

    let subset = DataLoader::subset(full, indices, vis.batch_size.max(1));
    let activations = extract_activations(network, &subset, penultimate_depth(network))?;
    let embedding = env.embeddings.compute_embeddings(&activations, &labels, forget_class)?;

    let svg_files: Vec<PathBuf> = embedding.artifacts.into_values().collect();
    status.set_visualization(embedding.points, svg_files.clone());
    Ok(svg_files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_are_reproducible_and_distinct() {
        let a = derive_seeds(1111);
        assert_eq!(a, derive_seeds(1111));
        assert_ne!(a, derive_seeds(1112));
        assert_ne!(a.init, a.shuffle);
        assert_ne!(a.shuffle, a.subset);
    }
}
