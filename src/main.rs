//! Command-line front end: run unlearning, browse model artifacts and the
//! per-class JSON data store.

use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use forget_nn::data::cifar::CIFAR10_CLASSES;
use forget_nn::{
    ArtifactStore, BlobsSource, Cifar10Source, DataSource, DataStore, NetworkSpec, Settings,
    UnlearnEnv, UnlearnService, UnlearningOutcome,
};

#[derive(Parser)]
#[command(name = "forget-nn")]
#[command(about = "Retrain a classifier to forget one class")]
#[command(version)]
struct Cli {
    /// Settings file; created with defaults if missing
    #[arg(long, default_value = "forget-nn.json")]
    config: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum DatasetKind {
    Cifar10,
    Blobs,
}

#[derive(Subcommand)]
enum Commands {
    /// Retrain on every class except one
    Unlearn {
        #[arg(long, default_value_t = 0)]
        forget_class: usize,
        #[arg(long)]
        epochs: Option<usize>,
        #[arg(long)]
        batch_size: Option<usize>,
        #[arg(long)]
        learning_rate: Option<f64>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, value_enum, default_value_t = DatasetKind::Cifar10)]
        dataset: DatasetKind,
        /// Network description (JSON); an MLP is built when omitted
        #[arg(long)]
        model_spec: Option<PathBuf>,
        /// Hidden layer widths of the default MLP
        #[arg(long, value_delimiter = ',', default_value = "256,128")]
        hidden: Vec<usize>,
    },
    /// Unlearned model artifacts
    Models {
        #[command(subcommand)]
        action: ModelAction,
    },
    /// Per-class JSON documents
    Data {
        #[command(subcommand)]
        action: DataAction,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    List,
    /// Print the path of one artifact
    Path { filename: String },
}

#[derive(Subcommand)]
enum DataAction {
    List { class: String },
    Get { class: String, name: String },
    All { class: String },
    Delete { class: String, name: String },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let settings = Settings::load_or_init(&cli.config)
        .with_context(|| format!("failed to load settings from {}", cli.config.display()))?;

    match cli.command {
        Commands::Unlearn { forget_class, epochs, batch_size, learning_rate, seed, dataset, model_spec, hidden } => {
            let mut request = settings.request(forget_class);
            if let Some(e) = epochs { request.epochs = e; }
            if let Some(b) = batch_size { request.batch_size = b; }
            if let Some(lr) = learning_rate { request.learning_rate = lr; }
            if let Some(s) = seed { request.seed = s; }

            let source: Box<dyn DataSource> = match dataset {
                DatasetKind::Cifar10 => Box::new(Cifar10Source::new(settings.paths.cifar_dir.clone())),
                DatasetKind::Blobs => Box::new(BlobsSource { num_classes: settings.num_classes, ..BlobsSource::default() }),
            };
            let spec = match model_spec {
                Some(path) => NetworkSpec::load_json(&path)
                    .with_context(|| format!("failed to load network spec {}", path.display()))?,
                None => {
                    let input = match dataset {
                        DatasetKind::Cifar10 => 3 * 32 * 32,
                        DatasetKind::Blobs => BlobsSource::default().dim,
                    };
                    let classes = match dataset {
                        DatasetKind::Cifar10 => CIFAR10_CLASSES,
                        DatasetKind::Blobs => settings.num_classes,
                    };
                    NetworkSpec::mlp("mlp", input, &hidden, classes)
                }
            };

            let (tx, rx) = mpsc::channel();
            let service = UnlearnService::new(UnlearnEnv::new(settings, spec, source).with_progress(tx));
            let handle = service.start(request).context("failed to start unlearning")?;

            let interrupted = service.clone();
            ctrlc::set_handler(move || {
                eprintln!("\nInterrupted, stopping after the current batch...");
                interrupted.cancel();
            })
            .context("failed to set Ctrl-C handler")?;

            loop {
                match rx.recv_timeout(Duration::from_millis(500)) {
                    Ok(stats) => println!(
                        "[{:>5.1}%] epoch {}/{}  train loss {:.4} acc {:.2}%  test loss {:.4} acc {:.2}%  eta {:.0}s",
                        stats.progress, stats.epoch, stats.total_epochs,
                        stats.train.loss, stats.train.accuracy,
                        stats.test.loss, stats.test.accuracy, stats.eta_secs,
                    ),
                    Err(RecvTimeoutError::Timeout) if !handle.is_finished() => {}
                    Err(_) => break,
                }
            }

            let outcome = handle.join().map_err(|_| anyhow!("unlearning thread panicked"))??;
            match outcome {
                UnlearningOutcome::Completed { model_path, epochs, svg_files } => {
                    println!("finished {} epochs, model saved to {}", epochs, model_path.display());
                    for svg in svg_files {
                        println!("plot: {}", svg.display());
                    }
                }
                UnlearningOutcome::Cancelled { epochs_completed } => {
                    println!("cancelled after {} epochs", epochs_completed);
                }
            }
        }
        Commands::Models { action } => {
            let store = ArtifactStore::new(settings.paths.model_dir.clone());
            match action {
                ModelAction::List => {
                    for name in store.list()? {
                        println!("{}", name);
                    }
                }
                ModelAction::Path { filename } => println!("{}", store.resolve(&filename)?.display()),
            }
        }
        Commands::Data { action } => {
            let store = DataStore::new(settings.paths.data_dir.clone());
            match action {
                DataAction::List { class } => {
                    for name in store.list(&class)? {
                        println!("{}", name);
                    }
                }
                DataAction::Get { class, name } => {
                    println!("{}", serde_json::to_string_pretty(&store.read(&class, &name)?)?);
                }
                DataAction::All { class } => {
                    let all: Vec<serde_json::Value> = store.read_all(&class)?
                        .into_iter()
                        .map(|(name, data)| serde_json::json!({ "name": name, "data": data }))
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&all)?);
                }
                DataAction::Delete { class, name } => {
                    store.delete(&class, &name)?;
                    println!("deleted {}/{}", class, name);
                }
            }
        }
    }
    Ok(())
}
