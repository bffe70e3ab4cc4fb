pub mod epoch_stats;
pub mod request;
pub mod status;
pub mod unlearn_config;
pub mod loop_fn;
pub mod runner;
pub mod service;

pub use epoch_stats::{estimate_remaining, BatchHook, BatchProgress, EpochStats};
pub use request::UnlearningRequest;
pub use status::{StatusHandle, UnlearningStatus};
pub use unlearn_config::UnlearnConfig;
pub use loop_fn::{unlearn_loop, LoopOutcome};
pub use runner::{derive_seeds, prepare, run_unlearning, PreparedRun, RunSeeds, UnlearnEnv, UnlearningOutcome};
pub use service::UnlearnService;
