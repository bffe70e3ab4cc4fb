use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::error::{Result, UnlearnError};
use crate::unlearn::request::UnlearningRequest;
use crate::unlearn::runner::{run_unlearning, UnlearnEnv, UnlearningOutcome};
use crate::unlearn::status::{StatusHandle, UnlearningStatus};

/// Start / status / cancel front for background unlearning runs.
///
/// At most one run is in flight per service; status snapshots can be taken
/// from any thread while it runs.
#[derive(Clone)]
pub struct UnlearnService {
    status: StatusHandle,
    env: Arc<UnlearnEnv>,
}

impl UnlearnService {
    pub fn new(env: UnlearnEnv) -> Self {
        UnlearnService { status: StatusHandle::new(), env: Arc::new(env) }
    }

    pub fn status_handle(&self) -> &StatusHandle {
        &self.status
    }

    pub fn status(&self) -> UnlearningStatus {
        self.status.snapshot()
    }

    /// Spawns a run on a background thread. Invalid requests are rejected
    /// here, before anything is spawned.
    pub fn start(&self, request: UnlearningRequest) -> Result<JoinHandle<Result<UnlearningOutcome>>> {
        request.validate(self.env.source.num_classes())?;
        if !self.status.try_claim() {
            return Err(UnlearnError::AlreadyRunning);
        }
        let status = self.status.clone();
        let env = Arc::clone(&self.env);
        Ok(thread::spawn(move || run_unlearning(&request, &status, &env)))
    }

    /// Requests cancellation of the active run. Returns `false` when idle.
    pub fn cancel(&self) -> bool {
        self.status.request_cancel()
    }
}
