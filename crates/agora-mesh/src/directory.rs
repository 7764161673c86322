//! Actor Directory: liveness lookup, lazy start, readiness polling

use crate::error::{MeshError, MeshResult};
use agora_core::host::{ActorHost, ActorStatus};
use agora_core::identifiers::{ActorHandle, ActorIdentity};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Readiness polling parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryConfig {
    /// Fixed backoff between status checks
    pub poll_interval: Duration,
    /// Status checks made before giving up on a cold destination
    pub max_polls: u32,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_polls: 60,
        }
    }
}

#[derive(Clone)]
pub struct ActorDirectory {
    host: Arc<dyn ActorHost>,
    config: DirectoryConfig,
}

impl ActorDirectory {
    pub fn new(host: Arc<dyn ActorHost>, config: DirectoryConfig) -> Self {
        Self { host, config }
    }

    pub fn host(&self) -> &Arc<dyn ActorHost> {
        &self.host
    }

    /// Status of `handle`; a failed lookup counts as `NotFound`
    pub async fn lookup(&self, handle: &ActorHandle) -> ActorStatus {
        match self.host.status(handle).await {
            Ok(status) => status,
            Err(e) => {
                debug!(actor = %handle, error = %e, "Status lookup failed, treating as not found");
                ActorStatus::NotFound
            }
        }
    }

    /// Make sure the actor for `identity` is running, starting it if it is
    /// absent, terminated or failed.
    ///
    /// The start request is fired in the background; this call then polls
    /// until the host reports `Running` or the polling ceiling is reached.
    pub async fn ensure_running(&self, identity: &ActorIdentity) -> MeshResult<ActorHandle> {
        let handle = identity.handle();
        let status = self.lookup(&handle).await;
        if status == ActorStatus::Running {
            return Ok(handle);
        }

        if status.needs_start() {
            info!(actor = %handle, status = %status, "Starting actor");
            self.spawn_start(identity.clone());
        }

        self.wait_until_running(&handle).await?;
        Ok(handle)
    }

    fn spawn_start(&self, identity: ActorIdentity) {
        let host = Arc::clone(&self.host);
        tokio::spawn(async move {
            if let Err(e) = host.start_actor(&identity).await {
                warn!(actor = %identity, error = %e, "Background actor start failed");
            }
        });
    }

    async fn wait_until_running(&self, handle: &ActorHandle) -> MeshResult<()> {
        let mut last_status = ActorStatus::NotFound;
        for poll in 1..=self.config.max_polls {
            last_status = self.lookup(handle).await;
            if last_status == ActorStatus::Running {
                debug!(actor = %handle, polls = poll, "Actor ready");
                return Ok(());
            }
            debug!(actor = %handle, status = %last_status, poll, "Waiting for actor to start");
            tokio::time::sleep(self.config.poll_interval).await;
        }

        warn!(actor = %handle, polls = self.config.max_polls, "Actor never became ready");
        Err(MeshError::NotReady {
            handle: handle.clone(),
            polls: self.config.max_polls,
            last_status,
        })
    }
}
