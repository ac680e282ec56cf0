//! Device initialization worker
//!
//! The dispatcher only enqueues; each job then runs on its own task so a
//! slow or failing interview never holds up callback processing.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use zigcoord_core::{Eui64, NodeId};

use crate::device::DeviceHandler;

/// One queued `initialize()` call
pub(crate) struct InitJob {
    pub ieee: Eui64,
    pub nwk: NodeId,
    pub handler: Arc<dyn DeviceHandler>,
}

pub(crate) type InitSender = mpsc::UnboundedSender<InitJob>;
pub(crate) type InitReceiver = mpsc::UnboundedReceiver<InitJob>;

pub(crate) fn init_channel() -> (InitSender, InitReceiver) {
    mpsc::unbounded_channel()
}

/// Spawn the worker that drains the init queue
///
/// Aborting the returned handle drops the `JoinSet`, which aborts every
/// interview still in progress.
pub(crate) fn spawn_init_worker(mut jobs: InitReceiver) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut running = JoinSet::new();

        loop {
            tokio::select! {
                job = jobs.recv() => match job {
                    Some(job) => {
                        running.spawn(run_job(job));
                    }
                    None => break,
                },
                Some(finished) = running.join_next(), if !running.is_empty() => {
                    if let Err(e) = finished {
                        if e.is_panic() {
                            warn!("device initialization panicked");
                        }
                    }
                }
            }
        }

        while running.join_next().await.is_some() {}
        debug!("init queue closed");
    })
}

async fn run_job(job: InitJob) {
    debug!(ieee = %job.ieee, nwk = %job.nwk, "initializing device");
    match job.handler.initialize().await {
        Ok(()) => info!(ieee = %job.ieee, nwk = %job.nwk, "device initialized"),
        Err(e) => warn!(ieee = %job.ieee, nwk = %job.nwk, "device initialization failed: {}", e),
    }
}
