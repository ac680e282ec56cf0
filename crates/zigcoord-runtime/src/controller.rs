//! Coordinator controller - the public surface
//!
//! Owns the NCP handle, the device registry, the pending request table and
//! the listener bus. Registry and table share one lock which is never held
//! across an `.await`; the dispatcher task is the only consumer of the NCP
//! callback stream.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use zigcoord_core::{
    ApsFrame, CoordError, CoordResult, Eui64, NodeId, OutgoingMessageType, Tsn,
};
use zigcoord_ncp::{CallbackReceiver, Codecs, Ncp, NcpCallback};

use crate::config::{ControllerConfig, MAX_PERMIT_SECONDS};
use crate::device::{Device, DeviceFactory};
use crate::dispatch::{self, Dispatcher};
use crate::init::{init_channel, spawn_init_worker, InitJob, InitReceiver, InitSender};
use crate::listener::{Listener, ListenerBus, ListenerId};
use crate::pending::PendingTable;
use crate::registry::DeviceRegistry;
use crate::sequence::SequenceAllocator;
use crate::startup::{NetworkSession, StartupSequencer};
use crate::store::{DeviceStore, StoreListener};

/// State mutated by both the dispatcher and the request API
#[derive(Debug, Default)]
pub(crate) struct CoordinatorState {
    pub registry: DeviceRegistry,
    pub pending: PendingTable,
    pub sequence: SequenceAllocator,
}

pub(crate) struct Shared {
    pub ncp: Arc<dyn Ncp>,
    pub codecs: Codecs,
    pub factory: Arc<dyn DeviceFactory>,
    pub config: ControllerConfig,
    pub state: Mutex<CoordinatorState>,
    pub listeners: ListenerBus,
    session: RwLock<Option<NetworkSession>>,
    started: AtomicBool,
    init_tx: Mutex<InitSender>,
    init_rx: Mutex<Option<InitReceiver>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Shared {
    pub(crate) fn enqueue_init(&self, job: InitJob) {
        let ieee = job.ieee;
        if self.init_tx.lock().send(job).is_err() {
            warn!("init queue closed, not initializing {}", ieee);
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().drain(..) {
            task.abort();
        }
    }
}

/// Non-owning controller handle, given to device handlers
#[derive(Clone)]
pub struct WeakController(Weak<Shared>);

impl WeakController {
    pub(crate) fn new(shared: &Arc<Shared>) -> Self {
        WeakController(Arc::downgrade(shared))
    }

    pub fn upgrade(&self) -> Option<Controller> {
        self.0.upgrade().map(|shared| Controller { shared })
    }
}

/// Removes a still-pending entry if the requesting future is dropped
struct PendingGuard<'a> {
    state: &'a Mutex<CoordinatorState>,
    tsn: Tsn,
    generation: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.state.lock().pending.forget(self.tsn, self.generation) {
            debug!("request TSN={} dropped while pending", self.tsn);
        }
    }
}

/// Coordinator controller
#[derive(Clone)]
pub struct Controller {
    shared: Arc<Shared>,
}

impl Controller {
    /// Device handlers are created through `factory` with the registry
    /// locked, so `DeviceFactory::create` must not call back into the
    /// controller.
    pub fn new(
        ncp: Arc<dyn Ncp>,
        codecs: Codecs,
        factory: Arc<dyn DeviceFactory>,
        config: ControllerConfig,
    ) -> Self {
        let (init_tx, init_rx) = init_channel();
        Controller {
            shared: Arc::new(Shared {
                ncp,
                codecs,
                factory,
                config,
                state: Mutex::new(CoordinatorState::default()),
                listeners: ListenerBus::new(),
                session: RwLock::new(None),
                started: AtomicBool::new(false),
                init_tx: Mutex::new(init_tx),
                init_rx: Mutex::new(Some(init_rx)),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.shared.config
    }

    pub fn downgrade(&self) -> WeakController {
        WeakController::new(&self.shared)
    }

    // ------------------------------------------------------------------
    // Bring-up
    // ------------------------------------------------------------------

    /// Reload persisted devices and keep `store` current from now on
    ///
    /// Must happen before `startup`. Returns the number of devices loaded.
    pub fn attach_store(&self, store: Arc<dyn DeviceStore>) -> CoordResult<usize> {
        if self.shared.started.load(Ordering::Acquire) {
            return Err(CoordError::AlreadyStarted);
        }

        let records = store.load()?;
        for record in &records {
            self.add_device(record.ieee, record.nwk);
        }
        info!(devices = records.len(), "device registry reloaded");

        self.shared.listeners.add(Arc::new(StoreListener::new(store)));
        Ok(records.len())
    }

    /// Run the startup sequence and start processing NCP callbacks
    pub async fn startup(&self) -> CoordResult<NetworkSession> {
        if self
            .shared
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CoordError::AlreadyStarted);
        }

        let mut sequencer = StartupSequencer::new(&*self.shared.ncp, &self.shared.config.startup);
        let session = match sequencer.run().await {
            Ok(session) => session,
            Err(e) => {
                error!(stage = %sequencer.stage(), "startup failed: {}", e);
                self.shared.started.store(false, Ordering::Release);
                return Err(e);
            }
        };

        *self.shared.session.write() = Some(session);
        self.arm(self.shared.ncp.subscribe());
        Ok(session)
    }

    fn arm(&self, callbacks: CallbackReceiver) {
        let jobs = match self.shared.init_rx.lock().take() {
            Some(rx) => rx,
            None => {
                // Restart after shutdown: the previous queue went with its worker
                let (tx, rx) = init_channel();
                *self.shared.init_tx.lock() = tx;
                rx
            }
        };

        let mut tasks = self.shared.tasks.lock();
        tasks.push(spawn_init_worker(jobs));
        tasks.push(tokio::spawn(dispatch::run(
            Arc::downgrade(&self.shared),
            callbacks,
        )));
    }

    /// Stop the dispatcher and init worker and fail every pending request
    pub fn shutdown(&self) {
        for task in self.shared.tasks.lock().drain(..) {
            task.abort();
        }
        *self.shared.session.write() = None;
        let abandoned = self.shared.state.lock().pending.abandon_all(CoordError::Shutdown);
        self.shared.started.store(false, Ordering::Release);
        info!(abandoned, "controller shut down");
    }

    pub fn session(&self) -> Option<NetworkSession> {
        *self.shared.session.read()
    }

    pub fn is_ready(&self) -> bool {
        self.session().is_some_and(|s| s.ready)
    }

    /// Our own short address
    pub fn nwk(&self) -> CoordResult<NodeId> {
        self.session().map(|s| s.nwk).ok_or(CoordError::NotReady)
    }

    /// Our own EUI-64
    pub fn ieee(&self) -> CoordResult<Eui64> {
        self.session().map(|s| s.ieee).ok_or(CoordError::NotReady)
    }

    // ------------------------------------------------------------------
    // Request / reply
    // ------------------------------------------------------------------

    /// Next transaction id that is not currently pending
    pub fn next_sequence(&self) -> CoordResult<Tsn> {
        let mut state = self.shared.state.lock();
        let CoordinatorState {
            pending, sequence, ..
        } = &mut *state;
        sequence
            .next_free(|tsn| pending.contains(tsn))
            .ok_or(CoordError::SequenceExhausted)
    }

    /// Send `payload` to `nwk` and wait for the reply correlated by
    /// `aps.sequence`
    pub async fn request(&self, nwk: NodeId, aps: ApsFrame, payload: &[u8]) -> CoordResult<Bytes> {
        if !self.is_ready() {
            return Err(CoordError::NotReady);
        }

        let tsn = aps.tsn();
        let handle = match self.shared.state.lock().pending.register(tsn) {
            Ok(handle) => handle,
            Err(e) => {
                error!("refusing request: {}", e);
                return Err(e);
            }
        };
        let _guard = PendingGuard {
            state: &self.shared.state,
            tsn,
            generation: handle.generation(),
        };

        debug!(tsn = %tsn, nwk = %nwk, cluster = aps.cluster_id, "sending request");
        let sent = self
            .shared
            .ncp
            .send_unicast(OutgoingMessageType::Direct, nwk, &aps, tsn.0, payload)
            .await;

        let failure = match sent {
            Ok(result) if result.status.is_success() => None,
            Ok(result) => Some(CoordError::SendFailure {
                tsn,
                status: result.status,
            }),
            Err(e) => Some(e),
        };
        if let Some(failure) = failure {
            self.shared.state.lock().pending.abandon(tsn, failure.clone());
            warn!("request TSN={} to {} not sent: {}", tsn, nwk, failure);
            return Err(failure);
        }

        match self.shared.config.request_timeout {
            None => handle.wait().await,
            Some(limit) => {
                handle
                    .wait_until(limit, |tsn| {
                        let expired = self
                            .shared
                            .state
                            .lock()
                            .pending
                            .abandon(tsn, CoordError::NoReply(tsn));
                        if expired {
                            warn!("no reply for TSN={} from {} within {:?}", tsn, nwk, limit);
                        }
                    })
                    .await
            }
        }
    }

    /// Fire-and-forget send; no reply is expected
    pub async fn reply(&self, nwk: NodeId, aps: ApsFrame, payload: &[u8]) -> CoordResult<()> {
        let result = self
            .shared
            .ncp
            .send_unicast(OutgoingMessageType::Direct, nwk, &aps, aps.sequence, payload)
            .await?;
        if result.status.is_success() {
            Ok(())
        } else {
            Err(CoordError::SendFailure {
                tsn: aps.tsn(),
                status: result.status,
            })
        }
    }

    /// Open the network for joining for `seconds` (0 closes it)
    pub async fn permit(&self, seconds: i32) -> CoordResult<()> {
        if !(0..=MAX_PERMIT_SECONDS).contains(&seconds) {
            return Err(CoordError::PermitOutOfRange(seconds));
        }

        let status = self.shared.ncp.permit_joining(seconds as u8).await?;
        if !status.is_success() {
            return Err(CoordError::CommandFailed {
                command: "permitJoining",
                status,
            });
        }
        info!("permitting joins for {}s", seconds);
        Ok(())
    }

    /// `permit` with the configured default duration
    pub async fn permit_default(&self) -> CoordResult<()> {
        self.permit(i32::from(self.shared.config.default_permit_seconds))
            .await
    }

    pub fn pending_count(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    // ------------------------------------------------------------------
    // Registry
    // ------------------------------------------------------------------

    /// Register a device without emitting lifecycle events
    pub fn add_device(&self, ieee: Eui64, nwk: NodeId) -> Device {
        let factory = self.shared.factory.clone();
        let controller = self.downgrade();
        self.shared
            .state
            .lock()
            .registry
            .add(ieee, nwk, || factory.create(ieee, nwk, controller))
    }

    pub fn get_device_by_ieee(&self, ieee: Eui64) -> Option<Device> {
        self.shared.state.lock().registry.get(ieee).cloned()
    }

    pub fn get_device_by_nwk(&self, nwk: NodeId) -> Option<Device> {
        self.shared.state.lock().registry.get_by_nwk(nwk).cloned()
    }

    pub fn devices(&self) -> Vec<Device> {
        self.shared.state.lock().registry.snapshot()
    }

    // ------------------------------------------------------------------
    // Listeners and callbacks
    // ------------------------------------------------------------------

    pub fn add_listener(&self, listener: Arc<dyn Listener>) -> ListenerId {
        self.shared.listeners.add(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.shared.listeners.remove(id)
    }

    /// Process one callback inline, exactly as the dispatcher task would
    pub fn handle_callback(&self, callback: NcpCallback) {
        Dispatcher::new(self.shared.clone()).handle(callback);
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("session", &self.session())
            .field("state", &*self.shared.state.lock())
            .finish()
    }
}
