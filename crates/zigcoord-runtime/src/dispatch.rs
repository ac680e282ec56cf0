//! Inbound callback dispatcher
//!
//! Classifies each NCP callback and routes it:
//! - incoming message -> radio metrics, then reply or request routing
//! - failed send -> abandon the pending request
//! - trust center join -> join or leave handling
//!
//! Shared state is locked only for the mutation itself. Listeners, device
//! handlers and the init queue are always called with the lock released.

use std::sync::{Arc, Weak};

use tracing::{debug, info, warn};

use zigcoord_core::{ApsFrame, CoordError, Eui64, NodeId, Status, Tsn};
use zigcoord_ncp::{CallbackReceiver, DecodedFrame, NcpCallback};

use crate::controller::{Shared, WeakController};
use crate::init::InitJob;
use crate::listener::LifecycleEvent;
use crate::registry::JoinOutcome;

/// Consume the callback stream until it closes or the controller is dropped
pub(crate) async fn run(shared: Weak<Shared>, mut callbacks: CallbackReceiver) {
    while let Some(callback) = callbacks.recv().await {
        let Some(strong) = shared.upgrade() else {
            break;
        };
        Dispatcher::new(strong).handle(callback);
    }
    debug!("callback stream closed, dispatcher stopping");
}

pub(crate) struct Dispatcher {
    shared: Arc<Shared>,
}

impl Dispatcher {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Dispatcher { shared }
    }

    pub(crate) fn handle(&self, callback: NcpCallback) {
        match callback {
            NcpCallback::IncomingMessage {
                aps,
                lqi,
                rssi,
                sender,
                payload,
                ..
            } => self.handle_frame(&aps, lqi, rssi, sender, &payload),
            NcpCallback::MessageSent {
                destination,
                message_tag,
                status,
                ..
            } => {
                if !status.is_success() {
                    self.handle_frame_failure(destination, Tsn(message_tag), status);
                }
            }
            NcpCallback::TrustCenterJoin {
                nwk, ieee, update, ..
            } => {
                if update.is_leave() {
                    self.handle_leave(nwk, ieee);
                } else {
                    self.handle_join(nwk, ieee);
                }
            }
            NcpCallback::Other { name } => debug!("ignoring callback {}", name),
        }
    }

    fn handle_frame(&self, aps: &ApsFrame, lqi: u8, rssi: i8, sender: NodeId, payload: &[u8]) {
        let device = self.shared.state.lock().registry.record_radio(sender, lqi, rssi);
        match device {
            Some(device) => device.handler().radio_details(lqi, rssi),
            None => debug!("No such device {}", sender),
        }

        let (protocol, frame) = match self.shared.codecs.decode(aps, payload) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(
                    sender = %sender,
                    cluster = format_args!("0x{:04x}", aps.cluster_id),
                    "dropping malformed frame: {}",
                    e
                );
                return;
            }
        };
        debug!(
            sender = %sender,
            protocol = %protocol,
            tsn = %frame.tsn,
            command = frame.command_id,
            reply = frame.is_reply,
            "frame received"
        );

        if frame.is_reply {
            self.handle_reply(sender, frame);
        } else {
            self.handle_request(sender, aps, frame);
        }
    }

    fn handle_reply(&self, sender: NodeId, frame: DecodedFrame) {
        let DecodedFrame {
            tsn,
            command_id,
            args,
            ..
        } = frame;
        let resolved = self.shared.state.lock().pending.resolve(tsn, args.clone());
        if !resolved {
            warn!(
                "Unexpected response TSN={} command={} from {} args={:?}",
                tsn, command_id, sender, args
            );
        }
    }

    fn handle_request(&self, sender: NodeId, aps: &ApsFrame, frame: DecodedFrame) {
        let device = self.shared.state.lock().registry.get_by_nwk(sender).cloned();
        let Some(device) = device else {
            warn!("Request on unknown device {}", sender);
            return;
        };
        device
            .handler()
            .handle_request(aps, frame.tsn, frame.command_id, frame.args);
    }

    fn handle_frame_failure(&self, destination: NodeId, tsn: Tsn, status: Status) {
        let failure = CoordError::SendFailure { tsn, status };
        let abandoned = self.shared.state.lock().pending.abandon(tsn, failure);
        if !abandoned {
            warn!(
                "Unexpected message send failure TSN={} to {} status={}",
                tsn, destination, status
            );
        }
    }

    fn handle_join(&self, nwk: NodeId, ieee: Eui64) {
        info!("Device {} ({}) joined the network", nwk, ieee);

        let factory = self.shared.factory.clone();
        let controller = WeakController::new(&self.shared);
        let outcome = self
            .shared
            .state
            .lock()
            .registry
            .join(ieee, nwk, || factory.create(ieee, nwk, controller));

        let device = match outcome {
            JoinOutcome::Duplicate(_) => {
                debug!("Skip initialization for existing device {}", ieee);
                return;
            }
            JoinOutcome::Rejoined { device, previous } => {
                debug!("Device {} moved from {} to {}", ieee, previous, nwk);
                device
            }
            JoinOutcome::Created(device) => device,
        };

        self.shared
            .listeners
            .emit(&LifecycleEvent::DeviceJoined(device.clone()));
        self.shared.enqueue_init(InitJob {
            ieee,
            nwk,
            handler: device.handler().clone(),
        });
    }

    fn handle_leave(&self, nwk: NodeId, ieee: Eui64) {
        info!("Device {} ({}) left the network", nwk, ieee);
        let removed = self.shared.state.lock().registry.remove(ieee);
        match removed {
            Some(device) => {
                self.shared.listeners.emit(&LifecycleEvent::DeviceLeft(device));
            }
            None => debug!("Leave from unregistered device {}", ieee),
        }
    }
}
