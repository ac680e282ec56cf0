//! End-to-end controller scenarios against the mock NCP

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use zigcoord_core::{
    ConfigId, CoordError, Eui64, NodeId, NodeType, PolicyId, StartupStage, StartupStep, Status,
    Tsn,
};
use zigcoord_ncp::NcpCallback;
use zigcoord_runtime::{ControllerConfig, DeviceRecord, StartupConfig, StartupSequencer};

use crate::harness::*;
use crate::mock_device::ReceivedRequest;
use crate::mock_ncp::{MockNcp, NcpCall, MOCK_EUI64};
use crate::recorder::{FailingListener, MemoryStore, RecordingListener};

const PLUG: Eui64 = Eui64(0x00_15_8d_00_01_02_03_04);
const BULB: Eui64 = Eui64(0x00_17_88_01_0a_0b_0c_0d);

fn with_timeout(timeout: Option<Duration>) -> ControllerConfig {
    ControllerConfig {
        request_timeout: timeout,
        ..ControllerConfig::default()
    }
}

// ============================================================================
// STARTUP
// ============================================================================

#[tokio::test]
async fn test_startup_reaches_ready() {
    let h = Harness::new();
    assert_eq!(h.controller.nwk(), Err(CoordError::NotReady));

    let session = h.controller.startup().await.unwrap();
    assert!(session.ready);
    assert_eq!(session.nwk, NodeId::COORDINATOR);
    assert_eq!(session.ieee, MOCK_EUI64);
    assert_eq!(session.parameters.pan_id, 0x1a62);
    assert!(h.controller.is_ready());
    assert_eq!(h.controller.ieee(), Ok(MOCK_EUI64));

    let startup = StartupConfig::default();
    let mut expected = vec![NcpCall::Reset, NcpCall::Version(startup.protocol_version)];
    expected.extend(
        startup
            .configuration
            .iter()
            .map(|c| NcpCall::SetConfiguration(c.id, c.value)),
    );
    expected.push(NcpCall::NetworkInit);
    expected.push(NcpCall::GetNetworkParameters);
    expected.extend(
        startup
            .policies
            .iter()
            .map(|p| NcpCall::SetPolicy(p.policy, p.decision)),
    );
    expected.push(NcpCall::GetNodeId);
    expected.push(NcpCall::GetEui64);
    assert_eq!(h.ncp.calls(), expected);
}

#[tokio::test]
async fn test_router_role_is_fatal() {
    let h = Harness::new();
    h.ncp.script().node_type = NodeType::Router;

    let err = h.controller.startup().await.unwrap_err();
    assert_eq!(err, CoordError::NotCoordinator(NodeType::Router));
    assert!(err.is_startup_failure());
    assert!(h.controller.session().is_none());
    assert!(!h.ncp.calls().iter().any(|c| matches!(c, NcpCall::SetPolicy(..))));

    let request = h
        .controller
        .request(NodeId(0x1234), on_off_frame(Tsn(1)), &[])
        .await;
    assert_eq!(request, Err(CoordError::NotReady));
    assert!(h.ncp.sends().is_empty());
}

#[tokio::test]
async fn test_configuration_failure_names_step() {
    let h = Harness::new();
    h.ncp
        .script()
        .config_failures
        .insert(ConfigId::SupportedNetworks, Status::INVALID_CALL);

    let err = h.controller.startup().await.unwrap_err();
    assert_eq!(
        err,
        CoordError::StartupFailed {
            stage: StartupStage::Configured(1),
            step: StartupStep::SetConfiguration(ConfigId::SupportedNetworks),
            status: Status::INVALID_CALL,
        }
    );
    assert!(!h.ncp.calls().contains(&NcpCall::NetworkInit));
    assert!(!h.controller.is_ready());
}

#[tokio::test]
async fn test_version_mismatch_is_fatal() {
    let h = Harness::new();
    h.ncp.script().protocol_version = Some(8);

    assert_eq!(
        h.controller.startup().await,
        Err(CoordError::VersionMismatch {
            requested: 4,
            reported: 8
        })
    );
    assert_eq!(h.ncp.calls(), vec![NcpCall::Reset, NcpCall::Version(4)]);
}

#[tokio::test]
async fn test_startup_retry_after_failure() {
    let h = Harness::new();
    h.ncp.script().network_init = Status::NETWORK_DOWN;
    assert!(matches!(
        h.controller.startup().await,
        Err(CoordError::StartupFailed {
            step: StartupStep::NetworkInit,
            ..
        })
    ));

    h.ncp.script().network_init = Status::SUCCESS;
    assert!(h.controller.startup().await.is_ok());
    assert_eq!(h.controller.startup().await, Err(CoordError::AlreadyStarted));
}

#[tokio::test]
async fn test_sequencer_stages() {
    let ncp = MockNcp::new();
    let config = StartupConfig::default();

    ncp.script().reset = Status::ERR_FATAL;
    let mut sequencer = StartupSequencer::new(&ncp, &config);
    assert_eq!(
        sequencer.run().await,
        Err(CoordError::StartupFailed {
            stage: StartupStage::Idle,
            step: StartupStep::Reset,
            status: Status::ERR_FATAL,
        })
    );
    assert_eq!(sequencer.stage(), StartupStage::Idle);

    ncp.script().reset = Status::SUCCESS;
    ncp.script()
        .policy_failures
        .insert(PolicyId::TcKeyRequestPolicy, Status::INVALID_CALL);
    let mut sequencer = StartupSequencer::new(&ncp, &config);
    let err = sequencer.run().await.unwrap_err();
    assert_eq!(
        err,
        CoordError::StartupFailed {
            stage: StartupStage::RoleVerified,
            step: StartupStep::SetPolicy(PolicyId::TcKeyRequestPolicy),
            status: Status::INVALID_CALL,
        }
    );

    ncp.script().policy_failures.clear();
    let mut sequencer = StartupSequencer::new(&ncp, &config);
    let session = sequencer.run().await.unwrap();
    assert_eq!(sequencer.stage(), StartupStage::Ready);
    assert_eq!(session.nwk, NodeId::COORDINATOR);
}

#[tokio::test]
async fn test_failed_exchange_names_step() {
    let h = Harness::new();
    h.ncp.script().broken_exchange = Some(StartupStep::GetEui64);

    let err = h.controller.startup().await.unwrap_err();
    assert_eq!(
        err,
        CoordError::StartupExchange {
            stage: StartupStage::PoliciesSet,
            step: StartupStep::GetEui64,
            source: Box::new(CoordError::Ncp("no response to getEui64".into())),
        }
    );
    assert!(err.is_startup_failure());
    assert!(h.controller.session().is_none());

    let ncp = MockNcp::new();
    ncp.script().broken_exchange = Some(StartupStep::Version);
    let config = StartupConfig::default();
    let mut sequencer = StartupSequencer::new(&ncp, &config);
    assert!(matches!(
        sequencer.run().await,
        Err(CoordError::StartupExchange {
            stage: StartupStage::Reset,
            step: StartupStep::Version,
            ..
        })
    ));

    ncp.script().broken_exchange = Some(StartupStep::SetConfiguration(ConfigId::StackProfile));
    let mut sequencer = StartupSequencer::new(&ncp, &config);
    assert!(matches!(
        sequencer.run().await,
        Err(CoordError::StartupExchange {
            stage: StartupStage::VersionChecked,
            step: StartupStep::SetConfiguration(ConfigId::StackProfile),
            ..
        })
    ));
}

// ============================================================================
// PERMIT JOINING
// ============================================================================

#[tokio::test]
async fn test_permit_range() {
    let h = Harness::started().await;
    h.ncp.clear_calls();

    assert!(h.controller.permit(0).await.is_ok());
    assert!(h.controller.permit(254).await.is_ok());
    assert_eq!(h.controller.permit(255).await, Err(CoordError::PermitOutOfRange(255)));
    assert_eq!(h.controller.permit(-1).await, Err(CoordError::PermitOutOfRange(-1)));

    assert_eq!(
        h.ncp.calls(),
        vec![NcpCall::PermitJoining(0), NcpCall::PermitJoining(254)]
    );
}

#[tokio::test]
async fn test_permit_status_and_default() {
    let h = Harness::started().await;
    h.ncp.clear_calls();

    h.controller.permit_default().await.unwrap();
    assert_eq!(h.ncp.calls(), vec![NcpCall::PermitJoining(60)]);

    h.ncp.script().permit = Status::INVALID_CALL;
    assert_eq!(
        h.controller.permit(30).await,
        Err(CoordError::CommandFailed {
            command: "permitJoining",
            status: Status::INVALID_CALL
        })
    );
}

// ============================================================================
// REQUEST / REPLY CORRELATION
// ============================================================================

#[tokio::test]
async fn test_request_resolved_by_reply() {
    let h = Harness::started().await;
    let tsn = h.controller.next_sequence().unwrap();

    let controller = h.controller.clone();
    let task = tokio::spawn(async move {
        controller
            .request(NodeId(0x1234), on_off_frame(tsn), &[0x01])
            .await
    });
    assert!(eventually(|| h.ncp.sends().len() == 1).await);
    assert_eq!(h.controller.pending_count(), 1);

    match &h.ncp.sends()[0] {
        NcpCall::SendUnicast {
            destination,
            message_tag,
            payload,
            ..
        } => {
            assert_eq!(*destination, NodeId(0x1234));
            assert_eq!(*message_tag, tsn.0);
            assert_eq!(&payload[..], &[0x01]);
        }
        other => panic!("unexpected call {:?}", other),
    }

    assert!(h.ncp.push(reply_from(NodeId(0x1234), tsn, &[0xaa, 0x55])).await);
    assert_eq!(
        task.await.unwrap().unwrap(),
        Bytes::from_static(&[0xaa, 0x55])
    );
    assert_eq!(h.controller.pending_count(), 0);
}

#[tokio::test]
async fn test_unexpected_reply_is_ignored() {
    let h = Harness::started().await;
    h.controller
        .handle_callback(reply_from(NodeId(0x1234), Tsn(99), &[1]));
    assert_eq!(h.controller.pending_count(), 0);

    // The dispatcher keeps going afterwards
    let tsn = h.controller.next_sequence().unwrap();
    let controller = h.controller.clone();
    let task = tokio::spawn(async move {
        controller
            .request(NodeId(0x1234), on_off_frame(tsn), &[])
            .await
    });
    assert!(eventually(|| h.controller.pending_count() == 1).await);
    h.ncp.push(reply_from(NodeId(0x1234), tsn, &[2])).await;
    assert_eq!(task.await.unwrap().unwrap(), Bytes::from_static(&[2]));
}

#[tokio::test]
async fn test_send_status_failure() {
    let h = Harness::started().await;
    h.ncp.script().send = Status::DELIVERY_FAILED;

    let result = h
        .controller
        .request(NodeId(0x1234), on_off_frame(Tsn(12)), &[])
        .await;
    assert_eq!(
        result,
        Err(CoordError::SendFailure {
            tsn: Tsn(12),
            status: Status::DELIVERY_FAILED
        })
    );
    assert_eq!(h.controller.pending_count(), 0);
}

#[tokio::test]
async fn test_send_exchange_error() {
    let h = Harness::started().await;
    h.ncp.script().send_error = Some(CoordError::Ncp("ASH link reset".into()));

    let result = h
        .controller
        .request(NodeId(0x1234), on_off_frame(Tsn(13)), &[])
        .await;
    assert_eq!(result, Err(CoordError::Ncp("ASH link reset".into())));
    assert_eq!(h.controller.pending_count(), 0);
}

#[tokio::test]
async fn test_message_sent_failure_abandons_request() {
    let h = Harness::started().await;
    let tsn = Tsn(20);

    let controller = h.controller.clone();
    let task = tokio::spawn(async move {
        controller
            .request(NodeId(0x4321), on_off_frame(tsn), &[])
            .await
    });
    assert!(eventually(|| h.controller.pending_count() == 1).await);

    // A successful delivery report leaves the request waiting
    h.controller.handle_callback(NcpCallback::unicast_sent(
        NodeId(0x4321),
        on_off_frame(tsn),
        tsn.0,
        Status::SUCCESS,
    ));
    assert_eq!(h.controller.pending_count(), 1);

    h.ncp
        .push(NcpCallback::unicast_sent(
            NodeId(0x4321),
            on_off_frame(tsn),
            tsn.0,
            Status::DELIVERY_FAILED,
        ))
        .await;
    assert_eq!(
        task.await.unwrap(),
        Err(CoordError::SendFailure {
            tsn,
            status: Status::DELIVERY_FAILED
        })
    );

    // Unmatched failure reports are only logged
    h.controller.handle_callback(NcpCallback::unicast_sent(
        NodeId(0x4321),
        on_off_frame(Tsn(77)),
        77,
        Status::DELIVERY_FAILED,
    ));
    assert_eq!(h.controller.pending_count(), 0);
}

#[tokio::test]
async fn test_duplicate_tsn_rejected() {
    let h = Harness::started().await;
    let tsn = Tsn(5);

    let controller = h.controller.clone();
    let first = tokio::spawn(async move {
        controller
            .request(NodeId(0x1000), on_off_frame(tsn), &[])
            .await
    });
    assert!(eventually(|| h.controller.pending_count() == 1).await);

    let second = h
        .controller
        .request(NodeId(0x2000), on_off_frame(tsn), &[])
        .await;
    assert_eq!(second, Err(CoordError::DuplicateTransaction(tsn)));
    assert!(second.unwrap_err().is_defect());
    assert_eq!(h.ncp.sends().len(), 1);

    h.controller
        .handle_callback(reply_from(NodeId(0x1000), tsn, &[9]));
    assert_eq!(first.await.unwrap().unwrap(), Bytes::from_static(&[9]));
}

#[tokio::test]
async fn test_request_times_out() {
    let h = Harness::started_with(with_timeout(Some(Duration::from_millis(50)))).await;

    let result = h
        .controller
        .request(NodeId(0x1234), on_off_frame(Tsn(30)), &[])
        .await;
    assert_eq!(result, Err(CoordError::NoReply(Tsn(30))));
    assert_eq!(h.controller.pending_count(), 0);

    // A late reply finds nothing to resolve
    h.controller
        .handle_callback(reply_from(NodeId(0x1234), Tsn(30), &[]));
    assert_eq!(h.controller.pending_count(), 0);
}

#[tokio::test]
async fn test_dropped_request_releases_tsn() {
    let h = Harness::started_with(with_timeout(None)).await;

    let controller = h.controller.clone();
    let task = tokio::spawn(async move {
        controller
            .request(NodeId(0x1234), on_off_frame(Tsn(1)), &[])
            .await
    });
    assert!(eventually(|| h.controller.pending_count() == 1).await);

    task.abort();
    assert!(eventually(|| h.controller.pending_count() == 0).await);
}

#[tokio::test]
async fn test_next_sequence_skips_pending() {
    let h = Harness::started_with(with_timeout(None)).await;

    let controller = h.controller.clone();
    let task = tokio::spawn(async move {
        controller
            .request(NodeId(0x1234), on_off_frame(Tsn(1)), &[])
            .await
    });
    assert!(eventually(|| h.controller.pending_count() == 1).await);

    assert_eq!(h.controller.next_sequence(), Ok(Tsn(2)));

    h.controller
        .handle_callback(reply_from(NodeId(0x1234), Tsn(1), &[]));
    assert!(task.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_sequence_exhausted_when_all_pending() {
    let h = Harness::started_with(with_timeout(None)).await;

    let mut tasks = Vec::new();
    for id in 0..=u8::MAX {
        let controller = h.controller.clone();
        tasks.push(tokio::spawn(async move {
            controller
                .request(NodeId(0x1234), on_off_frame(Tsn(id)), &[])
                .await
        }));
    }
    assert!(eventually(|| h.controller.pending_count() == 256).await);
    assert_eq!(h.controller.next_sequence(), Err(CoordError::SequenceExhausted));

    h.controller.shutdown();
    for task in tasks {
        assert!(matches!(task.await.unwrap(), Err(CoordError::Shutdown(_))));
    }
}

#[tokio::test]
async fn test_out_of_order_replies() {
    let h = Harness::started_with(with_timeout(Some(Duration::from_secs(5)))).await;

    let mut tsns = Vec::new();
    let mut tasks = Vec::new();
    for i in 0..16u16 {
        let tsn = h.controller.next_sequence().unwrap();
        let controller = h.controller.clone();
        tsns.push(tsn);
        tasks.push(tokio::spawn(async move {
            controller
                .request(NodeId(0x2000 + i), on_off_frame(tsn), &[])
                .await
        }));
    }
    assert!(eventually(|| h.controller.pending_count() == 16).await);

    let mut order = tsns.clone();
    order.shuffle(&mut StdRng::seed_from_u64(0x5eed));
    for tsn in &order {
        assert!(h.ncp.push(reply_from(NodeId(0x2000), *tsn, &[tsn.0])).await);
    }

    for (tsn, task) in tsns.iter().zip(tasks) {
        assert_eq!(task.await.unwrap().unwrap(), Bytes::from(vec![tsn.0]));
    }
    assert_eq!(h.controller.pending_count(), 0);
}

#[tokio::test]
async fn test_reply_send_status() {
    let h = Harness::started().await;
    let aps = on_off_frame(Tsn(44));

    assert!(h.controller.reply(NodeId(0x1234), aps, &[0]).await.is_ok());
    h.ncp.script().send = Status::NETWORK_DOWN;
    assert_eq!(
        h.controller.reply(NodeId(0x1234), aps, &[0]).await,
        Err(CoordError::SendFailure {
            tsn: Tsn(44),
            status: Status::NETWORK_DOWN
        })
    );
    assert_eq!(h.controller.pending_count(), 0);
}

#[tokio::test]
async fn test_zdo_frames_use_zdo_codec() {
    const ACTIVE_EP_REQ: u16 = 0x0005;
    const DEVICE_ANNCE: u16 = 0x0013;

    let h = Harness::started_with(with_timeout(Some(Duration::from_secs(1)))).await;
    let tsn = h.controller.next_sequence().unwrap();

    let controller = h.controller.clone();
    let task = tokio::spawn(async move {
        controller
            .request(NodeId(0x1234), zdo_frame(ACTIVE_EP_REQ, tsn), &[tsn.0, 0x34, 0x12])
            .await
    });
    assert!(eventually(|| h.ncp.sends().len() == 1).await);

    h.controller.handle_callback(zdo_from(
        NodeId(0x1234),
        ACTIVE_EP_REQ | crate::codec::ZDO_RESPONSE,
        tsn,
        &[0x00, 0x34, 0x12, 0x01, 0x01],
    ));
    assert_eq!(
        task.await.unwrap().unwrap(),
        Bytes::from_static(&[0x00, 0x34, 0x12, 0x01, 0x01])
    );

    h.join(BULB, NodeId(0x3000));
    h.controller
        .handle_callback(zdo_from(NodeId(0x3000), DEVICE_ANNCE, Tsn(0x51), &[0x00, 0x30]));
    let requests = h.factory.device(BULB).unwrap().requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].command_id, DEVICE_ANNCE);
    assert_eq!(requests[0].tsn, Tsn(0x51));
    assert_eq!(requests[0].cluster_id, DEVICE_ANNCE);
    assert_eq!(&requests[0].args[..], &[0x00, 0x30]);
    assert_eq!(h.factory.device(BULB).unwrap().radio(), Some((160, -60)));
}

// ============================================================================
// DEVICE LIFECYCLE
// ============================================================================

#[tokio::test]
async fn test_join_registers_and_initializes() {
    let h = Harness::started().await;
    assert!(
        h.ncp
            .push(NcpCallback::device_update(
                NodeId(0x1a2b),
                PLUG,
                zigcoord_core::DeviceUpdate::StandardSecurityUnsecuredJoin,
            ))
            .await
    );

    assert!(eventually(|| h.factory.total_inits() == 1).await);
    let device = h.controller.get_device_by_ieee(PLUG).unwrap();
    assert_eq!(device.nwk(), NodeId(0x1a2b));
    assert_eq!(h.listener.count("device_joined"), 1);
    assert_eq!(h.factory.device(PLUG).unwrap().saw_ready(), Some(true));
}

#[tokio::test]
async fn test_duplicate_join_is_silent() {
    let h = Harness::started().await;
    h.join(PLUG, NodeId(0x1a2b));
    h.join(PLUG, NodeId(0x1a2b));

    assert_eq!(h.listener.count("device_joined"), 1);
    assert_eq!(h.controller.devices().len(), 1);
    assert_eq!(h.factory.created().len(), 1);

    assert!(eventually(|| h.factory.total_inits() == 1).await);
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(h.factory.total_inits(), 1);
}

#[tokio::test]
async fn test_rejoin_with_new_address() {
    let h = Harness::started().await;
    h.join(PLUG, NodeId(0x1000));
    h.join(PLUG, NodeId(0x2000));

    let events = h.listener.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].nwk, NodeId(0x2000));

    assert_eq!(h.controller.get_device_by_nwk(NodeId(0x2000)).unwrap().ieee(), PLUG);
    assert!(h.controller.get_device_by_nwk(NodeId(0x1000)).is_none());
    assert_eq!(h.factory.created().len(), 1);
    assert!(eventually(|| h.factory.total_inits() == 2).await);
}

#[tokio::test]
async fn test_leave_emits_once() {
    let h = Harness::started().await;
    h.join(PLUG, NodeId(0x1000));
    h.leave(PLUG, NodeId(0x1000));
    h.leave(PLUG, NodeId(0x1000));
    h.leave(BULB, NodeId(0x3000));

    assert_eq!(h.listener.count("device_joined"), 1);
    assert_eq!(h.listener.count("device_left"), 1);
    assert!(h.controller.get_device_by_ieee(PLUG).is_none());
    assert!(h.controller.devices().is_empty());
}

#[tokio::test]
async fn test_failed_initialization_keeps_device() {
    let h = Harness::started().await;
    h.factory.fail_init(true);
    h.join(BULB, NodeId(0x3000));

    assert!(eventually(|| h.factory.total_inits() == 1).await);
    assert!(h.controller.get_device_by_ieee(BULB).is_some());
    assert!(h.controller.permit(10).await.is_ok());
}

#[tokio::test]
async fn test_inbound_request_reaches_handler() {
    let h = Harness::started().await;
    h.join(BULB, NodeId(0x3000));

    h.controller
        .handle_callback(request_from(NodeId(0x3000), Tsn(40), 0x0002, &[7]));

    let handler = h.factory.device(BULB).unwrap();
    assert_eq!(
        handler.requests(),
        vec![ReceivedRequest {
            cluster_id: ON_OFF_CLUSTER,
            tsn: Tsn(40),
            command_id: 0x0002,
            args: Bytes::from_static(&[7]),
        }]
    );
    assert_eq!(handler.radio(), Some((200, -40)));

    let device = h.controller.get_device_by_nwk(NodeId(0x3000)).unwrap();
    assert_eq!(device.lqi(), Some(200));
    assert_eq!(device.rssi(), Some(-40));

    // Malformed frames still update radio metrics but reach no handler
    h.controller.handle_callback(garbage_from(NodeId(0x3000)));
    assert_eq!(handler.radio(), Some((90, -80)));
    assert_eq!(handler.requests().len(), 1);

    // Requests from unknown senders are dropped
    h.controller
        .handle_callback(request_from(NodeId(0x7777), Tsn(41), 0x0002, &[]));
    assert_eq!(handler.requests().len(), 1);
}

#[tokio::test]
async fn test_failing_listener_is_isolated() {
    let h = Harness::started().await;
    h.controller.add_listener(Arc::new(FailingListener));
    let second = Arc::new(RecordingListener::new());
    let id = h.controller.add_listener(second.clone());

    h.join(PLUG, NodeId(0x1000));
    assert_eq!(h.listener.count("device_joined"), 1);
    assert_eq!(second.count("device_joined"), 1);

    assert!(h.controller.remove_listener(id));
    assert!(!h.controller.remove_listener(id));
    h.join(BULB, NodeId(0x2000));
    assert_eq!(h.listener.count("device_joined"), 2);
    assert_eq!(second.count("device_joined"), 1);
}

// ============================================================================
// PERSISTENCE
// ============================================================================

#[tokio::test]
async fn test_store_reload_and_tracking() {
    let store = Arc::new(MemoryStore::with_records([
        DeviceRecord {
            ieee: PLUG,
            nwk: NodeId(0x1111),
        },
        DeviceRecord {
            ieee: BULB,
            nwk: NodeId(0x2222),
        },
    ]));
    let h = Harness::new();

    assert_eq!(h.controller.attach_store(store.clone()), Ok(2));
    assert_eq!(h.controller.devices().len(), 2);
    assert!(h.listener.events().is_empty());
    assert_eq!(h.factory.created().len(), 2);

    h.controller.startup().await.unwrap();
    assert_eq!(
        h.controller.attach_store(store.clone()),
        Err(CoordError::AlreadyStarted)
    );

    // Reloaded device announcing the same address is a duplicate
    h.join(PLUG, NodeId(0x1111));
    assert!(h.listener.events().is_empty());

    let sensor = Eui64(0x00_0d_6f_00_0a_0b_0c_0d);
    h.join(sensor, NodeId(0x3333));
    h.leave(PLUG, NodeId(0x1111));

    let ieees: Vec<Eui64> = store.records().iter().map(|r| r.ieee).collect();
    assert_eq!(ieees.len(), 2);
    assert!(ieees.contains(&sensor));
    assert!(!ieees.contains(&PLUG));
}

// ============================================================================
// SHUTDOWN
// ============================================================================

#[tokio::test]
async fn test_shutdown_abandons_pending() {
    let h = Harness::started_with(with_timeout(None)).await;

    let controller = h.controller.clone();
    let task = tokio::spawn(async move {
        controller
            .request(NodeId(0x1234), on_off_frame(Tsn(3)), &[])
            .await
    });
    assert!(eventually(|| h.controller.pending_count() == 1).await);

    h.controller.shutdown();
    assert_eq!(task.await.unwrap(), Err(CoordError::Shutdown(Tsn(3))));
    assert!(!h.controller.is_ready());
    assert_eq!(
        h.controller
            .request(NodeId(0x1234), on_off_frame(Tsn(4)), &[])
            .await,
        Err(CoordError::NotReady)
    );
}

#[tokio::test]
async fn test_restart_after_shutdown() {
    let h = Harness::started().await;
    h.controller.shutdown();

    h.controller.startup().await.unwrap();
    assert!(
        h.ncp
            .push(NcpCallback::device_update(
                NodeId(0x5000),
                BULB,
                zigcoord_core::DeviceUpdate::StandardSecurityUnsecuredJoin,
            ))
            .await
    );
    assert!(eventually(|| h.factory.total_inits() == 1).await);
}
