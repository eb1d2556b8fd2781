//! Data channel id allocation, option checks and lifecycle events.
mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use common::{MockEngine, collect_until, init_log, new_peer, remote_offer};
use rtc_peer::data_channel::{
    DataChannelParameters, RTCDataChannel, RTCDataChannelInit, RTCDataChannelState,
};
use rtc_peer::engine::EngineEvent;
use rtc_peer::peer_connection::event::RTCPeerConnectionEvent;
use rtc_peer::peer_connection::event::data_channel_event::RTCDataChannelEvent;
use rtc_peer::peer_connection::state::{RTCIceConnectionState, RTCPeerConnectionState};
use rtc_peer::shared::error::{Error, ErrorKind};

const CHANNELS_PER_SIDE: usize = 1000;

fn is_connection_state(event: &RTCPeerConnectionEvent) -> bool {
    matches!(event, RTCPeerConnectionEvent::OnConnectionStateChangeEvent(_))
}

fn assigned(channel: &RTCDataChannel) -> u16 {
    channel.id().expect("channel id assigned")
}

#[test]
fn test_id_polarity_follows_first_offer() -> Result<()> {
    init_log();
    let offerer_engine = MockEngine::new();
    let answerer_engine = MockEngine::new();
    let offerer = new_peer(&offerer_engine);
    let answerer = new_peer(&answerer_engine);

    let offer = offerer.create_offer(None)?.wait()?;
    offerer.set_local_description(offer)?;
    answerer.set_remote_description(remote_offer())?;

    let mut even = HashSet::new();
    let mut odd = HashSet::new();
    for i in 0..CHANNELS_PER_SIDE {
        let label = format!("dc-{i}");
        let id = assigned(&offerer.create_data_channel(&label, None)?);
        assert_eq!(id % 2, 0, "offerer allocated {id}");
        assert!(even.insert(id));

        let id = assigned(&answerer.create_data_channel(&label, None)?);
        assert_eq!(id % 2, 1, "answerer allocated {id}");
        assert!(odd.insert(id));
    }

    assert!(even.is_disjoint(&odd));
    assert_eq!(offerer.data_channels().len(), CHANNELS_PER_SIDE);
    assert_eq!(answerer.data_channels().len(), CHANNELS_PER_SIDE);
    Ok(())
}

#[tokio::test]
async fn test_early_channel_takes_answerer_parity() -> Result<()> {
    init_log();
    let offerer_engine = MockEngine::new();
    let answerer_engine = MockEngine::new();
    let offerer = new_peer(&offerer_engine);
    let answerer = new_peer(&answerer_engine);

    // neither side has offered yet, so the parity is unknown
    let early = answerer.create_data_channel("chat", None)?;
    assert_eq!(early.id(), None);
    assert_eq!(early.ready_state(), RTCDataChannelState::Connecting);
    assert_eq!(answerer.data_channels(), vec![early]);
    assert!(answerer_engine.bound_channel_ids().is_empty());

    let offer = offerer.create_offer(None)?.wait()?;
    offerer.set_local_description(offer)?;
    answerer.set_remote_description(remote_offer())?;

    let chat = answerer.data_channels();
    assert_eq!(chat.len(), 1);
    let chat_id = assigned(&chat[0]);
    assert_eq!(chat_id % 2, 1, "answerer assigned {chat_id}");
    assert_eq!(chat[0].label(), "chat");
    assert_eq!(answerer_engine.bound_channel_ids(), vec![chat_id]);
    assert_eq!(answerer.data_channel(chat_id), Some(chat[0].clone()));

    for i in 0..CHANNELS_PER_SIDE {
        let id = assigned(&offerer.create_data_channel(&format!("dc-{i}"), None)?);
        assert_ne!(id, chat_id);
    }

    // the answerer's channel reaches the offerer without colliding
    let mut events = offerer.subscribe();
    offerer_engine.notify(EngineEvent::RemoteDataChannel {
        id: chat_id,
        params: DataChannelParameters {
            label: "chat".to_owned(),
            ordered: true,
            ..Default::default()
        },
    });
    offerer_engine.notify(EngineEvent::IceConnectionStateChange(
        RTCIceConnectionState::Checking,
    ));

    let seen = collect_until(&mut events, is_connection_state).await;
    let opened: Vec<Option<u16>> = seen
        .iter()
        .filter_map(|event| match event {
            RTCPeerConnectionEvent::OnDataChannel(RTCDataChannelEvent::OnDataChannel(channel)) => {
                Some(channel.id())
            }
            _ => None,
        })
        .collect();
    assert_eq!(opened, vec![Some(chat_id)]);
    assert_eq!(offerer.data_channels().len(), CHANNELS_PER_SIDE + 1);
    Ok(())
}

#[tokio::test]
async fn test_unbindable_early_channel_is_dropped() -> Result<()> {
    init_log();
    let engine = MockEngine::new();
    let pc = new_peer(&engine);

    let mut events = pc.subscribe();
    pc.create_data_channel("chat", None)?;
    engine.state.lock().unwrap().fail_create_data_channel = true;

    pc.set_remote_description(remote_offer())?;
    engine.notify(EngineEvent::IceConnectionStateChange(
        RTCIceConnectionState::Checking,
    ));

    let seen = collect_until(&mut events, is_connection_state).await;
    let names: Vec<&str> = seen.iter().map(|e| e.name()).collect();
    assert_eq!(
        names,
        vec![
            "negotiationneeded",
            "signalingstatechange",
            "error",
            "iceconnectionstatechange",
            "connectionstatechange",
        ]
    );
    assert_eq!(
        seen[2],
        RTCPeerConnectionEvent::OnErrorEvent(Error::ErrEngineFailure(
            "no sctp association".to_owned()
        ))
    );
    assert!(pc.data_channels().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_first_in_band_channel_needs_negotiation() -> Result<()> {
    init_log();
    let engine = MockEngine::new();
    let pc = new_peer(&engine);
    let mut events = pc.subscribe();

    pc.create_data_channel("first", None)?;
    pc.create_data_channel("second", None)?;
    pc.create_data_channel(
        "out-of-band",
        Some(RTCDataChannelInit {
            negotiated: Some(42),
            ..Default::default()
        }),
    )?;
    engine.notify(EngineEvent::IceConnectionStateChange(
        RTCIceConnectionState::Checking,
    ));

    let seen = collect_until(&mut events, is_connection_state).await;
    assert_eq!(
        seen,
        vec![
            RTCPeerConnectionEvent::OnNegotiationNeededEvent,
            RTCPeerConnectionEvent::OnIceConnectionStateChangeEvent(
                RTCIceConnectionState::Checking
            ),
            RTCPeerConnectionEvent::OnConnectionStateChangeEvent(
                RTCPeerConnectionState::Connecting
            ),
        ]
    );
    Ok(())
}

#[test]
fn test_negotiated_ids() -> Result<()> {
    init_log();
    let engine = MockEngine::new();
    let pc = new_peer(&engine);

    let negotiated = |id| {
        Some(RTCDataChannelInit {
            negotiated: Some(id),
            ..Default::default()
        })
    };

    // used verbatim, whatever the parity
    let channel = pc.create_data_channel("even", negotiated(4))?;
    assert_eq!(channel.id(), Some(4));
    assert!(channel.negotiated());
    let channel = pc.create_data_channel("odd", negotiated(7))?;
    assert_eq!(channel.id(), Some(7));

    assert_eq!(
        pc.create_data_channel("again", negotiated(4)).unwrap_err(),
        Error::ErrDataChannelIdInUse(4)
    );
    assert_eq!(
        pc.create_data_channel("reserved", negotiated(65535))
            .unwrap_err(),
        Error::ErrMaxDataChannelID
    );

    assert_eq!(engine.bound_channel_ids(), vec![4, 7]);
    Ok(())
}

#[test]
fn test_invalid_channel_options() {
    init_log();
    let engine = MockEngine::new();
    let pc = new_peer(&engine);

    let long = "x".repeat(65536);
    let tests = vec![
        (
            "label",
            long.clone(),
            RTCDataChannelInit::default(),
            Error::ErrStringSizeLimit,
        ),
        (
            "protocol",
            "chat".to_owned(),
            RTCDataChannelInit {
                protocol: long,
                ..Default::default()
            },
            Error::ErrProtocolTooLarge,
        ),
        (
            "partial reliability",
            "chat".to_owned(),
            RTCDataChannelInit {
                ordered: false,
                max_packet_life_time: Some(Duration::from_millis(500)),
                max_retransmits: Some(3),
                ..Default::default()
            },
            Error::ErrRetransmitsOrPacketLifeTime,
        ),
    ];

    for (name, label, init, expected) in tests {
        let err = pc.create_data_channel(&label, Some(init)).unwrap_err();
        assert_eq!(err, expected, "{name}");
        assert_eq!(err.kind(), ErrorKind::DataChannel, "{name}");
    }
    assert!(pc.data_channels().is_empty());
    assert!(engine.state.lock().unwrap().data_channels.is_empty());
}

#[test]
fn test_engine_id_mismatch() {
    init_log();
    let engine = Arc::new(MockEngine {
        id_skew: 1,
        ..Default::default()
    });
    let pc = new_peer(&engine);

    let err = pc
        .create_data_channel(
            "chat",
            Some(RTCDataChannelInit {
                negotiated: Some(10),
                ..Default::default()
            }),
        )
        .unwrap_err();
    assert_eq!(
        err,
        Error::ErrDataChannelIdMismatch {
            expected: 10,
            actual: 11
        }
    );
    assert!(pc.data_channel(10).is_none());
    assert!(pc.data_channel(11).is_none());
}

#[tokio::test]
async fn test_channel_lifecycle_events() -> Result<()> {
    init_log();
    let engine = MockEngine::new();
    let pc = new_peer(&engine);
    pc.set_remote_description(remote_offer())?;
    let mut events = pc.subscribe();

    // negotiationneeded waits for stable signaling
    let local = pc.create_data_channel("local", None)?;
    assert_eq!(local.ready_state(), RTCDataChannelState::Connecting);
    let local_id = assigned(&local);

    engine.notify(EngineEvent::RemoteDataChannel {
        id: 2,
        params: DataChannelParameters {
            label: "remote".to_owned(),
            protocol: "json".to_owned(),
            ordered: true,
            ..Default::default()
        },
    });
    engine.notify(EngineEvent::DataChannelOpen(local_id));
    engine.notify(EngineEvent::DataChannelOpen(local_id));
    engine.notify(EngineEvent::DataChannelOpen(2));
    // unknown ids are ignored
    engine.notify(EngineEvent::DataChannelOpen(900));
    engine.notify(EngineEvent::DataChannelClosing(2));
    engine.notify(EngineEvent::DataChannelClosed(2));
    engine.notify(EngineEvent::IceConnectionStateChange(
        RTCIceConnectionState::Checking,
    ));

    let seen = collect_until(&mut events, is_connection_state).await;
    let names: Vec<&str> = seen.iter().map(|e| e.name()).collect();
    assert_eq!(
        names,
        vec![
            "datachannel",
            "open",
            "open",
            "closing",
            "close",
            "iceconnectionstatechange",
            "connectionstatechange",
        ]
    );
    match &seen[0] {
        RTCPeerConnectionEvent::OnDataChannel(RTCDataChannelEvent::OnDataChannel(channel)) => {
            assert_eq!(channel.id(), Some(2));
            assert_eq!(channel.label(), "remote");
            assert_eq!(channel.protocol(), "json");
            assert!(!channel.negotiated());
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(
        seen[1],
        RTCPeerConnectionEvent::OnDataChannel(RTCDataChannelEvent::OnOpen(local_id))
    );
    assert_eq!(
        seen[4],
        RTCPeerConnectionEvent::OnDataChannel(RTCDataChannelEvent::OnClose(2))
    );

    let open = pc.data_channel(local_id).expect("local channel registered");
    assert_eq!(open.ready_state(), RTCDataChannelState::Open);
    // closed channels leave the registry and their id can be reused
    assert!(pc.data_channel(2).is_none());
    let reused = pc.create_data_channel(
        "reused",
        Some(RTCDataChannelInit {
            negotiated: Some(2),
            ..Default::default()
        }),
    )?;
    assert_eq!(reused.id(), Some(2));

    pc.close()?;
    let mut closed: Vec<u16> = vec![];
    while let Some(event) = events.recv().await {
        if let RTCPeerConnectionEvent::OnDataChannel(RTCDataChannelEvent::OnClose(id)) = event {
            closed.push(id);
        }
    }
    let mut expected = vec![local_id, 2];
    expected.sort_unstable();
    assert_eq!(closed, expected);
    assert!(pc.data_channels().is_empty());
    Ok(())
}
