//! In-process transport engine used by the integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rtc_peer::data_channel::{DataChannelParameters, RTCDataChannelId};
use rtc_peer::engine::{
    DescriptionResponder, EngineEvent, EngineNotifier, SessionHandle, TransportEngine,
};
use rtc_peer::peer_connection::RTCPeerConnection;
use rtc_peer::peer_connection::configuration::{
    RTCAnswerOptions, RTCConfiguration, RTCOfferOptions,
};
use rtc_peer::peer_connection::event::{RTCPeerConnectionEvent, RTCPeerConnectionEventStream};
use rtc_peer::peer_connection::sdp::{RTCSdpType, RTCSessionDescription};
use rtc_peer::peer_connection::transport::RTCIceCandidateInit;
use rtc_peer::shared::error::{Error, Result};

pub fn init_log() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A one-section data channel description, valid for the `sdp` crate.
pub fn data_channel_sdp(session_id: u64, ufrag: &str, setup: &str) -> String {
    format!(
        "v=0\r\n\
o=- {session_id} 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
a=group:BUNDLE 0\r\n\
a=ice-options:trickle\r\n\
m=application 9 UDP/DTLS/SCTP webrtc-datachannel\r\n\
c=IN IP4 0.0.0.0\r\n\
a=ice-ufrag:{ufrag}\r\n\
a=ice-pwd:0123456789abcdefghijklmn\r\n\
a=setup:{setup}\r\n\
a=mid:0\r\n\
a=sctp-port:5000\r\n"
    )
}

pub fn new_peer(engine: &Arc<MockEngine>) -> RTCPeerConnection {
    RTCPeerConnection::new(engine.clone(), RTCConfiguration::default())
        .expect("peer connection with the default configuration")
}

/// A remote offer as another endpoint would send it.
pub fn remote_offer() -> RTCSessionDescription {
    RTCSessionDescription::offer(data_channel_sdp(9001, "remoteufrag", "actpass"))
        .expect("remote offer parses")
}

pub fn remote_answer() -> RTCSessionDescription {
    RTCSessionDescription::answer(data_channel_sdp(9002, "remoteufrag", "active"))
        .expect("remote answer parses")
}

pub fn host_candidate(foundation: &str, port: u16, priority: u32) -> RTCIceCandidateInit {
    RTCIceCandidateInit {
        candidate: format!("candidate:{foundation} 1 udp {priority} 192.168.1.10 {port} typ host"),
        sdp_mid: Some("0".to_owned()),
        sdp_mline_index: Some(0),
        username_fragment: None,
        url: None,
    }
}

#[derive(Default)]
pub struct MockState {
    pub next_session: u64,
    pub notifier: Option<EngineNotifier>,
    pub init_configs: Vec<RTCConfiguration>,
    pub updated_configs: Vec<RTCConfiguration>,
    pub closed_sessions: Vec<SessionHandle>,
    pub offers_created: u64,
    pub answers_created: u64,
    pub last_offer_options: Option<RTCOfferOptions>,
    pub applied_local: Vec<RTCSdpType>,
    pub applied_remote: Vec<RTCSdpType>,
    pub remote_candidates: Vec<String>,
    pub data_channels: Vec<(RTCDataChannelId, DataChannelParameters)>,
    pub deferred: Vec<DescriptionResponder>,
    /// Failure switches, checked on every call.
    pub fail_apply_local: bool,
    pub fail_apply_remote: bool,
    pub fail_add_candidate: bool,
    pub fail_create_data_channel: bool,
}

/// Synthesizes descriptions synchronously unless told to defer them, records every call
/// and lets tests raise notifications.
#[derive(Default)]
pub struct MockEngine {
    pub state: Mutex<MockState>,
    pub defer_descriptions: bool,
    pub fail_init: bool,
    /// Added to every data channel id the engine binds.
    pub id_skew: u16,
}

impl MockEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn deferred() -> Arc<Self> {
        Arc::new(Self {
            defer_descriptions: true,
            ..Default::default()
        })
    }

    pub fn notify(&self, event: EngineEvent) -> bool {
        let notifier = self.state.lock().unwrap().notifier.clone();
        notifier.map(|n| n.notify(event)).unwrap_or(false)
    }

    /// Completes the oldest deferred request.
    pub fn resolve_next(&self, result: Result<String>) {
        let responder = self.state.lock().unwrap().deferred.remove(0);
        responder.resolve(result);
    }

    /// Drops every deferred request unanswered.
    pub fn forget_deferred(&self) {
        let deferred: Vec<DescriptionResponder> = self.state.lock().unwrap().deferred.drain(..).collect();
        drop(deferred);
    }

    pub fn closed_sessions(&self) -> Vec<SessionHandle> {
        self.state.lock().unwrap().closed_sessions.clone()
    }

    pub fn remote_candidates(&self) -> Vec<String> {
        self.state.lock().unwrap().remote_candidates.clone()
    }

    pub fn bound_channel_ids(&self) -> Vec<RTCDataChannelId> {
        self.state
            .lock()
            .unwrap()
            .data_channels
            .iter()
            .map(|(id, _)| *id)
            .collect()
    }

    fn respond(&self, responder: DescriptionResponder, sdp: String) {
        if self.defer_descriptions {
            self.state.lock().unwrap().deferred.push(responder);
        } else {
            responder.resolve(Ok(sdp));
        }
    }
}

impl TransportEngine for MockEngine {
    fn init_session(
        &self,
        config: &RTCConfiguration,
        notifier: EngineNotifier,
    ) -> Result<SessionHandle> {
        if self.fail_init {
            return Err(Error::ErrEngineInit("out of sessions".to_owned()));
        }
        let mut state = self.state.lock().unwrap();
        state.next_session += 1;
        state.notifier = Some(notifier);
        state.init_configs.push(config.clone());
        Ok(SessionHandle(state.next_session))
    }

    fn create_offer_description(
        &self,
        handle: SessionHandle,
        options: &RTCOfferOptions,
        responder: DescriptionResponder,
    ) {
        let sdp = {
            let mut state = self.state.lock().unwrap();
            state.offers_created += 1;
            state.last_offer_options = Some(*options);
            let ufrag = format!("local{}x{}", handle.0, state.offers_created);
            data_channel_sdp(1000 + state.offers_created, &ufrag, "actpass")
        };
        self.respond(responder, sdp);
    }

    fn create_answer_description(
        &self,
        handle: SessionHandle,
        _options: &RTCAnswerOptions,
        responder: DescriptionResponder,
    ) {
        let sdp = {
            let mut state = self.state.lock().unwrap();
            state.answers_created += 1;
            let ufrag = format!("local{}x{}", handle.0, state.answers_created);
            data_channel_sdp(2000 + state.answers_created, &ufrag, "active")
        };
        self.respond(responder, sdp);
    }

    fn apply_local_description(
        &self,
        _handle: SessionHandle,
        description: &RTCSessionDescription,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_apply_local {
            return Err(Error::ErrEngineFailure(
                "local description not supported".to_owned(),
            ));
        }
        state.applied_local.push(description.sdp_type);
        Ok(())
    }

    fn apply_remote_description(
        &self,
        _handle: SessionHandle,
        description: &RTCSessionDescription,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_apply_remote {
            return Err(Error::ErrEngineFailure(
                "remote description not supported".to_owned(),
            ));
        }
        state.applied_remote.push(description.sdp_type);
        Ok(())
    }

    fn add_remote_candidate(&self, _handle: SessionHandle, candidate: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_add_candidate {
            return Err(Error::ErrEngineFailure("candidate not usable".to_owned()));
        }
        state.remote_candidates.push(candidate.to_owned());
        Ok(())
    }

    fn create_data_channel(
        &self,
        _handle: SessionHandle,
        id: RTCDataChannelId,
        params: &DataChannelParameters,
    ) -> Result<RTCDataChannelId> {
        let mut state = self.state.lock().unwrap();
        if state.fail_create_data_channel {
            return Err(Error::ErrEngineFailure("no sctp association".to_owned()));
        }
        state.data_channels.push((id, params.clone()));
        Ok(id.wrapping_add(self.id_skew))
    }

    fn close_session(&self, handle: SessionHandle) {
        self.state.lock().unwrap().closed_sessions.push(handle);
    }

    fn update_configuration(
        &self,
        _handle: SessionHandle,
        config: &RTCConfiguration,
    ) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .updated_configs
            .push(config.clone());
        Ok(())
    }
}

/// Receives events until `stop` matches one, failing after a generous timeout.
pub async fn collect_until(
    events: &mut RTCPeerConnectionEventStream,
    stop: impl Fn(&RTCPeerConnectionEvent) -> bool,
) -> Vec<RTCPeerConnectionEvent> {
    let mut seen = vec![];
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for events")
            .expect("event stream ended early");
        let done = stop(&event);
        seen.push(event);
        if done {
            return seen;
        }
    }
}

/// Every event left in a stream whose connection was closed.
pub async fn drain(events: &mut RTCPeerConnectionEventStream) -> Vec<RTCPeerConnectionEvent> {
    let mut seen = vec![];
    while let Ok(Some(event)) = tokio::time::timeout(Duration::from_secs(5), events.recv()).await {
        seen.push(event);
    }
    seen
}
