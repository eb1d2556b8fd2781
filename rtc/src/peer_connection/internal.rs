use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::event::RTCPeerConnectionEvent;
use super::event::data_channel_event::RTCDataChannelEvent;
use super::event::dispatcher::EventDispatcher;
use super::event::ice_event::RTCPeerConnectionIceEvent;
use super::pending::PendingOperations;
use crate::data_channel::{
    DataChannelIdPolarity, DataChannelRegistry, RTCDataChannel, RTCDataChannelState,
};
use crate::engine::{EngineEvent, SessionHandle, TransportEngine};
use crate::peer_connection::configuration::RTCConfiguration;
use crate::peer_connection::sdp::{
    MEDIA_KIND_APPLICATION, RTCMediaSection, RTCSdpOrigin, RTCSdpType, RTCSessionDescription,
};
use crate::peer_connection::state::{
    RTCIceConnectionState, RTCIceGatheringState, RTCPeerConnectionState, RTCSignalingState,
};
use crate::peer_connection::transport::{
    CandidateAddOutcome, CandidateSet, RTCIceCandidate, RTCIceCandidateInit,
};
use shared::error::{Error, Result};

/// Everything one connection shares between the application's threads and its delivery
/// thread.
pub(crate) struct PeerConnectionInner {
    pub(crate) engine: Arc<dyn TransportEngine>,
    pub(crate) core: Mutex<ConnectionCore>,
    pub(crate) pending: Arc<Mutex<PendingOperations>>,
    pub(crate) dispatcher: EventDispatcher,
}

/// The single mutual-exclusion domain of a connection.
pub(crate) struct ConnectionCore {
    pub(crate) session: Option<SessionHandle>,
    pub(crate) configuration: RTCConfiguration,

    pub(crate) signaling_state: RTCSignalingState,
    pub(crate) ice_gathering_state: RTCIceGatheringState,
    pub(crate) ice_connection_state: RTCIceConnectionState,
    pub(crate) peer_connection_state: RTCPeerConnectionState,
    pub(crate) can_trickle_ice_candidates: Option<bool>,

    pub(crate) current_local_description: Option<RTCSessionDescription>,
    pub(crate) pending_local_description: Option<RTCSessionDescription>,
    pub(crate) current_remote_description: Option<RTCSessionDescription>,
    pub(crate) pending_remote_description: Option<RTCSessionDescription>,
    pub(crate) last_offer: String,
    pub(crate) last_answer: String,

    pub(crate) local_candidates: CandidateSet,
    pub(crate) remote_candidates: CandidateSet,
    pub(crate) remote_end_of_candidates: bool,

    pub(crate) data_channels: DataChannelRegistry,
    pub(crate) polarity: Option<DataChannelIdPolarity>,

    pub(crate) negotiation_needed: bool,
    pub(crate) ice_restart_requested: bool,
    pub(crate) is_closed: bool,
}

impl ConnectionCore {
    pub(crate) fn new(configuration: RTCConfiguration) -> Self {
        Self {
            session: None,
            configuration,
            signaling_state: RTCSignalingState::Stable,
            ice_gathering_state: RTCIceGatheringState::New,
            ice_connection_state: RTCIceConnectionState::New,
            peer_connection_state: RTCPeerConnectionState::New,
            can_trickle_ice_candidates: None,
            current_local_description: None,
            pending_local_description: None,
            current_remote_description: None,
            pending_remote_description: None,
            last_offer: String::new(),
            last_answer: String::new(),
            local_candidates: CandidateSet::new(),
            remote_candidates: CandidateSet::new(),
            remote_end_of_candidates: false,
            data_channels: DataChannelRegistry::new(),
            polarity: None,
            negotiation_needed: false,
            ice_restart_requested: false,
            is_closed: false,
        }
    }

    pub(crate) fn session(&self) -> Result<SessionHandle> {
        if self.is_closed {
            return Err(Error::ErrConnectionClosed);
        }
        self.session.ok_or(Error::ErrConnectionClosed)
    }

    pub(crate) fn local_description(&self) -> Option<&RTCSessionDescription> {
        self.pending_local_description
            .as_ref()
            .or(self.current_local_description.as_ref())
    }

    pub(crate) fn remote_description(&self) -> Option<&RTCSessionDescription> {
        self.pending_remote_description
            .as_ref()
            .or(self.current_remote_description.as_ref())
    }

    pub(crate) fn local_media_sections(&self) -> Vec<RTCMediaSection> {
        self.local_description()
            .map(|desc| desc.media_sections())
            .unwrap_or_default()
    }

    pub(crate) fn remote_media_sections(&self) -> Vec<RTCMediaSection> {
        self.remote_description()
            .map(|desc| desc.media_sections())
            .unwrap_or_default()
    }

    /// Id parity in use, decided by who sent the first offer. `None` before that.
    pub(crate) fn data_channel_polarity(&self) -> Option<DataChannelIdPolarity> {
        self.polarity
    }

    /// Stores an applied description in the pending/current slots.
    // 4.4.1.6 Set the SessionDescription
    pub(crate) fn store_description(&mut self, desc: RTCSessionDescription) {
        let local = desc.origin() == RTCSdpOrigin::Local;

        if desc.sdp_type == RTCSdpType::Offer && self.polarity.is_none() {
            let polarity = if local {
                DataChannelIdPolarity::Even
            } else {
                DataChannelIdPolarity::Odd
            };
            log::debug!("data channel ids use {polarity:?} polarity");
            self.polarity = Some(polarity);
        }

        match (local, desc.sdp_type) {
            // stable->SetLocal(offer)->have-local-offer
            // have-remote-offer->SetLocal(pranswer)->have-local-pranswer
            (true, RTCSdpType::Offer | RTCSdpType::Pranswer) => {
                self.pending_local_description = Some(desc);
            }
            // have-remote-offer->SetLocal(answer)->stable
            // have-local-pranswer->SetLocal(answer)->stable
            (true, RTCSdpType::Answer) => {
                self.current_local_description = Some(desc);
                self.current_remote_description = self.pending_remote_description.take();
                self.pending_local_description = None;
            }
            (true, _) => {
                self.pending_local_description = None;
            }
            // stable->SetRemote(offer)->have-remote-offer
            // have-local-offer->SetRemote(pranswer)->have-remote-pranswer
            (false, RTCSdpType::Offer | RTCSdpType::Pranswer) => {
                self.pending_remote_description = Some(desc);
            }
            // have-local-offer->SetRemote(answer)->stable
            // have-remote-pranswer->SetRemote(answer)->stable
            (false, RTCSdpType::Answer) => {
                self.current_remote_description = Some(desc);
                self.current_local_description = self.pending_local_description.take();
                self.pending_remote_description = None;
            }
            (false, _) => {
                self.pending_remote_description = None;
            }
        }
    }

    /// Moves to `next` and returns the events the move raises.
    pub(crate) fn do_signaling_state_change(
        &mut self,
        next: RTCSignalingState,
    ) -> Vec<RTCPeerConnectionEvent> {
        let mut events = vec![];
        if self.signaling_state == next {
            return events;
        }
        log::info!("signaling state changed to {next}");
        self.signaling_state = next;
        events.push(RTCPeerConnectionEvent::OnSignalingStateChangeEvent(next));

        if next == RTCSignalingState::Stable && self.negotiation_needed {
            self.negotiation_needed = false;
            log::debug!("firing deferred negotiationneeded");
            events.push(RTCPeerConnectionEvent::OnNegotiationNeededEvent);
        }
        events
    }

    /// Requests a new offer/answer exchange. Fires now when signaling is stable, otherwise
    /// on the next return to stable.
    // https://www.w3.org/TR/webrtc/#updating-the-negotiation-needed-flag
    pub(crate) fn trigger_negotiation_needed(&mut self) -> Option<RTCPeerConnectionEvent> {
        if self.is_closed {
            return None;
        }
        if self.signaling_state != RTCSignalingState::Stable {
            log::debug!(
                "negotiationneeded deferred while signaling is {}",
                self.signaling_state
            );
            self.negotiation_needed = true;
            return None;
        }
        self.negotiation_needed = false;
        Some(RTCPeerConnectionEvent::OnNegotiationNeededEvent)
    }

    /// Whether the negotiated local description carries an `m=application` section.
    pub(crate) fn has_negotiated_data_section(&self) -> bool {
        self.current_local_description.as_ref().is_some_and(|desc| {
            desc.media_sections()
                .iter()
                .any(|section| section.kind == MEDIA_KIND_APPLICATION)
        })
    }

    fn update_ice_connection_state(
        &mut self,
        state: RTCIceConnectionState,
        events: &mut Vec<RTCPeerConnectionEvent>,
    ) {
        if self.ice_connection_state == state {
            return;
        }
        log::info!("ICE connection state changed: {state}");
        self.ice_connection_state = state;
        events.push(RTCPeerConnectionEvent::OnIceConnectionStateChangeEvent(state));
        self.update_connection_state(events);
    }

    /// Update the PeerConnectionState given the state of the ICE transport
    /// <https://www.w3.org/TR/webrtc/#rtcpeerconnectionstate-enum>
    pub(crate) fn update_connection_state(&mut self, events: &mut Vec<RTCPeerConnectionEvent>) {
        let connection_state = if self.is_closed {
            RTCPeerConnectionState::Closed
        } else {
            RTCPeerConnectionState::from(self.ice_connection_state)
        };
        if self.peer_connection_state == connection_state {
            return;
        }

        log::info!("peer connection state changed: {connection_state}");
        self.peer_connection_state = connection_state;
        events.push(RTCPeerConnectionEvent::OnConnectionStateChangeEvent(
            connection_state,
        ));
    }

    /// Marks the connection closed and returns the events closing raises, in order.
    pub(crate) fn close(&mut self) -> Vec<RTCPeerConnectionEvent> {
        self.is_closed = true;
        self.negotiation_needed = false;

        let mut events: Vec<RTCPeerConnectionEvent> = self
            .data_channels
            .close_all()
            .into_iter()
            .filter_map(|channel| channel.id())
            .map(|id| RTCPeerConnectionEvent::OnDataChannel(RTCDataChannelEvent::OnClose(id)))
            .collect();

        if self.signaling_state != RTCSignalingState::Closed {
            log::info!("signaling state changed to {}", RTCSignalingState::Closed);
            self.signaling_state = RTCSignalingState::Closed;
            events.push(RTCPeerConnectionEvent::OnSignalingStateChangeEvent(
                RTCSignalingState::Closed,
            ));
        }
        self.update_ice_connection_state(RTCIceConnectionState::Closed, &mut events);
        events
    }

    fn on_local_candidate(&mut self, init: RTCIceCandidateInit) -> Vec<RTCPeerConnectionEvent> {
        if init.is_end_of_candidates() {
            // the end of a round is reported through the gathering state
            log::debug!("ignoring end-of-candidates notification");
            return vec![];
        }
        let candidate = match RTCIceCandidate::from_init(&init) {
            Ok(candidate) => candidate,
            Err(err) => {
                log::warn!("dropping malformed local candidate {:?}: {err}", init.candidate);
                return vec![];
            }
        };

        let policy = self.configuration.ice_transport_policy();
        if !policy.permits(candidate.typ) {
            log::warn!("dropping {} candidate under {policy} policy", candidate.typ);
            return vec![];
        }

        match self.local_candidates.add(candidate.clone()) {
            CandidateAddOutcome::Accepted => {
                vec![RTCPeerConnectionEvent::OnIceCandidateEvent(
                    RTCPeerConnectionIceEvent {
                        candidate: Some(candidate),
                        url: init.url.unwrap_or_default(),
                    },
                )]
            }
            CandidateAddOutcome::Duplicate => {
                log::debug!("engine reported {candidate} twice");
                vec![]
            }
            CandidateAddOutcome::Rejected(reason) => {
                log::warn!("dropping local candidate {candidate}: {reason}");
                vec![]
            }
        }
    }

    fn on_gathering_state_change(
        &mut self,
        state: RTCIceGatheringState,
    ) -> Vec<RTCPeerConnectionEvent> {
        if state == RTCIceGatheringState::Complete {
            if !self.local_candidates.gathering_complete() {
                return vec![];
            }
            log::info!("ICE gathering state changed: {state}");
            self.ice_gathering_state = state;
            return vec![
                RTCPeerConnectionEvent::OnIceGatheringStateChangeEvent(state),
                RTCPeerConnectionEvent::OnIceCandidateEvent(RTCPeerConnectionIceEvent::default()),
            ];
        }

        if !self.ice_gathering_state.advances_to(state) {
            log::warn!(
                "ignoring ICE gathering state {state} after {}",
                self.ice_gathering_state
            );
            return vec![];
        }
        log::info!("ICE gathering state changed: {state}");
        self.ice_gathering_state = state;
        vec![RTCPeerConnectionEvent::OnIceGatheringStateChangeEvent(state)]
    }

    fn on_data_channel_state(
        &mut self,
        id: u16,
        state: RTCDataChannelState,
    ) -> Vec<RTCPeerConnectionEvent> {
        match self.data_channels.set_state(id, state) {
            Ok(previous) if previous == state => vec![],
            Ok(_) => {
                let event = match state {
                    RTCDataChannelState::Open => RTCDataChannelEvent::OnOpen(id),
                    RTCDataChannelState::Closing => RTCDataChannelEvent::OnClosing(id),
                    _ => RTCDataChannelEvent::OnClose(id),
                };
                vec![RTCPeerConnectionEvent::OnDataChannel(event)]
            }
            Err(err) => {
                log::warn!("data channel {id} cannot move to {state}: {err}");
                vec![]
            }
        }
    }

    /// Applies one engine notification and returns the events it raises.
    pub(crate) fn translate(&mut self, event: EngineEvent) -> Vec<RTCPeerConnectionEvent> {
        if self.is_closed {
            log::trace!("connection closed, dropping engine notification {event}");
            return vec![];
        }

        match event {
            EngineEvent::Candidate(init) => self.on_local_candidate(init),
            EngineEvent::CandidateError(err) => {
                log::warn!(
                    "ICE server {} failed with {}: {}",
                    err.url,
                    err.error_code,
                    err.error_text
                );
                vec![RTCPeerConnectionEvent::OnIceCandidateErrorEvent(err)]
            }
            EngineEvent::GatheringStateChange(state) => self.on_gathering_state_change(state),
            EngineEvent::IceConnectionStateChange(state) => {
                let mut events = vec![];
                if state.is_engine_reportable() {
                    self.update_ice_connection_state(state, &mut events);
                } else {
                    log::warn!("engine cannot move ICE connection state to {state}");
                }
                events
            }
            EngineEvent::DataChannelOpen(id) => {
                self.on_data_channel_state(id, RTCDataChannelState::Open)
            }
            EngineEvent::DataChannelClosing(id) => {
                self.on_data_channel_state(id, RTCDataChannelState::Closing)
            }
            EngineEvent::DataChannelClosed(id) => {
                self.on_data_channel_state(id, RTCDataChannelState::Closed)
            }
            EngineEvent::RemoteDataChannel { id, params } => {
                let channel = RTCDataChannel::new(Some(id), &params);
                match self.data_channels.register(channel.clone()) {
                    Ok(()) => {
                        log::debug!("remote peer opened data channel {id} ({})", params.label);
                        vec![RTCPeerConnectionEvent::OnDataChannel(
                            RTCDataChannelEvent::OnDataChannel(channel),
                        )]
                    }
                    Err(err) => {
                        log::warn!("rejecting remote data channel {id}: {err}");
                        vec![]
                    }
                }
            }
            EngineEvent::NegotiationNeeded => self.trigger_negotiation_needed().into_iter().collect(),
            EngineEvent::Failure(reason) => {
                log::error!("transport engine failure: {reason}");
                let mut events = vec![];
                self.update_ice_connection_state(RTCIceConnectionState::Failed, &mut events);
                events.push(RTCPeerConnectionEvent::OnErrorEvent(Error::ErrEngineFailure(
                    reason,
                )));
                events
            }
        }
    }
}

impl PeerConnectionInner {
    pub(crate) fn lock_core(&self) -> MutexGuard<'_, ConnectionCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Releases the engine session and settles pending requests. Runs once per connection.
    pub(crate) fn shutdown(&self, core: &mut ConnectionCore) -> Option<SessionHandle> {
        let aborted = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .abort_all();
        if aborted > 0 {
            log::debug!("aborted {aborted} pending description request(s)");
        }
        core.session.take()
    }
}

impl Drop for PeerConnectionInner {
    fn drop(&mut self) {
        let core = self.core.get_mut().unwrap_or_else(PoisonError::into_inner);
        if core.is_closed {
            return;
        }
        core.is_closed = true;
        let aborted = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .abort_all();
        if let Some(handle) = core.session.take() {
            log::debug!("releasing {handle} of a dropped connection ({aborted} aborted)");
            self.engine.close_session(handle);
        }
    }
}
