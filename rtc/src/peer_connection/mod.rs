pub mod certificate;
pub mod configuration;
pub mod event;
mod internal;
pub(crate) mod pending;
pub mod sdp;
pub mod state;
pub mod transport;

use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use crate::data_channel::{
    DataChannelParameters, RTCDataChannel, RTCDataChannelId, RTCDataChannelInit,
};
use crate::engine::{DescriptionResponder, SessionHandle, TransportEngine};
use crate::peer_connection::configuration::{RTCAnswerOptions, RTCConfiguration, RTCOfferOptions};
use crate::peer_connection::event::dispatcher::EventDispatcher;
use crate::peer_connection::event::{
    RTCPeerConnectionEvent, RTCPeerConnectionEventHandler, RTCPeerConnectionEventStream,
};
use crate::peer_connection::internal::{ConnectionCore, PeerConnectionInner};
use crate::peer_connection::sdp::{RTCSdpOrigin, RTCSdpType, RTCSessionDescription};
use crate::peer_connection::state::{
    RTCIceConnectionState, RTCIceGatheringState, RTCPeerConnectionState, RTCSignalingState,
    SignalingOperation, next_signaling_state,
};
use crate::peer_connection::transport::{
    CandidateAddOutcome, RTCIceCandidate, RTCIceCandidateInit,
};
use shared::error::{Error, Result};

pub use pending::PendingDescription;

/// PeerConnection represents a WebRTC connection that establishes a
/// peer-to-peer communications with another PeerConnection instance in a
/// browser, or to another endpoint implementing the required protocols.
///
/// The connection owns one session of a [`TransportEngine`] and drives it through the
/// offer/answer exchange. Every method takes `&self`; calls from several threads are
/// serialized on one lock per connection. Events come out through
/// [`on_event`](Self::on_event) and [`subscribe`](Self::subscribe).
pub struct RTCPeerConnection {
    inner: Arc<PeerConnectionInner>,
}

impl RTCPeerConnection {
    /// creates a PeerConnection with RTCConfiguration
    ///
    /// The configuration is copied; changing the caller's value afterwards has no effect.
    /// Fails with an `EngineInit` class error when the engine cannot open a session and with
    /// an `InvalidConfiguration` class error for malformed ICE servers or expired
    /// certificates.
    pub fn new(engine: Arc<dyn TransportEngine>, configuration: RTCConfiguration) -> Result<Self> {
        configuration.validate()?;

        let engine_config = RTCConfiguration {
            ice_servers: configuration.get_ice_servers(),
            ..configuration.clone()
        };

        let inner = Arc::new_cyclic(|weak: &Weak<PeerConnectionInner>| {
            let weak = weak.clone();
            let dispatcher = EventDispatcher::new(Box::new(move |event| {
                let Some(inner) = weak.upgrade() else {
                    return vec![];
                };
                let mut core = inner.lock_core();
                core.translate(event)
            }));
            PeerConnectionInner {
                engine: Arc::clone(&engine),
                core: Mutex::new(ConnectionCore::new(configuration)),
                pending: Arc::new(Mutex::new(Default::default())),
                dispatcher,
            }
        });

        inner.dispatcher.start()?;
        let handle = engine
            .init_session(&engine_config, inner.dispatcher.notifier())
            .map_err(|err| match err {
                Error::ErrEngineInit(_) => err,
                other => Error::ErrEngineInit(other.to_string()),
            })?;
        log::debug!("peer connection created on {handle}");
        inner.lock_core().session = Some(handle);

        Ok(Self { inner })
    }

    /// create_offer asks the engine for an offer describing the local session
    /// <https://w3c.github.io/webrtc-pc/#dom-rtcpeerconnection-createoffer>
    ///
    /// State is not changed; apply the result with
    /// [`set_local_description`](Self::set_local_description).
    pub fn create_offer(&self, options: Option<RTCOfferOptions>) -> Result<PendingDescription> {
        let core = self.inner.core.lock()?;
        next_signaling_state(core.signaling_state, SignalingOperation::CreateOffer)?;
        let handle = core.session()?;

        let mut options = options.unwrap_or_default();
        if core.ice_restart_requested {
            options.ice_restart = true;
        }

        let (id, rx) = self.inner.pending.lock()?.register()?;
        let responder = DescriptionResponder::new(id, Arc::downgrade(&self.inner.pending));
        self.inner
            .engine
            .create_offer_description(handle, &options, responder);
        Ok(PendingDescription::new(rx, RTCSdpType::Offer, &self.inner))
    }

    /// create_answer asks the engine for an answer to the applied remote offer
    /// <https://w3c.github.io/webrtc-pc/#dom-rtcpeerconnection-createanswer>
    ///
    /// Allowed in `HaveRemoteOffer` and, after this side sent a pranswer, in
    /// `HaveLocalPranswer`, as in W3C. `HaveRemotePranswer` belongs to the offerer and is
    /// refused with `ErrIncorrectSignalingState`.
    pub fn create_answer(&self, options: Option<RTCAnswerOptions>) -> Result<PendingDescription> {
        let core = self.inner.core.lock()?;
        next_signaling_state(core.signaling_state, SignalingOperation::CreateAnswer)?;
        if core.remote_description().is_none() {
            return Err(Error::ErrNoRemoteDescription);
        }
        let handle = core.session()?;

        let options = options.unwrap_or_default();
        let (id, rx) = self.inner.pending.lock()?.register()?;
        let responder = DescriptionResponder::new(id, Arc::downgrade(&self.inner.pending));
        self.inner
            .engine
            .create_answer_description(handle, &options, responder);
        Ok(PendingDescription::new(rx, RTCSdpType::Answer, &self.inner))
    }

    /// set_local_description sets the SessionDescription of the local peer
    ///
    /// An offer, answer or pranswer with an empty payload stands for the last one created.
    /// A non-empty payload must equal it.
    pub fn set_local_description(&self, mut description: RTCSessionDescription) -> Result<()> {
        let mut core = self.inner.core.lock()?;
        if core.is_closed {
            return Err(Error::ErrConnectionClosed);
        }

        match description.sdp_type {
            RTCSdpType::Offer => {
                if description.sdp.is_empty() {
                    description.sdp.clone_from(&core.last_offer);
                } else if description.sdp != core.last_offer {
                    return Err(Error::ErrSDPDoesNotMatchOffer);
                }
            }
            RTCSdpType::Answer | RTCSdpType::Pranswer => {
                if description.sdp.is_empty() {
                    description.sdp.clone_from(&core.last_answer);
                } else if description.sdp != core.last_answer {
                    return Err(Error::ErrSDPDoesNotMatchAnswer);
                }
            }
            RTCSdpType::Rollback => {}
            RTCSdpType::Unspecified => {
                return Err(Error::ErrPeerConnSDPTypeInvalidValueSetLocalDescription);
            }
        }

        let next = next_signaling_state(
            core.signaling_state,
            SignalingOperation::SetLocal(description.sdp_type),
        )?;
        let mut description = description.with_origin(RTCSdpOrigin::Local);
        description.parse()?;

        let handle = core.session()?;
        self.inner
            .engine
            .apply_local_description(handle, &description)?;

        if description.sdp_type == RTCSdpType::Offer {
            core.ice_restart_requested = false;
        }
        core.store_description(description);
        let mut events = core.do_signaling_state_change(next);
        events.extend(self.assign_data_channel_ids(&mut core, handle));
        self.inner.dispatcher.emit_all(events);
        Ok(())
    }

    /// local_description returns PendingLocalDescription if it is not null and
    /// otherwise it returns CurrentLocalDescription. This property is used to
    /// determine if set_local_description has already been called.
    /// <https://www.w3.org/TR/webrtc/#dom-rtcpeerconnection-localdescription>
    pub fn local_description(&self) -> Option<RTCSessionDescription> {
        self.inner.lock_core().local_description().cloned()
    }

    pub fn current_local_description(&self) -> Option<RTCSessionDescription> {
        self.inner.lock_core().current_local_description.clone()
    }

    pub fn pending_local_description(&self) -> Option<RTCSessionDescription> {
        self.inner.lock_core().pending_local_description.clone()
    }

    /// set_remote_description sets the SessionDescription of the remote peer
    ///
    /// Remote candidates buffered for the media sections of `description` are handed to the
    /// engine afterwards, in the order they were added.
    pub fn set_remote_description(&self, description: RTCSessionDescription) -> Result<()> {
        let mut core = self.inner.core.lock()?;
        if core.is_closed {
            return Err(Error::ErrConnectionClosed);
        }
        if description.sdp_type == RTCSdpType::Unspecified {
            return Err(Error::ErrPeerConnSDPTypeInvalidValue);
        }

        let next = next_signaling_state(
            core.signaling_state,
            SignalingOperation::SetRemote(description.sdp_type),
        )?;
        let mut description = description.with_origin(RTCSdpOrigin::Remote);
        description.parse()?;

        let handle = core.session()?;
        self.inner
            .engine
            .apply_remote_description(handle, &description)?;

        if description.sdp_type != RTCSdpType::Rollback {
            core.can_trickle_ice_candidates = Some(description.has_trickle_option());
        }
        core.store_description(description);
        let mut events = core.do_signaling_state_change(next);
        events.extend(self.assign_data_channel_ids(&mut core, handle));
        self.inner.dispatcher.emit_all(events);

        self.flush_remote_candidates(&mut core);
        Ok(())
    }

    /// remote_description returns pending_remote_description if it is not null and
    /// otherwise it returns current_remote_description.
    /// <https://www.w3.org/TR/webrtc/#dom-rtcpeerconnection-remotedescription>
    pub fn remote_description(&self) -> Option<RTCSessionDescription> {
        self.inner.lock_core().remote_description().cloned()
    }

    pub fn current_remote_description(&self) -> Option<RTCSessionDescription> {
        self.inner.lock_core().current_remote_description.clone()
    }

    pub fn pending_remote_description(&self) -> Option<RTCSessionDescription> {
        self.inner.lock_core().pending_remote_description.clone()
    }

    /// Whether the remote peer announced trickle ICE support. `None` until a remote
    /// description is set.
    pub fn can_trickle_ice_candidates(&self) -> Option<bool> {
        self.inner.lock_core().can_trickle_ice_candidates
    }

    /// add_ice_candidate accepts a candidate trickled by the remote peer.
    ///
    /// Works before the remote description is set: the candidate is buffered and handed to
    /// the engine once its media section is known. Adding a known candidate again is a
    /// no-op. An empty `candidate` string marks the end of the remote candidates.
    pub fn add_ice_candidate(&self, candidate: RTCIceCandidateInit) -> Result<()> {
        let mut core = self.inner.core.lock()?;
        let handle = core.session()?;

        if candidate.is_end_of_candidates() {
            if core.remote_description().is_none() || core.remote_candidates.buffered_len() > 0 {
                log::debug!("holding remote end-of-candidates until buffered candidates flush");
                core.remote_end_of_candidates = true;
                return Ok(());
            }
            return self.inner.engine.add_remote_candidate(handle, "");
        }

        let parsed = RTCIceCandidate::from_init(&candidate)?;
        if parsed.sdp_mid.is_none() && parsed.sdp_mline_index.is_none() {
            return Err(Error::ErrCandidateMissingMediaReference);
        }
        if core.remote_description().is_some() {
            let sections = core.remote_media_sections();
            if !parsed.matches_section(&sections) {
                return Err(Error::ErrCandidateRejected(format!(
                    "no media section of the remote description matches {parsed}"
                )));
            }
        }

        match core.remote_candidates.add(parsed) {
            CandidateAddOutcome::Accepted => {
                if core.remote_description().is_some() {
                    self.deliver_remote_candidates(&mut core, handle)
                } else {
                    log::debug!(
                        "buffering remote candidate until the remote description is set ({} held)",
                        core.remote_candidates.buffered_len()
                    );
                    Ok(())
                }
            }
            CandidateAddOutcome::Duplicate => {
                log::debug!("ignoring duplicate remote candidate {}", candidate.candidate);
                Ok(())
            }
            CandidateAddOutcome::Rejected(reason) => Err(Error::ErrCandidateRejected(reason)),
        }
    }

    /// Hands every deliverable remote candidate to the engine. A candidate the engine
    /// refuses is forgotten, so the peer may add it again; the first refusal is returned
    /// once the others were delivered.
    fn deliver_remote_candidates(
        &self,
        core: &mut ConnectionCore,
        handle: SessionHandle,
    ) -> Result<()> {
        let sections = core.remote_media_sections();
        let mut refused = None;
        for candidate in core.remote_candidates.take_deliverable(&sections) {
            if let Err(err) = self
                .inner
                .engine
                .add_remote_candidate(handle, &candidate.marshal())
            {
                log::debug!("engine refused remote candidate {candidate}: {err}");
                core.remote_candidates.remove(&candidate);
                refused.get_or_insert(err);
            }
        }
        if core.remote_end_of_candidates && core.remote_candidates.buffered_len() == 0 {
            core.remote_end_of_candidates = false;
            self.inner.engine.add_remote_candidate(handle, "")?;
        }
        refused.map_or(Ok(()), Err)
    }

    fn flush_remote_candidates(&self, core: &mut ConnectionCore) {
        let Ok(handle) = core.session() else {
            return;
        };
        let buffered = core.remote_candidates.buffered_len();
        if buffered == 0 && !core.remote_end_of_candidates {
            return;
        }
        log::debug!("flushing {buffered} buffered remote candidate(s)");
        // the description is already applied; a candidate the engine refuses is only logged
        if let Err(err) = self.deliver_remote_candidates(core, handle) {
            log::warn!("engine refused a buffered remote candidate: {err}");
        }
    }

    /// Local candidates gathered for the `m=` section at `media_index`, highest priority
    /// first.
    pub fn local_candidates(&self, media_index: u16) -> Vec<RTCIceCandidate> {
        let core = self.inner.lock_core();
        core.local_candidates
            .candidates_for(media_index, &core.local_media_sections())
    }

    /// Remote candidates added for the `m=` section at `media_index`, highest priority
    /// first.
    pub fn remote_candidates(&self, media_index: u16) -> Vec<RTCIceCandidate> {
        let core = self.inner.lock_core();
        core.remote_candidates
            .candidates_for(media_index, &core.remote_media_sections())
    }

    /// restart_ice requests an ICE restart: the next offer carries new credentials.
    /// <https://w3c.github.io/webrtc-pc/#dom-rtcpeerconnection-restartice>
    pub fn restart_ice(&self) -> Result<()> {
        let mut core = self.inner.core.lock()?;
        if core.is_closed {
            return Ok(());
        }
        log::info!("ICE restart requested");
        core.ice_restart_requested = true;
        core.local_candidates.reset();
        core.ice_gathering_state = RTCIceGatheringState::New;
        if let Some(event) = core.trigger_negotiation_needed() {
            self.inner.dispatcher.emit(event);
        }
        Ok(())
    }

    /// get_configuration returns a copy of the current configuration
    pub fn get_configuration(&self) -> RTCConfiguration {
        self.inner.lock_core().configuration.clone()
    }

    /// set_configuration updates the ICE servers, ICE transport policy and candidate pool
    /// size. Identity, certificates and the bundle and rtcp-mux policies cannot change.
    /// <https://www.w3.org/TR/webrtc/#dom-rtcpeerconnection-setconfiguration>
    pub fn set_configuration(&self, mut configuration: RTCConfiguration) -> Result<()> {
        let mut core = self.inner.core.lock()?;
        let handle = core.session()?;
        core.configuration.check_update(&configuration)?;

        if configuration.peer_identity.is_empty() {
            configuration
                .peer_identity
                .clone_from(&core.configuration.peer_identity);
        }
        if configuration.certificates.is_empty() {
            configuration
                .certificates
                .clone_from(&core.configuration.certificates);
        }

        let engine_config = RTCConfiguration {
            ice_servers: configuration.get_ice_servers(),
            ..configuration.clone()
        };
        self.inner
            .engine
            .update_configuration(handle, &engine_config)?;
        core.configuration = configuration;
        Ok(())
    }

    /// create_data_channel creates a new DataChannel object with the given label
    /// and optional DataChannelInit used to configure properties of the
    /// underlying channel such as data reliability.
    ///
    /// Ids are even on the side that sent the first offer and odd on the other. An in-band
    /// channel created before any offer is applied has no id until then. The channel opens
    /// once negotiation completes.
    pub fn create_data_channel(
        &self,
        label: &str,
        options: Option<RTCDataChannelInit>,
    ) -> Result<RTCDataChannel> {
        let mut core = self.inner.core.lock()?;
        let handle = core.session()?;

        let options = options.unwrap_or_default();
        options.validate(label)?;

        let id = match options.negotiated {
            Some(id) => {
                if core.data_channels.contains(id) {
                    return Err(Error::ErrDataChannelIdInUse(id));
                }
                Some(id)
            }
            // the id stays unset until the first offer tells which parity is ours
            None => core
                .data_channel_polarity()
                .map(|polarity| core.data_channels.allocate_id(polarity, &mut rand::rng()))
                .transpose()?,
        };

        let params = options.to_parameters(label);
        if let Some(id) = id {
            self.bind_data_channel(handle, id, &params)?;
        }

        // https://www.w3.org/TR/webrtc/#dom-peerconnection-createdatachannel (Step 18)
        let first_in_band = !params.negotiated
            && !core.has_negotiated_data_section()
            && !core.data_channels.snapshot().iter().any(|c| !c.negotiated());

        let channel = RTCDataChannel::new(id, &params);
        core.data_channels.register(channel.clone())?;
        match id {
            Some(id) => log::debug!("data channel {id} ({label}) created"),
            None => log::debug!("data channel ({label}) created, id pending the first offer"),
        }

        if first_in_band {
            if let Some(event) = core.trigger_negotiation_needed() {
                self.inner.dispatcher.emit(event);
            }
        }
        Ok(channel)
    }

    fn bind_data_channel(
        &self,
        handle: SessionHandle,
        id: RTCDataChannelId,
        params: &DataChannelParameters,
    ) -> Result<()> {
        let bound = self.inner.engine.create_data_channel(handle, id, params)?;
        if bound != id {
            return Err(Error::ErrDataChannelIdMismatch {
                expected: id,
                actual: bound,
            });
        }
        Ok(())
    }

    /// Gives an id to every channel created before the id parity was known and opens it at
    /// the engine. A channel that cannot be opened is dropped and reported as an error
    /// event.
    fn assign_data_channel_ids(
        &self,
        core: &mut ConnectionCore,
        handle: SessionHandle,
    ) -> Vec<RTCPeerConnectionEvent> {
        let Some(polarity) = core.data_channel_polarity() else {
            return vec![];
        };

        let mut events = vec![];
        for mut channel in core.data_channels.take_unassigned() {
            let assigned = core
                .data_channels
                .allocate_id(polarity, &mut rand::rng())
                .and_then(|id| {
                    self.bind_data_channel(handle, id, &channel.parameters())?;
                    channel.id = Some(id);
                    core.data_channels.register(channel.clone())?;
                    Ok(id)
                });
            match assigned {
                Ok(id) => log::debug!("data channel {id} ({}) assigned its id", channel.label()),
                Err(err) => {
                    log::warn!("dropping data channel ({}): {err}", channel.label());
                    events.push(RTCPeerConnectionEvent::OnErrorEvent(err));
                }
            }
        }
        events
    }

    /// data_channel returns a snapshot of the channel with `id`, if it is still registered.
    pub fn data_channel(&self, id: RTCDataChannelId) -> Option<RTCDataChannel> {
        self.inner.lock_core().data_channels.lookup(id).cloned()
    }

    /// Snapshots of every open or opening channel, by ascending id.
    pub fn data_channels(&self) -> Vec<RTCDataChannel> {
        self.inner.lock_core().data_channels.snapshot()
    }

    /// close ends the connection: pending description requests resolve with
    /// `ErrOperationAborted`, every data channel closes, and the engine session is released.
    /// Closing again is a no-op.
    pub fn close(&self) -> Result<()> {
        let handle = {
            let mut core = self.inner.lock_core();
            // https://www.w3.org/TR/webrtc/#dom-rtcpeerconnection-close (step #1, #2)
            if core.is_closed {
                return Ok(());
            }
            let events = core.close();
            self.inner.dispatcher.emit_all(events);
            self.inner.shutdown(&mut core)
        };

        if let Some(handle) = handle {
            log::debug!("releasing {handle}");
            self.inner.engine.close_session(handle);
        }
        self.inner.dispatcher.close();
        Ok(())
    }

    /// Registers a push-mode consumer for every event raised from now on.
    pub fn on_event(&self, handler: Arc<dyn RTCPeerConnectionEventHandler>) {
        self.inner.dispatcher.add_handler(handler);
    }

    /// Opens a pull-mode stream of every event raised from now on.
    pub fn subscribe(&self) -> RTCPeerConnectionEventStream {
        self.inner.dispatcher.subscribe()
    }

    pub fn signaling_state(&self) -> RTCSignalingState {
        self.inner.lock_core().signaling_state
    }

    pub fn ice_gathering_state(&self) -> RTCIceGatheringState {
        self.inner.lock_core().ice_gathering_state
    }

    pub fn ice_connection_state(&self) -> RTCIceConnectionState {
        self.inner.lock_core().ice_connection_state
    }

    pub fn connection_state(&self) -> RTCPeerConnectionState {
        self.inner.lock_core().peer_connection_state
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock_core().is_closed
    }
}

impl fmt::Debug for RTCPeerConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.inner.lock_core();
        f.debug_struct("RTCPeerConnection")
            .field("session", &core.session)
            .field("signaling_state", &core.signaling_state)
            .field("ice_connection_state", &core.ice_connection_state)
            .field("data_channels", &core.data_channels.len())
            .finish()
    }
}
