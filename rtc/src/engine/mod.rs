//! Boundary to the transport/media engine.
//!
//! The engine gathers candidates, runs connectivity checks, performs the DTLS handshake and
//! carries SCTP for data channels. None of that lives in this crate: a peer connection only
//! drives an engine session through [`TransportEngine`] and listens to what the engine
//! reports through an [`EngineNotifier`].
//!
//! Engines call back from their own threads. Notifications are queued and delivered to the
//! application on the connection's delivery thread, so an engine never has its own callbacks
//! re-entered.

use std::fmt;
use std::sync::{Mutex, PoisonError, Weak};

use crate::data_channel::{DataChannelParameters, RTCDataChannelId};
use crate::peer_connection::configuration::{RTCAnswerOptions, RTCConfiguration, RTCOfferOptions};
use crate::peer_connection::event::dispatcher::DispatcherShared;
use crate::peer_connection::event::ice_error_event::RTCPeerConnectionIceErrorEvent;
use crate::peer_connection::pending::PendingOperations;
use crate::peer_connection::sdp::RTCSessionDescription;
use crate::peer_connection::state::{RTCIceConnectionState, RTCIceGatheringState};
use crate::peer_connection::transport::RTCIceCandidateInit;
use shared::error::{Error, Result};

/// Opaque id of one engine session. A session belongs to exactly one peer connection and is
/// closed exactly once.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SessionHandle(pub u64);

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

/// Something the engine observed on a session.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A local candidate was gathered.
    Candidate(RTCIceCandidateInit),
    /// A STUN or TURN server could not be used.
    CandidateError(RTCPeerConnectionIceErrorEvent),
    /// Gathering progressed. `Complete` is reported even when gathering timed out.
    GatheringStateChange(RTCIceGatheringState),
    IceConnectionStateChange(RTCIceConnectionState),
    DataChannelOpen(RTCDataChannelId),
    DataChannelClosing(RTCDataChannelId),
    DataChannelClosed(RTCDataChannelId),
    /// The remote peer opened a channel in-band.
    RemoteDataChannel {
        id: RTCDataChannelId,
        params: DataChannelParameters,
    },
    /// The session needs a new offer/answer exchange.
    NegotiationNeeded,
    /// Unrecoverable internal error. The connection fails but stays open for renegotiation.
    Failure(String),
}

impl fmt::Display for EngineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineEvent::Candidate(init) => write!(f, "candidate({})", init.candidate),
            EngineEvent::CandidateError(e) => write!(f, "candidate-error({})", e.error_code),
            EngineEvent::GatheringStateChange(s) => write!(f, "gathering({s})"),
            EngineEvent::IceConnectionStateChange(s) => write!(f, "ice-connection({s})"),
            EngineEvent::DataChannelOpen(id) => write!(f, "datachannel-open({id})"),
            EngineEvent::DataChannelClosing(id) => write!(f, "datachannel-closing({id})"),
            EngineEvent::DataChannelClosed(id) => write!(f, "datachannel-closed({id})"),
            EngineEvent::RemoteDataChannel { id, params } => {
                write!(f, "remote-datachannel({id}, {})", params.label)
            }
            EngineEvent::NegotiationNeeded => write!(f, "negotiation-needed"),
            EngineEvent::Failure(reason) => write!(f, "failure({reason})"),
        }
    }
}

/// The operations a peer connection needs from a transport/media engine.
///
/// Calls are made with the connection's state lock held and must not block on the
/// connection. Description synthesis may finish later: the engine keeps the
/// [`DescriptionResponder`] and resolves it from any thread.
pub trait TransportEngine: Send + Sync {
    /// Creates a session. `notifier` stays valid for the session's lifetime.
    fn init_session(
        &self,
        config: &RTCConfiguration,
        notifier: EngineNotifier,
    ) -> Result<SessionHandle>;

    fn create_offer_description(
        &self,
        handle: SessionHandle,
        options: &RTCOfferOptions,
        responder: DescriptionResponder,
    );

    fn create_answer_description(
        &self,
        handle: SessionHandle,
        options: &RTCAnswerOptions,
        responder: DescriptionResponder,
    );

    fn apply_local_description(
        &self,
        handle: SessionHandle,
        description: &RTCSessionDescription,
    ) -> Result<()>;

    fn apply_remote_description(
        &self,
        handle: SessionHandle,
        description: &RTCSessionDescription,
    ) -> Result<()>;

    /// `candidate` is an RFC 8839 attribute value. An empty string marks the end of the
    /// remote candidates.
    fn add_remote_candidate(&self, handle: SessionHandle, candidate: &str) -> Result<()>;

    /// Opens a channel with the id chosen by the connection and returns the id the engine
    /// bound it to. For an in-band channel created before the first offer, this is called
    /// while that offer is being set.
    fn create_data_channel(
        &self,
        handle: SessionHandle,
        id: RTCDataChannelId,
        params: &DataChannelParameters,
    ) -> Result<RTCDataChannelId>;

    fn close_session(&self, handle: SessionHandle);

    /// ICE servers, transport policy or pool size changed.
    fn update_configuration(
        &self,
        _handle: SessionHandle,
        _config: &RTCConfiguration,
    ) -> Result<()> {
        Ok(())
    }
}

/// Hands engine notifications to the connection's event queue.
///
/// Cheap to clone; it holds no strong reference to the connection. Once the connection is
/// closed or dropped every notification is discarded.
#[derive(Clone)]
pub struct EngineNotifier {
    queue: Weak<DispatcherShared>,
}

impl EngineNotifier {
    pub(crate) fn new(queue: Weak<DispatcherShared>) -> Self {
        Self { queue }
    }

    /// Queues `event`. Returns `false` when the connection no longer accepts notifications.
    pub fn notify(&self, event: EngineEvent) -> bool {
        match self.queue.upgrade() {
            Some(queue) => queue.push_engine(event),
            None => {
                log::trace!("dropping {event}: connection is gone");
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.queue.upgrade().is_none_or(|queue| queue.is_closed())
    }
}

impl fmt::Debug for EngineNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineNotifier")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Completion slot of one `create_offer`/`create_answer` request.
///
/// Resolve it exactly once with the synthesized SDP or an error. A responder dropped
/// unresolved completes the request with [`Error::ErrEngineFailure`], so a caller never
/// waits on a request the engine forgot.
pub struct DescriptionResponder {
    id: u64,
    pending: Weak<Mutex<PendingOperations>>,
    resolved: bool,
}

impl DescriptionResponder {
    pub(crate) fn new(id: u64, pending: Weak<Mutex<PendingOperations>>) -> Self {
        Self {
            id,
            pending,
            resolved: false,
        }
    }

    pub fn resolve(mut self, result: Result<String>) {
        self.complete(result);
    }

    fn complete(&mut self, result: Result<String>) {
        if self.resolved {
            return;
        }
        self.resolved = true;

        let Some(pending) = self.pending.upgrade() else {
            log::debug!("description request {} outlived its connection", self.id);
            return;
        };
        let mut pending = pending.lock().unwrap_or_else(PoisonError::into_inner);
        if !pending.complete(self.id, result) {
            log::debug!("description request {} was already settled", self.id);
        }
    }
}

impl Drop for DescriptionResponder {
    fn drop(&mut self) {
        if !self.resolved {
            log::warn!("description request {} dropped without an answer", self.id);
        }
        self.complete(Err(Error::ErrEngineFailure(
            "engine dropped the description request".to_owned(),
        )));
    }
}

impl fmt::Debug for DescriptionResponder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptionResponder")
            .field("id", &self.id)
            .field("resolved", &self.resolved)
            .finish()
    }
}
