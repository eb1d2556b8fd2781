//! Events a peer connection raises, and the two ways to consume them.
//!
//! Every event of a connection passes through one ordered queue and is delivered on the
//! connection's delivery thread, never on an engine thread and never on the thread that
//! called into the connection:
//!
//! - push: register an [`RTCPeerConnectionEventHandler`] with
//!   [`RTCPeerConnection::on_event`](crate::peer_connection::RTCPeerConnection::on_event);
//! - pull: take an [`RTCPeerConnectionEventStream`] from
//!   [`RTCPeerConnection::subscribe`](crate::peer_connection::RTCPeerConnection::subscribe).
//!
//! Both see the same events in the same order.

use crate::peer_connection::event::data_channel_event::RTCDataChannelEvent;
use crate::peer_connection::event::ice_error_event::RTCPeerConnectionIceErrorEvent;
use crate::peer_connection::event::ice_event::RTCPeerConnectionIceEvent;
use crate::peer_connection::state::ice_connection_state::RTCIceConnectionState;
use crate::peer_connection::state::ice_gathering_state::RTCIceGatheringState;
use crate::peer_connection::state::peer_connection_state::RTCPeerConnectionState;
use crate::peer_connection::state::signaling_state::RTCSignalingState;
use shared::error::Error;

pub mod data_channel_event;
pub(crate) mod dispatcher;
pub mod ice_error_event;
pub mod ice_event;

pub use dispatcher::RTCPeerConnectionEventStream;

#[allow(clippy::enum_variant_names)]
#[derive(Default, Debug, Clone, PartialEq)]
pub enum RTCPeerConnectionEvent {
    #[default]
    OnNegotiationNeededEvent,
    OnIceCandidateEvent(RTCPeerConnectionIceEvent),
    OnIceCandidateErrorEvent(RTCPeerConnectionIceErrorEvent),
    OnSignalingStateChangeEvent(RTCSignalingState),
    OnIceConnectionStateChangeEvent(RTCIceConnectionState),
    OnIceGatheringStateChangeEvent(RTCIceGatheringState),
    OnConnectionStateChangeEvent(RTCPeerConnectionState),

    // The Peer-to-peer data API extends the RTCPeerConnection interface as described below.
    OnDataChannel(RTCDataChannelEvent),

    /// An error the engine raised asynchronously.
    OnErrorEvent(Error),
}

impl RTCPeerConnectionEvent {
    /// The W3C event type name.
    pub fn name(&self) -> &'static str {
        match self {
            RTCPeerConnectionEvent::OnNegotiationNeededEvent => "negotiationneeded",
            RTCPeerConnectionEvent::OnIceCandidateEvent(_) => "icecandidate",
            RTCPeerConnectionEvent::OnIceCandidateErrorEvent(_) => "icecandidateerror",
            RTCPeerConnectionEvent::OnSignalingStateChangeEvent(_) => "signalingstatechange",
            RTCPeerConnectionEvent::OnIceConnectionStateChangeEvent(_) => {
                "iceconnectionstatechange"
            }
            RTCPeerConnectionEvent::OnIceGatheringStateChangeEvent(_) => {
                "icegatheringstatechange"
            }
            RTCPeerConnectionEvent::OnConnectionStateChangeEvent(_) => "connectionstatechange",
            RTCPeerConnectionEvent::OnDataChannel(RTCDataChannelEvent::OnDataChannel(_)) => {
                "datachannel"
            }
            RTCPeerConnectionEvent::OnDataChannel(RTCDataChannelEvent::OnOpen(_)) => "open",
            RTCPeerConnectionEvent::OnDataChannel(RTCDataChannelEvent::OnClosing(_)) => "closing",
            RTCPeerConnectionEvent::OnDataChannel(RTCDataChannelEvent::OnClose(_)) => "close",
            RTCPeerConnectionEvent::OnErrorEvent(_) => "error",
        }
    }
}

/// Push-mode consumer of connection events.
///
/// Methods run on the connection's delivery thread, one event at a time, with no lock of the
/// connection held, so a handler may call back into the connection. A handler that blocks
/// delays every later event of the connection.
#[allow(unused_variables)]
pub trait RTCPeerConnectionEventHandler: Send + Sync {
    fn on_negotiation_needed(&self) {}

    fn on_ice_candidate(&self, event: &RTCPeerConnectionIceEvent) {}

    fn on_ice_candidate_error(&self, event: &RTCPeerConnectionIceErrorEvent) {}

    fn on_signaling_state_change(&self, state: RTCSignalingState) {}

    fn on_ice_connection_state_change(&self, state: RTCIceConnectionState) {}

    fn on_ice_gathering_state_change(&self, state: RTCIceGatheringState) {}

    fn on_connection_state_change(&self, state: RTCPeerConnectionState) {}

    fn on_data_channel(&self, event: &RTCDataChannelEvent) {}

    fn on_error(&self, error: &Error) {}
}

/// Routes one event to the matching handler method.
pub(crate) fn dispatch_to(handler: &dyn RTCPeerConnectionEventHandler, event: &RTCPeerConnectionEvent) {
    match event {
        RTCPeerConnectionEvent::OnNegotiationNeededEvent => handler.on_negotiation_needed(),
        RTCPeerConnectionEvent::OnIceCandidateEvent(e) => handler.on_ice_candidate(e),
        RTCPeerConnectionEvent::OnIceCandidateErrorEvent(e) => handler.on_ice_candidate_error(e),
        RTCPeerConnectionEvent::OnSignalingStateChangeEvent(s) => {
            handler.on_signaling_state_change(*s)
        }
        RTCPeerConnectionEvent::OnIceConnectionStateChangeEvent(s) => {
            handler.on_ice_connection_state_change(*s)
        }
        RTCPeerConnectionEvent::OnIceGatheringStateChangeEvent(s) => {
            handler.on_ice_gathering_state_change(*s)
        }
        RTCPeerConnectionEvent::OnConnectionStateChangeEvent(s) => {
            handler.on_connection_state_change(*s)
        }
        RTCPeerConnectionEvent::OnDataChannel(e) => handler.on_data_channel(e),
        RTCPeerConnectionEvent::OnErrorEvent(err) => handler.on_error(err),
    }
}
