use crate::peer_connection::configuration::UNSPECIFIED_STR;
use crate::peer_connection::state::RTCIceConnectionState;
use std::fmt;

/// Aggregate state of the connection, derived from the ICE connection state.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RTCPeerConnectionState {
    #[default]
    Unspecified,

    New,

    Connecting,

    Connected,

    Disconnected,

    Failed,

    Closed,
}

const PEER_CONNECTION_STATE_NEW_STR: &str = "new";
const PEER_CONNECTION_STATE_CONNECTING_STR: &str = "connecting";
const PEER_CONNECTION_STATE_CONNECTED_STR: &str = "connected";
const PEER_CONNECTION_STATE_DISCONNECTED_STR: &str = "disconnected";
const PEER_CONNECTION_STATE_FAILED_STR: &str = "failed";
const PEER_CONNECTION_STATE_CLOSED_STR: &str = "closed";

impl From<&str> for RTCPeerConnectionState {
    fn from(raw: &str) -> Self {
        match raw {
            PEER_CONNECTION_STATE_NEW_STR => RTCPeerConnectionState::New,
            PEER_CONNECTION_STATE_CONNECTING_STR => RTCPeerConnectionState::Connecting,
            PEER_CONNECTION_STATE_CONNECTED_STR => RTCPeerConnectionState::Connected,
            PEER_CONNECTION_STATE_DISCONNECTED_STR => RTCPeerConnectionState::Disconnected,
            PEER_CONNECTION_STATE_FAILED_STR => RTCPeerConnectionState::Failed,
            PEER_CONNECTION_STATE_CLOSED_STR => RTCPeerConnectionState::Closed,
            _ => RTCPeerConnectionState::Unspecified,
        }
    }
}

impl From<RTCIceConnectionState> for RTCPeerConnectionState {
    fn from(ice: RTCIceConnectionState) -> Self {
        match ice {
            RTCIceConnectionState::New => RTCPeerConnectionState::New,
            RTCIceConnectionState::Checking => RTCPeerConnectionState::Connecting,
            RTCIceConnectionState::Connected | RTCIceConnectionState::Completed => {
                RTCPeerConnectionState::Connected
            }
            RTCIceConnectionState::Disconnected => RTCPeerConnectionState::Disconnected,
            RTCIceConnectionState::Failed => RTCPeerConnectionState::Failed,
            RTCIceConnectionState::Closed => RTCPeerConnectionState::Closed,
            RTCIceConnectionState::Unspecified => RTCPeerConnectionState::Unspecified,
        }
    }
}

impl fmt::Display for RTCPeerConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTCPeerConnectionState::New => PEER_CONNECTION_STATE_NEW_STR,
            RTCPeerConnectionState::Connecting => PEER_CONNECTION_STATE_CONNECTING_STR,
            RTCPeerConnectionState::Connected => PEER_CONNECTION_STATE_CONNECTED_STR,
            RTCPeerConnectionState::Disconnected => PEER_CONNECTION_STATE_DISCONNECTED_STR,
            RTCPeerConnectionState::Failed => PEER_CONNECTION_STATE_FAILED_STR,
            RTCPeerConnectionState::Closed => PEER_CONNECTION_STATE_CLOSED_STR,
            RTCPeerConnectionState::Unspecified => UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}
