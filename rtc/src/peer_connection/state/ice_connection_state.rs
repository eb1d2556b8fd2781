use crate::peer_connection::configuration::UNSPECIFIED_STR;
use std::fmt;

/// Connectivity of the ICE transport as reported by the transport engine.
///
/// The application never sets this state. `Failed` is also entered when the engine
/// reports an unrecoverable internal error; the connection stays usable for an ICE
/// restart until it is closed.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RTCIceConnectionState {
    /// State not specified. This should not occur in normal operation.
    #[default]
    Unspecified,

    /// Waiting for remote candidates or not yet checking.
    New,

    /// Candidate pairs are being checked.
    Checking,

    /// A usable pair has been found for every component.
    Connected,

    /// Checking has finished and a pair was selected for every component.
    Completed,

    /// Connectivity was lost; it may come back without a restart.
    Disconnected,

    /// No usable pair; requires an ICE restart.
    Failed,

    /// The connection has been closed.
    Closed,
}

const ICE_CONNECTION_STATE_NEW_STR: &str = "new";
const ICE_CONNECTION_STATE_CHECKING_STR: &str = "checking";
const ICE_CONNECTION_STATE_CONNECTED_STR: &str = "connected";
const ICE_CONNECTION_STATE_COMPLETED_STR: &str = "completed";
const ICE_CONNECTION_STATE_DISCONNECTED_STR: &str = "disconnected";
const ICE_CONNECTION_STATE_FAILED_STR: &str = "failed";
const ICE_CONNECTION_STATE_CLOSED_STR: &str = "closed";

impl From<&str> for RTCIceConnectionState {
    fn from(raw: &str) -> Self {
        match raw {
            ICE_CONNECTION_STATE_NEW_STR => RTCIceConnectionState::New,
            ICE_CONNECTION_STATE_CHECKING_STR => RTCIceConnectionState::Checking,
            ICE_CONNECTION_STATE_CONNECTED_STR => RTCIceConnectionState::Connected,
            ICE_CONNECTION_STATE_COMPLETED_STR => RTCIceConnectionState::Completed,
            ICE_CONNECTION_STATE_DISCONNECTED_STR => RTCIceConnectionState::Disconnected,
            ICE_CONNECTION_STATE_FAILED_STR => RTCIceConnectionState::Failed,
            ICE_CONNECTION_STATE_CLOSED_STR => RTCIceConnectionState::Closed,
            _ => RTCIceConnectionState::Unspecified,
        }
    }
}

impl fmt::Display for RTCIceConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTCIceConnectionState::New => ICE_CONNECTION_STATE_NEW_STR,
            RTCIceConnectionState::Checking => ICE_CONNECTION_STATE_CHECKING_STR,
            RTCIceConnectionState::Connected => ICE_CONNECTION_STATE_CONNECTED_STR,
            RTCIceConnectionState::Completed => ICE_CONNECTION_STATE_COMPLETED_STR,
            RTCIceConnectionState::Disconnected => ICE_CONNECTION_STATE_DISCONNECTED_STR,
            RTCIceConnectionState::Failed => ICE_CONNECTION_STATE_FAILED_STR,
            RTCIceConnectionState::Closed => ICE_CONNECTION_STATE_CLOSED_STR,
            RTCIceConnectionState::Unspecified => UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}

impl RTCIceConnectionState {
    /// Whether the engine may move the connection into this state. `Closed` is reserved for
    /// `close()`.
    pub(crate) fn is_engine_reportable(self) -> bool {
        !matches!(
            self,
            RTCIceConnectionState::Unspecified | RTCIceConnectionState::Closed
        )
    }
}
