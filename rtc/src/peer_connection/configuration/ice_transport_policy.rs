use std::fmt;

use serde::{Deserialize, Serialize};

use crate::peer_connection::transport::RTCIceCandidateType;

/// Which local candidates the engine may use.
#[derive(Default, Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
pub enum RTCIceTransportPolicy {
    Unspecified = 0,

    /// Any candidate type.
    #[default]
    #[serde(rename = "all")]
    All = 1,

    /// Only TURN relay candidates; hides local addresses from the remote peer.
    #[serde(rename = "relay")]
    Relay = 2,
}

const ICE_TRANSPORT_POLICY_RELAY_STR: &str = "relay";
const ICE_TRANSPORT_POLICY_ALL_STR: &str = "all";

impl From<&str> for RTCIceTransportPolicy {
    fn from(raw: &str) -> Self {
        match raw {
            ICE_TRANSPORT_POLICY_RELAY_STR => RTCIceTransportPolicy::Relay,
            ICE_TRANSPORT_POLICY_ALL_STR => RTCIceTransportPolicy::All,
            _ => RTCIceTransportPolicy::Unspecified,
        }
    }
}

impl fmt::Display for RTCIceTransportPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTCIceTransportPolicy::Relay => ICE_TRANSPORT_POLICY_RELAY_STR,
            RTCIceTransportPolicy::All => ICE_TRANSPORT_POLICY_ALL_STR,
            RTCIceTransportPolicy::Unspecified => super::UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}

impl RTCIceTransportPolicy {
    /// Reports whether a local candidate of type `typ` may be surfaced.
    pub fn permits(self, typ: RTCIceCandidateType) -> bool {
        match self {
            RTCIceTransportPolicy::Relay => typ == RTCIceCandidateType::Relay,
            _ => true,
        }
    }
}
