use std::fmt;

use serde::{Deserialize, Serialize};

/// Candidate type as carried after `typ` in the candidate attribute.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RTCIceCandidateType {
    #[default]
    Unspecified,

    /// An address on a local interface.
    #[serde(rename = "host")]
    Host,

    /// Server reflexive: the address a STUN server saw.
    #[serde(rename = "srflx")]
    Srflx,

    /// Peer reflexive: learned from a connectivity check.
    #[serde(rename = "prflx")]
    Prflx,

    /// Allocated on a TURN server.
    #[serde(rename = "relay")]
    Relay,
}

const ICE_CANDIDATE_TYPE_HOST_STR: &str = "host";
const ICE_CANDIDATE_TYPE_SRFLX_STR: &str = "srflx";
const ICE_CANDIDATE_TYPE_PRFLX_STR: &str = "prflx";
const ICE_CANDIDATE_TYPE_RELAY_STR: &str = "relay";

impl From<&str> for RTCIceCandidateType {
    fn from(raw: &str) -> Self {
        match raw {
            ICE_CANDIDATE_TYPE_HOST_STR => RTCIceCandidateType::Host,
            ICE_CANDIDATE_TYPE_SRFLX_STR => RTCIceCandidateType::Srflx,
            ICE_CANDIDATE_TYPE_PRFLX_STR => RTCIceCandidateType::Prflx,
            ICE_CANDIDATE_TYPE_RELAY_STR => RTCIceCandidateType::Relay,
            _ => RTCIceCandidateType::Unspecified,
        }
    }
}

impl fmt::Display for RTCIceCandidateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTCIceCandidateType::Host => ICE_CANDIDATE_TYPE_HOST_STR,
            RTCIceCandidateType::Srflx => ICE_CANDIDATE_TYPE_SRFLX_STR,
            RTCIceCandidateType::Prflx => ICE_CANDIDATE_TYPE_PRFLX_STR,
            RTCIceCandidateType::Relay => ICE_CANDIDATE_TYPE_RELAY_STR,
            RTCIceCandidateType::Unspecified => {
                crate::peer_connection::configuration::UNSPECIFIED_STR
            }
        };
        write!(f, "{s}")
    }
}

impl RTCIceCandidateType {
    /// Type preference from RFC 8445 section 5.1.2.2.
    pub fn preference(self) -> u32 {
        match self {
            RTCIceCandidateType::Host => 126,
            RTCIceCandidateType::Prflx => 110,
            RTCIceCandidateType::Srflx => 100,
            RTCIceCandidateType::Relay | RTCIceCandidateType::Unspecified => 0,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ice_candidate_type() {
        let tests = vec![
            ("Unspecified", RTCIceCandidateType::Unspecified),
            ("host", RTCIceCandidateType::Host),
            ("srflx", RTCIceCandidateType::Srflx),
            ("prflx", RTCIceCandidateType::Prflx),
            ("relay", RTCIceCandidateType::Relay),
        ];

        for (type_string, expected_type) in tests {
            assert_eq!(RTCIceCandidateType::from(type_string), expected_type);
            assert_eq!(expected_type.to_string(), type_string);
        }
    }

    #[test]
    fn test_ice_candidate_type_preference_order() {
        assert!(RTCIceCandidateType::Host.preference() > RTCIceCandidateType::Prflx.preference());
        assert!(RTCIceCandidateType::Prflx.preference() > RTCIceCandidateType::Srflx.preference());
        assert!(RTCIceCandidateType::Srflx.preference() > RTCIceCandidateType::Relay.preference());
    }
}
