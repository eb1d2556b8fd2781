use std::fmt;

use serde::{Deserialize, Serialize};

/// Transport of a candidate.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RTCIceProtocol {
    #[default]
    Unspecified,

    #[serde(rename = "udp")]
    Udp,

    #[serde(rename = "tcp")]
    Tcp,
}

const ICE_PROTOCOL_UDP_STR: &str = "udp";
const ICE_PROTOCOL_TCP_STR: &str = "tcp";

/// Case insensitive: peers send both `UDP` and `udp`.
impl From<&str> for RTCIceProtocol {
    fn from(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case(ICE_PROTOCOL_UDP_STR) {
            RTCIceProtocol::Udp
        } else if raw.eq_ignore_ascii_case(ICE_PROTOCOL_TCP_STR) {
            RTCIceProtocol::Tcp
        } else {
            RTCIceProtocol::Unspecified
        }
    }
}

impl fmt::Display for RTCIceProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTCIceProtocol::Udp => ICE_PROTOCOL_UDP_STR,
            RTCIceProtocol::Tcp => ICE_PROTOCOL_TCP_STR,
            RTCIceProtocol::Unspecified => crate::peer_connection::configuration::UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_new_ice_protocol() {
        let tests = vec![
            ("bad", RTCIceProtocol::Unspecified),
            ("udp", RTCIceProtocol::Udp),
            ("tcp", RTCIceProtocol::Tcp),
            ("UDP", RTCIceProtocol::Udp),
            ("TCP", RTCIceProtocol::Tcp),
        ];

        for (protocol_string, expected_protocol) in tests {
            assert_eq!(RTCIceProtocol::from(protocol_string), expected_protocol);
        }
    }
}
