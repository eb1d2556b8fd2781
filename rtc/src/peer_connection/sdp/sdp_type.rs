use std::fmt;

use crate::peer_connection::configuration::UNSPECIFIED_STR;
use serde::{Deserialize, Serialize};

/// Kind of a session description.
///
/// Serializes to the W3C strings used in the `type` member of the JSON signaling form.
#[derive(Default, Debug, PartialEq, Eq, Copy, Clone, Hash, Serialize, Deserialize)]
pub enum RTCSdpType {
    #[default]
    Unspecified = 0,

    /// A new negotiation proposal.
    #[serde(rename = "offer")]
    Offer,

    /// A provisional answer; may be replaced by a later pranswer or the final answer.
    #[serde(rename = "pranswer")]
    Pranswer,

    /// The final answer; completes the negotiation.
    #[serde(rename = "answer")]
    Answer,

    /// Cancels the in-flight offer and returns to the last stable state.
    #[serde(rename = "rollback")]
    Rollback,
}

const SDP_TYPE_OFFER_STR: &str = "offer";
const SDP_TYPE_PRANSWER_STR: &str = "pranswer";
const SDP_TYPE_ANSWER_STR: &str = "answer";
const SDP_TYPE_ROLLBACK_STR: &str = "rollback";

impl From<&str> for RTCSdpType {
    fn from(raw: &str) -> Self {
        match raw {
            SDP_TYPE_OFFER_STR => RTCSdpType::Offer,
            SDP_TYPE_PRANSWER_STR => RTCSdpType::Pranswer,
            SDP_TYPE_ANSWER_STR => RTCSdpType::Answer,
            SDP_TYPE_ROLLBACK_STR => RTCSdpType::Rollback,
            _ => RTCSdpType::Unspecified,
        }
    }
}

impl fmt::Display for RTCSdpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTCSdpType::Offer => SDP_TYPE_OFFER_STR,
            RTCSdpType::Pranswer => SDP_TYPE_PRANSWER_STR,
            RTCSdpType::Answer => SDP_TYPE_ANSWER_STR,
            RTCSdpType::Rollback => SDP_TYPE_ROLLBACK_STR,
            RTCSdpType::Unspecified => UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sdp_type_strings() {
        let tests = vec![
            ("Unspecified", RTCSdpType::Unspecified),
            ("offer", RTCSdpType::Offer),
            ("pranswer", RTCSdpType::Pranswer),
            ("answer", RTCSdpType::Answer),
            ("rollback", RTCSdpType::Rollback),
        ];

        for (sdp_type_string, expected_sdp_type) in tests {
            assert_eq!(RTCSdpType::from(sdp_type_string), expected_sdp_type);
            assert_eq!(expected_sdp_type.to_string(), sdp_type_string);
        }
    }

    #[test]
    fn test_unknown_sdp_type_is_unspecified() {
        assert_eq!(RTCSdpType::from("Offer"), RTCSdpType::Unspecified);
        assert_eq!(RTCSdpType::from(""), RTCSdpType::Unspecified);
    }
}
