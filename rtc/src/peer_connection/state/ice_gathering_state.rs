use std::fmt;

/// Progress of local ICE candidate gathering.
///
/// Driven only by the transport engine: `New → Gathering → Complete`. An ICE restart
/// returns the state to `New` for the next gathering round. A gathering timeout inside the
/// engine still ends in `Complete`.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RTCIceGatheringState {
    /// State not specified. This should not occur in normal operation.
    #[default]
    Unspecified,

    /// Gathering has not started. Starts once the first local description is applied.
    New,

    /// The engine is collecting host, server-reflexive and relay candidates.
    Gathering,

    /// No further local candidates will be reported for this round.
    Complete,
}

const ICE_GATHERING_STATE_NEW_STR: &str = "new";
const ICE_GATHERING_STATE_GATHERING_STR: &str = "gathering";
const ICE_GATHERING_STATE_COMPLETE_STR: &str = "complete";

impl From<&str> for RTCIceGatheringState {
    fn from(raw: &str) -> Self {
        match raw {
            ICE_GATHERING_STATE_NEW_STR => RTCIceGatheringState::New,
            ICE_GATHERING_STATE_GATHERING_STR => RTCIceGatheringState::Gathering,
            ICE_GATHERING_STATE_COMPLETE_STR => RTCIceGatheringState::Complete,
            _ => RTCIceGatheringState::Unspecified,
        }
    }
}

impl fmt::Display for RTCIceGatheringState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTCIceGatheringState::New => ICE_GATHERING_STATE_NEW_STR,
            RTCIceGatheringState::Gathering => ICE_GATHERING_STATE_GATHERING_STR,
            RTCIceGatheringState::Complete => ICE_GATHERING_STATE_COMPLETE_STR,
            RTCIceGatheringState::Unspecified => {
                crate::peer_connection::configuration::UNSPECIFIED_STR
            }
        };
        write!(f, "{s}")
    }
}

impl RTCIceGatheringState {
    /// Reports whether moving from `self` to `next` goes forward within one gathering
    /// round. Repeating the current state is not progress.
    pub(crate) fn advances_to(self, next: RTCIceGatheringState) -> bool {
        fn rank(state: RTCIceGatheringState) -> u8 {
            match state {
                RTCIceGatheringState::Unspecified => 0,
                RTCIceGatheringState::New => 1,
                RTCIceGatheringState::Gathering => 2,
                RTCIceGatheringState::Complete => 3,
            }
        }
        rank(next) > rank(self)
    }
}
