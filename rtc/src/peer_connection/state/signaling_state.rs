use std::fmt;

use crate::peer_connection::sdp::sdp_type::RTCSdpType;
use shared::error::{Error, Result};

/// An operation applied to the signaling state machine.
///
/// `CreateOffer` and `CreateAnswer` never move the machine; they only succeed or
/// fail based on the current state. Set operations carry the kind of the description
/// being applied.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SignalingOperation {
    CreateOffer,
    CreateAnswer,
    SetLocal(RTCSdpType),
    SetRemote(RTCSdpType),
    Close,
}

impl fmt::Display for SignalingOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            SignalingOperation::CreateOffer => write!(f, "CreateOffer"),
            SignalingOperation::CreateAnswer => write!(f, "CreateAnswer"),
            SignalingOperation::SetLocal(sdp_type) => write!(f, "SetLocal({sdp_type})"),
            SignalingOperation::SetRemote(sdp_type) => write!(f, "SetRemote({sdp_type})"),
            SignalingOperation::Close => write!(f, "Close"),
        }
    }
}

/// Indicates the state of the SDP offer/answer negotiation process.
///
/// `RTCSignalingState` tracks progress through the offer/answer model of RFC 3264
/// as refined by JSEP (RFC 8829).
///
/// **Offerer:**
/// ```text
/// Stable → (setLocalDescription with offer) → HaveLocalOffer
///       → (setRemoteDescription with answer) → Stable
/// ```
///
/// **Answerer:**
/// ```text
/// Stable → (setRemoteDescription with offer) → HaveRemoteOffer
///       → (setLocalDescription with answer) → Stable
/// ```
///
/// Provisional answers add intermediate states:
/// ```text
/// HaveLocalOffer → (setRemoteDescription with pranswer) → HaveRemotePranswer
///                → (setRemoteDescription with answer) → Stable
/// ```
///
/// ```
/// use rtc_peer::peer_connection::state::RTCSignalingState;
///
/// let state: RTCSignalingState = "have-local-offer".into();
/// assert_eq!(state, RTCSignalingState::HaveLocalOffer);
/// assert_eq!(state.to_string(), "have-local-offer");
/// ```
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RTCSignalingState {
    /// State not specified. This should not occur in normal operation.
    Unspecified = 0,

    /// No offer/answer exchange is in progress.
    ///
    /// This is the initial state and also the state after a successful
    /// offer/answer exchange completes.
    #[default]
    Stable,

    /// A local offer has been applied; waiting for the remote answer.
    HaveLocalOffer,

    /// A remote offer has been applied; a local answer is expected.
    HaveRemoteOffer,

    /// Remote offer applied followed by a local provisional answer.
    HaveLocalPranswer,

    /// Local offer applied followed by a remote provisional answer.
    HaveRemotePranswer,

    /// The peer connection has been closed. Terminal.
    Closed,
}

const SIGNALING_STATE_STABLE_STR: &str = "stable";
const SIGNALING_STATE_HAVE_LOCAL_OFFER_STR: &str = "have-local-offer";
const SIGNALING_STATE_HAVE_REMOTE_OFFER_STR: &str = "have-remote-offer";
const SIGNALING_STATE_HAVE_LOCAL_PRANSWER_STR: &str = "have-local-pranswer";
const SIGNALING_STATE_HAVE_REMOTE_PRANSWER_STR: &str = "have-remote-pranswer";
const SIGNALING_STATE_CLOSED_STR: &str = "closed";

impl From<&str> for RTCSignalingState {
    fn from(raw: &str) -> Self {
        match raw {
            SIGNALING_STATE_STABLE_STR => RTCSignalingState::Stable,
            SIGNALING_STATE_HAVE_LOCAL_OFFER_STR => RTCSignalingState::HaveLocalOffer,
            SIGNALING_STATE_HAVE_REMOTE_OFFER_STR => RTCSignalingState::HaveRemoteOffer,
            SIGNALING_STATE_HAVE_LOCAL_PRANSWER_STR => RTCSignalingState::HaveLocalPranswer,
            SIGNALING_STATE_HAVE_REMOTE_PRANSWER_STR => RTCSignalingState::HaveRemotePranswer,
            SIGNALING_STATE_CLOSED_STR => RTCSignalingState::Closed,
            _ => RTCSignalingState::Unspecified,
        }
    }
}

impl fmt::Display for RTCSignalingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RTCSignalingState::Stable => write!(f, "{SIGNALING_STATE_STABLE_STR}"),
            RTCSignalingState::HaveLocalOffer => {
                write!(f, "{SIGNALING_STATE_HAVE_LOCAL_OFFER_STR}")
            }
            RTCSignalingState::HaveRemoteOffer => {
                write!(f, "{SIGNALING_STATE_HAVE_REMOTE_OFFER_STR}")
            }
            RTCSignalingState::HaveLocalPranswer => {
                write!(f, "{SIGNALING_STATE_HAVE_LOCAL_PRANSWER_STR}")
            }
            RTCSignalingState::HaveRemotePranswer => {
                write!(f, "{SIGNALING_STATE_HAVE_REMOTE_PRANSWER_STR}")
            }
            RTCSignalingState::Closed => write!(f, "{SIGNALING_STATE_CLOSED_STR}"),
            _ => write!(
                f,
                "{}",
                crate::peer_connection::configuration::UNSPECIFIED_STR
            ),
        }
    }
}

/// Computes the state reached by applying `op` in state `cur`.
///
/// The function is pure: it never touches a connection. Every pair not listed in the
/// offer/answer table fails with an `InvalidState` class error and the caller keeps
/// `cur`.
pub fn next_signaling_state(
    cur: RTCSignalingState,
    op: SignalingOperation,
) -> Result<RTCSignalingState> {
    use RTCSdpType::*;
    use RTCSignalingState::*;
    use SignalingOperation::*;

    if op == Close {
        return Ok(Closed);
    }
    if cur == Closed {
        return Err(Error::ErrConnectionClosed);
    }

    let next = match (cur, op) {
        (HaveRemoteOffer | HaveLocalPranswer, CreateAnswer) => Some(cur),
        (_, CreateAnswer) => return Err(Error::ErrIncorrectSignalingState),
        (_, CreateOffer) => Some(cur),

        (Stable, SetLocal(Rollback) | SetRemote(Rollback)) => {
            return Err(Error::ErrSignalingStateCannotRollback);
        }
        (HaveLocalOffer, SetLocal(Rollback)) => Some(Stable),
        (HaveRemoteOffer, SetRemote(Rollback)) => Some(Stable),

        // stable->SetLocal(offer)->have-local-offer
        (Stable, SetLocal(Offer)) => Some(HaveLocalOffer),
        // stable->SetRemote(offer)->have-remote-offer
        (Stable, SetRemote(Offer)) => Some(HaveRemoteOffer),

        // have-local-offer->SetLocal(offer)->have-local-offer
        (HaveLocalOffer, SetLocal(Offer)) => Some(HaveLocalOffer),
        // have-local-offer->SetRemote(answer)->stable
        (HaveLocalOffer, SetRemote(Answer)) => Some(Stable),
        // have-local-offer->SetRemote(pranswer)->have-remote-pranswer
        (HaveLocalOffer, SetRemote(Pranswer)) => Some(HaveRemotePranswer),

        // have-remote-pranswer->SetRemote(pranswer)->have-remote-pranswer
        (HaveRemotePranswer, SetRemote(Pranswer)) => Some(HaveRemotePranswer),
        // have-remote-pranswer->SetRemote(answer)->stable
        (HaveRemotePranswer, SetRemote(Answer)) => Some(Stable),

        // have-remote-offer->SetRemote(offer)->have-remote-offer
        (HaveRemoteOffer, SetRemote(Offer)) => Some(HaveRemoteOffer),
        // have-remote-offer->SetLocal(answer)->stable
        (HaveRemoteOffer, SetLocal(Answer)) => Some(Stable),
        // have-remote-offer->SetLocal(pranswer)->have-local-pranswer
        (HaveRemoteOffer, SetLocal(Pranswer)) => Some(HaveLocalPranswer),

        // have-local-pranswer->SetLocal(pranswer)->have-local-pranswer
        (HaveLocalPranswer, SetLocal(Pranswer)) => Some(HaveLocalPranswer),
        // have-local-pranswer->SetLocal(answer)->stable
        (HaveLocalPranswer, SetLocal(Answer)) => Some(Stable),

        _ => None,
    };

    next.ok_or_else(|| {
        Error::ErrSignalingStateProposedTransitionInvalid(format!("{cur} + {op}"))
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use shared::error::ErrorKind;

    const ALL_STATES: [RTCSignalingState; 6] = [
        RTCSignalingState::Stable,
        RTCSignalingState::HaveLocalOffer,
        RTCSignalingState::HaveRemoteOffer,
        RTCSignalingState::HaveLocalPranswer,
        RTCSignalingState::HaveRemotePranswer,
        RTCSignalingState::Closed,
    ];

    fn all_operations() -> Vec<SignalingOperation> {
        let kinds = [
            RTCSdpType::Offer,
            RTCSdpType::Pranswer,
            RTCSdpType::Answer,
            RTCSdpType::Rollback,
        ];
        let mut ops = vec![
            SignalingOperation::CreateOffer,
            SignalingOperation::CreateAnswer,
            SignalingOperation::Close,
        ];
        for kind in kinds {
            ops.push(SignalingOperation::SetLocal(kind));
            ops.push(SignalingOperation::SetRemote(kind));
        }
        ops
    }

    #[test]
    fn test_new_signaling_state() {
        let tests = vec![
            ("Unspecified", RTCSignalingState::Unspecified),
            ("stable", RTCSignalingState::Stable),
            ("have-local-offer", RTCSignalingState::HaveLocalOffer),
            ("have-remote-pranswer", RTCSignalingState::HaveRemotePranswer),
            ("have-remote-offer", RTCSignalingState::HaveRemoteOffer),
            ("have-local-pranswer", RTCSignalingState::HaveLocalPranswer),
            ("closed", RTCSignalingState::Closed),
        ];

        for (state_string, expected_state) in tests {
            assert_eq!(RTCSignalingState::from(state_string), expected_state);
        }
    }

    #[test]
    fn test_signaling_state_string() {
        let tests = vec![
            (RTCSignalingState::Unspecified, "Unspecified"),
            (RTCSignalingState::Stable, "stable"),
            (RTCSignalingState::HaveLocalOffer, "have-local-offer"),
            (RTCSignalingState::HaveRemotePranswer, "have-remote-pranswer"),
            (RTCSignalingState::HaveRemoteOffer, "have-remote-offer"),
            (RTCSignalingState::HaveLocalPranswer, "have-local-pranswer"),
            (RTCSignalingState::Closed, "closed"),
        ];

        for (state, expected_string) in tests {
            assert_eq!(state.to_string(), expected_string);
        }
    }

    #[test]
    fn test_signaling_state_transitions() {
        use RTCSdpType::*;
        use RTCSignalingState::*;
        use SignalingOperation::*;

        let tests = vec![
            // (desc, cur, op, expected)
            ("stable->SetLocal(offer)", Stable, SetLocal(Offer), Ok(HaveLocalOffer)),
            ("stable->SetRemote(offer)", Stable, SetRemote(Offer), Ok(HaveRemoteOffer)),
            ("have-local-offer->SetLocal(offer)", HaveLocalOffer, SetLocal(Offer), Ok(HaveLocalOffer)),
            ("have-local-offer->SetRemote(answer)", HaveLocalOffer, SetRemote(Answer), Ok(Stable)),
            ("have-local-offer->SetRemote(pranswer)", HaveLocalOffer, SetRemote(Pranswer), Ok(HaveRemotePranswer)),
            ("have-remote-pranswer->SetRemote(pranswer)", HaveRemotePranswer, SetRemote(Pranswer), Ok(HaveRemotePranswer)),
            ("have-remote-pranswer->SetRemote(answer)", HaveRemotePranswer, SetRemote(Answer), Ok(Stable)),
            ("have-remote-offer->SetRemote(offer)", HaveRemoteOffer, SetRemote(Offer), Ok(HaveRemoteOffer)),
            ("have-remote-offer->SetLocal(answer)", HaveRemoteOffer, SetLocal(Answer), Ok(Stable)),
            ("have-remote-offer->SetLocal(pranswer)", HaveRemoteOffer, SetLocal(Pranswer), Ok(HaveLocalPranswer)),
            ("have-local-pranswer->SetLocal(pranswer)", HaveLocalPranswer, SetLocal(Pranswer), Ok(HaveLocalPranswer)),
            ("have-local-pranswer->SetLocal(answer)", HaveLocalPranswer, SetLocal(Answer), Ok(Stable)),
            ("have-local-offer->SetLocal(rollback)", HaveLocalOffer, SetLocal(Rollback), Ok(Stable)),
            ("have-remote-offer->SetRemote(rollback)", HaveRemoteOffer, SetRemote(Rollback), Ok(Stable)),
            (
                "stable->SetRemote(rollback)",
                Stable,
                SetRemote(Rollback),
                Err(Error::ErrSignalingStateCannotRollback),
            ),
            (
                "stable->CreateAnswer",
                Stable,
                CreateAnswer,
                Err(Error::ErrIncorrectSignalingState),
            ),
            ("have-remote-offer->CreateAnswer", HaveRemoteOffer, CreateAnswer, Ok(HaveRemoteOffer)),
            (
                "have-local-pranswer->CreateAnswer",
                HaveLocalPranswer,
                CreateAnswer,
                Ok(HaveLocalPranswer),
            ),
            (
                "have-remote-pranswer->CreateAnswer",
                HaveRemotePranswer,
                CreateAnswer,
                Err(Error::ErrIncorrectSignalingState),
            ),
            ("have-local-offer->CreateOffer", HaveLocalOffer, CreateOffer, Ok(HaveLocalOffer)),
            ("closed->CreateOffer", Closed, CreateOffer, Err(Error::ErrConnectionClosed)),
            ("closed->Close", Closed, Close, Ok(Closed)),
            (
                "stable->SetLocal(answer)",
                Stable,
                SetLocal(Answer),
                Err(Error::ErrSignalingStateProposedTransitionInvalid(
                    "stable + SetLocal(answer)".to_owned(),
                )),
            ),
        ];

        for (desc, cur, op, expected) in tests {
            let result = next_signaling_state(cur, op);
            assert_eq!(result, expected, "{desc} failed");
        }
    }

    /// Every (state, operation) pair is either in the legal set below or rejected with an
    /// `InvalidState` class error.
    #[test]
    fn test_signaling_state_table_is_exhaustive() {
        use RTCSdpType::*;
        use RTCSignalingState::*;
        use SignalingOperation::*;

        let legal = vec![
            (Stable, SetLocal(Offer), HaveLocalOffer),
            (Stable, SetRemote(Offer), HaveRemoteOffer),
            (HaveLocalOffer, SetLocal(Offer), HaveLocalOffer),
            (HaveLocalOffer, SetRemote(Answer), Stable),
            (HaveLocalOffer, SetRemote(Pranswer), HaveRemotePranswer),
            (HaveLocalOffer, SetLocal(Rollback), Stable),
            (HaveRemotePranswer, SetRemote(Pranswer), HaveRemotePranswer),
            (HaveRemotePranswer, SetRemote(Answer), Stable),
            (HaveRemoteOffer, SetRemote(Offer), HaveRemoteOffer),
            (HaveRemoteOffer, SetLocal(Answer), Stable),
            (HaveRemoteOffer, SetLocal(Pranswer), HaveLocalPranswer),
            (HaveRemoteOffer, SetRemote(Rollback), Stable),
            (HaveLocalPranswer, SetLocal(Pranswer), HaveLocalPranswer),
            (HaveLocalPranswer, SetLocal(Answer), Stable),
            (HaveRemoteOffer, CreateAnswer, HaveRemoteOffer),
            (HaveLocalPranswer, CreateAnswer, HaveLocalPranswer),
        ];

        let mut checked = 0;
        for cur in ALL_STATES {
            for op in all_operations() {
                let result = next_signaling_state(cur, op);
                checked += 1;

                if op == Close {
                    assert_eq!(result, Ok(Closed), "{cur} + {op}");
                    continue;
                }
                if op == CreateOffer && cur != Closed {
                    assert_eq!(result, Ok(cur), "{cur} + {op}");
                    continue;
                }

                match legal.iter().find(|(s, o, _)| *s == cur && *o == op) {
                    Some((_, _, expected)) => {
                        assert_eq!(result, Ok(*expected), "{cur} + {op}");
                    }
                    None => {
                        let err = result.expect_err(&format!("{cur} + {op} must be rejected"));
                        assert_eq!(err.kind(), ErrorKind::InvalidState, "{cur} + {op}: {err}");
                    }
                }
            }
        }
        assert_eq!(checked, ALL_STATES.len() * all_operations().len());
    }
}
