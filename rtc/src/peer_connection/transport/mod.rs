//! ICE types visible at the negotiation layer: candidates, the candidate set and the
//! STUN/TURN servers handed to the engine.

pub(crate) mod ice;

pub use ice::candidate::{RTCIceCandidate, RTCIceCandidateInit, RTCIceTcpCandidateType};
pub use ice::candidate_set::{CandidateAddOutcome, CandidateSet};
pub use ice::candidate_type::RTCIceCandidateType;
pub use ice::protocol::RTCIceProtocol;
pub use ice::server::{RTCIceCredentialType, RTCIceServer};
