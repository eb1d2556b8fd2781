use crate::peer_connection::transport::ice::candidate::RTCIceCandidate;

/// A local candidate to send to the remote peer. `candidate` is `None` once gathering is
/// complete (end-of-candidates).
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct RTCPeerConnectionIceEvent {
    pub candidate: Option<RTCIceCandidate>,
    pub url: String,
}
