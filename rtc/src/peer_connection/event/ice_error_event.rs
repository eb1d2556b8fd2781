/// A STUN or TURN server reported an error while gathering.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct RTCPeerConnectionIceErrorEvent {
    pub address: String,
    pub port: u16,
    pub url: String,
    pub error_code: u16,
    pub error_text: String,
}
