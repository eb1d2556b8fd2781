//! Connection state types.
//!
//! A connection runs several independent state machines:
//!
//! - [`RTCSignalingState`] - offer/answer progress, the only one the application drives
//!   (through description operations, see [`next_signaling_state`])
//! - [`RTCIceGatheringState`] - local candidate gathering, driven by the engine
//! - [`RTCIceConnectionState`] - ICE connectivity, driven by the engine
//! - [`RTCPeerConnectionState`] - aggregate state derived from ICE connectivity
//!
//! ```
//! use rtc_peer::peer_connection::state::{RTCIceConnectionState, RTCPeerConnectionState};
//!
//! let state: RTCPeerConnectionState = RTCIceConnectionState::Checking.into();
//! assert_eq!(state.to_string(), "connecting");
//! ```

pub(crate) mod ice_connection_state;
pub(crate) mod ice_gathering_state;
pub(crate) mod peer_connection_state;
pub(crate) mod signaling_state;

pub use ice_connection_state::RTCIceConnectionState;
pub use ice_gathering_state::RTCIceGatheringState;
pub use peer_connection_state::RTCPeerConnectionState;
pub use signaling_state::{RTCSignalingState, SignalingOperation, next_signaling_state};
