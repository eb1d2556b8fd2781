//! Data channel descriptors and the per-connection registry.
//!
//! The negotiation core does not carry data: it allocates channel ids, validates the
//! channel options, tracks each channel's lifecycle from engine notifications and tears
//! every channel down when the connection closes.

use std::time::Duration;

pub mod init;
pub mod parameters;
pub(crate) mod registry;
pub mod state;

pub use init::RTCDataChannelInit;
pub use parameters::DataChannelParameters;
pub use registry::{DataChannelIdPolarity, DataChannelRegistry};
pub use state::RTCDataChannelState;

pub type RTCDataChannelId = u16;

/// Snapshot of a data channel owned by a connection.
///
/// An in-band channel created before the first offer has no id yet: which parity this side
/// owns is only known once that offer is applied. Take a fresh snapshot from
/// `RTCPeerConnection::data_channels` to see the id assigned then.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RTCDataChannel {
    pub(crate) id: Option<RTCDataChannelId>,
    pub(crate) label: String,
    pub(crate) protocol: String,
    pub(crate) ordered: bool,
    pub(crate) max_packet_life_time: Option<Duration>,
    pub(crate) max_retransmits: Option<u16>,
    pub(crate) negotiated: bool,
    pub(crate) ready_state: RTCDataChannelState,
}

impl RTCDataChannel {
    pub(crate) fn new(id: Option<RTCDataChannelId>, params: &DataChannelParameters) -> Self {
        RTCDataChannel {
            id,
            label: params.label.clone(),
            protocol: params.protocol.clone(),
            ordered: params.ordered,
            max_packet_life_time: params.max_packet_life_time,
            max_retransmits: params.max_retransmits,
            negotiated: params.negotiated,
            ready_state: RTCDataChannelState::Connecting,
        }
    }

    /// `None` until the id is assigned.
    pub fn id(&self) -> Option<RTCDataChannelId> {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn ordered(&self) -> bool {
        self.ordered
    }

    pub fn max_packet_life_time(&self) -> Option<Duration> {
        self.max_packet_life_time
    }

    pub fn max_retransmits(&self) -> Option<u16> {
        self.max_retransmits
    }

    pub fn negotiated(&self) -> bool {
        self.negotiated
    }

    pub fn ready_state(&self) -> RTCDataChannelState {
        self.ready_state
    }

    pub(crate) fn parameters(&self) -> DataChannelParameters {
        DataChannelParameters {
            label: self.label.clone(),
            protocol: self.protocol.clone(),
            ordered: self.ordered,
            max_packet_life_time: self.max_packet_life_time,
            max_retransmits: self.max_retransmits,
            negotiated: self.negotiated,
        }
    }
}
