use std::time::Duration;

use crate::data_channel::RTCDataChannelId;
use crate::data_channel::parameters::DataChannelParameters;
use shared::error::{Error, Result};

/// Longest label or protocol the data channel establishment protocol can carry.
pub(crate) const MAX_STRING_LENGTH: usize = 65535;

/// Reserved; never allocated or accepted as a channel id.
pub(crate) const RESERVED_DATA_CHANNEL_ID: RTCDataChannelId = 65535;

/// Options for `create_data_channel`.
///
/// `max_packet_life_time` and `max_retransmits` are mutually exclusive. With
/// `negotiated` set, the application has agreed on the id out of band and the id is used
/// verbatim instead of being allocated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RTCDataChannelInit {
    pub ordered: bool,

    pub max_packet_life_time: Option<Duration>,

    pub max_retransmits: Option<u16>,

    pub protocol: String,

    pub negotiated: Option<RTCDataChannelId>,
}

impl Default for RTCDataChannelInit {
    fn default() -> Self {
        RTCDataChannelInit {
            ordered: true,
            max_packet_life_time: None,
            max_retransmits: None,
            protocol: String::new(),
            negotiated: None,
        }
    }
}

impl RTCDataChannelInit {
    pub(crate) fn validate(&self, label: &str) -> Result<()> {
        if label.len() > MAX_STRING_LENGTH {
            return Err(Error::ErrStringSizeLimit);
        }
        if self.protocol.len() > MAX_STRING_LENGTH {
            return Err(Error::ErrProtocolTooLarge);
        }
        if self.max_packet_life_time.is_some() && self.max_retransmits.is_some() {
            return Err(Error::ErrRetransmitsOrPacketLifeTime);
        }
        if self.negotiated == Some(RESERVED_DATA_CHANNEL_ID) {
            return Err(Error::ErrMaxDataChannelID);
        }
        Ok(())
    }

    pub(crate) fn to_parameters(&self, label: &str) -> DataChannelParameters {
        DataChannelParameters {
            label: label.to_owned(),
            protocol: self.protocol.clone(),
            ordered: self.ordered,
            max_packet_life_time: self.max_packet_life_time,
            max_retransmits: self.max_retransmits,
            negotiated: self.negotiated.is_some(),
        }
    }
}
