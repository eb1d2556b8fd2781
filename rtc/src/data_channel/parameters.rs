use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What the engine needs to open a channel, and what it reports for channels the remote
/// peer opened.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataChannelParameters {
    pub label: String,

    pub protocol: String,

    pub ordered: bool,

    pub max_packet_life_time: Option<Duration>,

    pub max_retransmits: Option<u16>,

    pub negotiated: bool,
}
