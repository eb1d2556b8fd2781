use crate::data_channel::{RTCDataChannel, RTCDataChannelId};

#[allow(clippy::enum_variant_names)]
#[derive(Debug, Clone, PartialEq)]
pub enum RTCDataChannelEvent {
    /// The remote peer opened a channel.
    OnDataChannel(RTCDataChannel),
    OnOpen(RTCDataChannelId),
    OnClosing(RTCDataChannelId),
    OnClose(RTCDataChannelId),
}

impl RTCDataChannelEvent {
    pub fn channel_id(&self) -> Option<RTCDataChannelId> {
        match self {
            RTCDataChannelEvent::OnDataChannel(channel) => channel.id(),
            RTCDataChannelEvent::OnOpen(id)
            | RTCDataChannelEvent::OnClosing(id)
            | RTCDataChannelEvent::OnClose(id) => Some(*id),
        }
    }
}

impl Default for RTCDataChannelEvent {
    fn default() -> Self {
        Self::OnOpen(Default::default())
    }
}
