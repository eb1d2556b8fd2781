use std::collections::BTreeMap;

use rand::Rng;

use super::init::RESERVED_DATA_CHANNEL_ID;
use super::{RTCDataChannel, RTCDataChannelId, RTCDataChannelState};
use shared::error::{Error, Result};

const RANDOM_ALLOCATION_ATTEMPTS: usize = 64;

/// Parity of the channel ids a side may allocate.
///
/// The offerer uses even ids and the answerer odd ids, so both sides can open channels
/// without coordinating.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum DataChannelIdPolarity {
    #[default]
    Even,
    Odd,
}

impl DataChannelIdPolarity {
    pub fn admits(self, id: RTCDataChannelId) -> bool {
        id != RESERVED_DATA_CHANNEL_ID && (id % 2 == 0) == (self == DataChannelIdPolarity::Even)
    }

    fn offset(self) -> u32 {
        match self {
            DataChannelIdPolarity::Even => 0,
            DataChannelIdPolarity::Odd => 1,
        }
    }

    /// Number of ids of this parity below the reserved id.
    fn capacity(self) -> u32 {
        (RESERVED_DATA_CHANNEL_ID as u32 - self.offset()).div_ceil(2)
    }

    fn nth(self, n: u32) -> RTCDataChannelId {
        (n * 2 + self.offset()) as RTCDataChannelId
    }
}

/// Data channels of one connection, keyed by id. Channels still waiting for an id are
/// kept aside in creation order.
#[derive(Debug, Default)]
pub struct DataChannelRegistry {
    channels: BTreeMap<RTCDataChannelId, RTCDataChannel>,
    unassigned: Vec<RTCDataChannel>,
}

impl DataChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, channel: RTCDataChannel) -> Result<()> {
        let Some(id) = channel.id else {
            self.unassigned.push(channel);
            return Ok(());
        };
        if id == RESERVED_DATA_CHANNEL_ID {
            return Err(Error::ErrMaxDataChannelID);
        }
        if self.channels.contains_key(&id) {
            return Err(Error::ErrDataChannelIdInUse(id));
        }
        self.channels.insert(id, channel);
        Ok(())
    }

    /// Removes and returns the channels waiting for an id, oldest first.
    pub fn take_unassigned(&mut self) -> Vec<RTCDataChannel> {
        std::mem::take(&mut self.unassigned)
    }

    pub fn lookup(&self, id: RTCDataChannelId) -> Option<&RTCDataChannel> {
        self.channels.get(&id)
    }

    pub fn remove(&mut self, id: RTCDataChannelId) -> Option<RTCDataChannel> {
        self.channels.remove(&id)
    }

    pub fn contains(&self, id: RTCDataChannelId) -> bool {
        self.channels.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.channels.len() + self.unassigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty() && self.unassigned.is_empty()
    }

    /// Every registered channel: by ascending id, then those without an id.
    pub fn snapshot(&self) -> Vec<RTCDataChannel> {
        self.channels
            .values()
            .chain(&self.unassigned)
            .cloned()
            .collect()
    }

    /// Moves a channel to `state` and returns its previous state. A channel moved to
    /// `Closed` is removed.
    pub fn set_state(
        &mut self,
        id: RTCDataChannelId,
        state: RTCDataChannelState,
    ) -> Result<RTCDataChannelState> {
        let channel = self
            .channels
            .get_mut(&id)
            .ok_or(Error::ErrDataChannelNotExisted)?;
        let previous = std::mem::replace(&mut channel.ready_state, state);
        if state == RTCDataChannelState::Closed {
            self.channels.remove(&id);
        }
        Ok(previous)
    }

    /// Closes and removes every channel; returns them in `Closed` state, in `snapshot`
    /// order.
    pub fn close_all(&mut self) -> Vec<RTCDataChannel> {
        std::mem::take(&mut self.channels)
            .into_values()
            .chain(std::mem::take(&mut self.unassigned))
            .map(|mut channel| {
                channel.ready_state = RTCDataChannelState::Closed;
                channel
            })
            .collect()
    }

    /// Picks a free id of the given parity, at random first and by scanning once random
    /// picks keep colliding.
    pub fn allocate_id<R: Rng>(
        &self,
        polarity: DataChannelIdPolarity,
        rng: &mut R,
    ) -> Result<RTCDataChannelId> {
        let capacity = polarity.capacity();

        for _ in 0..RANDOM_ALLOCATION_ATTEMPTS {
            let id = polarity.nth(rng.random_range(0..capacity));
            if !self.channels.contains_key(&id) {
                return Ok(id);
            }
        }

        let start = rng.random_range(0..capacity);
        (0..capacity)
            .map(|i| polarity.nth((start + i) % capacity))
            .find(|id| !self.channels.contains_key(id))
            .ok_or(Error::ErrMaxDataChannelID)
    }
}
