use std::fmt;
use std::io::Cursor;

use sdp::description::session::SessionDescription;
use serde::{Deserialize, Serialize};

use super::sdp_type::RTCSdpType;
use super::{RTCMediaSection, has_trickle_option, media_sections};
use shared::error::{Error, Result};

/// Which side produced a description.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RTCSdpOrigin {
    /// Synthesized by the local transport engine through `create_offer`/`create_answer`.
    Local,
    /// Received from the signaling channel.
    #[default]
    Remote,
}

impl fmt::Display for RTCSdpOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RTCSdpOrigin::Local => write!(f, "local"),
            RTCSdpOrigin::Remote => write!(f, "remote"),
        }
    }
}

/// An SDP offer, answer, provisional answer or rollback.
///
/// Values are immutable once built: connections hold them in their current and pending
/// slots and replace them wholesale. The JSON form matches the W3C
/// `RTCSessionDescriptionInit` dictionary:
///
/// ```
/// use rtc_peer::peer_connection::sdp::{RTCSdpType, RTCSessionDescription};
///
/// let json = r#"{"type":"rollback","sdp":""}"#;
/// let desc: RTCSessionDescription = serde_json::from_str(json).unwrap();
/// assert_eq!(desc.sdp_type, RTCSdpType::Rollback);
/// assert_eq!(serde_json::to_string(&desc).unwrap(), json);
/// ```
///
/// Two descriptions are equal when their type and payload are equal; origin and the
/// parsed cache are ignored. The type takes part because an offer and an answer with the
/// same payload drive the signaling state differently.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct RTCSessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: RTCSdpType,

    pub sdp: String,

    #[serde(skip)]
    pub(crate) origin: RTCSdpOrigin,

    #[serde(skip)]
    pub(crate) parsed: Option<SessionDescription>,
}

impl PartialEq for RTCSessionDescription {
    fn eq(&self, other: &Self) -> bool {
        self.sdp_type == other.sdp_type && self.sdp == other.sdp
    }
}

impl Eq for RTCSessionDescription {}

impl fmt::Display for RTCSessionDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "type: {}, sdp:\n{}",
            self.sdp_type,
            self.sdp.replace("\r\n", "\n")
        )
    }
}

impl RTCSessionDescription {
    fn parsed_with_type(sdp_type: RTCSdpType, sdp: String) -> Result<Self> {
        let mut desc = RTCSessionDescription {
            sdp_type,
            sdp,
            origin: RTCSdpOrigin::Remote,
            parsed: None,
        };
        desc.parse()?;
        Ok(desc)
    }

    /// Builds an offer, failing with `ErrSdpParse` when the payload is not valid SDP.
    pub fn offer(sdp: String) -> Result<RTCSessionDescription> {
        Self::parsed_with_type(RTCSdpType::Offer, sdp)
    }

    pub fn answer(sdp: String) -> Result<RTCSessionDescription> {
        Self::parsed_with_type(RTCSdpType::Answer, sdp)
    }

    pub fn pranswer(sdp: String) -> Result<RTCSessionDescription> {
        Self::parsed_with_type(RTCSdpType::Pranswer, sdp)
    }

    /// A rollback carries no payload.
    pub fn rollback() -> RTCSessionDescription {
        Self::implicit(RTCSdpType::Rollback)
    }

    /// A description without payload. Given to `set_local_description`, it stands for the
    /// last offer or answer the connection created.
    pub fn implicit(sdp_type: RTCSdpType) -> RTCSessionDescription {
        RTCSessionDescription {
            sdp_type,
            origin: RTCSdpOrigin::Local,
            ..Default::default()
        }
    }

    /// Parses the JSON signaling form and validates the payload.
    pub fn from_json(json: &str) -> Result<RTCSessionDescription> {
        let mut desc: RTCSessionDescription =
            serde_json::from_str(json).map_err(|err| Error::ErrSdpParse(err.to_string()))?;
        if desc.sdp_type == RTCSdpType::Unspecified {
            return Err(Error::ErrPeerConnSDPTypeInvalidValue);
        }
        desc.parse()?;
        Ok(desc)
    }

    /// Serializes to `{"type":"…","sdp":"…"}`.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|err| Error::Other(err.to_string()))
    }

    pub(crate) fn local(sdp_type: RTCSdpType, sdp: String) -> Result<RTCSessionDescription> {
        let mut desc = Self::parsed_with_type(sdp_type, sdp)?;
        desc.origin = RTCSdpOrigin::Local;
        Ok(desc)
    }

    pub(crate) fn with_origin(mut self, origin: RTCSdpOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn origin(&self) -> RTCSdpOrigin {
        self.origin
    }

    /// Parses the payload with the `sdp` crate without caching the result.
    pub fn unmarshal(&self) -> Result<SessionDescription> {
        if self.sdp.trim().is_empty() {
            return Err(Error::ErrSdpEmpty);
        }
        let mut reader = Cursor::new(self.sdp.as_bytes());
        SessionDescription::unmarshal(&mut reader).map_err(|err| Error::ErrSdpParse(err.to_string()))
    }

    /// Validates and caches the parsed payload. Rollbacks have nothing to parse.
    pub(crate) fn parse(&mut self) -> Result<()> {
        if self.sdp_type == RTCSdpType::Rollback || self.parsed.is_some() {
            return Ok(());
        }
        self.parsed = Some(self.unmarshal()?);
        Ok(())
    }

    /// The `m=` sections of the payload, empty for rollbacks and unparsable payloads.
    pub fn media_sections(&self) -> Vec<RTCMediaSection> {
        match &self.parsed {
            Some(parsed) => media_sections(parsed),
            None => self
                .unmarshal()
                .map(|parsed| media_sections(&parsed))
                .unwrap_or_default(),
        }
    }

    pub(crate) fn has_trickle_option(&self) -> bool {
        match &self.parsed {
            Some(parsed) => has_trickle_option(parsed),
            None => self
                .unmarshal()
                .map(|parsed| has_trickle_option(&parsed))
                .unwrap_or(false),
        }
    }
}
