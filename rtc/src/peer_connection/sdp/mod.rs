//! Session descriptions and the parts of SDP the negotiation core looks at.
//!
//! Payloads are produced by the transport engine and treated as opaque text, except
//! for validation and a small amount of introspection: the media sections (to match
//! trickled candidates against them) and the `ice-options` attribute.

use ::sdp::description::common::Attribute;
use ::sdp::description::session::SessionDescription;

pub(crate) mod sdp_type;
pub(crate) mod session_description;

pub use sdp_type::RTCSdpType;
pub use session_description::{RTCSdpOrigin, RTCSessionDescription};

pub(crate) const ATTR_KEY_MID: &str = "mid";
pub(crate) const ATTR_KEY_ICE_OPTIONS: &str = "ice-options";
pub(crate) const ICE_OPTION_TRICKLE: &str = "trickle";
pub(crate) const MEDIA_KIND_APPLICATION: &str = "application";

/// One `m=` section of a session description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RTCMediaSection {
    /// Zero-based position of the section, the `sdpMLineIndex` of candidates.
    pub index: usize,
    /// Media type: `audio`, `video` or `application`.
    pub kind: String,
    /// Value of the `a=mid` attribute, if present.
    pub mid: Option<String>,
}

fn attribute_value<'a>(attributes: &'a [Attribute], key: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|a| a.key == key)
        .map(|a| a.value.as_deref().unwrap_or_default())
}

pub(crate) fn media_sections(parsed: &SessionDescription) -> Vec<RTCMediaSection> {
    parsed
        .media_descriptions
        .iter()
        .enumerate()
        .map(|(index, m)| RTCMediaSection {
            index,
            kind: m.media_name.media.clone(),
            mid: attribute_value(&m.attributes, ATTR_KEY_MID).map(str::to_owned),
        })
        .collect()
}

/// Reports whether the description advertises `a=ice-options:trickle`, at session level
/// or in any media section.
pub(crate) fn has_trickle_option(parsed: &SessionDescription) -> bool {
    let advertises = |attributes: &[Attribute]| {
        attributes
            .iter()
            .filter(|a| a.key == ATTR_KEY_ICE_OPTIONS)
            .filter_map(|a| a.value.as_deref())
            .any(|v| v.split_whitespace().any(|o| o == ICE_OPTION_TRICKLE))
    };

    advertises(&parsed.attributes)
        || parsed
            .media_descriptions
            .iter()
            .any(|m| advertises(&m.attributes))
}
