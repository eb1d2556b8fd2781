use serde::{Deserialize, Serialize};
use std::fmt;

use super::candidate_type::RTCIceCandidateType;
use super::protocol::RTCIceProtocol;
use crate::peer_connection::sdp::RTCMediaSection;
use shared::error::{Error, Result};

const CANDIDATE_PREFIX: &str = "candidate:";
const ATTRIBUTE_PREFIX: &str = "a=";
const KEY_TYP: &str = "typ";
const KEY_RADDR: &str = "raddr";
const KEY_RPORT: &str = "rport";
const KEY_TCPTYPE: &str = "tcptype";
const KEY_UFRAG: &str = "ufrag";

#[derive(Default, PartialEq, Eq, Debug, Copy, Clone, Hash, Serialize, Deserialize)]
pub enum RTCIceTcpCandidateType {
    #[default]
    Unspecified,

    #[serde(rename = "active")]
    Active,

    #[serde(rename = "passive")]
    Passive,

    #[serde(rename = "so")]
    SimultaneousOpen,
}

impl From<&str> for RTCIceTcpCandidateType {
    fn from(raw: &str) -> Self {
        match raw {
            "active" => RTCIceTcpCandidateType::Active,
            "passive" => RTCIceTcpCandidateType::Passive,
            "so" => RTCIceTcpCandidateType::SimultaneousOpen,
            _ => RTCIceTcpCandidateType::Unspecified,
        }
    }
}

impl fmt::Display for RTCIceTcpCandidateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTCIceTcpCandidateType::Active => "active",
            RTCIceTcpCandidateType::Passive => "passive",
            RTCIceTcpCandidateType::SimultaneousOpen => "so",
            RTCIceTcpCandidateType::Unspecified => {
                crate::peer_connection::configuration::UNSPECIFIED_STR
            }
        };
        write!(f, "{s}")
    }
}

/// A connectivity candidate, local or remote.
///
/// The attribute part follows the RFC 8839 grammar:
///
/// ```text
/// candidate:<foundation> <component> <transport> <priority> <address> <port> typ <type>
///           [raddr <addr> rport <port>] [tcptype <t>] *(<ext-name> <ext-value>)
/// ```
///
/// `sdp_mid`, `sdp_mline_index` and `username_fragment` come from the surrounding
/// [`RTCIceCandidateInit`]; unknown extension pairs are kept verbatim so a parsed
/// candidate marshals back to an equivalent attribute.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCIceCandidate {
    pub foundation: String,
    pub component: u16,
    pub protocol: RTCIceProtocol,
    pub priority: u32,
    pub address: String,
    pub port: u16,
    pub typ: RTCIceCandidateType,
    pub related_address: Option<String>,
    pub related_port: Option<u16>,
    pub tcp_type: RTCIceTcpCandidateType,
    pub extensions: Vec<(String, String)>,
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex")]
    pub sdp_mline_index: Option<u16>,
    pub username_fragment: Option<String>,
}

fn malformed(raw: &str, reason: &str) -> Error {
    Error::ErrCandidateMalformed(format!("{reason} in {raw:?}"))
}

impl RTCIceCandidate {
    /// Parses a candidate attribute. The `a=` and `candidate:` prefixes are optional.
    pub fn unmarshal(raw: &str) -> Result<RTCIceCandidate> {
        let body = raw.trim();
        let body = body.strip_prefix(ATTRIBUTE_PREFIX).unwrap_or(body);
        let body = body.strip_prefix(CANDIDATE_PREFIX).unwrap_or(body);

        let fields: Vec<&str> = body.split_whitespace().collect();
        if fields.len() < 8 {
            return Err(malformed(raw, "too few fields"));
        }

        let foundation = fields[0].to_owned();
        let component = fields[1]
            .parse::<u16>()
            .map_err(|_| malformed(raw, "invalid component"))?;

        let protocol = RTCIceProtocol::from(fields[2]);
        if protocol == RTCIceProtocol::Unspecified {
            return Err(Error::ErrICEProtocolUnknown);
        }

        let priority = fields[3]
            .parse::<u32>()
            .map_err(|_| malformed(raw, "invalid priority"))?;
        let address = fields[4].to_owned();
        let port = fields[5]
            .parse::<u16>()
            .map_err(|_| malformed(raw, "invalid port"))?;

        if fields[6] != KEY_TYP {
            return Err(malformed(raw, "missing typ"));
        }
        let typ = RTCIceCandidateType::from(fields[7]);
        if typ == RTCIceCandidateType::Unspecified {
            return Err(Error::ErrICECandidateTypeUnknown);
        }

        let rest = &fields[8..];
        if rest.len() % 2 != 0 {
            return Err(malformed(raw, "dangling extension attribute"));
        }

        let mut candidate = RTCIceCandidate {
            foundation,
            component,
            protocol,
            priority,
            address,
            port,
            typ,
            ..Default::default()
        };

        for pair in rest.chunks(2) {
            let (key, value) = (pair[0], pair[1]);
            match key {
                KEY_RADDR => candidate.related_address = Some(value.to_owned()),
                KEY_RPORT => {
                    let rport = value
                        .parse::<u16>()
                        .map_err(|_| malformed(raw, "invalid rport"))?;
                    candidate.related_port = Some(rport);
                }
                KEY_TCPTYPE => candidate.tcp_type = RTCIceTcpCandidateType::from(value),
                _ => {
                    if key == KEY_UFRAG && candidate.username_fragment.is_none() {
                        candidate.username_fragment = Some(value.to_owned());
                    }
                    candidate
                        .extensions
                        .push((key.to_owned(), value.to_owned()));
                }
            }
        }

        Ok(candidate)
    }

    /// Serializes the attribute part, including the `candidate:` prefix.
    pub fn marshal(&self) -> String {
        let mut out = format!(
            "{CANDIDATE_PREFIX}{} {} {} {} {} {} {KEY_TYP} {}",
            self.foundation,
            self.component,
            self.protocol,
            self.priority,
            self.address,
            self.port,
            self.typ
        );

        if let Some(related_address) = &self.related_address {
            out.push_str(&format!(" {KEY_RADDR} {related_address}"));
        }
        if let Some(related_port) = self.related_port {
            out.push_str(&format!(" {KEY_RPORT} {related_port}"));
        }
        if self.tcp_type != RTCIceTcpCandidateType::Unspecified {
            out.push_str(&format!(" {KEY_TCPTYPE} {}", self.tcp_type));
        }
        for (key, value) in &self.extensions {
            out.push_str(&format!(" {key} {value}"));
        }

        out
    }

    /// Builds a candidate from its signaling form.
    ///
    /// Fails for an empty candidate string; end-of-candidates markers are handled by
    /// the connection before parsing.
    pub fn from_init(init: &RTCIceCandidateInit) -> Result<RTCIceCandidate> {
        let mut candidate = RTCIceCandidate::unmarshal(&init.candidate)?;
        candidate.sdp_mid = init.sdp_mid.clone();
        candidate.sdp_mline_index = init.sdp_mline_index;
        if init.username_fragment.is_some() {
            candidate.username_fragment = init.username_fragment.clone();
        }
        Ok(candidate)
    }

    pub fn to_json(&self) -> RTCIceCandidateInit {
        RTCIceCandidateInit {
            candidate: self.marshal(),
            sdp_mid: self.sdp_mid.clone(),
            sdp_mline_index: self.sdp_mline_index,
            username_fragment: self.username_fragment.clone(),
            url: None,
        }
    }

    /// Candidates with equal keys are the same candidate.
    pub(crate) fn dedup_key(&self) -> (String, u16, String, u16) {
        (
            self.foundation.clone(),
            self.component,
            self.address.clone(),
            self.port,
        )
    }

    /// Reports whether the candidate refers to one of `sections`: by mid when one is
    /// given, by `m=` line index otherwise.
    /// Index of the `m=` section this candidate belongs to. A mid found in `sections`
    /// wins over `sdp_mline_index`.
    pub(crate) fn section_index(&self, sections: &[RTCMediaSection]) -> Option<u16> {
        self.sdp_mid
            .as_deref()
            .filter(|mid| !mid.is_empty())
            .and_then(|mid| sections.iter().find(|s| s.mid.as_deref() == Some(mid)))
            .and_then(|section| u16::try_from(section.index).ok())
            .or(self.sdp_mline_index)
    }

    pub(crate) fn matches_section(&self, sections: &[RTCMediaSection]) -> bool {
        match (self.sdp_mid.as_deref(), self.sdp_mline_index) {
            (Some(mid), _) if !mid.is_empty() => {
                sections.iter().any(|s| s.mid.as_deref() == Some(mid))
            }
            (_, Some(index)) => (index as usize) < sections.len(),
            _ => false,
        }
    }
}

impl fmt::Display for RTCIceCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}:{}",
            self.protocol, self.typ, self.address, self.port
        )?;
        if let (Some(raddr), Some(rport)) = (&self.related_address, self.related_port) {
            write!(f, " related {raddr}:{rport}")?;
        }
        Ok(())
    }
}

/// The W3C `RTCIceCandidateInit` dictionary exchanged over the signaling channel.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCIceCandidateInit {
    pub candidate: String,
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex")]
    pub sdp_mline_index: Option<u16>,
    pub username_fragment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl RTCIceCandidateInit {
    /// An empty candidate string marks the end of candidates for a generation.
    pub fn is_end_of_candidates(&self) -> bool {
        self.candidate.trim().is_empty()
    }
}
