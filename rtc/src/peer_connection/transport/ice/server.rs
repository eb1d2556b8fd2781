use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use shared::error::{Error, Result};

const SCHEME_STUN: &str = "stun";
const SCHEME_STUNS: &str = "stuns";
const SCHEME_TURN: &str = "turn";
const SCHEME_TURNS: &str = "turns";

/// How the credential of a TURN server is to be interpreted.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RTCIceCredentialType {
    #[default]
    #[serde(rename = "password")]
    Password,

    #[serde(rename = "oauth")]
    Oauth,
}

impl fmt::Display for RTCIceCredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RTCIceCredentialType::Password => write!(f, "password"),
            RTCIceCredentialType::Oauth => write!(f, "oauth"),
        }
    }
}

/// A STUN or TURN server the engine may use to gather candidates.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCIceServer {
    pub urls: Vec<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub credential: String,
    #[serde(default)]
    pub credential_type: RTCIceCredentialType,
}

impl RTCIceServer {
    /// Parses every URL and checks TURN credentials.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.urls.is_empty() {
            return Err(Error::ErrIceServerNoUrls);
        }
        for raw in &self.urls {
            self.validate_url(raw)?;
        }
        Ok(())
    }

    fn validate_url(&self, raw: &str) -> Result<()> {
        let url = Url::parse(raw)?;
        match url.scheme() {
            SCHEME_STUN | SCHEME_STUNS => {}
            SCHEME_TURN | SCHEME_TURNS => {
                if self.username.is_empty() || self.credential.is_empty() {
                    return Err(Error::ErrNoTurnCredentials);
                }
            }
            scheme => {
                return Err(Error::ErrInvalidIceServerUrl {
                    url: raw.to_owned(),
                    reason: format!("unknown scheme {scheme}"),
                });
            }
        }

        // stun/turn URIs are opaque: "turn:host:port", so the host lives in the path
        let host = url.host_str().unwrap_or_else(|| url.path());
        if host.is_empty() {
            return Err(Error::ErrInvalidIceServerUrl {
                url: raw.to_owned(),
                reason: "missing host".to_owned(),
            });
        }
        Ok(())
    }

    /// URLs as handed to the engine: a query on a `stun(s):` URL is dropped.
    pub(crate) fn engine_urls(&self) -> Vec<String> {
        self.urls
            .iter()
            .map(|raw| {
                if raw.starts_with(SCHEME_STUN) {
                    raw.split('?').next().unwrap_or(raw).to_owned()
                } else {
                    raw.clone()
                }
            })
            .collect()
    }
}
