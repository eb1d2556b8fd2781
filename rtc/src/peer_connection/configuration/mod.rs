//! Peer connection configuration.
//!
//! [`RTCConfiguration`] is built once, copied into the connection at construction and
//! never aliased: mutating the caller's value afterwards has no effect. It serializes to
//! the W3C `RTCConfiguration` dictionary:
//!
//! ```
//! use rtc_peer::peer_connection::configuration::{RTCConfiguration, RTCIceTransportPolicy};
//!
//! let json = r#"{"iceServers":[{"urls":["stun:stun.l.google.com:19302"]}],
//!                "iceTransportPolicy":"relay"}"#;
//! let config: RTCConfiguration = serde_json::from_str(json).unwrap();
//! assert_eq!(config.ice_transport_policy(), RTCIceTransportPolicy::Relay);
//! ```

pub mod bundle_policy;
pub mod ice_transport_policy;
pub mod offer_answer_options;
pub mod rtcp_mux_policy;

use serde::{Deserialize, Serialize};

use crate::peer_connection::certificate::RTCCertificate;
use crate::peer_connection::transport::RTCIceServer;
use shared::error::{Error, Result};

pub use bundle_policy::RTCBundlePolicy;
pub use ice_transport_policy::RTCIceTransportPolicy;
pub use offer_answer_options::{RTCAnswerOptions, RTCOfferOptions};
pub use rtcp_mux_policy::RTCRtcpMuxPolicy;

/// Display form of every `Unspecified` enum variant.
pub(crate) const UNSPECIFIED_STR: &str = "Unspecified";

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCConfiguration {
    #[serde(default)]
    pub(crate) ice_servers: Vec<RTCIceServer>,

    #[serde(default)]
    pub(crate) ice_transport_policy: RTCIceTransportPolicy,

    #[serde(default)]
    pub(crate) bundle_policy: RTCBundlePolicy,

    #[serde(default)]
    pub(crate) rtcp_mux_policy: RTCRtcpMuxPolicy,

    /// Target peer identity; when set the connection only accepts that remote identity.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub(crate) peer_identity: String,

    #[serde(skip)]
    pub(crate) certificates: Vec<RTCCertificate>,

    #[serde(default)]
    pub(crate) ice_candidate_pool_size: u16,
}

impl RTCConfiguration {
    pub fn ice_servers(&self) -> &[RTCIceServer] {
        &self.ice_servers
    }

    pub fn ice_transport_policy(&self) -> RTCIceTransportPolicy {
        self.ice_transport_policy
    }

    pub fn bundle_policy(&self) -> RTCBundlePolicy {
        self.bundle_policy
    }

    pub fn rtcp_mux_policy(&self) -> RTCRtcpMuxPolicy {
        self.rtcp_mux_policy
    }

    pub fn peer_identity(&self) -> &str {
        &self.peer_identity
    }

    pub fn certificates(&self) -> &[RTCCertificate] {
        &self.certificates
    }

    pub fn ice_candidate_pool_size(&self) -> u16 {
        self.ice_candidate_pool_size
    }

    /// ICE servers as handed to the engine, with `stun:` queries stripped.
    pub(crate) fn get_ice_servers(&self) -> Vec<RTCIceServer> {
        self.ice_servers
            .iter()
            .map(|server| RTCIceServer {
                urls: server.engine_urls(),
                ..server.clone()
            })
            .collect()
    }

    /// Checks every ICE server URL and every certificate.
    pub(crate) fn validate(&self) -> Result<()> {
        for ice_server in &self.ice_servers {
            ice_server.validate()?;
        }
        if self.certificates.iter().any(|c| c.is_expired()) {
            return Err(Error::ErrCertificateExpired);
        }
        Ok(())
    }

    /// Applies the W3C setConfiguration rules: identity, certificates and the bundle and
    /// rtcp-mux policies are fixed once the connection exists.
    pub(crate) fn check_update(&self, next: &RTCConfiguration) -> Result<()> {
        if !next.peer_identity.is_empty() && next.peer_identity != self.peer_identity {
            return Err(Error::ErrModifyingPeerIdentity);
        }
        if !next.certificates.is_empty() && next.certificates != self.certificates {
            return Err(Error::ErrModifyingCertificates);
        }
        if next.bundle_policy != self.bundle_policy {
            return Err(Error::ErrModifyingBundlePolicy);
        }
        if next.rtcp_mux_policy != self.rtcp_mux_policy {
            return Err(Error::ErrModifyingRTCPMuxPolicy);
        }
        next.validate()
    }
}

#[derive(Default)]
pub struct RTCConfigurationBuilder {
    ice_servers: Vec<RTCIceServer>,
    ice_transport_policy: RTCIceTransportPolicy,
    bundle_policy: RTCBundlePolicy,
    rtcp_mux_policy: RTCRtcpMuxPolicy,
    peer_identity: String,
    certificates: Vec<RTCCertificate>,
    ice_candidate_pool_size: u16,
}

impl RTCConfigurationBuilder {
    pub fn new() -> Self {
        RTCConfigurationBuilder::default()
    }

    pub fn with_ice_servers(mut self, ice_servers: Vec<RTCIceServer>) -> Self {
        self.ice_servers = ice_servers;
        self
    }

    pub fn with_ice_transport_policy(
        mut self,
        ice_transport_policy: RTCIceTransportPolicy,
    ) -> Self {
        self.ice_transport_policy = ice_transport_policy;
        self
    }

    pub fn with_bundle_policy(mut self, bundle_policy: RTCBundlePolicy) -> Self {
        self.bundle_policy = bundle_policy;
        self
    }

    pub fn with_rtcp_mux_policy(mut self, rtcp_mux_policy: RTCRtcpMuxPolicy) -> Self {
        self.rtcp_mux_policy = rtcp_mux_policy;
        self
    }

    pub fn with_peer_identity(mut self, peer_identity: String) -> Self {
        self.peer_identity = peer_identity;
        self
    }

    pub fn with_certificates(mut self, certificates: Vec<RTCCertificate>) -> Self {
        self.certificates = certificates;
        self
    }

    pub fn with_ice_candidate_pool_size(mut self, ice_candidate_pool_size: u16) -> Self {
        self.ice_candidate_pool_size = ice_candidate_pool_size;
        self
    }

    pub fn build(self) -> RTCConfiguration {
        RTCConfiguration {
            ice_servers: self.ice_servers,
            ice_transport_policy: self.ice_transport_policy,
            bundle_policy: self.bundle_policy,
            rtcp_mux_policy: self.rtcp_mux_policy,
            peer_identity: self.peer_identity,
            certificates: self.certificates,
            ice_candidate_pool_size: self.ice_candidate_pool_size,
        }
    }
}
