//! DTLS certificates supplied through the configuration.
//!
//! Key generation and fingerprinting are done by the transport engine; the negotiation
//! core only carries the PEM text to the engine and refuses expired certificates.

use std::time::SystemTime;

use shared::error::{Error, Result};

const PEM_CERTIFICATE_BEGIN: &str = "-----BEGIN CERTIFICATE-----";
const PEM_CERTIFICATE_END: &str = "-----END CERTIFICATE-----";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RTCCertificate {
    pub(crate) pem: String,
    pub(crate) expires: SystemTime,
}

impl RTCCertificate {
    /// Wraps a PEM encoded certificate (optionally followed by its private key) that
    /// stops being valid at `expires`.
    pub fn from_pem(pem: &str, expires: SystemTime) -> Result<Self> {
        let begin = pem
            .find(PEM_CERTIFICATE_BEGIN)
            .ok_or(Error::ErrCertificateInvalidPem)?;
        if !pem[begin..].contains(PEM_CERTIFICATE_END) {
            return Err(Error::ErrCertificateInvalidPem);
        }

        Ok(RTCCertificate {
            pem: pem.to_owned(),
            expires,
        })
    }

    pub fn pem(&self) -> &str {
        &self.pem
    }

    pub fn expires(&self) -> SystemTime {
        self.expires
    }

    pub fn is_expired(&self) -> bool {
        self.expires <= SystemTime::now()
    }
}
