use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of [`Error`] values.
///
/// Structural and input errors (`InvalidState`, `SdpParse`, `Candidate`, `DataChannel`,
/// `InvalidConfiguration`) are returned synchronously and never change state.
/// `EngineFailure` is raised by the transport engine, `OperationAborted` by closing a
/// connection with requests still in flight.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidState,
    SdpParse,
    Candidate,
    EngineInit,
    OperationAborted,
    EngineFailure,
    DataChannel,
    InvalidConfiguration,
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            ErrorKind::InvalidState => "InvalidStateError",
            ErrorKind::SdpParse => "SdpParseError",
            ErrorKind::Candidate => "CandidateError",
            ErrorKind::EngineInit => "EngineInitError",
            ErrorKind::OperationAborted => "OperationAborted",
            ErrorKind::EngineFailure => "EngineFailure",
            ErrorKind::DataChannel => "DataChannelError",
            ErrorKind::InvalidConfiguration => "InvalidConfiguration",
            ErrorKind::Other => "Other",
        };
        write!(f, "{s}")
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    //Signaling
    /// ErrConnectionClosed indicates an operation executed after connection
    /// has already been closed.
    #[error("connection closed")]
    ErrConnectionClosed,
    #[error("invalid proposed signaling state transition: {0}")]
    ErrSignalingStateProposedTransitionInvalid(String),
    #[error("can't rollback from stable state")]
    ErrSignalingStateCannotRollback,
    /// ErrNoRemoteDescription indicates that an operation was rejected because
    /// the remote description is not set
    #[error("remote description is not set")]
    ErrNoRemoteDescription,
    /// ErrIncorrectSignalingState indicates that the signaling state of PeerConnection is not correct
    #[error("operation can not be run in current signaling state")]
    ErrIncorrectSignalingState,
    #[error("new sdp does not match previous offer")]
    ErrSDPDoesNotMatchOffer,
    #[error("new sdp does not match previous answer")]
    ErrSDPDoesNotMatchAnswer,
    #[error("provided value is not a valid enum value of type SDPType")]
    ErrPeerConnSDPTypeInvalidValue,
    #[error("invalid SDP type supplied to SetLocalDescription()")]
    ErrPeerConnSDPTypeInvalidValueSetLocalDescription,

    //SDP
    #[error("sdp: {0}")]
    ErrSdpParse(String),
    #[error("sdp: payload is empty")]
    ErrSdpEmpty,

    //ICE candidates
    #[error("ice candidate: {0}")]
    ErrCandidateMalformed(String),
    #[error("unknown candidate type")]
    ErrICECandidateTypeUnknown,
    #[error("unknown protocol")]
    ErrICEProtocolUnknown,
    #[error("candidate is missing both sdpMid and sdpMLineIndex")]
    ErrCandidateMissingMediaReference,
    #[error("candidate rejected: {0}")]
    ErrCandidateRejected(String),

    //Engine
    #[error("engine failed to initialize session: {0}")]
    ErrEngineInit(String),
    #[error("operation aborted: peer connection closed")]
    ErrOperationAborted,
    #[error("engine failure: {0}")]
    ErrEngineFailure(String),

    //Data channel
    /// ErrDataChannelNonExist indicates an operation executed when the data
    /// channel not existed.
    #[error("data channel not existed")]
    ErrDataChannelNotExisted,
    #[error("data channel id {0} is already in use")]
    ErrDataChannelIdInUse(u16),
    #[error("Max Data Channel ID")]
    ErrMaxDataChannelID,
    #[error("engine allocated data channel id {actual}, expected {expected}")]
    ErrDataChannelIdMismatch { expected: u16, actual: u16 },
    /// ErrStringSizeLimit indicates that the character size limit of string is
    /// exceeded. The limit is hardcoded to 65535 according to specifications.
    #[error("data channel label exceeds size limit")]
    ErrStringSizeLimit,
    /// ErrProtocolTooLarge indicates that value given for a DataChannelInit protocol is
    /// longer then 65535 bytes
    #[error("protocol is larger then 65535 bytes")]
    ErrProtocolTooLarge,
    /// ErrRetransmitsOrPacketLifeTime indicates that an attempt to create a data
    /// channel was made with both options max_packet_life_time and max_retransmits
    /// set together. Such configuration is not supported by the specification
    /// and is mutually exclusive.
    #[error("both max_packet_life_time and max_retransmits was set")]
    ErrRetransmitsOrPacketLifeTime,

    //Configuration
    #[error("invalid ice server url {url}: {reason}")]
    ErrInvalidIceServerUrl { url: String, reason: String },
    #[error("ice server has no urls")]
    ErrIceServerNoUrls,
    /// ErrNoTurnCredentials indicates that a TURN server URL was provided
    /// without required credentials.
    #[error("turn server credentials required")]
    ErrNoTurnCredentials,
    /// ErrCertificateExpired indicates that an x509 certificate has expired.
    #[error("x509Cert expired")]
    ErrCertificateExpired,
    #[error("certificate is not PEM encoded")]
    ErrCertificateInvalidPem,
    /// ErrModifyingPeerIdentity indicates that an attempt to modify
    /// PeerIdentity was made after PeerConnection has been initialized.
    #[error("peerIdentity cannot be modified")]
    ErrModifyingPeerIdentity,
    /// ErrModifyingCertificates indicates that an attempt to modify
    /// Certificates was made after PeerConnection has been initialized.
    #[error("certificates cannot be modified")]
    ErrModifyingCertificates,
    /// ErrModifyingBundlePolicy indicates that an attempt to modify
    /// BundlePolicy was made after PeerConnection has been initialized.
    #[error("bundle policy cannot be modified")]
    ErrModifyingBundlePolicy,
    /// ErrModifyingRTCPMuxPolicy indicates that an attempt to modify
    /// RTCPMuxPolicy was made after PeerConnection has been initialized.
    #[error("rtcp mux policy cannot be modified")]
    ErrModifyingRTCPMuxPolicy,
    #[error("url: {0}")]
    Url(#[from] url::ParseError),

    #[error("mutex poison: {0}")]
    PoisonError(String),
    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ErrConnectionClosed
            | Error::ErrSignalingStateProposedTransitionInvalid(_)
            | Error::ErrSignalingStateCannotRollback
            | Error::ErrNoRemoteDescription
            | Error::ErrIncorrectSignalingState
            | Error::ErrSDPDoesNotMatchOffer
            | Error::ErrSDPDoesNotMatchAnswer
            | Error::ErrPeerConnSDPTypeInvalidValue
            | Error::ErrPeerConnSDPTypeInvalidValueSetLocalDescription => ErrorKind::InvalidState,

            Error::ErrSdpParse(_) | Error::ErrSdpEmpty => ErrorKind::SdpParse,

            Error::ErrCandidateMalformed(_)
            | Error::ErrICECandidateTypeUnknown
            | Error::ErrICEProtocolUnknown
            | Error::ErrCandidateMissingMediaReference
            | Error::ErrCandidateRejected(_) => ErrorKind::Candidate,

            Error::ErrEngineInit(_) => ErrorKind::EngineInit,
            Error::ErrOperationAborted => ErrorKind::OperationAborted,
            Error::ErrEngineFailure(_) => ErrorKind::EngineFailure,

            Error::ErrDataChannelNotExisted
            | Error::ErrDataChannelIdInUse(_)
            | Error::ErrMaxDataChannelID
            | Error::ErrDataChannelIdMismatch { .. }
            | Error::ErrStringSizeLimit
            | Error::ErrProtocolTooLarge
            | Error::ErrRetransmitsOrPacketLifeTime => ErrorKind::DataChannel,

            Error::ErrInvalidIceServerUrl { .. }
            | Error::ErrIceServerNoUrls
            | Error::ErrNoTurnCredentials
            | Error::ErrCertificateExpired
            | Error::ErrCertificateInvalidPem
            | Error::ErrModifyingPeerIdentity
            | Error::ErrModifyingCertificates
            | Error::ErrModifyingBundlePolicy
            | Error::ErrModifyingRTCPMuxPolicy
            | Error::Url(_) => ErrorKind::InvalidConfiguration,

            Error::PoisonError(_) | Error::Other(_) => ErrorKind::Other,
        }
    }

    /// Shorthand for `kind() == ErrorKind::InvalidState`.
    pub fn is_invalid_state(&self) -> bool {
        self.kind() == ErrorKind::InvalidState
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Error::PoisonError(e.to_string())
    }
}

/// flatten_errs flattens multiple errors into one
pub fn flatten_errs(errs: Vec<impl Into<Error>>) -> Result<()> {
    if errs.is_empty() {
        Ok(())
    } else {
        let errs_strs: Vec<String> = errs.into_iter().map(|e| e.into().to_string()).collect();
        Err(Error::Other(errs_strs.join("\n")))
    }
}
