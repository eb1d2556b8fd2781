/// Options for `create_answer`. Passed through to the engine.
#[derive(Default, Debug, PartialEq, Eq, Copy, Clone)]
pub struct RTCAnswerOptions {
    pub voice_activity_detection: bool,
}

/// Options for `create_offer`.
#[derive(Default, Debug, PartialEq, Eq, Copy, Clone)]
pub struct RTCOfferOptions {
    pub voice_activity_detection: bool,

    /// Generate new ICE credentials so the engine restarts connectivity checks.
    /// Also set implicitly after `restart_ice`.
    pub ice_restart: bool,
}
