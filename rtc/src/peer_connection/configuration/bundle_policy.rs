use std::fmt;

use serde::{Deserialize, Serialize};

/// Which media sections the engine may bundle onto one transport.
///
/// Fixed at construction: `set_configuration` rejects a change with
/// `ErrModifyingBundlePolicy`.
#[derive(Default, Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
pub enum RTCBundlePolicy {
    Unspecified = 0,

    /// One transport per media type unless the remote peer is bundle aware.
    #[default]
    #[serde(rename = "balanced")]
    Balanced = 1,

    /// One transport per track.
    #[serde(rename = "max-compat")]
    MaxCompat = 2,

    /// A single transport for everything.
    #[serde(rename = "max-bundle")]
    MaxBundle = 3,
}

const BUNDLE_POLICY_BALANCED_STR: &str = "balanced";
const BUNDLE_POLICY_MAX_COMPAT_STR: &str = "max-compat";
const BUNDLE_POLICY_MAX_BUNDLE_STR: &str = "max-bundle";

impl From<&str> for RTCBundlePolicy {
    fn from(raw: &str) -> Self {
        match raw {
            BUNDLE_POLICY_BALANCED_STR => RTCBundlePolicy::Balanced,
            BUNDLE_POLICY_MAX_COMPAT_STR => RTCBundlePolicy::MaxCompat,
            BUNDLE_POLICY_MAX_BUNDLE_STR => RTCBundlePolicy::MaxBundle,
            _ => RTCBundlePolicy::Unspecified,
        }
    }
}

impl fmt::Display for RTCBundlePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTCBundlePolicy::Balanced => BUNDLE_POLICY_BALANCED_STR,
            RTCBundlePolicy::MaxCompat => BUNDLE_POLICY_MAX_COMPAT_STR,
            RTCBundlePolicy::MaxBundle => BUNDLE_POLICY_MAX_BUNDLE_STR,
            RTCBundlePolicy::Unspecified => super::UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}
