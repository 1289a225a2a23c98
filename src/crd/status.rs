//! # Aws Status
//!
//! Observed state written by the controller.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of the Aws resource
///
/// `state` stays a plain string on the wire so that records written by other
/// tooling (or an empty string) never fail to deserialize.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AwsStatus {
    /// Lifecycle phase: PENDING, READY or TAINTED. Empty until claimed.
    #[serde(default)]
    pub state: String,
}

/// Account lifecycle phase
///
/// Transitions are one-directional: unset -> `Pending` -> `Ready`.
/// `Tainted` is reserved; nothing produces or consumes it yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountPhase {
    Pending,
    Ready,
    Tainted,
}

impl AccountPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountPhase::Pending => "PENDING",
            AccountPhase::Ready => "READY",
            AccountPhase::Tainted => "TAINTED",
        }
    }
}

impl fmt::Display for AccountPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when `status.state` holds something other than a known phase
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown account phase: {0:?}")]
pub struct UnknownPhase(pub String);

impl FromStr for AccountPhase {
    type Err = UnknownPhase;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(AccountPhase::Pending),
            "READY" => Ok(AccountPhase::Ready),
            "TAINTED" => Ok(AccountPhase::Tainted),
            other => Err(UnknownPhase(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_display_matches_wire_value() {
        assert_eq!(AccountPhase::Pending.to_string(), "PENDING");
        assert_eq!(
            serde_json::to_value(AccountPhase::Ready).unwrap(),
            serde_json::json!("READY")
        );
    }

    #[test]
    fn test_parse_rejects_empty_and_lowercase() {
        assert_eq!("TAINTED".parse::<AccountPhase>(), Ok(AccountPhase::Tainted));
        assert_eq!("".parse::<AccountPhase>(), Err(UnknownPhase(String::new())));
        assert!("ready".parse::<AccountPhase>().is_err());
    }

    #[test]
    fn test_status_defaults_to_empty_state() {
        let status: AwsStatus = serde_json::from_str("{}").unwrap();
        assert_eq!(status, AwsStatus::default());
        assert!(status.state.is_empty());
    }
}
