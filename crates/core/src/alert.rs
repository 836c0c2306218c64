//! Alert severity and lifecycle status types.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Severity of a rule and the alerts it produces.
///
/// Ordered so that `Info < Warning < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "critical" => Ok(Self::Critical),
            other => Err(CoreError::Validation(format!(
                "invalid severity '{other}' (expected info, warning, or critical)"
            ))),
        }
    }

    /// How long an alert of this severity may stay active and
    /// unacknowledged before the escalation scanner re-notifies.
    pub fn escalation_threshold(self) -> chrono::Duration {
        match self {
            Self::Critical => chrono::Duration::minutes(15),
            Self::Warning => chrono::Duration::minutes(30),
            Self::Info => chrono::Duration::minutes(60),
        }
    }
}

/// Lifecycle status of an alert.
///
/// Transitions are `Active -> Acknowledged -> Resolved` or
/// `Active -> Resolved`; the persistence layer enforces them with a
/// conditional update keyed on the expected prior status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Acknowledged => "acknowledged",
            Self::Resolved => "resolved",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "active" => Ok(Self::Active),
            "acknowledged" => Ok(Self::Acknowledged),
            "resolved" => Ok(Self::Resolved),
            other => Err(CoreError::Validation(format!(
                "invalid alert status '{other}' (expected active, acknowledged, or resolved)"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Critical);
    }

    #[test]
    fn escalation_thresholds_tighten_with_severity() {
        assert!(
            Severity::Critical.escalation_threshold() < Severity::Warning.escalation_threshold()
        );
        assert!(Severity::Warning.escalation_threshold() < Severity::Info.escalation_threshold());
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            AlertStatus::Active,
            AlertStatus::Acknowledged,
            AlertStatus::Resolved,
        ] {
            assert_eq!(AlertStatus::from_str(status.as_str()).unwrap(), status);
        }
        assert!(AlertStatus::from_str("archived").is_err());
    }
}
