//! Subscription topics for real-time event delivery.
//!
//! A topic names an audience: one device's watchers, one location's
//! watchers, one user's own sessions, or the global alert feed. The wire
//! form is the string a client sends in a subscribe frame
//! (`"device:42"`, `"location:7"`, `"user:3"`, `"global-alerts"`).

use std::fmt;

use serde::Serialize;

use crate::error::CoreError;
use crate::types::DbId;

/// The global alert feed topic in wire form.
pub const TOPIC_GLOBAL_ALERTS: &str = "global-alerts";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Device(DbId),
    Location(DbId),
    User(DbId),
    GlobalAlerts,
}

impl Topic {
    /// Parse the wire form of a topic.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        if s == TOPIC_GLOBAL_ALERTS {
            return Ok(Self::GlobalAlerts);
        }
        if let Some((kind, id)) = s.split_once(':') {
            let id: DbId = id.parse().map_err(|_| {
                CoreError::Validation(format!("invalid topic id in '{s}' (expected an integer)"))
            })?;
            return match kind {
                "device" => Ok(Self::Device(id)),
                "location" => Ok(Self::Location(id)),
                "user" => Ok(Self::User(id)),
                other => Err(CoreError::Validation(format!(
                    "unknown topic kind '{other}' (expected device, location, or user)"
                ))),
            };
        }
        Err(CoreError::Validation(format!(
            "invalid topic '{s}' (expected device:<id>, location:<id>, user:<id>, or {TOPIC_GLOBAL_ALERTS})"
        )))
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device(id) => write!(f, "device:{id}"),
            Self::Location(id) => write!(f, "location:{id}"),
            Self::User(id) => write!(f, "user:{id}"),
            Self::GlobalAlerts => f.write_str(TOPIC_GLOBAL_ALERTS),
        }
    }
}

impl Serialize for Topic {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_displays_round_trip() {
        for topic in [
            Topic::Device(42),
            Topic::Location(7),
            Topic::User(3),
            Topic::GlobalAlerts,
        ] {
            assert_eq!(Topic::parse(&topic.to_string()).unwrap(), topic);
        }
    }

    #[test]
    fn rejects_malformed_topics() {
        assert!(Topic::parse("device:abc").is_err());
        assert!(Topic::parse("planet:1").is_err());
        assert!(Topic::parse("global").is_err());
        assert!(Topic::parse("").is_err());
    }
}
