//! Event type and WebSocket message type constants for the real-time layer.
//!
//! Event types name what happened (`alert.triggered`); the event router
//! copies them verbatim into the `type` field of outbound WebSocket frames,
//! so the same constants serve both sides of the bus.

/// A rule fired and a new alert row was persisted.
pub const EVENT_ALERT_TRIGGERED: &str = "alert.triggered";

/// An operator acknowledged an active alert.
pub const EVENT_ALERT_ACKNOWLEDGED: &str = "alert.acknowledged";

/// An operator resolved an alert.
pub const EVENT_ALERT_RESOLVED: &str = "alert.resolved";

/// The escalation scanner re-notified an aged, unacknowledged alert.
pub const EVENT_ALERT_ESCALATED: &str = "alert.escalated";

/// A device came online, went offline, or reported a heartbeat.
pub const EVENT_DEVICE_STATUS: &str = "device.status";

/// A server-initiated control command for a device (arm/disarm).
pub const EVENT_DEVICE_COMMAND: &str = "device.command";

// ---------------------------------------------------------------------------
// Client-facing frames that are not bus events
// ---------------------------------------------------------------------------

/// Confirmation of a successful topic subscription.
pub const MSG_TYPE_SUBSCRIBED: &str = "subscribed";

/// Confirmation of a topic unsubscription.
pub const MSG_TYPE_UNSUBSCRIBED: &str = "unsubscribed";

/// Typed error frame, delivered only to the requesting session.
pub const MSG_TYPE_ERROR: &str = "error";

/// Error code for a subscription to a nonexistent device or location.
pub const ERROR_CODE_UNKNOWN_ENTITY: &str = "unknown_entity";

/// Error code for a role-gated action attempted without privilege.
pub const ERROR_CODE_FORBIDDEN: &str = "forbidden";

/// Error code for a status transition from an unexpected prior state.
pub const ERROR_CODE_CONFLICT: &str = "conflict";

/// Error code for a malformed client frame.
pub const ERROR_CODE_BAD_MESSAGE: &str = "bad_message";

/// Error code for a transient server-side failure while handling a frame.
pub const ERROR_CODE_INTERNAL: &str = "internal";
