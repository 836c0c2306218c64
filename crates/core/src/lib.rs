//! Fleetwatch domain logic.
//!
//! Pure, I/O-free building blocks shared by every other crate:
//!
//! - [`condition`] — the four condition kinds and their evaluation.
//! - [`rule`] — rule configuration and the combined trigger verdict.
//! - [`debounce`] — consecutive-violation counting and cooldown suppression.
//! - [`history`] — the bounded recent-values window per sensor.
//! - [`topic`] — subscription topics for real-time event delivery.
//! - [`alert`] — severity and alert status types.
//! - [`error`] — the [`CoreError`](error::CoreError) taxonomy.

pub mod alert;
pub mod alert_events;
pub mod condition;
pub mod debounce;
pub mod device_keys;
pub mod error;
pub mod hashing;
pub mod history;
pub mod roles;
pub mod rule;
pub mod topic;
pub mod types;

pub use alert::{AlertStatus, Severity};
pub use condition::ConditionClause;
pub use debounce::{DebounceConfig, DebounceDecision, RuleRuntimeState};
pub use error::CoreError;
pub use history::ValueHistory;
pub use rule::{evaluate_rule, RuleConfig, RuleVerdict, TriggerLogic};
pub use topic::Topic;
