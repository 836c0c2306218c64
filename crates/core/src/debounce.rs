//! Debounce and cooldown state machine for one (device, sensor, rule) key.
//!
//! Turns a stream of per-reading verdicts into at most one alert per
//! qualifying episode: a rule must trigger on N *consecutive* readings
//! before it fires, and after firing it is suppressed for the cooldown
//! window. Both knobs are configured per rule.

use serde::Serialize;

use crate::types::Timestamp;

/// Per-rule debounce configuration.
#[derive(Debug, Clone, Copy)]
pub struct DebounceConfig {
    /// Consecutive triggering evaluations required before an alert fires.
    pub consecutive_required: u32,
    /// Suppression window after an alert fires.
    pub cooldown: chrono::Duration,
}

/// Outcome of applying one verdict to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DebounceDecision {
    /// The rule did not trigger; the consecutive-hit counter was reset.
    NotTriggered,
    /// The rule triggered inside the cooldown window; nothing changed.
    Suppressed,
    /// The rule triggered but has not yet reached the required streak.
    Accumulating { hits: u32 },
    /// The required streak was reached: emit an alert.
    Fire,
}

/// Mutable runtime state for one rule key.
///
/// Held in memory only. A process restart resets hit counters and cooldowns
/// mid-window; this is an accepted approximation (a lost counter means a
/// slightly delayed alert, never a wrong one).
#[derive(Debug, Clone, Default)]
pub struct RuleRuntimeState {
    consecutive_hits: u32,
    last_triggered_at: Option<Timestamp>,
    cooldown_until: Option<Timestamp>,
}

impl RuleRuntimeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// When the rule last fired an alert, if ever.
    pub fn last_triggered_at(&self) -> Option<Timestamp> {
        self.last_triggered_at
    }

    /// Apply one verdict.
    ///
    /// Verdicts for the same key must be applied in reading order; the
    /// caller is responsible for per-key serialization.
    pub fn observe(
        &mut self,
        triggered: bool,
        now: Timestamp,
        config: &DebounceConfig,
    ) -> DebounceDecision {
        if !triggered {
            // Strict consecutiveness: no partial credit across gaps.
            self.consecutive_hits = 0;
            return DebounceDecision::NotTriggered;
        }

        if let Some(cooldown_until) = self.cooldown_until {
            if now < cooldown_until {
                return DebounceDecision::Suppressed;
            }
        }

        self.consecutive_hits += 1;
        if self.consecutive_hits >= config.consecutive_required {
            self.consecutive_hits = 0;
            self.last_triggered_at = Some(now);
            self.cooldown_until = Some(now + config.cooldown);
            DebounceDecision::Fire
        } else {
            DebounceDecision::Accumulating {
                hits: self.consecutive_hits,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn config(required: u32, cooldown_minutes: i64) -> DebounceConfig {
        DebounceConfig {
            consecutive_required: required,
            cooldown: Duration::minutes(cooldown_minutes),
        }
    }

    #[test]
    fn three_consecutive_hits_fire_exactly_once() {
        let mut state = RuleRuntimeState::new();
        let cfg = config(3, 15);
        let now = Utc::now();

        assert_eq!(
            state.observe(true, now, &cfg),
            DebounceDecision::Accumulating { hits: 1 }
        );
        assert_eq!(
            state.observe(true, now + Duration::seconds(1), &cfg),
            DebounceDecision::Accumulating { hits: 2 }
        );
        assert_eq!(
            state.observe(true, now + Duration::seconds(2), &cfg),
            DebounceDecision::Fire
        );
    }

    #[test]
    fn gap_resets_the_streak() {
        let mut state = RuleRuntimeState::new();
        let cfg = config(3, 15);
        let now = Utc::now();

        state.observe(true, now, &cfg);
        state.observe(true, now + Duration::seconds(1), &cfg);
        // A non-triggering reading between hits: back to zero.
        assert_eq!(
            state.observe(false, now + Duration::seconds(2), &cfg),
            DebounceDecision::NotTriggered
        );
        // Two more hits are not enough; 2 + 1 non-consecutive never fires.
        assert_eq!(
            state.observe(true, now + Duration::seconds(3), &cfg),
            DebounceDecision::Accumulating { hits: 1 }
        );
        assert_eq!(
            state.observe(true, now + Duration::seconds(4), &cfg),
            DebounceDecision::Accumulating { hits: 2 }
        );
    }

    #[test]
    fn cooldown_suppresses_requalifying_trigger() {
        let mut state = RuleRuntimeState::new();
        let cfg = config(1, 15);
        let now = Utc::now();

        assert_eq!(state.observe(true, now, &cfg), DebounceDecision::Fire);
        // A second qualifying trigger within the window produces nothing.
        assert_eq!(
            state.observe(true, now + Duration::minutes(5), &cfg),
            DebounceDecision::Suppressed
        );
        assert_eq!(
            state.observe(true, now + Duration::minutes(14), &cfg),
            DebounceDecision::Suppressed
        );
    }

    #[test]
    fn new_episode_fires_after_cooldown_expiry() {
        let mut state = RuleRuntimeState::new();
        let cfg = config(2, 15);
        let now = Utc::now();

        state.observe(true, now, &cfg);
        assert_eq!(
            state.observe(true, now + Duration::seconds(1), &cfg),
            DebounceDecision::Fire
        );

        // Past the cooldown, a fresh qualifying sequence fires exactly once.
        let later = now + Duration::minutes(16);
        assert_eq!(
            state.observe(true, later, &cfg),
            DebounceDecision::Accumulating { hits: 1 }
        );
        assert_eq!(
            state.observe(true, later + Duration::seconds(1), &cfg),
            DebounceDecision::Fire
        );
    }

    #[test]
    fn suppressed_triggers_do_not_accumulate_hits() {
        let mut state = RuleRuntimeState::new();
        let cfg = config(2, 15);
        let now = Utc::now();

        state.observe(true, now, &cfg);
        state.observe(true, now + Duration::seconds(1), &cfg); // fires

        // Triggers during cooldown leave the counter untouched, so the
        // first post-cooldown hit starts a fresh streak at 1.
        state.observe(true, now + Duration::minutes(5), &cfg);
        state.observe(true, now + Duration::minutes(10), &cfg);
        assert_eq!(
            state.observe(true, now + Duration::minutes(16), &cfg),
            DebounceDecision::Accumulating { hits: 1 }
        );
    }

    #[test]
    fn fire_records_last_triggered_at() {
        let mut state = RuleRuntimeState::new();
        let cfg = config(1, 15);
        let now = Utc::now();

        assert!(state.last_triggered_at().is_none());
        state.observe(true, now, &cfg);
        assert_eq!(state.last_triggered_at(), Some(now));
    }
}
