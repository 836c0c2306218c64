//! Condition clauses and their evaluation.
//!
//! A condition clause is one atomic test over `(value, history)`. The four
//! kinds form a closed enum so every evaluation site matches exhaustively
//! and a new kind is a compile-time extension point.
//!
//! Evaluation never fails: a non-finite reading simply matches nothing.
//! Strictness lives entirely in [`ConditionClause::from_config`], which
//! rejects malformed configurations at authoring time with a per-field
//! reason.

use serde::Serialize;

use crate::error::CoreError;

/// How many historical values a pattern looks back over (plus the new value).
pub const PATTERN_WINDOW: usize = 5;

/// Minimum history entries required before a pattern can ever trigger.
pub const PATTERN_MIN_HISTORY: usize = 3;

/// Std-dev-to-mean ratio below which a series counts as stable.
const STABLE_RATIO: f64 = 0.05;

/// Std-dev-to-mean ratio above which a series counts as volatile.
const VOLATILE_RATIO: f64 = 0.20;

// ---------------------------------------------------------------------------
// Operator enums
// ---------------------------------------------------------------------------

/// Comparison operator for threshold conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompareOp {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
}

impl CompareOp {
    fn parse(s: &str) -> Option<Self> {
        match s {
            ">" => Some(Self::Gt),
            "<" => Some(Self::Lt),
            ">=" => Some(Self::Ge),
            "<=" => Some(Self::Le),
            "==" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            _ => None,
        }
    }

    /// Apply the operator to `(value, threshold)`.
    ///
    /// `==` and `!=` are exact `f64` comparisons. For continuous sensors
    /// (temperature, light) exact equality almost never holds; callers that
    /// need tolerance must encode it as a range condition instead. Known
    /// limitation, kept as-is.
    pub fn compare(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Gt => value > threshold,
            Self::Lt => value < threshold,
            Self::Ge => value >= threshold,
            Self::Le => value <= threshold,
            Self::Eq => value == threshold,
            Self::Ne => value != threshold,
        }
    }
}

/// Direction of a change condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Increase,
    Decrease,
    Absolute,
}

impl ChangeKind {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "increase" => Some(Self::Increase),
            "decrease" => Some(Self::Decrease),
            "absolute" => Some(Self::Absolute),
            _ => None,
        }
    }
}

/// Shape a pattern condition tests the recent series for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    Increasing,
    Decreasing,
    Stable,
    Volatile,
}

impl PatternKind {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "increasing" => Some(Self::Increasing),
            "decreasing" => Some(Self::Decreasing),
            "stable" => Some(Self::Stable),
            "volatile" => Some(Self::Volatile),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ConditionClause
// ---------------------------------------------------------------------------

/// One atomic test within a rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConditionClause {
    /// `value <operator> threshold`.
    Threshold { operator: CompareOp, value: f64 },

    /// Triggers when the value falls *outside* `[min, max]`.
    /// Either bound may be absent.
    Range { min: Option<f64>, max: Option<f64> },

    /// Compares the value against the most recent history entry.
    /// Never triggers on a first reading (empty history).
    Change { change_type: ChangeKind, threshold: f64 },

    /// Tests the shape of the recent series (last [`PATTERN_WINDOW`]
    /// history entries plus the new value). Never triggers with fewer
    /// than [`PATTERN_MIN_HISTORY`] history entries.
    Pattern { pattern: PatternKind },
}

impl ConditionClause {
    /// Parse and validate a clause from its stored JSON configuration.
    ///
    /// Every rejection names the offending field so rule authors get an
    /// actionable message rather than a generic parse error.
    pub fn from_config(config: &serde_json::Value) -> Result<Self, CoreError> {
        let kind = config
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| CoreError::Validation("condition type is required".into()))?;

        match kind {
            "threshold" => {
                let operator = required_str(config, "operator", "threshold condition")?;
                let operator = CompareOp::parse(operator).ok_or_else(|| {
                    CoreError::Validation(format!(
                        "invalid threshold operator '{operator}' (expected >, <, >=, <=, ==, !=)"
                    ))
                })?;
                let value = required_number(config, "value", "threshold condition")?;
                Ok(Self::Threshold { operator, value })
            }
            "range" => {
                let min = optional_number(config, "min", "range condition")?;
                let max = optional_number(config, "max", "range condition")?;
                if min.is_none() && max.is_none() {
                    return Err(CoreError::Validation(
                        "range condition requires at least one of min or max".into(),
                    ));
                }
                if let (Some(min), Some(max)) = (min, max) {
                    if min >= max {
                        return Err(CoreError::Validation(format!(
                            "range condition min ({min}) must be less than max ({max})"
                        )));
                    }
                }
                Ok(Self::Range { min, max })
            }
            "change" => {
                let change_type = required_str(config, "change_type", "change condition")?;
                let change_type = ChangeKind::parse(change_type).ok_or_else(|| {
                    CoreError::Validation(format!(
                        "invalid change_type '{change_type}' (expected increase, decrease, or absolute)"
                    ))
                })?;
                let threshold = required_number(config, "threshold", "change condition")?;
                Ok(Self::Change {
                    change_type,
                    threshold,
                })
            }
            "pattern" => {
                let pattern = required_str(config, "pattern", "pattern condition")?;
                let pattern = PatternKind::parse(pattern).ok_or_else(|| {
                    CoreError::Validation(format!(
                        "invalid pattern '{pattern}' (expected increasing, decreasing, stable, or volatile)"
                    ))
                })?;
                Ok(Self::Pattern { pattern })
            }
            other => Err(CoreError::Validation(format!(
                "unknown condition type '{other}' (expected threshold, range, change, or pattern)"
            ))),
        }
    }

    /// Evaluate the clause against a reading and the sensor's recent history
    /// (oldest first, newest last).
    pub fn evaluate(&self, value: f64, history: &[f64]) -> bool {
        if !value.is_finite() {
            return false;
        }

        match self {
            Self::Threshold {
                operator,
                value: threshold,
            } => operator.compare(value, *threshold),

            Self::Range { min, max } => {
                let below = min.is_some_and(|min| value < min);
                let above = max.is_some_and(|max| value > max);
                below || above
            }

            Self::Change {
                change_type,
                threshold,
            } => {
                let Some(previous) = history.last().copied() else {
                    return false;
                };
                let delta = value - previous;
                match change_type {
                    ChangeKind::Increase => delta > *threshold,
                    ChangeKind::Decrease => delta < -threshold,
                    ChangeKind::Absolute => delta.abs() > *threshold,
                }
            }

            Self::Pattern { pattern } => {
                if history.len() < PATTERN_MIN_HISTORY {
                    return false;
                }
                let start = history.len().saturating_sub(PATTERN_WINDOW);
                let mut series: Vec<f64> = history[start..].to_vec();
                series.push(value);

                match pattern {
                    PatternKind::Increasing => strictly_monotonic(&series, |a, b| a < b),
                    PatternKind::Decreasing => strictly_monotonic(&series, |a, b| a > b),
                    PatternKind::Stable => dispersion_ratio(&series)
                        .is_some_and(|ratio| ratio < STABLE_RATIO),
                    PatternKind::Volatile => dispersion_ratio(&series)
                        .is_some_and(|ratio| ratio > VOLATILE_RATIO),
                }
            }
        }
    }
}

fn required_str<'a>(
    config: &'a serde_json::Value,
    field: &str,
    context: &str,
) -> Result<&'a str, CoreError> {
    config
        .get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| CoreError::Validation(format!("{context} requires a '{field}' string")))
}

fn required_number(
    config: &serde_json::Value,
    field: &str,
    context: &str,
) -> Result<f64, CoreError> {
    let value = config
        .get(field)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| CoreError::Validation(format!("{context} requires a numeric '{field}'")))?;
    if !value.is_finite() {
        return Err(CoreError::Validation(format!(
            "{context} '{field}' must be finite"
        )));
    }
    Ok(value)
}

fn optional_number(
    config: &serde_json::Value,
    field: &str,
    context: &str,
) -> Result<Option<f64>, CoreError> {
    match config.get(field) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => {
            let value = v.as_f64().ok_or_else(|| {
                CoreError::Validation(format!("{context} '{field}' must be a number"))
            })?;
            if !value.is_finite() {
                return Err(CoreError::Validation(format!(
                    "{context} '{field}' must be finite"
                )));
            }
            Ok(Some(value))
        }
    }
}

/// True when `cmp(a, b)` holds for every consecutive pair.
fn strictly_monotonic(series: &[f64], cmp: impl Fn(f64, f64) -> bool) -> bool {
    series.windows(2).all(|pair| cmp(pair[0], pair[1]))
}

/// Population standard deviation divided by the absolute mean.
///
/// `None` when the mean is zero (ratio undefined) or the series is empty.
fn dispersion_ratio(series: &[f64]) -> Option<f64> {
    if series.is_empty() {
        return None;
    }
    let n = series.len() as f64;
    let mean = series.iter().sum::<f64>() / n;
    if mean == 0.0 {
        return None;
    }
    let variance = series.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some(variance.sqrt() / mean.abs())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: serde_json::Value) -> Result<ConditionClause, CoreError> {
        ConditionClause::from_config(&json)
    }

    #[test]
    fn threshold_operators_at_exact_boundary() {
        // A value exactly equal to the threshold triggers ==, >=, <= and
        // not >, <, !=.
        let cases = [
            (">", false),
            ("<", false),
            (">=", true),
            ("<=", true),
            ("==", true),
            ("!=", false),
        ];
        for (op, expected) in cases {
            let clause = parse(serde_json::json!({
                "type": "threshold", "operator": op, "value": 25.0
            }))
            .unwrap();
            assert_eq!(
                clause.evaluate(25.0, &[]),
                expected,
                "operator {op} at boundary"
            );
        }
    }

    #[test]
    fn threshold_greater_than() {
        let clause = parse(serde_json::json!({
            "type": "threshold", "operator": ">", "value": 30.0
        }))
        .unwrap();
        assert!(clause.evaluate(30.5, &[]));
        assert!(!clause.evaluate(29.9, &[]));
    }

    #[test]
    fn nan_reading_never_triggers() {
        let threshold = parse(serde_json::json!({
            "type": "threshold", "operator": "!=", "value": 1.0
        }))
        .unwrap();
        let range = parse(serde_json::json!({
            "type": "range", "min": 18.0, "max": 25.0
        }))
        .unwrap();
        assert!(!threshold.evaluate(f64::NAN, &[]));
        assert!(!range.evaluate(f64::NAN, &[]));
    }

    #[test]
    fn range_triggers_outside_bounds() {
        let clause = parse(serde_json::json!({
            "type": "range", "min": 18.0, "max": 25.0
        }))
        .unwrap();
        assert!(clause.evaluate(30.0, &[]));
        assert!(clause.evaluate(10.0, &[]));
        assert!(!clause.evaluate(20.0, &[]));
        // Boundary values are inside the acceptable band.
        assert!(!clause.evaluate(18.0, &[]));
        assert!(!clause.evaluate(25.0, &[]));
    }

    #[test]
    fn range_with_single_bound() {
        let min_only = parse(serde_json::json!({ "type": "range", "min": 0.0 })).unwrap();
        assert!(min_only.evaluate(-1.0, &[]));
        assert!(!min_only.evaluate(1_000_000.0, &[]));

        let max_only = parse(serde_json::json!({ "type": "range", "max": 100.0 })).unwrap();
        assert!(max_only.evaluate(101.0, &[]));
        assert!(!max_only.evaluate(-50.0, &[]));
    }

    #[test]
    fn change_increase_against_previous_value() {
        let clause = parse(serde_json::json!({
            "type": "change", "change_type": "increase", "threshold": 5.0
        }))
        .unwrap();
        assert!(clause.evaluate(26.0, &[20.0]));
        assert!(!clause.evaluate(24.0, &[20.0]));
        // A first reading can never trigger a change condition.
        assert!(!clause.evaluate(1_000.0, &[]));
    }

    #[test]
    fn change_decrease_and_absolute() {
        let decrease = parse(serde_json::json!({
            "type": "change", "change_type": "decrease", "threshold": 3.0
        }))
        .unwrap();
        assert!(decrease.evaluate(16.0, &[20.0]));
        assert!(!decrease.evaluate(18.0, &[20.0]));

        let absolute = parse(serde_json::json!({
            "type": "change", "change_type": "absolute", "threshold": 3.0
        }))
        .unwrap();
        assert!(absolute.evaluate(16.0, &[20.0]));
        assert!(absolute.evaluate(24.0, &[20.0]));
        assert!(!absolute.evaluate(22.0, &[20.0]));
    }

    #[test]
    fn change_uses_most_recent_history_entry() {
        let clause = parse(serde_json::json!({
            "type": "change", "change_type": "increase", "threshold": 5.0
        }))
        .unwrap();
        // Previous value is 30 (newest last), not 20.
        assert!(!clause.evaluate(26.0, &[20.0, 30.0]));
        assert!(clause.evaluate(36.0, &[20.0, 30.0]));
    }

    #[test]
    fn pattern_increasing() {
        let clause = parse(serde_json::json!({
            "type": "pattern", "pattern": "increasing"
        }))
        .unwrap();
        assert!(clause.evaluate(20.0, &[10.0, 12.0, 14.0, 16.0, 18.0]));
        assert!(!clause.evaluate(15.0, &[10.0, 12.0, 14.0, 16.0, 18.0]));
        // Plateaus break strict monotonicity.
        assert!(!clause.evaluate(18.0, &[10.0, 12.0, 14.0, 16.0, 18.0]));
    }

    #[test]
    fn pattern_decreasing() {
        let clause = parse(serde_json::json!({
            "type": "pattern", "pattern": "decreasing"
        }))
        .unwrap();
        assert!(clause.evaluate(8.0, &[18.0, 16.0, 14.0, 12.0, 10.0]));
        assert!(!clause.evaluate(11.0, &[18.0, 16.0, 14.0, 12.0, 10.0]));
    }

    #[test]
    fn pattern_requires_three_history_entries() {
        let clause = parse(serde_json::json!({
            "type": "pattern", "pattern": "increasing"
        }))
        .unwrap();
        assert!(!clause.evaluate(3.0, &[]));
        assert!(!clause.evaluate(3.0, &[1.0]));
        assert!(!clause.evaluate(3.0, &[1.0, 2.0]));
        assert!(clause.evaluate(4.0, &[1.0, 2.0, 3.0]));
    }

    #[test]
    fn pattern_window_caps_at_five_history_entries() {
        let clause = parse(serde_json::json!({
            "type": "pattern", "pattern": "increasing"
        }))
        .unwrap();
        // The decreasing prefix falls outside the 5-entry window, so the
        // tail is still strictly increasing.
        let history = [50.0, 40.0, 10.0, 12.0, 14.0, 16.0, 18.0];
        assert!(clause.evaluate(20.0, &history));
    }

    #[test]
    fn pattern_stable_and_volatile() {
        let stable = parse(serde_json::json!({ "type": "pattern", "pattern": "stable" })).unwrap();
        let volatile =
            parse(serde_json::json!({ "type": "pattern", "pattern": "volatile" })).unwrap();

        let flat = [100.0, 101.0, 99.0, 100.0, 100.5];
        assert!(stable.evaluate(100.0, &flat));
        assert!(!volatile.evaluate(100.0, &flat));

        let noisy = [100.0, 160.0, 60.0, 150.0, 50.0];
        assert!(!stable.evaluate(140.0, &noisy));
        assert!(volatile.evaluate(140.0, &noisy));
    }

    // -- Validation ----------------------------------------------------------

    #[test]
    fn rejects_missing_type() {
        let err = parse(serde_json::json!({ "operator": ">", "value": 1.0 })).unwrap_err();
        assert!(err.to_string().contains("condition type is required"));
    }

    #[test]
    fn rejects_unknown_type() {
        let err = parse(serde_json::json!({ "type": "sorcery" })).unwrap_err();
        assert!(err.to_string().contains("unknown condition type 'sorcery'"));
    }

    #[test]
    fn rejects_invalid_operator() {
        let err = parse(serde_json::json!({
            "type": "threshold", "operator": "~", "value": 1.0
        }))
        .unwrap_err();
        assert!(err.to_string().contains("invalid threshold operator '~'"));
    }

    #[test]
    fn rejects_threshold_without_value() {
        let err = parse(serde_json::json!({ "type": "threshold", "operator": ">" })).unwrap_err();
        assert!(err.to_string().contains("numeric 'value'"));
    }

    #[test]
    fn rejects_range_without_bounds() {
        let err = parse(serde_json::json!({ "type": "range" })).unwrap_err();
        assert!(err.to_string().contains("at least one of min or max"));
    }

    #[test]
    fn rejects_inverted_range() {
        let err = parse(serde_json::json!({ "type": "range", "min": 25.0, "max": 18.0 }))
            .unwrap_err();
        assert!(err.to_string().contains("min (25) must be less than max (18)"));
    }

    #[test]
    fn rejects_change_without_threshold() {
        let err = parse(serde_json::json!({ "type": "change", "change_type": "increase" }))
            .unwrap_err();
        assert!(err.to_string().contains("numeric 'threshold'"));
    }

    #[test]
    fn rejects_invalid_pattern() {
        let err = parse(serde_json::json!({ "type": "pattern", "pattern": "zigzag" })).unwrap_err();
        assert!(err.to_string().contains("invalid pattern 'zigzag'"));
    }
}
