//! Rule configuration and the combined trigger verdict.
//!
//! A rule is an ordered set of condition clauses joined by a trigger logic.
//! Evaluation runs every clause independently and collects the matches;
//! callers use the matched subset to build alert messages and to power
//! rule-testing tooling.

use serde::Serialize;

use crate::alert::Severity;
use crate::condition::ConditionClause;
use crate::error::CoreError;

/// How a rule's clauses combine into one verdict.
///
/// `Or` is the deliberate default: stored logic values only ever pass
/// through [`TriggerLogic::parse_or_default`], so an absent or
/// unrecognized value keeps a rule permissive instead of silently never
/// firing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerLogic {
    And,
    #[default]
    Or,
}

impl TriggerLogic {
    /// Parse a stored logic value, falling back to [`TriggerLogic::Or`]
    /// for anything other than `"and"`.
    pub fn parse_or_default(s: &str) -> Self {
        match s {
            "and" => Self::And,
            _ => Self::Or,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

/// Validated configuration of one sensor rule.
#[derive(Debug, Clone, Serialize)]
pub struct RuleConfig {
    /// Ordered condition clauses; never empty once validated.
    pub conditions: Vec<ConditionClause>,
    pub logic: TriggerLogic,
    pub severity: Severity,
    /// Alert message template; see [`render_message`] for placeholders.
    pub message_template: String,
}

impl RuleConfig {
    /// Build a config from stored parts, validating every clause.
    ///
    /// `conditions` is the raw JSON array from the rule row; each element
    /// is validated with a per-field reason so authoring errors surface
    /// precisely.
    pub fn from_parts(
        conditions: &serde_json::Value,
        logic: &str,
        severity: &str,
        message_template: &str,
    ) -> Result<Self, CoreError> {
        let clauses = conditions
            .as_array()
            .ok_or_else(|| CoreError::Validation("conditions must be an array".into()))?;
        if clauses.is_empty() {
            return Err(CoreError::Validation("conditions must not be empty".into()));
        }

        let conditions = clauses
            .iter()
            .map(ConditionClause::from_config)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            conditions,
            logic: TriggerLogic::parse_or_default(logic),
            severity: Severity::from_str(severity)?,
            message_template: message_template.to_string(),
        })
    }
}

/// Result of evaluating a rule against one reading.
#[derive(Debug)]
pub struct RuleVerdict<'a> {
    pub triggered: bool,
    /// The clauses that matched, in configuration order.
    pub matched: Vec<&'a ConditionClause>,
}

/// Evaluate every clause independently and combine under the rule's logic.
///
/// `And` compares the matched count to the total clause count; `Or`
/// requires at least one match.
pub fn evaluate_rule<'a>(config: &'a RuleConfig, value: f64, history: &[f64]) -> RuleVerdict<'a> {
    let matched: Vec<&ConditionClause> = config
        .conditions
        .iter()
        .filter(|clause| clause.evaluate(value, history))
        .collect();

    let triggered = match config.logic {
        TriggerLogic::And => {
            !config.conditions.is_empty() && matched.len() == config.conditions.len()
        }
        TriggerLogic::Or => !matched.is_empty(),
    };

    RuleVerdict { triggered, matched }
}

/// Context for alert message rendering.
#[derive(Debug)]
pub struct MessageContext<'a> {
    pub device_name: &'a str,
    pub sensor_name: &'a str,
    pub value: f64,
    pub severity: Severity,
}

/// Expand `{device}`, `{sensor}`, `{value}`, and `{severity}` placeholders.
///
/// Unknown placeholders pass through untouched.
pub fn render_message(template: &str, ctx: &MessageContext<'_>) -> String {
    template
        .replace("{device}", ctx.device_name)
        .replace("{sensor}", ctx.sensor_name)
        .replace("{value}", &ctx.value.to_string())
        .replace("{severity}", ctx.severity.as_str())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn two_condition_config(logic: &str) -> RuleConfig {
        RuleConfig::from_parts(
            &serde_json::json!([
                { "type": "threshold", "operator": ">", "value": 30.0 },
                { "type": "range", "min": 0.0, "max": 50.0 },
            ]),
            logic,
            "warning",
            "{sensor} out of range",
        )
        .unwrap()
    }

    #[test]
    fn and_requires_every_clause() {
        let config = two_condition_config("and");

        // 60 is > 30 and outside [0, 50]: both match.
        let verdict = evaluate_rule(&config, 60.0, &[]);
        assert!(verdict.triggered);
        assert_eq!(verdict.matched.len(), 2);

        // 40 is > 30 but inside the range: only one match.
        let verdict = evaluate_rule(&config, 40.0, &[]);
        assert!(!verdict.triggered);
        assert_eq!(verdict.matched.len(), 1);
    }

    #[test]
    fn or_requires_any_clause() {
        let config = two_condition_config("or");

        let verdict = evaluate_rule(&config, 40.0, &[]);
        assert!(verdict.triggered);
        assert_eq!(verdict.matched.len(), 1);

        let verdict = evaluate_rule(&config, 20.0, &[]);
        assert!(!verdict.triggered);
        assert!(verdict.matched.is_empty());
    }

    #[test]
    fn unrecognized_logic_defaults_to_or() {
        assert_eq!(TriggerLogic::parse_or_default("nand"), TriggerLogic::Or);
        assert_eq!(TriggerLogic::parse_or_default(""), TriggerLogic::Or);
        assert_eq!(TriggerLogic::parse_or_default("and"), TriggerLogic::And);

        let config = two_condition_config("definitely-not-a-logic");
        let verdict = evaluate_rule(&config, 40.0, &[]);
        assert!(verdict.triggered, "fallback logic must behave as OR");
    }

    #[test]
    fn matched_list_preserves_configuration_order() {
        let config = RuleConfig::from_parts(
            &serde_json::json!([
                { "type": "range", "min": 0.0, "max": 10.0 },
                { "type": "threshold", "operator": ">", "value": 5.0 },
            ]),
            "or",
            "info",
            "m",
        )
        .unwrap();

        let verdict = evaluate_rule(&config, 20.0, &[]);
        assert!(matches!(
            verdict.matched[0],
            &ConditionClause::Range { .. }
        ));
        assert!(matches!(
            verdict.matched[1],
            &ConditionClause::Threshold { .. }
        ));
    }

    #[test]
    fn rejects_empty_condition_list() {
        let err = RuleConfig::from_parts(&serde_json::json!([]), "or", "info", "m").unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn rejects_non_array_conditions() {
        let err =
            RuleConfig::from_parts(&serde_json::json!({"type": "threshold"}), "or", "info", "m")
                .unwrap_err();
        assert!(err.to_string().contains("must be an array"));
    }

    #[test]
    fn surfaces_clause_validation_reason() {
        let err = RuleConfig::from_parts(
            &serde_json::json!([{ "type": "range", "min": 9.0, "max": 1.0 }]),
            "or",
            "info",
            "m",
        )
        .unwrap_err();
        assert!(err.to_string().contains("min (9) must be less than max (1)"));
    }

    #[test]
    fn renders_message_placeholders() {
        let ctx = MessageContext {
            device_name: "greenhouse-3",
            sensor_name: "temperature",
            value: 31.5,
            severity: Severity::Warning,
        };
        assert_eq!(
            render_message("{severity}: {sensor} on {device} read {value}", &ctx),
            "warning: temperature on greenhouse-3 read 31.5"
        );
    }
}
