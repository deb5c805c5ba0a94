use crate::error::MedrelayError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RuleOutcome
// ---------------------------------------------------------------------------

/// The single typed remediation a rule carries: either an action to take or
/// text that must be appended to the message. Modeling this as an enum makes
/// "exactly one result type per rule" structural — a constructed rule cannot
/// have both or neither.
///
/// Serializes to the wire/storage pair `result_type` + `result_text`:
/// `{"result_type": "action", "result_text": "…"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result_type", content = "result_text", rename_all = "snake_case")]
pub enum RuleOutcome {
    Action(String),
    RequiresAppend(String),
}

impl RuleOutcome {
    pub fn result_type(&self) -> &'static str {
        match self {
            RuleOutcome::Action(_) => "action",
            RuleOutcome::RequiresAppend(_) => "requires_append",
        }
    }

    pub fn result_text(&self) -> &str {
        match self {
            RuleOutcome::Action(text) | RuleOutcome::RequiresAppend(text) => text,
        }
    }

    /// Rebuild an outcome from its storage columns. An unrecognized type tag
    /// means the row predates this binary or was written by hand; either way
    /// it is a malformed rule definition.
    pub fn from_parts(result_type: &str, result_text: String, rule_id: &str) -> crate::Result<Self> {
        match result_type {
            "action" => Ok(RuleOutcome::Action(result_text)),
            "requires_append" => Ok(RuleOutcome::RequiresAppend(result_text)),
            other => Err(MedrelayError::InvalidRuleDefinition {
                rule_id: rule_id.to_string(),
                reason: format!("unknown result type '{other}'"),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// A compliance rule. Identified by `(id, policy_version)` in storage — the
/// same rule id is reused across policy versions, but classification always
/// binds to one version, so the version is carried by the query, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub outcome: RuleOutcome,
}

/// A rule together with its full "any-of" keyword set, eagerly fetched.
/// Keywords are lowercase-insensitive substring patterns; the rule fires if
/// any of them occurs in the message text.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleWithKeywords {
    pub rule: Rule,
    pub keywords: Vec<String>,
}

// ---------------------------------------------------------------------------
// PolicyVersion
// ---------------------------------------------------------------------------

/// A named, dated snapshot of the compliance rules in force at one time.
/// Never updated in place — a new version is a wholly new record set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyVersion {
    pub version: String,
    pub effective_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_serializes_as_type_text_pair() {
        let rule = Rule {
            id: "R-001".into(),
            name: "Off-label use".into(),
            outcome: RuleOutcome::Action("escalate to medical affairs".into()),
        };
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["result_type"], "action");
        assert_eq!(json["result_text"], "escalate to medical affairs");
    }

    #[test]
    fn outcome_from_parts_rejects_unknown_tag() {
        let err = RuleOutcome::from_parts("warn", "text".into(), "R-009").unwrap_err();
        assert!(err.to_string().contains("R-009"));
    }

    #[test]
    fn outcome_from_parts_round_trips() {
        let outcome = RuleOutcome::RequiresAppend("See full prescribing information.".into());
        let rebuilt = RuleOutcome::from_parts(
            outcome.result_type(),
            outcome.result_text().to_string(),
            "R-002",
        )
        .unwrap();
        assert_eq!(rebuilt, outcome);
    }
}
