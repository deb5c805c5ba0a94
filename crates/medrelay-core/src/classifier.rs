//! Keyword classification engine: match a message's text against the
//! keyword triggers of one compliance policy version, then collapse the
//! keyword hits into one entry per fired rule.

use serde::Serialize;

use crate::error::{MedrelayError, Result};
use crate::policy::{RuleOutcome, RuleWithKeywords};
use crate::store::Store;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One fired rule. `matched_keywords` carries only the keywords that actually
/// occurred in the message — never the rule's full trigger list, so callers
/// learn why the rule fired without seeing every phrase that would fire it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleMatch {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub outcome: RuleOutcome,
    pub matched_keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub message_id: i64,
    pub message_text: String,
    pub compliance_version: String,
    pub matched_rules: Vec<RuleMatch>,
}

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

/// A single (rule, keyword) hit emitted by the matcher.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordHit {
    pub rule_id: String,
    pub keyword: String,
}

/// Test every keyword of every rule for case-insensitive substring
/// containment in `message_text`. A rule with N matching keywords emits N
/// hits. Output follows the order of `rules` (rule id ascending when they
/// come from the store) with keywords in their stored lexical order.
pub fn match_keywords(message_text: &str, rules: &[RuleWithKeywords]) -> Vec<KeywordHit> {
    let haystack = message_text.to_lowercase();
    let mut hits = Vec::new();
    for entry in rules {
        for keyword in &entry.keywords {
            if haystack.contains(&keyword.to_lowercase()) {
                hits.push(KeywordHit {
                    rule_id: entry.rule.id.clone(),
                    keyword: keyword.clone(),
                });
            }
        }
    }
    hits
}

// ---------------------------------------------------------------------------
// Grouper
// ---------------------------------------------------------------------------

/// Collapse keyword hits into one [`RuleMatch`] per fired rule, ordered by
/// rule id ascending. Rules with no hits produce no entry at all.
///
/// The matcher already emits hits grouped by rule, but the run-grouping here
/// sorts its input itself rather than trusting that ordering contract; the
/// sort is stable, so keyword order within a rule is preserved.
pub fn group_hits(rules: &[RuleWithKeywords], mut hits: Vec<KeywordHit>) -> Vec<RuleMatch> {
    hits.sort_by(|a, b| a.rule_id.cmp(&b.rule_id));

    let mut matched: Vec<RuleMatch> = Vec::new();
    for hit in hits {
        match matched.last_mut() {
            Some(last) if last.id == hit.rule_id => last.matched_keywords.push(hit.keyword),
            _ => {
                // Hits are only ever produced from `rules`, so the lookup
                // cannot fail; skip rather than panic if it somehow does.
                let Some(entry) = rules.iter().find(|r| r.rule.id == hit.rule_id) else {
                    continue;
                };
                matched.push(RuleMatch {
                    id: entry.rule.id.clone(),
                    name: entry.rule.name.clone(),
                    outcome: entry.rule.outcome.clone(),
                    matched_keywords: vec![hit.keyword],
                });
            }
        }
    }
    matched
}

// ---------------------------------------------------------------------------
// Classification service
// ---------------------------------------------------------------------------

/// Classify one message against the rules of one policy version.
///
/// An unknown message id is a hard error; an unknown policy version is not —
/// it simply matches nothing, indistinguishable from a message with no
/// triggers (the caller's action is identical either way). Stateless and
/// idempotent: nothing is mutated, so identical inputs against an unchanged
/// store yield identical output.
pub fn classify(store: &Store, message_id: i64, compliance_version: &str) -> Result<Classification> {
    let message_text = store
        .message_text(message_id)?
        .ok_or(MedrelayError::MessageNotFound(message_id))?;

    let rules = store.rules_for_version(compliance_version)?;
    let hits = match_keywords(&message_text, &rules);
    let matched_rules = group_hits(&rules, hits);

    tracing::debug!(
        message_id,
        compliance_version,
        matched = matched_rules.len(),
        "classified message"
    );

    Ok(Classification {
        message_id,
        message_text,
        compliance_version: compliance_version.to_string(),
        matched_rules,
    })
}
