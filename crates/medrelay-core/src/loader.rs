//! Bulk data loading from external files.
//!
//! Runs as a maintenance operation with no concurrent traffic. Expects three
//! files in the data directory:
//!
//! - `physicians.csv`
//! - `messages.csv`
//! - `compliance_policies.json`
//!
//! Rule definitions are validated here, not at query time: a rule must carry
//! exactly one result type and at least one keyword, with no duplicate
//! keywords. Any violation aborts the load.

use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::error::{MedrelayError, Result};
use crate::message::{Direction, Message};
use crate::physician::Physician;
use crate::policy::{PolicyVersion, Rule, RuleOutcome};
use crate::store::Store;

// ---------------------------------------------------------------------------
// File shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PhysicianRecord {
    physician_id: i64,
    npi: String,
    first_name: String,
    last_name: String,
    specialty: String,
    state: String,
    #[serde(deserialize_with = "lenient_bool")]
    consent_opt_in: bool,
    preferred_channel: String,
}

#[derive(Debug, Deserialize)]
struct MessageRecord {
    message_id: i64,
    physician_id: i64,
    channel: String,
    direction: String,
    timestamp: NaiveDateTime,
    message_text: String,
    campaign_id: Option<String>,
    topic: Option<String>,
    compliance_tag: Option<String>,
    sentiment: Option<String>,
    delivery_status: Option<String>,
    response_latency_sec: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PolicyFile {
    version: String,
    updated: NaiveDate,
    rules: Vec<RuleEntry>,
}

/// Raw rule entry as it appears on disk: two optional result fields whose
/// exactly-one invariant is enforced by [`RuleEntry::into_rule`] before
/// anything reaches the store.
#[derive(Debug, Deserialize)]
struct RuleEntry {
    id: String,
    name: String,
    keywords_any: Vec<String>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    requires_append: Option<String>,
}

impl RuleEntry {
    fn into_rule(self) -> Result<(Rule, Vec<String>)> {
        let invalid = |reason: &str| MedrelayError::InvalidRuleDefinition {
            rule_id: self.id.clone(),
            reason: reason.to_string(),
        };

        let outcome = match (self.action.clone(), self.requires_append.clone()) {
            (Some(text), None) => RuleOutcome::Action(text),
            (None, Some(text)) => RuleOutcome::RequiresAppend(text),
            (Some(_), Some(_)) => return Err(invalid("both action and requires_append set")),
            (None, None) => return Err(invalid("neither action nor requires_append set")),
        };

        if self.keywords_any.is_empty() {
            return Err(invalid("rule has no keywords"));
        }
        let mut seen = HashSet::new();
        for keyword in &self.keywords_any {
            if !seen.insert(keyword.as_str()) {
                return Err(invalid(&format!("duplicate keyword '{keyword}'")));
            }
        }

        Ok((
            Rule {
                id: self.id,
                name: self.name,
                outcome,
            },
            self.keywords_any,
        ))
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load all three data files from `data_dir` into the store.
pub fn load_data(store: &Store, data_dir: &Path) -> Result<()> {
    load_physicians(store, &data_dir.join("physicians.csv"))?;
    load_messages(store, &data_dir.join("messages.csv"))?;
    load_policies(store, &data_dir.join("compliance_policies.json"))?;
    Ok(())
}

pub fn load_physicians(store: &Store, path: &Path) -> Result<usize> {
    let mut reader = csv_reader(path)?;
    let mut count = 0;
    for record in reader.deserialize() {
        let record: PhysicianRecord = record?;
        store.insert_physician(&Physician {
            physician_id: record.physician_id,
            npi: record.npi,
            first_name: record.first_name,
            last_name: record.last_name,
            specialty: record.specialty,
            state: record.state,
            consent_opt_in: record.consent_opt_in,
            preferred_channel: record.preferred_channel,
        })?;
        count += 1;
    }
    tracing::info!(count, "loaded physicians");
    Ok(count)
}

pub fn load_messages(store: &Store, path: &Path) -> Result<usize> {
    let mut reader = csv_reader(path)?;
    let mut count = 0;
    for record in reader.deserialize() {
        let record: MessageRecord = record?;
        let direction: Direction = record.direction.parse()?;
        store.insert_message(&Message {
            message_id: record.message_id,
            physician_id: record.physician_id,
            channel: record.channel,
            direction,
            timestamp: record.timestamp,
            message_text: record.message_text,
            campaign_id: record.campaign_id,
            topic: record.topic,
            compliance_tag: record.compliance_tag,
            sentiment: record.sentiment,
            delivery_status: record.delivery_status,
            response_latency_sec: record.response_latency_sec,
        })?;
        count += 1;
    }
    tracing::info!(count, "loaded messages");
    Ok(count)
}

pub fn load_policies(store: &Store, path: &Path) -> Result<usize> {
    let file = open_data_file(path)?;
    let policy: PolicyFile = serde_json::from_reader(file)?;

    // Validate every rule before writing anything, so a malformed definition
    // aborts the load instead of leaving a partially inserted version.
    let mut rules = Vec::with_capacity(policy.rules.len());
    for entry in policy.rules {
        rules.push(entry.into_rule()?);
    }

    store.insert_policy_version(&PolicyVersion {
        version: policy.version.clone(),
        effective_date: policy.updated,
    })?;
    let count = rules.len();
    for (rule, keywords) in rules {
        store.insert_rule(&policy.version, &rule, &keywords)?;
    }
    tracing::info!(version = %policy.version, count, "loaded compliance rules");
    Ok(count)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn open_data_file(path: &Path) -> Result<File> {
    if !path.exists() {
        return Err(MedrelayError::DataFileNotFound(path.display().to_string()));
    }
    Ok(File::open(path)?)
}

fn csv_reader(path: &Path) -> Result<csv::Reader<File>> {
    Ok(csv::Reader::from_reader(open_data_file(path)?))
}

/// Accept the boolean spellings that show up in exported CSV data
/// (`true`/`True`/`1`, `false`/`False`/`0`).
fn lenient_bool<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.as_str() {
        "true" | "True" | "TRUE" | "1" => Ok(true),
        "false" | "False" | "FALSE" | "0" => Ok(false),
        other => Err(serde::de::Error::custom(format!("invalid bool: {other}"))),
    }
}
