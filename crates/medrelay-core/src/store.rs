//! SQLite-backed storage.
//!
//! All access goes through an explicit [`Store`] handle owned by the caller;
//! there is no process-wide connection. Reads used by the classification
//! path return fully materialized graphs in a single query — no component
//! downstream of the store triggers additional fetches.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, ToSql};

use crate::error::Result;
use crate::message::{Direction, Message, MessageFilter};
use crate::physician::{Physician, PhysicianFilter};
use crate::policy::{PolicyVersion, Rule, RuleOutcome, RuleWithKeywords};

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS physicians (
    physician_id         INTEGER PRIMARY KEY,
    npi                  TEXT NOT NULL,
    first_name           TEXT NOT NULL,
    last_name            TEXT NOT NULL,
    specialty            TEXT NOT NULL,
    state                TEXT NOT NULL,
    consent_opt_in       INTEGER NOT NULL,
    preferred_channel    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS messages (
    message_id           INTEGER PRIMARY KEY,
    physician_id         INTEGER NOT NULL REFERENCES physicians(physician_id),
    channel              TEXT NOT NULL,
    is_outbound          INTEGER NOT NULL,
    timestamp            TEXT NOT NULL,
    message_text         TEXT NOT NULL,
    campaign_id          TEXT,
    topic                TEXT,
    compliance_tag       TEXT,
    sentiment            TEXT,
    delivery_status      TEXT,
    response_latency_sec REAL
);

CREATE TABLE IF NOT EXISTS policy_versions (
    version              TEXT PRIMARY KEY,
    effective_date       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS rules (
    id                   TEXT NOT NULL,
    policy_version       TEXT NOT NULL REFERENCES policy_versions(version),
    name                 TEXT NOT NULL,
    result_type          TEXT NOT NULL,
    result_text          TEXT NOT NULL,
    PRIMARY KEY (id, policy_version)
);

CREATE TABLE IF NOT EXISTS keywords (
    rule_id              TEXT NOT NULL,
    policy_version       TEXT NOT NULL,
    keyword              TEXT NOT NULL,
    PRIMARY KEY (rule_id, policy_version, keyword),
    FOREIGN KEY (rule_id, policy_version)
        REFERENCES rules(id, policy_version) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_messages_physician ON messages(physician_id);
CREATE INDEX IF NOT EXISTS idx_messages_timestamp ON messages(timestamp);
";

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the database file at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database. Used by tests and ad-hoc tooling.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(Self { conn })
    }

    /// Create all tables and indexes. Idempotent.
    pub fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        tracing::debug!("schema migrated");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Writes (bulk-load path only; never called at request time)
    // -----------------------------------------------------------------------

    pub fn insert_physician(&self, physician: &Physician) -> Result<()> {
        self.conn.execute(
            "INSERT INTO physicians (physician_id, npi, first_name, last_name,
                                     specialty, state, consent_opt_in, preferred_channel)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                physician.physician_id,
                physician.npi,
                physician.first_name,
                physician.last_name,
                physician.specialty,
                physician.state,
                physician.consent_opt_in,
                physician.preferred_channel,
            ],
        )?;
        Ok(())
    }

    pub fn insert_message(&self, message: &Message) -> Result<()> {
        self.conn.execute(
            "INSERT INTO messages (message_id, physician_id, channel, is_outbound,
                                   timestamp, message_text, campaign_id, topic,
                                   compliance_tag, sentiment, delivery_status,
                                   response_latency_sec)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                message.message_id,
                message.physician_id,
                message.channel,
                message.direction.is_outbound(),
                message.timestamp,
                message.message_text,
                message.campaign_id,
                message.topic,
                message.compliance_tag,
                message.sentiment,
                message.delivery_status,
                message.response_latency_sec,
            ],
        )?;
        Ok(())
    }

    pub fn insert_policy_version(&self, version: &PolicyVersion) -> Result<()> {
        self.conn.execute(
            "INSERT INTO policy_versions (version, effective_date) VALUES (?, ?)",
            params![version.version, version.effective_date],
        )?;
        Ok(())
    }

    /// Insert a rule and its keywords under `version` in one call, so a rule
    /// can never exist without its trigger set.
    pub fn insert_rule(&self, version: &str, rule: &Rule, keywords: &[String]) -> Result<()> {
        self.conn.execute(
            "INSERT INTO rules (id, policy_version, name, result_type, result_text)
             VALUES (?, ?, ?, ?, ?)",
            params![
                rule.id,
                version,
                rule.name,
                rule.outcome.result_type(),
                rule.outcome.result_text(),
            ],
        )?;
        for keyword in keywords {
            self.conn.execute(
                "INSERT INTO keywords (rule_id, policy_version, keyword) VALUES (?, ?, ?)",
                params![rule.id, version, keyword],
            )?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Classification reads
    // -----------------------------------------------------------------------

    /// Text of the given message, or `None` if it does not exist.
    pub fn message_text(&self, message_id: i64) -> Result<Option<String>> {
        let text = self
            .conn
            .query_row(
                "SELECT message_text FROM messages WHERE message_id = ?",
                [message_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(text)
    }

    /// All rules of a policy version with their full keyword sets, ordered by
    /// rule id ascending with keywords in lexical order. This ordering is
    /// load-bearing: classification output order follows it. An unknown
    /// version returns an empty list, not an error.
    pub fn rules_for_version(&self, version: &str) -> Result<Vec<RuleWithKeywords>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.id, r.name, r.result_type, r.result_text, k.keyword
             FROM rules r
             JOIN keywords k
               ON k.rule_id = r.id AND k.policy_version = r.policy_version
             WHERE r.policy_version = ?
             ORDER BY r.id, k.keyword",
        )?;
        let rows = stmt.query_map([version], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        // Fold the flat join rows into one entry per rule. Rows for the same
        // rule are consecutive because of the ORDER BY above.
        let mut out: Vec<RuleWithKeywords> = Vec::new();
        for row in rows {
            let (id, name, result_type, result_text, keyword) = row?;
            match out.last_mut() {
                Some(last) if last.rule.id == id => last.keywords.push(keyword),
                _ => {
                    let outcome = RuleOutcome::from_parts(&result_type, result_text, &id)?;
                    out.push(RuleWithKeywords {
                        rule: Rule { id, name, outcome },
                        keywords: vec![keyword],
                    });
                }
            }
        }
        Ok(out)
    }

    // -----------------------------------------------------------------------
    // Search reads
    // -----------------------------------------------------------------------

    pub fn search_physicians(&self, filter: &PhysicianFilter) -> Result<Vec<Physician>> {
        let mut sql = String::from(
            "SELECT physician_id, npi, first_name, last_name, specialty, state,
                    consent_opt_in, preferred_channel
             FROM physicians",
        );
        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<&dyn ToSql> = Vec::new();

        if let Some(state) = &filter.state {
            clauses.push("state = ? COLLATE NOCASE");
            args.push(state);
        }
        if let Some(specialty) = &filter.specialty {
            clauses.push("specialty LIKE ?");
            args.push(specialty);
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY physician_id");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(args.as_slice(), |row| {
            Ok(Physician {
                physician_id: row.get(0)?,
                npi: row.get(1)?,
                first_name: row.get(2)?,
                last_name: row.get(3)?,
                specialty: row.get(4)?,
                state: row.get(5)?,
                consent_opt_in: row.get(6)?,
                preferred_channel: row.get(7)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub fn search_messages(&self, filter: &MessageFilter) -> Result<Vec<Message>> {
        filter.validate()?;

        let mut sql = String::from(
            "SELECT message_id, physician_id, channel, is_outbound, timestamp,
                    message_text, campaign_id, topic, compliance_tag, sentiment,
                    delivery_status, response_latency_sec
             FROM messages",
        );
        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<&dyn ToSql> = Vec::new();

        if let Some(physician_id) = &filter.physician_id {
            clauses.push("physician_id = ?");
            args.push(physician_id);
        }
        if let Some(start) = &filter.start_date {
            clauses.push("timestamp >= ?");
            args.push(start);
        }
        if let Some(end) = &filter.end_date {
            clauses.push("timestamp <= ?");
            args.push(end);
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY timestamp");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(args.as_slice(), |row| {
            let is_outbound: bool = row.get(3)?;
            Ok(Message {
                message_id: row.get(0)?,
                physician_id: row.get(1)?,
                channel: row.get(2)?,
                direction: if is_outbound {
                    Direction::Outbound
                } else {
                    Direction::Inbound
                },
                timestamp: row.get(4)?,
                message_text: row.get(5)?,
                campaign_id: row.get(6)?,
                topic: row.get(7)?,
                compliance_tag: row.get(8)?,
                sentiment: row.get(9)?,
                delivery_status: row.get(10)?,
                response_latency_sec: row.get(11)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn test_store() -> Store {
        let store = Store::open_in_memory().unwrap();
        store.migrate().unwrap();
        store
    }

    fn physician(id: i64, state: &str, specialty: &str) -> Physician {
        Physician {
            physician_id: id,
            npi: format!("{id:010}"),
            first_name: "Dana".into(),
            last_name: "Reyes".into(),
            specialty: specialty.into(),
            state: state.into(),
            consent_opt_in: true,
            preferred_channel: "email".into(),
        }
    }

    fn message(id: i64, physician_id: i64, ts: &str, text: &str) -> Message {
        Message {
            message_id: id,
            physician_id,
            channel: "email".into(),
            direction: Direction::Inbound,
            timestamp: NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S").unwrap(),
            message_text: text.into(),
            campaign_id: None,
            topic: None,
            compliance_tag: None,
            sentiment: None,
            delivery_status: None,
            response_latency_sec: None,
        }
    }

    fn seed_policy(store: &Store) {
        store
            .insert_policy_version(&PolicyVersion {
                version: "v1".into(),
                effective_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            })
            .unwrap();
        store
            .insert_rule(
                "v1",
                &Rule {
                    id: "R-004".into(),
                    name: "Sample requests".into(),
                    outcome: RuleOutcome::Action("route to samples desk".into()),
                },
                &["sample".into(), "samples".into()],
            )
            .unwrap();
        store
            .insert_rule(
                "v1",
                &Rule {
                    id: "R-001".into(),
                    name: "Off-label discussion".into(),
                    outcome: RuleOutcome::RequiresAppend("See full prescribing information.".into()),
                },
                &["off-label".into()],
            )
            .unwrap();
    }

    #[test]
    fn migrate_is_idempotent() {
        let store = test_store();
        store.migrate().unwrap();
    }

    #[test]
    fn message_text_distinguishes_absent_from_present() {
        let store = test_store();
        store.insert_physician(&physician(1, "CA", "Oncology")).unwrap();
        store
            .insert_message(&message(10, 1, "2024-01-15T09:30:00", "hello"))
            .unwrap();

        assert_eq!(store.message_text(10).unwrap().as_deref(), Some("hello"));
        assert_eq!(store.message_text(999).unwrap(), None);
    }

    #[test]
    fn rules_for_version_is_eager_and_ordered() {
        let store = test_store();
        seed_policy(&store);

        // R-004 was inserted first but R-001 must sort before it.
        let rules = store.rules_for_version("v1").unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].rule.id, "R-001");
        assert_eq!(rules[1].rule.id, "R-004");
        assert_eq!(rules[1].keywords, vec!["sample", "samples"]);
    }

    #[test]
    fn unknown_version_is_empty_not_an_error() {
        let store = test_store();
        seed_policy(&store);
        assert!(store.rules_for_version("v99").unwrap().is_empty());
    }

    #[test]
    fn duplicate_keyword_in_rule_violates_primary_key() {
        let store = test_store();
        store
            .insert_policy_version(&PolicyVersion {
                version: "v1".into(),
                effective_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            })
            .unwrap();
        let result = store.insert_rule(
            "v1",
            &Rule {
                id: "R-001".into(),
                name: "dup".into(),
                outcome: RuleOutcome::Action("x".into()),
            },
            &["sample".into(), "sample".into()],
        );
        assert!(result.is_err());
    }

    #[test]
    fn same_rule_id_can_exist_in_two_versions() {
        let store = test_store();
        for (version, date) in [("v1", 2024), ("v2", 2025)] {
            store
                .insert_policy_version(&PolicyVersion {
                    version: version.into(),
                    effective_date: NaiveDate::from_ymd_opt(date, 1, 1).unwrap(),
                })
                .unwrap();
            store
                .insert_rule(
                    version,
                    &Rule {
                        id: "R-001".into(),
                        name: format!("rule in {version}"),
                        outcome: RuleOutcome::Action("x".into()),
                    },
                    &["keyword".into()],
                )
                .unwrap();
        }
        assert_eq!(store.rules_for_version("v1").unwrap().len(), 1);
        assert_eq!(store.rules_for_version("v2").unwrap().len(), 1);
    }

    #[test]
    fn physician_search_filters_state_case_insensitively() {
        let store = test_store();
        store.insert_physician(&physician(1, "CA", "Oncology")).unwrap();
        store.insert_physician(&physician(2, "NY", "Cardiology")).unwrap();

        let filter = PhysicianFilter {
            state: Some("ca".into()),
            specialty: None,
        };
        let found = store.search_physicians(&filter).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].physician_id, 1);
    }

    #[test]
    fn physician_search_specialty_is_a_like_pattern() {
        let store = test_store();
        store.insert_physician(&physician(1, "CA", "Oncology")).unwrap();
        store.insert_physician(&physician(2, "CA", "Radiation Oncology")).unwrap();
        store.insert_physician(&physician(3, "CA", "Cardiology")).unwrap();

        let filter = PhysicianFilter {
            state: None,
            specialty: Some("%Oncology".into()),
        };
        let found = store.search_physicians(&filter).unwrap();
        assert_eq!(found.len(), 2);
        // Ordered by physician id regardless of insertion order.
        assert_eq!(found[0].physician_id, 1);
        assert_eq!(found[1].physician_id, 2);
    }

    #[test]
    fn message_search_respects_inclusive_range_and_orders_by_timestamp() {
        let store = test_store();
        store.insert_physician(&physician(1, "CA", "Oncology")).unwrap();
        store
            .insert_message(&message(3, 1, "2024-03-01T00:00:00", "march"))
            .unwrap();
        store
            .insert_message(&message(1, 1, "2024-01-01T00:00:00", "january"))
            .unwrap();
        store
            .insert_message(&message(2, 1, "2024-02-01T00:00:00", "february"))
            .unwrap();

        let filter = MessageFilter {
            physician_id: Some(1),
            start_date: Some(
                NaiveDateTime::parse_from_str("2024-01-01T00:00:00", "%Y-%m-%dT%H:%M:%S").unwrap(),
            ),
            end_date: Some(
                NaiveDateTime::parse_from_str("2024-02-01T00:00:00", "%Y-%m-%dT%H:%M:%S").unwrap(),
            ),
        };
        let found = store.search_messages(&filter).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].message_id, 1);
        assert_eq!(found[1].message_id, 2);
    }

    #[test]
    fn message_search_rejects_inverted_range() {
        let store = test_store();
        let filter = MessageFilter {
            physician_id: None,
            start_date: Some(
                NaiveDateTime::parse_from_str("2024-02-01T00:00:00", "%Y-%m-%dT%H:%M:%S").unwrap(),
            ),
            end_date: Some(
                NaiveDateTime::parse_from_str("2024-01-01T00:00:00", "%Y-%m-%dT%H:%M:%S").unwrap(),
            ),
        };
        assert!(store.search_messages(&filter).is_err());
    }
}
