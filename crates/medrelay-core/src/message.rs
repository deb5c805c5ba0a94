use crate::error::MedrelayError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }

    pub fn is_outbound(self) -> bool {
        matches!(self, Direction::Outbound)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Direction {
    type Err = MedrelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inbound" => Ok(Direction::Inbound),
            "outbound" => Ok(Direction::Outbound),
            _ => Err(MedrelayError::InvalidDirection(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A physician-facing message. The classification engine only reads
/// `message_id` and `message_text`; everything else is search metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub physician_id: i64,
    pub channel: String,
    pub direction: Direction,
    pub timestamp: NaiveDateTime,
    pub message_text: String,
    pub campaign_id: Option<String>,
    pub topic: Option<String>,
    pub compliance_tag: Option<String>,
    pub sentiment: Option<String>,
    pub delivery_status: Option<String>,
    pub response_latency_sec: Option<f64>,
}

// ---------------------------------------------------------------------------
// MessageFilter
// ---------------------------------------------------------------------------

/// Search filter for messages. The timestamp range is inclusive on both ends.
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    pub physician_id: Option<i64>,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
}

impl MessageFilter {
    /// A filter with `start_date` after `end_date` can never match anything,
    /// so it is rejected rather than silently returning an empty list.
    pub fn validate(&self) -> crate::Result<()> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(MedrelayError::InvalidDateRange);
            }
        }
        Ok(())
    }
}
