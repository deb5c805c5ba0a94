use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Physician
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Physician {
    pub physician_id: i64,
    pub npi: String,
    pub first_name: String,
    pub last_name: String,
    pub specialty: String,
    pub state: String,
    pub consent_opt_in: bool,
    pub preferred_channel: String,
}

// ---------------------------------------------------------------------------
// PhysicianFilter
// ---------------------------------------------------------------------------

/// Search filter for physicians. `state` is a case-insensitive equality
/// match; `specialty` is an SQL LIKE pattern (so `%` wildcards work).
#[derive(Debug, Clone, Default)]
pub struct PhysicianFilter {
    pub state: Option<String>,
    pub specialty: Option<String>,
}
