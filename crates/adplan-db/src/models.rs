use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Terminal state recorded for a planning request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuditState {
    Accepted,
    Exhausted,
}

impl fmt::Display for AuditState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Accepted => "accepted",
            Self::Exhausted => "exhausted",
        };
        f.write_str(s)
    }
}

impl FromStr for AuditState {
    type Err = AuditStateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accepted" => Ok(Self::Accepted),
            "exhausted" => Ok(Self::Exhausted),
            other => Err(AuditStateParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`AuditState`] string.
#[derive(Debug, Clone)]
pub struct AuditStateParseError(pub String);

impl fmt::Display for AuditStateParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid audit state: {:?}", self.0)
    }
}

impl std::error::Error for AuditStateParseError {}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// A stored publication document.
#[derive(Debug, Clone, FromRow)]
pub struct PublicationRow {
    pub id: i64,
    pub name: String,
    pub hub_ids: Vec<String>,
    pub document: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

/// A stored planning audit record.
#[derive(Debug, Clone, FromRow)]
pub struct AuditRow {
    pub request_id: Uuid,
    pub hub_id: String,
    pub profile_id: String,
    pub state: AuditState,
    pub passes_used: i16,
    pub calls_made: i16,
    pub initial_total: Option<f64>,
    pub final_total: Option<f64>,
    pub prompt_sha256: String,
    pub document: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Columns supplied when inserting an audit record.
#[derive(Debug, Clone)]
pub struct NewAudit {
    pub request_id: Uuid,
    pub hub_id: String,
    pub profile_id: String,
    pub state: AuditState,
    pub passes_used: i16,
    pub calls_made: i16,
    pub initial_total: Option<f64>,
    pub final_total: Option<f64>,
    pub prompt_sha256: String,
    pub document: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
