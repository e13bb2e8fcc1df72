//! Encoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! UUIDs are stored as hyphenated lowercase strings; enums as their lowercase
//! wire names; timestamps as epoch milliseconds, so range predicates are
//! plain integer comparisons.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use cahoot_core::{
  event::{EventDirection, ParticipantField},
  query::AffinityField,
};

// ─── Scalar encoders ─────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String {
  id.hyphenated().to_string()
}

pub fn encode_ts(dt: DateTime<Utc>) -> i64 {
  dt.timestamp_millis()
}

pub fn encode_direction(direction: EventDirection) -> &'static str {
  match direction {
    EventDirection::Outgoing => "outgoing",
    EventDirection::Incoming => "incoming",
  }
}

pub fn encode_field(field: ParticipantField) -> &'static str {
  match field {
    ParticipantField::To => "to",
    ParticipantField::Cc => "cc",
    ParticipantField::Bcc => "bcc",
  }
}

/// The result-field filter; `None` means no filter (`All`).
pub fn encode_affinity_field(field: AffinityField) -> Option<&'static str> {
  match field {
    AffinityField::To => Some("to"),
    AffinityField::Cc => Some("cc"),
    AffinityField::Bcc => Some("bcc"),
    AffinityField::All => None,
  }
}

// ─── Dynamic parameters ──────────────────────────────────────────────────────

/// A positional parameter for dynamically assembled SQL.
pub enum SqlValue {
  Text(String),
  Int(i64),
}

impl rusqlite::ToSql for SqlValue {
  fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
    match self {
      Self::Text(s) => s.to_sql(),
      Self::Int(i) => i.to_sql(),
    }
  }
}
