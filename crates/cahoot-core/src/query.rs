//! Query and result value objects for related-contacts lookups.
//!
//! Everything here is a per-call value object with no shared mutable state;
//! results are constructed once per query execution and never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{event::ParticipantField, scope::AffinityScope};

/// Result limit applied when the caller does not set one.
pub const DEFAULT_RESULT_LIMIT: usize = 25;

// ─── Field constraint ────────────────────────────────────────────────────────

/// Constrains the field of the *returned* contact, not of the targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AffinityField {
  To,
  Cc,
  Bcc,
  All,
}

impl AffinityField {
  /// Whether an event in `field` satisfies this constraint.
  pub fn accepts(self, field: ParticipantField) -> bool {
    match self {
      Self::To => field == ParticipantField::To,
      Self::Cc => field == ParticipantField::Cc,
      Self::Bcc => field == ParticipantField::Bcc,
      Self::All => true,
    }
  }
}

// ─── Target ──────────────────────────────────────────────────────────────────

/// A seed contact a query is anchored to: an address plus the field the
/// caller believes it occupies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffinityTarget {
  pub field:   ParticipantField,
  pub address: String,
}

impl AffinityTarget {
  pub fn new(field: ParticipantField, address: impl Into<String>) -> Self {
    Self { field, address: address.into() }
  }
}

// ─── Params ──────────────────────────────────────────────────────────────────

/// Parameters for a related-contacts query.
#[derive(Debug, Clone)]
pub struct RelatedContactsParams {
  pub mailbox_id:       Uuid,
  /// The account's own address; always excluded from results. Supplied by
  /// the caller because directory lookup is outside this engine.
  pub owner_address:    String,
  /// Seed contacts. Must be non-empty.
  pub targets:          Vec<AffinityTarget>,
  /// Field constraint on returned contacts.
  pub requested_field:  AffinityField,
  /// Exclusive lower bound on event timestamps; `None` means no cutoff.
  pub date_cutoff:      Option<DateTime<Utc>>,
  /// Addresses with fewer qualifying events than this are dropped entirely.
  pub min_occur:        u32,
  /// Maximum number of results.
  pub limit:            usize,
  /// Whether the expanding query considers incoming-mail scopes at all.
  pub include_incoming: bool,
}

impl RelatedContactsParams {
  pub fn new(
    mailbox_id: Uuid,
    owner_address: impl Into<String>,
    targets: Vec<AffinityTarget>,
  ) -> Self {
    Self {
      mailbox_id,
      owner_address: owner_address.into(),
      targets,
      requested_field: AffinityField::All,
      date_cutoff: None,
      min_occur: 1,
      limit: DEFAULT_RESULT_LIMIT,
      include_incoming: true,
    }
  }

  pub fn requested_field(mut self, field: AffinityField) -> Self {
    self.requested_field = field;
    self
  }

  pub fn date_cutoff(mut self, cutoff: DateTime<Utc>) -> Self {
    self.date_cutoff = Some(cutoff);
    self
  }

  pub fn min_occur(mut self, min_occur: u32) -> Self {
    self.min_occur = min_occur;
    self
  }

  pub fn limit(mut self, limit: usize) -> Self {
    self.limit = limit;
    self
  }

  pub fn include_incoming(mut self, include: bool) -> Self {
    self.include_incoming = include;
    self
  }
}

// ─── Result ──────────────────────────────────────────────────────────────────

/// One related contact, tagged with the scope that discovered it.
///
/// `score` is the count of qualifying co-occurring events, carried as a float
/// for interface uniformity with other ranking surfaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedContact {
  pub address: String,
  pub score:   f64,
  pub scope:   AffinityScope,
}
