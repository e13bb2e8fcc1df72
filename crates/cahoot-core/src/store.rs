//! The `EventStore` trait and the target-match predicate algebra.
//!
//! The trait is implemented by storage backends (e.g.
//! `cahoot-store-sqlite`). The engine depends on this abstraction, not on
//! any concrete backend.
//!
//! The predicate algebra is the whole query language a backend must support:
//! address equality, field equality, sender equality, and AND/OR composition
//! across target clauses. It is kept in disjunctive normal form so a backend
//! can compile it mechanically (a UNION of INTERSECTs, for SQL stores). The
//! algebra also evaluates directly against in-memory events, which is the
//! reference semantics backends are tested against.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  event::{Event, EventDirection, ParticipantField},
  query::AffinityField,
};

// ─── Predicate algebra ───────────────────────────────────────────────────────

/// One atomic condition on a single event of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchClause {
  /// Some event on the message carries this recipient address, any field.
  RecipientIs { address: String },
  /// Some event on the message carries this recipient address in this field.
  RecipientInField {
    address: String,
    field:   ParticipantField,
  },
  /// The message's sender is this address. Incoming scopes only.
  SenderIs { address: String },
}

impl MatchClause {
  /// Whether a single event satisfies this clause.
  pub fn matches(&self, event: &Event) -> bool {
    match self {
      Self::RecipientIs { address } => event.address == *address,
      Self::RecipientInField { address, field } => {
        event.address == *address && event.field == *field
      }
      Self::SenderIs { address } => event.sender == *address,
    }
  }
}

/// A conjunction: every clause must hold somewhere on the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageMatch {
  pub all: Vec<MatchClause>,
}

impl MessageMatch {
  pub fn new(all: Vec<MatchClause>) -> Self {
    Self { all }
  }

  /// Whether a message — given as its sibling events — satisfies every
  /// clause. Each clause may be satisfied by a different event.
  pub fn matches_message(&self, events: &[&Event]) -> bool {
    self
      .all
      .iter()
      .all(|clause| events.iter().any(|event| clause.matches(event)))
  }
}

/// A disjunction of conjunctions. A message qualifies when any one
/// alternative holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPredicate {
  pub any: Vec<MessageMatch>,
}

impl TargetPredicate {
  pub fn new(any: Vec<MessageMatch>) -> Self {
    Self { any }
  }

  pub fn matches_message(&self, events: &[&Event]) -> bool {
    self.any.iter().any(|alt| alt.matches_message(events))
  }
}

// ─── Request / response types ────────────────────────────────────────────────

/// Parameters for [`EventStore::aggregate`].
///
/// The aggregate is a pure count-group-by: for every message of the mailbox
/// (in `direction`, at or after `cutoff`) that satisfies `predicate`, count
/// each co-occurring event whose field passes `result_field`. Exclusions,
/// minimum-occurrence thresholds and limits are the caller's concern.
#[derive(Debug, Clone)]
pub struct AggregateRequest {
  pub mailbox_id:   Uuid,
  pub direction:    EventDirection,
  pub predicate:    TargetPredicate,
  pub result_field: AffinityField,
  /// Hard filter: events with `timestamp < cutoff` are invisible to both
  /// target matching and counting.
  pub cutoff:       Option<DateTime<Utc>>,
}

/// One aggregate row: an address and how many qualifying events carried it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressCount {
  pub address: String,
  pub count:   u64,
}

/// Parameters for [`EventStore::count_events`]: the number of distinct
/// messages on which `address` participated — as a recipient for outgoing
/// mail, as the sender for incoming mail. `direction: None` counts both.
#[derive(Debug, Clone)]
pub struct EventCountRequest {
  pub mailbox_id: Uuid,
  pub direction:  Option<EventDirection>,
  pub address:    String,
  pub since:      Option<DateTime<Utc>>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Cahoot event store backend.
///
/// The store is append-only; duplicates are tolerated (they only perturb
/// counts, not the shape of the contract).
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait EventStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Bulk-insert a batch of events.
  fn append<'a>(
    &'a self,
    events: &'a [Event],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Count-group-by over events co-occurring with qualifying messages.
  ///
  /// Rows are ordered by descending count, ties by ascending address, so
  /// results are deterministic for a given store state.
  fn aggregate<'a>(
    &'a self,
    req: &'a AggregateRequest,
  ) -> impl Future<Output = Result<Vec<AddressCount>, Self::Error>> + Send + 'a;

  /// Distinct-message participation count for one contact.
  fn count_events<'a>(
    &'a self,
    req: &'a EventCountRequest,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Remove every event belonging to one mailbox.
  fn delete_mailbox_events(
    &self,
    mailbox_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── Tests ───────────────────────────────────────────────────────────────────
