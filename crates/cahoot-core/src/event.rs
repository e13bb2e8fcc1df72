//! Event types — the fundamental unit of the affinity log.
//!
//! An event is one participant edge of one message: the fact that a single
//! address appeared in a single to/cc/bcc slot of a message a mailbox sent or
//! received. Events are never updated; the log is append-only, and
//! co-occurrence is defined as two addresses appearing in events that share a
//! `message_id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Enums ───────────────────────────────────────────────────────────────────

/// The to/cc/bcc slot an address occupied on a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantField {
  To,
  Cc,
  Bcc,
}

/// Whether the owning mailbox sent or received the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventDirection {
  /// The mailbox owner is the sender.
  Outgoing,
  /// The mailbox owner is a recipient; `sender` records the external sender.
  Incoming,
}

// ─── Event ───────────────────────────────────────────────────────────────────

/// One participant edge of one message.
///
/// A message with N participant addresses (excluding the sender) yields N
/// events sharing `message_id`, `sender` and `timestamp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
  /// Owning account. Affinity is always scoped to one mailbox.
  pub mailbox_id: Uuid,
  /// Opaque id grouping the sibling events of one message.
  pub message_id: Uuid,
  pub direction:  EventDirection,
  /// The sending address: the owner's own address for outgoing events, the
  /// external sender for incoming events.
  pub sender:     String,
  /// The other participant's address for this edge (a recipient, for both
  /// directions).
  pub address:    String,
  /// The slot `address` occupied on the message.
  pub field:      ParticipantField,
  /// Message send/receive time; used for recency filtering.
  pub timestamp:  DateTime<Utc>,
}

impl Event {
  /// One recipient edge of a message the mailbox owner sent.
  pub fn outgoing(
    mailbox_id: Uuid,
    message_id: Uuid,
    sender: impl Into<String>,
    address: impl Into<String>,
    field: ParticipantField,
    timestamp: DateTime<Utc>,
  ) -> Self {
    Self {
      mailbox_id,
      message_id,
      direction: EventDirection::Outgoing,
      sender: sender.into(),
      address: address.into(),
      field,
      timestamp,
    }
  }

  /// One recipient edge of a message the mailbox owner received.
  pub fn incoming(
    mailbox_id: Uuid,
    message_id: Uuid,
    sender: impl Into<String>,
    address: impl Into<String>,
    field: ParticipantField,
    timestamp: DateTime<Utc>,
  ) -> Self {
    Self {
      mailbox_id,
      message_id,
      direction: EventDirection::Incoming,
      sender: sender.into(),
      address: address.into(),
      field,
      timestamp,
    }
  }

  /// Fan one sent message out into its sibling events, one per recipient.
  /// All events share a freshly generated `message_id`.
  pub fn outgoing_message(
    mailbox_id: Uuid,
    sender: &str,
    recipients: &[(ParticipantField, &str)],
    timestamp: DateTime<Utc>,
  ) -> Vec<Self> {
    let message_id = Uuid::new_v4();
    recipients
      .iter()
      .map(|(field, address)| {
        Self::outgoing(mailbox_id, message_id, sender, *address, *field, timestamp)
      })
      .collect()
  }

  /// Fan one received message out into its sibling events, one per recipient.
  pub fn incoming_message(
    mailbox_id: Uuid,
    sender: &str,
    recipients: &[(ParticipantField, &str)],
    timestamp: DateTime<Utc>,
  ) -> Vec<Self> {
    let message_id = Uuid::new_v4();
    recipients
      .iter()
      .map(|(field, address)| {
        Self::incoming(mailbox_id, message_id, sender, *address, *field, timestamp)
      })
      .collect()
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn message_fan_out_shares_message_id_and_sender() {
    let mailbox = Uuid::new_v4();
    let now = Utc::now();
    let events = Event::outgoing_message(
      mailbox,
      "owner@example.com",
      &[
        (ParticipantField::To, "a@example.com"),
        (ParticipantField::Cc, "b@example.com"),
        (ParticipantField::Bcc, "c@example.com"),
      ],
      now,
    );

    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|e| e.message_id == events[0].message_id));
    assert!(events.iter().all(|e| e.sender == "owner@example.com"));
    assert!(events.iter().all(|e| e.timestamp == now));
    assert!(
      events
        .iter()
        .all(|e| e.direction == EventDirection::Outgoing)
    );
  }

  #[test]
  fn wire_names_are_lowercase() {
    // The sqlite backend and any embedding product rely on these exact
    // serialised names; pin them.
    assert_eq!(
      serde_json::to_string(&ParticipantField::Bcc).unwrap(),
      "\"bcc\""
    );
    assert_eq!(
      serde_json::to_string(&EventDirection::Incoming).unwrap(),
      "\"incoming\""
    );
  }
}
