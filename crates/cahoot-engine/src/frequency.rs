//! Contact-frequency counts over the event log.
//!
//! A lighter sibling of the affinity queries: no co-occurrence, just "how
//! many messages did this mailbox exchange with this one contact inside a
//! window".

use chrono::{DateTime, Duration, Months, Utc};
use uuid::Uuid;

use cahoot_core::{
  Error, Result,
  event::EventDirection,
  store::{EventCountRequest, EventStore},
};

/// Which side of the conversation to count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyDirection {
  /// Messages the mailbox sent to the contact.
  Sent,
  /// Messages the mailbox received from the contact.
  Received,
  /// Both, summed.
  Combined,
}

/// Recency window, anchored at a caller-supplied `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyWindow {
  LastDay,
  LastWeek,
  LastMonth,
  Forever,
}

impl FrequencyWindow {
  /// Inclusive lower bound of the window; `None` for [`Self::Forever`].
  pub fn since(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match self {
      Self::LastDay => Some(now - Duration::days(1)),
      Self::LastWeek => Some(now - Duration::days(7)),
      Self::LastMonth => now.checked_sub_months(Months::new(1)),
      Self::Forever => None,
    }
  }
}

/// Count distinct messages exchanged with `address` inside the window.
pub async fn contact_frequency<S: EventStore>(
  store: &S,
  mailbox_id: Uuid,
  address: &str,
  direction: FrequencyDirection,
  window: FrequencyWindow,
  now: DateTime<Utc>,
) -> Result<u64> {
  let since = window.since(now);
  let directions: &[EventDirection] = match direction {
    FrequencyDirection::Sent => &[EventDirection::Outgoing],
    FrequencyDirection::Received => &[EventDirection::Incoming],
    FrequencyDirection::Combined => {
      &[EventDirection::Outgoing, EventDirection::Incoming]
    }
  };

  let mut total = 0;
  for &dir in directions {
    let request = EventCountRequest {
      mailbox_id,
      direction: Some(dir),
      address: address.to_owned(),
      since,
    };
    total += store
      .count_events(&request)
      .await
      .map_err(Error::backend)?;
  }
  Ok(total)
}
