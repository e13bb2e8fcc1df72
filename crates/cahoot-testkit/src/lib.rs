//! Test support for the Cahoot affinity engine.
//!
//! [`MemoryStore`] is an in-memory [`EventStore`] that evaluates the
//! predicate algebra directly over a vector of events. It is the reference
//! model real backends are compared against, and it carries fault-injection
//! toggles so engine tests can exercise retry and error-propagation paths.

mod error;

pub use error::{Error, Result};

use std::{
  collections::{BTreeMap, HashSet},
  sync::{
    Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
  },
};

use uuid::Uuid;

use cahoot_core::{
  event::{Event, EventDirection},
  store::{AddressCount, AggregateRequest, EventCountRequest, EventStore},
};

// ─── MemoryStore ─────────────────────────────────────────────────────────────

/// An in-memory event store. Safe to share across tasks.
#[derive(Default)]
pub struct MemoryStore {
  events:          Mutex<Vec<Event>>,
  fail_appends:    AtomicUsize,
  fail_aggregates: AtomicBool,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Arm the next `n` `append` calls to fail.
  pub fn fail_next_appends(&self, n: usize) {
    self.fail_appends.store(n, Ordering::SeqCst);
  }

  /// Make every `aggregate` call fail until disarmed.
  pub fn fail_aggregates(&self, fail: bool) {
    self.fail_aggregates.store(fail, Ordering::SeqCst);
  }

  /// Total number of stored events.
  pub fn event_count(&self) -> usize {
    self.lock().len()
  }

  /// All stored events for one mailbox.
  pub fn events_for(&self, mailbox_id: Uuid) -> Vec<Event> {
    self
      .lock()
      .iter()
      .filter(|e| e.mailbox_id == mailbox_id)
      .cloned()
      .collect()
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Event>> {
    self.events.lock().unwrap_or_else(|e| e.into_inner())
  }
}

// ─── EventStore impl ─────────────────────────────────────────────────────────

impl EventStore for MemoryStore {
  type Error = Error;

  async fn append(&self, events: &[Event]) -> Result<()> {
    let armed = self.fail_appends.load(Ordering::SeqCst);
    if armed > 0 {
      self.fail_appends.store(armed - 1, Ordering::SeqCst);
      return Err(Error::Injected("append"));
    }
    self.lock().extend_from_slice(events);
    Ok(())
  }

  async fn aggregate(&self, req: &AggregateRequest) -> Result<Vec<AddressCount>> {
    if self.fail_aggregates.load(Ordering::SeqCst) {
      return Err(Error::Injected("aggregate"));
    }

    let events = self.lock();

    // Cutoff is a hard filter: events below it are invisible to both target
    // matching and counting.
    let visible: Vec<&Event> = events
      .iter()
      .filter(|e| e.mailbox_id == req.mailbox_id && e.direction == req.direction)
      .filter(|e| req.cutoff.is_none_or(|cutoff| e.timestamp >= cutoff))
      .collect();

    let mut by_message: BTreeMap<Uuid, Vec<&Event>> = BTreeMap::new();
    for event in visible {
      by_message.entry(event.message_id).or_default().push(event);
    }

    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for siblings in by_message.values() {
      if !req.predicate.matches_message(siblings) {
        continue;
      }
      for event in siblings {
        if req.result_field.accepts(event.field) {
          *counts.entry(event.address.clone()).or_insert(0) += 1;
        }
      }
    }

    let mut rows: Vec<AddressCount> = counts
      .into_iter()
      .map(|(address, count)| AddressCount { address, count })
      .collect();
    rows.sort_by(|a, b| {
      b.count.cmp(&a.count).then_with(|| a.address.cmp(&b.address))
    });
    Ok(rows)
  }

  async fn count_events(&self, req: &EventCountRequest) -> Result<u64> {
    let events = self.lock();
    let distinct: HashSet<Uuid> = events
      .iter()
      .filter(|e| e.mailbox_id == req.mailbox_id)
      .filter(|e| req.direction.is_none_or(|d| e.direction == d))
      .filter(|e| req.since.is_none_or(|since| e.timestamp >= since))
      .filter(|e| match e.direction {
        EventDirection::Outgoing => e.address == req.address,
        EventDirection::Incoming => e.sender == req.address,
      })
      .map(|e| e.message_id)
      .collect();
    Ok(distinct.len() as u64)
  }

  async fn delete_mailbox_events(&self, mailbox_id: Uuid) -> Result<()> {
    self.lock().retain(|e| e.mailbox_id != mailbox_id);
    Ok(())
  }
}
