//! [`AffinityEngine`] — the engine surface consumed by mail send/receive
//! hooks and by query callers.
//!
//! Querying is stateless and side-effect-free aside from backend reads;
//! concurrent queries never interfere. Ingestion state lives entirely inside
//! the [`EventLogger`].

use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use cahoot_core::{
  Error, Result,
  event::{Event, EventDirection},
  query::{RelatedContact, RelatedContactsParams},
  scope::{AffinityScope, EXPANSION_ORDER},
  store::EventStore,
};

use crate::{
  config::LoggerConfig,
  frequency::{self, FrequencyDirection, FrequencyWindow},
  logger::EventLogger,
  matcher,
};

// ─── Engine ──────────────────────────────────────────────────────────────────

pub struct AffinityEngine<S> {
  store:   Arc<S>,
  logger:  EventLogger,
  enabled: bool,
}

impl<S: EventStore + 'static> AffinityEngine<S> {
  /// Build the engine and spawn its ingestion flusher on the current
  /// runtime.
  pub fn new(store: Arc<S>, config: LoggerConfig) -> Self {
    let enabled = config.enabled;
    let logger = EventLogger::spawn(Arc::clone(&store), config);
    Self { store, logger, enabled }
  }

  // ── Ingestion ─────────────────────────────────────────────────────────────

  /// Fire-and-forget ingestion. A no-op when affinity logging is disabled
  /// for this deployment; never fails the mail-processing caller.
  pub fn log_event(&self, event: Event) {
    if self.enabled {
      self.logger.log(event);
    }
  }

  /// Force-drain the ingestion buffer. Used at shutdown and test
  /// boundaries so the tail of a session is not lost.
  pub async fn flush_now(&self) -> Result<()> {
    self.logger.flush_now().await
  }

  /// Drain and stop the ingestion task.
  pub async fn shutdown(&self) -> Result<()> {
    self.logger.shutdown().await
  }

  // ── Queries ───────────────────────────────────────────────────────────────

  /// Run one specific scope and wrap its rows, truncated to `params.limit`.
  ///
  /// An explicitly requested incoming scope is honored regardless of
  /// `params.include_incoming`; that flag governs expansion only.
  pub async fn query(
    &self,
    params: &RelatedContactsParams,
    scope: AffinityScope,
  ) -> Result<Vec<RelatedContact>> {
    let rows = matcher::run_scope(&*self.store, params, scope).await?;
    Ok(
      rows
        .into_iter()
        .take(params.limit)
        .map(|row| RelatedContact {
          address: row.address,
          score:   row.count as f64,
          scope,
        })
        .collect(),
    )
  }

  /// The default query mode: walk the scopes narrowest to broadest, merging
  /// results until the limit is reached or scopes are exhausted.
  ///
  /// A contact found at a narrow scope is never re-scored or re-tagged at a
  /// broader one — narrower, stricter evidence always wins, and the scope on
  /// each result records which rule discovered it. A backend failure
  /// mid-expansion propagates; it is never folded into a partial result.
  pub async fn query_expanding(
    &self,
    params: &RelatedContactsParams,
  ) -> Result<Vec<RelatedContact>> {
    if params.targets.is_empty() {
      return Err(Error::EmptyTargets);
    }

    let mut results: Vec<RelatedContact> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for &scope in &EXPANSION_ORDER {
      if results.len() >= params.limit {
        break;
      }
      if scope.direction() == EventDirection::Incoming
        && !params.include_incoming
      {
        continue;
      }

      let rows = matcher::run_scope(&*self.store, params, scope).await?;
      for row in rows {
        if results.len() >= params.limit {
          break;
        }
        if !seen.insert(row.address.clone()) {
          continue;
        }
        results.push(RelatedContact {
          address: row.address,
          score:   row.count as f64,
          scope,
        });
      }
    }

    Ok(results)
  }

  /// How often the mailbox exchanged mail with one contact inside a window.
  pub async fn contact_frequency(
    &self,
    mailbox_id: Uuid,
    address: &str,
    direction: FrequencyDirection,
    window: FrequencyWindow,
    now: DateTime<Utc>,
  ) -> Result<u64> {
    frequency::contact_frequency(
      &*self.store,
      mailbox_id,
      address,
      direction,
      window,
      now,
    )
    .await
  }
}
