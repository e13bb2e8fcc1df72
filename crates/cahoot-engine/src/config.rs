//! Ingestion configuration.

use std::time::Duration;

use serde::Deserialize;

/// Tuning for the batched event logger. Both flush thresholds are explicit;
/// a flush happens when either is reached, whichever comes first.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
  /// Flush as soon as this many events are buffered.
  pub batch_size:     usize,
  /// Flush any partial batch this long after the previous flush.
  pub flush_interval: Duration,
  /// Upper bound on the buffer while the backend is unavailable; the oldest
  /// events are dropped beyond it.
  pub max_buffered:   usize,
  /// Master switch for affinity logging. Decided by mailbox policy elsewhere;
  /// the engine simply obeys it.
  pub enabled:        bool,
}

impl Default for LoggerConfig {
  fn default() -> Self {
    Self {
      batch_size:     100,
      flush_interval: Duration::from_secs(30),
      max_buffered:   10_000,
      enabled:        true,
    }
  }
}
