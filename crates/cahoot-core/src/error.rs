//! Error types for `cahoot-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A query was built with no targets; there is nothing to match against.
  /// Detected before any backend call and never retried.
  #[error("related-contacts query has no targets")]
  EmptyTargets,

  /// The backing event store failed. Transient from the engine's point of
  /// view; the caller decides whether to retry the whole query.
  #[error("event store error: {0}")]
  Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// The ingestion logger has already been shut down.
  #[error("event logger is shut down")]
  LoggerClosed,
}

impl Error {
  /// Box an arbitrary backend error into [`Error::Backend`].
  pub fn backend<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Backend(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
