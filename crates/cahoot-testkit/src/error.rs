//! Error type for `cahoot-testkit`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A failure armed by a test via the fault-injection toggles.
  #[error("injected {0} failure")]
  Injected(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
