//! Error type for `lifelink-engine`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A typed domain failure — validation, lifecycle conflicts, missing
  /// records. Carries a stable error code for API clients.
  #[error(transparent)]
  Domain(#[from] lifelink_core::Error),

  /// A backend failure from the store implementation.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error, keeping it opaque to callers.
  pub fn from_store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  /// The stable error code surfaced to API clients.
  pub fn code(&self) -> &'static str {
    match self {
      Self::Domain(e) => e.code(),
      Self::Store(_) => "STORE_FAILURE",
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
