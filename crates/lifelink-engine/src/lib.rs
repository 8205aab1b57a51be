//! The LifeLink matching and notification engine.
//!
//! Owns everything between the store and the API surface: candidate
//! matching, notification fan-out, response aggregation with auto-fulfilment,
//! and the background expiry sweeper. Generic over any
//! [`LifelinkStore`](lifelink_core::store::LifelinkStore) backend and any
//! [`NotificationTransport`] — the engine decides *who* to notify; payload
//! delivery belongs to the transport collaborator.

use std::sync::Arc;

use lifelink_core::store::LifelinkStore;

pub mod config;
pub mod donors;
pub mod error;
pub mod matcher;
pub mod notifier;
pub mod requisitions;
pub mod response;
pub mod sweeper;
pub mod transport;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use matcher::MatchOutcome;
pub use notifier::FanOutReport;
pub use response::ResponseAck;
pub use transport::{LogTransport, NotificationTransport, TransportError};

#[cfg(test)]
mod tests;

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Shared engine handle; cheap to clone via the inner `Arc`s.
pub struct Engine<S, T> {
  store:     Arc<S>,
  transport: Arc<T>,
  config:    EngineConfig,
}

impl<S, T> Engine<S, T>
where
  S: LifelinkStore,
  T: NotificationTransport,
{
  pub fn new(store: Arc<S>, transport: Arc<T>, config: EngineConfig) -> Self {
    Self { store, transport, config }
  }

  pub fn store(&self) -> &Arc<S> {
    &self.store
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }
}
