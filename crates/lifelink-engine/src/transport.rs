//! The outbound transport seam.
//!
//! The engine records who gets notified and with what message; actually
//! delivering an SMS or push payload is an external collaborator's job,
//! reached through this trait. Dispatch happens only after the notification
//! row is durably recorded, so a crash between persistence and delivery is
//! safe to retry: at-least-once to the transport, at-most-once in the store.

use std::future::Future;

use lifelink_core::notification::DonorNotification;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("transport dispatch failed: {0}")]
pub struct TransportError(pub String);

pub trait NotificationTransport: Send + Sync + 'static {
  /// Hand one persisted notification to the delivery channel. Failures are
  /// retried by the notifier with backoff; exhausted retries flag the row
  /// retry-eligible rather than failing the batch.
  fn dispatch<'a>(
    &'a self,
    notification: &'a DonorNotification,
  ) -> impl Future<Output = Result<(), TransportError>> + Send + 'a;
}

// ─── LogTransport ────────────────────────────────────────────────────────────

/// Default transport: logs the dispatch and reports success. Deployments
/// wire a real SMS/push gateway here.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

impl NotificationTransport for LogTransport {
  async fn dispatch(
    &self,
    notification: &DonorNotification,
  ) -> Result<(), TransportError> {
    tracing::info!(
      requisition_id = %notification.requisition_id,
      donor_id = %notification.donor_id,
      "notification dispatched"
    );
    Ok(())
  }
}
