//! Notification and response records — the join entities between a
//! requisition and its candidate donors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── DeliveryStatus ──────────────────────────────────────────────────────────

/// Delivery progress of one notification. Advancement is strictly monotonic
/// (`Sent -> Delivered -> Read`); a backward or repeated advancement is a
/// no-op, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
  Sent,
  Delivered,
  Read,
}

impl DeliveryStatus {
  pub fn rank(self) -> u8 {
    match self {
      Self::Sent => 0,
      Self::Delivered => 1,
      Self::Read => 2,
    }
  }

  /// A skip forward (`Sent -> Read`) is permitted; going backward is not.
  pub fn can_advance_to(self, next: Self) -> bool {
    next.rank() > self.rank()
  }
}

// ─── DonorNotification ───────────────────────────────────────────────────────

/// One notification row per `(requisition, donor)` pair — the pair is UNIQUE
/// in the store, which is what makes fan-out idempotent. Immutable except
/// for delivery-status advancement and the dispatch-failure flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonorNotification {
  pub notification_id: Uuid,
  pub requisition_id:  Uuid,
  pub donor_id:        Uuid,
  pub message:         String,
  pub status:          DeliveryStatus,
  /// Set when every transport attempt failed; such rows stay at `Sent` and
  /// are picked up by the retry pass.
  pub dispatch_failed: bool,
  pub sent_at:         DateTime<Utc>,
  pub delivered_at:    Option<DateTime<Utc>>,
  pub read_at:         Option<DateTime<Utc>>,
}

// ─── DonorResponse ───────────────────────────────────────────────────────────

/// A donor's answer to a requisition they were notified about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseValue {
  Willing,
  NotAvailable,
  NotSuitable,
}

/// At most one response per `(requisition, donor)` pair. A later response
/// from the same donor replaces the earlier one; the original `response_id`
/// is retained across replacements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonorResponse {
  pub response_id:    Uuid,
  pub requisition_id: Uuid,
  pub donor_id:       Uuid,
  pub value:          ResponseValue,
  pub message:        Option<String>,
  pub responded_at:   DateTime<Utc>,
}

// ─── Tests ───────────────────────────────────────────────────────────────────
