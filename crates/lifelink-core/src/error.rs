//! Error types for `lifelink-core`.
//!
//! Every variant carries a stable machine-readable code (see
//! [`Error::code`]) so callers can branch without parsing messages.

use thiserror::Error;
use uuid::Uuid;

use crate::requisition::RequisitionStatus;

#[derive(Debug, Error)]
pub enum Error {
  #[error("validation failed: {0}")]
  Validation(String),

  #[error("donor not found: {0}")]
  DonorNotFound(Uuid),

  #[error("requisition not found: {0}")]
  RequisitionNotFound(Uuid),

  #[error("cannot transition requisition from {from} to {to}")]
  InvalidTransition {
    from: RequisitionStatus,
    to:   RequisitionStatus,
  },

  #[error("requisition {requisition_id} is {status}, not active")]
  RequisitionNotActive {
    requisition_id: Uuid,
    status:         RequisitionStatus,
  },

  #[error("donor {donor_id} was never notified for requisition {requisition_id}")]
  NotNotified {
    requisition_id: Uuid,
    donor_id:       Uuid,
  },

  #[error("requisition {requisition_id} belongs to a different requester")]
  NotRequester { requisition_id: Uuid },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// The stable error code surfaced to API clients.
  pub fn code(&self) -> &'static str {
    match self {
      Self::Validation(_) => "VALIDATION_FAILED",
      Self::DonorNotFound(_) => "DONOR_NOT_FOUND",
      Self::RequisitionNotFound(_) => "REQUISITION_NOT_FOUND",
      Self::InvalidTransition { .. } => "INVALID_TRANSITION",
      Self::RequisitionNotActive { .. } => "REQUISITION_NOT_ACTIVE",
      Self::NotNotified { .. } => "NOT_NOTIFIED",
      Self::NotRequester { .. } => "NOT_REQUESTER",
      Self::Serialization(_) => "SERIALIZATION_FAILED",
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
