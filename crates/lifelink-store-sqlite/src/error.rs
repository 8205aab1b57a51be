//! Error type for `lifelink-store-sqlite`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] lifelink_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("cannot decode stored value: {0}")]
  Decode(String),

  #[error("donor not found: {0}")]
  DonorNotFound(Uuid),

  #[error("requisition not found: {0}")]
  RequisitionNotFound(Uuid),

  #[error("no notification for donor {donor_id} on requisition {requisition_id}")]
  NotificationNotFound {
    requisition_id: Uuid,
    donor_id:       Uuid,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
