//! The expiry sweeper — a periodic background pass that moves overdue
//! Active requisitions to Expired.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use lifelink_core::{
  requisition::RequisitionStatus,
  store::{LifelinkStore, Transition},
};
use tokio::task::JoinHandle;

use crate::{Engine, Error, Result, transport::NotificationTransport};

impl<S, T> Engine<S, T>
where
  S: LifelinkStore + 'static,
  T: NotificationTransport,
{
  /// One sweep: expire every Active requisition whose `required_by` has
  /// passed. Runs the same guarded transition as response handling, so a
  /// fulfilment landing in the same instant simply wins or loses the race —
  /// both outcomes are valid terminal states.
  pub async fn sweep_once(&self, now: DateTime<Utc>) -> Result<usize> {
    let overdue = self
      .store
      .expired_active(now)
      .await
      .map_err(Error::from_store)?;

    let mut expired = 0;
    for requisition_id in overdue {
      match self
        .store
        .transition_requisition(requisition_id, RequisitionStatus::Expired)
        .await
        .map_err(Error::from_store)?
      {
        Transition::Applied(_) => {
          tracing::info!(%requisition_id, "requisition expired");
          expired += 1;
        }
        Transition::Conflict(status) => {
          tracing::debug!(%requisition_id, %status, "expiry lost the race");
        }
      }
    }

    if expired > 0 {
      tracing::info!(expired, "expiry sweep complete");
    }
    Ok(expired)
  }

  /// Run [`sweep_once`](Self::sweep_once) forever on the configured
  /// interval. The handle is detached by callers that never shut down.
  pub fn spawn_sweeper(self: Arc<Self>) -> JoinHandle<()> {
    let engine = self;
    tokio::spawn(async move {
      let mut ticker = tokio::time::interval(engine.config.sweep_interval);
      ticker
        .set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
      loop {
        ticker.tick().await;
        if let Err(error) = engine.sweep_once(Utc::now()).await {
          tracing::warn!(%error, "expiry sweep failed");
        }
      }
    })
  }
}
