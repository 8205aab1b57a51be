//! Notification fan-out with bounded concurrency.
//!
//! Each candidate gets a conditional insert (the `(requisition, donor)`
//! uniqueness constraint makes repeat fan-outs no-ops) followed by a
//! transport dispatch with bounded retries. Dispatch failures are recorded
//! per donor and never abort the batch.

use std::sync::Arc;

use lifelink_core::{
  notification::DonorNotification,
  requisition::{BloodRequisition, RequisitionStatus},
  store::LifelinkStore,
};
use serde::Serialize;
use tokio::{sync::Semaphore, task::JoinSet};
use uuid::Uuid;

use crate::{
  Engine, Error, MatchOutcome, Result, transport::NotificationTransport,
};

// ─── FanOutReport ────────────────────────────────────────────────────────────

/// Tally of one fan-out pass. `matched == 0` is the reportable
/// no-eligible-donors outcome; `failed` rows stay at SENT with the
/// retry-eligible flag set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FanOutReport {
  pub matched:  usize,
  pub notified: usize,
  pub skipped:  usize,
  pub failed:   usize,
}

enum DonorOutcome {
  Notified,
  Skipped,
  Failed,
}

// ─── Fan-out ─────────────────────────────────────────────────────────────────

impl<S, T> Engine<S, T>
where
  S: LifelinkStore + 'static,
  T: NotificationTransport,
{
  /// Notify every matched donor for an Active requisition. Safe to call
  /// repeatedly (a double-click, or an explicit rematch after profile
  /// edits): already-notified pairs are skipped, new donors are picked up.
  pub async fn notify_all(&self, requisition_id: Uuid) -> Result<FanOutReport> {
    let requisition = self
      .store
      .get_requisition(requisition_id)
      .await
      .map_err(Error::from_store)?
      .ok_or(lifelink_core::Error::RequisitionNotFound(requisition_id))?;

    if requisition.status != RequisitionStatus::Active {
      return Err(
        lifelink_core::Error::RequisitionNotActive {
          requisition_id,
          status: requisition.status,
        }
        .into(),
      );
    }

    let candidates = match self.match_donors(&requisition).await? {
      MatchOutcome::NoEligibleDonors => {
        tracing::info!(%requisition_id, "no eligible donors to notify");
        return Ok(FanOutReport::default());
      }
      MatchOutcome::Candidates(c) => c,
    };

    let message = compose_message(&requisition);
    let semaphore = Arc::new(Semaphore::new(self.config.fan_out_concurrency));
    let mut tasks = JoinSet::new();

    let matched = candidates.len();
    for candidate in candidates {
      let store     = Arc::clone(&self.store);
      let transport = Arc::clone(&self.transport);
      let semaphore = Arc::clone(&semaphore);
      let message   = message.clone();
      let donor_id  = candidate.profile.donor_id;
      let attempts  = self.config.dispatch_attempts;
      let backoff   = self.config.dispatch_backoff;

      tasks.spawn(async move {
        // Semaphore holders include the insert, so the store sees the same
        // bounded pressure as the transport. The semaphore is never closed.
        let Ok(_permit) = semaphore.acquire_owned().await else {
          return DonorOutcome::Failed;
        };

        let inserted = match store
          .insert_notification(requisition_id, donor_id, message)
          .await
        {
          Ok(Some(notification)) => notification,
          Ok(None) => return DonorOutcome::Skipped,
          Err(error) => {
            tracing::warn!(%requisition_id, %donor_id, %error,
              "failed to persist notification");
            return DonorOutcome::Failed;
          }
        };

        // The row is durably SENT; only now does the transport get it.
        if dispatch_with_retry(&*transport, &inserted, attempts, backoff).await
        {
          DonorOutcome::Notified
        } else {
          if let Err(error) = store
            .set_dispatch_failed(inserted.notification_id, true)
            .await
          {
            tracing::warn!(%requisition_id, %donor_id, %error,
              "failed to flag notification for retry");
          }
          DonorOutcome::Failed
        }
      });
    }

    let mut report = FanOutReport { matched, ..FanOutReport::default() };
    while let Some(joined) = tasks.join_next().await {
      match joined {
        Ok(DonorOutcome::Notified) => report.notified += 1,
        Ok(DonorOutcome::Skipped) => report.skipped += 1,
        Ok(DonorOutcome::Failed) => report.failed += 1,
        Err(error) => {
          tracing::error!(%requisition_id, %error, "fan-out task panicked");
          report.failed += 1;
        }
      }
    }

    tracing::info!(
      %requisition_id,
      matched = report.matched,
      notified = report.notified,
      skipped = report.skipped,
      failed = report.failed,
      "fan-out complete"
    );
    Ok(report)
  }

  /// Re-dispatch notifications whose transport attempts were exhausted.
  /// Successful rows drop the retry-eligible flag; the rest keep it for the
  /// next pass.
  pub async fn retry_failed(&self, requisition_id: Uuid) -> Result<FanOutReport> {
    let flagged = self
      .store
      .failed_notifications(requisition_id)
      .await
      .map_err(Error::from_store)?;

    let mut report = FanOutReport {
      matched: flagged.len(),
      ..FanOutReport::default()
    };

    for notification in flagged {
      let ok = dispatch_with_retry(
        &*self.transport,
        &notification,
        self.config.dispatch_attempts,
        self.config.dispatch_backoff,
      )
      .await;

      if ok {
        self
          .store
          .set_dispatch_failed(notification.notification_id, false)
          .await
          .map_err(Error::from_store)?;
        report.notified += 1;
      } else {
        report.failed += 1;
      }
    }

    Ok(report)
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// The human-readable notification text.
fn compose_message(requisition: &BloodRequisition) -> String {
  let place = requisition
    .location
    .city
    .as_deref()
    .or(requisition.location.state.as_deref())
    .unwrap_or("your area");
  format!(
    "{urgency:?} urgency: {units} unit(s) of {group} needed at \
     {hospital}, {place}.",
    urgency = requisition.urgency,
    units = requisition.units_needed,
    group = requisition.blood_group,
    hospital = requisition.hospital_name,
  )
}

/// Dispatch with doubling backoff. Returns whether any attempt succeeded.
async fn dispatch_with_retry<T>(
  transport: &T,
  notification: &DonorNotification,
  attempts: u32,
  initial_backoff: std::time::Duration,
) -> bool
where
  T: NotificationTransport,
{
  let mut backoff = initial_backoff;
  for attempt in 1..=attempts.max(1) {
    match transport.dispatch(notification).await {
      Ok(()) => return true,
      Err(error) => {
        tracing::warn!(
          requisition_id = %notification.requisition_id,
          donor_id = %notification.donor_id,
          attempt,
          %error,
          "transport dispatch failed"
        );
        if attempt < attempts {
          tokio::time::sleep(backoff).await;
          backoff *= 2;
        }
      }
    }
  }
  false
}
