//! Response aggregation — recording donor answers and driving
//! auto-fulfilment.

use lifelink_core::{
  notification::{DeliveryStatus, DonorResponse, ResponseValue},
  requisition::{FulfillmentPolicy, RequisitionStatus},
  store::{LifelinkStore, Transition},
};
use serde::Serialize;
use uuid::Uuid;

use crate::{Engine, Error, Result, transport::NotificationTransport};

// ─── ResponseAck ─────────────────────────────────────────────────────────────

/// What a donor (or the UI on their behalf) gets back after responding.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseAck {
  pub response:              DonorResponse,
  pub willing_donors:        u32,
  pub requisition_status:    RequisitionStatus,
  /// True only for the single caller whose response won the
  /// ACTIVE→FULFILLED compare-and-set.
  pub triggered_fulfillment: bool,
}

// ─── Aggregation ─────────────────────────────────────────────────────────────

impl<S, T> Engine<S, T>
where
  S: LifelinkStore,
  T: NotificationTransport,
{
  /// Record one donor's answer to a requisition they were notified about.
  ///
  /// A repeat answer from the same donor replaces the earlier one. Answers
  /// against CANCELLED or EXPIRED requisitions are rejected; answers
  /// against FULFILLED ones are still recorded (the donor already acted on
  /// the notification) but never re-trigger fulfilment logic.
  pub async fn record_response(
    &self,
    requisition_id: Uuid,
    donor_id: Uuid,
    value: ResponseValue,
    message: Option<String>,
  ) -> Result<ResponseAck> {
    let requisition = self
      .store
      .get_requisition(requisition_id)
      .await
      .map_err(Error::from_store)?
      .ok_or(lifelink_core::Error::RequisitionNotFound(requisition_id))?;

    match requisition.status {
      RequisitionStatus::Active | RequisitionStatus::Fulfilled => {}
      status @ (RequisitionStatus::Cancelled | RequisitionStatus::Expired) => {
        return Err(
          lifelink_core::Error::RequisitionNotActive { requisition_id, status }
            .into(),
        );
      }
    }

    // No unsolicited responses: the donor must hold a notification row.
    if self
      .store
      .get_notification(requisition_id, donor_id)
      .await
      .map_err(Error::from_store)?
      .is_none()
    {
      return Err(
        lifelink_core::Error::NotNotified { requisition_id, donor_id }.into(),
      );
    }

    let (response, willing_donors) = self
      .store
      .upsert_response(requisition_id, donor_id, value, message)
      .await
      .map_err(Error::from_store)?;

    // Responding proves the notification reached the donor.
    self
      .store
      .advance_notification(requisition_id, donor_id, DeliveryStatus::Read)
      .await
      .map_err(Error::from_store)?;

    let mut requisition_status = requisition.status;
    let mut triggered_fulfillment = false;

    let auto = self.config.fulfillment == FulfillmentPolicy::Auto;
    if auto
      && value == ResponseValue::Willing
      && requisition.status == RequisitionStatus::Active
      && willing_donors >= requisition.units_needed
    {
      match self
        .store
        .transition_requisition(requisition_id, RequisitionStatus::Fulfilled)
        .await
        .map_err(Error::from_store)?
      {
        Transition::Applied(updated) => {
          tracing::info!(%requisition_id, willing_donors,
            "requisition fulfilled by donor responses");
          requisition_status = updated.status;
          triggered_fulfillment = true;
        }
        // Another response (or the sweeper) got there first — a normal
        // outcome, not an error.
        Transition::Conflict(observed) => {
          requisition_status = observed;
        }
      }
    }

    Ok(ResponseAck {
      response,
      willing_donors,
      requisition_status,
      triggered_fulfillment,
    })
  }
}
