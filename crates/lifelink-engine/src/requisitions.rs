//! Requisition lifecycle operations: create, cancel, manual fulfilment,
//! and the requester/donor-facing listings.

use chrono::Utc;
use lifelink_core::{
  requisition::{BloodRequisition, NewRequisition, RequisitionStatus},
  store::{LifelinkStore, Page, Transition},
};
use uuid::Uuid;

use crate::{Engine, Error, Result, transport::NotificationTransport};

impl<S, T> Engine<S, T>
where
  S: LifelinkStore,
  T: NotificationTransport,
{
  /// Validate and persist a new requisition. It starts Active with a zero
  /// willing-donor count; matching and fan-out are separate steps.
  pub async fn create_requisition(
    &self,
    input: NewRequisition,
  ) -> Result<BloodRequisition> {
    input.validate(Utc::now())?;
    self
      .store
      .create_requisition(input)
      .await
      .map_err(Error::from_store)
  }

  pub async fn get_requisition(&self, id: Uuid) -> Result<BloodRequisition> {
    self
      .store
      .get_requisition(id)
      .await
      .map_err(Error::from_store)?
      .ok_or_else(|| lifelink_core::Error::RequisitionNotFound(id).into())
  }

  /// All requisitions created by `requester_id`, any status, newest first.
  pub async fn my_requisitions(
    &self,
    requester_id: Uuid,
    page: Page,
  ) -> Result<Vec<BloodRequisition>> {
    self
      .store
      .requisitions_by_requester(requester_id, page)
      .await
      .map_err(Error::from_store)
  }

  /// Active requisitions this donor could serve: their blood group donates
  /// to the required group, filtered to their area. A donor without a
  /// recorded blood group cannot be matched and sees an empty list.
  pub async fn discover_requisitions(
    &self,
    donor_id: Uuid,
    page: Page,
  ) -> Result<Vec<BloodRequisition>> {
    let donor = self
      .store
      .get_donor(donor_id)
      .await
      .map_err(Error::from_store)?
      .ok_or(lifelink_core::Error::DonorNotFound(donor_id))?;

    let Some(group) = donor.blood_group else {
      return Ok(Vec::new());
    };

    let location = donor
      .location
      .city
      .clone()
      .or_else(|| donor.location.state.clone());

    self
      .store
      .discover_active(group.can_donate_to().to_vec(), location, page)
      .await
      .map_err(Error::from_store)
  }

  /// Requester-only cancellation, any time before a terminal state.
  pub async fn cancel_requisition(
    &self,
    id: Uuid,
    requester_id: Uuid,
  ) -> Result<BloodRequisition> {
    self
      .transition_as_requester(id, requester_id, RequisitionStatus::Cancelled)
      .await
  }

  /// Requester-only manual fulfilment (also reachable automatically via
  /// response aggregation when the policy allows).
  pub async fn fulfil_requisition(
    &self,
    id: Uuid,
    requester_id: Uuid,
  ) -> Result<BloodRequisition> {
    self
      .transition_as_requester(id, requester_id, RequisitionStatus::Fulfilled)
      .await
  }

  /// Ownership check plus the guarded transition. A lost compare-and-set
  /// here is a conflict the caller must see, unlike the system-initiated
  /// transitions where losing is routine.
  async fn transition_as_requester(
    &self,
    id: Uuid,
    requester_id: Uuid,
    to: RequisitionStatus,
  ) -> Result<BloodRequisition> {
    let requisition = self.get_requisition(id).await?;
    if requisition.requester_id != requester_id {
      return Err(
        lifelink_core::Error::NotRequester { requisition_id: id }.into(),
      );
    }

    match self
      .store
      .transition_requisition(id, to)
      .await
      .map_err(Error::from_store)?
    {
      Transition::Applied(updated) => {
        tracing::info!(requisition_id = %id, status = %to,
          "requisition transitioned by requester");
        Ok(updated)
      }
      Transition::Conflict(from) => {
        Err(lifelink_core::Error::InvalidTransition { from, to }.into())
      }
    }
  }
}
