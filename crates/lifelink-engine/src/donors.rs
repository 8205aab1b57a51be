//! Donor-facing operations: registration, profile edits, the donation
//! ledger, and directory search.

use chrono::Utc;
use lifelink_core::{
  blood::BloodGroup,
  directory,
  donor::{
    BloodDonation, DonorCandidate, DonorProfile, DonorUpdate, NewDonation,
    NewDonor,
  },
  eligibility::{self, Eligibility},
  store::{DonorFilter, LifelinkStore},
};
use uuid::Uuid;

use crate::{Engine, Error, Result, transport::NotificationTransport};

impl<S, T> Engine<S, T>
where
  S: LifelinkStore,
  T: NotificationTransport,
{
  pub async fn register_donor(&self, input: NewDonor) -> Result<DonorProfile> {
    input.validate()?;
    self
      .store
      .register_donor(input)
      .await
      .map_err(Error::from_store)
  }

  pub async fn get_donor(&self, id: Uuid) -> Result<DonorProfile> {
    self
      .store
      .get_donor(id)
      .await
      .map_err(Error::from_store)?
      .ok_or_else(|| lifelink_core::Error::DonorNotFound(id).into())
  }

  pub async fn update_donor(
    &self,
    id: Uuid,
    update: DonorUpdate,
  ) -> Result<DonorProfile> {
    // Surface a typed not-found before handing off to the backend.
    self.get_donor(id).await?;
    self
      .store
      .update_donor(id, update)
      .await
      .map_err(Error::from_store)
  }

  /// Append a self-reported donation. The store keeps the profile's
  /// `last_donation_date` in lockstep with the ledger.
  pub async fn record_donation(
    &self,
    donor_id: Uuid,
    input: NewDonation,
  ) -> Result<BloodDonation> {
    input.validate()?;
    self.get_donor(donor_id).await?;
    self
      .store
      .record_donation(donor_id, input)
      .await
      .map_err(Error::from_store)
  }

  pub async fn donations_for(&self, donor_id: Uuid) -> Result<Vec<BloodDonation>> {
    self.get_donor(donor_id).await?;
    self
      .store
      .donations_for(donor_id)
      .await
      .map_err(Error::from_store)
  }

  /// The donor's current cooldown verdict.
  pub async fn donor_eligibility(&self, donor_id: Uuid) -> Result<Eligibility> {
    let donor = self.get_donor(donor_id).await?;
    Ok(eligibility::evaluate(
      donor.last_donation_date,
      Utc::now(),
      self.config.cooldown,
    ))
  }

  /// Directory search for a required blood group: compatible, opted-in
  /// donors in directory order, almost-eligible ones flagged by their
  /// attached eligibility. Used for pre-submission previews.
  pub async fn search_donors(
    &self,
    required_group: BloodGroup,
    location: Option<String>,
    limit: usize,
  ) -> Result<Vec<DonorCandidate>> {
    let filter = DonorFilter {
      groups: required_group.compatible_donors().to_vec(),
      location,
    };
    let donors = self
      .store
      .find_donors(&filter)
      .await
      .map_err(Error::from_store)?;

    Ok(directory::rank_candidates(
      donors,
      Utc::now(),
      self.config.cooldown,
      limit,
    ))
  }
}
