//! Donor profiles and the append-only donation ledger.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  blood::BloodGroup,
  eligibility::Eligibility,
};

// ─── Location ────────────────────────────────────────────────────────────────

/// A city/state pair. Either part may be absent; absence means "unknown",
/// and an unknown location never matches a location filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
  pub city:  Option<String>,
  pub state: Option<String>,
}

// ─── DonorProfile ────────────────────────────────────────────────────────────

/// A person who may donate blood. Profiles are never deleted; a donor who
/// withdraws is deactivated via `is_blood_donor = false`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonorProfile {
  pub donor_id:           Uuid,
  pub display_name:       String,
  /// `None` while the profile is incomplete; such donors are never matched.
  pub blood_group:        Option<BloodGroup>,
  pub is_blood_donor:     bool,
  /// Derived: always `max(donated_on)` over the donor's donation ledger,
  /// recomputed by the store on every insert.
  pub last_donation_date: Option<NaiveDate>,
  pub location:           Location,
  pub show_contact:       bool,
  pub contact_number:     Option<String>,
  pub created_at:         DateTime<Utc>,
}

/// Input to [`crate::store::LifelinkStore::register_donor`].
/// `donor_id` and `created_at` are assigned by the store.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDonor {
  pub display_name:   String,
  pub blood_group:    Option<BloodGroup>,
  #[serde(default = "default_true")]
  pub is_blood_donor: bool,
  #[serde(default)]
  pub location:       Location,
  #[serde(default)]
  pub show_contact:   bool,
  pub contact_number: Option<String>,
}

fn default_true() -> bool {
  true
}

impl NewDonor {
  pub fn validate(&self) -> Result<()> {
    if self.display_name.trim().is_empty() {
      return Err(Error::Validation("display_name must not be blank".into()));
    }
    Ok(())
  }
}

/// A profile edit. Only the donor mutates their profile, and only through
/// this type; every field is optional so a PATCH touches what it names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DonorUpdate {
  pub display_name:   Option<String>,
  pub blood_group:    Option<BloodGroup>,
  pub is_blood_donor: Option<bool>,
  pub location:       Option<Location>,
  pub show_contact:   Option<bool>,
  pub contact_number: Option<String>,
}

// ─── BloodDonation ───────────────────────────────────────────────────────────

/// One entry in a donor's donation ledger. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BloodDonation {
  pub donation_id: Uuid,
  pub donor_id:    Uuid,
  pub donated_on:  NaiveDate,
  pub location:    Option<String>,
  pub units:       u32,
  pub notes:       Option<String>,
  /// Server-assigned; distinct from `donated_on`, which is self-reported.
  pub recorded_at: DateTime<Utc>,
}

/// Input to [`crate::store::LifelinkStore::record_donation`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewDonation {
  pub donated_on: NaiveDate,
  pub location:   Option<String>,
  pub units:      u32,
  pub notes:      Option<String>,
}

impl NewDonation {
  pub fn validate(&self) -> Result<()> {
    if self.units < 1 {
      return Err(Error::Validation("units must be at least 1".into()));
    }
    Ok(())
  }
}

// ─── DonorCandidate ──────────────────────────────────────────────────────────

/// A directory hit: a compatible donor bundled with their eligibility
/// verdict, so callers can present almost-eligible donors distinctly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonorCandidate {
  pub profile:     DonorProfile,
  pub eligibility: Eligibility,
}

// ─── Tests ───────────────────────────────────────────────────────────────────
