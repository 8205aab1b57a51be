//! Blood requisitions and their lifecycle state machine.
//!
//! A requisition is created once, in `Active` status. The `status` field
//! (plus the derived `willing_donors` counter) is the only part that mutates
//! afterwards, and every mutation funnels through the store's guarded
//! compare-and-set transition. Requisitions are never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, blood::BloodGroup, donor::Location};

// ─── UrgencyLevel ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyLevel {
  Low,
  Medium,
  High,
}

// ─── RequisitionStatus ───────────────────────────────────────────────────────

/// `Active` is the only initial and only non-terminal state. The permitted
/// transitions are `Active -> Fulfilled | Cancelled | Expired`; nothing
/// leaves a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequisitionStatus {
  Active,
  Fulfilled,
  Cancelled,
  Expired,
}

impl RequisitionStatus {
  pub fn is_terminal(self) -> bool {
    !matches!(self, Self::Active)
  }

  pub fn can_transition_to(self, next: Self) -> bool {
    self == Self::Active && next != Self::Active
  }
}

impl std::fmt::Display for RequisitionStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let s = match self {
      Self::Active => "active",
      Self::Fulfilled => "fulfilled",
      Self::Cancelled => "cancelled",
      Self::Expired => "expired",
    };
    f.write_str(s)
  }
}

// ─── FulfillmentPolicy ───────────────────────────────────────────────────────

/// Whether a requisition fulfils itself once enough donors respond WILLING.
/// Under `Auto` the threshold is `units_needed`; under `Manual` only the
/// requester can mark it fulfilled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FulfillmentPolicy {
  #[default]
  Auto,
  Manual,
}

// ─── BloodRequisition ────────────────────────────────────────────────────────

/// An emergency request for blood, owned by its requester.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BloodRequisition {
  pub requisition_id:       Uuid,
  pub requester_id:         Uuid,
  pub patient_name:         String,
  pub hospital_name:        String,
  pub contact_number:       String,
  pub blood_group:          BloodGroup,
  pub units_needed:         u32,
  pub urgency:              UrgencyLevel,
  pub location:             Location,
  pub required_by:          DateTime<Utc>,
  pub allow_contact_reveal: bool,
  pub medical_condition:    Option<String>,
  pub additional_notes:     Option<String>,
  pub status:               RequisitionStatus,
  /// Derived: always the count of WILLING responses for this requisition,
  /// recomputed by the store inside the response-upsert transaction.
  pub willing_donors:       u32,
  pub created_at:           DateTime<Utc>,
}

/// Input to [`crate::store::LifelinkStore::create_requisition`].
/// `requisition_id`, `status`, `willing_donors`, and `created_at` are
/// assigned by the store.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRequisition {
  pub requester_id:         Uuid,
  pub patient_name:         String,
  pub hospital_name:        String,
  pub contact_number:       String,
  pub blood_group:          BloodGroup,
  pub units_needed:         u32,
  pub urgency:              UrgencyLevel,
  #[serde(default)]
  pub location:             Location,
  pub required_by:          DateTime<Utc>,
  #[serde(default)]
  pub allow_contact_reveal: bool,
  pub medical_condition:    Option<String>,
  pub additional_notes:     Option<String>,
}

impl NewRequisition {
  pub fn validate(&self, now: DateTime<Utc>) -> Result<()> {
    if self.patient_name.trim().is_empty() {
      return Err(Error::Validation("patient_name must not be blank".into()));
    }
    if self.hospital_name.trim().is_empty() {
      return Err(Error::Validation("hospital_name must not be blank".into()));
    }
    if self.contact_number.trim().is_empty() {
      return Err(Error::Validation("contact_number must not be blank".into()));
    }
    if self.units_needed < 1 {
      return Err(Error::Validation("units_needed must be at least 1".into()));
    }
    if self.required_by < now {
      return Err(Error::Validation(
        "required_by must not be in the past".into(),
      ));
    }
    Ok(())
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;

  fn requisition_input(required_by: DateTime<Utc>) -> NewRequisition {
    NewRequisition {
      requester_id:         Uuid::new_v4(),
      patient_name:         "A. Patient".into(),
      hospital_name:        "City Hospital".into(),
      contact_number:       "+92-300-0000000".into(),
      blood_group:          BloodGroup::OPos,
      units_needed:         2,
      urgency:              UrgencyLevel::High,
      location:             Location::default(),
      required_by,
      allow_contact_reveal: false,
      medical_condition:    None,
      additional_notes:     None,
    }
  }

  #[test]
  fn active_is_the_only_non_terminal_state() {
    use RequisitionStatus::*;
    assert!(!Active.is_terminal());
    for s in [Fulfilled, Cancelled, Expired] {
      assert!(s.is_terminal());
      for next in [Active, Fulfilled, Cancelled, Expired] {
        assert!(!s.can_transition_to(next), "{s} -> {next} must be rejected");
      }
    }
    for next in [Fulfilled, Cancelled, Expired] {
      assert!(Active.can_transition_to(next));
    }
    assert!(!Active.can_transition_to(Active));
  }

  #[test]
  fn validate_rejects_past_required_by() {
    let now = Utc::now();
    let input = requisition_input(now - Duration::hours(1));
    assert!(matches!(input.validate(now), Err(Error::Validation(_))));
  }

  #[test]
  fn validate_rejects_zero_units() {
    let now = Utc::now();
    let mut input = requisition_input(now + Duration::days(1));
    input.units_needed = 0;
    assert!(matches!(input.validate(now), Err(Error::Validation(_))));
  }

  #[test]
  fn validate_accepts_well_formed_input() {
    let now = Utc::now();
    let input = requisition_input(now + Duration::days(1));
    assert!(input.validate(now).is_ok());
  }
}
