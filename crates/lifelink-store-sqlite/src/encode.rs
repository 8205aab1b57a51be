//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings, calendar dates as ISO
//! `YYYY-MM-DD` (which sorts correctly as text), UUIDs as hyphenated
//! lowercase strings, and closed enums as their fixed string codes.

use chrono::{DateTime, NaiveDate, Utc};
use lifelink_core::{
  blood::BloodGroup,
  donor::{BloodDonation, DonorProfile, Location},
  notification::{DeliveryStatus, DonorNotification, DonorResponse, ResponseValue},
  requisition::{BloodRequisition, RequisitionStatus, UrgencyLevel},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  s.parse().map_err(|_| Error::DateParse(format!("bad date: {s:?}")))
}

// ─── BloodGroup ──────────────────────────────────────────────────────────────

pub fn encode_blood_group(g: BloodGroup) -> &'static str { g.as_str() }

pub fn decode_blood_group(s: &str) -> Result<BloodGroup> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown blood group: {s:?}")))
}

// ─── UrgencyLevel ────────────────────────────────────────────────────────────

pub fn encode_urgency(u: UrgencyLevel) -> &'static str {
  match u {
    UrgencyLevel::Low => "low",
    UrgencyLevel::Medium => "medium",
    UrgencyLevel::High => "high",
  }
}

pub fn decode_urgency(s: &str) -> Result<UrgencyLevel> {
  match s {
    "low" => Ok(UrgencyLevel::Low),
    "medium" => Ok(UrgencyLevel::Medium),
    "high" => Ok(UrgencyLevel::High),
    other => Err(Error::Decode(format!("unknown urgency: {other:?}"))),
  }
}

// ─── RequisitionStatus ───────────────────────────────────────────────────────

pub fn encode_status(s: RequisitionStatus) -> &'static str {
  match s {
    RequisitionStatus::Active => "active",
    RequisitionStatus::Fulfilled => "fulfilled",
    RequisitionStatus::Cancelled => "cancelled",
    RequisitionStatus::Expired => "expired",
  }
}

pub fn decode_status(s: &str) -> Result<RequisitionStatus> {
  match s {
    "active" => Ok(RequisitionStatus::Active),
    "fulfilled" => Ok(RequisitionStatus::Fulfilled),
    "cancelled" => Ok(RequisitionStatus::Cancelled),
    "expired" => Ok(RequisitionStatus::Expired),
    other => Err(Error::Decode(format!("unknown status: {other:?}"))),
  }
}

// ─── DeliveryStatus ──────────────────────────────────────────────────────────

pub fn encode_delivery(s: DeliveryStatus) -> &'static str {
  match s {
    DeliveryStatus::Sent => "sent",
    DeliveryStatus::Delivered => "delivered",
    DeliveryStatus::Read => "read",
  }
}

pub fn decode_delivery(s: &str) -> Result<DeliveryStatus> {
  match s {
    "sent" => Ok(DeliveryStatus::Sent),
    "delivered" => Ok(DeliveryStatus::Delivered),
    "read" => Ok(DeliveryStatus::Read),
    other => Err(Error::Decode(format!("unknown delivery status: {other:?}"))),
  }
}

// ─── ResponseValue ───────────────────────────────────────────────────────────

pub fn encode_response_value(v: ResponseValue) -> &'static str {
  match v {
    ResponseValue::Willing => "willing",
    ResponseValue::NotAvailable => "not_available",
    ResponseValue::NotSuitable => "not_suitable",
  }
}

pub fn decode_response_value(s: &str) -> Result<ResponseValue> {
  match s {
    "willing" => Ok(ResponseValue::Willing),
    "not_available" => Ok(ResponseValue::NotAvailable),
    "not_suitable" => Ok(ResponseValue::NotSuitable),
    other => Err(Error::Decode(format!("unknown response value: {other:?}"))),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `donors` row.
pub struct RawDonor {
  pub donor_id:           String,
  pub display_name:       String,
  pub blood_group:        Option<String>,
  pub is_blood_donor:     bool,
  pub last_donation_date: Option<String>,
  pub city:               Option<String>,
  pub state:              Option<String>,
  pub show_contact:       bool,
  pub contact_number:     Option<String>,
  pub created_at:         String,
}

impl RawDonor {
  pub fn into_profile(self) -> Result<DonorProfile> {
    Ok(DonorProfile {
      donor_id:           decode_uuid(&self.donor_id)?,
      display_name:       self.display_name,
      blood_group:        self
        .blood_group
        .as_deref()
        .map(decode_blood_group)
        .transpose()?,
      is_blood_donor:     self.is_blood_donor,
      last_donation_date: self
        .last_donation_date
        .as_deref()
        .map(decode_date)
        .transpose()?,
      location:           Location { city: self.city, state: self.state },
      show_contact:       self.show_contact,
      contact_number:     self.contact_number,
      created_at:         decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `donations` row.
pub struct RawDonation {
  pub donation_id: String,
  pub donor_id:    String,
  pub donated_on:  String,
  pub location:    Option<String>,
  pub units:       u32,
  pub notes:       Option<String>,
  pub recorded_at: String,
}

impl RawDonation {
  pub fn into_donation(self) -> Result<BloodDonation> {
    Ok(BloodDonation {
      donation_id: decode_uuid(&self.donation_id)?,
      donor_id:    decode_uuid(&self.donor_id)?,
      donated_on:  decode_date(&self.donated_on)?,
      location:    self.location,
      units:       self.units,
      notes:       self.notes,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}

/// Raw values read directly from a `requisitions` row.
pub struct RawRequisition {
  pub requisition_id:       String,
  pub requester_id:         String,
  pub patient_name:         String,
  pub hospital_name:        String,
  pub contact_number:       String,
  pub blood_group:          String,
  pub units_needed:         u32,
  pub urgency:              String,
  pub city:                 Option<String>,
  pub state:                Option<String>,
  pub required_by:          String,
  pub allow_contact_reveal: bool,
  pub medical_condition:    Option<String>,
  pub additional_notes:     Option<String>,
  pub status:               String,
  pub willing_donors:       u32,
  pub created_at:           String,
}

impl RawRequisition {
  pub fn into_requisition(self) -> Result<BloodRequisition> {
    Ok(BloodRequisition {
      requisition_id:       decode_uuid(&self.requisition_id)?,
      requester_id:         decode_uuid(&self.requester_id)?,
      patient_name:         self.patient_name,
      hospital_name:        self.hospital_name,
      contact_number:       self.contact_number,
      blood_group:          decode_blood_group(&self.blood_group)?,
      units_needed:         self.units_needed,
      urgency:              decode_urgency(&self.urgency)?,
      location:             Location { city: self.city, state: self.state },
      required_by:          decode_dt(&self.required_by)?,
      allow_contact_reveal: self.allow_contact_reveal,
      medical_condition:    self.medical_condition,
      additional_notes:     self.additional_notes,
      status:               decode_status(&self.status)?,
      willing_donors:       self.willing_donors,
      created_at:           decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `notifications` row.
pub struct RawNotification {
  pub notification_id: String,
  pub requisition_id:  String,
  pub donor_id:        String,
  pub message:         String,
  pub status:          String,
  pub dispatch_failed: bool,
  pub sent_at:         String,
  pub delivered_at:    Option<String>,
  pub read_at:         Option<String>,
}

impl RawNotification {
  pub fn into_notification(self) -> Result<DonorNotification> {
    Ok(DonorNotification {
      notification_id: decode_uuid(&self.notification_id)?,
      requisition_id:  decode_uuid(&self.requisition_id)?,
      donor_id:        decode_uuid(&self.donor_id)?,
      message:         self.message,
      status:          decode_delivery(&self.status)?,
      dispatch_failed: self.dispatch_failed,
      sent_at:         decode_dt(&self.sent_at)?,
      delivered_at:    self.delivered_at.as_deref().map(decode_dt).transpose()?,
      read_at:         self.read_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// Raw values read directly from a `responses` row.
pub struct RawResponse {
  pub response_id:    String,
  pub requisition_id: String,
  pub donor_id:       String,
  pub value:          String,
  pub message:        Option<String>,
  pub responded_at:   String,
}

impl RawResponse {
  pub fn into_response(self) -> Result<DonorResponse> {
    Ok(DonorResponse {
      response_id:    decode_uuid(&self.response_id)?,
      requisition_id: decode_uuid(&self.requisition_id)?,
      donor_id:       decode_uuid(&self.donor_id)?,
      value:          decode_response_value(&self.value)?,
      message:        self.message,
      responded_at:   decode_dt(&self.responded_at)?,
    })
  }
}
