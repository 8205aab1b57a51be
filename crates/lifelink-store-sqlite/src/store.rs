//! [`SqliteStore`] — the SQLite implementation of [`LifelinkStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use lifelink_core::{
  blood::BloodGroup,
  donor::{BloodDonation, DonorProfile, DonorUpdate, NewDonation, NewDonor},
  notification::{
    DeliveryStatus, DonorNotification, DonorResponse, ResponseValue,
  },
  requisition::{BloodRequisition, NewRequisition, RequisitionStatus},
  store::{DonorFilter, LifelinkStore, Page, Transition},
};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    RawDonation, RawDonor, RawNotification, RawRequisition, RawResponse,
    encode_blood_group, encode_date, encode_delivery, encode_dt,
    encode_response_value, encode_status, encode_urgency, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Column lists ────────────────────────────────────────────────────────────

const DONOR_COLS: &str = "donor_id, display_name, blood_group, \
   is_blood_donor, last_donation_date, city, state, show_contact, \
   contact_number, created_at";

const DONATION_COLS: &str =
  "donation_id, donor_id, donated_on, location, units, notes, recorded_at";

const REQ_COLS: &str = "requisition_id, requester_id, patient_name, \
   hospital_name, contact_number, blood_group, units_needed, urgency, city, \
   state, required_by, allow_contact_reveal, medical_condition, \
   additional_notes, status, willing_donors, created_at";

const NOTIF_COLS: &str = "notification_id, requisition_id, donor_id, \
   message, status, dispatch_failed, sent_at, delivered_at, read_at";

const RESP_COLS: &str =
  "response_id, requisition_id, donor_id, value, message, responded_at";

// ─── Row readers ─────────────────────────────────────────────────────────────

fn read_donor(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawDonor> {
  Ok(RawDonor {
    donor_id:           row.get(0)?,
    display_name:       row.get(1)?,
    blood_group:        row.get(2)?,
    is_blood_donor:     row.get(3)?,
    last_donation_date: row.get(4)?,
    city:               row.get(5)?,
    state:              row.get(6)?,
    show_contact:       row.get(7)?,
    contact_number:     row.get(8)?,
    created_at:         row.get(9)?,
  })
}

fn read_donation(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawDonation> {
  Ok(RawDonation {
    donation_id: row.get(0)?,
    donor_id:    row.get(1)?,
    donated_on:  row.get(2)?,
    location:    row.get(3)?,
    units:       row.get(4)?,
    notes:       row.get(5)?,
    recorded_at: row.get(6)?,
  })
}

fn read_requisition(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRequisition> {
  Ok(RawRequisition {
    requisition_id:       row.get(0)?,
    requester_id:         row.get(1)?,
    patient_name:         row.get(2)?,
    hospital_name:        row.get(3)?,
    contact_number:       row.get(4)?,
    blood_group:          row.get(5)?,
    units_needed:         row.get(6)?,
    urgency:              row.get(7)?,
    city:                 row.get(8)?,
    state:                row.get(9)?,
    required_by:          row.get(10)?,
    allow_contact_reveal: row.get(11)?,
    medical_condition:    row.get(12)?,
    additional_notes:     row.get(13)?,
    status:               row.get(14)?,
    willing_donors:       row.get(15)?,
    created_at:           row.get(16)?,
  })
}

fn read_notification(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawNotification> {
  Ok(RawNotification {
    notification_id: row.get(0)?,
    requisition_id:  row.get(1)?,
    donor_id:        row.get(2)?,
    message:         row.get(3)?,
    status:          row.get(4)?,
    dispatch_failed: row.get(5)?,
    sent_at:         row.get(6)?,
    delivered_at:    row.get(7)?,
    read_at:         row.get(8)?,
  })
}

fn read_response(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawResponse> {
  Ok(RawResponse {
    response_id:    row.get(0)?,
    requisition_id: row.get(1)?,
    donor_id:       row.get(2)?,
    value:          row.get(3)?,
    message:        row.get(4)?,
    responded_at:   row.get(5)?,
  })
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A LifeLink store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── LifelinkStore impl ──────────────────────────────────────────────────────

impl LifelinkStore for SqliteStore {
  type Error = Error;

  // ── Donors ────────────────────────────────────────────────────────────────

  async fn register_donor(&self, input: NewDonor) -> Result<DonorProfile> {
    let profile = DonorProfile {
      donor_id:           Uuid::new_v4(),
      display_name:       input.display_name,
      blood_group:        input.blood_group,
      is_blood_donor:     input.is_blood_donor,
      last_donation_date: None,
      location:           input.location,
      show_contact:       input.show_contact,
      contact_number:     input.contact_number,
      created_at:         Utc::now(),
    };

    let id_str     = encode_uuid(profile.donor_id);
    let name       = profile.display_name.clone();
    let group_str  = profile.blood_group.map(encode_blood_group);
    let is_donor   = profile.is_blood_donor;
    let city       = profile.location.city.clone();
    let state      = profile.location.state.clone();
    let show       = profile.show_contact;
    let contact    = profile.contact_number.clone();
    let at_str     = encode_dt(profile.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO donors (
             donor_id, display_name, blood_group, is_blood_donor,
             last_donation_date, city, state, show_contact, contact_number,
             created_at
           ) VALUES (?1, ?2, ?3, ?4, NULL, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            id_str, name, group_str, is_donor, city, state, show, contact,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(profile)
  }

  async fn get_donor(&self, id: Uuid) -> Result<Option<DonorProfile>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawDonor> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {DONOR_COLS} FROM donors WHERE donor_id = ?1"),
              rusqlite::params![id_str],
              read_donor,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDonor::into_profile).transpose()
  }

  async fn update_donor(
    &self,
    id: Uuid,
    update: DonorUpdate,
  ) -> Result<DonorProfile> {
    let current = self.get_donor(id).await?.ok_or(Error::DonorNotFound(id))?;

    let merged = DonorProfile {
      donor_id:           current.donor_id,
      display_name:       update.display_name.unwrap_or(current.display_name),
      blood_group:        update.blood_group.or(current.blood_group),
      is_blood_donor:     update.is_blood_donor.unwrap_or(current.is_blood_donor),
      last_donation_date: current.last_donation_date,
      location:           update.location.unwrap_or(current.location),
      show_contact:       update.show_contact.unwrap_or(current.show_contact),
      contact_number:     update.contact_number.or(current.contact_number),
      created_at:         current.created_at,
    };

    let id_str    = encode_uuid(id);
    let name      = merged.display_name.clone();
    let group_str = merged.blood_group.map(encode_blood_group);
    let is_donor  = merged.is_blood_donor;
    let city      = merged.location.city.clone();
    let state     = merged.location.state.clone();
    let show      = merged.show_contact;
    let contact   = merged.contact_number.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE donors SET
             display_name = ?2, blood_group = ?3, is_blood_donor = ?4,
             city = ?5, state = ?6, show_contact = ?7, contact_number = ?8
           WHERE donor_id = ?1",
          rusqlite::params![
            id_str, name, group_str, is_donor, city, state, show, contact,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(merged)
  }

  async fn record_donation(
    &self,
    donor_id: Uuid,
    input: NewDonation,
  ) -> Result<BloodDonation> {
    if self.get_donor(donor_id).await?.is_none() {
      return Err(Error::DonorNotFound(donor_id));
    }

    let donation = BloodDonation {
      donation_id: Uuid::new_v4(),
      donor_id,
      donated_on:  input.donated_on,
      location:    input.location,
      units:       input.units,
      notes:       input.notes,
      recorded_at: Utc::now(),
    };

    let donation_id_str = encode_uuid(donation.donation_id);
    let donor_id_str    = encode_uuid(donor_id);
    let donated_on_str  = encode_date(donation.donated_on);
    let location        = donation.location.clone();
    let units           = donation.units;
    let notes           = donation.notes.clone();
    let recorded_at_str = encode_dt(donation.recorded_at);

    // The insert and the derived last_donation_date recompute commit
    // together, so the donor row can never disagree with the ledger.
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO donations (
             donation_id, donor_id, donated_on, location, units, notes,
             recorded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            donation_id_str, donor_id_str, donated_on_str, location, units,
            notes, recorded_at_str,
          ],
        )?;
        tx.execute(
          "UPDATE donors SET last_donation_date = (
             SELECT MAX(donated_on) FROM donations WHERE donor_id = ?1
           ) WHERE donor_id = ?1",
          rusqlite::params![donor_id_str],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(donation)
  }

  async fn donations_for(&self, donor_id: Uuid) -> Result<Vec<BloodDonation>> {
    let id_str = encode_uuid(donor_id);

    let raws: Vec<RawDonation> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {DONATION_COLS} FROM donations
           WHERE donor_id = ?1 ORDER BY donated_on DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], read_donation)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDonation::into_donation).collect()
  }

  async fn find_donors(&self, filter: &DonorFilter) -> Result<Vec<DonorProfile>> {
    let group_strs: Vec<String> = filter
      .groups
      .iter()
      .map(|g| encode_blood_group(*g).to_owned())
      .collect();
    let loc_pattern = filter.location.as_deref().map(|l| format!("%{l}%"));

    let raws: Vec<RawDonor> = self
      .conn
      .call(move |conn| {
        let mut sql = format!(
          "SELECT {DONOR_COLS} FROM donors WHERE is_blood_donor = 1"
        );
        let mut args: Vec<String> = Vec::new();

        // An IN () clause would match nothing; an empty group set means
        // "any group", so it is simply omitted. NULL blood_group never
        // matches IN, which keeps incomplete profiles out of results.
        if !group_strs.is_empty() {
          let marks = vec!["?"; group_strs.len()].join(", ");
          sql.push_str(&format!(" AND blood_group IN ({marks})"));
          args.extend(group_strs);
        }
        if let Some(pat) = loc_pattern {
          sql.push_str(" AND (city LIKE ? OR state LIKE ?)");
          args.push(pat.clone());
          args.push(pat);
        }

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(args), read_donor)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDonor::into_profile).collect()
  }

  // ── Requisitions ──────────────────────────────────────────────────────────

  async fn create_requisition(
    &self,
    input: NewRequisition,
  ) -> Result<BloodRequisition> {
    let requisition = BloodRequisition {
      requisition_id:       Uuid::new_v4(),
      requester_id:         input.requester_id,
      patient_name:         input.patient_name,
      hospital_name:        input.hospital_name,
      contact_number:       input.contact_number,
      blood_group:          input.blood_group,
      units_needed:         input.units_needed,
      urgency:              input.urgency,
      location:             input.location,
      required_by:          input.required_by,
      allow_contact_reveal: input.allow_contact_reveal,
      medical_condition:    input.medical_condition,
      additional_notes:     input.additional_notes,
      status:               RequisitionStatus::Active,
      willing_donors:       0,
      created_at:           Utc::now(),
    };

    let id_str          = encode_uuid(requisition.requisition_id);
    let requester_str   = encode_uuid(requisition.requester_id);
    let patient         = requisition.patient_name.clone();
    let hospital        = requisition.hospital_name.clone();
    let contact         = requisition.contact_number.clone();
    let group_str       = encode_blood_group(requisition.blood_group);
    let units           = requisition.units_needed;
    let urgency_str     = encode_urgency(requisition.urgency);
    let city            = requisition.location.city.clone();
    let state           = requisition.location.state.clone();
    let required_by_str = encode_dt(requisition.required_by);
    let reveal          = requisition.allow_contact_reveal;
    let condition       = requisition.medical_condition.clone();
    let notes           = requisition.additional_notes.clone();
    let created_at_str  = encode_dt(requisition.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO requisitions (
             requisition_id, requester_id, patient_name, hospital_name,
             contact_number, blood_group, units_needed, urgency, city, state,
             required_by, allow_contact_reveal, medical_condition,
             additional_notes, status, willing_donors, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                     ?14, 'active', 0, ?15)",
          rusqlite::params![
            id_str, requester_str, patient, hospital, contact, group_str,
            units, urgency_str, city, state, required_by_str, reveal,
            condition, notes, created_at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(requisition)
  }

  async fn get_requisition(&self, id: Uuid) -> Result<Option<BloodRequisition>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawRequisition> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {REQ_COLS} FROM requisitions WHERE requisition_id = ?1"
              ),
              rusqlite::params![id_str],
              read_requisition,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRequisition::into_requisition).transpose()
  }

  async fn requisitions_by_requester(
    &self,
    requester_id: Uuid,
    page: Page,
  ) -> Result<Vec<BloodRequisition>> {
    let id_str = encode_uuid(requester_id);
    let limit  = page.size;
    let offset = page.offset();

    let raws: Vec<RawRequisition> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REQ_COLS} FROM requisitions
           WHERE requester_id = ?1
           ORDER BY created_at DESC
           LIMIT {limit} OFFSET {offset}"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], read_requisition)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawRequisition::into_requisition)
      .collect()
  }

  async fn discover_active(
    &self,
    groups: Vec<BloodGroup>,
    location: Option<String>,
    page: Page,
  ) -> Result<Vec<BloodRequisition>> {
    if groups.is_empty() {
      return Ok(Vec::new());
    }

    let group_strs: Vec<String> = groups
      .into_iter()
      .map(|g| encode_blood_group(g).to_owned())
      .collect();
    let loc_pattern = location.as_deref().map(|l| format!("%{l}%"));
    let limit  = page.size;
    let offset = page.offset();

    let raws: Vec<RawRequisition> = self
      .conn
      .call(move |conn| {
        let marks = vec!["?"; group_strs.len()].join(", ");
        let mut sql = format!(
          "SELECT {REQ_COLS} FROM requisitions
           WHERE status = 'active' AND blood_group IN ({marks})"
        );
        let mut args: Vec<String> = group_strs;

        if let Some(pat) = loc_pattern {
          sql.push_str(" AND (city LIKE ? OR state LIKE ?)");
          args.push(pat.clone());
          args.push(pat);
        }
        sql.push_str(&format!(
          " ORDER BY CASE urgency
              WHEN 'high' THEN 0 WHEN 'medium' THEN 1 ELSE 2
            END, created_at DESC
            LIMIT {limit} OFFSET {offset}"
        ));

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(args), read_requisition)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawRequisition::into_requisition)
      .collect()
  }

  async fn expired_active(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>> {
    let now_str = encode_dt(now);

    let ids: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT requisition_id FROM requisitions
           WHERE status = 'active' AND required_by < ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![now_str], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    ids
      .into_iter()
      .map(|s| Uuid::parse_str(&s).map_err(Error::Uuid))
      .collect()
  }

  async fn transition_requisition(
    &self,
    id: Uuid,
    to: RequisitionStatus,
  ) -> Result<Transition> {
    let id_str  = encode_uuid(id);
    let to_str  = encode_status(to);

    // Single guarded write: the UPDATE only lands if the row is still
    // Active, and `changed` tells us whether this caller won the race.
    let (changed, raw): (usize, Option<RawRequisition>) = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE requisitions SET status = ?2
           WHERE requisition_id = ?1 AND status = 'active'",
          rusqlite::params![id_str, to_str],
        )?;
        let raw = conn
          .query_row(
            &format!(
              "SELECT {REQ_COLS} FROM requisitions WHERE requisition_id = ?1"
            ),
            rusqlite::params![id_str],
            read_requisition,
          )
          .optional()?;
        Ok((changed, raw))
      })
      .await?;

    let Some(raw) = raw else {
      return Err(Error::RequisitionNotFound(id));
    };
    let requisition = raw.into_requisition()?;

    if changed == 1 {
      Ok(Transition::Applied(requisition))
    } else {
      Ok(Transition::Conflict(requisition.status))
    }
  }

  // ── Notifications ─────────────────────────────────────────────────────────

  async fn insert_notification(
    &self,
    requisition_id: Uuid,
    donor_id: Uuid,
    message: String,
  ) -> Result<Option<DonorNotification>> {
    let notification = DonorNotification {
      notification_id: Uuid::new_v4(),
      requisition_id,
      donor_id,
      message,
      status: DeliveryStatus::Sent,
      dispatch_failed: false,
      sent_at: Utc::now(),
      delivered_at: None,
      read_at: None,
    };

    let id_str       = encode_uuid(notification.notification_id);
    let req_str      = encode_uuid(requisition_id);
    let donor_str    = encode_uuid(donor_id);
    let message_copy = notification.message.clone();
    let sent_at_str  = encode_dt(notification.sent_at);

    let changed: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO notifications (
             notification_id, requisition_id, donor_id, message, status,
             dispatch_failed, sent_at
           ) VALUES (?1, ?2, ?3, ?4, 'sent', 0, ?5)
           ON CONFLICT (requisition_id, donor_id) DO NOTHING",
          rusqlite::params![id_str, req_str, donor_str, message_copy, sent_at_str],
        )?)
      })
      .await?;

    Ok((changed == 1).then_some(notification))
  }

  async fn get_notification(
    &self,
    requisition_id: Uuid,
    donor_id: Uuid,
  ) -> Result<Option<DonorNotification>> {
    let req_str   = encode_uuid(requisition_id);
    let donor_str = encode_uuid(donor_id);

    let raw: Option<RawNotification> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {NOTIF_COLS} FROM notifications
                 WHERE requisition_id = ?1 AND donor_id = ?2"
              ),
              rusqlite::params![req_str, donor_str],
              read_notification,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawNotification::into_notification).transpose()
  }

  async fn notifications_for_requisition(
    &self,
    requisition_id: Uuid,
  ) -> Result<Vec<DonorNotification>> {
    let req_str = encode_uuid(requisition_id);

    let raws: Vec<RawNotification> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {NOTIF_COLS} FROM notifications
           WHERE requisition_id = ?1 ORDER BY sent_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![req_str], read_notification)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawNotification::into_notification)
      .collect()
  }

  async fn advance_notification(
    &self,
    requisition_id: Uuid,
    donor_id: Uuid,
    to: DeliveryStatus,
  ) -> Result<DonorNotification> {
    let current = self
      .get_notification(requisition_id, donor_id)
      .await?
      .ok_or(Error::NotificationNotFound { requisition_id, donor_id })?;

    // Stale or repeated advancements leave the row untouched.
    if !current.status.can_advance_to(to) {
      return Ok(current);
    }

    let req_str   = encode_uuid(requisition_id);
    let donor_str = encode_uuid(donor_id);
    let prev_str  = encode_delivery(current.status);
    let now_str   = encode_dt(Utc::now());

    let sql = match to {
      DeliveryStatus::Delivered => {
        "UPDATE notifications SET status = 'delivered', delivered_at = ?3
         WHERE requisition_id = ?1 AND donor_id = ?2 AND status = ?4"
      }
      _ => {
        "UPDATE notifications SET status = 'read', read_at = ?3
         WHERE requisition_id = ?1 AND donor_id = ?2 AND status = ?4"
      }
    };

    // Guarded on the status we read, so a racing advancement can never be
    // rolled backward; losing the race keeps the other writer's state.
    self
      .conn
      .call(move |conn| {
        conn.execute(sql, rusqlite::params![req_str, donor_str, now_str, prev_str])?;
        Ok(())
      })
      .await?;

    self
      .get_notification(requisition_id, donor_id)
      .await?
      .ok_or(Error::NotificationNotFound { requisition_id, donor_id })
  }

  async fn set_dispatch_failed(
    &self,
    notification_id: Uuid,
    failed: bool,
  ) -> Result<()> {
    let id_str = encode_uuid(notification_id);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE notifications SET dispatch_failed = ?2
           WHERE notification_id = ?1",
          rusqlite::params![id_str, failed],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn failed_notifications(
    &self,
    requisition_id: Uuid,
  ) -> Result<Vec<DonorNotification>> {
    let req_str = encode_uuid(requisition_id);

    let raws: Vec<RawNotification> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {NOTIF_COLS} FROM notifications
           WHERE requisition_id = ?1 AND dispatch_failed = 1
           ORDER BY sent_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![req_str], read_notification)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawNotification::into_notification)
      .collect()
  }

  // ── Responses ─────────────────────────────────────────────────────────────

  async fn upsert_response(
    &self,
    requisition_id: Uuid,
    donor_id: Uuid,
    value: ResponseValue,
    message: Option<String>,
  ) -> Result<(DonorResponse, u32)> {
    let response_id_str = encode_uuid(Uuid::new_v4());
    let req_str         = encode_uuid(requisition_id);
    let donor_str       = encode_uuid(donor_id);
    let value_str       = encode_response_value(value);
    let at_str          = encode_dt(Utc::now());

    // Upsert and counter recompute commit together, so willing_donors can
    // never drift from the response set.
    let result: Option<(RawResponse, u32)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let exists: bool = tx
          .query_row(
            "SELECT 1 FROM requisitions WHERE requisition_id = ?1",
            rusqlite::params![req_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !exists {
          return Ok(None);
        }

        tx.execute(
          "INSERT INTO responses (
             response_id, requisition_id, donor_id, value, message,
             responded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT (requisition_id, donor_id) DO UPDATE SET
             value = excluded.value,
             message = excluded.message,
             responded_at = excluded.responded_at",
          rusqlite::params![
            response_id_str, req_str, donor_str, value_str, message, at_str,
          ],
        )?;

        tx.execute(
          "UPDATE requisitions SET willing_donors = (
             SELECT COUNT(*) FROM responses
             WHERE requisition_id = ?1 AND value = 'willing'
           ) WHERE requisition_id = ?1",
          rusqlite::params![req_str],
        )?;

        let raw = tx.query_row(
          &format!(
            "SELECT {RESP_COLS} FROM responses
             WHERE requisition_id = ?1 AND donor_id = ?2"
          ),
          rusqlite::params![req_str, donor_str],
          read_response,
        )?;
        let willing: u32 = tx.query_row(
          "SELECT willing_donors FROM requisitions WHERE requisition_id = ?1",
          rusqlite::params![req_str],
          |row| row.get(0),
        )?;

        tx.commit()?;
        Ok(Some((raw, willing)))
      })
      .await?;

    let Some((raw, willing)) = result else {
      return Err(Error::RequisitionNotFound(requisition_id));
    };
    Ok((raw.into_response()?, willing))
  }

  async fn responses_for_requisition(
    &self,
    requisition_id: Uuid,
  ) -> Result<Vec<DonorResponse>> {
    let req_str = encode_uuid(requisition_id);

    let raws: Vec<RawResponse> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RESP_COLS} FROM responses
           WHERE requisition_id = ?1 ORDER BY responded_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![req_str], read_response)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawResponse::into_response).collect()
  }
}
