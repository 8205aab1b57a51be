//! Integration tests for the engine against an in-memory SQLite store.

use std::{
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  time::Duration as StdDuration,
};

use chrono::{Duration, Utc};
use lifelink_core::{
  blood::BloodGroup,
  donor::{DonorUpdate, Location, NewDonation, NewDonor},
  notification::{DeliveryStatus, DonorNotification, ResponseValue},
  requisition::{NewRequisition, RequisitionStatus, UrgencyLevel},
  store::{LifelinkStore, Page},
};
use lifelink_store_sqlite::SqliteStore;
use uuid::Uuid;

use crate::{
  Engine, EngineConfig, Error, LogTransport, NotificationTransport,
  TransportError,
};

// ─── Harness ─────────────────────────────────────────────────────────────────

fn test_config() -> EngineConfig {
  EngineConfig {
    dispatch_attempts: 2,
    dispatch_backoff: StdDuration::from_millis(1),
    ..EngineConfig::default()
  }
}

async fn engine() -> Engine<SqliteStore, LogTransport> {
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  Engine::new(Arc::new(store), Arc::new(LogTransport), test_config())
}

/// Transport whose failure mode can be toggled mid-test.
#[derive(Default)]
struct FaultyTransport {
  failing: AtomicBool,
}

impl NotificationTransport for FaultyTransport {
  async fn dispatch(
    &self,
    _notification: &DonorNotification,
  ) -> Result<(), TransportError> {
    if self.failing.load(Ordering::SeqCst) {
      Err(TransportError("gateway unavailable".into()))
    } else {
      Ok(())
    }
  }
}

fn karachi() -> Location {
  Location {
    city:  Some("Karachi".into()),
    state: Some("Sindh".into()),
  }
}

fn donor_input(group: BloodGroup) -> NewDonor {
  NewDonor {
    display_name:   "Test Donor".into(),
    blood_group:    Some(group),
    is_blood_donor: true,
    location:       karachi(),
    show_contact:   false,
    contact_number: None,
  }
}

fn requisition_input(
  group: BloodGroup,
  units: u32,
  requester_id: Uuid,
) -> NewRequisition {
  NewRequisition {
    requester_id,
    patient_name: "A. Patient".into(),
    hospital_name: "City Hospital".into(),
    contact_number: "+92-300-0000000".into(),
    blood_group: group,
    units_needed: units,
    urgency: UrgencyLevel::High,
    location: karachi(),
    required_by: Utc::now() + Duration::days(1),
    allow_contact_reveal: false,
    medical_condition: None,
    additional_notes: None,
  }
}

// ─── Fan-out idempotency ─────────────────────────────────────────────────────

#[tokio::test]
async fn notify_all_twice_creates_no_duplicates() {
  let e = engine().await;
  for _ in 0..3 {
    e.register_donor(donor_input(BloodGroup::OPos)).await.unwrap();
  }
  let req = e
    .create_requisition(requisition_input(BloodGroup::OPos, 2, Uuid::new_v4()))
    .await
    .unwrap();

  let first = e.notify_all(req.requisition_id).await.unwrap();
  assert_eq!(first.notified, 3);
  assert_eq!(first.skipped, 0);

  let second = e.notify_all(req.requisition_id).await.unwrap();
  assert_eq!(second.notified, 0);
  assert_eq!(second.skipped, first.notified);

  let rows = e
    .store()
    .notifications_for_requisition(req.requisition_id)
    .await
    .unwrap();
  assert_eq!(rows.len(), 3);
  assert!(rows.iter().all(|n| n.status == DeliveryStatus::Sent));
}

#[tokio::test]
async fn rematch_picks_up_donors_added_later() {
  let e = engine().await;
  for _ in 0..2 {
    e.register_donor(donor_input(BloodGroup::APos)).await.unwrap();
  }
  let req = e
    .create_requisition(requisition_input(BloodGroup::APos, 1, Uuid::new_v4()))
    .await
    .unwrap();
  assert_eq!(e.notify_all(req.requisition_id).await.unwrap().notified, 2);

  e.register_donor(donor_input(BloodGroup::ONeg)).await.unwrap();

  let rematch = e.notify_all(req.requisition_id).await.unwrap();
  assert_eq!(rematch.notified, 1);
  assert_eq!(rematch.skipped, 2);
}

#[tokio::test]
async fn no_eligible_donors_is_reported_not_fatal() {
  let e = engine().await;
  let req = e
    .create_requisition(requisition_input(BloodGroup::AbNeg, 1, Uuid::new_v4()))
    .await
    .unwrap();

  let report = e.notify_all(req.requisition_id).await.unwrap();
  assert_eq!(report.matched, 0);
  assert_eq!(report.notified, 0);

  // Requisition stays Active for a later rematch.
  let fetched = e.get_requisition(req.requisition_id).await.unwrap();
  assert_eq!(fetched.status, RequisitionStatus::Active);
}

#[tokio::test]
async fn fan_out_skips_donors_in_cooldown() {
  let e = engine().await;
  let rested = e.register_donor(donor_input(BloodGroup::OPos)).await.unwrap();
  let resting = e.register_donor(donor_input(BloodGroup::OPos)).await.unwrap();
  e.record_donation(
    resting.donor_id,
    NewDonation {
      donated_on: Utc::now().date_naive() - Duration::days(10),
      location:   None,
      units:      1,
      notes:      None,
    },
  )
  .await
  .unwrap();

  let req = e
    .create_requisition(requisition_input(BloodGroup::OPos, 1, Uuid::new_v4()))
    .await
    .unwrap();
  let report = e.notify_all(req.requisition_id).await.unwrap();
  assert_eq!(report.notified, 1);

  assert!(
    e.store()
      .get_notification(req.requisition_id, rested.donor_id)
      .await
      .unwrap()
      .is_some()
  );
  assert!(
    e.store()
      .get_notification(req.requisition_id, resting.donor_id)
      .await
      .unwrap()
      .is_none()
  );
}

// ─── Transport failures ──────────────────────────────────────────────────────

#[tokio::test]
async fn transport_failure_flags_rows_and_retry_clears_them() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let transport = Arc::new(FaultyTransport::default());
  let e = Engine::new(Arc::new(store), Arc::clone(&transport), test_config());

  for _ in 0..2 {
    e.register_donor(donor_input(BloodGroup::BPos)).await.unwrap();
  }
  let req = e
    .create_requisition(requisition_input(BloodGroup::BPos, 1, Uuid::new_v4()))
    .await
    .unwrap();

  transport.failing.store(true, Ordering::SeqCst);
  let report = e.notify_all(req.requisition_id).await.unwrap();
  assert_eq!(report.failed, 2);
  assert_eq!(report.notified, 0);

  // Rows exist despite the failures — at-most-once in the store.
  let flagged = e
    .store()
    .failed_notifications(req.requisition_id)
    .await
    .unwrap();
  assert_eq!(flagged.len(), 2);
  assert!(flagged.iter().all(|n| n.dispatch_failed));

  transport.failing.store(false, Ordering::SeqCst);
  let retry = e.retry_failed(req.requisition_id).await.unwrap();
  assert_eq!(retry.notified, 2);
  assert!(
    e.store()
      .failed_notifications(req.requisition_id)
      .await
      .unwrap()
      .is_empty()
  );
}

// ─── Responses ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn response_without_notification_is_rejected() {
  let e = engine().await;
  let donor = e.register_donor(donor_input(BloodGroup::OPos)).await.unwrap();
  let req = e
    .create_requisition(requisition_input(BloodGroup::OPos, 1, Uuid::new_v4()))
    .await
    .unwrap();

  let err = e
    .record_response(
      req.requisition_id,
      donor.donor_id,
      ResponseValue::Willing,
      None,
    )
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Domain(lifelink_core::Error::NotNotified { .. })
  ));
}

#[tokio::test]
async fn repeat_response_replaces_the_earlier_one() {
  let e = engine().await;
  let donor = e.register_donor(donor_input(BloodGroup::OPos)).await.unwrap();
  let req = e
    .create_requisition(requisition_input(BloodGroup::OPos, 5, Uuid::new_v4()))
    .await
    .unwrap();
  e.notify_all(req.requisition_id).await.unwrap();

  let first = e
    .record_response(
      req.requisition_id,
      donor.donor_id,
      ResponseValue::NotAvailable,
      None,
    )
    .await
    .unwrap();
  assert_eq!(first.willing_donors, 0);

  let second = e
    .record_response(
      req.requisition_id,
      donor.donor_id,
      ResponseValue::Willing,
      Some("back in town".into()),
    )
    .await
    .unwrap();
  assert_eq!(second.willing_donors, 1);

  let rows = e
    .store()
    .responses_for_requisition(req.requisition_id)
    .await
    .unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].value, ResponseValue::Willing);
  assert_eq!(rows[0].response_id, first.response.response_id);
}

#[tokio::test]
async fn responding_marks_the_notification_read() {
  let e = engine().await;
  let donor = e.register_donor(donor_input(BloodGroup::OPos)).await.unwrap();
  let req = e
    .create_requisition(requisition_input(BloodGroup::OPos, 2, Uuid::new_v4()))
    .await
    .unwrap();
  e.notify_all(req.requisition_id).await.unwrap();
  e.record_response(
    req.requisition_id,
    donor.donor_id,
    ResponseValue::NotSuitable,
    None,
  )
  .await
  .unwrap();

  let notification = e
    .store()
    .get_notification(req.requisition_id, donor.donor_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(notification.status, DeliveryStatus::Read);
  assert!(notification.read_at.is_some());
}

#[tokio::test]
async fn fulfilment_scenario_two_of_three_donors() {
  let e = engine().await;
  let donors: Vec<_> = {
    let mut v = Vec::new();
    for _ in 0..3 {
      v.push(e.register_donor(donor_input(BloodGroup::OPos)).await.unwrap());
    }
    v
  };
  let req = e
    .create_requisition(requisition_input(BloodGroup::OPos, 2, Uuid::new_v4()))
    .await
    .unwrap();

  let report = e.notify_all(req.requisition_id).await.unwrap();
  assert_eq!(report.notified, 3);

  let first = e
    .record_response(
      req.requisition_id,
      donors[0].donor_id,
      ResponseValue::Willing,
      None,
    )
    .await
    .unwrap();
  assert_eq!(first.willing_donors, 1);
  assert_eq!(first.requisition_status, RequisitionStatus::Active);
  assert!(!first.triggered_fulfillment);

  let second = e
    .record_response(
      req.requisition_id,
      donors[1].donor_id,
      ResponseValue::Willing,
      None,
    )
    .await
    .unwrap();
  assert_eq!(second.willing_donors, 2);
  assert_eq!(second.requisition_status, RequisitionStatus::Fulfilled);
  assert!(second.triggered_fulfillment);

  // A late WILLING response is still recorded but cannot re-trigger
  // fulfilment — the requisition is already terminal.
  let third = e
    .record_response(
      req.requisition_id,
      donors[2].donor_id,
      ResponseValue::Willing,
      None,
    )
    .await
    .unwrap();
  assert_eq!(third.willing_donors, 3);
  assert_eq!(third.requisition_status, RequisitionStatus::Fulfilled);
  assert!(!third.triggered_fulfillment);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_willing_responses_fulfil_exactly_once() {
  let e = Arc::new(engine().await);
  let mut donors = Vec::new();
  for _ in 0..4 {
    donors.push(e.register_donor(donor_input(BloodGroup::OPos)).await.unwrap());
  }
  let req = e
    .create_requisition(requisition_input(BloodGroup::OPos, 1, Uuid::new_v4()))
    .await
    .unwrap();
  e.notify_all(req.requisition_id).await.unwrap();

  // Every responder sees the threshold met; only one may win the
  // compare-and-set.
  let mut tasks = tokio::task::JoinSet::new();
  for donor in &donors {
    let e = Arc::clone(&e);
    let requisition_id = req.requisition_id;
    let donor_id = donor.donor_id;
    tasks.spawn(async move {
      e.record_response(requisition_id, donor_id, ResponseValue::Willing, None)
        .await
        .unwrap()
    });
  }

  let mut wins = 0;
  while let Some(ack) = tasks.join_next().await {
    if ack.unwrap().triggered_fulfillment {
      wins += 1;
    }
  }
  assert_eq!(wins, 1, "exactly one response may win the transition");

  let fetched = e.get_requisition(req.requisition_id).await.unwrap();
  assert_eq!(fetched.status, RequisitionStatus::Fulfilled);
  assert_eq!(fetched.willing_donors, 4);
}

// ─── Cancellation ────────────────────────────────────────────────────────────

#[tokio::test]
async fn cancelled_requisition_rejects_responses() {
  let e = engine().await;
  let requester = Uuid::new_v4();
  let donor = e.register_donor(donor_input(BloodGroup::OPos)).await.unwrap();
  let req = e
    .create_requisition(requisition_input(BloodGroup::OPos, 1, requester))
    .await
    .unwrap();
  e.notify_all(req.requisition_id).await.unwrap();

  e.cancel_requisition(req.requisition_id, requester).await.unwrap();

  let err = e
    .record_response(
      req.requisition_id,
      donor.donor_id,
      ResponseValue::Willing,
      None,
    )
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Domain(lifelink_core::Error::RequisitionNotActive { .. })
  ));
}

#[tokio::test]
async fn cancel_is_requester_only() {
  let e = engine().await;
  let requester = Uuid::new_v4();
  let req = e
    .create_requisition(requisition_input(BloodGroup::OPos, 1, requester))
    .await
    .unwrap();

  let err = e
    .cancel_requisition(req.requisition_id, Uuid::new_v4())
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Domain(lifelink_core::Error::NotRequester { .. })
  ));
}

#[tokio::test]
async fn transition_out_of_terminal_state_is_a_conflict() {
  let e = engine().await;
  let requester = Uuid::new_v4();
  let req = e
    .create_requisition(requisition_input(BloodGroup::OPos, 1, requester))
    .await
    .unwrap();
  e.cancel_requisition(req.requisition_id, requester).await.unwrap();

  let err = e
    .fulfil_requisition(req.requisition_id, requester)
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Domain(lifelink_core::Error::InvalidTransition {
      from: RequisitionStatus::Cancelled,
      ..
    })
  ));
}

// ─── Expiry ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn sweep_expires_overdue_requisitions_only() {
  let e = engine().await;
  let requester = Uuid::new_v4();
  let donor = e.register_donor(donor_input(BloodGroup::OPos)).await.unwrap();

  let mut soon = requisition_input(BloodGroup::OPos, 1, requester);
  soon.required_by = Utc::now() + Duration::milliseconds(100);
  let overdue = e.create_requisition(soon).await.unwrap();
  let healthy = e
    .create_requisition(requisition_input(BloodGroup::OPos, 1, requester))
    .await
    .unwrap();
  e.notify_all(overdue.requisition_id).await.unwrap();

  tokio::time::sleep(StdDuration::from_millis(250)).await;
  let expired = e.sweep_once(Utc::now()).await.unwrap();
  assert_eq!(expired, 1);

  assert_eq!(
    e.get_requisition(overdue.requisition_id).await.unwrap().status,
    RequisitionStatus::Expired
  );
  assert_eq!(
    e.get_requisition(healthy.requisition_id).await.unwrap().status,
    RequisitionStatus::Active
  );

  // Responses against the expired requisition are now rejected.
  let err = e
    .record_response(
      overdue.requisition_id,
      donor.donor_id,
      ResponseValue::Willing,
      None,
    )
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Domain(lifelink_core::Error::RequisitionNotActive { .. })
  ));

  // A second sweep finds nothing left to do.
  assert_eq!(e.sweep_once(Utc::now()).await.unwrap(), 0);
}

// ─── Donors & directory ──────────────────────────────────────────────────────

#[tokio::test]
async fn donation_recording_tracks_the_ledger_maximum() {
  let e = engine().await;
  let donor = e.register_donor(donor_input(BloodGroup::ANeg)).await.unwrap();
  let today = Utc::now().date_naive();

  e.record_donation(
    donor.donor_id,
    NewDonation {
      donated_on: today - Duration::days(5),
      location:   Some("camp".into()),
      units:      1,
      notes:      None,
    },
  )
  .await
  .unwrap();

  // Back-dated entries must not regress the derived date.
  e.record_donation(
    donor.donor_id,
    NewDonation {
      donated_on: today - Duration::days(200),
      location:   None,
      units:      2,
      notes:      Some("old record".into()),
    },
  )
  .await
  .unwrap();

  let profile = e.get_donor(donor.donor_id).await.unwrap();
  assert_eq!(profile.last_donation_date, Some(today - Duration::days(5)));

  let eligibility = e.donor_eligibility(donor.donor_id).await.unwrap();
  assert!(!eligibility.is_eligible);
  assert_eq!(eligibility.days_since_last_donation, Some(5));
}

#[tokio::test]
async fn search_includes_flagged_almost_eligible_donors() {
  let e = engine().await;
  e.register_donor(donor_input(BloodGroup::ONeg)).await.unwrap();
  let resting = e.register_donor(donor_input(BloodGroup::OPos)).await.unwrap();
  e.record_donation(
    resting.donor_id,
    NewDonation {
      donated_on: Utc::now().date_naive() - Duration::days(30),
      location:   None,
      units:      1,
      notes:      None,
    },
  )
  .await
  .unwrap();

  let hits = e
    .search_donors(BloodGroup::OPos, Some("karachi".into()), 10)
    .await
    .unwrap();
  assert_eq!(hits.len(), 2);
  assert!(hits[0].eligibility.is_eligible);
  assert!(!hits[1].eligibility.is_eligible);
  assert_eq!(hits[1].profile.donor_id, resting.donor_id);
}

#[tokio::test]
async fn opted_out_donors_are_invisible() {
  let e = engine().await;
  let donor = e.register_donor(donor_input(BloodGroup::OPos)).await.unwrap();
  e.update_donor(
    donor.donor_id,
    DonorUpdate { is_blood_donor: Some(false), ..DonorUpdate::default() },
  )
  .await
  .unwrap();

  let hits = e.search_donors(BloodGroup::OPos, None, 10).await.unwrap();
  assert!(hits.is_empty());
}

#[tokio::test]
async fn discover_lists_only_requisitions_the_donor_can_serve() {
  let e = engine().await;
  let requester = Uuid::new_v4();
  let donor = e.register_donor(donor_input(BloodGroup::BNeg)).await.unwrap();

  let b_pos = e
    .create_requisition(requisition_input(BloodGroup::BPos, 1, requester))
    .await
    .unwrap();
  // B- cannot serve an O- patient; this one must not appear.
  e.create_requisition(requisition_input(BloodGroup::ONeg, 1, requester))
    .await
    .unwrap();

  let feed = e
    .discover_requisitions(donor.donor_id, Page::default())
    .await
    .unwrap();
  assert_eq!(feed.len(), 1);
  assert_eq!(feed[0].requisition_id, b_pos.requisition_id);

  e.cancel_requisition(b_pos.requisition_id, requester).await.unwrap();
  let feed = e
    .discover_requisitions(donor.donor_id, Page::default())
    .await
    .unwrap();
  assert!(feed.is_empty());
}
