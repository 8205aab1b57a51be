//! The `LifelinkStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `lifelink-store-sqlite`). Higher layers (`lifelink-engine`,
//! `lifelink-api`) depend on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  blood::BloodGroup,
  donor::{BloodDonation, DonorProfile, DonorUpdate, NewDonation, NewDonor},
  notification::{DeliveryStatus, DonorNotification, DonorResponse, ResponseValue},
  requisition::{BloodRequisition, NewRequisition, RequisitionStatus},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Coarse donor filter applied at the SQL level. Eligibility and ordering
/// are applied afterwards by [`crate::directory::rank_candidates`].
#[derive(Debug, Clone, Default)]
pub struct DonorFilter {
  /// Accept donors whose blood group is in this set. Empty means no group
  /// constraint (used by plain directory browsing).
  pub groups:   Vec<BloodGroup>,
  /// Case-insensitive substring over city or state.
  pub location: Option<String>,
}

/// 1-based pagination window.
#[derive(Debug, Clone, Copy)]
pub struct Page {
  pub number: usize,
  pub size:   usize,
}

impl Page {
  pub fn offset(self) -> usize {
    self.number.saturating_sub(1) * self.size
  }
}

impl Default for Page {
  fn default() -> Self {
    Self { number: 1, size: 20 }
  }
}

/// Outcome of a guarded status transition. Losing the compare-and-set is a
/// normal result, not an error — the caller decides whether the observed
/// terminal state is acceptable.
#[derive(Debug, Clone)]
pub enum Transition {
  /// This caller won the compare-and-set; the updated row is returned.
  Applied(BloodRequisition),
  /// Another writer got there first; carries the status that was observed.
  Conflict(RequisitionStatus),
}

impl Transition {
  pub fn applied(&self) -> bool {
    matches!(self, Self::Applied(_))
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a LifeLink storage backend.
///
/// Requisition status is only ever written through
/// [`transition_requisition`](Self::transition_requisition), which must be
/// an atomic compare-and-set against `Active`. The `willing_donors` counter
/// is derived — recomputed inside [`upsert_response`](Self::upsert_response)
/// — never incremented blindly.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait LifelinkStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Donors ────────────────────────────────────────────────────────────

  /// Create and persist a donor profile. `donor_id` and `created_at` are
  /// assigned by the store.
  fn register_donor(
    &self,
    input: NewDonor,
  ) -> impl Future<Output = Result<DonorProfile, Self::Error>> + Send + '_;

  /// Retrieve a donor by UUID. Returns `None` if not found.
  fn get_donor(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<DonorProfile>, Self::Error>> + Send + '_;

  /// Apply a profile edit. Fields left `None` in the update are untouched.
  /// Errors if the donor does not exist.
  fn update_donor(
    &self,
    id: Uuid,
    update: DonorUpdate,
  ) -> impl Future<Output = Result<DonorProfile, Self::Error>> + Send + '_;

  /// Append a donation to the donor's ledger and recompute the derived
  /// `last_donation_date` (always `max(donated_on)`) in the same
  /// transaction.
  fn record_donation(
    &self,
    donor_id: Uuid,
    input: NewDonation,
  ) -> impl Future<Output = Result<BloodDonation, Self::Error>> + Send + '_;

  /// The donor's donation ledger, most recent first.
  fn donations_for(
    &self,
    donor_id: Uuid,
  ) -> impl Future<Output = Result<Vec<BloodDonation>, Self::Error>> + Send + '_;

  /// Opted-in donors matching the coarse filter. No ordering contract;
  /// callers rank the result.
  fn find_donors<'a>(
    &'a self,
    filter: &'a DonorFilter,
  ) -> impl Future<Output = Result<Vec<DonorProfile>, Self::Error>> + Send + 'a;

  // ── Requisitions ──────────────────────────────────────────────────────

  /// Persist a new requisition in `Active` status with a zero
  /// willing-donor count. Input validation is the caller's concern.
  fn create_requisition(
    &self,
    input: NewRequisition,
  ) -> impl Future<Output = Result<BloodRequisition, Self::Error>> + Send + '_;

  fn get_requisition(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<BloodRequisition>, Self::Error>> + Send + '_;

  /// All requisitions created by a requester, any status, newest first.
  fn requisitions_by_requester(
    &self,
    requester_id: Uuid,
    page: Page,
  ) -> impl Future<Output = Result<Vec<BloodRequisition>, Self::Error>> + Send + '_;

  /// Active requisitions whose required group is in `groups` (the set a
  /// donor can donate to), optionally location-filtered, most urgent and
  /// newest first.
  fn discover_active(
    &self,
    groups: Vec<BloodGroup>,
    location: Option<String>,
    page: Page,
  ) -> impl Future<Output = Result<Vec<BloodRequisition>, Self::Error>> + Send + '_;

  /// IDs of Active requisitions whose `required_by` has passed — the
  /// sweeper's scan.
  fn expired_active(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;

  /// The single guarded status write: applies `Active -> to` iff the row is
  /// still `Active`, atomically. Every status mutation in the system goes
  /// through here.
  fn transition_requisition(
    &self,
    id: Uuid,
    to: RequisitionStatus,
  ) -> impl Future<Output = Result<Transition, Self::Error>> + Send + '_;

  // ── Notifications ─────────────────────────────────────────────────────

  /// Insert a notification row conditional on the `(requisition, donor)`
  /// pair not existing. Returns `None` when the pair is already present —
  /// the idempotency boundary for fan-out.
  fn insert_notification(
    &self,
    requisition_id: Uuid,
    donor_id: Uuid,
    message: String,
  ) -> impl Future<Output = Result<Option<DonorNotification>, Self::Error>> + Send + '_;

  fn get_notification(
    &self,
    requisition_id: Uuid,
    donor_id: Uuid,
  ) -> impl Future<Output = Result<Option<DonorNotification>, Self::Error>> + Send + '_;

  fn notifications_for_requisition(
    &self,
    requisition_id: Uuid,
  ) -> impl Future<Output = Result<Vec<DonorNotification>, Self::Error>> + Send + '_;

  /// Advance delivery status monotonically, stamping the matching
  /// timestamp. A non-forward advancement leaves the row unchanged and
  /// returns it as-is.
  fn advance_notification(
    &self,
    requisition_id: Uuid,
    donor_id: Uuid,
    to: DeliveryStatus,
  ) -> impl Future<Output = Result<DonorNotification, Self::Error>> + Send + '_;

  /// Set or clear the retry-eligible flag after a transport outcome.
  fn set_dispatch_failed(
    &self,
    notification_id: Uuid,
    failed: bool,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Notifications whose transport dispatch exhausted its retries.
  fn failed_notifications(
    &self,
    requisition_id: Uuid,
  ) -> impl Future<Output = Result<Vec<DonorNotification>, Self::Error>> + Send + '_;

  // ── Responses ─────────────────────────────────────────────────────────

  /// Upsert the donor's response (replace semantics — the original
  /// `response_id` survives replacements) and, in the same transaction,
  /// recompute the requisition's willing-donor count. Returns the stored
  /// row and the new count.
  fn upsert_response(
    &self,
    requisition_id: Uuid,
    donor_id: Uuid,
    value: ResponseValue,
    message: Option<String>,
  ) -> impl Future<Output = Result<(DonorResponse, u32), Self::Error>> + Send + '_;

  fn responses_for_requisition(
    &self,
    requisition_id: Uuid,
  ) -> impl Future<Output = Result<Vec<DonorResponse>, Self::Error>> + Send + '_;
}
