//! Handlers for `/requisitions` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/requisitions` | Body: [`NewRequisition`]; returns 201 |
//! | `GET`  | `/requisitions` | `?requester_id` required; `page`, `limit` optional |
//! | `GET`  | `/requisitions/discover` | `?donor_id` required; active, donor-compatible |
//! | `GET`  | `/requisitions/:id` | 404 if not found |
//! | `POST` | `/requisitions/:id/cancel` | Body: `{"requester_id":...}`; requester-only |
//! | `POST` | `/requisitions/:id/fulfil` | Body: `{"requester_id":...}`; requester-only |
//! | `POST` | `/requisitions/:id/notify` | Fan-out / rematch; returns [`FanOutReport`] |
//! | `POST` | `/requisitions/:id/retry-dispatch` | Re-dispatch flagged notifications |
//! | `POST` | `/requisitions/:id/respond` | Body: [`RespondBody`] |
//! | `GET`  | `/requisitions/:id/notifications` | Per-donor delivery state |
//! | `POST` | `/requisitions/:id/notifications/:donor_id/advance` | Delivery/read receipt |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use lifelink_core::{
  notification::{DeliveryStatus, DonorNotification, ResponseValue},
  requisition::{BloodRequisition, NewRequisition},
  store::{LifelinkStore, Page},
};
use lifelink_engine::{
  Engine, Error, FanOutReport, NotificationTransport, ResponseAck,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

// ─── Shared params ────────────────────────────────────────────────────────────

fn to_page(page: Option<usize>, limit: Option<usize>) -> Page {
  let default = Page::default();
  Page {
    number: page.unwrap_or(default.number).max(1),
    size:   limit.unwrap_or(default.size).clamp(1, 100),
  }
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /requisitions` — returns 201 + the stored requisition.
pub async fn create<S, T>(
  State(engine): State<Arc<Engine<S, T>>>,
  Json(body): Json<NewRequisition>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LifelinkStore + 'static,
  T: NotificationTransport,
{
  let requisition = engine.create_requisition(body).await?;
  Ok((StatusCode::CREATED, Json(requisition)))
}

// ─── Listings ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListMineParams {
  pub requester_id: Uuid,
  pub page:         Option<usize>,
  pub limit:        Option<usize>,
}

/// `GET /requisitions?requester_id=<id>[&page=...][&limit=...]`
pub async fn list_mine<S, T>(
  State(engine): State<Arc<Engine<S, T>>>,
  Query(params): Query<ListMineParams>,
) -> Result<Json<Vec<BloodRequisition>>, ApiError>
where
  S: LifelinkStore + 'static,
  T: NotificationTransport,
{
  let requisitions = engine
    .my_requisitions(params.requester_id, to_page(params.page, params.limit))
    .await?;
  Ok(Json(requisitions))
}

#[derive(Debug, Deserialize)]
pub struct DiscoverParams {
  pub donor_id: Uuid,
  pub page:     Option<usize>,
  pub limit:    Option<usize>,
}

/// `GET /requisitions/discover?donor_id=<id>[&page=...][&limit=...]`
pub async fn discover<S, T>(
  State(engine): State<Arc<Engine<S, T>>>,
  Query(params): Query<DiscoverParams>,
) -> Result<Json<Vec<BloodRequisition>>, ApiError>
where
  S: LifelinkStore + 'static,
  T: NotificationTransport,
{
  let requisitions = engine
    .discover_requisitions(params.donor_id, to_page(params.page, params.limit))
    .await?;
  Ok(Json(requisitions))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /requisitions/:id`
pub async fn get_one<S, T>(
  State(engine): State<Arc<Engine<S, T>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<BloodRequisition>, ApiError>
where
  S: LifelinkStore + 'static,
  T: NotificationTransport,
{
  Ok(Json(engine.get_requisition(id).await?))
}

// ─── Requester transitions ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RequesterBody {
  pub requester_id: Uuid,
}

/// `POST /requisitions/:id/cancel` — body: `{"requester_id":"..."}`.
pub async fn cancel<S, T>(
  State(engine): State<Arc<Engine<S, T>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<RequesterBody>,
) -> Result<Json<BloodRequisition>, ApiError>
where
  S: LifelinkStore + 'static,
  T: NotificationTransport,
{
  Ok(Json(engine.cancel_requisition(id, body.requester_id).await?))
}

/// `POST /requisitions/:id/fulfil` — body: `{"requester_id":"..."}`.
pub async fn fulfil<S, T>(
  State(engine): State<Arc<Engine<S, T>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<RequesterBody>,
) -> Result<Json<BloodRequisition>, ApiError>
where
  S: LifelinkStore + 'static,
  T: NotificationTransport,
{
  Ok(Json(engine.fulfil_requisition(id, body.requester_id).await?))
}

// ─── Fan-out ──────────────────────────────────────────────────────────────────

/// `POST /requisitions/:id/notify` — idempotent fan-out; calling it again
/// later acts as a rematch and only contacts donors not already notified.
pub async fn notify<S, T>(
  State(engine): State<Arc<Engine<S, T>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<FanOutReport>, ApiError>
where
  S: LifelinkStore + 'static,
  T: NotificationTransport,
{
  Ok(Json(engine.notify_all(id).await?))
}

/// `POST /requisitions/:id/retry-dispatch`
pub async fn retry_dispatch<S, T>(
  State(engine): State<Arc<Engine<S, T>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<FanOutReport>, ApiError>
where
  S: LifelinkStore + 'static,
  T: NotificationTransport,
{
  Ok(Json(engine.retry_failed(id).await?))
}

// ─── Responses ────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /requisitions/:id/respond`.
#[derive(Debug, Deserialize)]
pub struct RespondBody {
  pub donor_id: Uuid,
  pub response: ResponseValue,
  pub message:  Option<String>,
}

/// `POST /requisitions/:id/respond`
pub async fn respond<S, T>(
  State(engine): State<Arc<Engine<S, T>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<RespondBody>,
) -> Result<Json<ResponseAck>, ApiError>
where
  S: LifelinkStore + 'static,
  T: NotificationTransport,
{
  let ack = engine
    .record_response(id, body.donor_id, body.response, body.message)
    .await?;
  Ok(Json(ack))
}

// ─── Notifications ────────────────────────────────────────────────────────────

/// `GET /requisitions/:id/notifications`
pub async fn notifications<S, T>(
  State(engine): State<Arc<Engine<S, T>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<DonorNotification>>, ApiError>
where
  S: LifelinkStore + 'static,
  T: NotificationTransport,
{
  let rows = engine
    .store()
    .notifications_for_requisition(id)
    .await
    .map_err(Error::from_store)?;
  Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct AdvanceBody {
  pub status: DeliveryStatus,
}

/// `POST /requisitions/:id/notifications/:donor_id/advance` — delivery/read
/// receipt from the transport or the client app. Non-forward advancements
/// are no-ops.
pub async fn advance_notification<S, T>(
  State(engine): State<Arc<Engine<S, T>>>,
  Path((id, donor_id)): Path<(Uuid, Uuid)>,
  Json(body): Json<AdvanceBody>,
) -> Result<Json<DonorNotification>, ApiError>
where
  S: LifelinkStore + 'static,
  T: NotificationTransport,
{
  let row = engine
    .store()
    .advance_notification(id, donor_id, body.status)
    .await
    .map_err(Error::from_store)?;
  Ok(Json(row))
}
