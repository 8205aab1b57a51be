//! Handlers for `/donors` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST`  | `/donors` | Body: [`NewDonor`]; returns 201 |
//! | `GET`   | `/donors/search` | `?blood_group` required; `location`, `limit` optional |
//! | `GET`   | `/donors/:id` | 404 if not found |
//! | `PATCH` | `/donors/:id` | Body: [`DonorUpdate`]; partial edit |
//! | `GET`   | `/donors/:id/eligibility` | Cooldown verdict |
//! | `GET`   | `/donors/:id/donations` | Ledger, newest first |
//! | `POST`  | `/donors/:id/donations` | Body: [`NewDonation`]; returns 201 |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use lifelink_core::{
  blood::BloodGroup,
  donor::{
    BloodDonation, DonorCandidate, DonorProfile, DonorUpdate, NewDonation,
    NewDonor,
  },
  eligibility::Eligibility,
  store::LifelinkStore,
};
use lifelink_engine::{Engine, NotificationTransport};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

// ─── Register ─────────────────────────────────────────────────────────────────

/// `POST /donors` — returns 201 + the stored profile.
pub async fn register<S, T>(
  State(engine): State<Arc<Engine<S, T>>>,
  Json(body): Json<NewDonor>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LifelinkStore + 'static,
  T: NotificationTransport,
{
  let profile = engine.register_donor(body).await?;
  Ok((StatusCode::CREATED, Json(profile)))
}

// ─── Search ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SearchParams {
  pub blood_group: BloodGroup,
  pub location:    Option<String>,
  pub limit:       Option<usize>,
}

/// `GET /donors/search?blood_group=O%2B[&location=...][&limit=...]` — the
/// pre-submission preview: compatible donors for a required group, with
/// almost-eligible ones flagged by their attached eligibility.
pub async fn search<S, T>(
  State(engine): State<Arc<Engine<S, T>>>,
  Query(params): Query<SearchParams>,
) -> Result<Json<Vec<DonorCandidate>>, ApiError>
where
  S: LifelinkStore + 'static,
  T: NotificationTransport,
{
  let limit = params.limit.unwrap_or(50).clamp(1, 200);
  let hits = engine
    .search_donors(params.blood_group, params.location, limit)
    .await?;
  Ok(Json(hits))
}

// ─── Get / update ─────────────────────────────────────────────────────────────

/// `GET /donors/:id`
pub async fn get_one<S, T>(
  State(engine): State<Arc<Engine<S, T>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<DonorProfile>, ApiError>
where
  S: LifelinkStore + 'static,
  T: NotificationTransport,
{
  Ok(Json(engine.get_donor(id).await?))
}

/// `PATCH /donors/:id` — fields absent from the body are untouched.
pub async fn update<S, T>(
  State(engine): State<Arc<Engine<S, T>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<DonorUpdate>,
) -> Result<Json<DonorProfile>, ApiError>
where
  S: LifelinkStore + 'static,
  T: NotificationTransport,
{
  Ok(Json(engine.update_donor(id, body).await?))
}

// ─── Eligibility ──────────────────────────────────────────────────────────────

/// `GET /donors/:id/eligibility`
pub async fn eligibility<S, T>(
  State(engine): State<Arc<Engine<S, T>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Eligibility>, ApiError>
where
  S: LifelinkStore + 'static,
  T: NotificationTransport,
{
  Ok(Json(engine.donor_eligibility(id).await?))
}

// ─── Donations ────────────────────────────────────────────────────────────────

/// `GET /donors/:id/donations`
pub async fn donations<S, T>(
  State(engine): State<Arc<Engine<S, T>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<BloodDonation>>, ApiError>
where
  S: LifelinkStore + 'static,
  T: NotificationTransport,
{
  Ok(Json(engine.donations_for(id).await?))
}

/// `POST /donors/:id/donations` — returns 201 + the ledger entry.
pub async fn record_donation<S, T>(
  State(engine): State<Arc<Engine<S, T>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<NewDonation>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LifelinkStore + 'static,
  T: NotificationTransport,
{
  let donation = engine.record_donation(id, body).await?;
  Ok((StatusCode::CREATED, Json(donation)))
}
