//! JSON REST API for LifeLink.
//!
//! Exposes an axum [`Router`] backed by a [`lifelink_engine::Engine`] over
//! any store/transport pair. Auth, TLS, and transport concerns are the
//! caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", lifelink_api::api_router(engine.clone()))
//! ```

pub mod donors;
pub mod error;
pub mod requisitions;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use lifelink_core::store::LifelinkStore;
use lifelink_engine::{Engine, NotificationTransport};

pub use error::ApiError;

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, T>(engine: Arc<Engine<S, T>>) -> Router<()>
where
  S: LifelinkStore + 'static,
  T: NotificationTransport,
{
  Router::new()
    // Requisitions
    .route(
      "/requisitions",
      post(requisitions::create::<S, T>).get(requisitions::list_mine::<S, T>),
    )
    .route("/requisitions/discover", get(requisitions::discover::<S, T>))
    .route("/requisitions/{id}", get(requisitions::get_one::<S, T>))
    .route("/requisitions/{id}/cancel", post(requisitions::cancel::<S, T>))
    .route("/requisitions/{id}/fulfil", post(requisitions::fulfil::<S, T>))
    .route("/requisitions/{id}/notify", post(requisitions::notify::<S, T>))
    .route(
      "/requisitions/{id}/retry-dispatch",
      post(requisitions::retry_dispatch::<S, T>),
    )
    .route("/requisitions/{id}/respond", post(requisitions::respond::<S, T>))
    .route(
      "/requisitions/{id}/notifications",
      get(requisitions::notifications::<S, T>),
    )
    .route(
      "/requisitions/{id}/notifications/{donor_id}/advance",
      post(requisitions::advance_notification::<S, T>),
    )
    // Donors
    .route("/donors", post(donors::register::<S, T>))
    .route("/donors/search", get(donors::search::<S, T>))
    .route(
      "/donors/{id}",
      get(donors::get_one::<S, T>).patch(donors::update::<S, T>),
    )
    .route("/donors/{id}/eligibility", get(donors::eligibility::<S, T>))
    .route(
      "/donors/{id}/donations",
      get(donors::donations::<S, T>).post(donors::record_donation::<S, T>),
    )
    .with_state(engine)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use lifelink_engine::{EngineConfig, LogTransport};
  use lifelink_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;
  use uuid::Uuid;

  async fn test_router() -> Router {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let engine = Engine::new(
      Arc::new(store),
      Arc::new(LogTransport),
      EngineConfig::default(),
    );
    api_router(Arc::new(engine))
  }

  async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
      Some(v) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    let response = router
      .clone()
      .oneshot(builder.body(body).unwrap())
      .await
      .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
      .await
      .unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  fn donor_body(group: &str) -> Value {
    json!({
      "display_name": "Test Donor",
      "blood_group": group,
      "location": { "city": "Karachi", "state": "Sindh" },
    })
  }

  fn requisition_body(requester_id: Uuid, group: &str, units: u32) -> Value {
    json!({
      "requester_id": requester_id,
      "patient_name": "A. Patient",
      "hospital_name": "City Hospital",
      "contact_number": "+92-300-0000000",
      "blood_group": group,
      "units_needed": units,
      "urgency": "high",
      "location": { "city": "Karachi", "state": "Sindh" },
      "required_by": (chrono::Utc::now() + chrono::Duration::days(1)).to_rfc3339(),
    })
  }

  // ── Creation & validation ───────────────────────────────────────────────────

  #[tokio::test]
  async fn create_requisition_returns_201() {
    let router = test_router().await;
    let (status, body) = send(
      &router,
      "POST",
      "/requisitions",
      Some(requisition_body(Uuid::new_v4(), "O+", 2)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "active");
    assert_eq!(body["willing_donors"], 0);
  }

  #[tokio::test]
  async fn create_requisition_with_zero_units_is_400_with_stable_code() {
    let router = test_router().await;
    let (status, body) = send(
      &router,
      "POST",
      "/requisitions",
      Some(requisition_body(Uuid::new_v4(), "O+", 0)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
  }

  #[tokio::test]
  async fn get_missing_requisition_is_404() {
    let router = test_router().await;
    let (status, body) =
      send(&router, "GET", &format!("/requisitions/{}", Uuid::new_v4()), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "REQUISITION_NOT_FOUND");
  }

  // ── End-to-end flow ─────────────────────────────────────────────────────────

  #[tokio::test]
  async fn notify_respond_fulfil_flow() {
    let router = test_router().await;
    let requester = Uuid::new_v4();

    let mut donor_ids = Vec::new();
    for _ in 0..3 {
      let (status, body) =
        send(&router, "POST", "/donors", Some(donor_body("O+"))).await;
      assert_eq!(status, StatusCode::CREATED);
      donor_ids.push(body["donor_id"].as_str().unwrap().to_owned());
    }

    let (_, requisition) = send(
      &router,
      "POST",
      "/requisitions",
      Some(requisition_body(requester, "O+", 2)),
    )
    .await;
    let requisition_id = requisition["requisition_id"].as_str().unwrap();

    // Fan-out notifies all three; a second call skips them all.
    let (status, report) = send(
      &router,
      "POST",
      &format!("/requisitions/{requisition_id}/notify"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["notified"], 3);
    let (_, again) = send(
      &router,
      "POST",
      &format!("/requisitions/{requisition_id}/notify"),
      None,
    )
    .await;
    assert_eq!(again["notified"], 0);
    assert_eq!(again["skipped"], 3);

    // Two WILLING responses reach the threshold.
    let (_, first) = send(
      &router,
      "POST",
      &format!("/requisitions/{requisition_id}/respond"),
      Some(json!({ "donor_id": donor_ids[0], "response": "willing" })),
    )
    .await;
    assert_eq!(first["requisition_status"], "active");

    let (_, second) = send(
      &router,
      "POST",
      &format!("/requisitions/{requisition_id}/respond"),
      Some(json!({ "donor_id": donor_ids[1], "response": "willing" })),
    )
    .await;
    assert_eq!(second["requisition_status"], "fulfilled");
    assert_eq!(second["triggered_fulfillment"], true);

    // The late third response is accepted without re-triggering.
    let (status, third) = send(
      &router,
      "POST",
      &format!("/requisitions/{requisition_id}/respond"),
      Some(json!({ "donor_id": donor_ids[2], "response": "willing" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(third["triggered_fulfillment"], false);
    assert_eq!(third["willing_donors"], 3);

    let (_, fetched) = send(
      &router,
      "GET",
      &format!("/requisitions/{requisition_id}"),
      None,
    )
    .await;
    assert_eq!(fetched["status"], "fulfilled");
    assert_eq!(fetched["willing_donors"], 3);
  }

  #[tokio::test]
  async fn respond_without_notification_is_409() {
    let router = test_router().await;
    let (_, donor) =
      send(&router, "POST", "/donors", Some(donor_body("A+"))).await;
    let (_, requisition) = send(
      &router,
      "POST",
      "/requisitions",
      Some(requisition_body(Uuid::new_v4(), "A+", 1)),
    )
    .await;

    let (status, body) = send(
      &router,
      "POST",
      &format!(
        "/requisitions/{}/respond",
        requisition["requisition_id"].as_str().unwrap()
      ),
      Some(json!({
        "donor_id": donor["donor_id"],
        "response": "willing",
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "NOT_NOTIFIED");
  }

  #[tokio::test]
  async fn cancel_is_requester_only_and_blocks_responses() {
    let router = test_router().await;
    let requester = Uuid::new_v4();
    let (_, donor) =
      send(&router, "POST", "/donors", Some(donor_body("B+"))).await;
    let (_, requisition) = send(
      &router,
      "POST",
      "/requisitions",
      Some(requisition_body(requester, "B+", 1)),
    )
    .await;
    let requisition_id = requisition["requisition_id"].as_str().unwrap();
    send(
      &router,
      "POST",
      &format!("/requisitions/{requisition_id}/notify"),
      None,
    )
    .await;

    let (status, body) = send(
      &router,
      "POST",
      &format!("/requisitions/{requisition_id}/cancel"),
      Some(json!({ "requester_id": Uuid::new_v4() })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "NOT_REQUESTER");

    let (status, _) = send(
      &router,
      "POST",
      &format!("/requisitions/{requisition_id}/cancel"),
      Some(json!({ "requester_id": requester })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
      &router,
      "POST",
      &format!("/requisitions/{requisition_id}/respond"),
      Some(json!({
        "donor_id": donor["donor_id"],
        "response": "willing",
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "REQUISITION_NOT_ACTIVE");

    // Cancelling twice is a lifecycle conflict, not a silent no-op.
    let (status, body) = send(
      &router,
      "POST",
      &format!("/requisitions/{requisition_id}/cancel"),
      Some(json!({ "requester_id": requester })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_TRANSITION");
  }

  // ── Donors ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn donor_search_flags_eligibility() {
    let router = test_router().await;
    send(&router, "POST", "/donors", Some(donor_body("O-"))).await;
    let (_, resting) =
      send(&router, "POST", "/donors", Some(donor_body("O+"))).await;
    let resting_id = resting["donor_id"].as_str().unwrap();

    let donated_on =
      (chrono::Utc::now() - chrono::Duration::days(30)).date_naive();
    let (status, _) = send(
      &router,
      "POST",
      &format!("/donors/{resting_id}/donations"),
      Some(json!({ "donated_on": donated_on, "units": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, hits) = send(
      &router,
      "GET",
      "/donors/search?blood_group=O%2B&location=karachi",
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let hits = hits.as_array().unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0]["eligibility"]["is_eligible"], true);
    assert_eq!(hits[1]["eligibility"]["is_eligible"], false);
    assert_eq!(hits[1]["profile"]["donor_id"].as_str().unwrap(), resting_id);

    let (_, eligibility) = send(
      &router,
      "GET",
      &format!("/donors/{resting_id}/eligibility"),
      None,
    )
    .await;
    assert_eq!(eligibility["is_eligible"], false);
    assert_eq!(eligibility["days_since_last_donation"], 30);
  }

  #[tokio::test]
  async fn discover_feed_follows_donor_compatibility() {
    let router = test_router().await;
    let requester = Uuid::new_v4();
    let (_, donor) =
      send(&router, "POST", "/donors", Some(donor_body("B-"))).await;
    let donor_id = donor["donor_id"].as_str().unwrap();

    let (_, compatible) = send(
      &router,
      "POST",
      "/requisitions",
      Some(requisition_body(requester, "B+", 1)),
    )
    .await;
    send(
      &router,
      "POST",
      "/requisitions",
      Some(requisition_body(requester, "O-", 1)),
    )
    .await;

    let (status, feed) = send(
      &router,
      "GET",
      &format!("/requisitions/discover?donor_id={donor_id}"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let feed = feed.as_array().unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(
      feed[0]["requisition_id"],
      compatible["requisition_id"]
    );
  }

  #[tokio::test]
  async fn notification_receipts_advance_monotonically() {
    let router = test_router().await;
    let (_, donor) =
      send(&router, "POST", "/donors", Some(donor_body("AB+"))).await;
    let donor_id = donor["donor_id"].as_str().unwrap();
    let (_, requisition) = send(
      &router,
      "POST",
      "/requisitions",
      Some(requisition_body(Uuid::new_v4(), "AB+", 1)),
    )
    .await;
    let requisition_id = requisition["requisition_id"].as_str().unwrap();
    send(
      &router,
      "POST",
      &format!("/requisitions/{requisition_id}/notify"),
      None,
    )
    .await;

    let (status, row) = send(
      &router,
      "POST",
      &format!(
        "/requisitions/{requisition_id}/notifications/{donor_id}/advance"
      ),
      Some(json!({ "status": "read" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(row["status"], "read");

    // A stale receipt does not move the row backward.
    let (_, row) = send(
      &router,
      "POST",
      &format!(
        "/requisitions/{requisition_id}/notifications/{donor_id}/advance"
      ),
      Some(json!({ "status": "delivered" })),
    )
    .await;
    assert_eq!(row["status"], "read");

    let (_, rows) = send(
      &router,
      "GET",
      &format!("/requisitions/{requisition_id}/notifications"),
      None,
    )
    .await;
    assert_eq!(rows.as_array().unwrap().len(), 1);
  }
}
