//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every engine error becomes a JSON body of the form
//! `{"error": "<message>", "code": "<STABLE_CODE>"}` so clients branch on
//! the code, never the text.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use lifelink_core::Error as DomainError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub lifelink_engine::Error);

fn status_for(error: &lifelink_engine::Error) -> StatusCode {
  match error {
    lifelink_engine::Error::Domain(domain) => match domain {
      DomainError::Validation(_) => StatusCode::BAD_REQUEST,
      DomainError::DonorNotFound(_) | DomainError::RequisitionNotFound(_) => {
        StatusCode::NOT_FOUND
      }
      DomainError::InvalidTransition { .. }
      | DomainError::RequisitionNotActive { .. }
      | DomainError::NotNotified { .. } => StatusCode::CONFLICT,
      DomainError::NotRequester { .. } => StatusCode::FORBIDDEN,
      DomainError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    },
    lifelink_engine::Error::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = status_for(&self.0);
    let body = json!({
      "error": self.0.to_string(),
      "code": self.0.code(),
    });
    (status, Json(body)).into_response()
  }
}
