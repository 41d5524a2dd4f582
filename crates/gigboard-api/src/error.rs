//! API error taxonomy and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure renders as `{"statusCode": .., "message": ..}`. The error's
//! debug rendering travels in the response extensions as an [`ErrorTrace`];
//! [`attach_error_trace`] copies it into the body as `stack` outside
//! production.

use axum::{
  Json,
  body::Body,
  http::{StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

use crate::token::TokenError;

/// An error returned by a middleware stage or handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// Malformed input; lists every violated constraint.
  #[error("{0}")]
  Validation(String),

  /// Missing, expired or invalid credential, or wrong login credentials.
  #[error("{0}")]
  Unauthorized(String),

  /// Valid identity without the required privilege or account status.
  #[error("{0}")]
  Forbidden(String),

  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  Conflict(String),

  /// Request body or upload over its size cap.
  #[error("{0}")]
  PayloadTooLarge(String),

  /// A third-party service failed after any retries.
  #[error("upstream error: {0}")]
  Upstream(String),

  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Validation(_) => StatusCode::BAD_REQUEST,
      ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
      ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Conflict(_) => StatusCode::CONFLICT,
      ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
      ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
      ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  pub fn internal(message: impl Into<String>) -> Self {
    let message: String = message.into();
    ApiError::Internal(message.into())
  }

  /// Convert a storage error, keeping uniqueness violations user-visible.
  pub fn store<E: Into<gigboard_core::Error>>(e: E) -> Self {
    match e.into() {
      gigboard_core::Error::Conflict(msg) => ApiError::Conflict(msg),
      gigboard_core::Error::InvalidId(id) => {
        ApiError::Validation(format!("invalid id {id:?}"))
      }
      other => ApiError::Internal(Box::new(other)),
    }
  }

  /// Replace the backend's wording of a constraint conflict.
  pub fn conflict_message(self, message: &str) -> Self {
    match self {
      ApiError::Conflict(_) => ApiError::Conflict(message.into()),
      other => other,
    }
  }
}

impl From<TokenError> for ApiError {
  fn from(e: TokenError) -> Self {
    match e {
      TokenError::Expired => ApiError::Unauthorized("token expired".into()),
      TokenError::Invalid(reason) => {
        ApiError::Unauthorized(format!("invalid token: {reason}"))
      }
      TokenError::Signing(reason) | TokenError::Lifetime(reason) => ApiError::internal(reason),
    }
  }
}

/// Debug rendering of an error plus its source chain.
#[derive(Debug, Clone)]
pub struct ErrorTrace(pub String);

impl ErrorTrace {
  fn of(err: &(dyn std::error::Error + 'static)) -> Self {
    let mut trace = format!("{err:?}");
    let mut source = err.source();
    while let Some(inner) = source {
      trace.push_str(&format!("\ncaused by: {inner}"));
      source = inner.source();
    }
    Self(trace)
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = ?self, "request failed");
    }
    let trace = ErrorTrace::of(&self);
    let body = json!({
      "statusCode": status.as_u16(),
      "message": self.to_string(),
    });
    let mut res = (status, Json(body)).into_response();
    res.extensions_mut().insert(trace);
    res
  }
}

/// Response mapper that adds `stack` to error bodies. Mounted only when not
/// running in production.
pub async fn attach_error_trace(res: Response) -> Response {
  let Some(ErrorTrace(trace)) = res.extensions().get::<ErrorTrace>().cloned() else {
    return res;
  };
  let (parts, body) = res.into_parts();
  let Ok(bytes) = axum::body::to_bytes(body, 64 * 1024).await else {
    return Response::from_parts(parts, Body::empty());
  };
  let mut value: Value = match serde_json::from_slice(&bytes) {
    Ok(v) => v,
    Err(_) => return Response::from_parts(parts, Body::from(bytes)),
  };
  if let Some(obj) = value.as_object_mut() {
    obj.insert("stack".into(), Value::String(trace));
  }
  let mut headers = parts.headers;
  headers.remove(header::CONTENT_LENGTH);
  let mut res = (parts.status, Json(value)).into_response();
  *res.headers_mut() = headers;
  res
}
