//! Success envelope: `{message, data, pagination?}`.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use gigboard_core::page::{Page, PageQuery, Pagination};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
  pub message:    String,
  pub data:       T,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub pagination: Option<Pagination>,
  #[serde(skip)]
  status:         StatusCode,
}

impl<T: Serialize> Envelope<T> {
  pub fn ok(message: impl Into<String>, data: T) -> Self {
    Self {
      message: message.into(),
      data,
      pagination: None,
      status: StatusCode::OK,
    }
  }

  pub fn created(message: impl Into<String>, data: T) -> Self {
    Self {
      status: StatusCode::CREATED,
      ..Self::ok(message, data)
    }
  }
}

impl<T: Serialize> Envelope<Vec<T>> {
  /// A page of results with its pagination metadata.
  pub fn page(message: impl Into<String>, page: Page<T>, query: &PageQuery) -> Self {
    Self {
      pagination: Some(Pagination::new(page.total, query)),
      ..Self::ok(message, page.items)
    }
  }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
  fn into_response(self) -> Response { (self.status, Json(&self)).into_response() }
}
