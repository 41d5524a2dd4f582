//! Clients for third-party services: the image host that stores avatars and
//! the OAuth identity provider behind Google login.

pub mod identity;
pub mod images;

use reqwest::Response;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum UpstreamError {
  #[error("{service} transport error: {source}")]
  Transport {
    service: &'static str,
    #[source]
    source:  reqwest::Error,
  },

  #[error("{service} responded {status}: {body}")]
  Status {
    service: &'static str,
    status:  u16,
    body:    String,
  },

  #[error("{service} returned an unusable response: {reason}")]
  Rejected {
    service: &'static str,
    reason:  String,
  },
}

impl From<UpstreamError> for ApiError {
  fn from(e: UpstreamError) -> Self { ApiError::Upstream(e.to_string()) }
}

/// Decode a JSON body, turning non-2xx statuses into [`UpstreamError::Status`].
pub(crate) async fn read_json<T: DeserializeOwned>(
  service: &'static str,
  resp: Response,
) -> Result<T, UpstreamError> {
  let status = resp.status();
  if !status.is_success() {
    let body = resp.text().await.unwrap_or_default();
    return Err(UpstreamError::Status {
      service,
      status: status.as_u16(),
      body,
    });
  }
  resp
    .json()
    .await
    .map_err(|source| UpstreamError::Transport { service, source })
}
