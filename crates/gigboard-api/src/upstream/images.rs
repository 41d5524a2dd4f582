//! Cloudinary-compatible image host client.
//!
//! Uploads and deletions are signed with SHA-256 over the sorted request
//! parameters plus the API secret. Transport failures that look like a
//! dropped connection are retried according to the configured
//! [`RetryPolicy`]; HTTP error statuses are not retried.

use std::{future::Future, io, time::Duration};

use bytes::Bytes;
use chrono::Utc;
use gigboard_core::account::Avatar;
use reqwest::{
  Client,
  multipart::{Form, Part},
};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::{UpstreamError, read_json};
use crate::config::{ImageHostConfig, RetryPolicy};

const SERVICE: &str = "image host";

#[derive(Debug, Deserialize)]
struct UploadResponse {
  public_id:  String,
  secure_url: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
  result: String,
}

#[derive(Clone)]
pub struct ImageHost {
  http:   Client,
  config: ImageHostConfig,
}

impl ImageHost {
  pub fn new(config: ImageHostConfig) -> Result<Self, UpstreamError> {
    let http = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|source| UpstreamError::Transport { service: SERVICE, source })?;
    Ok(Self { http, config })
  }

  fn endpoint(&self, action: &str) -> String {
    format!(
      "{}/v1_1/{}/image/{action}",
      self.config.base_url.trim_end_matches('/'),
      self.config.cloud_name
    )
  }

  /// Hex SHA-256 of `k=v&k=v…` (keys sorted) followed by the API secret.
  fn sign(&self, params: &[(&str, &str)]) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by_key(|(k, _)| *k);
    let joined = sorted
      .iter()
      .map(|(k, v)| format!("{k}={v}"))
      .collect::<Vec<_>>()
      .join("&");
    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(self.config.api_secret.as_bytes());
    hex::encode(hasher.finalize())
  }

  /// Upload an image and return where it lives and how to delete it.
  pub async fn upload(
    &self,
    bytes: Bytes,
    filename: String,
    content_type: String,
  ) -> Result<Avatar, UpstreamError> {
    let timestamp = Utc::now().timestamp().to_string();
    let signature = self.sign(&[("timestamp", timestamp.as_str())]);
    let url = self.endpoint("upload");

    let uploaded: UploadResponse = with_retry(&self.config.retry, "image upload", || {
      let form = Part::bytes(bytes.to_vec())
        .file_name(filename.clone())
        .mime_str(&content_type)
        .map(|part| {
          Form::new()
            .part("file", part)
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp.clone())
            .text("signature", signature.clone())
            .text("signature_algorithm", "sha256")
        });
      let request = form.map(|form| self.http.post(&url).multipart(form));
      async move {
        let request = request.map_err(|source| UpstreamError::Transport { service: SERVICE, source })?;
        let resp = request
          .send()
          .await
          .map_err(|source| UpstreamError::Transport { service: SERVICE, source })?;
        read_json(SERVICE, resp).await
      }
    })
    .await?;

    tracing::debug!(delete_id = %uploaded.public_id, "image uploaded");
    Ok(Avatar {
      url:       uploaded.secure_url,
      delete_id: uploaded.public_id,
    })
  }

  /// Delete a previously uploaded image. An already-missing image counts as
  /// deleted.
  pub async fn delete(&self, delete_id: &str) -> Result<(), UpstreamError> {
    let timestamp = Utc::now().timestamp().to_string();
    let signature = self.sign(&[("public_id", delete_id), ("timestamp", timestamp.as_str())]);
    let url = self.endpoint("destroy");

    let destroyed: DestroyResponse = with_retry(&self.config.retry, "image delete", || {
      let request = self.http.post(&url).form(&[
        ("public_id", delete_id),
        ("timestamp", timestamp.as_str()),
        ("api_key", self.config.api_key.as_str()),
        ("signature", signature.as_str()),
        ("signature_algorithm", "sha256"),
      ]);
      async move {
        let resp = request
          .send()
          .await
          .map_err(|source| UpstreamError::Transport { service: SERVICE, source })?;
        read_json(SERVICE, resp).await
      }
    })
    .await?;

    match destroyed.result.as_str() {
      "ok" | "not found" => Ok(()),
      other => Err(UpstreamError::Rejected {
        service: SERVICE,
        reason:  format!("destroy result {other:?}"),
      }),
    }
  }
}

/// Whether a transport failure is worth another attempt: connect failures,
/// timeouts, and connections reset or aborted mid-request.
pub fn is_retryable(err: &reqwest::Error) -> bool {
  if err.is_connect() || err.is_timeout() {
    return true;
  }
  let mut source = std::error::Error::source(err);
  while let Some(inner) = source {
    if let Some(io_err) = inner.downcast_ref::<io::Error>() {
      return matches!(
        io_err.kind(),
        io::ErrorKind::ConnectionReset
          | io::ErrorKind::ConnectionAborted
          | io::ErrorKind::BrokenPipe
      );
    }
    source = inner.source();
  }
  false
}

/// Run `attempt` up to `policy.max_attempts` times, sleeping `policy.delay`
/// between tries, as long as the failure is a retryable transport error.
pub async fn with_retry<T, F, Fut>(
  policy: &RetryPolicy,
  operation: &str,
  mut attempt: F,
) -> Result<T, UpstreamError>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T, UpstreamError>>,
{
  let max_attempts = policy.max_attempts.max(1);
  let mut tried = 1;
  loop {
    match attempt().await {
      Err(UpstreamError::Transport { source, .. })
        if tried < max_attempts && is_retryable(&source) =>
      {
        tracing::warn!(
          attempt = tried,
          max_attempts,
          error = %source,
          "{operation} failed, retrying in {:?}",
          policy.delay()
        );
        tokio::time::sleep(policy.delay()).await;
        tried += 1;
      }
      other => return other,
    }
  }
}
