//! OAuth identity lookup: exchange a provider access token for the email and
//! display name of the person it was issued to.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::{UpstreamError, read_json};
use crate::{config::OAuthConfig, error::ApiError};

const SERVICE: &str = "identity provider";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExternalIdentity {
  pub email: String,
  #[serde(default)]
  pub name:  Option<String>,
}

impl ExternalIdentity {
  /// The provider's display name, or the local part of the email.
  pub fn display_name(&self) -> String {
    match self.name.as_deref().map(str::trim) {
      Some(name) if !name.is_empty() => name.to_owned(),
      _ => self.email.split('@').next().unwrap_or_default().to_owned(),
    }
  }
}

#[derive(Clone)]
pub struct IdentityProvider {
  http:         Client,
  userinfo_url: String,
}

impl IdentityProvider {
  pub fn new(config: &OAuthConfig) -> Result<Self, UpstreamError> {
    let http = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|source| UpstreamError::Transport { service: SERVICE, source })?;
    Ok(Self {
      http,
      userinfo_url: config.userinfo_url.clone(),
    })
  }

  /// A token the provider refuses is the caller's fault (401); anything else
  /// going wrong upstream is a 502.
  pub async fn fetch(&self, access_token: &str) -> Result<ExternalIdentity, ApiError> {
    let resp = self
      .http
      .get(&self.userinfo_url)
      .bearer_auth(access_token)
      .send()
      .await
      .map_err(|source| UpstreamError::Transport { service: SERVICE, source })?;

    if matches!(resp.status(), StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
      return Err(ApiError::Unauthorized("invalid google token".into()));
    }

    let identity: ExternalIdentity = read_json(SERVICE, resp).await?;
    if identity.email.trim().is_empty() {
      return Err(ApiError::Unauthorized("google account has no email".into()));
    }
    Ok(identity)
  }
}
