//! Runtime configuration, deserialised from `config.toml` layered under
//! `GIGBOARD_*` environment variables.

use std::{path::PathBuf, time::Duration};

use serde::Deserialize;

/// Build mode. Error bodies carry a `stack` everywhere except `Production`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
  #[default]
  Development,
  Production,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:        String,
  #[serde(default = "default_port")]
  pub port:        u16,
  #[serde(default)]
  pub environment: Environment,
  #[serde(default = "default_store_path")]
  pub store_path:  PathBuf,
  pub auth:        AuthConfig,
  #[serde(default)]
  pub image_host:  ImageHostConfig,
  #[serde(default)]
  pub oauth:       OAuthConfig,
}

/// Signing secret, credential lifetimes and the static admin identity.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
  pub secret:              String,
  #[serde(default = "default_access_ttl")]
  pub access_ttl_secs:     u64,
  #[serde(default = "default_refresh_ttl")]
  pub refresh_ttl_secs:    u64,
  pub admin_username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub admin_password_hash: String,
}

/// Fixed-delay retry for the image host; see [`crate::upstream::images`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RetryPolicy {
  pub max_attempts: u32,
  pub delay_ms:     u64,
}

impl RetryPolicy {
  pub fn delay(&self) -> Duration { Duration::from_millis(self.delay_ms) }
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 3,
      delay_ms:     2_000,
    }
  }
}

/// Cloudinary-compatible image host credentials.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImageHostConfig {
  pub base_url:     String,
  pub cloud_name:   String,
  pub api_key:      String,
  pub api_secret:   String,
  pub timeout_secs: u64,
  pub retry:        RetryPolicy,
}

impl Default for ImageHostConfig {
  fn default() -> Self {
    Self {
      base_url:     "https://api.cloudinary.com".into(),
      cloud_name:   String::new(),
      api_key:      String::new(),
      api_secret:   String::new(),
      timeout_secs: 30,
      retry:        RetryPolicy::default(),
    }
  }
}

/// Endpoint that turns an OAuth access token into `{email, name}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
  pub userinfo_url: String,
  pub timeout_secs: u64,
}

impl Default for OAuthConfig {
  fn default() -> Self {
    Self {
      userinfo_url: "https://www.googleapis.com/oauth2/v3/userinfo".into(),
      timeout_secs: 15,
    }
  }
}

fn default_host() -> String { "127.0.0.1".into() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("gigboard.sqlite3") }

fn default_access_ttl() -> u64 { 24 * 60 * 60 }

fn default_refresh_ttl() -> u64 { 30 * 24 * 60 * 60 }

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn minimal_config_fills_defaults() {
    let cfg: ServerConfig = serde_json::from_value(serde_json::json!({
      "auth": {
        "secret": "s3cret",
        "admin_username": "admin",
        "admin_password_hash": "$argon2id$stub",
      }
    }))
    .unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.environment, Environment::Development);
    assert_eq!(cfg.auth.access_ttl_secs, 86_400);
    assert_eq!(cfg.image_host.retry, RetryPolicy { max_attempts: 3, delay_ms: 2_000 });
    assert!(cfg.oauth.userinfo_url.starts_with("https://"));
  }
}
