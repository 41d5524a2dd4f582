//! Credential issue and verification (HS256 JWT).
//!
//! Expiry is checked here rather than by `jsonwebtoken` so that the clock can
//! be injected and so that signature and shape failures always win over
//! expiry: a forged or malformed credential is [`TokenError::Invalid`], never
//! [`TokenError::Expired`].

use chrono::{DateTime, Duration, Utc};
use gigboard_core::{DocId, account::Role};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AuthConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
  Access,
  Refresh,
}

/// The role asserted by a credential. `Admin` is never stored on an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimRole {
  Freelancer,
  Employer,
  Admin,
}

impl From<Role> for ClaimRole {
  fn from(r: Role) -> Self {
    match r {
      Role::Freelancer => ClaimRole::Freelancer,
      Role::Employer => ClaimRole::Employer,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  /// Account id; absent on admin credentials.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sub:  Option<DocId>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub role: Option<ClaimRole>,
  pub kind: TokenKind,
  pub iat:  i64,
  pub exp:  i64,
  /// Unique per credential so two issued in the same second differ.
  pub jti:  String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
  #[error("token expired")]
  Expired,
  #[error("invalid token: {0}")]
  Invalid(String),
  #[error("failed to sign token: {0}")]
  Signing(String),
  #[error("invalid token lifetime: {0}")]
  Lifetime(String),
}

/// An access + refresh credential pair.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
  pub access_token:  String,
  pub refresh_token: String,
}

/// A configured lifetime in seconds. Rejects values that would put expiry
/// outside the representable date range.
fn lifetime(name: &str, secs: u64) -> Result<Duration, TokenError> {
  let out_of_range = || TokenError::Lifetime(format!("{name} = {secs} is out of range"));
  let delta = i64::try_from(secs)
    .ok()
    .and_then(Duration::try_seconds)
    .ok_or_else(out_of_range)?;
  Utc::now().checked_add_signed(delta).ok_or_else(out_of_range)?;
  Ok(delta)
}

/// Creates and checks signed credentials with a shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
  encoding_key: EncodingKey,
  decoding_key: DecodingKey,
  access_ttl:   Duration,
  refresh_ttl:  Duration,
}

impl TokenIssuer {
  pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
    Self {
      encoding_key: EncodingKey::from_secret(secret.as_bytes()),
      decoding_key: DecodingKey::from_secret(secret.as_bytes()),
      access_ttl,
      refresh_ttl,
    }
  }

  pub fn from_config(cfg: &AuthConfig) -> Result<Self, TokenError> {
    Ok(Self::new(
      &cfg.secret,
      lifetime("access_ttl_secs", cfg.access_ttl_secs)?,
      lifetime("refresh_ttl_secs", cfg.refresh_ttl_secs)?,
    ))
  }

  pub fn ttl(&self, kind: TokenKind) -> Duration {
    match kind {
      TokenKind::Access => self.access_ttl,
      TokenKind::Refresh => self.refresh_ttl,
    }
  }

  pub fn issue(
    &self,
    subject: Option<DocId>,
    role: Option<ClaimRole>,
    kind: TokenKind,
  ) -> Result<String, TokenError> {
    self.issue_at(subject, role, kind, Utc::now())
  }

  /// Issue a credential as if the current time were `now`.
  pub fn issue_at(
    &self,
    subject: Option<DocId>,
    role: Option<ClaimRole>,
    kind: TokenKind,
    now: DateTime<Utc>,
  ) -> Result<String, TokenError> {
    let claims = Claims {
      sub: subject,
      role,
      kind,
      iat: now.timestamp(),
      exp: now
        .checked_add_signed(self.ttl(kind))
        .ok_or_else(|| TokenError::Lifetime("expiry is out of range".into()))?
        .timestamp(),
      jti: DocId::generate().to_string(),
    };
    encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
      .map_err(|e| TokenError::Signing(e.to_string()))
  }

  /// Issue an access + refresh pair for the same subject and role.
  pub fn issue_pair(
    &self,
    subject: Option<DocId>,
    role: Option<ClaimRole>,
  ) -> Result<TokenPair, TokenError> {
    Ok(TokenPair {
      access_token:  self.issue(subject, role, TokenKind::Access)?,
      refresh_token: self.issue(subject, role, TokenKind::Refresh)?,
    })
  }

  pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
    self.verify_at(token, kind, Utc::now())
  }

  /// Verify a credential as if the current time were `now`. Expired when
  /// `now >= exp`; there is no leeway.
  pub fn verify_at(
    &self,
    token: &str,
    kind: TokenKind,
    now: DateTime<Utc>,
  ) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.leeway = 0;

    let claims = decode::<Claims>(token, &self.decoding_key, &validation)
      .map_err(|e| TokenError::Invalid(e.to_string()))?
      .claims;

    if claims.kind != kind {
      return Err(TokenError::Invalid(format!(
        "expected {kind:?} credential, got {:?}",
        claims.kind
      )));
    }
    if now.timestamp() >= claims.exp {
      return Err(TokenError::Expired);
    }
    Ok(claims)
  }
}
