//! Registration, login, credential refresh, logout, Google login and admin
//! login.

use axum::extract::State;
use gigboard_core::{
  DocId,
  account::{Account, NewAccount, PublicAccount, Role},
  store::BoardStore,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
  AppState,
  auth::{Identity, IdentitySource, resolve_identity},
  error::ApiError,
  password::{hash_password, verify_password},
  response::Envelope,
  token::{ClaimRole, TokenKind},
  validate::{Valid, trim},
};

/// Attempts at swapping the stored refresh credential before giving up.
const SWAP_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
  #[serde(default, deserialize_with = "trim")]
  #[validate(length(min = 3, max = 50))]
  pub name:     String,
  #[serde(default)]
  #[validate(email)]
  pub email:    String,
  #[serde(default)]
  #[validate(length(min = 6, max = 128))]
  pub password: String,
  #[validate(length(min = 10, max = 15))]
  pub phone:    Option<String>,
  pub role:     Role,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
  #[serde(default)]
  #[validate(length(min = 1, message = "is required"))]
  pub email:    String,
  #[serde(default)]
  #[validate(length(min = 1, message = "is required"))]
  pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AdminLoginRequest {
  #[serde(default)]
  #[validate(length(min = 1, message = "is required"))]
  pub username: String,
  #[serde(default)]
  #[validate(length(min = 1, message = "is required"))]
  pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RefreshRequest {
  #[serde(default)]
  #[validate(length(min = 1, message = "is required"))]
  pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GoogleLoginRequest {
  #[serde(default)]
  #[validate(length(min = 1, message = "is required"))]
  pub access_token: String,
}

/// `data` of a successful login, refresh or Google login.
#[derive(Debug, Serialize)]
pub struct Session {
  pub id:            DocId,
  pub access_token:  String,
  pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct AdminSessionToken {
  pub access_token: String,
}

fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }

/// Issue a fresh pair for `account` and make its refresh credential the only
/// valid one.
async fn start_session<S: BoardStore>(
  state: &AppState<S>,
  account: &Account,
) -> Result<Session, ApiError> {
  let pair = state
    .tokens
    .issue_pair(Some(account.id), Some(ClaimRole::from(account.role)))?;

  let mut expected = account.refresh_token.clone();
  for _ in 0..SWAP_ATTEMPTS {
    let swapped = state
      .store
      .swap_refresh_token(account.id, expected, Some(pair.refresh_token.clone()))
      .await
      .map_err(ApiError::store)?;
    if swapped {
      return Ok(Session {
        id:            account.id,
        access_token:  pair.access_token,
        refresh_token: pair.refresh_token,
      });
    }
    expected = current_refresh_token(state, account.id).await?;
  }
  Err(ApiError::Conflict("session changed concurrently, try again".into()))
}

async fn current_refresh_token<S: BoardStore>(
  state: &AppState<S>,
  id: DocId,
) -> Result<Option<String>, ApiError> {
  let account = state
    .store
    .get_account(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("account not found".into()))?;
  Ok(account.refresh_token)
}

pub async fn register<S: BoardStore>(
  State(state): State<AppState<S>>,
  Valid(body): Valid<RegisterRequest>,
) -> Result<Envelope<PublicAccount>, ApiError> {
  let account = state
    .store
    .create_account(NewAccount {
      name:          body.name,
      email:         normalize_email(&body.email),
      phone:         body.phone,
      password_hash: Some(hash_password(&body.password)?),
      role:          body.role,
    })
    .await
    .map_err(|e| ApiError::store(e).conflict_message("email is already registered"))?;

  tracing::info!(account = %account.id, role = %account.role, "account registered");
  Ok(Envelope::created("account registered", account.into()))
}

pub async fn login<S: BoardStore>(
  State(state): State<AppState<S>>,
  Valid(body): Valid<LoginRequest>,
) -> Result<Envelope<Session>, ApiError> {
  let email = normalize_email(&body.email);
  let account = resolve_identity(
    &*state.store,
    &state.tokens,
    IdentitySource::ByCredentials { email: &email, password: &body.password },
  )
  .await?;
  let session = start_session(&state, &account).await?;
  Ok(Envelope::ok("login successful", session))
}

pub async fn refresh<S: BoardStore>(
  State(state): State<AppState<S>>,
  Valid(body): Valid<RefreshRequest>,
) -> Result<Envelope<Session>, ApiError> {
  let revoked = || ApiError::Unauthorized("refresh token has been revoked".into());

  let claims = state.tokens.verify(&body.refresh_token, TokenKind::Refresh)?;
  let id = claims
    .sub
    .ok_or_else(|| ApiError::Unauthorized("invalid token: no subject".into()))?;
  let account =
    resolve_identity(&*state.store, &state.tokens, IdentitySource::ByPriorContext(id)).await?;
  if account.refresh_token.as_deref() != Some(body.refresh_token.as_str()) {
    return Err(revoked());
  }

  let pair = state.tokens.issue_pair(Some(id), Some(ClaimRole::from(account.role)))?;
  let swapped = state
    .store
    .swap_refresh_token(id, Some(body.refresh_token), Some(pair.refresh_token.clone()))
    .await
    .map_err(ApiError::store)?;
  if !swapped {
    return Err(revoked());
  }

  Ok(Envelope::ok("token refreshed", Session {
    id,
    access_token: pair.access_token,
    refresh_token: pair.refresh_token,
  }))
}

pub async fn logout<S: BoardStore>(
  State(state): State<AppState<S>>,
  identity: Identity,
) -> Result<Envelope<Option<()>>, ApiError> {
  for _ in 0..SWAP_ATTEMPTS {
    let Some(current) = current_refresh_token(&state, identity.id).await? else {
      return Ok(Envelope::ok("logged out", None));
    };
    let cleared = state
      .store
      .swap_refresh_token(identity.id, Some(current), None)
      .await
      .map_err(ApiError::store)?;
    if cleared {
      tracing::debug!(account = %identity.id, "refresh token cleared");
      return Ok(Envelope::ok("logged out", None));
    }
  }
  Err(ApiError::Conflict("session changed concurrently, try again".into()))
}

pub async fn google<S: BoardStore>(
  State(state): State<AppState<S>>,
  Valid(body): Valid<GoogleLoginRequest>,
) -> Result<Envelope<Session>, ApiError> {
  let external = state.identity.fetch(&body.access_token).await?;
  let email = normalize_email(&external.email);

  let existing = state
    .store
    .find_account_by_email(&email)
    .await
    .map_err(ApiError::store)?;
  let id = match existing {
    Some(account) => account.id,
    None => create_google_account(&state, &email, external.display_name()).await?,
  };

  let account =
    resolve_identity(&*state.store, &state.tokens, IdentitySource::ByPriorContext(id)).await?;
  let session = start_session(&state, &account).await?;
  Ok(Envelope::ok("login successful", session))
}

/// Create a password-less freelancer account, tolerating a concurrent first
/// login for the same email.
async fn create_google_account<S: BoardStore>(
  state: &AppState<S>,
  email: &str,
  name: String,
) -> Result<DocId, ApiError> {
  let created = state
    .store
    .create_account(NewAccount {
      name,
      email: email.to_owned(),
      phone: None,
      password_hash: None,
      role: Role::Freelancer,
    })
    .await
    .map_err(ApiError::store);

  match created {
    Ok(account) => {
      tracing::info!(account = %account.id, "account created from google login");
      Ok(account.id)
    }
    Err(ApiError::Conflict(_)) => state
      .store
      .find_account_by_email(email)
      .await
      .map_err(ApiError::store)?
      .map(|account| account.id)
      .ok_or_else(|| ApiError::internal("account vanished after email conflict")),
    Err(e) => Err(e),
  }
}

pub async fn admin_login<S: BoardStore>(
  State(state): State<AppState<S>>,
  Valid(body): Valid<AdminLoginRequest>,
) -> Result<Envelope<AdminSessionToken>, ApiError> {
  let auth = &state.config.auth;
  let matches = body.username == auth.admin_username
    && verify_password(&body.password, &auth.admin_password_hash);
  if !matches {
    tracing::debug!(username = %body.username, "admin login refused");
    return Err(ApiError::Unauthorized("invalid username or password".into()));
  }

  let access_token = state.tokens.issue(None, Some(ClaimRole::Admin), TokenKind::Access)?;
  Ok(Envelope::ok("login successful", AdminSessionToken { access_token }))
}
