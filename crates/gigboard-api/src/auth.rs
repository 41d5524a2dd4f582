//! Authorization stage.
//!
//! [`authorize_user`] turns a bearer credential into a live, active account
//! and attaches it to the request as an [`Identity`]. [`authorize_admin`]
//! accepts any valid access credential carrying the admin role without a
//! store lookup. [`require_employer`] and [`require_freelancer`] run after
//! [`authorize_user`].

use axum::{
  extract::{FromRequestParts, Request, State},
  http::{HeaderMap, header::AUTHORIZATION, request::Parts},
  middleware::Next,
  response::Response,
};
use gigboard_core::{
  DocId,
  account::{Account, AccountStatus, PublicAccount, Role},
  store::BoardStore,
};

use crate::{
  AppState,
  error::ApiError,
  password::verify_password,
  token::{ClaimRole, TokenIssuer, TokenKind},
};

/// Extract the credential from `Authorization: Bearer <credential>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
  let value = headers
    .get(AUTHORIZATION)
    .ok_or_else(|| ApiError::Unauthorized("invalid session".into()))?;
  value
    .to_str()
    .ok()
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|token| !token.is_empty())
    .ok_or_else(|| ApiError::Unauthorized("invalid token".into()))
}

/// Where the caller's identity comes from. Chosen by the caller; sources are
/// never tried in turn.
#[derive(Debug, Clone, Copy)]
pub enum IdentitySource<'a> {
  /// An account id established earlier in the same flow.
  ByPriorContext(DocId),
  /// Submitted login credentials.
  ByCredentials { email: &'a str, password: &'a str },
  /// A bearer access credential.
  ByToken(&'a str),
}

/// Resolve `source` to a stored account that is allowed to act.
pub async fn resolve_identity<S: BoardStore>(
  store: &S,
  tokens: &TokenIssuer,
  source: IdentitySource<'_>,
) -> Result<Account, ApiError> {
  let account = match source {
    IdentitySource::ByPriorContext(id) => find_account(store, id).await?,
    IdentitySource::ByToken(token) => {
      let claims = tokens.verify(token, TokenKind::Access)?;
      let id = claims
        .sub
        .ok_or_else(|| ApiError::Unauthorized("invalid token: no subject".into()))?;
      find_account(store, id).await?
    }
    IdentitySource::ByCredentials { email, password } => {
      let wrong = || ApiError::Unauthorized("invalid email or password".into());
      let account = store
        .find_account_by_email(email)
        .await
        .map_err(ApiError::store)?
        .ok_or_else(wrong)?;
      let matches = account
        .password_hash
        .as_deref()
        .is_some_and(|hash| verify_password(password, hash));
      if !matches {
        return Err(wrong());
      }
      account
    }
  };
  ensure_active(&account)?;
  Ok(account)
}

async fn find_account<S: BoardStore>(store: &S, id: DocId) -> Result<Account, ApiError> {
  store
    .get_account(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("account not found".into()))
}

/// Refuse deleted and blocked accounts.
pub fn ensure_active(account: &Account) -> Result<(), ApiError> {
  match account.status {
    AccountStatus::Active => Ok(()),
    AccountStatus::Deleted => Err(ApiError::Forbidden("account has been deleted".into())),
    AccountStatus::Blocked => Err(ApiError::Forbidden("account has been blocked".into())),
  }
}

/// The authenticated account attached by [`authorize_user`], with secrets
/// stripped.
#[derive(Debug, Clone)]
pub struct Identity {
  pub id:      DocId,
  pub account: PublicAccount,
}

impl From<Account> for Identity {
  fn from(account: Account) -> Self {
    Self {
      id:      account.id,
      account: account.into(),
    }
  }
}

impl<S: Send + Sync> FromRequestParts<S> for Identity {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, ApiError> {
    parts
      .extensions
      .get::<Identity>()
      .cloned()
      .ok_or_else(|| ApiError::internal("route is missing its authorization stage"))
  }
}

/// Marker attached by [`authorize_admin`].
#[derive(Debug, Clone, Copy)]
pub struct AdminSession;

impl<S: Send + Sync> FromRequestParts<S> for AdminSession {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, ApiError> {
    parts
      .extensions
      .get::<AdminSession>()
      .copied()
      .ok_or_else(|| ApiError::internal("route is missing its admin authorization stage"))
  }
}

/// User-mode authorization middleware.
pub async fn authorize_user<S>(
  State(state): State<AppState<S>>,
  mut req: Request,
  next: Next,
) -> Result<Response, ApiError>
where
  S: BoardStore + Clone + 'static,
{
  let token = bearer_token(req.headers())?.to_owned();
  let account =
    resolve_identity(&*state.store, &state.tokens, IdentitySource::ByToken(&token)).await?;
  tracing::debug!(account = %account.id, role = %account.role, "request authorized");
  req.extensions_mut().insert(Identity::from(account));
  Ok(next.run(req).await)
}

/// Admin-mode authorization middleware.
pub async fn authorize_admin<S>(
  State(state): State<AppState<S>>,
  mut req: Request,
  next: Next,
) -> Result<Response, ApiError>
where
  S: BoardStore + Clone + 'static,
{
  let claims = state.tokens.verify(bearer_token(req.headers())?, TokenKind::Access)?;
  if claims.role != Some(ClaimRole::Admin) {
    return Err(ApiError::Forbidden("admin access required".into()));
  }
  req.extensions_mut().insert(AdminSession);
  Ok(next.run(req).await)
}

async fn require_role(
  role: Role,
  action: &str,
  req: Request,
  next: Next,
) -> Result<Response, ApiError> {
  let Some(identity) = req.extensions().get::<Identity>() else {
    return Err(ApiError::internal("role check ran before authorization"));
  };
  if identity.account.role != role {
    return Err(ApiError::Forbidden(format!("only {role} accounts may {action}")));
  }
  Ok(next.run(req).await)
}

pub async fn require_employer(req: Request, next: Next) -> Result<Response, ApiError> {
  require_role(Role::Employer, "manage projects and applicants", req, next).await
}

pub async fn require_freelancer(req: Request, next: Next) -> Result<Response, ApiError> {
  require_role(Role::Freelancer, "apply to projects", req, next).await
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;
  use chrono::{Duration, Utc};
  use gigboard_core::account::NewAccount;
  use gigboard_store_sqlite::SqliteStore;

  use super::*;
  use crate::password::hash_password;

  fn issuer() -> TokenIssuer {
    TokenIssuer::new("test-secret", Duration::minutes(15), Duration::days(7))
  }

  async fn store_with(status: AccountStatus) -> (SqliteStore, Account) {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let account = store
      .create_account(NewAccount {
        name:          "Ana Lima".into(),
        email:         "ana@example.com".into(),
        phone:         None,
        password_hash: Some(hash_password("hunter22").unwrap()),
        role:          Role::Freelancer,
      })
      .await
      .unwrap();
    if status != AccountStatus::Active {
      store.set_account_status(account.id, status).await.unwrap();
    }
    (store, account)
  }

  fn headers(value: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    headers
  }

  #[test]
  fn bearer_token_messages() {
    let err = bearer_token(&HeaderMap::new()).unwrap_err();
    assert_eq!(err.to_string(), "invalid session");

    let err = bearer_token(&headers("Basic abc")).unwrap_err();
    assert_eq!(err.to_string(), "invalid token");

    let err = bearer_token(&headers("Bearer ")).unwrap_err();
    assert_eq!(err.to_string(), "invalid token");

    assert_eq!(bearer_token(&headers("Bearer abc.def")).unwrap(), "abc.def");
  }

  #[tokio::test]
  async fn token_resolves_active_account() {
    let (store, account) = store_with(AccountStatus::Active).await;
    let tokens = issuer();
    let token = tokens
      .issue(Some(account.id), Some(ClaimRole::Freelancer), TokenKind::Access)
      .unwrap();

    let resolved = resolve_identity(&store, &tokens, IdentitySource::ByToken(&token))
      .await
      .unwrap();
    assert_eq!(resolved.id, account.id);
  }

  #[tokio::test]
  async fn blocked_account_is_forbidden_with_valid_token() {
    let (store, account) = store_with(AccountStatus::Blocked).await;
    let tokens = issuer();
    let token = tokens
      .issue(Some(account.id), Some(ClaimRole::Freelancer), TokenKind::Access)
      .unwrap();

    let err = resolve_identity(&store, &tokens, IdentitySource::ByToken(&token))
      .await
      .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(ref m) if m == "account has been blocked"));
  }

  #[tokio::test]
  async fn deleted_account_has_its_own_message() {
    let (store, account) = store_with(AccountStatus::Deleted).await;
    let err = resolve_identity(&store, &issuer(), IdentitySource::ByPriorContext(account.id))
      .await
      .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(ref m) if m == "account has been deleted"));
  }

  #[tokio::test]
  async fn unknown_subject_is_not_found() {
    let (store, _) = store_with(AccountStatus::Active).await;
    let tokens = issuer();
    let token = tokens
      .issue(Some(DocId::generate()), Some(ClaimRole::Employer), TokenKind::Access)
      .unwrap();
    let err = resolve_identity(&store, &tokens, IdentitySource::ByToken(&token))
      .await
      .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
  }

  #[tokio::test]
  async fn expired_and_refresh_credentials_are_rejected() {
    let (store, account) = store_with(AccountStatus::Active).await;
    let tokens = issuer();

    let stale = tokens
      .issue_at(
        Some(account.id),
        Some(ClaimRole::Freelancer),
        TokenKind::Access,
        Utc::now() - Duration::hours(1),
      )
      .unwrap();
    let err = resolve_identity(&store, &tokens, IdentitySource::ByToken(&stale))
      .await
      .unwrap_err();
    assert_eq!(err.to_string(), "token expired");

    let refresh = tokens
      .issue(Some(account.id), Some(ClaimRole::Freelancer), TokenKind::Refresh)
      .unwrap();
    let err = resolve_identity(&store, &tokens, IdentitySource::ByToken(&refresh))
      .await
      .unwrap_err();
    assert!(err.to_string().starts_with("invalid token:"), "{err}");
  }

  #[tokio::test]
  async fn credentials_check_password_before_status() {
    let (store, _) = store_with(AccountStatus::Blocked).await;
    let tokens = issuer();

    let err = resolve_identity(
      &store,
      &tokens,
      IdentitySource::ByCredentials { email: "ana@example.com", password: "wrong" },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(_)));

    let err = resolve_identity(
      &store,
      &tokens,
      IdentitySource::ByCredentials { email: "ana@example.com", password: "hunter22" },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));
  }
}
