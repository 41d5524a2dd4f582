//! Account administration.

use axum::extract::State;
use gigboard_core::{
  account::{AccountQuery, AccountStatus, PublicAccount, Role},
  page::SortOrder,
  store::BoardStore,
};
use serde::Deserialize;
use validator::Validate;

use super::{PageParams, default_limit, default_page};
use crate::{
  AppState,
  auth::AdminSession,
  error::ApiError,
  response::Envelope,
  validate::{IdPath, Valid},
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AccountListParams {
  #[serde(default = "default_page")]
  #[validate(range(min = 1))]
  pub page:   u32,
  #[serde(default = "default_limit")]
  #[validate(range(min = 1, max = 100))]
  pub limit:  u32,
  #[serde(default)]
  pub sort:   SortOrder,
  #[validate(length(max = 100))]
  pub search: Option<String>,
  pub role:   Option<Role>,
  pub status: Option<AccountStatus>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AccountStatusRequest {
  pub status: AccountStatus,
}

pub async fn list_accounts<S: BoardStore>(
  State(state): State<AppState<S>>,
  _admin: AdminSession,
  Valid(params): Valid<AccountListParams>,
) -> Result<Envelope<Vec<PublicAccount>>, ApiError> {
  let query = AccountQuery {
    page:   PageParams {
      page:   params.page,
      limit:  params.limit,
      sort:   params.sort,
      search: params.search,
    }
    .to_query(),
    role:   params.role,
    status: params.status,
  };
  let page = state.store.list_accounts(&query).await.map_err(ApiError::store)?;
  Ok(Envelope::page("accounts", page.map(PublicAccount::from), &query.page))
}

pub async fn set_account_status<S: BoardStore>(
  State(state): State<AppState<S>>,
  _admin: AdminSession,
  IdPath(id): IdPath,
  Valid(body): Valid<AccountStatusRequest>,
) -> Result<Envelope<PublicAccount>, ApiError> {
  let account = state
    .store
    .set_account_status(id, body.status)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("account not found".into()))?;
  tracing::info!(account = %id, status = %account.status, "account status changed");
  Ok(Envelope::ok("account updated", account.into()))
}
