//! Category catalogue: public reads, admin writes.

use axum::extract::State;
use gigboard_core::{
  catalog::{Category, CategoryUpdate, NewCategory},
  store::BoardStore,
};
use serde::Deserialize;
use validator::Validate;

use super::{PageParams, trimmed};
use crate::{
  AppState,
  auth::AdminSession,
  error::ApiError,
  response::Envelope,
  validate::{IdPath, Valid, trim, trim_opt},
};

const DUPLICATE: &str = "a category with this name already exists";

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CategoryRequest {
  #[serde(default, deserialize_with = "trim")]
  #[validate(length(min = 2, max = 50))]
  pub name:        String,
  #[validate(length(max = 500))]
  pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CategoryUpdateRequest {
  #[serde(default, deserialize_with = "trim_opt")]
  #[validate(length(min = 2, max = 50))]
  pub name:        Option<String>,
  #[validate(length(max = 500))]
  pub description: Option<String>,
}

fn not_found() -> ApiError { ApiError::NotFound("category not found".into()) }

pub async fn list<S: BoardStore>(
  State(state): State<AppState<S>>,
  Valid(params): Valid<PageParams>,
) -> Result<Envelope<Vec<Category>>, ApiError> {
  let query = params.to_query();
  let page = state.store.list_categories(&query).await.map_err(ApiError::store)?;
  Ok(Envelope::page("categories", page, &query))
}

pub async fn get<S: BoardStore>(
  State(state): State<AppState<S>>,
  IdPath(id): IdPath,
) -> Result<Envelope<Category>, ApiError> {
  let category = state
    .store
    .get_category(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(not_found)?;
  Ok(Envelope::ok("category", category))
}

pub async fn create<S: BoardStore>(
  State(state): State<AppState<S>>,
  _admin: AdminSession,
  Valid(body): Valid<CategoryRequest>,
) -> Result<Envelope<Category>, ApiError> {
  let category = state
    .store
    .create_category(NewCategory {
      name:        body.name,
      description: trimmed(body.description.as_deref()),
    })
    .await
    .map_err(|e| ApiError::store(e).conflict_message(DUPLICATE))?;
  tracing::info!(category = %category.id, name = %category.name, "category created");
  Ok(Envelope::created("category created", category))
}

pub async fn update<S: BoardStore>(
  State(state): State<AppState<S>>,
  _admin: AdminSession,
  IdPath(id): IdPath,
  Valid(body): Valid<CategoryUpdateRequest>,
) -> Result<Envelope<Category>, ApiError> {
  let update = CategoryUpdate {
    name:        body.name,
    description: body.description,
  };
  let category = state
    .store
    .update_category(id, update)
    .await
    .map_err(|e| ApiError::store(e).conflict_message(DUPLICATE))?
    .ok_or_else(not_found)?;
  Ok(Envelope::ok("category updated", category))
}

pub async fn delete<S: BoardStore>(
  State(state): State<AppState<S>>,
  _admin: AdminSession,
  IdPath(id): IdPath,
) -> Result<Envelope<Option<()>>, ApiError> {
  let deleted = state
    .store
    .delete_category(id)
    .await
    .map_err(|e| ApiError::store(e).conflict_message("category is still used by projects"))?;
  if !deleted {
    return Err(not_found());
  }
  tracing::info!(category = %id, "category deleted");
  Ok(Envelope::ok("category deleted", None))
}
