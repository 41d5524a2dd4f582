//! Skill catalogue: public reads, admin writes.

use axum::extract::State;
use gigboard_core::{catalog::Skill, store::BoardStore};
use serde::Deserialize;
use validator::Validate;

use super::PageParams;
use crate::{
  AppState,
  auth::AdminSession,
  error::ApiError,
  response::Envelope,
  validate::{IdPath, Valid, trim},
};

const DUPLICATE: &str = "a skill with this name already exists";

/// Used for both create and rename.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SkillRequest {
  #[serde(default, deserialize_with = "trim")]
  #[validate(length(min = 1, max = 50))]
  pub name: String,
}

fn not_found() -> ApiError { ApiError::NotFound("skill not found".into()) }

pub async fn list<S: BoardStore>(
  State(state): State<AppState<S>>,
  Valid(params): Valid<PageParams>,
) -> Result<Envelope<Vec<Skill>>, ApiError> {
  let query = params.to_query();
  let page = state.store.list_skills(&query).await.map_err(ApiError::store)?;
  Ok(Envelope::page("skills", page, &query))
}

pub async fn get<S: BoardStore>(
  State(state): State<AppState<S>>,
  IdPath(id): IdPath,
) -> Result<Envelope<Skill>, ApiError> {
  let skill = state
    .store
    .get_skill(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(not_found)?;
  Ok(Envelope::ok("skill", skill))
}

pub async fn create<S: BoardStore>(
  State(state): State<AppState<S>>,
  _admin: AdminSession,
  Valid(body): Valid<SkillRequest>,
) -> Result<Envelope<Skill>, ApiError> {
  let skill = state
    .store
    .create_skill(body.name)
    .await
    .map_err(|e| ApiError::store(e).conflict_message(DUPLICATE))?;
  tracing::info!(skill = %skill.id, name = %skill.name, "skill created");
  Ok(Envelope::created("skill created", skill))
}

pub async fn update<S: BoardStore>(
  State(state): State<AppState<S>>,
  _admin: AdminSession,
  IdPath(id): IdPath,
  Valid(body): Valid<SkillRequest>,
) -> Result<Envelope<Skill>, ApiError> {
  let skill = state
    .store
    .rename_skill(id, body.name)
    .await
    .map_err(|e| ApiError::store(e).conflict_message(DUPLICATE))?
    .ok_or_else(not_found)?;
  Ok(Envelope::ok("skill updated", skill))
}

pub async fn delete<S: BoardStore>(
  State(state): State<AppState<S>>,
  _admin: AdminSession,
  IdPath(id): IdPath,
) -> Result<Envelope<Option<()>>, ApiError> {
  if !state.store.delete_skill(id).await.map_err(ApiError::store)? {
    return Err(not_found());
  }
  tracing::info!(skill = %id, "skill deleted");
  Ok(Envelope::ok("skill deleted", None))
}
