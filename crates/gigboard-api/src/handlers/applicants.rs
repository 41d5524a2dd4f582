//! Applications: freelancers apply, the owning employer decides.

use axum::extract::State;
use gigboard_core::{
  applicant::{Applicant, ApplicantQuery, ApplicantStatus, NewApplicant},
  project::ProjectStatus,
  store::BoardStore,
};
use serde::Deserialize;
use validator::Validate;

use super::{PageParams, projects::owned_project, trimmed};
use crate::{
  AppState,
  auth::Identity,
  error::ApiError,
  response::Envelope,
  validate::{IdPath, Valid},
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ApplyRequest {
  #[validate(length(max = 2000))]
  pub cover_letter: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ApplicantStatusRequest {
  pub status: ApplicantStatus,
}

pub async fn apply<S: BoardStore>(
  State(state): State<AppState<S>>,
  identity: Identity,
  IdPath(project_id): IdPath,
  Valid(body): Valid<ApplyRequest>,
) -> Result<Envelope<Applicant>, ApiError> {
  let project = state
    .store
    .get_project(project_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("project not found".into()))?;
  if project.status == ProjectStatus::Closed {
    return Err(ApiError::Conflict("project is closed to applications".into()));
  }

  let applicant = state
    .store
    .create_applicant(NewApplicant {
      project_id,
      freelancer_id: identity.id,
      cover_letter: trimmed(body.cover_letter.as_deref()),
    })
    .await
    .map_err(|e| {
      ApiError::store(e).conflict_message("you have already applied to this project")
    })?;
  tracing::info!(applicant = %applicant.id, project = %project_id, "application submitted");
  Ok(Envelope::created("application submitted", applicant))
}

pub async fn mine<S: BoardStore>(
  State(state): State<AppState<S>>,
  identity: Identity,
  Valid(params): Valid<PageParams>,
) -> Result<Envelope<Vec<Applicant>>, ApiError> {
  let query = ApplicantQuery {
    page:          params.to_query(),
    project_id:    None,
    freelancer_id: Some(identity.id),
  };
  let page = state.store.list_applicants(&query).await.map_err(ApiError::store)?;
  Ok(Envelope::page("applications", page, &query.page))
}

pub async fn set_status<S: BoardStore>(
  State(state): State<AppState<S>>,
  identity: Identity,
  IdPath(id): IdPath,
  Valid(body): Valid<ApplicantStatusRequest>,
) -> Result<Envelope<Applicant>, ApiError> {
  let not_found = || ApiError::NotFound("applicant not found".into());
  let applicant = state
    .store
    .get_applicant(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(not_found)?;
  owned_project(&*state.store, applicant.project_id, &identity).await?;

  let applicant = state
    .store
    .set_applicant_status(id, body.status)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(not_found)?;
  tracing::info!(applicant = %id, status = %applicant.status, "applicant status changed");
  Ok(Envelope::ok("applicant updated", applicant))
}
