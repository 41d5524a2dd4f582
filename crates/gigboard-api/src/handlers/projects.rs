//! Projects (job postings). Anyone may browse; employers manage their own.

use axum::extract::State;
use gigboard_core::{
  DocId,
  applicant::{Applicant, ApplicantQuery},
  page::{PageQuery, SortOrder},
  project::{
    Contact, JobType, NewProject, Project, ProjectQuery, ProjectStatus, ProjectUpdate, Salary,
  },
  store::BoardStore,
};
use serde::Deserialize;
use validator::{Validate, ValidationError};

use super::{PageParams, default_limit, default_page, users::ensure_skills_exist};
use crate::{
  AppState,
  auth::Identity,
  error::ApiError,
  response::Envelope,
  validate::{IdPath, Valid, doc_id, doc_ids, parse_id, parse_ids, trim, trim_opt},
};

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "salary_bounds", skip_on_field_errors = false))]
pub struct SalaryInput {
  #[validate(range(min = 0))]
  pub min: i64,
  #[validate(range(min = 0))]
  pub max: i64,
}

fn salary_bounds(salary: &SalaryInput) -> Result<(), ValidationError> {
  if salary.min > salary.max {
    return Err(
      ValidationError::new("salary_bounds").with_message("min must not exceed max".into()),
    );
  }
  Ok(())
}

impl From<SalaryInput> for Salary {
  fn from(s: SalaryInput) -> Self { Salary { min: s.min, max: s.max } }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ContactInput {
  #[serde(default, deserialize_with = "trim")]
  #[validate(length(min = 2, max = 50))]
  pub name:  String,
  #[serde(default)]
  #[validate(email)]
  pub email: String,
  #[validate(length(min = 10, max = 15))]
  pub phone: Option<String>,
}

impl From<ContactInput> for Contact {
  fn from(c: ContactInput) -> Self {
    Contact {
      name:  c.name,
      email: c.email.trim().to_lowercase(),
      phone: c.phone,
    }
  }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProjectRequest {
  #[serde(default, deserialize_with = "trim")]
  #[validate(length(min = 3, max = 100))]
  pub title:       String,
  #[serde(default, deserialize_with = "trim")]
  #[validate(length(min = 10, max = 5000))]
  pub description: String,
  #[serde(default)]
  #[validate(custom(function = "doc_id"))]
  pub category_id: String,
  #[serde(default)]
  #[validate(length(min = 1, max = 20), custom(function = "doc_ids"))]
  pub skill_ids:   Vec<String>,
  #[validate(nested)]
  pub salary:      SalaryInput,
  pub job_type:    JobType,
  #[validate(nested)]
  pub contact:     ContactInput,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProjectUpdateRequest {
  #[serde(default, deserialize_with = "trim_opt")]
  #[validate(length(min = 3, max = 100))]
  pub title:       Option<String>,
  #[serde(default, deserialize_with = "trim_opt")]
  #[validate(length(min = 10, max = 5000))]
  pub description: Option<String>,
  #[validate(custom(function = "doc_id"))]
  pub category_id: Option<String>,
  #[validate(length(min = 1, max = 20), custom(function = "doc_ids"))]
  pub skill_ids:   Option<Vec<String>>,
  #[validate(nested)]
  pub salary:      Option<SalaryInput>,
  pub job_type:    Option<JobType>,
  #[validate(nested)]
  pub contact:     Option<ContactInput>,
}

/// Listing query: the shared page parameters plus project filters.
/// `job_type` takes a comma-separated or repeated (`job_type[]=`) list.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProjectListParams {
  #[serde(default = "default_page")]
  #[validate(range(min = 1))]
  pub page:        u32,
  #[serde(default = "default_limit")]
  #[validate(range(min = 1, max = 100))]
  pub limit:       u32,
  #[serde(default)]
  pub sort:        SortOrder,
  #[validate(length(max = 100))]
  pub search:      Option<String>,
  #[validate(custom(function = "job_type_list"))]
  pub job_type:    Option<String>,
  #[validate(custom(function = "doc_id"))]
  pub category_id: Option<String>,
  #[validate(custom(function = "doc_id"))]
  pub skill_id:    Option<String>,
  pub status:      Option<ProjectStatus>,
}

fn parse_job_types(value: &str) -> Option<Vec<JobType>> {
  value
    .split(',')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(|s| s.parse::<JobType>().ok())
    .collect()
}

fn job_type_list(value: &str) -> Result<(), ValidationError> {
  match parse_job_types(value) {
    Some(_) => Ok(()),
    None => Err(
      ValidationError::new("job_type")
        .with_message("must be a list of remote, onsite or hybrid".into()),
    ),
  }
}

impl ProjectListParams {
  fn page_query(&self) -> PageQuery {
    PageParams {
      page:   self.page,
      limit:  self.limit,
      sort:   self.sort,
      search: self.search.clone(),
    }
    .to_query()
  }

  fn to_query(&self) -> Result<ProjectQuery, ApiError> {
    Ok(ProjectQuery {
      page:        self.page_query(),
      job_types:   self.job_type.as_deref().and_then(parse_job_types).unwrap_or_default(),
      category_id: self.category_id.as_deref().map(parse_id).transpose()?,
      skill_id:    self.skill_id.as_deref().map(parse_id).transpose()?,
      employer_id: None,
      status:      self.status,
    })
  }
}

fn not_found() -> ApiError { ApiError::NotFound("project not found".into()) }

async fn ensure_category_exists<S: BoardStore>(store: &S, id: DocId) -> Result<(), ApiError> {
  match store.get_category(id).await.map_err(ApiError::store)? {
    Some(_) => Ok(()),
    None => Err(ApiError::NotFound(format!("category {id} not found"))),
  }
}

/// Load a project the caller owns.
pub(crate) async fn owned_project<S: BoardStore>(
  store: &S,
  id: DocId,
  identity: &Identity,
) -> Result<Project, ApiError> {
  let project = store.get_project(id).await.map_err(ApiError::store)?.ok_or_else(not_found)?;
  if project.employer_id != identity.id {
    return Err(ApiError::Forbidden("only the project owner may do this".into()));
  }
  Ok(project)
}

pub async fn list<S: BoardStore>(
  State(state): State<AppState<S>>,
  Valid(params): Valid<ProjectListParams>,
) -> Result<Envelope<Vec<Project>>, ApiError> {
  let query = params.to_query()?;
  let page = state.store.list_projects(&query).await.map_err(ApiError::store)?;
  Ok(Envelope::page("projects", page, &query.page))
}

pub async fn get<S: BoardStore>(
  State(state): State<AppState<S>>,
  IdPath(id): IdPath,
) -> Result<Envelope<Project>, ApiError> {
  let project = state
    .store
    .get_project(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(not_found)?;
  Ok(Envelope::ok("project", project))
}

pub async fn create<S: BoardStore>(
  State(state): State<AppState<S>>,
  identity: Identity,
  Valid(body): Valid<ProjectRequest>,
) -> Result<Envelope<Project>, ApiError> {
  let category_id = parse_id(&body.category_id)?;
  let skill_ids = parse_ids(&body.skill_ids)?;
  ensure_category_exists(&*state.store, category_id).await?;
  ensure_skills_exist(&*state.store, &skill_ids).await?;

  let project = state
    .store
    .create_project(NewProject {
      employer_id: identity.id,
      title: body.title,
      description: body.description,
      category_id,
      skill_ids,
      salary: body.salary.into(),
      job_type: body.job_type,
      contact: body.contact.into(),
    })
    .await
    .map_err(ApiError::store)?;
  tracing::info!(project = %project.id, employer = %identity.id, "project created");
  Ok(Envelope::created("project created", project))
}

pub async fn update<S: BoardStore>(
  State(state): State<AppState<S>>,
  identity: Identity,
  IdPath(id): IdPath,
  Valid(body): Valid<ProjectUpdateRequest>,
) -> Result<Envelope<Project>, ApiError> {
  owned_project(&*state.store, id, &identity).await?;

  let category_id = body.category_id.as_deref().map(parse_id).transpose()?;
  if let Some(category_id) = category_id {
    ensure_category_exists(&*state.store, category_id).await?;
  }
  let skill_ids = body.skill_ids.as_deref().map(parse_ids).transpose()?;
  if let Some(ids) = &skill_ids {
    ensure_skills_exist(&*state.store, ids).await?;
  }

  let update = ProjectUpdate {
    title: body.title,
    description: body.description,
    category_id,
    skill_ids,
    salary: body.salary.map(Into::into),
    job_type: body.job_type,
    contact: body.contact.map(Into::into),
  };
  let project = state
    .store
    .update_project(id, update)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(not_found)?;
  Ok(Envelope::ok("project updated", project))
}

/// Projects are closed, never deleted.
pub async fn close<S: BoardStore>(
  State(state): State<AppState<S>>,
  identity: Identity,
  IdPath(id): IdPath,
) -> Result<Envelope<Project>, ApiError> {
  owned_project(&*state.store, id, &identity).await?;
  let project = state
    .store
    .set_project_status(id, ProjectStatus::Closed)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(not_found)?;
  tracing::info!(project = %id, "project closed");
  Ok(Envelope::ok("project closed", project))
}

pub async fn mine<S: BoardStore>(
  State(state): State<AppState<S>>,
  identity: Identity,
  Valid(params): Valid<ProjectListParams>,
) -> Result<Envelope<Vec<Project>>, ApiError> {
  let query = ProjectQuery {
    employer_id: Some(identity.id),
    ..params.to_query()?
  };
  let page = state.store.list_projects(&query).await.map_err(ApiError::store)?;
  Ok(Envelope::page("projects", page, &query.page))
}

pub async fn applicants<S: BoardStore>(
  State(state): State<AppState<S>>,
  identity: Identity,
  IdPath(id): IdPath,
  Valid(params): Valid<PageParams>,
) -> Result<Envelope<Vec<Applicant>>, ApiError> {
  owned_project(&*state.store, id, &identity).await?;
  let query = ApplicantQuery {
    page:          params.to_query(),
    project_id:    Some(id),
    freelancer_id: None,
  };
  let page = state.store.list_applicants(&query).await.map_err(ApiError::store)?;
  Ok(Envelope::page("applicants", page, &query.page))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::validate::{check, parse_query};

  #[test]
  fn job_types_accept_lists_and_reject_unknown_values() {
    let params: ProjectListParams =
      parse_query("job_type[]=remote&job_type[]=hybrid&limit=5").unwrap();
    let query = check(params).unwrap().to_query().unwrap();
    assert_eq!(query.job_types, vec![JobType::Remote, JobType::Hybrid]);
    assert_eq!(query.page.limit, 5);

    let params: ProjectListParams = parse_query("job_type=remote,freelance").unwrap();
    let err = check(params).unwrap_err().to_string();
    assert!(err.starts_with("job_type:"), "{err}");
  }

  #[test]
  fn inverted_salary_is_reported_with_other_violations() {
    let body: ProjectRequest = serde_json::from_value(serde_json::json!({
      "title": "ab",
      "description": "a long enough description",
      "category_id": "507f1f77bcf86cd799439011",
      "skill_ids": ["507f1f77bcf86cd799439012"],
      "salary": { "min": 900, "max": 100 },
      "job_type": "remote",
      "contact": { "name": "Ana", "email": "ana@example.com" },
    }))
    .unwrap();
    let err = check(body).unwrap_err().to_string();
    assert!(err.contains("salary: min must not exceed max"), "{err}");
    assert!(err.contains("title: length must be between 3 and 100"), "{err}");
  }
}
