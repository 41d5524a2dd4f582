//! Projects: job postings owned by an employer account.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{DocId, page::PageQuery};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JobType {
  Remote,
  Onsite,
  Hybrid,
}

/// Projects are closed rather than deleted.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProjectStatus {
  #[default]
  Open,
  Closed,
}

/// Offered pay range. `min <= max` is enforced at the request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Salary {
  pub min: i64,
  pub max: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
  pub name:  String,
  pub email: String,
  pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
  pub id:          DocId,
  pub employer_id: DocId,
  pub title:       String,
  pub description: String,
  pub category_id: DocId,
  pub skill_ids:   Vec<DocId>,
  pub salary:      Salary,
  pub job_type:    JobType,
  pub contact:     Contact,
  pub status:      ProjectStatus,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProject {
  pub employer_id: DocId,
  pub title:       String,
  pub description: String,
  pub category_id: DocId,
  pub skill_ids:   Vec<DocId>,
  pub salary:      Salary,
  pub job_type:    JobType,
  pub contact:     Contact,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectUpdate {
  pub title:       Option<String>,
  pub description: Option<String>,
  pub category_id: Option<DocId>,
  pub skill_ids:   Option<Vec<DocId>>,
  pub salary:      Option<Salary>,
  pub job_type:    Option<JobType>,
  pub contact:     Option<Contact>,
}

/// Parameters for [`BoardStore::list_projects`](crate::store::BoardStore::list_projects).
#[derive(Debug, Clone, Default)]
pub struct ProjectQuery {
  pub page:        PageQuery,
  /// Any of these job types; empty means no restriction.
  pub job_types:   Vec<JobType>,
  pub category_id: Option<DocId>,
  /// Projects that list this skill among their `skill_ids`.
  pub skill_id:    Option<DocId>,
  pub employer_id: Option<DocId>,
  pub status:      Option<ProjectStatus>,
}
