//! Applications of freelancers to projects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{DocId, page::PageQuery};

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
pub enum ApplicantStatus {
  #[default]
  Pending,
  Accepted,
  Rejected,
}

/// A freelancer's application. At most one per (project, freelancer) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Applicant {
  pub id:            DocId,
  pub project_id:    DocId,
  pub freelancer_id: DocId,
  pub cover_letter:  Option<String>,
  pub status:        ApplicantStatus,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewApplicant {
  pub project_id:    DocId,
  pub freelancer_id: DocId,
  pub cover_letter:  Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ApplicantQuery {
  pub page:          PageQuery,
  pub project_id:    Option<DocId>,
  pub freelancer_id: Option<DocId>,
}
