//! The admin-managed catalogue: categories and skills that projects and
//! profiles reference by id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::DocId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
  pub id:          DocId,
  pub name:        String,
  pub description: Option<String>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
  pub name:        String,
  pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryUpdate {
  pub name:        Option<String>,
  pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
  pub id:         DocId,
  pub name:       String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
