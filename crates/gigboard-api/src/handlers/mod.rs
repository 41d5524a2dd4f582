//! Route handlers. Each runs after its route's validation and authorization
//! stages and reads their results through [`crate::validate::Valid`] and
//! [`crate::auth::Identity`].

pub mod admin;
pub mod applicants;
pub mod auth;
pub mod categories;
pub mod projects;
pub mod skills;
pub mod users;

use gigboard_core::page::{DEFAULT_LIMIT, DEFAULT_PAGE, PageQuery, SortOrder};
use serde::Deserialize;
use serde_json::{Value, json};
use validator::Validate;

use crate::response::Envelope;

/// `?page=&limit=&sort=&search=` shared by every listing route.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PageParams {
  #[serde(default = "default_page")]
  #[validate(range(min = 1))]
  pub page:   u32,
  #[serde(default = "default_limit")]
  #[validate(range(min = 1, max = 100))]
  pub limit:  u32,
  #[serde(default)]
  pub sort:   SortOrder,
  #[serde(default)]
  #[validate(length(max = 100))]
  pub search: Option<String>,
}

pub(crate) fn default_page() -> u32 { DEFAULT_PAGE }

pub(crate) fn default_limit() -> u32 { DEFAULT_LIMIT }

impl PageParams {
  pub fn to_query(&self) -> PageQuery {
    PageQuery {
      page:   self.page,
      limit:  self.limit,
      sort:   self.sort,
      search: trimmed(self.search.as_deref()),
    }
  }
}

/// `None` for absent or blank text.
pub(crate) fn trimmed(value: Option<&str>) -> Option<String> {
  value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned)
}

pub async fn health() -> Envelope<Value> { Envelope::ok("ok", json!({ "status": "up" })) }
