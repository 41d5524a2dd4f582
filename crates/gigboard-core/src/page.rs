//! The pagination contract shared by every listing endpoint.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// Listing order. `All` keeps insertion order, i.e. the same as `Oldest`.
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
pub enum SortOrder {
  #[default]
  All,
  Oldest,
  Newest,
}

impl SortOrder {
  pub fn is_descending(&self) -> bool { matches!(self, Self::Newest) }
}

/// A validated page request: `page >= 1`, `1 <= limit <= 100`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
  pub page:   u32,
  pub limit:  u32,
  pub sort:   SortOrder,
  /// Case-insensitive substring filter on the listed entity's name/title.
  pub search: Option<String>,
}

impl Default for PageQuery {
  fn default() -> Self {
    Self {
      page:   DEFAULT_PAGE,
      limit:  DEFAULT_LIMIT,
      sort:   SortOrder::default(),
      search: None,
    }
  }
}

impl PageQuery {
  /// Number of rows to skip.
  pub fn offset(&self) -> u64 {
    u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
  }
}

/// One page of results plus the unpaginated match count.
#[derive(Debug, Clone)]
pub struct Page<T> {
  pub items: Vec<T>,
  pub total: u64,
}

impl<T> Page<T> {
  pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
    Page {
      items: self.items.into_iter().map(f).collect(),
      total: self.total,
    }
  }
}

/// Pagination metadata returned alongside a page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
  pub total:       u64,
  pub page:        u32,
  pub total_pages: u64,
  pub limit:       u32,
}

impl Pagination {
  pub fn new(total: u64, query: &PageQuery) -> Self {
    let limit = u64::from(query.limit.max(1));
    Self {
      total,
      page: query.page,
      total_pages: total.div_ceil(limit),
      limit: query.limit,
    }
  }
}
