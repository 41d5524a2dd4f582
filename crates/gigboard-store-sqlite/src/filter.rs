//! Dynamic `WHERE` clause assembly and paginated listing.

use gigboard_core::page::PageQuery;
use rusqlite::types::Value;

use crate::encode::like_pattern;

/// Conditions joined with `AND`, each using unnumbered `?` placeholders whose
/// values are pushed in order.
#[derive(Default)]
pub struct Filter {
  conds:  Vec<String>,
  params: Vec<Value>,
}

impl Filter {
  pub fn eq(&mut self, column: &str, value: impl Into<String>) -> &mut Self {
    self.conds.push(format!("{column} = ?"));
    self.params.push(Value::Text(value.into()));
    self
  }

  /// `column IN (?, ?, ...)`; an empty list adds no condition.
  pub fn any_of(&mut self, column: &str, values: Vec<String>) -> &mut Self {
    if values.is_empty() {
      return self;
    }
    let marks = vec!["?"; values.len()].join(", ");
    self.conds.push(format!("{column} IN ({marks})"));
    self.params.extend(values.into_iter().map(Value::Text));
    self
  }

  /// Case-insensitive substring match against any of `columns`.
  pub fn search(&mut self, columns: &[&str], text: Option<&str>) -> &mut Self {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
      return self;
    };
    let pattern = like_pattern(text);
    let parts: Vec<String> = columns
      .iter()
      .map(|c| format!("LOWER({c}) LIKE ? ESCAPE '\\'"))
      .collect();
    self.conds.push(format!("({})", parts.join(" OR ")));
    self
      .params
      .extend(columns.iter().map(|_| Value::Text(pattern.clone())));
    self
  }

  /// An arbitrary condition with a single text parameter.
  pub fn raw(&mut self, cond: &str, value: impl Into<String>) -> &mut Self {
    self.conds.push(cond.to_owned());
    self.params.push(Value::Text(value.into()));
    self
  }

  fn where_clause(&self) -> String {
    if self.conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", self.conds.join(" AND "))
    }
  }
}

/// Run a `COUNT(*)` and a `LIMIT/OFFSET` select over `table` with the same
/// filter, returning the mapped rows and the total match count.
pub fn select_page<R>(
  conn: &rusqlite::Connection,
  table: &str,
  columns: &str,
  filter: &Filter,
  page: &PageQuery,
  read: fn(&rusqlite::Row<'_>) -> rusqlite::Result<R>,
) -> rusqlite::Result<(Vec<R>, u64)> {
  let where_clause = filter.where_clause();

  let total: i64 = conn.query_row(
    &format!("SELECT COUNT(*) FROM {table} {where_clause}"),
    rusqlite::params_from_iter(filter.params.iter()),
    |row| row.get(0),
  )?;

  let direction = if page.sort.is_descending() { "DESC" } else { "ASC" };
  let sql = format!(
    "SELECT {columns} FROM {table} {where_clause}
     ORDER BY created_at {direction}, id {direction}
     LIMIT ? OFFSET ?"
  );

  let mut params = filter.params.clone();
  params.push(Value::Integer(i64::from(page.limit)));
  params.push(Value::Integer(page.offset() as i64));

  let mut stmt = conn.prepare(&sql)?;
  let rows = stmt
    .query_map(rusqlite::params_from_iter(params.iter()), read)?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  Ok((rows, total as u64))
}
