//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`)
//! so that lexical order equals chronological order. Enums use their
//! lowercase string form. Id lists are stored as compact JSON arrays.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use gigboard_core::{
  DocId,
  account::{Account, Avatar},
  applicant::Applicant,
  catalog::{Category, Skill},
  project::{Contact, Project, Salary},
};

use crate::{Error, Result};

// ─── DocId ───────────────────────────────────────────────────────────────────

pub fn decode_id(s: &str) -> Result<DocId> { Ok(DocId::parse(s)?) }

pub fn encode_ids(ids: &[DocId]) -> Result<String> {
  Ok(serde_json::to_string(ids)?)
}

pub fn decode_ids(s: &str) -> Result<Vec<DocId>> { Ok(serde_json::from_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("bad timestamp {s:?}: {e}")))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_enum<T: FromStr>(column: &str, s: &str) -> Result<T> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown {column} value {s:?}")))
}

/// Escape `%`, `_` and `\` and wrap in wildcards for a case-insensitive
/// `LIKE ? ESCAPE '\'` match.
pub fn like_pattern(text: &str) -> String {
  let mut out = String::with_capacity(text.len() + 2);
  out.push('%');
  for c in text.to_lowercase().chars() {
    if matches!(c, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(c);
  }
  out.push('%');
  out
}

// ─── Raw rows ────────────────────────────────────────────────────────────────

pub const ACCOUNT_COLUMNS: &str = "id, name, email, phone, password_hash, role, \
  status, bio, skill_ids, avatar_url, avatar_delete_id, refresh_token, \
  created_at, updated_at";

/// An `accounts` row as read from SQLite, before decoding.
pub struct RawAccount {
  pub id:               String,
  pub name:             String,
  pub email:            String,
  pub phone:            Option<String>,
  pub password_hash:    Option<String>,
  pub role:             String,
  pub status:           String,
  pub bio:              Option<String>,
  pub skill_ids:        String,
  pub avatar_url:       Option<String>,
  pub avatar_delete_id: Option<String>,
  pub refresh_token:    Option<String>,
  pub created_at:       String,
  pub updated_at:       String,
}

impl RawAccount {
  pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:               row.get(0)?,
      name:             row.get(1)?,
      email:            row.get(2)?,
      phone:            row.get(3)?,
      password_hash:    row.get(4)?,
      role:             row.get(5)?,
      status:           row.get(6)?,
      bio:              row.get(7)?,
      skill_ids:        row.get(8)?,
      avatar_url:       row.get(9)?,
      avatar_delete_id: row.get(10)?,
      refresh_token:    row.get(11)?,
      created_at:       row.get(12)?,
      updated_at:       row.get(13)?,
    })
  }

  pub fn into_account(self) -> Result<Account> {
    let avatar = match (self.avatar_url, self.avatar_delete_id) {
      (Some(url), Some(delete_id)) => Some(Avatar { url, delete_id }),
      _ => None,
    };
    Ok(Account {
      id: decode_id(&self.id)?,
      name: self.name,
      email: self.email,
      phone: self.phone,
      password_hash: self.password_hash,
      role: decode_enum("role", &self.role)?,
      status: decode_enum("status", &self.status)?,
      bio: self.bio,
      skill_ids: decode_ids(&self.skill_ids)?,
      avatar,
      refresh_token: self.refresh_token,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

pub const CATEGORY_COLUMNS: &str = "id, name, description, created_at, updated_at";

pub struct RawCategory {
  pub id:          String,
  pub name:        String,
  pub description: Option<String>,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawCategory {
  pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      name:        row.get(1)?,
      description: row.get(2)?,
      created_at:  row.get(3)?,
      updated_at:  row.get(4)?,
    })
  }

  pub fn into_category(self) -> Result<Category> {
    Ok(Category {
      id:          decode_id(&self.id)?,
      name:        self.name,
      description: self.description,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

pub const SKILL_COLUMNS: &str = "id, name, created_at, updated_at";

pub struct RawSkill {
  pub id:         String,
  pub name:       String,
  pub created_at: String,
  pub updated_at: String,
}

impl RawSkill {
  pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      name:       row.get(1)?,
      created_at: row.get(2)?,
      updated_at: row.get(3)?,
    })
  }

  pub fn into_skill(self) -> Result<Skill> {
    Ok(Skill {
      id:         decode_id(&self.id)?,
      name:       self.name,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

pub const PROJECT_COLUMNS: &str = "id, employer_id, title, description, \
  category_id, skill_ids, salary_min, salary_max, job_type, contact_name, \
  contact_email, contact_phone, status, created_at, updated_at";

pub struct RawProject {
  pub id:            String,
  pub employer_id:   String,
  pub title:         String,
  pub description:   String,
  pub category_id:   String,
  pub skill_ids:     String,
  pub salary_min:    i64,
  pub salary_max:    i64,
  pub job_type:      String,
  pub contact_name:  String,
  pub contact_email: String,
  pub contact_phone: Option<String>,
  pub status:        String,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawProject {
  pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      employer_id:   row.get(1)?,
      title:         row.get(2)?,
      description:   row.get(3)?,
      category_id:   row.get(4)?,
      skill_ids:     row.get(5)?,
      salary_min:    row.get(6)?,
      salary_max:    row.get(7)?,
      job_type:      row.get(8)?,
      contact_name:  row.get(9)?,
      contact_email: row.get(10)?,
      contact_phone: row.get(11)?,
      status:        row.get(12)?,
      created_at:    row.get(13)?,
      updated_at:    row.get(14)?,
    })
  }

  pub fn into_project(self) -> Result<Project> {
    Ok(Project {
      id:          decode_id(&self.id)?,
      employer_id: decode_id(&self.employer_id)?,
      title:       self.title,
      description: self.description,
      category_id: decode_id(&self.category_id)?,
      skill_ids:   decode_ids(&self.skill_ids)?,
      salary:      Salary { min: self.salary_min, max: self.salary_max },
      job_type:    decode_enum("job_type", &self.job_type)?,
      contact:     Contact {
        name:  self.contact_name,
        email: self.contact_email,
        phone: self.contact_phone,
      },
      status:      decode_enum("status", &self.status)?,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

pub const APPLICANT_COLUMNS: &str =
  "id, project_id, freelancer_id, cover_letter, status, created_at, updated_at";

pub struct RawApplicant {
  pub id:            String,
  pub project_id:    String,
  pub freelancer_id: String,
  pub cover_letter:  Option<String>,
  pub status:        String,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawApplicant {
  pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      project_id:    row.get(1)?,
      freelancer_id: row.get(2)?,
      cover_letter:  row.get(3)?,
      status:        row.get(4)?,
      created_at:    row.get(5)?,
      updated_at:    row.get(6)?,
    })
  }

  pub fn into_applicant(self) -> Result<Applicant> {
    Ok(Applicant {
      id:            decode_id(&self.id)?,
      project_id:    decode_id(&self.project_id)?,
      freelancer_id: decode_id(&self.freelancer_id)?,
      cover_letter:  self.cover_letter,
      status:        decode_enum("status", &self.status)?,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timestamps_are_fixed_width() {
    let a = encode_dt(DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().into());
    let b = encode_dt(
      DateTime::parse_from_rfc3339("2024-01-01T00:00:00.5Z").unwrap().into(),
    );
    assert_eq!(a.len(), b.len());
    assert!(a < b);
    assert_eq!(decode_dt(&b).unwrap().timestamp_subsec_millis(), 500);
  }

  #[test]
  fn like_pattern_escapes_wildcards() {
    assert_eq!(like_pattern("Rust"), "%rust%");
    assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
  }
}
