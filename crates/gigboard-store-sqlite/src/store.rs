//! [`SqliteStore`]: the SQLite implementation of [`BoardStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, types::Value};

use gigboard_core::{
  DocId,
  account::{Account, AccountQuery, AccountStatus, Avatar, NewAccount, ProfileUpdate},
  applicant::{Applicant, ApplicantQuery, ApplicantStatus, NewApplicant},
  catalog::{Category, CategoryUpdate, NewCategory, Skill},
  page::{Page, PageQuery},
  project::{NewProject, Project, ProjectQuery, ProjectStatus, ProjectUpdate},
  store::BoardStore,
};

use crate::{
  Result,
  encode::{
    ACCOUNT_COLUMNS, APPLICANT_COLUMNS, CATEGORY_COLUMNS, PROJECT_COLUMNS,
    RawAccount, RawApplicant, RawCategory, RawProject, RawSkill, SKILL_COLUMNS,
    encode_dt, encode_ids,
  },
  filter::{Filter, select_page},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A gigboard store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. The
/// composition root owns the lifecycle: [`SqliteStore::open`] to connect and
/// [`SqliteStore::close`] on shutdown.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mainly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Close the underlying connection. Every clone of this store fails with
  /// a closed-connection error afterwards.
  pub async fn close(self) -> Result<()> {
    self.conn.close().await?;
    tracing::debug!("sqlite store closed");
    Ok(())
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Fetch a single row by id from `table`.
  async fn fetch_one<R: Send + 'static>(
    &self,
    table: &'static str,
    columns: &'static str,
    id: DocId,
    read: fn(&rusqlite::Row<'_>) -> rusqlite::Result<R>,
  ) -> Result<Option<R>> {
    let id_str = id.to_string();
    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {columns} FROM {table} WHERE id = ?1"),
            rusqlite::params![id_str],
            read,
          )
          .optional()?)
      })
      .await?;
    Ok(raw)
  }

  /// Run a filtered, paginated listing over `table`.
  async fn fetch_page<R: Send + 'static>(
    &self,
    table: &'static str,
    columns: &'static str,
    filter: Filter,
    page: PageQuery,
    read: fn(&rusqlite::Row<'_>) -> rusqlite::Result<R>,
  ) -> Result<(Vec<R>, u64)> {
    let rows = self
      .conn
      .call(move |conn| Ok(select_page(conn, table, columns, &filter, &page, read)?))
      .await?;
    Ok(rows)
  }

  /// Execute a single write statement and report whether any row changed.
  async fn execute(
    &self,
    sql: &'static str,
    params: Vec<Value>,
  ) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(sql, rusqlite::params_from_iter(params.iter()))?)
      })
      .await?;
    Ok(changed > 0)
  }
}

fn text(s: impl Into<String>) -> Value { Value::Text(s.into()) }

fn opt_text(s: Option<impl Into<String>>) -> Value {
  match s {
    Some(s) => Value::Text(s.into()),
    None => Value::Null,
  }
}

// ─── BoardStore impl ─────────────────────────────────────────────────────────

impl BoardStore for SqliteStore {
  type Error = crate::Error;

  // ── Accounts ──────────────────────────────────────────────────────────────

  async fn create_account(&self, input: NewAccount) -> Result<Account> {
    let now = Utc::now();
    let account = Account {
      id:            DocId::generate(),
      name:          input.name,
      email:         input.email,
      phone:         input.phone,
      password_hash: input.password_hash,
      role:          input.role,
      status:        AccountStatus::Active,
      bio:           None,
      skill_ids:     Vec::new(),
      avatar:        None,
      refresh_token: None,
      created_at:    now,
      updated_at:    now,
    };

    self
      .execute(
        "INSERT INTO accounts (id, name, email, phone, password_hash, role,
           status, skill_ids, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, '[]', ?, ?)",
        vec![
          text(account.id.to_string()),
          text(account.name.clone()),
          text(account.email.clone()),
          opt_text(account.phone.clone()),
          opt_text(account.password_hash.clone()),
          text(account.role.as_ref()),
          text(account.status.as_ref()),
          text(encode_dt(now)),
          text(encode_dt(now)),
        ],
      )
      .await?;

    tracing::debug!(id = %account.id, role = %account.role, "account created");
    Ok(account)
  }

  async fn get_account(&self, id: DocId) -> Result<Option<Account>> {
    self
      .fetch_one("accounts", ACCOUNT_COLUMNS, id, RawAccount::read)
      .await?
      .map(RawAccount::into_account)
      .transpose()
  }

  async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
    let email = email.to_owned();
    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = ?1"),
            rusqlite::params![email],
            RawAccount::read,
          )
          .optional()?)
      })
      .await?;
    raw.map(RawAccount::into_account).transpose()
  }

  async fn update_profile(
    &self,
    id: DocId,
    update: ProfileUpdate,
  ) -> Result<Option<Account>> {
    let skill_ids = update.skill_ids.as_deref().map(encode_ids).transpose()?;
    let changed = self
      .execute(
        "UPDATE accounts SET
           name      = COALESCE(?, name),
           phone     = COALESCE(?, phone),
           bio       = COALESCE(?, bio),
           skill_ids = COALESCE(?, skill_ids),
           updated_at = ?
         WHERE id = ?",
        vec![
          opt_text(update.name),
          opt_text(update.phone),
          opt_text(update.bio),
          opt_text(skill_ids),
          text(encode_dt(Utc::now())),
          text(id.to_string()),
        ],
      )
      .await?;
    if !changed {
      return Ok(None);
    }
    self.get_account(id).await
  }

  async fn set_avatar(&self, id: DocId, avatar: Option<Avatar>) -> Result<Option<Account>> {
    let (url, delete_id) = match avatar {
      Some(a) => (Some(a.url), Some(a.delete_id)),
      None => (None, None),
    };
    let changed = self
      .execute(
        "UPDATE accounts SET avatar_url = ?, avatar_delete_id = ?, updated_at = ?
         WHERE id = ?",
        vec![
          opt_text(url),
          opt_text(delete_id),
          text(encode_dt(Utc::now())),
          text(id.to_string()),
        ],
      )
      .await?;
    if !changed {
      return Ok(None);
    }
    self.get_account(id).await
  }

  async fn set_account_status(
    &self,
    id: DocId,
    status: AccountStatus,
  ) -> Result<Option<Account>> {
    let changed = self
      .execute(
        "UPDATE accounts SET status = ?, updated_at = ? WHERE id = ?",
        vec![
          text(status.as_ref()),
          text(encode_dt(Utc::now())),
          text(id.to_string()),
        ],
      )
      .await?;
    if !changed {
      return Ok(None);
    }
    self.get_account(id).await
  }

  async fn swap_refresh_token(
    &self,
    id: DocId,
    expected: Option<String>,
    new: Option<String>,
  ) -> Result<bool> {
    // `IS` compares NULL to NULL as equal, so an empty slot matches `None`.
    self
      .execute(
        "UPDATE accounts SET refresh_token = ?, updated_at = ?
         WHERE id = ? AND refresh_token IS ?",
        vec![
          opt_text(new),
          text(encode_dt(Utc::now())),
          text(id.to_string()),
          opt_text(expected),
        ],
      )
      .await
  }

  async fn list_accounts(&self, query: &AccountQuery) -> Result<Page<Account>> {
    let mut filter = Filter::default();
    if let Some(role) = query.role {
      filter.eq("role", role.as_ref());
    }
    if let Some(status) = query.status {
      filter.eq("status", status.as_ref());
    }
    filter.search(&["name", "email"], query.page.search.as_deref());

    let (raws, total) = self
      .fetch_page(
        "accounts",
        ACCOUNT_COLUMNS,
        filter,
        query.page.clone(),
        RawAccount::read,
      )
      .await?;
    let items = raws
      .into_iter()
      .map(RawAccount::into_account)
      .collect::<Result<_>>()?;
    Ok(Page { items, total })
  }

  // ── Catalogue ─────────────────────────────────────────────────────────────

  async fn create_category(&self, input: NewCategory) -> Result<Category> {
    let now = Utc::now();
    let category = Category {
      id:          DocId::generate(),
      name:        input.name,
      description: input.description,
      created_at:  now,
      updated_at:  now,
    };
    self
      .execute(
        "INSERT INTO categories (id, name, description, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?)",
        vec![
          text(category.id.to_string()),
          text(category.name.clone()),
          opt_text(category.description.clone()),
          text(encode_dt(now)),
          text(encode_dt(now)),
        ],
      )
      .await?;
    Ok(category)
  }

  async fn get_category(&self, id: DocId) -> Result<Option<Category>> {
    self
      .fetch_one("categories", CATEGORY_COLUMNS, id, RawCategory::read)
      .await?
      .map(RawCategory::into_category)
      .transpose()
  }

  async fn list_categories(&self, query: &PageQuery) -> Result<Page<Category>> {
    let mut filter = Filter::default();
    filter.search(&["name"], query.search.as_deref());
    let (raws, total) = self
      .fetch_page(
        "categories",
        CATEGORY_COLUMNS,
        filter,
        query.clone(),
        RawCategory::read,
      )
      .await?;
    let items = raws
      .into_iter()
      .map(RawCategory::into_category)
      .collect::<Result<_>>()?;
    Ok(Page { items, total })
  }

  async fn update_category(
    &self,
    id: DocId,
    update: CategoryUpdate,
  ) -> Result<Option<Category>> {
    let changed = self
      .execute(
        "UPDATE categories SET
           name        = COALESCE(?, name),
           description = COALESCE(?, description),
           updated_at  = ?
         WHERE id = ?",
        vec![
          opt_text(update.name),
          opt_text(update.description),
          text(encode_dt(Utc::now())),
          text(id.to_string()),
        ],
      )
      .await?;
    if !changed {
      return Ok(None);
    }
    self.get_category(id).await
  }

  async fn delete_category(&self, id: DocId) -> Result<bool> {
    self
      .execute("DELETE FROM categories WHERE id = ?", vec![text(id.to_string())])
      .await
  }

  async fn create_skill(&self, name: String) -> Result<Skill> {
    let now = Utc::now();
    let skill = Skill {
      id: DocId::generate(),
      name,
      created_at: now,
      updated_at: now,
    };
    self
      .execute(
        "INSERT INTO skills (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)",
        vec![
          text(skill.id.to_string()),
          text(skill.name.clone()),
          text(encode_dt(now)),
          text(encode_dt(now)),
        ],
      )
      .await?;
    Ok(skill)
  }

  async fn get_skill(&self, id: DocId) -> Result<Option<Skill>> {
    self
      .fetch_one("skills", SKILL_COLUMNS, id, RawSkill::read)
      .await?
      .map(RawSkill::into_skill)
      .transpose()
  }

  async fn list_skills(&self, query: &PageQuery) -> Result<Page<Skill>> {
    let mut filter = Filter::default();
    filter.search(&["name"], query.search.as_deref());
    let (raws, total) = self
      .fetch_page("skills", SKILL_COLUMNS, filter, query.clone(), RawSkill::read)
      .await?;
    let items = raws
      .into_iter()
      .map(RawSkill::into_skill)
      .collect::<Result<_>>()?;
    Ok(Page { items, total })
  }

  async fn rename_skill(&self, id: DocId, name: String) -> Result<Option<Skill>> {
    let changed = self
      .execute(
        "UPDATE skills SET name = ?, updated_at = ? WHERE id = ?",
        vec![text(name), text(encode_dt(Utc::now())), text(id.to_string())],
      )
      .await?;
    if !changed {
      return Ok(None);
    }
    self.get_skill(id).await
  }

  async fn delete_skill(&self, id: DocId) -> Result<bool> {
    self
      .execute("DELETE FROM skills WHERE id = ?", vec![text(id.to_string())])
      .await
  }

  async fn missing_skills(&self, ids: &[DocId]) -> Result<Vec<DocId>> {
    let wanted: Vec<DocId> = ids.to_vec();
    let missing = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare("SELECT 1 FROM skills WHERE id = ?1")?;
        let mut missing = Vec::new();
        for id in wanted {
          if !stmt.exists(rusqlite::params![id.to_string()])? {
            missing.push(id);
          }
        }
        Ok(missing)
      })
      .await?;
    Ok(missing)
  }

  // ── Projects ──────────────────────────────────────────────────────────────

  async fn create_project(&self, input: NewProject) -> Result<Project> {
    let now = Utc::now();
    let project = Project {
      id:          DocId::generate(),
      employer_id: input.employer_id,
      title:       input.title,
      description: input.description,
      category_id: input.category_id,
      skill_ids:   input.skill_ids,
      salary:      input.salary,
      job_type:    input.job_type,
      contact:     input.contact,
      status:      ProjectStatus::Open,
      created_at:  now,
      updated_at:  now,
    };

    self
      .execute(
        "INSERT INTO projects (id, employer_id, title, description, category_id,
           skill_ids, salary_min, salary_max, job_type, contact_name,
           contact_email, contact_phone, status, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        vec![
          text(project.id.to_string()),
          text(project.employer_id.to_string()),
          text(project.title.clone()),
          text(project.description.clone()),
          text(project.category_id.to_string()),
          text(encode_ids(&project.skill_ids)?),
          Value::Integer(project.salary.min),
          Value::Integer(project.salary.max),
          text(project.job_type.as_ref()),
          text(project.contact.name.clone()),
          text(project.contact.email.clone()),
          opt_text(project.contact.phone.clone()),
          text(project.status.as_ref()),
          text(encode_dt(now)),
          text(encode_dt(now)),
        ],
      )
      .await?;

    tracing::debug!(id = %project.id, employer = %project.employer_id, "project created");
    Ok(project)
  }

  async fn get_project(&self, id: DocId) -> Result<Option<Project>> {
    self
      .fetch_one("projects", PROJECT_COLUMNS, id, RawProject::read)
      .await?
      .map(RawProject::into_project)
      .transpose()
  }

  async fn list_projects(&self, query: &ProjectQuery) -> Result<Page<Project>> {
    let mut filter = Filter::default();
    filter.any_of(
      "job_type",
      query.job_types.iter().map(|t| t.as_ref().to_owned()).collect(),
    );
    if let Some(category_id) = query.category_id {
      filter.eq("category_id", category_id.to_string());
    }
    if let Some(skill_id) = query.skill_id {
      filter.raw(
        "EXISTS (SELECT 1 FROM json_each(projects.skill_ids) WHERE json_each.value = ?)",
        skill_id.to_string(),
      );
    }
    if let Some(employer_id) = query.employer_id {
      filter.eq("employer_id", employer_id.to_string());
    }
    if let Some(status) = query.status {
      filter.eq("status", status.as_ref());
    }
    filter.search(&["title"], query.page.search.as_deref());

    let (raws, total) = self
      .fetch_page(
        "projects",
        PROJECT_COLUMNS,
        filter,
        query.page.clone(),
        RawProject::read,
      )
      .await?;
    let items = raws
      .into_iter()
      .map(RawProject::into_project)
      .collect::<Result<_>>()?;
    Ok(Page { items, total })
  }

  async fn update_project(
    &self,
    id: DocId,
    update: ProjectUpdate,
  ) -> Result<Option<Project>> {
    let skill_ids = update.skill_ids.as_deref().map(encode_ids).transpose()?;
    let (salary_min, salary_max) = match update.salary {
      Some(s) => (Value::Integer(s.min), Value::Integer(s.max)),
      None => (Value::Null, Value::Null),
    };
    let (contact_name, contact_email, contact_phone) = match update.contact {
      Some(c) => (text(c.name), text(c.email), opt_text(c.phone)),
      None => (Value::Null, Value::Null, Value::Null),
    };
    // A replacement contact replaces the phone too, even with NULL.
    let changed = self
      .execute(
        "UPDATE projects SET
           title         = COALESCE(?1, title),
           description   = COALESCE(?2, description),
           category_id   = COALESCE(?3, category_id),
           skill_ids     = COALESCE(?4, skill_ids),
           salary_min    = COALESCE(?5, salary_min),
           salary_max    = COALESCE(?6, salary_max),
           job_type      = COALESCE(?7, job_type),
           contact_phone = CASE WHEN ?8 IS NULL THEN contact_phone ELSE ?10 END,
           contact_name  = COALESCE(?8, contact_name),
           contact_email = COALESCE(?9, contact_email),
           updated_at    = ?11
         WHERE id = ?12",
        vec![
          opt_text(update.title),
          opt_text(update.description),
          opt_text(update.category_id.map(|id| id.to_string())),
          opt_text(skill_ids),
          salary_min,
          salary_max,
          opt_text(update.job_type.map(|t| t.as_ref().to_owned())),
          contact_name,
          contact_email,
          contact_phone,
          text(encode_dt(Utc::now())),
          text(id.to_string()),
        ],
      )
      .await?;
    if !changed {
      return Ok(None);
    }
    self.get_project(id).await
  }

  async fn set_project_status(
    &self,
    id: DocId,
    status: ProjectStatus,
  ) -> Result<Option<Project>> {
    let changed = self
      .execute(
        "UPDATE projects SET status = ?, updated_at = ? WHERE id = ?",
        vec![
          text(status.as_ref()),
          text(encode_dt(Utc::now())),
          text(id.to_string()),
        ],
      )
      .await?;
    if !changed {
      return Ok(None);
    }
    self.get_project(id).await
  }

  // ── Applicants ────────────────────────────────────────────────────────────

  async fn create_applicant(&self, input: NewApplicant) -> Result<Applicant> {
    let now = Utc::now();
    let applicant = Applicant {
      id:            DocId::generate(),
      project_id:    input.project_id,
      freelancer_id: input.freelancer_id,
      cover_letter:  input.cover_letter,
      status:        ApplicantStatus::Pending,
      created_at:    now,
      updated_at:    now,
    };
    self
      .execute(
        "INSERT INTO applicants (id, project_id, freelancer_id, cover_letter,
           status, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        vec![
          text(applicant.id.to_string()),
          text(applicant.project_id.to_string()),
          text(applicant.freelancer_id.to_string()),
          opt_text(applicant.cover_letter.clone()),
          text(applicant.status.as_ref()),
          text(encode_dt(now)),
          text(encode_dt(now)),
        ],
      )
      .await?;
    Ok(applicant)
  }

  async fn get_applicant(&self, id: DocId) -> Result<Option<Applicant>> {
    self
      .fetch_one("applicants", APPLICANT_COLUMNS, id, RawApplicant::read)
      .await?
      .map(RawApplicant::into_applicant)
      .transpose()
  }

  async fn list_applicants(&self, query: &ApplicantQuery) -> Result<Page<Applicant>> {
    let mut filter = Filter::default();
    if let Some(project_id) = query.project_id {
      filter.eq("project_id", project_id.to_string());
    }
    if let Some(freelancer_id) = query.freelancer_id {
      filter.eq("freelancer_id", freelancer_id.to_string());
    }
    filter.search(&["cover_letter"], query.page.search.as_deref());

    let (raws, total) = self
      .fetch_page(
        "applicants",
        APPLICANT_COLUMNS,
        filter,
        query.page.clone(),
        RawApplicant::read,
      )
      .await?;
    let items = raws
      .into_iter()
      .map(RawApplicant::into_applicant)
      .collect::<Result<_>>()?;
    Ok(Page { items, total })
  }

  async fn set_applicant_status(
    &self,
    id: DocId,
    status: ApplicantStatus,
  ) -> Result<Option<Applicant>> {
    let changed = self
      .execute(
        "UPDATE applicants SET status = ?, updated_at = ? WHERE id = ?",
        vec![
          text(status.as_ref()),
          text(encode_dt(Utc::now())),
          text(id.to_string()),
        ],
      )
      .await?;
    if !changed {
      return Ok(None);
    }
    self.get_applicant(id).await
  }
}
