//! The `BoardStore` trait, the data-access collaborator behind every
//! handler.
//!
//! The trait is implemented by storage backends (e.g.
//! `gigboard-store-sqlite`). The API layer depends on this abstraction, not on
//! any concrete backend. No method wraps several steps in a transaction; the
//! only conditional write is [`BoardStore::swap_refresh_token`].

use std::future::Future;

use crate::{
  DocId,
  account::{Account, AccountQuery, AccountStatus, Avatar, NewAccount, ProfileUpdate},
  applicant::{Applicant, ApplicantQuery, ApplicantStatus, NewApplicant},
  catalog::{Category, CategoryUpdate, NewCategory, Skill},
  page::{Page, PageQuery},
  project::{NewProject, Project, ProjectQuery, ProjectStatus, ProjectUpdate},
};

/// Abstraction over a gigboard storage backend.
///
/// Update methods return `None` when the target row does not exist. Unique
/// constraint violations surface as [`crate::Error::Conflict`] once the
/// backend error is converted.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait BoardStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static + Into<crate::Error>;

  // ── Accounts ──────────────────────────────────────────────────────────

  /// Persist a new `Active` account. Fails with a conflict if the email is
  /// taken.
  fn create_account(
    &self,
    input: NewAccount,
  ) -> impl Future<Output = Result<Account, Self::Error>> + Send + '_;

  fn get_account(
    &self,
    id: DocId,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_;

  /// Exact match on the stored (lowercased) email.
  fn find_account_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + 'a;

  fn update_profile(
    &self,
    id: DocId,
    update: ProfileUpdate,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_;

  fn set_avatar(
    &self,
    id: DocId,
    avatar: Option<Avatar>,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_;

  fn set_account_status(
    &self,
    id: DocId,
    status: AccountStatus,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_;

  /// Replace the stored refresh credential with `new` only if it currently
  /// equals `expected` (`None` matching an empty slot). Returns whether the
  /// swap happened.
  fn swap_refresh_token(
    &self,
    id: DocId,
    expected: Option<String>,
    new: Option<String>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn list_accounts<'a>(
    &'a self,
    query: &'a AccountQuery,
  ) -> impl Future<Output = Result<Page<Account>, Self::Error>> + Send + 'a;

  // ── Catalogue ─────────────────────────────────────────────────────────

  /// Fails with a conflict if the name is taken.
  fn create_category(
    &self,
    input: NewCategory,
  ) -> impl Future<Output = Result<Category, Self::Error>> + Send + '_;

  fn get_category(
    &self,
    id: DocId,
  ) -> impl Future<Output = Result<Option<Category>, Self::Error>> + Send + '_;

  fn list_categories<'a>(
    &'a self,
    query: &'a PageQuery,
  ) -> impl Future<Output = Result<Page<Category>, Self::Error>> + Send + 'a;

  fn update_category(
    &self,
    id: DocId,
    update: CategoryUpdate,
  ) -> impl Future<Output = Result<Option<Category>, Self::Error>> + Send + '_;

  /// Returns `false` if nothing was deleted.
  fn delete_category(
    &self,
    id: DocId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Fails with a conflict if the name is taken.
  fn create_skill(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Skill, Self::Error>> + Send + '_;

  fn get_skill(
    &self,
    id: DocId,
  ) -> impl Future<Output = Result<Option<Skill>, Self::Error>> + Send + '_;

  fn list_skills<'a>(
    &'a self,
    query: &'a PageQuery,
  ) -> impl Future<Output = Result<Page<Skill>, Self::Error>> + Send + 'a;

  fn rename_skill(
    &self,
    id: DocId,
    name: String,
  ) -> impl Future<Output = Result<Option<Skill>, Self::Error>> + Send + '_;

  fn delete_skill(
    &self,
    id: DocId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Return the ids in `ids` that do not name a stored skill.
  fn missing_skills<'a>(
    &'a self,
    ids: &'a [DocId],
  ) -> impl Future<Output = Result<Vec<DocId>, Self::Error>> + Send + 'a;

  // ── Projects ──────────────────────────────────────────────────────────

  fn create_project(
    &self,
    input: NewProject,
  ) -> impl Future<Output = Result<Project, Self::Error>> + Send + '_;

  fn get_project(
    &self,
    id: DocId,
  ) -> impl Future<Output = Result<Option<Project>, Self::Error>> + Send + '_;

  fn list_projects<'a>(
    &'a self,
    query: &'a ProjectQuery,
  ) -> impl Future<Output = Result<Page<Project>, Self::Error>> + Send + 'a;

  fn update_project(
    &self,
    id: DocId,
    update: ProjectUpdate,
  ) -> impl Future<Output = Result<Option<Project>, Self::Error>> + Send + '_;

  fn set_project_status(
    &self,
    id: DocId,
    status: ProjectStatus,
  ) -> impl Future<Output = Result<Option<Project>, Self::Error>> + Send + '_;

  // ── Applicants ────────────────────────────────────────────────────────

  /// Fails with a conflict if the freelancer already applied to the project.
  fn create_applicant(
    &self,
    input: NewApplicant,
  ) -> impl Future<Output = Result<Applicant, Self::Error>> + Send + '_;

  fn get_applicant(
    &self,
    id: DocId,
  ) -> impl Future<Output = Result<Option<Applicant>, Self::Error>> + Send + '_;

  fn list_applicants<'a>(
    &'a self,
    query: &'a ApplicantQuery,
  ) -> impl Future<Output = Result<Page<Applicant>, Self::Error>> + Send + 'a;

  fn set_applicant_status(
    &self,
    id: DocId,
    status: ApplicantStatus,
  ) -> impl Future<Output = Result<Option<Applicant>, Self::Error>> + Send + '_;
}
