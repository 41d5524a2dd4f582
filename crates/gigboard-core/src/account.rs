//! Accounts: the persisted identities of freelancers and employers.
//!
//! The administrator is not an account: it is a static configured identity
//! and never appears in the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{DocId, page::PageQuery};

/// Coarse permission class of a stored account.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  Freelancer,
  Employer,
}

/// Lifecycle flag gating authorization. Accounts are never hard-deleted.
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
pub enum AccountStatus {
  #[default]
  Active,
  Deleted,
  Blocked,
}

impl AccountStatus {
  pub fn is_active(&self) -> bool { matches!(self, Self::Active) }
}

/// A hosted avatar image. `delete_id` is the handle the image host needs to
/// remove it again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Avatar {
  pub url:       String,
  pub delete_id: String,
}

/// The full stored account record, secrets included.
///
/// Never serialise this to a client; convert to [`PublicAccount`] first.
#[derive(Debug, Clone)]
pub struct Account {
  pub id:            DocId,
  pub name:          String,
  pub email:         String,
  pub phone:         Option<String>,
  /// argon2 PHC string. `None` for accounts created through Google login.
  pub password_hash: Option<String>,
  pub role:          Role,
  pub status:        AccountStatus,
  pub bio:           Option<String>,
  pub skill_ids:     Vec<DocId>,
  pub avatar:        Option<Avatar>,
  /// The single currently valid refresh credential, if a session is open.
  pub refresh_token: Option<String>,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

/// An account with password hash and refresh credential stripped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicAccount {
  pub id:         DocId,
  pub name:       String,
  pub email:      String,
  pub phone:      Option<String>,
  pub role:       Role,
  pub status:     AccountStatus,
  pub bio:        Option<String>,
  pub skill_ids:  Vec<DocId>,
  pub avatar:     Option<Avatar>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl From<Account> for PublicAccount {
  fn from(a: Account) -> Self {
    PublicAccount {
      id:         a.id,
      name:       a.name,
      email:      a.email,
      phone:      a.phone,
      role:       a.role,
      status:     a.status,
      bio:        a.bio,
      skill_ids:  a.skill_ids,
      avatar:     a.avatar,
      created_at: a.created_at,
      updated_at: a.updated_at,
    }
  }
}

/// Input to [`BoardStore::create_account`](crate::store::BoardStore::create_account).
#[derive(Debug, Clone)]
pub struct NewAccount {
  pub name:          String,
  /// Stored lowercased; the store does not normalise it.
  pub email:         String,
  pub phone:         Option<String>,
  pub password_hash: Option<String>,
  pub role:          Role,
}

/// Partial update of the caller-editable profile fields. `None` leaves the
/// stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
  pub name:      Option<String>,
  pub phone:     Option<String>,
  pub bio:       Option<String>,
  pub skill_ids: Option<Vec<DocId>>,
}

/// Parameters for the admin account listing.
#[derive(Debug, Clone, Default)]
pub struct AccountQuery {
  pub page:   PageQuery,
  pub role:   Option<Role>,
  pub status: Option<AccountStatus>,
}
