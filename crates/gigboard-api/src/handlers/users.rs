//! The caller's own profile and avatar.

use axum::{
  extract::{Multipart, State},
  http::StatusCode,
};
use bytes::Bytes;
use gigboard_core::{
  DocId,
  account::{ProfileUpdate, PublicAccount},
  store::BoardStore,
};
use serde::Deserialize;
use validator::Validate;

use crate::{
  AppState,
  auth::Identity,
  error::ApiError,
  response::Envelope,
  validate::{Valid, doc_ids, parse_ids, trim_opt},
};

/// Largest accepted avatar upload.
pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

const AVATAR_FIELD: &str = "avatar";

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProfileRequest {
  #[serde(default, deserialize_with = "trim_opt")]
  #[validate(length(min = 3, max = 50))]
  pub name:      Option<String>,
  #[validate(length(min = 10, max = 15))]
  pub phone:     Option<String>,
  #[validate(length(max = 1000))]
  pub bio:       Option<String>,
  #[validate(custom(function = "doc_ids"))]
  pub skill_ids: Option<Vec<String>>,
}

pub async fn me(identity: Identity) -> Envelope<PublicAccount> {
  Envelope::ok("profile", identity.account)
}

pub async fn update_me<S: BoardStore>(
  State(state): State<AppState<S>>,
  identity: Identity,
  Valid(body): Valid<ProfileRequest>,
) -> Result<Envelope<PublicAccount>, ApiError> {
  let skill_ids = match body.skill_ids.as_deref() {
    Some(raw) => {
      let ids = parse_ids(raw)?;
      ensure_skills_exist(&*state.store, &ids).await?;
      Some(ids)
    }
    None => None,
  };

  let update = ProfileUpdate {
    name: body.name,
    phone: body.phone,
    bio: body.bio,
    skill_ids,
  };
  let account = state
    .store
    .update_profile(identity.id, update)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("account not found".into()))?;
  Ok(Envelope::ok("profile updated", account.into()))
}

/// 404 naming the first referenced skill that does not exist.
pub(crate) async fn ensure_skills_exist<S: BoardStore>(
  store: &S,
  ids: &[DocId],
) -> Result<(), ApiError> {
  let missing = store.missing_skills(ids).await.map_err(ApiError::store)?;
  match missing.first() {
    Some(id) => Err(ApiError::NotFound(format!("skill {id} not found"))),
    None => Ok(()),
  }
}

struct AvatarUpload {
  bytes:        Bytes,
  filename:     String,
  content_type: String,
}

async fn read_avatar(mut multipart: Multipart) -> Result<AvatarUpload, ApiError> {
  let bad = |e: axum::extract::multipart::MultipartError| {
    let message = format!("avatar: {}", e.body_text());
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
      ApiError::PayloadTooLarge(message)
    } else {
      ApiError::Validation(message)
    }
  };
  while let Some(field) = multipart.next_field().await.map_err(bad)? {
    if field.name() != Some(AVATAR_FIELD) {
      continue;
    }
    let content_type = field.content_type().unwrap_or_default().to_owned();
    if !content_type.starts_with("image/") {
      return Err(ApiError::Validation("avatar: must be an image".into()));
    }
    let filename = field.file_name().unwrap_or("avatar").to_owned();
    let bytes = field.bytes().await.map_err(bad)?;
    if bytes.is_empty() {
      return Err(ApiError::Validation("avatar: file is empty".into()));
    }
    if bytes.len() > MAX_AVATAR_BYTES {
      return Err(ApiError::PayloadTooLarge("avatar: file exceeds 5 MiB".into()));
    }
    return Ok(AvatarUpload { bytes, filename, content_type });
  }
  Err(ApiError::Validation("avatar: is required".into()))
}

pub async fn upload_avatar<S: BoardStore>(
  State(state): State<AppState<S>>,
  identity: Identity,
  multipart: Multipart,
) -> Result<Envelope<PublicAccount>, ApiError> {
  let upload = read_avatar(multipart).await?;
  let avatar = state
    .images
    .upload(upload.bytes, upload.filename, upload.content_type)
    .await?;

  let account = state
    .store
    .set_avatar(identity.id, Some(avatar))
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("account not found".into()))?;

  // The previous image is orphaned if this fails; the profile already points
  // at the new one.
  if let Some(old) = identity.account.avatar {
    if let Err(e) = state.images.delete(&old.delete_id).await {
      tracing::warn!(delete_id = %old.delete_id, error = %e, "failed to delete replaced avatar");
    }
  }
  Ok(Envelope::ok("avatar updated", account.into()))
}

pub async fn delete_avatar<S: BoardStore>(
  State(state): State<AppState<S>>,
  identity: Identity,
) -> Result<Envelope<PublicAccount>, ApiError> {
  let Some(avatar) = identity.account.avatar.clone() else {
    return Err(ApiError::NotFound("no avatar to delete".into()));
  };
  state.images.delete(&avatar.delete_id).await?;
  let account = state
    .store
    .set_avatar(identity.id, None)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("account not found".into()))?;
  Ok(Envelope::ok("avatar deleted", account.into()))
}
