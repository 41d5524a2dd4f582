//! Schema validation stage.
//!
//! Request shapes derive `Deserialize` + [`validator::Validate`]. The
//! [`validate_json`] and [`validate_query`] middleware parse and check a
//! shape before any later stage runs, then hand the normalised value to the
//! handler through the [`Valid`] extractor. A failure lists every violated
//! constraint, not just the first.

use std::borrow::Cow;

use axum::{
  body::Body,
  extract::{FromRequestParts, Path, Request},
  http::request::Parts,
  middleware::Next,
  response::Response,
};
use gigboard_core::DocId;
use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::error::ApiError;

pub const MAX_JSON_BODY: usize = 1024 * 1024;

/// A request value that passed its declared shape.
#[derive(Debug, Clone)]
pub struct Valid<T>(pub T);

impl<S, T> FromRequestParts<S> for Valid<T>
where
  S: Send + Sync,
  T: Clone + Send + Sync + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, ApiError> {
    parts
      .extensions
      .remove::<Valid<T>>()
      .ok_or_else(|| ApiError::internal("route is missing its validation stage"))
  }
}

/// Validation stage for a JSON body. Unknown fields are ignored; an empty
/// body is read as `{}`.
pub async fn validate_json<T>(req: Request, next: Next) -> Result<Response, ApiError>
where
  T: DeserializeOwned + Validate + Clone + Send + Sync + 'static,
{
  let (parts, body) = req.into_parts();
  let bytes = axum::body::to_bytes(body, MAX_JSON_BODY)
    .await
    .map_err(|_| ApiError::PayloadTooLarge("request body too large".into()))?;

  let json: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) { b"{}" } else { &bytes };
  let value: T = serde_json::from_slice(json)
    .map_err(|e| ApiError::Validation(format!("malformed body: {e}")))?;
  let value = check(value)?;

  let mut req = Request::from_parts(parts, Body::from(bytes));
  req.extensions_mut().insert(Valid(value));
  Ok(next.run(req).await)
}

/// Validation stage for the query string. Unknown enum values are rejected.
pub async fn validate_query<T>(mut req: Request, next: Next) -> Result<Response, ApiError>
where
  T: DeserializeOwned + Validate + Clone + Send + Sync + 'static,
{
  let value: T = parse_query(req.uri().query().unwrap_or_default())?;
  let value = check(value)?;
  req.extensions_mut().insert(Valid(value));
  Ok(next.run(req).await)
}

/// Run the declared constraints of `value`.
pub fn check<T: Validate>(value: T) -> Result<T, ApiError> {
  match value.validate() {
    Ok(()) => Ok(value),
    Err(errors) => Err(ApiError::Validation(describe(&errors))),
  }
}

pub fn parse_query<T: DeserializeOwned>(raw: &str) -> Result<T, ApiError> {
  serde_urlencoded::from_str(&normalize_query(raw))
    .map_err(|e| ApiError::Validation(format!("invalid query: {e}")))
}

/// Fold `key[]=a&key[]=b` (and repeated `key=a&key=b`) into `key=a,b` so
/// list parameters arrive as one comma-separated value.
pub fn normalize_query(raw: &str) -> String {
  let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
  for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
    let key = key.strip_suffix("[]").unwrap_or(&key).to_owned();
    match grouped.iter_mut().find(|(k, _)| *k == key) {
      Some((_, values)) => values.push(value.into_owned()),
      None => grouped.push((key, vec![value.into_owned()])),
    }
  }

  let mut out = url::form_urlencoded::Serializer::new(String::new());
  for (key, values) in &grouped {
    out.append_pair(key, &values.join(","));
  }
  out.finish()
}

/// Render every violation as `path: message`, sorted, joined with `; `.
pub fn describe(errors: &ValidationErrors) -> String {
  let mut out = Vec::new();
  flatten("", errors, &mut out);
  out.sort();
  out.join("; ")
}

fn flatten(prefix: &str, errors: &ValidationErrors, out: &mut Vec<String>) {
  for (field, kind) in errors.errors() {
    let field = field.to_string();
    // Struct-level (schema) errors are reported against the struct itself.
    let path = match (prefix.is_empty(), field == "__all__") {
      (true, true) => "body".to_owned(),
      (false, true) => prefix.to_owned(),
      (true, false) => field,
      (false, false) => format!("{prefix}.{field}"),
    };
    match kind {
      ValidationErrorsKind::Field(errs) => {
        out.extend(errs.iter().map(|e| format!("{path}: {}", describe_one(e))));
      }
      ValidationErrorsKind::Struct(inner) => flatten(&path, inner, out),
      ValidationErrorsKind::List(items) => {
        for (index, inner) in items {
          flatten(&format!("{path}[{index}]"), inner, out);
        }
      }
    }
  }
}

fn describe_one(e: &ValidationError) -> String {
  if let Some(message) = &e.message {
    return message.to_string();
  }
  let param = |key: &str| e.params.get(key).map(|v| v.to_string());
  match (e.code.as_ref(), param("min"), param("max")) {
    ("length", Some(min), Some(max)) => format!("length must be between {min} and {max}"),
    ("length", Some(min), None) => format!("length must be at least {min}"),
    ("length", None, Some(max)) => format!("length must be at most {max}"),
    ("range", Some(min), Some(max)) => format!("must be between {min} and {max}"),
    ("range", Some(min), None) => format!("must be at least {min}"),
    ("range", None, Some(max)) => format!("must be at most {max}"),
    ("email", ..) => "must be a valid email".to_owned(),
    ("required", ..) => "is required".to_owned(),
    (code, ..) => format!("failed {code} check"),
  }
}

// ─── Trimming deserializers ──────────────────────────────────────────────────

/// Trim surrounding whitespace while parsing, so length constraints see the
/// value that is stored.
pub fn trim<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
  String::deserialize(deserializer).map(|s| s.trim().to_owned())
}

pub fn trim_opt<'de, D: Deserializer<'de>>(
  deserializer: D,
) -> Result<Option<String>, D::Error> {
  Option::<String>::deserialize(deserializer).map(|s| s.map(|s| s.trim().to_owned()))
}

// ─── Custom field validators ─────────────────────────────────────────────────

fn bad_id() -> ValidationError {
  ValidationError::new("doc_id").with_message(Cow::Borrowed("must be a 24-character hex id"))
}

pub fn doc_id(value: &str) -> Result<(), ValidationError> {
  if DocId::is_valid(value) { Ok(()) } else { Err(bad_id()) }
}

pub fn doc_ids(values: &[String]) -> Result<(), ValidationError> {
  if values.iter().all(|v| DocId::is_valid(v)) {
    Ok(())
  } else {
    Err(bad_id())
  }
}

/// Parse an id that already passed [`doc_id`].
pub fn parse_id(value: &str) -> Result<DocId, ApiError> {
  DocId::parse(value).map_err(|e| ApiError::Validation(e.to_string()))
}

pub fn parse_ids(values: &[String]) -> Result<Vec<DocId>, ApiError> {
  values.iter().map(|v| parse_id(v)).collect()
}

/// Validation stage for the `{id}` path segment.
pub async fn validate_path(req: Request, next: Next) -> Result<Response, ApiError> {
  let (mut parts, body) = req.into_parts();
  let Path(raw) = Path::<String>::from_request_parts(&mut parts, &())
    .await
    .map_err(|e| ApiError::Validation(e.body_text()))?;
  let id = DocId::parse(&raw)
    .map_err(|_| ApiError::Validation(format!("id: {}", describe_one(&bad_id()))))?;

  let mut req = Request::from_parts(parts, body);
  req.extensions_mut().insert(IdPath(id));
  Ok(next.run(req).await)
}

/// The `{id}` path segment, parsed by [`validate_path`].
#[derive(Debug, Clone, Copy)]
pub struct IdPath(pub DocId);

impl<S: Send + Sync> FromRequestParts<S> for IdPath {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, ApiError> {
    parts
      .extensions
      .get::<IdPath>()
      .copied()
      .ok_or_else(|| ApiError::internal("route is missing its path validation stage"))
  }
}

#[cfg(test)]
mod tests {
  use serde::Deserialize;

  use super::*;

  #[derive(Debug, Deserialize, Validate)]
  struct Inner {
    #[validate(range(min = 1))]
    count: i64,
  }

  #[derive(Debug, Deserialize, Validate)]
  struct Shape {
    #[validate(length(min = 3, max = 50))]
    name:  String,
    #[validate(email)]
    email: String,
    #[validate(custom(function = "doc_id"))]
    ref_id: String,
    #[validate(nested)]
    inner: Inner,
  }

  #[test]
  fn collects_every_violation() {
    let shape = Shape {
      name:   "ab".into(),
      email:  "nope".into(),
      ref_id: "123".into(),
      inner:  Inner { count: 0 },
    };
    let Err(ApiError::Validation(msg)) = check(shape) else {
      panic!("expected a validation error");
    };
    assert!(msg.contains("name: length must be between 3 and 50"), "{msg}");
    assert!(msg.contains("email: must be a valid email"), "{msg}");
    assert!(msg.contains("ref_id: must be a 24-character hex id"), "{msg}");
    assert!(msg.contains("inner.count: must be at least 1"), "{msg}");
  }

  #[test]
  fn valid_shape_passes_through() {
    let shape = Shape {
      name:   "Ada".into(),
      email:  "ada@example.com".into(),
      ref_id: "507f1f77bcf86cd799439011".into(),
      inner:  Inner { count: 2 },
    };
    assert!(check(shape).is_ok());
  }

  #[test]
  fn normalize_folds_list_parameters() {
    assert_eq!(
      normalize_query("page=1&job_type[]=remote&job_type[]=hybrid"),
      "page=1&job_type=remote%2Chybrid"
    );
    assert_eq!(normalize_query("job_type=remote&job_type=onsite"), "job_type=remote%2Consite");
    assert_eq!(normalize_query(""), "");
  }

  #[derive(Debug, Deserialize, Validate)]
  struct Named {
    #[serde(default, deserialize_with = "trim")]
    #[validate(length(min = 3))]
    name:  String,
    #[serde(default, deserialize_with = "trim_opt")]
    #[validate(length(min = 3))]
    alias: Option<String>,
  }

  #[test]
  fn trimming_happens_before_length_checks() {
    let named: Named = serde_json::from_str(r#"{"name": "  ab  ", "alias": " x "}"#).unwrap();
    assert_eq!(named.name, "ab");
    assert_eq!(named.alias.as_deref(), Some("x"));
    let msg = check(named).unwrap_err().to_string();
    assert!(msg.contains("name: length must be at least 3"), "{msg}");
    assert!(msg.contains("alias: length must be at least 3"), "{msg}");

    let named: Named = serde_json::from_str(r#"{"name": " Ada "}"#).unwrap();
    assert_eq!(named.alias, None);
    assert_eq!(check(named).unwrap().name, "Ada");
  }

  #[test]
  fn parse_id_rejects_non_hex() {
    assert!(parse_id("507f1f77bcf86cd799439011").is_ok());
    assert!(matches!(parse_id("xyz"), Err(ApiError::Validation(_))));
  }
}
