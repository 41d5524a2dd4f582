//! JSON REST API for gigboard.
//!
//! Exposes an axum [`Router`] backed by any [`BoardStore`]. Every route runs
//! a fixed sequence of stages before its handler: schema validation, then
//! authorization, then an optional role check. The first failing stage
//! answers the request.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let state = gigboard_api::AppState::new(store.clone(), config)?;
//! axum::serve(listener, gigboard_api::api_router(state)).await?;
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod password;
pub mod response;
pub mod token;
pub mod upstream;
pub mod validate;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::{
  Router,
  extract::DefaultBodyLimit,
  middleware::{from_fn, from_fn_with_state, map_response},
  routing::{delete, get, patch, post},
};
use gigboard_core::store::BoardStore;
use tower::ServiceBuilder;
use thiserror::Error;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

use auth::{authorize_admin, authorize_user, require_employer, require_freelancer};
use config::{Environment, ServerConfig};
use error::attach_error_trace;
use handlers::{
  PageParams, admin, applicants, auth as session, categories, projects, skills, users,
};
use token::{TokenError, TokenIssuer};
use upstream::{UpstreamError, identity::IdentityProvider, images::ImageHost};
use validate::{validate_json, validate_path, validate_query};

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all middleware stages and handlers.
#[derive(Clone)]
pub struct AppState<S: BoardStore> {
  pub store:    Arc<S>,
  pub config:   Arc<ServerConfig>,
  pub tokens:   Arc<TokenIssuer>,
  pub images:   Arc<ImageHost>,
  pub identity: Arc<IdentityProvider>,
}

/// A configuration value the state cannot be built from.
#[derive(Debug, Error)]
pub enum StateError {
  #[error(transparent)]
  Token(#[from] TokenError),
  #[error(transparent)]
  Upstream(#[from] UpstreamError),
}

impl<S: BoardStore> AppState<S> {
  pub fn new(store: S, config: ServerConfig) -> Result<Self, StateError> {
    Ok(Self {
      store:    Arc::new(store),
      tokens:   Arc::new(TokenIssuer::from_config(&config.auth)?),
      images:   Arc::new(ImageHost::new(config.image_host.clone())?),
      identity: Arc::new(IdentityProvider::new(&config.oauth)?),
      config:   Arc::new(config),
    })
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full API router.
///
/// Stages are attached per route with `route_layer`, listed in the order
/// they run. Validated values and the resolved identity reach handlers
/// through request extensions.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: BoardStore + Clone + 'static,
{
  let user_stage = || from_fn_with_state(state.clone(), authorize_user::<S>);
  let admin_stage = || from_fn_with_state(state.clone(), authorize_admin::<S>);
  let page = || from_fn(validate_query::<PageParams>);
  let project_page = || from_fn(validate_query::<projects::ProjectListParams>);
  let id_path = || from_fn(validate_path);

  let router = Router::new()
    .route("/health", get(handlers::health))
    // Sessions
    .route(
      "/auth/register",
      post(session::register::<S>)
        .route_layer(from_fn(validate_json::<session::RegisterRequest>)),
    )
    .route(
      "/auth/login",
      post(session::login::<S>).route_layer(from_fn(validate_json::<session::LoginRequest>)),
    )
    .route(
      "/auth/refresh",
      post(session::refresh::<S>)
        .route_layer(from_fn(validate_json::<session::RefreshRequest>)),
    )
    .route(
      "/auth/google",
      post(session::google::<S>)
        .route_layer(from_fn(validate_json::<session::GoogleLoginRequest>)),
    )
    .route("/auth/logout", post(session::logout::<S>).route_layer(user_stage()))
    // Own profile
    .route(
      "/user/me",
      get(users::me).route_layer(user_stage()).merge(
        patch(users::update_me::<S>).route_layer(
          ServiceBuilder::new()
            .layer(from_fn(validate_json::<users::ProfileRequest>))
            .layer(user_stage()),
        ),
      ),
    )
    .route(
      "/user/me/avatar",
      post(users::upload_avatar::<S>)
        .delete(users::delete_avatar::<S>)
        .route_layer(
          ServiceBuilder::new()
            .layer(user_stage())
            .layer(DefaultBodyLimit::max(users::MAX_AVATAR_BYTES + 64 * 1024)),
        ),
    )
    // Catalogue, public reads
    .route("/category/get-all", get(categories::list::<S>).route_layer(page()))
    .route("/category/{id}", get(categories::get::<S>).route_layer(id_path()))
    .route("/skill/get-all", get(skills::list::<S>).route_layer(page()))
    .route("/skill/{id}", get(skills::get::<S>).route_layer(id_path()))
    // Projects
    .route("/project/get-all-pagination", get(projects::list::<S>).route_layer(project_page()))
    .route(
      "/project/mine",
      get(projects::mine::<S>).route_layer(
        ServiceBuilder::new()
          .layer(project_page())
          .layer(user_stage())
          .layer(from_fn(require_employer)),
      ),
    )
    .route(
      "/project",
      post(projects::create::<S>).route_layer(
        ServiceBuilder::new()
          .layer(from_fn(validate_json::<projects::ProjectRequest>))
          .layer(user_stage())
          .layer(from_fn(require_employer)),
      ),
    )
    .route(
      "/project/{id}",
      get(projects::get::<S>).merge(
        patch(projects::update::<S>)
          .route_layer(
            ServiceBuilder::new()
              .layer(from_fn(validate_json::<projects::ProjectUpdateRequest>))
              .layer(user_stage())
              .layer(from_fn(require_employer)),
          )
          .merge(
            delete(projects::close::<S>).route_layer(
              ServiceBuilder::new().layer(user_stage()).layer(from_fn(require_employer)),
            ),
          ),
      )
      // Outermost, so the id is checked before any method stage.
      .route_layer(id_path()),
    )
    .route(
      "/project/{id}/applicants",
      get(projects::applicants::<S>).route_layer(
        ServiceBuilder::new()
          .layer(id_path())
          .layer(page())
          .layer(user_stage())
          .layer(from_fn(require_employer)),
      ),
    )
    // Applications
    .route(
      "/project/{id}/apply",
      post(applicants::apply::<S>).route_layer(
        ServiceBuilder::new()
          .layer(id_path())
          .layer(from_fn(validate_json::<applicants::ApplyRequest>))
          .layer(user_stage())
          .layer(from_fn(require_freelancer)),
      ),
    )
    .route(
      "/applicant/mine",
      get(applicants::mine::<S>).route_layer(
        ServiceBuilder::new()
          .layer(page())
          .layer(user_stage())
          .layer(from_fn(require_freelancer)),
      ),
    )
    .route(
      "/applicant/{id}/status",
      patch(applicants::set_status::<S>).route_layer(
        ServiceBuilder::new()
          .layer(id_path())
          .layer(from_fn(validate_json::<applicants::ApplicantStatusRequest>))
          .layer(user_stage())
          .layer(from_fn(require_employer)),
      ),
    )
    // Administration
    .route(
      "/admin/login",
      post(session::admin_login::<S>)
        .route_layer(from_fn(validate_json::<session::AdminLoginRequest>)),
    )
    .route(
      "/admin/category",
      post(categories::create::<S>).route_layer(
        ServiceBuilder::new()
          .layer(from_fn(validate_json::<categories::CategoryRequest>))
          .layer(admin_stage()),
      ),
    )
    .route(
      "/admin/category/{id}",
      patch(categories::update::<S>)
        .route_layer(
          ServiceBuilder::new()
            .layer(from_fn(validate_json::<categories::CategoryUpdateRequest>))
            .layer(admin_stage()),
        )
        .merge(delete(categories::delete::<S>).route_layer(admin_stage()))
        .route_layer(id_path()),
    )
    .route(
      "/admin/skill",
      post(skills::create::<S>).route_layer(
        ServiceBuilder::new()
          .layer(from_fn(validate_json::<skills::SkillRequest>))
          .layer(admin_stage()),
      ),
    )
    .route(
      "/admin/skill/{id}",
      patch(skills::update::<S>)
        .route_layer(
          ServiceBuilder::new()
            .layer(from_fn(validate_json::<skills::SkillRequest>))
            .layer(admin_stage()),
        )
        .merge(delete(skills::delete::<S>).route_layer(admin_stage()))
        .route_layer(id_path()),
    )
    .route(
      "/admin/user/get-all-pagination",
      get(admin::list_accounts::<S>).route_layer(
        ServiceBuilder::new()
          .layer(from_fn(validate_query::<admin::AccountListParams>))
          .layer(admin_stage()),
      ),
    )
    .route(
      "/admin/user/{id}/status",
      patch(admin::set_account_status::<S>).route_layer(
        ServiceBuilder::new()
          .layer(id_path())
          .layer(from_fn(validate_json::<admin::AccountStatusRequest>))
          .layer(admin_stage()),
      ),
    )
    .fallback(|| async { ApiError::NotFound("route not found".into()) })
    .layer(TraceLayer::new_for_http());

  let router = match state.config.environment {
    Environment::Production => router,
    Environment::Development => router.layer(map_response(attach_error_trace)),
  };
  router.with_state(state)
}
