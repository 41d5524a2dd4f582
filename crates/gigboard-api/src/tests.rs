use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use gigboard_core::{
  DocId,
  account::{AccountStatus, NewAccount, Role},
  catalog::NewCategory,
  project::{Contact, JobType, NewProject, Salary},
  store::BoardStore,
};
use gigboard_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::{
  Mock, MockServer, ResponseTemplate,
  matchers::{body_string_contains, header as header_is, method, path},
};

use crate::{
  AppState, api_router,
  config::{AuthConfig, Environment, ImageHostConfig, OAuthConfig, RetryPolicy, ServerConfig},
  password::hash_password,
};

const ADMIN_USER: &str = "root";
const ADMIN_PASSWORD: &str = "correct horse";

fn test_config(environment: Environment) -> ServerConfig {
  ServerConfig {
    host: "127.0.0.1".into(),
    port: 0,
    environment,
    store_path: ":memory:".into(),
    auth: AuthConfig {
      secret:              "test-secret".into(),
      access_ttl_secs:     900,
      refresh_ttl_secs:    86_400,
      admin_username:      ADMIN_USER.into(),
      admin_password_hash: hash_password(ADMIN_PASSWORD).unwrap(),
    },
    image_host: ImageHostConfig::default(),
    oauth: OAuthConfig::default(),
  }
}

async fn state_in(environment: Environment) -> AppState<SqliteStore> {
  let store = SqliteStore::open_in_memory().await.unwrap();
  AppState::new(store, test_config(environment)).unwrap()
}

async fn state() -> AppState<SqliteStore> { state_in(Environment::Development).await }

/// Development config whose image host and identity provider live on `server`.
async fn state_against(server: &MockServer) -> AppState<SqliteStore> {
  let mut config = test_config(Environment::Development);
  config.image_host = ImageHostConfig {
    base_url:     server.uri(),
    cloud_name:   "demo".into(),
    api_key:      "key".into(),
    api_secret:   "secret".into(),
    timeout_secs: 5,
    retry:        RetryPolicy { max_attempts: 1, delay_ms: 1 },
  };
  config.oauth = OAuthConfig {
    userinfo_url: format!("{}/userinfo", server.uri()),
    timeout_secs: 5,
  };
  let store = SqliteStore::open_in_memory().await.unwrap();
  AppState::new(store, config).unwrap()
}

async fn send(
  app: &Router,
  method: &str,
  uri: &str,
  token: Option<&str>,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut req = Request::builder().method(method).uri(uri);
  if let Some(token) = token {
    req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
  }
  let body = match body {
    Some(json) => {
      req = req.header(header::CONTENT_TYPE, "application/json");
      Body::from(json.to_string())
    }
    None => Body::empty(),
  };
  let res = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
  let status = res.status();
  let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
  let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
  (status, json)
}

const BOUNDARY: &str = "gigboard-test-boundary";

/// A multipart body with a single `avatar` file part.
fn avatar_form(content_type: &str) -> Vec<u8> {
  let mut body = format!(
    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"avatar\"; filename=\"me.png\"\r\n\
     Content-Type: {content_type}\r\n\r\n"
  )
  .into_bytes();
  body.extend_from_slice(b"\x89PNG fake image bytes");
  body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
  body
}

async fn send_form(app: &Router, token: &str, form: Vec<u8>) -> (StatusCode, Value) {
  let req = Request::builder()
    .method("POST")
    .uri("/user/me/avatar")
    .header(header::AUTHORIZATION, format!("Bearer {token}"))
    .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
    .body(Body::from(form))
    .unwrap();
  let res = app.clone().oneshot(req).await.unwrap();
  let status = res.status();
  let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
  (status, serde_json::from_slice(&bytes).unwrap())
}

/// Register through the API and log in; returns `(id, access, refresh)`.
async fn signup(app: &Router, email: &str, role: &str) -> (String, String, String) {
  let (status, _) = send(
    app,
    "POST",
    "/auth/register",
    None,
    Some(json!({ "name": "Test User", "email": email, "password": "hunter22", "role": role })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);

  let (status, body) = send(
    app,
    "POST",
    "/auth/login",
    None,
    Some(json!({ "email": email, "password": "hunter22" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  let data = &body["data"];
  (
    data["id"].as_str().unwrap().to_owned(),
    data["access_token"].as_str().unwrap().to_owned(),
    data["refresh_token"].as_str().unwrap().to_owned(),
  )
}

async fn admin_token(app: &Router) -> String {
  let (status, body) = send(
    app,
    "POST",
    "/admin/login",
    None,
    Some(json!({ "username": ADMIN_USER, "password": ADMIN_PASSWORD })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  body["data"]["access_token"].as_str().unwrap().to_owned()
}

fn project_body(category_id: &str, skill_id: &str) -> Value {
  json!({
    "title": "Build a landing page",
    "description": "A responsive landing page for a bakery.",
    "category_id": category_id,
    "skill_ids": [skill_id],
    "salary": { "min": 100, "max": 500 },
    "job_type": "remote",
    "contact": { "name": "Bea", "email": "bea@example.com" },
  })
}

#[tokio::test]
async fn health_answers() {
  let app = api_router(state().await);
  let (status, body) = send(&app, "GET", "/health", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["status"], "up");
}

#[tokio::test]
async fn login_returns_id_and_credential_pair() {
  let app = api_router(state().await);
  let (id, access, refresh) = signup(&app, "ana@example.com", "freelancer").await;
  assert!(DocId::is_valid(&id));
  assert!(!access.is_empty());
  assert_ne!(access, refresh);
}

#[tokio::test]
async fn login_rejects_wrong_password() {
  let app = api_router(state().await);
  signup(&app, "ana@example.com", "freelancer").await;
  let (status, body) = send(
    &app,
    "POST",
    "/auth/login",
    None,
    Some(json!({ "email": "ana@example.com", "password": "nope-nope" })),
  )
  .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["statusCode"], 401);
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
  let app = api_router(state().await);
  signup(&app, "ana@example.com", "freelancer").await;
  let (status, body) = send(
    &app,
    "POST",
    "/auth/register",
    None,
    Some(json!({ "name": "Other", "email": "ANA@example.com", "password": "hunter22", "role": "employer" })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["message"], "email is already registered");
}

#[tokio::test]
async fn names_are_trimmed_before_length_checks() {
  let app = api_router(state().await);
  let register = |name: &'static str, email: &'static str| {
    json!({ "name": name, "email": email, "password": "hunter22", "role": "employer" })
  };

  let (status, body) =
    send(&app, "POST", "/auth/register", None, Some(register("   ab   ", "a@example.com"))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["message"], "name: length must be between 3 and 50");

  let (status, _) =
    send(&app, "POST", "/auth/register", None, Some(register("      ", "b@example.com"))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) =
    send(&app, "POST", "/auth/register", None, Some(register("  Bea  ", "c@example.com"))).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["data"]["name"], "Bea");

  let admin = admin_token(&app).await;
  let (status, _) =
    send(&app, "POST", "/admin/category", Some(&admin), Some(json!({ "name": " W " }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let (status, _) =
    send(&app, "POST", "/admin/skill", Some(&admin), Some(json!({ "name": "   " }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
  let app = api_router(state().await);
  let padding = "x".repeat(crate::validate::MAX_JSON_BODY);
  let (status, body) = send(
    &app,
    "POST",
    "/auth/login",
    None,
    Some(json!({ "email": "a@example.com", "password": padding })),
  )
  .await;
  assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
  assert_eq!(body["statusCode"], 413);
}

#[tokio::test]
async fn active_account_reaches_handler_with_its_id() {
  let app = api_router(state().await);
  let (id, access, _) = signup(&app, "ana@example.com", "freelancer").await;
  let (status, body) = send(&app, "GET", "/user/me", Some(&access), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["id"], id);
  assert!(body["data"].get("password_hash").is_none());
  assert!(body["data"].get("refresh_token").is_none());
}

#[tokio::test]
async fn blocked_account_is_forbidden_everywhere() {
  let state = state().await;
  let store = state.store.clone();
  let app = api_router(state);
  let (id, access, _) = signup(&app, "ana@example.com", "employer").await;

  store
    .set_account_status(DocId::parse(&id).unwrap(), AccountStatus::Blocked)
    .await
    .unwrap();

  let (status, body) = send(&app, "GET", "/user/me", Some(&access), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(body["message"], "account has been blocked");

  let (status, _) = send(
    &app,
    "POST",
    "/auth/login",
    None,
    Some(json!({ "email": "ana@example.com", "password": "hunter22" })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn missing_and_malformed_credentials() {
  let app = api_router(state().await);

  let (status, body) = send(&app, "GET", "/user/me", None, None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["message"], "invalid session");

  let (status, body) = send(&app, "GET", "/user/me", Some("garbage"), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert!(body["message"].as_str().unwrap().starts_with("invalid token"));
}

#[tokio::test]
async fn logout_revokes_refresh_credential() {
  let app = api_router(state().await);
  let (_, access, refresh) = signup(&app, "ana@example.com", "freelancer").await;

  let (status, _) = send(&app, "POST", "/auth/logout", Some(&access), None).await;
  assert_eq!(status, StatusCode::OK);

  let (status, body) = send(
    &app,
    "POST",
    "/auth/refresh",
    None,
    Some(json!({ "refresh_token": refresh })),
  )
  .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["message"], "refresh token has been revoked");
}

#[tokio::test]
async fn refresh_rotates_the_stored_credential() {
  let app = api_router(state().await);
  let (id, _, first) = signup(&app, "ana@example.com", "freelancer").await;

  let (status, body) = send(
    &app,
    "POST",
    "/auth/refresh",
    None,
    Some(json!({ "refresh_token": first })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["id"], id);
  let second = body["data"]["refresh_token"].as_str().unwrap().to_owned();
  assert_ne!(first, second);

  let (status, _) = send(
    &app,
    "POST",
    "/auth/refresh",
    None,
    Some(json!({ "refresh_token": first })),
  )
  .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (status, _) = send(
    &app,
    "POST",
    "/auth/refresh",
    None,
    Some(json!({ "refresh_token": second })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn access_credential_cannot_refresh() {
  let app = api_router(state().await);
  let (_, access, _) = signup(&app, "ana@example.com", "freelancer").await;
  let (status, body) = send(
    &app,
    "POST",
    "/auth/refresh",
    None,
    Some(json!({ "refresh_token": access })),
  )
  .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert!(body["message"].as_str().unwrap().starts_with("invalid token"));
}

#[tokio::test]
async fn admin_login_with_wrong_password_issues_nothing() {
  let app = api_router(state().await);
  let (status, body) = send(
    &app,
    "POST",
    "/admin/login",
    None,
    Some(json!({ "username": ADMIN_USER, "password": "wrong" })),
  )
  .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert!(body.get("data").is_none());
}

#[tokio::test]
async fn admin_routes_require_admin_credential() {
  let app = api_router(state().await);
  let (_, access, _) = signup(&app, "ana@example.com", "employer").await;

  let body = json!({ "name": "Design" });
  let (status, _) = send(&app, "POST", "/admin/category", Some(&access), Some(body.clone())).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let admin = admin_token(&app).await;
  let (status, created) = send(&app, "POST", "/admin/category", Some(&admin), Some(body.clone())).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(created["data"]["name"], "Design");

  let (status, _) = send(&app, "POST", "/admin/category", Some(&admin), Some(body)).await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, listed) = send(&app, "GET", "/category/get-all", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(listed["pagination"]["total"], 1);
}

#[tokio::test]
async fn admin_can_block_accounts() {
  let app = api_router(state().await);
  let (id, access, _) = signup(&app, "ana@example.com", "freelancer").await;
  let admin = admin_token(&app).await;

  let (status, body) = send(
    &app,
    "PATCH",
    &format!("/admin/user/{id}/status"),
    Some(&admin),
    Some(json!({ "status": "blocked" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["status"], "blocked");

  let (status, _) = send(&app, "GET", "/user/me", Some(&access), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, body) = send(
    &app,
    "GET",
    "/admin/user/get-all-pagination?status=blocked",
    Some(&admin),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_sort_is_a_validation_error() {
  let app = api_router(state().await);
  let (status, body) = send(&app, "GET", "/project/get-all-pagination?sort=sideways", None, None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["statusCode"], 400);
}

#[tokio::test]
async fn job_type_filter_honours_limit() {
  let state = state().await;
  let store = state.store.clone();
  let app = api_router(state);

  let employer = store
    .create_account(NewAccount {
      name:          "Bea".into(),
      email:         "bea@example.com".into(),
      phone:         None,
      password_hash: None,
      role:          Role::Employer,
    })
    .await
    .unwrap();
  let category = store
    .create_category(NewCategory { name: "Web".into(), description: None })
    .await
    .unwrap();
  let skill = store.create_skill("Rust".into()).await.unwrap();

  for i in 0..10 {
    let job_type = if i < 7 { JobType::Remote } else { JobType::Onsite };
    store
      .create_project(NewProject {
        employer_id: employer.id,
        title: format!("Project {i}"),
        description: "Something worth doing well.".into(),
        category_id: category.id,
        skill_ids: vec![skill.id],
        salary: Salary { min: 10, max: 20 },
        job_type,
        contact: Contact { name: "Bea".into(), email: "bea@example.com".into(), phone: None },
      })
      .await
      .unwrap();
  }

  let (status, body) = send(
    &app,
    "GET",
    "/project/get-all-pagination?job_type[]=remote&limit=5",
    None,
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  let items = body["data"].as_array().unwrap();
  assert_eq!(items.len(), 5);
  assert!(items.iter().all(|p| p["job_type"] == "remote"));
  assert_eq!(body["pagination"], json!({ "total": 7, "page": 1, "total_pages": 2, "limit": 5 }));
}

#[tokio::test]
async fn inverted_salary_lists_every_violation() {
  let app = api_router(state().await);
  let (_, access, _) = signup(&app, "bea@example.com", "employer").await;

  let mut body = project_body("507f1f77bcf86cd799439011", "507f1f77bcf86cd799439012");
  body["title"] = json!("ab");
  body["salary"] = json!({ "min": 900, "max": 100 });

  let (status, res) = send(&app, "POST", "/project", Some(&access), Some(body)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let message = res["message"].as_str().unwrap();
  assert!(message.contains("salary: min must not exceed max"), "{message}");
  assert!(message.contains("title:"), "{message}");
}

#[tokio::test]
async fn validation_runs_before_authorization() {
  let app = api_router(state().await);
  let (status, _) = send(&app, "POST", "/project", None, Some(json!({ "title": "x" }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) = send(&app, "DELETE", "/project/not-an-id", None, None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
  assert_eq!(body["message"], "id: must be a 24-character hex id");

  let (status, _) = send(
    &app,
    "PATCH",
    "/admin/user/xyz/status",
    Some("garbage"),
    Some(json!({ "status": "blocked" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn project_lifecycle_and_applications() {
  let app = api_router(state().await);
  let admin = admin_token(&app).await;
  let (_, employer, _) = signup(&app, "bea@example.com", "employer").await;
  let (_, freelancer, _) = signup(&app, "ana@example.com", "freelancer").await;

  let (_, category) =
    send(&app, "POST", "/admin/category", Some(&admin), Some(json!({ "name": "Web" }))).await;
  let (_, skill) =
    send(&app, "POST", "/admin/skill", Some(&admin), Some(json!({ "name": "CSS" }))).await;
  let category_id = category["data"]["id"].as_str().unwrap();
  let skill_id = skill["data"]["id"].as_str().unwrap();

  // Unknown category
  let (status, _) = send(
    &app,
    "POST",
    "/project",
    Some(&employer),
    Some(project_body("507f1f77bcf86cd799439011", skill_id)),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  // Freelancers cannot post
  let (status, _) = send(
    &app,
    "POST",
    "/project",
    Some(&freelancer),
    Some(project_body(category_id, skill_id)),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, project) = send(
    &app,
    "POST",
    "/project",
    Some(&employer),
    Some(project_body(category_id, skill_id)),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  let project_id = project["data"]["id"].as_str().unwrap().to_owned();

  // Employers cannot apply
  let apply = format!("/project/{project_id}/apply");
  let (status, _) = send(&app, "POST", &apply, Some(&employer), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, applied) = send(
    &app,
    "POST",
    &apply,
    Some(&freelancer),
    Some(json!({ "cover_letter": "I love bakeries." })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  let applicant_id = applied["data"]["id"].as_str().unwrap().to_owned();

  let (status, _) = send(&app, "POST", &apply, Some(&freelancer), None).await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, listed) = send(
    &app,
    "GET",
    &format!("/project/{project_id}/applicants"),
    Some(&employer),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(listed["data"][0]["id"], applicant_id.as_str());

  let (status, decided) = send(
    &app,
    "PATCH",
    &format!("/applicant/{applicant_id}/status"),
    Some(&employer),
    Some(json!({ "status": "accepted" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(decided["data"]["status"], "accepted");

  let (status, closed) =
    send(&app, "DELETE", &format!("/project/{project_id}"), Some(&employer), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(closed["data"]["status"], "closed");

  let (_, late, _) = signup(&app, "cid@example.com", "freelancer").await;
  let (status, _) = send(&app, "POST", &apply, Some(&late), None).await;
  assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn only_the_owner_may_update_a_project() {
  let app = api_router(state().await);
  let admin = admin_token(&app).await;
  let (_, owner, _) = signup(&app, "bea@example.com", "employer").await;
  let (_, other, _) = signup(&app, "dan@example.com", "employer").await;

  let (_, category) =
    send(&app, "POST", "/admin/category", Some(&admin), Some(json!({ "name": "Web" }))).await;
  let (_, skill) =
    send(&app, "POST", "/admin/skill", Some(&admin), Some(json!({ "name": "CSS" }))).await;
  let (_, project) = send(
    &app,
    "POST",
    "/project",
    Some(&owner),
    Some(project_body(
      category["data"]["id"].as_str().unwrap(),
      skill["data"]["id"].as_str().unwrap(),
    )),
  )
  .await;
  let uri = format!("/project/{}", project["data"]["id"].as_str().unwrap());

  let patch = json!({ "title": "Renamed project" });
  let (status, _) = send(&app, "PATCH", &uri, Some(&other), Some(patch.clone())).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, body) = send(&app, "PATCH", &uri, Some(&owner), Some(patch)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["title"], "Renamed project");
}

#[tokio::test]
async fn error_stack_only_outside_production() {
  let dev = api_router(state().await);
  let (_, body) = send(&dev, "GET", "/user/me", None, None).await;
  assert!(body["stack"].is_string());

  let prod = api_router(state_in(Environment::Production).await);
  let (_, body) = send(&prod, "GET", "/user/me", None, None).await;
  assert!(body.get("stack").is_none());
  assert_eq!(body["statusCode"], 401);
}

#[tokio::test]
async fn invalid_path_id_is_rejected() {
  let app = api_router(state().await);
  let (status, _) = send(&app, "GET", "/project/not-an-id", None, None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = send(&app, "GET", &format!("/project/{}", DocId::generate()), None, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn google_login_finds_or_creates_a_freelancer() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/userinfo"))
    .and(header_is("authorization", "Bearer good-token"))
    .respond_with(
      ResponseTemplate::new(200)
        .set_body_json(json!({ "email": " Gus@Example.com ", "name": "Gus" })),
    )
    .expect(2)
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/userinfo"))
    .and(header_is("authorization", "Bearer stale-token"))
    .respond_with(ResponseTemplate::new(401))
    .mount(&server)
    .await;
  let app = api_router(state_against(&server).await);
  let google = |token: &str| json!({ "access_token": token });

  let (status, first) = send(&app, "POST", "/auth/google", None, Some(google("good-token"))).await;
  assert_eq!(status, StatusCode::OK, "{first}");
  let (status, second) = send(&app, "POST", "/auth/google", None, Some(google("good-token"))).await;
  assert_eq!(status, StatusCode::OK, "{second}");
  assert_eq!(first["data"]["id"], second["data"]["id"]);

  // The second login replaced the stored refresh credential.
  let (status, _) = send(
    &app,
    "POST",
    "/auth/refresh",
    None,
    Some(json!({ "refresh_token": first["data"]["refresh_token"] })),
  )
  .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let access = second["data"]["access_token"].as_str().unwrap();
  let (status, me) = send(&app, "GET", "/user/me", Some(access), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(me["data"]["email"], "gus@example.com");
  assert_eq!(me["data"]["name"], "Gus");
  assert_eq!(me["data"]["role"], "freelancer");

  let (status, body) = send(&app, "POST", "/auth/google", None, Some(google("stale-token"))).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["message"], "invalid google token");
}

#[tokio::test]
async fn avatar_replacement_deletes_the_old_image() {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .and(path("/v1_1/demo/image/upload"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "public_id": "avatars/one",
      "secure_url": "https://res.example.com/avatars/one.png",
    })))
    .with_priority(1)
    .up_to_n_times(1)
    .expect(1)
    .mount(&server)
    .await;
  Mock::given(method("POST"))
    .and(path("/v1_1/demo/image/upload"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "public_id": "avatars/two",
      "secure_url": "https://res.example.com/avatars/two.png",
    })))
    .with_priority(2)
    .expect(1)
    .mount(&server)
    .await;
  // Cleanup of the replaced image fails; the replacement still succeeds.
  Mock::given(method("POST"))
    .and(path("/v1_1/demo/image/destroy"))
    .and(body_string_contains("public_id=avatars%2Fone"))
    .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
    .expect(1)
    .mount(&server)
    .await;
  Mock::given(method("POST"))
    .and(path("/v1_1/demo/image/destroy"))
    .and(body_string_contains("public_id=avatars%2Ftwo"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "ok" })))
    .expect(1)
    .mount(&server)
    .await;
  let app = api_router(state_against(&server).await);
  let (_, access, _) = signup(&app, "ana@example.com", "freelancer").await;

  let (status, body) = send_form(&app, &access, avatar_form("text/plain")).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["message"], "avatar: must be an image");

  let (status, body) = send_form(&app, &access, avatar_form("image/png")).await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["data"]["avatar"]["url"], "https://res.example.com/avatars/one.png");

  let (status, body) = send_form(&app, &access, avatar_form("image/png")).await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["data"]["avatar"]["url"], "https://res.example.com/avatars/two.png");

  let (status, body) = send(&app, "DELETE", "/user/me/avatar", Some(&access), None).await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert!(body["data"]["avatar"].is_null());

  let (status, _) = send(&app, "DELETE", "/user/me/avatar", Some(&access), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}
