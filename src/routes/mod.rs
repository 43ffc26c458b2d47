//! HTTP routes for the directory.
//!
//! # Route Structure
//!
//! ```text
//! GET|POST /?action=...        - Directory actions
//! GET|POST /exec?action=...    - Same, at the Apps Script path
//! GET      /health             - Readiness check
//! ```
//!
//! Every action shares one endpoint. The action name comes from the `action`
//! query parameter or the body's `action` field; bodies are JSON sent as
//! either `text/plain` or `application/json`.

use std::fmt;
use std::str::FromStr;

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method},
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::{info_span, Instrument, Span};

use crate::error::AppError;
use crate::state::AppState;

mod health;
mod settings;
mod users;
pub mod wire;

const IDEMPOTENCY_KEY: HeaderName = HeaderName::from_static("idempotency-key");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateUser,
    UpdateUser,
    SearchUsers,
    GetUser,
    Login,
    SaveSettings,
    GetSettings,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateUser => "createUser",
            Self::UpdateUser => "updateUser",
            Self::SearchUsers => "searchUsers",
            Self::GetUser => "getUser",
            Self::Login => "login",
            Self::SaveSettings => "saveSettings",
            Self::GetSettings => "getSettings",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "createUser" => Ok(Self::CreateUser),
            "updateUser" => Ok(Self::UpdateUser),
            "searchUsers" => Ok(Self::SearchUsers),
            "getUser" => Ok(Self::GetUser),
            "login" => Ok(Self::Login),
            "saveSettings" => Ok(Self::SaveSettings),
            "getSettings" => Ok(Self::GetSettings),
            other => Err(AppError::BadRequest(format!("Unknown action: {other}"))),
        }
    }
}

/// Query parameters sent with every call. `v` is a cache buster and ignored.
#[derive(Debug, Default, Deserialize)]
pub struct ExecQuery {
    pub action: Option<String>,
    pub origin: Option<String>,
}

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(state.allowed_origins());

    Router::new()
        .route("/", get(exec).post(exec))
        .route("/exec", get(exec).post(exec))
        .route("/health", get(health::health))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri().path(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: std::time::Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record("latency_ms", latency.as_millis() as u64);
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, IDEMPOTENCY_KEY]);

    if allowed_origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| HeaderValue::from_str(origin).ok())
            .collect();
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

async fn exec(
    State(state): State<AppState>,
    query: Result<Query<ExecQuery>, QueryRejection>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let body = parse_body(&body)?;
    let action = resolve_action(query.action.as_deref(), body.get("action").and_then(Value::as_str))?;

    let origin = query
        .origin
        .as_deref()
        .or_else(|| body.get("origin").and_then(Value::as_str))
        .or_else(|| headers.get(header::ORIGIN).and_then(|v| v.to_str().ok()));
    if let Some(origin) = origin {
        if !state.origin_allowed(origin) {
            return Err(AppError::Forbidden(origin.to_string()));
        }
    }

    let idempotency_key = headers
        .get(IDEMPOTENCY_KEY)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let span = info_span!("directory_action", action = %action);
    async move {
        match action {
            Action::CreateUser => users::create_user(&state, body, idempotency_key).await,
            Action::UpdateUser => users::update_user(&state, body).await,
            Action::SearchUsers => users::search_users(&state, body).await,
            Action::GetUser => users::get_user(&state, body).await,
            Action::Login => users::login(&state, body).await,
            Action::SaveSettings => settings::save_settings(&state, body).await,
            Action::GetSettings => settings::get_settings(&state).await,
        }
    }
    .instrument(span)
    .await
}

/// An empty body (as on GET) is treated as `{}`.
fn parse_body(raw: &[u8]) -> Result<Value, AppError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    let value: Value = serde_json::from_slice(raw)?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(AppError::BadRequest("Request body must be a JSON object".to_string()))
    }
}

/// The query parameter wins; a body naming a different action is rejected.
fn resolve_action(query: Option<&str>, body: Option<&str>) -> Result<Action, AppError> {
    let query = query.map(str::trim).filter(|a| !a.is_empty());
    let body = body.map(str::trim).filter(|a| !a.is_empty());

    match (query, body) {
        (Some(q), Some(b)) if q != b => Err(AppError::BadRequest(format!(
            "Action mismatch: query says {q}, body says {b}"
        ))),
        (Some(action), _) | (None, Some(action)) => action.parse(),
        (None, None) => Err(AppError::BadRequest("Missing action".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_system::{DirectorySystem, SystemOptions};
    use crate::credentials::test_hasher;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_system() -> DirectorySystem {
        DirectorySystem::start(SystemOptions {
            data_dir: None,
            channel_capacity: 16,
            request_timeout: Duration::from_secs(5),
            hasher: test_hasher(),
        })
        .unwrap()
    }

    fn test_router(system: &DirectorySystem, allowed_origins: Vec<String>) -> Router {
        router(AppState::new(
            system.accounts.clone(),
            system.settings.clone(),
            allowed_origins,
            Duration::from_secs(5),
        ))
    }

    async fn call(app: &Router, action: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(format!("/exec?action={action}&origin=http%3A%2F%2Flocalhost%3A5173&v=1"))
            .header("content-type", "text/plain")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(app, request).await
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn taro() -> Value {
        serde_json::json!({
            "action": "createUser",
            "user": {
                "id": "user-1700000000000",
                "name": "Yamada Taro",
                "email": "taro@example.com",
                "phone": "03-1234-5678",
                "password": "secret"
            }
        })
    }

    #[test]
    fn test_resolve_action() {
        assert_eq!(resolve_action(Some("searchUsers"), None).unwrap(), Action::SearchUsers);
        assert_eq!(resolve_action(None, Some("login")).unwrap(), Action::Login);
        assert_eq!(
            resolve_action(Some("createUser"), Some("createUser")).unwrap(),
            Action::CreateUser
        );
        assert!(matches!(
            resolve_action(Some("createUser"), Some("saveSettings")),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(resolve_action(None, None), Err(AppError::BadRequest(_))));
        assert!(matches!(resolve_action(Some("deleteUser"), None), Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_create_then_search_scenario() {
        let system = test_system();
        let app = test_router(&system, Vec::new());

        let (status, created) = call(&app, "createUser", taro()).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["ok"], true);
        let id = created["id"].as_str().unwrap().to_string();
        assert_ne!(id, "user-1700000000000");

        let (status, found) = call(&app, "searchUsers", serde_json::json!({ "name": "Yamada" })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found["count"], 1);
        assert_eq!(found["users"][0]["id"], id.as_str());
        assert_eq!(found["users"][0]["email"], "taro@example.com");

        // no credential anywhere in the responses
        let text = format!("{created}{found}");
        assert!(!text.contains("secret"));
        assert!(!text.contains("argon2"));
        assert!(!text.contains("password"));
    }

    #[tokio::test]
    async fn test_retried_create_is_replayed() {
        let system = test_system();
        let app = test_router(&system, Vec::new());

        let (first_status, first) = call(&app, "createUser", taro()).await;
        let (second_status, second) = call(&app, "createUser", taro()).await;

        assert_eq!(first_status, StatusCode::CREATED);
        assert_eq!(second_status, StatusCode::OK);
        assert_eq!(second["replayed"], true);
        assert_eq!(first["id"], second["id"]);
        assert_eq!(system.accounts.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_same_provisional_id_for_other_user_is_a_conflict() {
        let system = test_system();
        let app = test_router(&system, Vec::new());
        let (status, first) = call(&app, "createUser", taro()).await;
        assert_eq!(status, StatusCode::CREATED);

        let mut hanako = taro();
        hanako["user"]["name"] = Value::from("Suzuki Hanako");
        hanako["user"]["email"] = Value::from("hanako@example.com");
        let (status, body) = call(&app, "createUser", hanako).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"], "ConflictError");
        assert_eq!(system.accounts.count().await.unwrap(), 1);

        let (_, stored) = call(&app, "getUser", serde_json::json!({ "id": first["id"] })).await;
        assert_eq!(stored["user"]["name"], "Yamada Taro");
    }

    #[tokio::test]
    async fn test_malformed_query_gets_json_error() {
        let system = test_system();
        let app = test_router(&system, Vec::new());

        let request = Request::builder()
            .method("POST")
            .uri("/exec?action=getSettings&action=login")
            .body(Body::from("{}"))
            .unwrap();
        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"], "BadRequest");
        assert!(body["message"].as_str().unwrap().contains("query string"));
    }

    #[tokio::test]
    async fn test_create_validation_failure() {
        let system = test_system();
        let app = test_router(&system, Vec::new());

        let (status, body) = call(
            &app,
            "createUser",
            serde_json::json!({ "user": { "name": "", "email": "a@b.com", "password": "x" } }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"], "ValidationError");
        assert_eq!(body["message"], "name is required");
        assert_eq!(system.accounts.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_with_existing_id_updates() {
        let system = test_system();
        let app = test_router(&system, Vec::new());
        let (_, created) = call(&app, "createUser", taro()).await;

        let (status, updated) = call(
            &app,
            "createUser",
            serde_json::json!({
                "user": {
                    "id": created["id"],
                    "name": "Yamada Jiro",
                    "email": "jiro@example.com",
                    "phone": "3-1234-5678",
                    "revision": 1
                }
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["user"]["name"], "Yamada Jiro");
        assert_eq!(updated["revision"], 2);
        assert_eq!(system.accounts.count().await.unwrap(), 1);

        // the stored password still works
        let (status, _) = call(
            &app,
            "login",
            serde_json::json!({ "email": "jiro@example.com", "password": "secret" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_update_errors() {
        let system = test_system();
        let app = test_router(&system, Vec::new());
        let (_, created) = call(&app, "createUser", taro()).await;

        let (status, body) = call(
            &app,
            "updateUser",
            serde_json::json!({ "user": { "id": "user-unknown", "name": "X", "email": "x@example.com" } }),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "NotFoundError");

        let (status, body) = call(
            &app,
            "updateUser",
            serde_json::json!({
                "user": { "id": created["id"], "name": "Stale", "email": "x@example.com", "revision": 7 }
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "ConflictError");
    }

    #[tokio::test]
    async fn test_empty_search_is_rejected() {
        let system = test_system();
        let app = test_router(&system, Vec::new());

        let (status, body) = call(
            &app,
            "searchUsers",
            serde_json::json!({ "name": "", "email": " ", "phone": "" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "ValidationError");
    }

    #[tokio::test]
    async fn test_login() {
        let system = test_system();
        let app = test_router(&system, Vec::new());
        call(&app, "createUser", taro()).await;

        let (status, body) = call(
            &app,
            "login",
            serde_json::json!({ "email": "taro@example.com", "password": "secret" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["user"]["lastLoginAt"].is_string());

        let (status, body) = call(
            &app,
            "login",
            serde_json::json!({ "email": "taro@example.com", "password": "wrong" }),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid email or password");
    }

    #[tokio::test]
    async fn test_settings_partial_save_and_redaction() {
        let system = test_system();
        let app = test_router(&system, Vec::new());

        let (status, _) = call(
            &app,
            "saveSettings",
            serde_json::json!({
                "accounts": [{ "id": "user-1", "name": "Ignored" }],
                "geminiKey": "AIza-secret-9876",
                "systemPrompt": "Be brief."
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(system.accounts.count().await.unwrap(), 0);

        let (status, _) = call(&app, "saveSettings", serde_json::json!({ "autoSendThreshold": 0.6 })).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&app, "saveSettings", serde_json::json!({ "autoSendThreshold": 2 })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "ValidationError");

        let request = Request::builder()
            .uri("/exec?action=getSettings")
            .body(Body::empty())
            .unwrap();
        let (status, settings) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(settings["autoSendThreshold"], 0.6);
        assert_eq!(settings["systemPrompt"], "Be brief.");
        assert_eq!(settings["geminiKeyConfigured"], true);
        assert_eq!(settings["geminiKeyHint"], "…9876");
        assert!(!settings.to_string().contains("AIza-secret"));
    }

    #[tokio::test]
    async fn test_console_round_trip_keeps_secrets() {
        let system = test_system();
        let app = test_router(&system, Vec::new());
        let (status, _) = call(
            &app,
            "saveSettings",
            serde_json::json!({ "password": "imap-pass", "geminiKey": "AIza-secret-9876" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        // The console overlays what it read on its defaults, where secrets are
        // blank, edits one field and posts the whole form back.
        let (_, loaded) = call(&app, "getSettings", serde_json::json!({})).await;
        let mut form = serde_json::json!({ "geminiKey": "", "password": "" });
        for (field, value) in loaded.as_object().unwrap() {
            form[field.as_str()] = value.clone();
        }
        form["forwardingNote"] = Value::from("Forward from support@");
        let (status, saved) = call(&app, "saveSettings", form).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(saved["forwardingNote"], "Forward from support@");
        assert_eq!(saved["passwordConfigured"], true);
        assert_eq!(saved["geminiKeyConfigured"], true);
        assert_eq!(saved["geminiKeyHint"], "…9876");

        let (_, cleared) = call(&app, "saveSettings", serde_json::json!({ "password": null })).await;
        assert_eq!(cleared["passwordConfigured"], false);
        assert_eq!(cleared["geminiKeyConfigured"], true);
    }

    #[tokio::test]
    async fn test_origin_allow_list() {
        let system = test_system();
        let app = test_router(&system, vec!["https://admin.example.com".to_string()]);

        let (status, body) = call(&app, "getSettings", serde_json::json!({})).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["ok"], false);

        let request = Request::builder()
            .method("POST")
            .uri("/?action=getSettings&origin=https%3A%2F%2Fadmin.example.com")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_bad_requests() {
        let system = test_system();
        let app = test_router(&system, Vec::new());

        let request = Request::builder()
            .method("POST")
            .uri("/exec?action=searchUsers")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "BadRequest");

        let (status, _) = call(&app, "createUser", serde_json::json!({ "action": "saveSettings" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health() {
        let system = test_system();
        let app = test_router(&system, Vec::new());

        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["accounts"], 0);

        system.accounts.shutdown().await.unwrap();
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
