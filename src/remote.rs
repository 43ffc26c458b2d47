//! HTTP client for the directory's wire protocol.
//!
//! Failures are split the way callers act on them: [`RemoteError::Transient`]
//! when the request never completed (the caller may retry), and
//! [`RemoteError::Remote`] when the service answered with an error, carrying
//! its `message` verbatim.

use std::time::Duration;

use chrono::Utc;
use reqwest::{header, Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::routes::wire::{SettingsView, UserView};

#[derive(Debug, Error)]
pub enum RemoteError {
    /// The request did not complete: connection refused, reset, or timed out.
    #[error("Network error: {0}")]
    Transient(String),
    /// The service rejected the request.
    #[error("{message}")]
    Remote { status: StatusCode, message: String },
    /// The service answered 2xx with a body we could not read.
    #[error("Unexpected response: {0}")]
    Decode(String),
    #[error("Invalid client configuration: {0}")]
    Config(String),
}

impl RemoteError {
    /// Whether reissuing the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transient(_) => true,
            Self::Remote { status, .. } => {
                *status == StatusCode::GATEWAY_TIMEOUT || *status == StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Decode(_) | Self::Config(_) => false,
        }
    }
}

/// A user record to send. `password` is only needed on create, or to change
/// it on update.
#[derive(Default, Serialize)]
pub struct RemoteUser<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<&'a str>,
    pub name: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<u64>,
}

impl std::fmt::Debug for RemoteUser<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteUser")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserResult {
    pub id: String,
    pub revision: u64,
    #[serde(default)]
    pub replayed: bool,
    #[serde(default)]
    pub message: String,
    pub user: UserView,
}

#[derive(Deserialize)]
struct SearchResult {
    users: Vec<UserView>,
}

#[derive(Deserialize)]
struct SingleUser {
    user: UserView,
}

#[derive(Clone, Debug)]
pub struct DirectoryHttpClient {
    client: Client,
    base_url: Url,
    origin: Option<String>,
}

impl DirectoryHttpClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let base_url = Url::parse(base_url).map_err(|e| RemoteError::Config(format!("{base_url}: {e}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Config(e.to_string()))?;
        Ok(Self {
            client,
            base_url,
            origin: None,
        })
    }

    /// Origin reported in the `origin` parameter of every call.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub async fn create_user(
        &self,
        user: &RemoteUser<'_>,
        idempotency_key: Option<&str>,
    ) -> Result<UserResult, RemoteError> {
        let mut body = json!({ "user": user });
        if let Some(key) = idempotency_key {
            body["idempotencyKey"] = Value::from(key);
        }
        self.call("createUser", body).await
    }

    pub async fn update_user(&self, user: &RemoteUser<'_>) -> Result<UserResult, RemoteError> {
        self.call("updateUser", json!({ "user": user })).await
    }

    pub async fn search_users(
        &self,
        name: Option<&str>,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Vec<UserView>, RemoteError> {
        let body = json!({ "name": name, "email": email, "phone": phone });
        let result: SearchResult = self.call("searchUsers", body).await?;
        Ok(result.users)
    }

    pub async fn get_user(&self, id: &str) -> Result<UserView, RemoteError> {
        let result: SingleUser = self.call("getUser", json!({ "id": id })).await?;
        Ok(result.user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<UserView, RemoteError> {
        let body = json!({ "email": email, "password": password });
        let result: SingleUser = self.call("login", body).await?;
        Ok(result.user)
    }

    pub async fn get_settings(&self) -> Result<SettingsView, RemoteError> {
        self.call("getSettings", json!({})).await
    }

    /// Sends only the fields present in `patch`; the rest keep their value.
    pub async fn save_settings(&self, patch: Value) -> Result<SettingsView, RemoteError> {
        self.call("saveSettings", patch).await
    }

    /// Posts `body` as a `text/plain` JSON string, the way the console does.
    #[instrument(skip(self, body), fields(base_url = %self.base_url))]
    async fn call<T: DeserializeOwned>(&self, action: &str, mut body: Value) -> Result<T, RemoteError> {
        if !body.is_object() {
            return Err(RemoteError::Config("request body must be a JSON object".to_string()));
        }
        let mut params = vec![("action", action.to_string()), ("v", Utc::now().timestamp_millis().to_string())];
        if let Some(origin) = &self.origin {
            params.push(("origin", origin.clone()));
            body["origin"] = Value::from(origin.as_str());
        }
        body["action"] = Value::from(action);

        let url = Url::parse_with_params(self.base_url.as_str(), &params)
            .map_err(|e| RemoteError::Config(e.to_string()))?;

        debug!("Sending request");
        let response = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "text/plain")
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Directory request did not complete");
                RemoteError::Transient(e.to_string())
            })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RemoteError::Transient(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<Value>(&bytes)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());
            debug!(status = status.as_u16(), message = %message, "Directory rejected request");
            return Err(RemoteError::Remote { status, message });
        }

        serde_json::from_slice(&bytes).map_err(|e| RemoteError::Decode(e.to_string()))
    }
}
