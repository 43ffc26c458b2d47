//! Request and response bodies as they appear on the wire.
//!
//! Field names are camelCase to match the admin console. Passwords are only
//! ever read, never written: responses carry [`UserView`], which has no
//! credential field at all.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::domain::settings::optional_secret;
use crate::domain::{Settings, UserAccount};

/// A user record as sent by the console for create and update.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPayload {
    /// Provisional id on create; the record to replace on update.
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(deserialize_with = "optional_secret::deserialize")]
    pub password: Option<SecretString>,
    /// Expected revision for the optimistic concurrency check.
    pub revision: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub user: UserPayload,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub user: UserPayload,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchUsersRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GetUserRequest {
    pub id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    #[serde(deserialize_with = "optional_secret::deserialize")]
    pub password: Option<SecretString>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<&UserAccount> for UserView {
    fn from(account: &UserAccount) -> Self {
        Self {
            id: account.id.clone(),
            name: account.name.clone(),
            email: account.email.clone(),
            phone: account.phone.clone(),
            revision: account.revision,
            created_at: account.created_at,
            updated_at: account.updated_at,
            last_login_at: account.last_login_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub ok: bool,
    pub id: String,
    pub revision: u64,
    pub replayed: bool,
    pub message: String,
    pub user: UserView,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub ok: bool,
    pub users: Vec<UserView>,
    pub count: usize,
    pub message: String,
}

/// Settings as returned by `getSettings`: flat, with secrets reduced to
/// whether they are set (and the last characters of the model key).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView {
    pub gemini_key_configured: bool,
    pub gemini_key_hint: Option<String>,
    pub auto_send_threshold: f64,
    pub system_prompt: String,
    pub fallback_prompt: String,
    pub provider: String,
    pub forwarding_address: String,
    pub mailbox_user: String,
    pub imap_host: String,
    pub imap_port: String,
    pub encryption: String,
    pub forwarding_note: String,
    pub mailbox_note: String,
    pub username: String,
    pub password_configured: bool,
    pub phonenumber: String,
    pub email: String,
}

impl From<&Settings> for SettingsView {
    fn from(settings: &Settings) -> Self {
        let assistant = &settings.assistant;
        let inbound = &settings.inbound;
        Self {
            gemini_key_configured: assistant.gemini_key.is_some(),
            gemini_key_hint: assistant.gemini_key_hint(),
            auto_send_threshold: assistant.auto_send_threshold,
            system_prompt: assistant.system_prompt.clone(),
            fallback_prompt: assistant.fallback_prompt.clone(),
            provider: inbound.provider.clone(),
            forwarding_address: inbound.forwarding_address.clone(),
            mailbox_user: inbound.mailbox_user.clone(),
            imap_host: inbound.imap_host.clone(),
            imap_port: inbound.imap_port.clone(),
            encryption: inbound.encryption.clone(),
            forwarding_note: inbound.forwarding_note.clone(),
            mailbox_note: inbound.mailbox_note.clone(),
            username: inbound.username.clone(),
            password_configured: inbound.password.is_some(),
            phonenumber: inbound.phonenumber.clone(),
            email: inbound.email.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub ok: bool,
    pub message: String,
    #[serde(flatten)]
    pub settings: SettingsView,
}
