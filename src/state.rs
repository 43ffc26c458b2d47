//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::clients::{AccountClient, SettingsClient};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    accounts: AccountClient,
    settings: SettingsClient,
    allowed_origins: Vec<String>,
    request_timeout: Duration,
}

impl AppState {
    pub fn new(
        accounts: AccountClient,
        settings: SettingsClient,
        allowed_origins: Vec<String>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                accounts,
                settings,
                allowed_origins,
                request_timeout,
            }),
        }
    }

    pub fn accounts(&self) -> &AccountClient {
        &self.inner.accounts
    }

    pub fn settings(&self) -> &SettingsClient {
        &self.inner.settings
    }

    /// Empty means any origin is accepted.
    pub fn allowed_origins(&self) -> &[String] {
        &self.inner.allowed_origins
    }

    pub fn request_timeout(&self) -> Duration {
        self.inner.request_timeout
    }

    pub fn origin_allowed(&self, origin: &str) -> bool {
        let origin = origin.trim().trim_end_matches('/');
        self.allowed_origins().is_empty() || self.allowed_origins().iter().any(|allowed| allowed == origin)
    }
}
