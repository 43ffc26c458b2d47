//! Settings actions: saveSettings, getSettings.

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use tracing::{instrument, warn};

use super::wire::{SettingsResponse, SettingsView};
use crate::domain::SettingsPatch;
use crate::error::AppError;
use crate::state::AppState;

/// Merges the fields present in the body into the stored settings.
///
/// The console also sends its `accounts` list here. Accounts only change
/// through the account actions, so that list is ignored.
#[instrument(skip_all)]
pub async fn save_settings(state: &AppState, body: Value) -> Result<Response, AppError> {
    if body.get("accounts").is_some() {
        warn!("saveSettings carried an accounts snapshot; ignoring it");
    }
    let patch: SettingsPatch = serde_json::from_value(body)?;
    let settings = state.settings().save_settings(patch).await?;

    Ok(Json(SettingsResponse {
        ok: true,
        message: "Settings saved".to_string(),
        settings: SettingsView::from(&settings),
    })
    .into_response())
}

#[instrument(skip_all)]
pub async fn get_settings(state: &AppState) -> Result<Response, AppError> {
    let settings = state.settings().get_settings().await?;
    Ok(Json(SettingsResponse {
        ok: true,
        message: "ok".to_string(),
        settings: SettingsView::from(&settings),
    })
    .into_response())
}
