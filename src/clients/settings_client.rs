use std::time::Duration;

use tokio::sync::mpsc;

use crate::actors::SettingsError;
use crate::domain::{Settings, SettingsPatch};
use crate::messages::SettingsRequest;

/// Client for interacting with the settings service.
#[derive(Clone)]
pub struct SettingsClient {
    sender: mpsc::Sender<SettingsRequest>,
    deadline: Duration,
}

impl SettingsClient {
    pub fn new(sender: mpsc::Sender<SettingsRequest>, deadline: Duration) -> Self {
        Self { sender, deadline }
    }

    pub async fn shutdown(&self) -> Result<(), SettingsError> {
        self.sender
            .send(SettingsRequest::Shutdown)
            .await
            .map_err(|_| SettingsError::ActorCommunicationError("Actor closed".to_string()))
    }
}

client_method!(SettingsClient => fn get_settings() -> Settings as SettingsRequest::GetSettings, Error = SettingsError);
client_method!(SettingsClient => fn save_settings(patch: SettingsPatch) -> Settings as SettingsRequest::SaveSettings, Error = SettingsError);
