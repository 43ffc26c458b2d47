mod error;

pub use error::*;

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use crate::clients::SettingsClient;
use crate::domain::{Settings, SettingsPatch};
use crate::messages::{ServiceResponse, SettingsRequest};
use crate::storage::{SnapshotFile, StorageError};

// =============================================================================
// SETTINGS SERVICE
// =============================================================================

/// Owns the console settings. A save is merged into a copy, persisted, and
/// only then committed, so a failed save changes nothing.
pub struct SettingsService {
    receiver: mpsc::Receiver<SettingsRequest>,
    settings: Settings,
    snapshot: Option<SnapshotFile>,
}

impl SettingsService {
    pub fn new(buffer_size: usize, deadline: Duration) -> (Self, SettingsClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let service = Self {
            receiver,
            settings: Settings::default(),
            snapshot: None,
        };
        let client = SettingsClient::new(sender, deadline);
        (service, client)
    }

    /// Loads stored settings from `snapshot`, if the file exists, and persists
    /// every later save there.
    pub fn with_snapshot(mut self, snapshot: SnapshotFile) -> Result<Self, StorageError> {
        if let Some(settings) = snapshot.load::<Settings>()? {
            info!(path = %snapshot.path().display(), "Loaded settings snapshot");
            self.settings = settings;
        }
        self.snapshot = Some(snapshot);
        Ok(self)
    }

    #[instrument(name = "settings_service", skip(self))]
    pub async fn run(mut self) {
        info!("SettingsService starting");
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                SettingsRequest::GetSettings { respond_to } => {
                    debug!("Processing get_settings request");
                    let _ = respond_to.send(Ok(self.settings.clone()));
                }
                SettingsRequest::SaveSettings { patch, respond_to } => {
                    self.handle_save(patch, respond_to).await;
                }
                SettingsRequest::Shutdown => {
                    info!("SettingsService shutting down");
                    break;
                }
            }
        }
        info!("SettingsService stopped");
    }

    #[instrument(skip_all, fields(fields = ?patch.touched_fields()))]
    async fn handle_save(&mut self, patch: SettingsPatch, respond_to: ServiceResponse<Settings, SettingsError>) {
        info!("Processing save_settings request");

        let next = match self.settings.merged(patch) {
            Ok(next) => next,
            Err(e) => {
                warn!(error = %e, "Settings rejected");
                let _ = respond_to.send(Err(e.into()));
                return;
            }
        };

        if let Some(snapshot) = &self.snapshot {
            if let Err(e) = snapshot.store(&next).await {
                error!(error = %e, "Failed to persist settings");
                let _ = respond_to.send(Err(e.into()));
                return;
            }
        }

        self.settings = next;
        info!("Settings saved");
        let _ = respond_to.send(Ok(self.settings.clone()));
    }
}
