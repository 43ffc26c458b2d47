use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::actor_framework::ResourceActor;
use crate::actors::SettingsService;
use crate::clients::{AccountClient, SettingsClient};
use crate::config::DirectoryConfig;
use crate::credentials::CredentialHasher;
use crate::domain::UserAccount;
use crate::storage::{SnapshotFile, StorageError};

pub const ACCOUNTS_SNAPSHOT: &str = "accounts.json";
pub const SETTINGS_SNAPSHOT: &str = "settings.json";

#[derive(Debug, Error)]
pub enum SystemError {
    #[error("failed to load snapshot: {0}")]
    Snapshot(#[from] StorageError),
    #[error("actor task failed: {0}")]
    TaskFailed(String),
}

/// What the system needs to start its actors.
#[derive(Debug, Clone)]
pub struct SystemOptions {
    pub data_dir: Option<PathBuf>,
    pub channel_capacity: usize,
    pub request_timeout: Duration,
    pub hasher: CredentialHasher,
}

impl From<&DirectoryConfig> for SystemOptions {
    fn from(config: &DirectoryConfig) -> Self {
        Self {
            data_dir: config.data_dir.clone(),
            channel_capacity: config.channel_capacity,
            request_timeout: config.request_timeout,
            hasher: CredentialHasher::default(),
        }
    }
}

/// The account directory: the account store and the settings service.
///
/// Responsible for starting both actors, wiring their clients, and shutting
/// them down in order.
pub struct DirectorySystem {
    pub accounts: AccountClient,
    pub settings: SettingsClient,
    handles: Vec<JoinHandle<()>>,
}

impl DirectorySystem {
    pub fn start(options: SystemOptions) -> Result<Self, SystemError> {
        let snapshot = |name: &str| options.data_dir.as_ref().map(|dir| SnapshotFile::new(dir.join(name)));

        // 1. Account store
        let next_account_id = || format!("user-{}", Uuid::new_v4().simple());
        let (mut account_actor, account_resource_client) =
            ResourceActor::<UserAccount>::new(options.channel_capacity, next_account_id);
        if let Some(file) = snapshot(ACCOUNTS_SNAPSHOT) {
            account_actor = account_actor.with_snapshot(file)?;
        }
        let accounts = AccountClient::new(account_resource_client, options.hasher.clone(), options.request_timeout);

        // 2. Settings service
        let (mut settings_service, settings) =
            SettingsService::new(options.channel_capacity, options.request_timeout);
        if let Some(file) = snapshot(SETTINGS_SNAPSHOT) {
            settings_service = settings_service.with_snapshot(file)?;
        }

        if options.data_dir.is_none() {
            warn!("No data directory configured; accounts and settings live in memory only");
        }

        let handles = vec![tokio::spawn(account_actor.run()), tokio::spawn(settings_service.run())];
        info!("Directory system started");

        Ok(Self {
            accounts,
            settings,
            handles,
        })
    }

    /// Asks each actor to stop, then waits for their tasks.
    pub async fn shutdown(self) -> Result<(), SystemError> {
        info!("Shutting down system...");

        if let Err(e) = self.accounts.shutdown().await {
            warn!(error = %e, "Account store already stopped");
        }
        if let Err(e) = self.settings.shutdown().await {
            warn!(error = %e, "Settings service already stopped");
        }

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Actor task failed");
                return Err(SystemError::TaskFailed(e.to_string()));
            }
        }

        info!("System shutdown complete.");
        Ok(())
    }
}
