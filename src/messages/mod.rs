use tokio::sync::oneshot;

use crate::actors::SettingsError;
use crate::domain::{Settings, SettingsPatch};

/// Generic type aliases for service communication
pub type ServiceResult<T, E> = std::result::Result<T, E>;
pub type ServiceResponse<T, E> = oneshot::Sender<ServiceResult<T, E>>;

/// Messages understood by the settings service. Each variant carries its
/// parameters and a oneshot channel for the reply.
#[derive(Debug)]
pub enum SettingsRequest {
    GetSettings {
        respond_to: ServiceResponse<Settings, SettingsError>,
    },
    /// Merge `patch` into the stored settings; replies with the result.
    SaveSettings {
        patch: SettingsPatch,
        respond_to: ServiceResponse<Settings, SettingsError>,
    },
    Shutdown,
}
