//! System orchestration, startup, and shutdown logic.

mod directory_system;
mod telemetry;

pub use directory_system::*;
pub use telemetry::*;
