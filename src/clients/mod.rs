#[macro_use]
mod macros;

mod account_client;
mod settings_client;

pub use account_client::*;
pub use settings_client::*;
