pub mod account;
pub mod settings;

pub use account::*;
pub use settings::*;
