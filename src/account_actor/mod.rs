//! Account-specific entity logic, including the login bookkeeping action.

mod actions;
pub mod entity;
pub mod error;

pub use actions::*;
pub use error::*;
