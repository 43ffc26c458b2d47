//! Account directory service.
//!
//! Two actors own all state: a [`ResourceActor`](actor_framework::ResourceActor)
//! over [`UserAccount`](domain::UserAccount) records and the
//! [`SettingsService`](actors::SettingsService). Typed clients talk to them
//! over bounded channels; the axum [`router`](routes::router) exposes both
//! through the console's single-endpoint action protocol.

pub mod account_actor;
pub mod actor_framework;
pub mod actors;
pub mod app_system;
pub mod clients;
pub mod config;
pub mod credentials;
pub mod domain;
pub mod error;
pub mod messages;
pub mod remote;
pub mod routes;
pub mod state;
pub mod storage;

#[cfg(test)]
mod mock_framework;
