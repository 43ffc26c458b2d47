use chrono::{DateTime, Utc};

/// Custom actions for account entities, beyond create and replace.
#[derive(Debug, Clone)]
pub enum AccountAction {
    /// Stamps `last_login_at`. Does not bump the revision, so an operator
    /// editing the record concurrently is not handed a spurious conflict.
    RecordLogin { at: DateTime<Utc> },
}

/// Results from AccountActions - variants match 1:1 with AccountAction
#[derive(Debug, Clone)]
pub enum AccountActionResult {
    RecordLogin(Box<crate::domain::UserAccount>),
}
