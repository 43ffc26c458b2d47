use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::actor_framework::ValidationError;

/// A directory account as held by the account store.
///
/// Serialized in full only to the store snapshot. HTTP responses go through
/// `UserView`, which never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    /// Argon2id PHC string.
    pub password_hash: String,
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Parameters for creating an account. The password is already hashed.
#[derive(Debug, Clone)]
pub struct AccountCreate {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
}

/// Full-record replacement. `password_hash: None` keeps the stored credential.
#[derive(Debug, Clone)]
pub struct AccountReplace {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: Option<String>,
}

/// Search predicate over accounts. Blank inputs are dropped at construction,
/// so a field that is `Some` always constrains the result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountFilter {
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    exact_email: Option<String>,
}

impl AccountFilter {
    pub fn new(name: Option<&str>, email: Option<&str>, phone: Option<&str>) -> Self {
        Self {
            name: name.and_then(lowercase_term),
            email: email.and_then(lowercase_term),
            phone: phone.map(normalize_phone).filter(|p| !p.is_empty()),
            exact_email: None,
        }
    }

    /// Matches accounts whose email equals `email`, ignoring case and
    /// surrounding whitespace.
    pub fn exact_email(email: &str) -> Self {
        Self {
            exact_email: lowercase_term(email),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.exact_email.is_none()
    }

    pub fn matches(&self, account: &UserAccount) -> bool {
        if let Some(name) = &self.name {
            if !account.name.to_lowercase().contains(name) {
                return false;
            }
        }
        if let Some(email) = &self.email {
            if !account.email.to_lowercase().contains(email) {
                return false;
            }
        }
        if let Some(exact) = &self.exact_email {
            if account.email.trim().to_lowercase() != *exact {
                return false;
            }
        }
        if let Some(phone) = &self.phone {
            if !normalize_phone(&account.phone).contains(phone.as_str()) {
                return false;
            }
        }
        true
    }
}

fn lowercase_term(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
}

/// Comparison key for phone numbers: digits only, one leading `0` removed.
///
/// `"03-1234-5678"` and `"3-1234-5678"` both become `"312345678"`.
pub fn normalize_phone(value: &str) -> String {
    let digits: String = value.chars().filter(char::is_ascii_digit).collect();
    match digits.strip_prefix('0') {
        Some(rest) => rest.to_string(),
        None => digits,
    }
}

/// Trims `value` and rejects it if nothing is left.
pub fn required(field: &str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::new(field, "is required"))
    } else {
        Ok(trimmed.to_string())
    }
}
