use std::fmt;
use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, instrument, warn};

use crate::account_actor::{AccountAction, AccountActionResult, AccountError};
use crate::actor_framework::{Created, FrameworkError, ResourceClient};
use crate::credentials::{CredentialError, CredentialHasher};
use crate::domain::{required, AccountCreate, AccountFilter, AccountReplace, UserAccount};

/// A create request as it arrives from the directory boundary, password in
/// the clear. It is hashed before it reaches the store.
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: SecretString,
}

/// A full-record update. `password: None` keeps the stored credential.
pub struct AccountUpdate {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: Option<SecretString>,
    pub expected_revision: Option<u64>,
}

impl fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccount")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for AccountUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountUpdate")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("expected_revision", &self.expected_revision)
            .finish_non_exhaustive()
    }
}

/// Client for the account store.
///
/// Validates and hashes credentials before anything is sent to the actor, and
/// bounds every store round trip by the request deadline.
#[derive(Clone)]
pub struct AccountClient {
    inner: ResourceClient<UserAccount>,
    hasher: CredentialHasher,
    deadline: Duration,
}

impl AccountClient {
    pub fn new(inner: ResourceClient<UserAccount>, hasher: CredentialHasher, deadline: Duration) -> Self {
        Self {
            inner,
            hasher,
            deadline,
        }
    }

    #[instrument(skip_all, fields(email = %account.email))]
    pub async fn create_account(
        &self,
        account: NewAccount,
        idempotency_key: Option<String>,
    ) -> Result<Created<String>, AccountError> {
        let name = required("name", &account.name)?;
        let email = required("email", &account.email)?;
        let password = non_blank_password(&account.password)?;

        let password_hash = self.hasher.hash(password.to_owned()).await?;
        let params = AccountCreate {
            name,
            email,
            phone: account.phone.trim().to_string(),
            password_hash,
        };

        debug!("Sending request");
        let created = self.within(self.inner.create(params, idempotency_key)).await?;
        info!(id = %created.id, replayed = created.replayed, "Account created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_account(&self, id: String) -> Result<Option<UserAccount>, AccountError> {
        debug!("Sending request");
        self.within(self.inner.get(id)).await
    }

    /// Replaces the editable fields of an existing account.
    #[instrument(skip_all, fields(id = %update.id, expected_revision = ?update.expected_revision))]
    pub async fn replace_account(&self, update: AccountUpdate) -> Result<UserAccount, AccountError> {
        let name = required("name", &update.name)?;
        let email = required("email", &update.email)?;
        let password_hash = match &update.password {
            Some(password) => Some(self.hasher.hash(non_blank_password(password)?.to_owned()).await?),
            None => None,
        };

        let replacement = AccountReplace {
            name,
            email,
            phone: update.phone.trim().to_string(),
            password_hash,
        };

        debug!("Sending request");
        let account = self
            .within(self.inner.replace(update.id, update.expected_revision, replacement))
            .await?;
        info!(revision = account.revision, "Account replaced");
        Ok(account)
    }

    /// Accounts matching every constraint of `filter`, oldest first.
    #[instrument(skip(self))]
    pub async fn search_accounts(&self, filter: AccountFilter) -> Result<Vec<UserAccount>, AccountError> {
        if filter.is_empty() {
            return Err(AccountError::Validation(
                "at least one of name, email or phone is required".to_string(),
            ));
        }

        debug!("Sending request");
        let mut accounts = self.within(self.inner.search(filter)).await?;
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        debug!(count = accounts.len(), "Search complete");
        Ok(accounts)
    }

    /// Finds the account whose email and password match and records the login.
    ///
    /// Emails are not unique, so every account with the address is tried.
    #[instrument(skip_all, fields(email = %email))]
    pub async fn authenticate(&self, email: &str, password: SecretString) -> Result<UserAccount, AccountError> {
        let filter = AccountFilter::exact_email(email);
        if filter.is_empty() || password.expose_secret().is_empty() {
            return Err(AccountError::InvalidCredentials);
        }

        let candidates = self.within(self.inner.search(filter)).await?;
        for candidate in candidates {
            let verified = self
                .hasher
                .verify(password.expose_secret().to_owned(), candidate.password_hash.clone())
                .await;
            match verified {
                Ok(true) => {
                    let action = AccountAction::RecordLogin { at: Utc::now() };
                    let AccountActionResult::RecordLogin(account) =
                        self.within(self.inner.perform_action(candidate.id, action)).await?;
                    info!(id = %account.id, "Login succeeded");
                    return Ok(*account);
                }
                Ok(false) => {}
                Err(CredentialError::MalformedHash) => {
                    warn!(id = %candidate.id, "Stored password hash is malformed");
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!("Login rejected");
        Err(AccountError::InvalidCredentials)
    }

    #[instrument(skip(self))]
    pub async fn count(&self) -> Result<usize, AccountError> {
        self.within(self.inner.count()).await
    }

    pub async fn shutdown(&self) -> Result<(), AccountError> {
        self.inner.shutdown().await.map_err(AccountError::from)
    }

    async fn within<R>(&self, call: impl Future<Output = Result<R, FrameworkError>>) -> Result<R, AccountError> {
        match tokio::time::timeout(self.deadline, call).await {
            Ok(result) => result.map_err(AccountError::from),
            Err(_) => {
                warn!(deadline_ms = self.deadline.as_millis() as u64, "Account store deadline exceeded");
                Err(AccountError::Timeout(self.deadline))
            }
        }
    }
}

fn non_blank_password(password: &SecretString) -> Result<&str, AccountError> {
    let exposed = password.expose_secret();
    if exposed.trim().is_empty() {
        Err(AccountError::Validation("password is required".to_string()))
    } else {
        Ok(exposed)
    }
}
