use chrono::Utc;

use super::actions::{AccountAction, AccountActionResult};
use crate::actor_framework::{Entity, ValidationError};
use crate::domain::{normalize_phone, required, AccountCreate, AccountFilter, AccountReplace, UserAccount};

impl Entity for UserAccount {
    type Id = String;
    type CreateParams = AccountCreate;
    type Replacement = AccountReplace;
    type Filter = AccountFilter;
    type Action = AccountAction;
    type ActionResult = AccountActionResult;

    fn id(&self) -> &String {
        &self.id
    }

    fn revision(&self) -> u64 {
        self.revision
    }

    fn set_revision(&mut self, revision: u64) {
        self.revision = revision;
    }

    /// Builds a new account at revision 1.
    ///
    /// The store is the trust boundary, so name, email and the credential are
    /// checked again here even though the directory layer already did.
    fn from_create_params(id: String, params: AccountCreate) -> Result<Self, ValidationError> {
        let now = Utc::now();
        Ok(Self {
            id,
            name: required("name", &params.name)?,
            email: required("email", &params.email)?,
            phone: params.phone.trim().to_string(),
            password_hash: required("password", &params.password_hash)?,
            revision: 1,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        })
    }

    /// Name, email and phone as search compares them. The password hash is
    /// salted per attempt, so it is left out.
    fn create_fingerprint(params: &AccountCreate) -> String {
        format!(
            "{}\n{}\n{}",
            params.name.trim().to_lowercase(),
            params.email.trim().to_lowercase(),
            normalize_phone(&params.phone)
        )
    }

    /// Full-record replace of the editable fields.
    fn on_replace(&mut self, replacement: AccountReplace) -> Result<(), ValidationError> {
        self.name = required("name", &replacement.name)?;
        self.email = required("email", &replacement.email)?;
        self.phone = replacement.phone.trim().to_string();
        if let Some(hash) = replacement.password_hash {
            self.password_hash = required("password", &hash)?;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    fn matches(&self, filter: &AccountFilter) -> bool {
        filter.matches(self)
    }

    fn handle_action(&mut self, action: AccountAction) -> Result<AccountActionResult, ValidationError> {
        match action {
            AccountAction::RecordLogin { at } => {
                self.last_login_at = Some(at);
                Ok(AccountActionResult::RecordLogin(Box::new(self.clone())))
            }
        }
    }
}
