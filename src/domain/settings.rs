//! Console settings: the AI assistant section and the mail-ingestion section.
//!
//! Saving is a field-level merge. Fields absent from a [`SettingsPatch`] keep
//! their stored value, so a caller changing one field cannot wipe the others.
//! Secrets are never read back, so a blank secret also keeps the stored one;
//! only an explicit `null` clears it.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};

use crate::actor_framework::ValidationError;

pub const DEFAULT_AUTO_SEND_THRESHOLD: f64 = 0.78;

/// Keys this short are shown only as configured, never hinted.
const MIN_HINTED_KEY_LEN: usize = 9;
const HINT_LEN: usize = 4;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an AI support assistant for AI Auto Mail System.
- Always produce polite, empathetic business email responses.
- Reference knowledge snippets provided in the context with bullet points.
- Preserve important numbers, prices, deadlines, and policy names.
- When information is missing, flag the gap and request clarification instead of guessing.";

pub const DEFAULT_FALLBACK_PROMPT: &str = "If the model confidence is low, generate a short acknowledgement asking a human operator to follow up.";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub assistant: AssistantSettings,
    #[serde(default)]
    pub inbound: InboundSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssistantSettings {
    #[serde(with = "optional_secret")]
    pub gemini_key: Option<SecretString>,
    pub auto_send_threshold: f64,
    pub system_prompt: String,
    pub fallback_prompt: String,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            gemini_key: None,
            auto_send_threshold: DEFAULT_AUTO_SEND_THRESHOLD,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            fallback_prompt: DEFAULT_FALLBACK_PROMPT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InboundSettings {
    pub provider: String,
    pub forwarding_address: String,
    pub mailbox_user: String,
    pub imap_host: String,
    pub imap_port: String,
    pub encryption: String,
    pub forwarding_note: String,
    pub mailbox_note: String,
    pub username: String,
    #[serde(with = "optional_secret")]
    pub password: Option<SecretString>,
    pub phonenumber: String,
    pub email: String,
}

impl Default for InboundSettings {
    fn default() -> Self {
        Self {
            provider: "Google Workspace".to_string(),
            forwarding_address: String::new(),
            mailbox_user: String::new(),
            imap_host: "imap.gmail.com".to_string(),
            imap_port: "993".to_string(),
            encryption: "SSL/TLS".to_string(),
            forwarding_note: String::new(),
            mailbox_note: String::new(),
            username: String::new(),
            password: None,
            phonenumber: String::new(),
            email: String::new(),
        }
    }
}

/// Partial update as sent by the console: flat camelCase fields, every one
/// optional. Unknown fields (`action`, `origin`, `accounts`) are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(flatten)]
    pub assistant: AssistantPatch,
    #[serde(flatten)]
    pub inbound: InboundPatch,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantPatch {
    #[serde(default)]
    pub gemini_key: SecretUpdate,
    pub auto_send_threshold: Option<f64>,
    pub system_prompt: Option<String>,
    pub fallback_prompt: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundPatch {
    pub provider: Option<String>,
    pub forwarding_address: Option<String>,
    pub mailbox_user: Option<String>,
    pub imap_host: Option<String>,
    pub imap_port: Option<String>,
    pub encryption: Option<String>,
    pub forwarding_note: Option<String>,
    pub mailbox_note: Option<String>,
    pub username: Option<String>,
    #[serde(default)]
    pub password: SecretUpdate,
    pub phonenumber: Option<String>,
    pub email: Option<String>,
}

/// What a patch does to a stored secret.
#[derive(Debug, Clone, Default)]
pub enum SecretUpdate {
    /// Absent or blank.
    #[default]
    Keep,
    /// Explicit `null`.
    Clear,
    Set(SecretString),
}

impl SecretUpdate {
    pub fn is_keep(&self) -> bool {
        matches!(self, Self::Keep)
    }

    fn apply_to(self, slot: &mut Option<SecretString>) {
        match self {
            Self::Keep => {}
            Self::Clear => *slot = None,
            Self::Set(secret) => *slot = Some(secret),
        }
    }
}

impl<'de> Deserialize<'de> for SecretUpdate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<String>::deserialize(deserializer)? {
            None => Self::Clear,
            Some(value) if value.trim().is_empty() => Self::Keep,
            Some(value) => Self::Set(SecretString::from(value)),
        })
    }
}

impl SettingsPatch {
    /// Names of the fields this patch touches, for logging.
    pub fn touched_fields(&self) -> Vec<&'static str> {
        let a = &self.assistant;
        let i = &self.inbound;
        [
            ("geminiKey", !a.gemini_key.is_keep()),
            ("autoSendThreshold", a.auto_send_threshold.is_some()),
            ("systemPrompt", a.system_prompt.is_some()),
            ("fallbackPrompt", a.fallback_prompt.is_some()),
            ("provider", i.provider.is_some()),
            ("forwardingAddress", i.forwarding_address.is_some()),
            ("mailboxUser", i.mailbox_user.is_some()),
            ("imapHost", i.imap_host.is_some()),
            ("imapPort", i.imap_port.is_some()),
            ("encryption", i.encryption.is_some()),
            ("forwardingNote", i.forwarding_note.is_some()),
            ("mailboxNote", i.mailbox_note.is_some()),
            ("username", i.username.is_some()),
            ("password", !i.password.is_keep()),
            ("phonenumber", i.phonenumber.is_some()),
            ("email", i.email.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
        .collect()
    }
}

impl Settings {
    /// Returns the settings with `patch` merged in, or the first violated
    /// constraint. `self` is never modified.
    pub fn merged(&self, patch: SettingsPatch) -> Result<Settings, ValidationError> {
        let mut next = self.clone();
        next.assistant.apply(patch.assistant)?;
        next.inbound.apply(patch.inbound)?;
        Ok(next)
    }
}

impl AssistantSettings {
    fn apply(&mut self, patch: AssistantPatch) -> Result<(), ValidationError> {
        if let Some(threshold) = patch.auto_send_threshold {
            if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
                return Err(ValidationError::new(
                    "autoSendThreshold",
                    "must be between 0 and 1",
                ));
            }
            self.auto_send_threshold = threshold;
        }
        patch.gemini_key.apply_to(&mut self.gemini_key);
        if let Some(prompt) = patch.system_prompt {
            self.system_prompt = prompt;
        }
        if let Some(prompt) = patch.fallback_prompt {
            self.fallback_prompt = prompt;
        }
        Ok(())
    }

    /// Last four characters of the key, enough for an operator to recognise it.
    /// Short keys get no hint, since four characters would give most of it away.
    pub fn gemini_key_hint(&self) -> Option<String> {
        let chars: Vec<char> = self.gemini_key.as_ref()?.expose_secret().chars().collect();
        if chars.len() < MIN_HINTED_KEY_LEN {
            return None;
        }
        let tail: String = chars[chars.len() - HINT_LEN..].iter().collect();
        Some(format!("…{tail}"))
    }
}

impl InboundSettings {
    fn apply(&mut self, patch: InboundPatch) -> Result<(), ValidationError> {
        if let Some(port) = &patch.imap_port {
            validate_port(port)?;
        }

        let fields = [
            (&mut self.provider, patch.provider),
            (&mut self.forwarding_address, patch.forwarding_address),
            (&mut self.mailbox_user, patch.mailbox_user),
            (&mut self.imap_host, patch.imap_host),
            (&mut self.imap_port, patch.imap_port),
            (&mut self.encryption, patch.encryption),
            (&mut self.forwarding_note, patch.forwarding_note),
            (&mut self.mailbox_note, patch.mailbox_note),
            (&mut self.username, patch.username),
            (&mut self.phonenumber, patch.phonenumber),
            (&mut self.email, patch.email),
        ];
        for (slot, value) in fields {
            if let Some(value) = value {
                *slot = value.trim().to_string();
            }
        }

        patch.password.apply_to(&mut self.password);
        Ok(())
    }
}

fn validate_port(port: &str) -> Result<(), ValidationError> {
    let port = port.trim();
    if port.is_empty() {
        return Ok(());
    }
    match port.parse::<u16>() {
        Ok(p) if p > 0 => Ok(()),
        _ => Err(ValidationError::new("imapPort", "must be a port number between 1 and 65535")),
    }
}

pub(crate) mod optional_secret {
    use secrecy::{ExposeSecret, SecretString};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<SecretString>, serializer: S) -> Result<S::Ok, S::Error> {
        value
            .as_ref()
            .map(|secret| secret.expose_secret())
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<SecretString>, D::Error> {
        Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
    }
}
