//! Credential Store
//!
//! Holds the single AI provider credential a user may configure. The file
//! store keeps it as a flat JSON object under two well-known keys so it
//! survives restarts. Nothing here validates the key beyond the provider
//! prefix check in [`Credential::new`]; the file is plaintext.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{PoisonError, RwLock};

pub const PROVIDER_KEY: &str = "ai_provider";
pub const API_KEY_KEY: &str = "ai_api_key";

/// AI providers that expose an OpenAI-compatible chat completions endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAI,
    Gemini,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::OpenAI => "openai",
            Provider::Gemini => "gemini",
        }
    }

    /// Every key issued by this provider starts with this prefix.
    pub fn key_prefix(self) -> &'static str {
        match self {
            Provider::OpenAI => "sk-",
            Provider::Gemini => "AIza",
        }
    }

    pub fn api_base(self) -> &'static str {
        match self {
            Provider::OpenAI => "https://api.openai.com/v1",
            Provider::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = CredentialFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAI),
            "gemini" => Ok(Provider::Gemini),
            other => Err(CredentialFormatError::UnknownProvider(other.to_string())),
        }
    }
}

/// Rejected user input for a credential. Reported back to whoever submitted
/// it; nothing is stored.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialFormatError {
    #[error("API key is empty")]
    Empty,
    #[error("Invalid API key format. {provider} keys start with \"{prefix}\"")]
    BadPrefix {
        provider: Provider,
        prefix: &'static str,
    },
    #[error("Unknown AI provider '{0}'")]
    UnknownProvider(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialStoreError {
    #[error("Credential file I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Credential file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Stored provider is not recognised: {0}")]
    Provider(#[from] CredentialFormatError),
}

/// A provider and the key to use with it.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    provider: Provider,
    api_key: String,
}

impl Credential {
    /// Builds a credential from user input, trimming the key and checking
    /// the provider's key prefix.
    pub fn new(provider: Provider, api_key: &str) -> Result<Self, CredentialFormatError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(CredentialFormatError::Empty);
        }
        if !api_key.starts_with(provider.key_prefix()) {
            return Err(CredentialFormatError::BadPrefix {
                provider,
                prefix: provider.key_prefix(),
            });
        }
        Ok(Self {
            provider,
            api_key: api_key.to_string(),
        })
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

// Keeps keys out of logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Persistent home of the credential.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<Credential>, CredentialStoreError>;
    fn save(&self, credential: &Credential) -> Result<(), CredentialStoreError>;
}

#[derive(Serialize, Deserialize, Default)]
struct StoredCredential {
    #[serde(rename = "ai_provider", default, skip_serializing_if = "Option::is_none")]
    provider: Option<String>,
    #[serde(rename = "ai_api_key", default, skip_serializing_if = "Option::is_none")]
    api_key: Option<String>,
}

/// Stores the credential as `{"ai_provider": "...", "ai_api_key": "..."}`.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> CredentialStoreError {
        CredentialStoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<Credential>, CredentialStoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_err(e)),
        };
        let stored: StoredCredential = serde_json::from_str(&content)?;
        let api_key = match stored.api_key.filter(|k| !k.trim().is_empty()) {
            Some(key) => key,
            None => return Ok(None),
        };
        // Older files only carried the key; those were always OpenAI keys.
        let provider = match stored.provider {
            Some(p) => p.parse()?,
            None => Provider::OpenAI,
        };
        Ok(Some(Credential { provider, api_key }))
    }

    fn save(&self, credential: &Credential) -> Result<(), CredentialStoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        let stored = StoredCredential {
            provider: Some(credential.provider.as_str().to_string()),
            api_key: Some(credential.api_key.clone()),
        };
        let json = serde_json::to_string_pretty(&stored)?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| self.io_err(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))?;
        tracing::info!(path = %self.path.display(), provider = %credential.provider, "Credential saved");
        Ok(())
    }
}

/// Process-local store, for tests and ephemeral setups.
#[derive(Default)]
pub struct MemoryCredentialStore {
    slot: RwLock<Option<Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<Credential>, CredentialStoreError> {
        Ok(self
            .slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, credential: &Credential) -> Result<(), CredentialStoreError> {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(credential.clone());
        Ok(())
    }
}
