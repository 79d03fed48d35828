use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::clients::flexible::ClientType;
use crate::error::ConfigError;

pub const CLIENT_VAR: &str = "FLAG_QUIZ_CLIENT";
pub const STORE_VAR: &str = "FLAG_QUIZ_STORE";
pub const TIMEOUT_VAR: &str = "FLAG_QUIZ_TIMEOUT_SECS";
pub const SUPABASE_URL_VAR: &str = "SUPABASE_URL";
pub const SUPABASE_KEY_VAR: &str = "SUPABASE_ANON_KEY";

/// Default bound on a single generation call.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Trait for types that can retrieve their configuration key from environment variables
pub trait KeyFromEnv {
    /// The environment variable name for this client's API key
    const KEY_NAME: &'static str;

    /// Older variable names still honoured when `KEY_NAME` is unset
    const FALLBACK_KEY_NAMES: &'static [&'static str] = &[];

    /// Find the API key by checking environment variables first, then .env file
    fn find_key() -> Option<String> {
        // First try to load .env file (silently fail if not found)
        let _ = dotenvy::dotenv();
        Self::find_key_with(|name| env::var(name).ok())
    }

    /// Same as `find_key`, reading variables through `lookup`
    fn find_key_with(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        std::iter::once(Self::KEY_NAME)
            .chain(Self::FALLBACK_KEY_NAMES.iter().copied())
            .filter_map(|name| lookup(name))
            .find(|value| usable_key(value))
    }

    fn require_key() -> Result<String, ConfigError> {
        Self::find_key().ok_or(ConfigError::MissingKey(Self::KEY_NAME))
    }
}

// Build tooling that inlines env vars writes the literal "undefined" for missing keys.
fn usable_key(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && value != "undefined"
}

/// Where durable facts are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    File(PathBuf),
    Supabase { url: String, anon_key: String },
}

impl StoreKind {
    /// Parse `memory`, `file:<path>` or `supabase`. Supabase credentials are read through `lookup`.
    pub fn parse(raw: &str, lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("memory") {
            return Ok(Self::Memory);
        }
        if let Some(path) = trimmed.strip_prefix("file:") {
            if path.is_empty() {
                return Err(ConfigError::Invalid { key: STORE_VAR, value: raw.to_string() });
            }
            return Ok(Self::File(PathBuf::from(path)));
        }
        if trimmed.eq_ignore_ascii_case("supabase") {
            let url = lookup(SUPABASE_URL_VAR).ok_or(ConfigError::MissingKey(SUPABASE_URL_VAR))?;
            let anon_key = lookup(SUPABASE_KEY_VAR).ok_or(ConfigError::MissingKey(SUPABASE_KEY_VAR))?;
            return Ok(Self::Supabase { url, anon_key });
        }
        Err(ConfigError::Invalid { key: STORE_VAR, value: raw.to_string() })
    }
}

/// Runtime configuration for a quiz game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizConfig {
    pub client: ClientType,
    pub store: StoreKind,
    pub generation_timeout: Duration,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            client: ClientType::Mock,
            store: StoreKind::Memory,
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }
}

impl QuizConfig {
    /// Read configuration from the process environment (after loading `.env`).
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let client = match lookup(CLIENT_VAR) {
            Some(raw) => ClientType::from_str(&raw)
                .map_err(|_| ConfigError::Invalid { key: CLIENT_VAR, value: raw })?,
            None => ClientType::detect_with(&lookup),
        };

        let store = match lookup(STORE_VAR) {
            Some(raw) => StoreKind::parse(&raw, &lookup)?,
            None => StoreKind::Memory,
        };

        let generation_timeout = match lookup(TIMEOUT_VAR) {
            Some(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::Invalid { key: TIMEOUT_VAR, value: raw.clone() })?;
                if secs == 0 {
                    return Err(ConfigError::Invalid { key: TIMEOUT_VAR, value: raw });
                }
                Duration::from_secs(secs)
            }
            None => DEFAULT_GENERATION_TIMEOUT,
        };

        Ok(Self { client, store, generation_timeout })
    }

    #[must_use]
    pub fn with_client(mut self, client: ClientType) -> Self {
        self.client = client;
        self
    }
}
