use std::time::Duration;
use thiserror::Error;

/// Errors raised by the quiz progression engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuizError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Failure to resolve a fact or a country profile. Always displayable to the
/// player; never affects quiz state.
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("Could not look up a stored fact for {subject}: {source}")]
    Lookup {
        subject: String,
        #[source]
        source: StoreError,
    },
    #[error("Could not generate a fact for {subject}: {source}")]
    Generation {
        subject: String,
        #[source]
        source: QueryResolverError,
    },
    #[error("The model returned an empty fact for {0}")]
    EmptyFact(String),
    #[error("Please select a valid country from the list first (got '{0}')")]
    UnknownSubject(String),
    #[error("Fact resolution for {subject} was interrupted: {reason}")]
    Interrupted { subject: String, reason: String },
}

impl ResolutionError {
    /// Subject the failure belongs to.
    pub fn subject(&self) -> &str {
        match self {
            Self::Lookup { subject, .. }
            | Self::Generation { subject, .. }
            | Self::Interrupted { subject, .. } => subject,
            Self::EmptyFact(subject) | Self::UnknownSubject(subject) => subject,
        }
    }
}

/// Upsert failure after a successful generation. Logged, never surfaced.
#[derive(Error, Debug)]
#[error("Failed to write fact for {subject} back to the store: {source}")]
pub struct WriteBackError {
    pub subject: String,
    #[source]
    pub source: StoreError,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Store API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed store data: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum QueryResolverError {
    #[error("AI error: {0}")]
    Ai(#[from] AIError),
    #[error("JSON deserialization error: {0}. Raw response: {1}")]
    JsonDeserialization(#[source] serde_json::Error, String),
    #[error("No JSON matching the requested schema in response: {0}")]
    NoData(String),
}

#[derive(Error, Debug)]
pub enum AIError {
    #[error("Gemini API error: {0}")]
    Gemini(#[from] GeminiError),
    #[error("DeepSeek API error: {0}")]
    DeepSeek(#[from] DeepSeekError),
    #[error("Mock error: {0}")]
    Mock(String),
    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Error, Debug)]
pub enum GeminiError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Response blocked: {0}")]
    Blocked(String),
    #[error("Rate limit exceeded")]
    RateLimit,
    #[error("Authentication failed")]
    Authentication,
}

#[derive(Error, Debug)]
pub enum DeepSeekError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limit exceeded")]
    RateLimit,
    #[error("Authentication failed")]
    Authentication,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    MissingKey(&'static str),
    #[error("Invalid value '{value}' for {key}")]
    Invalid { key: &'static str, value: String },
}
