//! Core querying API: wraps a low-level model client with a bounded wait,
//! schema-aware prompting, and typed extraction of the model's JSON.
//!
//! - `QueryResolver::ask_text()` for free-form answers (quiz facts)
//! - `QueryResolver::query::<T>()` for schema-bound answers validated into `T`

use crate::error::{AIError, QueryResolverError};
use crate::json_utils::{extract_first, find_json_structures};
use async_trait::async_trait;
use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Low-level model client abstraction.
///
/// Implementors provide `ask_raw`, which executes a prompt and returns the raw
/// model text. Structured output goes through `ask_structured`; the default
/// appends schema guidance to the prompt, providers with native JSON modes
/// override it.
#[async_trait]
pub trait LowLevelClient: Send + Sync + Debug {
    async fn ask_raw(&self, prompt: String) -> Result<String, AIError>;

    async fn ask_structured(&self, prompt: String, schema: serde_json::Value) -> Result<String, AIError> {
        self.ask_raw(add_schema_guidance(prompt, &schema)).await
    }

    /// Clone this client into a boxed trait object
    fn clone_box(&self) -> Box<dyn LowLevelClient>;
}

impl Clone for Box<dyn LowLevelClient> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

#[async_trait]
impl LowLevelClient for Box<dyn LowLevelClient> {
    async fn ask_raw(&self, prompt: String) -> Result<String, AIError> {
        self.as_ref().ask_raw(prompt).await
    }

    async fn ask_structured(&self, prompt: String, schema: serde_json::Value) -> Result<String, AIError> {
        self.as_ref().ask_structured(prompt, schema).await
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        self.as_ref().clone_box()
    }
}

/// Append JSON schema guidance to a prompt
pub fn add_schema_guidance(prompt: String, schema: &serde_json::Value) -> String {
    let schema_json = serde_json::to_string_pretty(schema)
        .unwrap_or_else(|_| "Schema serialization failed".to_string());

    format!(
        "{}\n\n## Response Format\nRespond with valid JSON matching this schema:\n```json\n{}\n```",
        prompt, schema_json
    )
}

/// JSON schema for `T` as a plain value.
pub fn schema_value<T: JsonSchema>() -> serde_json::Value {
    serde_json::to_value(schema_for!(T)).unwrap_or(serde_json::Value::Null)
}

#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Upper bound on a single model call. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { timeout: Some(crate::config::DEFAULT_GENERATION_TIMEOUT) }
    }
}

/// Query resolver that wraps a LowLevelClient. No retries: a failed or
/// timed-out call is reported once and left to the caller.
#[derive(Debug, Clone)]
pub struct QueryResolver<C: LowLevelClient> {
    client: C,
    config: QueryConfig,
}

impl<C: LowLevelClient> QueryResolver<C> {
    pub fn new(client: C, config: QueryConfig) -> Self {
        debug!(timeout = ?config.timeout, "Creating new QueryResolver");
        Self { client, config }
    }

    /// Free-form text answer, trimmed.
    #[instrument(target = "flag_quiz::resolver", skip(self, prompt), fields(prompt_len = prompt.len()))]
    pub async fn ask_text(&self, prompt: String) -> Result<String, QueryResolverError> {
        let raw = self.bounded(self.client.ask_raw(prompt)).await?;
        debug!(response_len = raw.len(), "Received text response");
        Ok(raw.trim().to_string())
    }

    /// Schema-bound answer. The schema for `T` is handed to the client and the
    /// response is deserialized into `T`; a response missing a required field is
    /// an error, never a partial value.
    #[instrument(target = "flag_quiz::resolver", skip(self, prompt), fields(prompt_len = prompt.len()))]
    pub async fn query<T>(&self, prompt: String) -> Result<T, QueryResolverError>
    where
        T: DeserializeOwned + JsonSchema + Send,
    {
        let schema = schema_value::<T>();
        let raw = self.bounded(self.client.ask_structured(prompt, schema)).await?;
        info!(response_len = raw.len(), "Received structured response");
        parse_structured::<T>(&raw)
    }

    async fn bounded<F>(&self, call: F) -> Result<String, AIError>
    where
        F: Future<Output = Result<String, AIError>>,
    {
        match self.config.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(timeout = ?limit, "Model call timed out");
                    Err(AIError::Timeout(limit))
                }
            },
            None => call.await,
        }
    }
}

/// Deserialize the first JSON structure in `raw` that matches `T`. When none
/// matches, the error of the outermost structure is reported so the caller can
/// see which field was missing or malformed.
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> Result<T, QueryResolverError> {
    if let Some(value) = extract_first::<T>(raw) {
        return Ok(value);
    }

    let first_root = find_json_structures(raw).into_iter().next();
    match first_root {
        Some(node) => {
            let candidate = &raw[node.start..=node.end];
            match serde_json::from_str::<T>(candidate) {
                Err(e) => {
                    warn!(error = %e, "Structured response failed validation");
                    Err(QueryResolverError::JsonDeserialization(e, raw.to_string()))
                }
                // extract_first already tried this node; unreachable in practice
                Ok(value) => Ok(value),
            }
        }
        None => {
            warn!(response_len = raw.len(), "No JSON structure in structured response");
            Err(QueryResolverError::NoData(raw.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::mock::{MockClient, MockResponse};
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema, PartialEq)]
    struct Capital {
        country: String,
        city: String,
    }

    #[test]
    fn parse_structured_reports_missing_field() {
        let err = parse_structured::<Capital>(r#"{"country":"Japan"}"#).unwrap_err();
        match err {
            QueryResolverError::JsonDeserialization(e, raw) => {
                assert!(e.to_string().contains("city"), "unexpected error: {}", e);
                assert!(raw.contains("Japan"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn parse_structured_without_json() {
        assert!(matches!(
            parse_structured::<Capital>("I don't know."),
            Err(QueryResolverError::NoData(_))
        ));
    }

    #[test]
    fn schema_guidance_is_appended() {
        let guided = add_schema_guidance("Tell me".to_string(), &schema_value::<Capital>());
        assert!(guided.starts_with("Tell me"));
        assert!(guided.contains("\"city\""));
    }

    #[tokio::test]
    async fn query_parses_fenced_json() {
        let (client, handle) = MockClient::new();
        handle.add_response(MockResponse::Success(
            "Sure!\n```json\n{\"country\": \"Japan\", \"city\": \"Tokyo\"}\n```".to_string(),
        ));
        let resolver = QueryResolver::new(client, QueryConfig::default());

        let capital: Capital = resolver.query("capital of Japan".to_string()).await.unwrap();
        assert_eq!(capital, Capital { country: "Japan".into(), city: "Tokyo".into() });
        assert!(handle.prompts()[0].contains("Response Format"));
    }

    #[tokio::test]
    async fn slow_model_times_out() {
        let (client, handle) = MockClient::new();
        handle.add_response(MockResponse::Delayed(Duration::from_millis(500), "late".to_string()));
        let resolver = QueryResolver::new(client, QueryConfig { timeout: Some(Duration::from_millis(20)) });

        let err = resolver.ask_text("hello".to_string()).await.unwrap_err();
        assert!(matches!(err, QueryResolverError::Ai(AIError::Timeout(_))));
    }
}
