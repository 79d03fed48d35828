use crate::core::LowLevelClient;
use crate::error::{AIError, ConfigError};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "deepseek")]
use super::deepseek::DeepSeekClient;
#[cfg(feature = "gemini")]
use super::gemini::{GeminiClient, GeminiModel};
use super::mock::{MockClient, MockHandle};
#[cfg(any(feature = "gemini", feature = "deepseek"))]
use crate::config::KeyFromEnv;

/// Reply of the offline client when no provider is configured.
pub const OFFLINE_FACT: &str = "No model is configured, so here is a stand-in fact: \
this flag belongs to one of the world's 190-odd sovereign states.";

/// Which provider backs a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientType {
    #[cfg(feature = "gemini")]
    Gemini,
    #[cfg(feature = "deepseek")]
    DeepSeek,
    Mock,
}

/// What the client will be asked for. Selects the model tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workload {
    /// Short quiz facts
    Facts,
    /// Full country profiles
    Explorer,
}

impl ClientType {
    /// Parse client type from string (case insensitive)
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            #[cfg(feature = "gemini")]
            "gemini" => Ok(Self::Gemini),
            #[cfg(feature = "deepseek")]
            "deepseek" => Ok(Self::DeepSeek),
            "mock" => Ok(Self::Mock),
            _ => Err(format!("Unknown client type: '{}'. Supported: {}", s, Self::supported().join(", "))),
        }
    }

    pub fn supported() -> Vec<&'static str> {
        let mut names = Vec::new();
        #[cfg(feature = "gemini")]
        names.push("gemini");
        #[cfg(feature = "deepseek")]
        names.push("deepseek");
        names.push("mock");
        names
    }

    /// Pick a provider from the keys visible through `lookup`, in order of preference.
    #[allow(unused_variables)]
    pub fn detect_with(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        #[cfg(feature = "gemini")]
        {
            if GeminiClient::find_key_with(lookup).is_some() {
                return Self::Gemini;
            }
        }
        #[cfg(feature = "deepseek")]
        {
            if DeepSeekClient::find_key_with(lookup).is_some() {
                return Self::DeepSeek;
            }
        }
        Self::Mock
    }
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "gemini")]
            ClientType::Gemini => write!(f, "Gemini"),
            #[cfg(feature = "deepseek")]
            ClientType::DeepSeek => write!(f, "DeepSeek"),
            ClientType::Mock => write!(f, "Mock"),
        }
    }
}

/// Provider chosen at runtime behind one concrete type.
#[derive(Debug, Clone)]
pub struct FlexibleClient {
    inner: Arc<dyn LowLevelClient>,
}

impl FlexibleClient {
    pub fn new(client: Box<dyn LowLevelClient>) -> Self {
        Self { inner: Arc::from(client) }
    }

    /// Build the client for `client_type`, reading keys from the environment.
    #[allow(unused_variables)]
    pub fn build(client_type: &ClientType, workload: Workload) -> Result<Self, ConfigError> {
        let client: Box<dyn LowLevelClient> = match client_type {
            #[cfg(feature = "gemini")]
            ClientType::Gemini => {
                let model = match workload {
                    Workload::Facts => GeminiModel::Flash,
                    Workload::Explorer => GeminiModel::Pro,
                };
                Box::new(GeminiClient::from_env(model)?)
            }
            #[cfg(feature = "deepseek")]
            ClientType::DeepSeek => Box::new(DeepSeekClient::from_env()?),
            ClientType::Mock => {
                let (mock, handle) = MockClient::new();
                if workload == Workload::Facts {
                    handle.set_fallback(OFFLINE_FACT);
                }
                Box::new(mock)
            }
        };
        Ok(Self::new(client))
    }

    /// Create a FlexibleClient with a mock and return the handle for configuration
    pub fn mock() -> (Self, Arc<MockHandle>) {
        let (mock_client, handle) = MockClient::new();
        (Self::new(Box::new(mock_client)), handle)
    }
}

#[async_trait]
impl LowLevelClient for FlexibleClient {
    async fn ask_raw(&self, prompt: String) -> Result<String, AIError> {
        self.inner.ask_raw(prompt).await
    }

    async fn ask_structured(&self, prompt: String, schema: serde_json::Value) -> Result<String, AIError> {
        self.inner.ask_structured(prompt, schema).await
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_type_parsing() {
        assert_eq!(ClientType::from_str("MOCK"), Ok(ClientType::Mock));
        #[cfg(feature = "gemini")]
        assert_eq!(ClientType::from_str("gemini"), Ok(ClientType::Gemini));
        #[cfg(feature = "deepseek")]
        assert_eq!(ClientType::from_str(" DeepSeek "), Ok(ClientType::DeepSeek));
        assert!(ClientType::from_str("invalid").is_err());
    }

    #[test]
    fn detection_prefers_available_keys() {
        assert_eq!(ClientType::detect_with(&|_: &str| -> Option<String> { None }), ClientType::Mock);
        #[cfg(feature = "gemini")]
        assert_eq!(
            ClientType::detect_with(&|name: &str| (name == "API_KEY").then(|| "k".to_string())),
            ClientType::Gemini
        );
        #[cfg(feature = "deepseek")]
        assert_eq!(
            ClientType::detect_with(&|name: &str| (name == "DEEPSEEK_API_KEY").then(|| "k".to_string())),
            ClientType::DeepSeek
        );
    }

    #[tokio::test]
    async fn offline_facts_client_answers() {
        let client = FlexibleClient::build(&ClientType::Mock, Workload::Facts).unwrap();
        assert_eq!(client.ask_raw("anything".into()).await.unwrap(), OFFLINE_FACT);

        let explorer = FlexibleClient::build(&ClientType::Mock, Workload::Explorer).unwrap();
        assert!(explorer.ask_raw("anything".into()).await.is_err());
    }

    #[tokio::test]
    async fn scripted_mock_behind_flexible_client() {
        let (client, handle) = FlexibleClient::mock();
        handle.add_response(crate::clients::MockResponse::Success("scripted".into()));
        let cloned = client.clone_box();
        assert_eq!(cloned.ask_raw("q".into()).await.unwrap(), "scripted");
        assert_eq!(handle.call_count(), 1);
    }
}
