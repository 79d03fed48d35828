#[cfg(feature = "deepseek")]
pub mod deepseek;
pub mod flexible;
#[cfg(feature = "gemini")]
pub mod gemini;
pub mod mock;

#[cfg(feature = "deepseek")]
pub use deepseek::{DeepSeekClient, DeepSeekConfig, DeepSeekModel};
pub use flexible::{ClientType, FlexibleClient, Workload};
#[cfg(feature = "gemini")]
pub use gemini::{GeminiClient, GeminiConfig, GeminiModel};
pub use mock::{MockClient, MockHandle, MockResponse};
