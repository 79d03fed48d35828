pub mod analytics;
pub mod clients;
pub mod config;
pub mod core;
pub mod error;
pub mod facts;
pub mod game;
pub mod json_utils;
pub mod quiz;
pub mod store;

// Convenient re-exports
pub use analytics::{AnalyticsEvent, AnalyticsSink};
pub use config::QuizConfig;
pub use core::{LowLevelClient, QueryConfig, QueryResolver};
pub use error::{QuizError, ResolutionError};
pub use facts::{CountryData, CountryExplorer, Fact, FactOrigin, FactResolver, ResolverStats};
pub use game::{FactTicket, QuizGame};
pub use quiz::{Catalog, Prompt, Question, QuizSession};
pub use store::{FactRecord, FactStore};
