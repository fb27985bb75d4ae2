pub mod types;
pub mod config;
pub mod heuristic;
pub mod llm_adapter;
pub mod analyzer;
pub mod pipeline;
pub mod feed;
pub mod session;

pub use types::*;
pub use config::{AppConfig, LlmConfig};
pub use analyzer::{parse_remote_analysis, ContentAnalyzer};
pub use llm_adapter::{LlmAdapter, MockLlmAdapter, OpenAiCompatibleAdapter};
pub use pipeline::apply_filters;
pub use feed::{load_posts, parse_posts};
pub use session::{Collaborators, FeedSession};
