// Core model types live in the interfaces crate
pub use interfaces::defs::{
    Analysis, AnnotatedPost, Author, FilterState, Identity, Interaction, InteractionAction,
    InteractionLog, Post, PreferenceStore, Sentiment, StoredPreferences, User,
    BOT_PROBABILITY_CUTOFF, DEFAULT_CREDIBILITY_THRESHOLD,
};

#[derive(Debug, thiserror::Error)]
pub enum ChronoError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote analysis failed: {0}")]
    RemoteAnalysis(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid feed: {0}")]
    InvalidFeed(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ChronoError>;
