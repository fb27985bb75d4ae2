use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// Posts at or above this bot probability are hidden when `hide_bots` is set.
pub const BOT_PROBABILITY_CUTOFF: f64 = 0.7;

pub const DEFAULT_CREDIBILITY_THRESHOLD: f64 = 0.5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(Sentiment::Positive),
            "neutral" => Ok(Sentiment::Neutral),
            "negative" => Ok(Sentiment::Negative),
            other => Err(anyhow!("unknown sentiment: {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub username: String,
    #[serde(alias = "name")]
    pub display_name: String,
    #[serde(default, alias = "avatar")]
    pub avatar_url: String,
    #[serde(default)]
    pub verified: bool,
}

/// A single message as loaded from the feed. Never modified after load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub content: String,
    pub author: Author,
    /// Display string from the source, e.g. `"2h"`.
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, alias = "likes")]
    pub like_count: u64,
    #[serde(default, alias = "retweets")]
    pub retweet_count: u64,
    #[serde(default, alias = "replies")]
    pub reply_count: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub sentiment: Sentiment,
    pub credibility_score: f64,
    pub bot_probability: f64,
}

impl Analysis {
    /// Builds an analysis with both scores forced into `[0, 1]`.
    pub fn clamped(sentiment: Sentiment, credibility_score: f64, bot_probability: f64) -> Self {
        Self {
            sentiment,
            credibility_score: credibility_score.clamp(0.0, 1.0),
            bot_probability: bot_probability.clamp(0.0, 1.0),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedPost {
    #[serde(flatten)]
    pub post: Post,
    pub analysis: Analysis,
}

impl AnnotatedPost {
    pub fn author(&self) -> &str {
        &self.post.author.username
    }
}

/// User-controlled view settings.
///
/// Fields are private so that the threshold stays inside `[0, 1]` and a
/// username is never both blocked and preferred.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterState {
    sentiment_preference: Sentiment,
    credibility_threshold: f64,
    hide_bots: bool,
    blocked_sources: BTreeSet<String>,
    preferred_sources: BTreeSet<String>,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            sentiment_preference: Sentiment::Neutral,
            credibility_threshold: DEFAULT_CREDIBILITY_THRESHOLD,
            hide_bots: true,
            blocked_sources: BTreeSet::new(),
            preferred_sources: BTreeSet::new(),
        }
    }
}

impl FilterState {
    pub fn sentiment_preference(&self) -> Sentiment {
        self.sentiment_preference
    }

    pub fn credibility_threshold(&self) -> f64 {
        self.credibility_threshold
    }

    pub fn hide_bots(&self) -> bool {
        self.hide_bots
    }

    pub fn blocked_sources(&self) -> &BTreeSet<String> {
        &self.blocked_sources
    }

    pub fn preferred_sources(&self) -> &BTreeSet<String> {
        &self.preferred_sources
    }

    pub fn is_blocked(&self, username: &str) -> bool {
        self.blocked_sources.contains(username)
    }

    pub fn is_preferred(&self, username: &str) -> bool {
        self.preferred_sources.contains(username)
    }

    pub fn set_sentiment_preference(&mut self, sentiment: Sentiment) {
        self.sentiment_preference = sentiment;
    }

    /// Clamps into `[0, 1]`. NaN resets to the default threshold.
    pub fn set_credibility_threshold(&mut self, threshold: f64) {
        self.credibility_threshold = if threshold.is_nan() {
            DEFAULT_CREDIBILITY_THRESHOLD
        } else {
            threshold.clamp(0.0, 1.0)
        };
    }

    pub fn set_hide_bots(&mut self, hide_bots: bool) {
        self.hide_bots = hide_bots;
    }

    pub fn with_sentiment_preference(mut self, sentiment: Sentiment) -> Self {
        self.set_sentiment_preference(sentiment);
        self
    }

    pub fn with_credibility_threshold(mut self, threshold: f64) -> Self {
        self.set_credibility_threshold(threshold);
        self
    }

    pub fn with_hide_bots(mut self, hide_bots: bool) -> Self {
        self.set_hide_bots(hide_bots);
        self
    }

    pub fn block(&mut self, username: &str) {
        self.preferred_sources.remove(username);
        self.blocked_sources.insert(username.to_owned());
    }

    pub fn unblock(&mut self, username: &str) {
        self.blocked_sources.remove(username);
    }

    pub fn prefer(&mut self, username: &str) {
        self.blocked_sources.remove(username);
        self.preferred_sources.insert(username.to_owned());
    }

    pub fn unprefer(&mut self, username: &str) {
        self.preferred_sources.remove(username);
    }
}

/// FilterState as it is written to a preference store: sets become sorted arrays.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredPreferences {
    pub sentiment_preference: Sentiment,
    pub credibility_threshold: f64,
    pub hide_bots: bool,
    pub blocked_sources: Vec<String>,
    pub preferred_sources: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<&FilterState> for StoredPreferences {
    fn from(filters: &FilterState) -> Self {
        Self {
            sentiment_preference: filters.sentiment_preference,
            credibility_threshold: filters.credibility_threshold,
            hide_bots: filters.hide_bots,
            blocked_sources: filters.blocked_sources.iter().cloned().collect(),
            preferred_sources: filters.preferred_sources.iter().cloned().collect(),
            updated_at: Utc::now(),
        }
    }
}

impl From<StoredPreferences> for FilterState {
    /// Prefers are replayed before blocks, so a name stored in both lists ends up blocked.
    fn from(stored: StoredPreferences) -> Self {
        let mut filters = FilterState::default()
            .with_sentiment_preference(stored.sentiment_preference)
            .with_credibility_threshold(stored.credibility_threshold)
            .with_hide_bots(stored.hide_bots);
        for username in &stored.preferred_sources {
            filters.prefer(username);
        }
        for username in &stored.blocked_sources {
            filters.block(username);
        }
        filters
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_key: String,
    pub username: String,
    pub display_name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionAction {
    BlockSource,
    UnblockSource,
    PreferSource,
    UnpreferSource,
}

impl InteractionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionAction::BlockSource => "block_source",
            InteractionAction::UnblockSource => "unblock_source",
            InteractionAction::PreferSource => "prefer_source",
            InteractionAction::UnpreferSource => "unprefer_source",
        }
    }
}

impl fmt::Display for InteractionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "block_source" => Ok(InteractionAction::BlockSource),
            "unblock_source" => Ok(InteractionAction::UnblockSource),
            "prefer_source" => Ok(InteractionAction::PreferSource),
            "unprefer_source" => Ok(InteractionAction::UnpreferSource),
            other => Err(anyhow!("unknown interaction action: {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: Uuid,
    pub user_key: String,
    pub target: String,
    pub action: InteractionAction,
    pub created_at: DateTime<Utc>,
}

impl Interaction {
    pub fn new(user_key: &str, target: &str, action: InteractionAction) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_key: user_key.to_owned(),
            target: target.to_owned(),
            action,
            created_at: Utc::now(),
        }
    }
}

// Collaborators are injected as `Arc<dyn ...>`; nothing here is a process-wide
// singleton. Callers treat every error as "not persisted this time".

#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn load(&self, user_key: &str) -> Result<Option<StoredPreferences>>;
    async fn save(&self, user_key: &str, preferences: &StoredPreferences) -> Result<()>;
}

#[async_trait]
pub trait InteractionLog: Send + Sync {
    async fn record(&self, interaction: Interaction) -> Result<()>;
    /// Newest first.
    async fn recent(&self, user_key: &str, limit: usize) -> Result<Vec<Interaction>>;
}

#[async_trait]
pub trait Identity: Send + Sync {
    async fn current_user(&self) -> Option<User>;
    async fn sign_out(&self);
}
