use crate::config::AppConfig;
use crate::heuristic;
use crate::llm_adapter::{LlmAdapter, OpenAiCompatibleAdapter, ANALYSIS_INSTRUCTION};
use crate::types::{Analysis, AnnotatedPost, ChronoError, Post, Result, Sentiment};
use futures::future::join_all;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reply shape expected from the language model. Anything else is rejected.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RemoteAnalysis {
    sentiment: String,
    #[serde(rename = "credibilityScore")]
    credibility_score: f64,
    #[serde(rename = "botProbability")]
    bot_probability: f64,
}

/// Parses a model reply into an [`Analysis`].
///
/// Accepts the JSON bare or inside a markdown code fence. Finite scores
/// outside `[0, 1]` are clamped; an unknown sentiment or a non-finite
/// score is an error.
pub fn parse_remote_analysis(reply: &str) -> Result<Analysis> {
    let text = reply.trim();
    let json_text = if let Some(rest) = text.strip_prefix("```json") {
        rest.strip_suffix("```").unwrap_or(rest).trim()
    } else if let Some(rest) = text.strip_prefix("```") {
        rest.strip_suffix("```").unwrap_or(rest).trim()
    } else {
        text
    };

    let remote: RemoteAnalysis = serde_json::from_str(json_text)?;
    let sentiment: Sentiment = remote
        .sentiment
        .parse()
        .map_err(|e: anyhow::Error| ChronoError::RemoteAnalysis(e.to_string()))?;

    if !remote.credibility_score.is_finite() || !remote.bot_probability.is_finite() {
        return Err(ChronoError::RemoteAnalysis("non-finite score in reply".to_string()));
    }

    let analysis = Analysis::clamped(sentiment, remote.credibility_score, remote.bot_probability);
    if analysis.credibility_score != remote.credibility_score
        || analysis.bot_probability != remote.bot_probability
    {
        debug!(
            "Clamped remote scores credibility={} bot={}",
            remote.credibility_score, remote.bot_probability
        );
    }
    Ok(analysis)
}

/// Scores posts, asking a language model when one is configured and
/// falling back to the keyword heuristic otherwise.
#[derive(Clone, Default)]
pub struct ContentAnalyzer {
    adapter: Option<Arc<dyn LlmAdapter>>,
}

impl ContentAnalyzer {
    pub fn heuristic() -> Self {
        Self { adapter: None }
    }

    pub fn with_adapter(adapter: Arc<dyn LlmAdapter>) -> Self {
        info!("Remote analysis enabled via {}", adapter.adapter_name());
        Self {
            adapter: Some(adapter),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        match &config.llm {
            Some(llm) => Ok(Self::with_adapter(Arc::new(OpenAiCompatibleAdapter::new(llm)?))),
            None => Ok(Self::heuristic()),
        }
    }

    pub fn is_remote(&self) -> bool {
        self.adapter.is_some()
    }

    /// Never fails: any remote problem yields the heuristic result.
    pub async fn analyze(&self, content: &str) -> Analysis {
        let Some(adapter) = &self.adapter else {
            return heuristic::analyze(content);
        };

        match adapter.complete(ANALYSIS_INSTRUCTION, content).await {
            Ok(reply) => match parse_remote_analysis(&reply) {
                Ok(analysis) => analysis,
                Err(e) => {
                    warn!("Unusable reply from {}: {}", adapter.adapter_name(), e);
                    heuristic::analyze(content)
                }
            },
            Err(e) => {
                warn!("Remote analysis via {} failed: {}", adapter.adapter_name(), e);
                heuristic::analyze(content)
            }
        }
    }

    /// Analyzes every post concurrently. Output order matches input order.
    pub async fn annotate(&self, posts: Vec<Post>) -> Vec<AnnotatedPost> {
        info!("Analyzing {} posts", posts.len());
        let analyses = join_all(posts.iter().map(|post| self.analyze(&post.content))).await;
        posts
            .into_iter()
            .zip(analyses)
            .map(|(post, analysis)| AnnotatedPost { post, analysis })
            .collect()
    }
}
