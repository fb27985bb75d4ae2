use async_trait::async_trait;
use chronofilter::{
    apply_filters, load_posts, Author, ChronoError, ContentAnalyzer, FilterState, LlmAdapter,
    MockLlmAdapter, Post, Result, Sentiment,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init();
}

fn post(id: &str, author: &str, content: &str) -> Post {
    Post {
        id: id.to_string(),
        content: content.to_string(),
        author: Author {
            username: author.to_string(),
            display_name: author.to_string(),
            avatar_url: String::new(),
            verified: false,
        },
        timestamp: "now".to_string(),
        like_count: 0,
        retweet_count: 0,
        reply_count: 0,
    }
}

fn scenario_posts() -> Vec<Post> {
    vec![
        post("a", "A", "Amazing news, research shows great results"),
        post("b", "B", "🚀🚀🚀🚀🚀🚀 GUARANTEED MOON Buy NOW"),
    ]
}

#[tokio::test]
async fn test_scenario_scores() -> Result<()> {
    init_tracing();

    let annotated = ContentAnalyzer::heuristic().annotate(scenario_posts()).await;
    let a = &annotated[0].analysis;
    let b = &annotated[1].analysis;
    info!("A: {:?}, B: {:?}", a, b);

    assert_eq!(a.sentiment, Sentiment::Positive);
    assert!(a.credibility_score > 0.5);
    assert!(a.bot_probability < 1e-9);

    assert_eq!(b.sentiment, Sentiment::Neutral);
    assert!(b.bot_probability >= 0.6);
    Ok(())
}

#[tokio::test]
async fn test_scenario_threshold_and_bots() -> Result<()> {
    init_tracing();

    let annotated = ContentAnalyzer::heuristic().annotate(scenario_posts()).await;
    let filters = FilterState::default()
        .with_credibility_threshold(0.6)
        .with_hide_bots(true);

    let visible = apply_filters(&annotated, &filters);
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].post.id, "a");
    Ok(())
}

#[tokio::test]
async fn test_scenario_preferred_source_first() -> Result<()> {
    init_tracing();

    let annotated = ContentAnalyzer::heuristic().annotate(scenario_posts()).await;
    let mut filters = FilterState::default()
        .with_credibility_threshold(0.0)
        .with_hide_bots(false);
    filters.prefer("B");

    let visible = apply_filters(&annotated, &filters);
    assert_eq!(visible.len(), 2);
    assert_eq!(visible[0].author(), "B");
    assert_eq!(visible[1].author(), "A");
    Ok(())
}

/// Replies slower for earlier posts so completion order is reversed.
struct ReversedLatencyAdapter;

#[async_trait]
impl LlmAdapter for ReversedLatencyAdapter {
    fn adapter_name(&self) -> String {
        "reversed-latency".to_string()
    }

    async fn complete(&self, _instruction: &str, content: &str) -> Result<String> {
        let index: u64 = content
            .trim_start_matches("post-")
            .parse()
            .map_err(|_| ChronoError::RemoteAnalysis(format!("unexpected content {content}")))?;
        tokio::time::sleep(Duration::from_millis((5 - index) * 15)).await;
        Ok(format!(
            r#"{{"sentiment":"neutral","credibilityScore":{},"botProbability":0.0}}"#,
            index as f64 / 10.0
        ))
    }
}

#[tokio::test]
async fn test_batch_keeps_input_order() -> Result<()> {
    init_tracing();

    let posts: Vec<Post> = (0..5)
        .map(|i| post(&i.to_string(), "someone", &format!("post-{i}")))
        .collect();
    let analyzer = ContentAnalyzer::with_adapter(Arc::new(ReversedLatencyAdapter));
    let annotated = analyzer.annotate(posts).await;

    for (i, entry) in annotated.iter().enumerate() {
        assert_eq!(entry.post.id, i.to_string());
        assert!((entry.analysis.credibility_score - i as f64 / 10.0).abs() < 1e-9);
    }
    Ok(())
}

#[tokio::test]
async fn test_remote_failure_degrades_to_heuristic() -> Result<()> {
    init_tracing();

    let adapter = Arc::new(MockLlmAdapter::failing("offline", "connection refused").with_delay(5));
    let remote = ContentAnalyzer::with_adapter(adapter.clone());
    let local = ContentAnalyzer::heuristic();

    let from_remote = remote.annotate(scenario_posts()).await;
    let from_local = local.annotate(scenario_posts()).await;
    assert_eq!(from_remote, from_local);
    assert_eq!(adapter.call_count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_sample_feed() -> Result<()> {
    init_tracing();

    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/sample_posts.json");
    let posts = load_posts(path).await?;
    assert_eq!(posts.len(), 8);

    let annotated = ContentAnalyzer::heuristic().annotate(posts).await;
    for entry in &annotated {
        assert!((0.0..=1.0).contains(&entry.analysis.credibility_score));
        assert!((0.0..=1.0).contains(&entry.analysis.bot_probability));
    }

    let pump = annotated.iter().find(|p| p.post.id == "6").unwrap();
    assert!(pump.analysis.bot_probability >= 0.7);

    let visible = apply_filters(&annotated, &FilterState::default());
    info!("{} of {} sample posts visible", visible.len(), annotated.len());
    assert!(visible.iter().all(|p| p.post.id != "6"));
    assert_eq!(apply_filters(&visible, &FilterState::default()), visible);
    Ok(())
}
