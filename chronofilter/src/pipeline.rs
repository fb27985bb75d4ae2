use crate::types::{AnnotatedPost, FilterState, Sentiment, BOT_PROBABILITY_CUTOFF};
use std::cmp::Ordering;
use tracing::debug;

/// Produces the ordered subset of `posts` to display.
///
/// Steps run in a fixed order: credibility threshold, bot filter, blocked
/// sources, ranking (preferred first, then credibility descending, stable),
/// and finally the sentiment preference. Inputs are left untouched.
pub fn apply_filters(posts: &[AnnotatedPost], filters: &FilterState) -> Vec<AnnotatedPost> {
    let mut kept: Vec<AnnotatedPost> = posts
        .iter()
        .filter(|post| meets_credibility(post, filters))
        .filter(|post| passes_bot_check(post, filters))
        .filter(|post| !filters.is_blocked(post.author()))
        .cloned()
        .collect();

    kept.sort_by(|a, b| rank(a, b, filters));
    kept.retain(|post| matches_sentiment(post.analysis.sentiment, filters.sentiment_preference()));

    debug!("Filters kept {} of {} posts", kept.len(), posts.len());
    kept
}

fn meets_credibility(post: &AnnotatedPost, filters: &FilterState) -> bool {
    post.analysis.credibility_score >= filters.credibility_threshold()
}

fn passes_bot_check(post: &AnnotatedPost, filters: &FilterState) -> bool {
    !filters.hide_bots() || post.analysis.bot_probability < BOT_PROBABILITY_CUTOFF
}

fn rank(a: &AnnotatedPost, b: &AnnotatedPost, filters: &FilterState) -> Ordering {
    let a_preferred = filters.is_preferred(a.author());
    let b_preferred = filters.is_preferred(b.author());
    b_preferred
        .cmp(&a_preferred)
        .then_with(|| b.analysis.credibility_score.total_cmp(&a.analysis.credibility_score))
}

/// Neutral posts pass under every preference.
pub fn matches_sentiment(sentiment: Sentiment, preference: Sentiment) -> bool {
    match preference {
        Sentiment::Neutral => true,
        wanted => sentiment == wanted || sentiment == Sentiment::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Analysis, Author, Post};

    fn post(id: &str, author: &str, sentiment: Sentiment, credibility: f64, bot: f64) -> AnnotatedPost {
        AnnotatedPost {
            post: Post {
                id: id.to_string(),
                content: format!("post {id}"),
                author: Author {
                    username: author.to_string(),
                    display_name: author.to_uppercase(),
                    avatar_url: String::new(),
                    verified: false,
                },
                timestamp: "1h".to_string(),
                like_count: 0,
                retweet_count: 0,
                reply_count: 0,
            },
            analysis: Analysis::clamped(sentiment, credibility, bot),
        }
    }

    fn ids(posts: &[AnnotatedPost]) -> Vec<&str> {
        posts.iter().map(|p| p.post.id.as_str()).collect()
    }

    fn open_filters() -> FilterState {
        FilterState::default()
            .with_credibility_threshold(0.0)
            .with_hide_bots(false)
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(apply_filters(&[], &FilterState::default()).is_empty());
        assert!(apply_filters(&[], &open_filters()).is_empty());
    }

    #[test]
    fn threshold_is_inclusive() {
        let posts = vec![
            post("1", "a", Sentiment::Neutral, 0.5, 0.0),
            post("2", "b", Sentiment::Neutral, 0.49, 0.0),
        ];
        assert_eq!(ids(&apply_filters(&posts, &FilterState::default())), vec!["1"]);
    }

    #[test]
    fn threshold_extremes() {
        let posts = vec![
            post("1", "a", Sentiment::Neutral, 0.0, 0.0),
            post("2", "b", Sentiment::Neutral, 1.0, 0.0),
        ];
        assert_eq!(apply_filters(&posts, &open_filters()).len(), 2);
        let strict = open_filters().with_credibility_threshold(1.0);
        assert_eq!(ids(&apply_filters(&posts, &strict)), vec!["2"]);
    }

    #[test]
    fn hide_bots_uses_strict_cutoff() {
        let posts = vec![
            post("1", "a", Sentiment::Neutral, 0.8, 0.69),
            post("2", "b", Sentiment::Neutral, 0.8, 0.7),
        ];
        let filters = open_filters().with_hide_bots(true);
        assert_eq!(ids(&apply_filters(&posts, &filters)), vec!["1"]);
        assert_eq!(apply_filters(&posts, &open_filters()).len(), 2);
    }

    #[test]
    fn blocked_authors_are_removed() {
        let posts = vec![
            post("1", "a", Sentiment::Neutral, 0.8, 0.0),
            post("2", "b", Sentiment::Neutral, 0.9, 0.0),
        ];
        let mut filters = open_filters();
        filters.block("b");
        assert_eq!(ids(&apply_filters(&posts, &filters)), vec!["1"]);
    }

    #[test]
    fn preferred_first_then_credibility() {
        let posts = vec![
            post("1", "a", Sentiment::Neutral, 0.9, 0.0),
            post("2", "b", Sentiment::Neutral, 0.2, 0.0),
            post("3", "c", Sentiment::Neutral, 0.6, 0.0),
            post("4", "b", Sentiment::Neutral, 0.4, 0.0),
        ];
        let mut filters = open_filters();
        filters.prefer("b");
        assert_eq!(ids(&apply_filters(&posts, &filters)), vec!["4", "2", "1", "3"]);
    }

    #[test]
    fn equal_rank_keeps_input_order() {
        let posts = vec![
            post("1", "a", Sentiment::Neutral, 0.7, 0.0),
            post("2", "b", Sentiment::Neutral, 0.7, 0.0),
            post("3", "c", Sentiment::Neutral, 0.7, 0.0),
        ];
        assert_eq!(ids(&apply_filters(&posts, &open_filters())), vec!["1", "2", "3"]);
    }

    #[test]
    fn neutral_always_passes_sentiment_filter() {
        let posts = vec![
            post("1", "a", Sentiment::Positive, 0.9, 0.0),
            post("2", "b", Sentiment::Neutral, 0.8, 0.0),
            post("3", "c", Sentiment::Negative, 0.7, 0.0),
        ];
        let positive = open_filters().with_sentiment_preference(Sentiment::Positive);
        assert_eq!(ids(&apply_filters(&posts, &positive)), vec!["1", "2"]);

        let negative = open_filters().with_sentiment_preference(Sentiment::Negative);
        assert_eq!(ids(&apply_filters(&posts, &negative)), vec!["2", "3"]);

        assert_eq!(apply_filters(&posts, &open_filters()).len(), 3);
    }

    #[test]
    fn filtering_is_idempotent() {
        let posts = vec![
            post("1", "a", Sentiment::Positive, 0.55, 0.1),
            post("2", "b", Sentiment::Negative, 0.95, 0.8),
            post("3", "c", Sentiment::Neutral, 0.75, 0.3),
            post("4", "d", Sentiment::Positive, 0.75, 0.0),
            post("5", "a", Sentiment::Negative, 0.65, 0.0),
        ];
        let mut filters = FilterState::default().with_sentiment_preference(Sentiment::Positive);
        filters.prefer("a");
        filters.block("d");

        let once = apply_filters(&posts, &filters);
        let twice = apply_filters(&once, &filters);
        assert_eq!(once, twice);
        assert_eq!(ids(&once), vec!["1", "3"]);
    }

    #[test]
    fn inputs_are_not_mutated() {
        let posts = vec![
            post("1", "a", Sentiment::Neutral, 0.6, 0.0),
            post("2", "b", Sentiment::Neutral, 0.9, 0.0),
        ];
        let before = posts.clone();
        let filters = open_filters();
        let _ = apply_filters(&posts, &filters);
        assert_eq!(posts, before);
        assert_eq!(filters, open_filters());
    }
}
