//! Offline keyword scoring.
//!
//! Every list is matched by substring presence: a phrase counts once no
//! matter how often it occurs.

use crate::types::{Analysis, Sentiment};

const POSITIVE_WORDS: &[&str] = &[
    "amazing", "excited", "beautiful", "love", "great", "awesome", "fantastic", "wonderful",
    "happy", "joy",
];

const NEGATIVE_WORDS: &[&str] = &[
    "terrible", "awful", "hate", "worst", "broken", "failed", "disappointed", "angry",
    "frustrated", "dead",
];

/// Matched case-sensitively against the raw text.
const BOT_MARKERS: &[&str] = &[
    "URGENT",
    "BREAKING",
    "🚨",
    "Don't miss out",
    "GUARANTEED",
    "ONCE IN A LIFETIME",
    "Buy NOW",
    "Follow me for more",
    "Not financial advice but",
    "🚀🚀🚀",
    "💰💰💰",
];

const CREDIBLE_PHRASES: &[&str] = &[
    "research shows",
    "study reveals",
    "according to",
    "data suggests",
    "evidence indicates",
    "analysis shows",
];

const DUBIOUS_PHRASES: &[&str] = &[
    "GUARANTEED",
    "EXPLOSIVE",
    "MOON",
    "10000x",
    "secret method",
    "they don't want you to know",
];

const HYPE_WORDS: &[&str] = &["revolutionary", "game-changer"];

const MARKER_WEIGHT: f64 = 0.2;
const EMOJI_LIMIT: usize = 5;
const CAPS_RATIO_LIMIT: f64 = 0.3;

const BASE_CREDIBILITY: f64 = 0.5;
const CREDIBLE_BONUS: f64 = 0.1;
const DUBIOUS_PENALTY: f64 = 0.2;
const HYPE_PENALTY: f64 = 0.1;
const WORD_COUNT_BONUS_OVER: usize = 20;

/// Scores `content` without any network access.
pub fn analyze(content: &str) -> Analysis {
    let lower = content.to_lowercase();
    Analysis::clamped(
        sentiment(&lower),
        credibility_score(content, &lower),
        bot_probability(content),
    )
}

fn count_present(text: &str, phrases: &[&str]) -> usize {
    phrases.iter().filter(|phrase| text.contains(*phrase)).count()
}

fn count_present_ignore_case(lower: &str, phrases: &[&str]) -> usize {
    phrases
        .iter()
        .filter(|phrase| lower.contains(phrase.to_lowercase().as_str()))
        .count()
}

/// `lower` must already be lowercased.
pub fn sentiment(lower: &str) -> Sentiment {
    let positive = count_present(lower, POSITIVE_WORDS);
    let negative = count_present(lower, NEGATIVE_WORDS);
    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => Sentiment::Positive,
        std::cmp::Ordering::Less => Sentiment::Negative,
        std::cmp::Ordering::Equal => Sentiment::Neutral,
    }
}

pub fn bot_probability(content: &str) -> f64 {
    let mut score = count_present(content, BOT_MARKERS) as f64 * MARKER_WEIGHT;
    if emoji_count(content) > EMOJI_LIMIT {
        score += MARKER_WEIGHT;
    }
    if caps_ratio(content) > CAPS_RATIO_LIMIT {
        score += MARKER_WEIGHT;
    }
    score.clamp(0.0, 1.0)
}

pub fn credibility_score(content: &str, lower: &str) -> f64 {
    let mut score = BASE_CREDIBILITY;
    score += count_present_ignore_case(lower, CREDIBLE_PHRASES) as f64 * CREDIBLE_BONUS;
    score -= count_present_ignore_case(lower, DUBIOUS_PHRASES) as f64 * DUBIOUS_PENALTY;

    let length = content.chars().count();
    if length > 100 && length < 500 {
        score += CREDIBLE_BONUS;
    }
    if content.split(' ').count() > WORD_COUNT_BONUS_OVER {
        score += CREDIBLE_BONUS;
    }
    if count_present(lower, HYPE_WORDS) > 0 {
        score -= HYPE_PENALTY;
    }
    score.clamp(0.0, 1.0)
}

/// Characters in the common pictograph, transport, flag and symbol blocks.
pub fn is_emoji(c: char) -> bool {
    matches!(
        c as u32,
        0x1F600..=0x1F64F
            | 0x1F300..=0x1F5FF
            | 0x1F680..=0x1F6FF
            | 0x1F1E0..=0x1F1FF
            | 0x2600..=0x26FF
            | 0x2700..=0x27BF
    )
}

pub fn emoji_count(content: &str) -> usize {
    content.chars().filter(|c| is_emoji(*c)).count()
}

/// Uppercase ASCII letters over all characters; 0 for empty text.
pub fn caps_ratio(content: &str) -> f64 {
    let total = content.chars().count();
    if total == 0 {
        return 0.0;
    }
    let upper = content.chars().filter(|c| c.is_ascii_uppercase()).count();
    upper as f64 / total as f64
}
