use crate::types::{ChronoError, Post, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

/// Parses a JSON array of posts. Duplicate ids keep their first occurrence.
pub fn parse_posts(json: &str) -> Result<Vec<Post>> {
    let posts: Vec<Post> = serde_json::from_str(json)?;
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(posts.len());
    for post in posts {
        if post.author.username.trim().is_empty() {
            return Err(ChronoError::InvalidFeed(format!("post {} has no author username", post.id)));
        }
        if seen.insert(post.id.clone()) {
            unique.push(post);
        } else {
            warn!("Skipping duplicate post id {}", post.id);
        }
    }
    Ok(unique)
}

pub async fn load_posts(path: impl AsRef<Path>) -> Result<Vec<Post>> {
    let path = path.as_ref();
    let json = tokio::fs::read_to_string(path).await?;
    let posts = parse_posts(&json)?;
    info!("Loaded {} posts from {}", posts.len(), path.display());
    Ok(posts)
}
