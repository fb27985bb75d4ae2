use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use anyhow::Result;
use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::Row;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tokio::sync::RwLock;
use tracing::debug;
use tracing::info;
use uuid::Uuid;

use crate::defs::Interaction;
use crate::defs::InteractionLog;
use crate::defs::PreferenceStore;
use crate::defs::StoredPreferences;

/// Preferences and interaction history kept in a SQLite database.
pub struct SqliteStateStore {
    pool: SqlitePool,
}

impl SqliteStateStore {
    /// Connects and creates the tables if they are missing.
    ///
    /// `sqlite::memory:` gets a single connection, since every new connection
    /// to an in-memory database starts empty.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let in_memory = database_url.contains(":memory:");
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 4 })
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect(database_url)
            .await
            .with_context(|| format!("failed to open database {database_url}"))?;
        let store = Self { pool };
        store.setup_schema().await?;
        info!("Opened state store at {}", database_url);
        Ok(store)
    }

    pub async fn setup_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS preferences (
                user_key TEXT PRIMARY KEY,
                sentiment_preference TEXT NOT NULL,
                credibility_threshold REAL NOT NULL,
                hide_bots INTEGER NOT NULL,
                blocked_sources TEXT NOT NULL,
                preferred_sources TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS interactions (
                id TEXT PRIMARY KEY,
                user_key TEXT NOT NULL,
                target TEXT NOT NULL,
                action TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS interactions_user_key ON interactions (user_key, created_at)")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PreferenceStore for SqliteStateStore {
    async fn load(&self, user_key: &str) -> Result<Option<StoredPreferences>> {
        let row = sqlx::query(
            r#"
            SELECT sentiment_preference, credibility_threshold, hide_bots,
                   blocked_sources, preferred_sources, updated_at
            FROM preferences
            WHERE user_key = ?1
            "#,
        )
        .bind(user_key)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            debug!("No stored preferences for {}", user_key);
            return Ok(None);
        };

        let sentiment: String = row.try_get("sentiment_preference")?;
        let blocked: String = row.try_get("blocked_sources")?;
        let preferred: String = row.try_get("preferred_sources")?;
        Ok(Some(StoredPreferences {
            sentiment_preference: sentiment.parse()?,
            credibility_threshold: row.try_get("credibility_threshold")?,
            hide_bots: row.try_get("hide_bots")?,
            blocked_sources: serde_json::from_str(&blocked).context("corrupt blocked_sources column")?,
            preferred_sources: serde_json::from_str(&preferred).context("corrupt preferred_sources column")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        }))
    }

    async fn save(&self, user_key: &str, preferences: &StoredPreferences) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO preferences
                (user_key, sentiment_preference, credibility_threshold, hide_bots,
                 blocked_sources, preferred_sources, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT (user_key) DO UPDATE SET
                sentiment_preference = excluded.sentiment_preference,
                credibility_threshold = excluded.credibility_threshold,
                hide_bots = excluded.hide_bots,
                blocked_sources = excluded.blocked_sources,
                preferred_sources = excluded.preferred_sources,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_key)
        .bind(preferences.sentiment_preference.as_str())
        .bind(preferences.credibility_threshold)
        .bind(preferences.hide_bots)
        .bind(serde_json::to_string(&preferences.blocked_sources)?)
        .bind(serde_json::to_string(&preferences.preferred_sources)?)
        .bind(preferences.updated_at)
        .execute(&self.pool)
        .await?;
        debug!("Saved preferences for {}", user_key);
        Ok(())
    }
}

#[async_trait]
impl InteractionLog for SqliteStateStore {
    async fn record(&self, interaction: Interaction) -> Result<()> {
        sqlx::query(
            "INSERT INTO interactions (id, user_key, target, action, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(interaction.id.to_string())
        .bind(&interaction.user_key)
        .bind(&interaction.target)
        .bind(interaction.action.as_str())
        .bind(interaction.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent(&self, user_key: &str, limit: usize) -> Result<Vec<Interaction>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_key, target, action, created_at
            FROM interactions
            WHERE user_key = ?1
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2
            "#,
        )
        .bind(user_key)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<Interaction> {
                let id: String = row.try_get("id")?;
                let action: String = row.try_get("action")?;
                Ok(Interaction {
                    id: Uuid::parse_str(&id)?,
                    user_key: row.try_get("user_key")?,
                    target: row.try_get("target")?,
                    action: action.parse()?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }
}

/// In-process store for sessions without a database.
#[derive(Default)]
pub struct MemoryStateStore {
    preferences: RwLock<HashMap<String, StoredPreferences>>,
    interactions: RwLock<Vec<Interaction>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceStore for MemoryStateStore {
    async fn load(&self, user_key: &str) -> Result<Option<StoredPreferences>> {
        Ok(self.preferences.read().await.get(user_key).cloned())
    }

    async fn save(&self, user_key: &str, preferences: &StoredPreferences) -> Result<()> {
        self.preferences
            .write()
            .await
            .insert(user_key.to_owned(), preferences.clone());
        Ok(())
    }
}

#[async_trait]
impl InteractionLog for MemoryStateStore {
    async fn record(&self, interaction: Interaction) -> Result<()> {
        self.interactions.write().await.push(interaction);
        Ok(())
    }

    async fn recent(&self, user_key: &str, limit: usize) -> Result<Vec<Interaction>> {
        let interactions = self.interactions.read().await;
        Ok(interactions
            .iter()
            .rev()
            .filter(|interaction| interaction.user_key == user_key)
            .take(limit)
            .cloned()
            .collect())
    }
}
