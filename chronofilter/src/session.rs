use crate::pipeline::apply_filters;
use crate::types::{
    AnnotatedPost, FilterState, Identity, Interaction, InteractionAction, InteractionLog,
    PreferenceStore, StoredPreferences, User,
};
use interfaces::identity::SessionIdentity;
use interfaces::state::MemoryStateStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// External services a session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub preferences: Arc<dyn PreferenceStore>,
    pub interactions: Arc<dyn InteractionLog>,
    pub identity: Arc<dyn Identity>,
}

impl Collaborators {
    /// Wires one store object in as both the preference store and the interaction log.
    pub fn with_store<S>(store: Arc<S>, identity: Arc<dyn Identity>) -> Self
    where
        S: PreferenceStore + InteractionLog + 'static,
    {
        Self {
            preferences: store.clone(),
            interactions: store,
            identity,
        }
    }

    /// Nothing leaves the process.
    pub fn in_memory(identity: Arc<dyn Identity>) -> Self {
        Self::with_store(Arc::new(MemoryStateStore::new()), identity)
    }

    pub fn anonymous() -> Self {
        Self::in_memory(Arc::new(SessionIdentity::anonymous()))
    }
}

/// The annotated feed plus the current filters, with the visible subset
/// recomputed after every change.
///
/// Persistence failures are logged and the session carries on in memory.
/// If the stored filters could not be read, nothing is written back for the
/// rest of the session so the stored copy is never replaced by defaults.
pub struct FeedSession {
    posts: Vec<AnnotatedPost>,
    filters: FilterState,
    visible: Vec<AnnotatedPost>,
    user: Option<User>,
    persist_enabled: bool,
    collaborators: Collaborators,
}

impl FeedSession {
    /// Loads the signed-in user's stored filters, or the defaults.
    pub async fn open(posts: Vec<AnnotatedPost>, collaborators: Collaborators) -> Self {
        let user = collaborators.identity.current_user().await;
        let mut persist_enabled = true;
        let filters = match &user {
            Some(user) => match collaborators.preferences.load(&user.user_key).await {
                Ok(Some(stored)) => {
                    debug!("Loaded preferences for {}", user.user_key);
                    FilterState::from(stored)
                }
                Ok(None) => FilterState::default(),
                Err(e) => {
                    warn!("Failed to load preferences for {}: {}", user.user_key, e);
                    persist_enabled = false;
                    FilterState::default()
                }
            },
            None => FilterState::default(),
        };

        let mut session = Self {
            posts,
            filters,
            visible: Vec::new(),
            user,
            persist_enabled,
            collaborators,
        };
        session.refresh();
        info!(
            "Opened feed session: {} of {} posts visible",
            session.visible.len(),
            session.posts.len()
        );
        session
    }

    pub fn posts(&self) -> &[AnnotatedPost] {
        &self.posts
    }

    pub fn visible(&self) -> &[AnnotatedPost] {
        &self.visible
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn total_count(&self) -> usize {
        self.posts.len()
    }

    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }

    pub async fn block(&mut self, username: &str) {
        self.filters.block(username);
        self.after_source_change(username, InteractionAction::BlockSource).await;
    }

    pub async fn unblock(&mut self, username: &str) {
        self.filters.unblock(username);
        self.after_source_change(username, InteractionAction::UnblockSource).await;
    }

    pub async fn prefer(&mut self, username: &str) {
        self.filters.prefer(username);
        self.after_source_change(username, InteractionAction::PreferSource).await;
    }

    pub async fn unprefer(&mut self, username: &str) {
        self.filters.unprefer(username);
        self.after_source_change(username, InteractionAction::UnpreferSource).await;
    }

    /// Replaces all filters at once, e.g. from a settings panel.
    pub async fn update_filters(&mut self, filters: FilterState) {
        self.filters = filters;
        self.refresh();
        self.persist().await;
    }

    /// Signs out and drops back to default filters.
    pub async fn sign_out(&mut self) {
        self.collaborators.identity.sign_out().await;
        self.user = None;
        self.filters = FilterState::default();
        self.refresh();
    }

    /// Newest first; empty when signed out or when the log is unavailable.
    pub async fn recent_interactions(&self, limit: usize) -> Vec<Interaction> {
        let Some(user) = &self.user else {
            return Vec::new();
        };
        match self.collaborators.interactions.recent(&user.user_key, limit).await {
            Ok(interactions) => interactions,
            Err(e) => {
                warn!("Failed to read interactions for {}: {}", user.user_key, e);
                Vec::new()
            }
        }
    }

    async fn after_source_change(&mut self, username: &str, action: InteractionAction) {
        debug!("{} {}", action, username);
        self.refresh();
        self.persist().await;
        self.record(username, action).await;
    }

    fn refresh(&mut self) {
        self.visible = apply_filters(&self.posts, &self.filters);
    }

    async fn persist(&self) {
        let Some(user) = &self.user else {
            return;
        };
        if !self.persist_enabled {
            warn!(
                "Preferences for {} not saved: stored preferences could not be loaded this session",
                user.user_key
            );
            return;
        }
        let stored = StoredPreferences::from(&self.filters);
        if let Err(e) = self.collaborators.preferences.save(&user.user_key, &stored).await {
            warn!("Preferences for {} not persisted: {}", user.user_key, e);
        }
    }

    async fn record(&self, target: &str, action: InteractionAction) {
        let Some(user) = &self.user else {
            return;
        };
        let interaction = Interaction::new(&user.user_key, target, action);
        if let Err(e) = self.collaborators.interactions.record(interaction).await {
            warn!("Failed to record {} for {}: {}", action, user.user_key, e);
        }
    }
}
