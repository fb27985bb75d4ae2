use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use crate::defs::Identity;
use crate::defs::User;

/// Identity handed over by the host application: a fixed user that stays
/// signed in until `sign_out`.
#[derive(Default)]
pub struct SessionIdentity {
    user: RwLock<Option<User>>,
}

impl SessionIdentity {
    pub fn signed_in(user: User) -> Self {
        Self {
            user: RwLock::new(Some(user)),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Identity for SessionIdentity {
    async fn current_user(&self) -> Option<User> {
        self.user.read().await.clone()
    }

    async fn sign_out(&self) {
        if let Some(user) = self.user.write().await.take() {
            info!("Signed out {}", user.username);
        }
    }
}
