//! Identity provider seam
//!
//! The machine only asks "is there a user, and who?" before starting a
//! persisted download. How that user came to exist is the provider's business.

use crate::types::UserId;
use async_trait::async_trait;
use rand::Rng;
use std::sync::RwLock;

/// Source of the current user's opaque identifier
///
/// # Examples
///
/// ```
/// use vidgrab::identity::{IdentityProvider, StaticIdentity};
///
/// # #[tokio::main]
/// # async fn main() {
/// let identity = StaticIdentity::signed_in("user-42");
/// assert_eq!(identity.current_user().await.unwrap().as_str(), "user-42");
/// # }
/// ```
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The signed-in user, if sign-in has completed
    async fn current_user(&self) -> Option<UserId>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Provider with a fixed answer, mainly for tests and token-based setups
#[derive(Clone, Debug, Default)]
pub struct StaticIdentity {
    user: Option<UserId>,
}

impl StaticIdentity {
    /// Provider that always reports `user`
    pub fn signed_in(user: impl Into<String>) -> Self {
        Self {
            user: Some(UserId::new(user)),
        }
    }

    /// Provider that never has a user
    pub fn signed_out() -> Self {
        Self { user: None }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_user(&self) -> Option<UserId> {
        self.user.clone()
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Anonymous sign-in: no user until [`sign_in`](Self::sign_in) mints one
#[derive(Debug, Default)]
pub struct AnonymousIdentity {
    user: RwLock<Option<UserId>>,
}

impl AnonymousIdentity {
    /// Provider with sign-in still pending
    pub fn new() -> Self {
        Self::default()
    }

    /// Complete sign-in, returning the (possibly already existing) user id
    pub fn sign_in(&self) -> UserId {
        let mut guard = self.user.write().unwrap_or_else(|e| e.into_inner());
        if let Some(user) = guard.as_ref() {
            return user.clone();
        }

        let user = UserId::new(format!("anon-{:016x}", rand::thread_rng().r#gen::<u64>()));
        tracing::info!(user_id = %user, "Anonymous sign-in completed");
        *guard = Some(user.clone());
        user
    }

    /// Forget the current user
    pub fn sign_out(&self) {
        let mut guard = self.user.write().unwrap_or_else(|e| e.into_inner());
        *guard = None;
    }
}

#[async_trait]
impl IdentityProvider for AnonymousIdentity {
    async fn current_user(&self) -> Option<UserId> {
        self.user
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn name(&self) -> &'static str {
        "anonymous"
    }
}
