//! Acting-user context
//!
//! Every service call takes a `Session` explicitly. Reads made without a
//! user return empty results; writes fail with `Unauthenticated`.

use uuid::Uuid;

use crate::error::{VaultError, VaultResult};

/// The user on whose behalf an operation runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Session {
    user_id: Option<Uuid>,
}

impl Session {
    /// A session with no signed-in user
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    /// A session acting as the given user
    pub fn for_user(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// Get the acting user, or fail for anonymous sessions
    pub fn require_user(&self) -> VaultResult<Uuid> {
        self.user_id.ok_or(VaultError::Unauthenticated)
    }
}
