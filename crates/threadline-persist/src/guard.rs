use serde::{Deserialize, Serialize};

use crate::error::{AuthorizationError, Result};
use crate::models::Thread;
use crate::trait_client::PersistenceClient;

/// Resolved caller, as handed over by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Subject identifier (`sub` claim)
    pub subject: String,
}

impl Identity {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
        }
    }
}

pub fn require_identity(caller: Option<&Identity>) -> Result<&Identity> {
    caller.ok_or_else(|| AuthorizationError::NotAuthenticated.into())
}

/// Resolve `thread_id` on behalf of `caller`.
///
/// A missing thread is reported exactly like a foreign one, so callers cannot
/// probe for thread ids they do not own. Re-checked on every call.
pub async fn check_thread_ownership(
    backend: &dyn PersistenceClient,
    caller: Option<&Identity>,
    thread_id: &str,
) -> Result<Thread> {
    let identity = require_identity(caller)?;

    match backend.get_thread(thread_id).await? {
        Some(thread) if thread.user_id == identity.subject => Ok(thread),
        _ => {
            tracing::debug!(thread_id, subject = %identity.subject, "Ownership check failed");
            Err(AuthorizationError::NotOwner(thread_id.to_string()).into())
        }
    }
}
