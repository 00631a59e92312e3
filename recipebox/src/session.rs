//! Owner identity
//!
//! The sync core never looks up the signed-in user on its own. Callers ask
//! their [`SessionProvider`] for the owner once and pass the resulting
//! [`OwnerId`] into every service call.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, RwLock};

/// Stable identifier of the authenticated owner of a collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(String);

impl OwnerId {
    /// A blank id means nobody is signed in
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(AppError::NoSession);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of the currently authenticated owner
pub trait SessionProvider: Send + Sync {
    fn current_owner(&self) -> Option<OwnerId>;
}

/// Resolve the current owner or fail with `NoSession`
pub fn require_owner(provider: &dyn SessionProvider) -> Result<OwnerId> {
    provider.current_owner().ok_or(AppError::NoSession)
}

/// Session holder for callers that manage sign-in themselves
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    owner: Arc<RwLock<Option<OwnerId>>>,
}

impl StaticSession {
    pub fn signed_in(owner: OwnerId) -> Self {
        Self {
            owner: Arc::new(RwLock::new(Some(owner))),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, owner: OwnerId) {
        if let Ok(mut slot) = self.owner.write() {
            *slot = Some(owner);
        }
    }

    pub fn sign_out(&self) {
        if let Ok(mut slot) = self.owner.write() {
            *slot = None;
        }
    }
}

impl SessionProvider for StaticSession {
    fn current_owner(&self) -> Option<OwnerId> {
        self.owner.read().ok().and_then(|slot| slot.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_owner_is_no_session() {
        assert!(matches!(OwnerId::new(""), Err(AppError::NoSession)));
        assert!(matches!(OwnerId::new("  "), Err(AppError::NoSession)));
        assert_eq!(OwnerId::new("uid-1").unwrap().as_str(), "uid-1");
    }

    #[test]
    fn test_require_owner_follows_session() {
        let session = StaticSession::signed_out();
        assert!(matches!(require_owner(&session), Err(AppError::NoSession)));

        session.sign_in(OwnerId::new("uid-1").unwrap());
        assert_eq!(require_owner(&session).unwrap().to_string(), "uid-1");

        session.sign_out();
        assert!(require_owner(&session).is_err());
    }
}
