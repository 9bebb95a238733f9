use std::sync::{Arc, OnceLock};

use thiserror::Error;

use crate::identity::VerifiedIdentity;

/// Errors raised by [`IdentityContext`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The identity slot of this request was already filled.
    #[error("identity already set for subject '{existing}'")]
    AlreadySet { existing: String },
}

/// `IdentityContext` carries the verified identity (or its absence) through one request.
///
/// A fresh context is created by the authorization gate for every request and inserted
/// into the request extensions. The slot is write-once: the gate fills it at most once,
/// handlers only read it. Clones share the same slot, so a clone taken by an extractor
/// observes what the gate stored.
#[derive(Debug, Clone, Default)]
pub struct IdentityContext {
    slot: Arc<OnceLock<VerifiedIdentity>>,
}

impl IdentityContext {
    /// Create an empty context (Open routes, or Soft routes without a usable token).
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Create a context that already holds `identity`.
    #[must_use]
    pub fn authenticated(identity: VerifiedIdentity) -> Self {
        Self {
            slot: Arc::new(OnceLock::from(identity)),
        }
    }

    /// Store the verified identity for the rest of the request.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::AlreadySet`] if an identity was stored before; the
    /// original identity is kept.
    pub fn set(&self, identity: VerifiedIdentity) -> Result<(), IdentityError> {
        self.slot.set(identity).map_err(|_| IdentityError::AlreadySet {
            existing: self
                .slot
                .get()
                .map(|current| current.subject().to_owned())
                .unwrap_or_default(),
        })
    }

    /// Get the verified identity, if the gate stored one.
    #[must_use]
    pub fn get(&self) -> Option<&VerifiedIdentity> {
        self.slot.get()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.slot.get().is_some()
    }

    /// Shortcut for the subject of the stored identity.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.slot.get().map(VerifiedIdentity::subject)
    }
}
