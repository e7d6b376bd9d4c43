//! Process-wide authentication session
//!
//! [`SessionStore`] holds the signed-in user and the current access token.
//! Clones share the same state. Every mutation is written through to the
//! configured [`Storage`] backend under two fixed keys, and the stored state
//! is read exactly once, when the store is loaded.

use crate::error::CoreResult;
use crate::storage::{MemoryStorage, Storage};
use crate::types::UserProfile;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

/// Storage key holding the serialized user profile
pub const USER_KEY: &str = "user";
/// Storage key holding the raw access token string
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub user: Option<UserProfile>,
    pub access_token: Option<String>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

#[derive(Clone)]
pub struct SessionStore {
    state: Arc<RwLock<Session>>,
    storage: Arc<dyn Storage>,
}

impl SessionStore {
    /// Load the persisted session from `storage`
    ///
    /// Unreadable or unparsable stored state yields an empty session rather
    /// than an error.
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        let session = read_persisted(storage.as_ref());
        debug!(
            authenticated = session.is_authenticated(),
            "Loaded persisted session"
        );
        Self {
            state: Arc::new(RwLock::new(session)),
            storage,
        }
    }

    /// A store that persists nothing beyond the process lifetime
    pub fn in_memory() -> Self {
        Self::load(Arc::new(MemoryStorage::new()))
    }

    pub fn snapshot(&self) -> Session {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.snapshot().user
    }

    /// The current access token, if one is present and non-empty
    pub fn access_token(&self) -> Option<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .access_token
            .clone()
            .filter(|t| !t.is_empty())
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    /// Record a signed-in user and their access token
    pub fn login(&self, user: UserProfile, access_token: impl Into<String>) -> CoreResult<()> {
        let access_token = access_token.into();
        let serialized = serde_json::to_string(&user)?;
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.user = Some(user);
            state.access_token = Some(access_token.clone());
        }

        let user_write = self.storage.set_item(USER_KEY, &serialized);
        let token_write = self.storage.set_item(ACCESS_TOKEN_KEY, &access_token);
        user_write.and(token_write)
    }

    /// Replace the access token, keeping the current user
    pub fn set_access_token(&self, access_token: impl Into<String>) -> CoreResult<()> {
        let access_token = access_token.into();
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .access_token = Some(access_token.clone());
        self.storage.set_item(ACCESS_TOKEN_KEY, &access_token)
    }

    /// Forget the user and token, in memory and in storage
    pub fn logout(&self) -> CoreResult<()> {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Session::default();

        let user_removal = self.storage.remove_item(USER_KEY);
        let token_removal = self.storage.remove_item(ACCESS_TOKEN_KEY);
        user_removal.and(token_removal)
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let session = self.snapshot();
        f.debug_struct("SessionStore")
            .field("user", &session.user.as_ref().map(|u| u.id.as_str()))
            .field("authenticated", &session.is_authenticated())
            .finish()
    }
}

fn read_persisted(storage: &dyn Storage) -> Session {
    let user = match storage.get_item(USER_KEY) {
        Ok(Some(raw)) => match serde_json::from_str::<UserProfile>(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!("Discarding unparsable stored user: {e}");
                return Session::default();
            }
        },
        Ok(None) => None,
        Err(e) => {
            warn!("Failed to read stored user: {e}");
            return Session::default();
        }
    };

    let access_token = match storage.get_item(ACCESS_TOKEN_KEY) {
        Ok(token) => token.filter(|t| !t.is_empty()),
        Err(e) => {
            warn!("Failed to read stored access token: {e}");
            return Session::default();
        }
    };

    Session { user, access_token }
}
