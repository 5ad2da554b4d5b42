//! Session handle given to handlers.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::{Provider, SessionId};
use crate::Result;

/// Reference to a session held by a provider.
///
/// The handle owns no state itself: every call goes to the provider,
/// which refreshes the session's last-access time.
#[derive(Clone)]
pub struct Session {
    id: SessionId,
    provider: Arc<dyn Provider>,
}

impl Session {
    pub(crate) fn new(id: SessionId, provider: Arc<dyn Provider>) -> Self {
        Self { id, provider }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Typed value for `key`, or `None` if unset.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.provider.get(&self.id, key)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Raw JSON value for `key`.
    pub fn get_value(&self, key: &str) -> Result<Option<Value>> {
        self.provider.get(&self.id, key)
    }

    pub fn set<T: Serialize>(&self, key: impl Into<String>, value: T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.provider.set(&self.id, key.into(), value)
    }

    /// Delete `key`, returning its previous value.
    pub fn remove(&self, key: &str) -> Result<Option<Value>> {
        self.provider.remove(&self.id, key)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("id", &self.id).finish()
    }
}
