//! Session storage provider contract and registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use super::{MemoryProvider, SessionId};
use crate::error::ReinetError;
use crate::Result;

/// Name under which the in-memory provider is registered.
pub const DEFAULT_PROVIDER: &str = "default";

/// Backing store for sessions.
///
/// Every operation must behave as if it were serialized with every other
/// operation on the same provider. All value operations (`get`, `set`,
/// `remove`) refresh the session's last-access time as part of the same
/// step.
pub trait Provider: Send + Sync {
    /// Create a fresh, empty session for `id`, replacing any existing one.
    fn init(&self, id: &SessionId) -> Result<()>;

    /// Load the session for `id`, creating an empty one if it is unknown.
    ///
    /// Returns `true` when the session already existed.
    fn read(&self, id: &SessionId) -> Result<bool>;

    /// Remove the session for `id`. Unknown identifiers are ignored.
    fn destroy(&self, id: &SessionId) -> Result<()>;

    /// Remove every session not accessed within `max_lifetime`.
    ///
    /// Returns the number of sessions removed.
    fn gc(&self, max_lifetime: Duration) -> Result<usize>;

    /// Refresh the last-access time of `id`. Unknown identifiers are ignored.
    fn touch(&self, id: &SessionId) -> Result<()>;

    /// Whether a live session exists for `id`. Does not count as an access.
    fn contains(&self, id: &SessionId) -> Result<bool>;

    fn get(&self, id: &SessionId, key: &str) -> Result<Option<Value>>;

    /// Store a value, recreating the session if it has since expired.
    fn set(&self, id: &SessionId, key: String, value: Value) -> Result<()>;

    fn remove(&self, id: &SessionId, key: &str) -> Result<Option<Value>>;

    /// Number of live sessions.
    fn count(&self) -> Result<usize>;
}

/// Named session providers available to a [`SessionManager`].
///
/// [`SessionManager`]: super::SessionManager
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding a fresh in-memory provider under
    /// [`DEFAULT_PROVIDER`].
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(DEFAULT_PROVIDER, Arc::new(MemoryProvider::new()));
        registry
    }

    /// Register a provider, returning the one previously under `name`.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        provider: Arc<dyn Provider>,
    ) -> Option<Arc<dyn Provider>> {
        self.providers.insert(name.into(), provider)
    }

    /// Look up a provider by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Provider>> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| ReinetError::UnknownProvider(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Registered provider names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_registered() {
        let registry = ProviderRegistry::with_defaults();
        assert!(registry.contains(DEFAULT_PROVIDER));
        assert!(registry.get(DEFAULT_PROVIDER).is_ok());
    }

    #[test]
    fn test_unknown_provider() {
        let registry = ProviderRegistry::new();
        let err = registry.get("redis").err().unwrap();
        assert!(matches!(err, ReinetError::UnknownProvider(name) if name == "redis"));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = ProviderRegistry::with_defaults();
        let replacement: Arc<dyn Provider> = Arc::new(MemoryProvider::new());
        let previous = registry.register(DEFAULT_PROVIDER, Arc::clone(&replacement));
        assert!(previous.is_some());

        let current = registry.get(DEFAULT_PROVIDER).unwrap();
        assert!(Arc::ptr_eq(&current, &replacement));
    }

    #[test]
    fn test_names_sorted() {
        let mut registry = ProviderRegistry::with_defaults();
        registry.register("alpha", Arc::new(MemoryProvider::new()));
        assert_eq!(registry.names(), vec!["alpha", "default"]);
    }
}
