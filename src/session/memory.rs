//! In-memory session provider.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use lru::LruCache;
use serde_json::Value;
use tokio::time::Instant;

use super::{Provider, SessionId};
use crate::error::ReinetError;
use crate::Result;

/// State of one stored session.
#[derive(Debug)]
struct Entry {
    accessed: Instant,
    values: HashMap<String, Value>,
}

impl Entry {
    fn new() -> Self {
        Self {
            accessed: Instant::now(),
            values: HashMap::new(),
        }
    }
}

type Sessions = LruCache<SessionId, Entry>;

/// Sessions held in process memory, ordered by last access.
///
/// A single lock guards the cache, so every operation is fully serialized.
/// The cache is unbounded: sessions leave only through `destroy` or an
/// expiry sweep. Sweeps walk from the least recently accessed end and stop
/// at the first live session, so a sweep costs time proportional to the
/// number of expired sessions.
#[derive(Debug)]
pub struct MemoryProvider {
    sessions: Mutex<Sessions>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(LruCache::unbounded()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Sessions>> {
        self.sessions.lock().map_err(|_| ReinetError::LockPoisoned)
    }

    /// Session identifiers from most to least recently accessed.
    pub fn ids(&self) -> Result<Vec<SessionId>> {
        Ok(self.lock()?.iter().map(|(id, _)| id.clone()).collect())
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Promote the entry to most recent and refresh its access time.
fn touch_entry<'a>(sessions: &'a mut Sessions, id: &SessionId) -> Option<&'a mut Entry> {
    let entry = sessions.get_mut(id)?;
    entry.accessed = Instant::now();
    Some(entry)
}

impl Provider for MemoryProvider {
    fn init(&self, id: &SessionId) -> Result<()> {
        self.lock()?.put(id.clone(), Entry::new());
        Ok(())
    }

    fn read(&self, id: &SessionId) -> Result<bool> {
        let mut sessions = self.lock()?;
        if touch_entry(&mut sessions, id).is_some() {
            return Ok(true);
        }
        sessions.put(id.clone(), Entry::new());
        Ok(false)
    }

    fn destroy(&self, id: &SessionId) -> Result<()> {
        self.lock()?.pop(id);
        Ok(())
    }

    fn gc(&self, max_lifetime: Duration) -> Result<usize> {
        let mut sessions = self.lock()?;
        let now = Instant::now();
        let mut removed = 0;

        while let Some((_, entry)) = sessions.peek_lru() {
            if now.saturating_duration_since(entry.accessed) <= max_lifetime {
                break;
            }
            sessions.pop_lru();
            removed += 1;
        }
        Ok(removed)
    }

    fn touch(&self, id: &SessionId) -> Result<()> {
        let mut sessions = self.lock()?;
        touch_entry(&mut sessions, id);
        Ok(())
    }

    fn contains(&self, id: &SessionId) -> Result<bool> {
        Ok(self.lock()?.contains(id))
    }

    fn get(&self, id: &SessionId, key: &str) -> Result<Option<Value>> {
        let mut sessions = self.lock()?;
        Ok(touch_entry(&mut sessions, id).and_then(|entry| entry.values.get(key).cloned()))
    }

    fn set(&self, id: &SessionId, key: String, value: Value) -> Result<()> {
        let mut sessions = self.lock()?;
        match touch_entry(&mut sessions, id) {
            Some(entry) => {
                entry.values.insert(key, value);
            }
            None => {
                let mut entry = Entry::new();
                entry.values.insert(key, value);
                sessions.put(id.clone(), entry);
            }
        }
        Ok(())
    }

    fn remove(&self, id: &SessionId, key: &str) -> Result<Option<Value>> {
        let mut sessions = self.lock()?;
        Ok(touch_entry(&mut sessions, id).and_then(|entry| entry.values.remove(key)))
    }

    fn count(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }
}
