//! Session management module.
//!
//! Sessions are identified by an opaque random token carried in a cookie.
//! The [`SessionManager`] issues and reads that cookie and delegates all
//! storage to a [`Provider`]; the default [`MemoryProvider`] keeps
//! sessions in an unbounded LRU cache so expiry sweeps only touch
//! expired entries.

mod handle;
mod id;
mod manager;
mod memory;
mod provider;

pub use handle::Session;
pub use id::SessionId;
pub use manager::{GcTask, SessionConfig, SessionManager, DEFAULT_COOKIE_NAME, DEFAULT_MAX_LIFETIME};
pub use memory::MemoryProvider;
pub use provider::{Provider, ProviderRegistry, DEFAULT_PROVIDER};
