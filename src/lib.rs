//! # reinet
//!
//! Minimal HTTP request dispatcher with server-side sessions.
//!
//! Routes are declared as `/`-delimited patterns whose `:name` segments
//! capture path parameters, optionally constrained by a regex sub-pattern
//! such as `:id([0-9]+)`. Handlers are plain functions or closures that
//! optionally take the [`RequestContext`] first, followed by one `String`
//! per captured parameter. Sessions are tracked with an HTTP-only cookie
//! and stored behind a pluggable [`Provider`]; idle sessions are swept on
//! a recurring timer.
//!
//! ## Features
//!
//! - **Pattern routing**: anchored regex matching, first registered route wins
//! - **Typed handler shapes**: resolved once at registration, no per-request reflection
//! - **Before/after hooks**: run around every matched handler
//! - **Sessions**: 256-bit random identifiers, access-ordered expiry
//!
//! ## Quick Start
//!
//! ```no_run
//! use reinet::{App, RequestContext, ServerConfig};
//!
//! fn hello(id: String) -> String {
//!     format!("Hello, {id}")
//! }
//!
//! fn visits(ctx: &mut RequestContext) -> reinet::Result<String> {
//!     let session = ctx.session()?;
//!     let count = session.get::<u64>("visits")?.unwrap_or(0) + 1;
//!     session.set("visits", count)?;
//!     Ok(format!("visit #{count}"))
//! }
//!
//! #[tokio::main]
//! async fn main() -> reinet::Result<()> {
//!     reinet::logging::try_init().ok();
//!
//!     let mut app = App::new();
//!     app.get("/:id([0-9]+)", hello)?.get("/visits", visits)?;
//!
//!     reinet::serve(ServerConfig::default(), app).await
//! }
//! ```

pub mod app;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod routing;
pub mod server;
pub mod session;

// Re-export commonly used types
pub use app::App;
pub use dispatch::{Dispatcher, Handler, IntoHandler, IntoHook, Reply, RequestContext};
pub use error::{ReinetError, Result};
pub use routing::{Pattern, RouteTable};
pub use server::{serve, ServerConfig};
pub use session::{
    MemoryProvider, Provider, ProviderRegistry, Session, SessionConfig, SessionId, SessionManager,
};
