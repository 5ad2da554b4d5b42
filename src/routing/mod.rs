//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route registration (at startup):
//!     "/user/:id([0-9]+)"
//!     → pattern.rs (compile segments into an anchored regex + slot names)
//!     → table.rs (append in registration order)
//!
//! Incoming request (method, path):
//!     → table.rs (scan in order, method AND full-path match)
//!     → Return: matched Route + captured text, or no match
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable while serving
//! - A bad pattern is a registration error, never a request-time one
//! - First match wins (registration order)

mod pattern;
mod table;

pub use pattern::Pattern;
pub use table::{Route, RouteMatch, RouteTable};
