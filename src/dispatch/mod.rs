//! Request dispatch.
//!
//! Handlers and hooks come in a small closed set of shapes: they either
//! take the [`RequestContext`] first or they don't, followed by zero or
//! more captured path parameters as `String`. The shape is fixed when the
//! handler is converted with [`IntoHandler`] at registration time, and
//! the dispatcher calls through that tag on every request.

mod context;
mod dispatcher;
mod handler;
mod hooks;
mod reply;

pub use context::RequestContext;
pub use dispatcher::{Dispatcher, DEFAULT_MAX_BODY_BYTES};
pub use handler::{Handler, IntoHandler, Signature, WithContext, WithoutContext};
pub use hooks::{Hook, Hooks, IntoHook};
pub use reply::{Outcome, OutputKind, Reply};
