//! Before/after hooks run around every dispatch.

use std::sync::Arc;

use super::handler::{WithContext, WithoutContext};
use super::RequestContext;

/// A hook, tagged by whether it wants the request context.
#[derive(Clone)]
pub enum Hook {
    Contextual(Arc<dyn Fn(&mut RequestContext) + Send + Sync>),
    Plain(Arc<dyn Fn() + Send + Sync>),
}

impl Hook {
    pub fn run(&self, ctx: &mut RequestContext) {
        match self {
            Hook::Contextual(f) => f(ctx),
            Hook::Plain(f) => f(),
        }
    }
}

/// Conversion of `Fn(&mut RequestContext)` or `Fn()` into a [`Hook`].
pub trait IntoHook<M>: Send + Sync + 'static {
    fn into_hook(self) -> Hook;
}

impl<F> IntoHook<WithContext<()>> for F
where
    F: Fn(&mut RequestContext) + Send + Sync + 'static,
{
    fn into_hook(self) -> Hook {
        Hook::Contextual(Arc::new(self))
    }
}

impl<F> IntoHook<WithoutContext<()>> for F
where
    F: Fn() + Send + Sync + 'static,
{
    fn into_hook(self) -> Hook {
        Hook::Plain(Arc::new(self))
    }
}

/// Ordered before/after hook lists.
#[derive(Clone, Default)]
pub struct Hooks {
    before: Vec<Hook>,
    after: Vec<Hook>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook that runs before the handler.
    pub fn add_before(&mut self, hook: Hook) {
        self.before.push(hook);
    }

    /// Append a hook that runs after the handler's response is written.
    pub fn add_after(&mut self, hook: Hook) {
        self.after.push(hook);
    }

    pub fn run_before(&self, ctx: &mut RequestContext) {
        for hook in &self.before {
            hook.run(ctx);
        }
    }

    pub fn run_after(&self, ctx: &mut RequestContext) {
        for hook in &self.after {
            hook.run(ctx);
        }
    }

    /// Number of (before, after) hooks.
    pub fn counts(&self) -> (usize, usize) {
        (self.before.len(), self.after.len())
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_hooks_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = Hooks::new();

        for name in ["first", "second", "third"] {
            let log = Arc::clone(&log);
            hooks.add_before((move || log.lock().unwrap().push(name)).into_hook());
        }

        let mut ctx = RequestContext::for_test();
        hooks.run_before(&mut ctx);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_contextual_hook_sees_context() {
        let mut hooks = Hooks::new();
        hooks.add_after(
            (|ctx: &mut RequestContext| {
                ctx.set_header("x-after", "ran").unwrap();
            })
            .into_hook(),
        );

        let mut ctx = RequestContext::for_test();
        hooks.run_before(&mut ctx);
        assert!(ctx.response_header("x-after").is_none());

        hooks.run_after(&mut ctx);
        assert_eq!(ctx.response_header("x-after"), Some("ran"));
        assert_eq!(hooks.counts(), (0, 1));
    }
}
