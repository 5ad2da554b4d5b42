//! Application assembly.
//!
//! An [`App`] collects routes, hooks and session settings during startup
//! and is then frozen into a [`Dispatcher`] for serving. Nothing here is
//! process-global; each `App` owns its own provider registry.

use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use tracing::info;

use crate::dispatch::{Dispatcher, Hooks, IntoHandler, IntoHook, DEFAULT_MAX_BODY_BYTES};
use crate::routing::RouteTable;
use crate::session::{
    MemoryProvider, Provider, ProviderRegistry, SessionConfig, SessionManager,
    DEFAULT_COOKIE_NAME, DEFAULT_MAX_LIFETIME, DEFAULT_PROVIDER,
};
use crate::Result;

/// Routes, hooks and session settings for one server.
#[derive(Debug)]
pub struct App {
    routes: RouteTable,
    hooks: Hooks,
    providers: ProviderRegistry,
    sessions: SessionManager,
    max_body_bytes: usize,
}

impl App {
    /// Create an app with in-memory sessions and default settings.
    pub fn new() -> Self {
        let provider: Arc<dyn Provider> = Arc::new(MemoryProvider::new());
        let mut providers = ProviderRegistry::new();
        providers.register(DEFAULT_PROVIDER, Arc::clone(&provider));

        Self {
            routes: RouteTable::new(),
            hooks: Hooks::new(),
            providers,
            sessions: SessionManager::with_provider(
                provider,
                DEFAULT_COOKIE_NAME,
                DEFAULT_MAX_LIFETIME,
            ),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Create an app whose session manager follows `config`.
    ///
    /// Fails if `config.provider` is not one of the built-in providers.
    pub fn with_sessions(config: &SessionConfig) -> Result<Self> {
        let providers = ProviderRegistry::with_defaults();
        let sessions = SessionManager::new(&providers, config)?;
        Ok(Self {
            routes: RouteTable::new(),
            hooks: Hooks::new(),
            providers,
            sessions,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
    }

    pub fn get<M>(&mut self, pattern: &str, handler: impl IntoHandler<M>) -> Result<&mut Self> {
        self.route(Method::GET, pattern, handler)
    }

    pub fn post<M>(&mut self, pattern: &str, handler: impl IntoHandler<M>) -> Result<&mut Self> {
        self.route(Method::POST, pattern, handler)
    }

    pub fn put<M>(&mut self, pattern: &str, handler: impl IntoHandler<M>) -> Result<&mut Self> {
        self.route(Method::PUT, pattern, handler)
    }

    pub fn patch<M>(&mut self, pattern: &str, handler: impl IntoHandler<M>) -> Result<&mut Self> {
        self.route(Method::PATCH, pattern, handler)
    }

    pub fn delete<M>(&mut self, pattern: &str, handler: impl IntoHandler<M>) -> Result<&mut Self> {
        self.route(Method::DELETE, pattern, handler)
    }

    /// Register a handler for any method, including extension methods.
    ///
    /// Fails on a malformed pattern or when the handler's parameter count
    /// differs from the pattern's capture slots.
    pub fn route<M>(
        &mut self,
        method: Method,
        pattern: &str,
        handler: impl IntoHandler<M>,
    ) -> Result<&mut Self> {
        self.routes.register(method, pattern, handler.into_handler())?;
        Ok(self)
    }

    /// Add a hook run before every matched handler.
    pub fn before<M>(&mut self, hook: impl IntoHook<M>) -> &mut Self {
        self.hooks.add_before(hook.into_hook());
        self
    }

    /// Add a hook run after every successful handler.
    pub fn after<M>(&mut self, hook: impl IntoHook<M>) -> &mut Self {
        self.hooks.add_after(hook.into_hook());
        self
    }

    /// Make a session provider available under `name`.
    pub fn register_provider(
        &mut self,
        name: impl Into<String>,
        provider: Arc<dyn Provider>,
    ) -> &mut Self {
        let name = name.into();
        if self.providers.register(name.clone(), provider).is_some() {
            info!(provider = %name, "replaced session provider");
        }
        self
    }

    /// Store sessions in the provider registered as `name`.
    pub fn select_provider(&mut self, name: &str) -> Result<&mut Self> {
        self.sessions.select_provider(&self.providers, name)?;
        Ok(self)
    }

    /// Register `provider` under `name` and select it.
    pub fn use_provider(
        &mut self,
        name: impl Into<String>,
        provider: Arc<dyn Provider>,
    ) -> Result<&mut Self> {
        let name = name.into();
        self.register_provider(name.clone(), provider);
        self.select_provider(&name)
    }

    pub fn set_session_lifetime(&mut self, lifetime: Duration) -> &mut Self {
        self.sessions.set_max_lifetime(lifetime);
        self
    }

    pub fn set_max_body_bytes(&mut self, limit: usize) -> &mut Self {
        self.max_body_bytes = limit;
        self
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Freeze the app for serving.
    pub fn into_dispatcher(self) -> Dispatcher {
        Dispatcher::new(
            self.routes,
            self.hooks,
            Arc::new(self.sessions),
            self.max_body_bytes,
        )
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::RequestContext;
    use crate::error::ReinetError;

    fn hello(id: String) -> String {
        format!("Hello, {id}")
    }

    #[test]
    fn test_registers_each_method() {
        let mut app = App::new();
        app.get("/a", || "get")
            .unwrap()
            .post("/a", || "post")
            .unwrap()
            .put("/a", || "put")
            .unwrap()
            .patch("/a", || "patch")
            .unwrap()
            .delete("/a", || "delete")
            .unwrap()
            .route(Method::OPTIONS, "/a", || "options")
            .unwrap();

        let methods: Vec<_> = app.routes().iter().map(|r| r.method().clone()).collect();
        assert_eq!(
            methods,
            vec![
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS
            ]
        );
    }

    #[test]
    fn test_bad_registration_is_reported() {
        let mut app = App::new();
        let err = app.get("/:id([0-9]+", hello).err().unwrap();
        assert!(matches!(err, ReinetError::InvalidPattern { .. }));

        let err = app.get("/:a/:b", hello).err().unwrap();
        assert!(matches!(
            err,
            ReinetError::ArityMismatch {
                expected: 2,
                found: 1,
                ..
            }
        ));
        assert!(app.routes().is_empty());
    }

    #[test]
    fn test_hooks_accept_both_shapes() {
        let mut app = App::new();
        app.before(|| {})
            .before(|_: &mut RequestContext| {})
            .after(|| {});
        let dispatcher = app.into_dispatcher();
        assert!(format!("{dispatcher:?}").contains("before: 2, after: 1"));
    }

    #[test]
    fn test_select_provider() {
        let mut app = App::new();
        assert!(app.select_provider("redis").is_err());

        let other: Arc<dyn Provider> = Arc::new(MemoryProvider::new());
        app.use_provider("other", Arc::clone(&other)).unwrap();
        assert!(Arc::ptr_eq(app.sessions().provider(), &other));
        assert_eq!(app.providers().names(), vec!["default", "other"]);

        app.select_provider(DEFAULT_PROVIDER).unwrap();
        assert!(!Arc::ptr_eq(app.sessions().provider(), &other));
    }

    #[test]
    fn test_with_sessions_config() {
        let config = SessionConfig {
            cookie_name: "sid".into(),
            max_lifetime: Duration::from_secs(5),
            ..SessionConfig::default()
        };
        let mut app = App::with_sessions(&config).unwrap();
        assert_eq!(app.sessions().cookie_name(), "sid");
        assert_eq!(app.sessions().max_lifetime(), Duration::from_secs(5));

        app.set_session_lifetime(Duration::from_secs(9));
        assert_eq!(app.sessions().max_lifetime(), Duration::from_secs(9));

        let config = SessionConfig {
            provider: "missing".into(),
            ..SessionConfig::default()
        };
        assert!(matches!(
            App::with_sessions(&config),
            Err(ReinetError::UnknownProvider(_))
        ));
    }
}
