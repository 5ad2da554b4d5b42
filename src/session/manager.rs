//! Cookie-based session manager and expiry sweeps.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use cookie::Cookie;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use super::{Provider, ProviderRegistry, Session, SessionId};
use crate::error::ReinetError;
use crate::Result;

/// Cookie name used when none is configured.
pub const DEFAULT_COOKIE_NAME: &str = "reinetSessionID";

/// Session lifetime used when none is configured.
pub const DEFAULT_MAX_LIFETIME: Duration = Duration::from_secs(3600);

/// Shortest interval between expiry sweeps.
const MIN_GC_PERIOD: Duration = Duration::from_secs(1);

/// Session manager settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Name of the session cookie.
    pub cookie_name: String,
    /// Idle time after which a session expires; also the sweep interval
    /// and the cookie's Max-Age.
    pub max_lifetime: Duration,
    /// Registered provider to store sessions in.
    pub provider: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            max_lifetime: DEFAULT_MAX_LIFETIME,
            provider: super::DEFAULT_PROVIDER.to_string(),
        }
    }
}

/// Issues session cookies and delegates storage to a [`Provider`].
///
/// `start`, `destroy` and `run_gc` hold the manager's lock for their whole
/// duration, so session creation, lookup, destruction and sweeps never
/// interleave.
pub struct SessionManager {
    cookie_name: String,
    max_lifetime: Duration,
    provider: Arc<dyn Provider>,
    serial: Mutex<()>,
}

impl SessionManager {
    /// Create a manager backed by the provider named in `config`.
    ///
    /// Fails with [`ReinetError::UnknownProvider`] if no such provider is
    /// registered.
    pub fn new(registry: &ProviderRegistry, config: &SessionConfig) -> Result<Self> {
        let provider = registry.get(&config.provider)?;
        Ok(Self::with_provider(
            provider,
            config.cookie_name.clone(),
            config.max_lifetime,
        ))
    }

    /// Create a manager around an explicit provider.
    pub fn with_provider(
        provider: Arc<dyn Provider>,
        cookie_name: impl Into<String>,
        max_lifetime: Duration,
    ) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            max_lifetime,
            provider,
            serial: Mutex::new(()),
        }
    }

    /// Switch to another registered provider. Only possible before the
    /// manager is shared.
    pub fn select_provider(&mut self, registry: &ProviderRegistry, name: &str) -> Result<()> {
        self.provider = registry.get(name)?;
        Ok(())
    }

    pub fn set_max_lifetime(&mut self, max_lifetime: Duration) {
        self.max_lifetime = max_lifetime;
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn max_lifetime(&self) -> Duration {
        self.max_lifetime
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Resume the session named by the request cookie, or start a new one.
    ///
    /// A missing, empty, undecodable or unknown cookie value leads to a
    /// fresh identifier and a `Set-Cookie` header on `response`.
    pub fn start(&self, request: &HeaderMap, response: &mut HeaderMap) -> Result<Session> {
        let _guard = self.lock()?;

        if let Some(id) = self.cookie_id(request) {
            if self.provider.contains(&id)? {
                self.provider.read(&id)?;
                return Ok(Session::new(id, Arc::clone(&self.provider)));
            }
            debug!("unknown session cookie, issuing a new session");
        }

        let id = SessionId::generate()?;
        self.provider.init(&id)?;
        response.append(SET_COOKIE, self.session_cookie(&id)?);
        debug!("session started");
        Ok(Session::new(id, Arc::clone(&self.provider)))
    }

    /// Destroy the session named by the request cookie, if any, and expire
    /// the cookie.
    pub fn destroy(&self, request: &HeaderMap, response: &mut HeaderMap) -> Result<()> {
        match self.cookie_id(request) {
            Some(id) => self.destroy_session(&id, response),
            None => Ok(()),
        }
    }

    /// Destroy a known session and expire its cookie.
    pub fn destroy_session(&self, id: &SessionId, response: &mut HeaderMap) -> Result<()> {
        let _guard = self.lock()?;
        self.provider.destroy(id)?;

        let mut removal = Cookie::build((self.cookie_name.clone(), ""))
            .path("/")
            .http_only(true)
            .build();
        removal.make_removal();
        response.append(SET_COOKIE, header_value(&removal)?);
        debug!("session destroyed");
        Ok(())
    }

    /// Run one expiry sweep. Returns the number of sessions removed.
    pub fn run_gc(&self) -> Result<usize> {
        let _guard = self.lock()?;
        let removed = self.provider.gc(self.max_lifetime)?;
        debug!(removed, remaining = self.provider.count()?, "session sweep");
        Ok(removed)
    }

    /// Start the recurring sweep task.
    ///
    /// The first sweep runs immediately, then once per `max_lifetime`.
    /// A failed sweep is logged and retried on the next tick. The task runs
    /// until [`GcTask::shutdown`] is called or the [`GcTask`] is dropped.
    pub fn spawn_gc(self: &Arc<Self>) -> GcTask {
        let manager = Arc::clone(self);
        let period = self.max_lifetime.max(MIN_GC_PERIOD);
        let (stop, mut stopped) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = manager.run_gc() {
                            warn!(error = %e, "session sweep failed");
                        }
                    }
                    _ = stopped.changed() => break,
                }
            }
            debug!("session sweeper stopped");
        });

        GcTask { stop, handle }
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.serial.lock().map_err(|_| ReinetError::LockPoisoned)
    }

    /// Session identifier carried by the request's cookie header(s).
    fn cookie_id(&self, headers: &HeaderMap) -> Option<SessionId> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| Cookie::split_parse(value))
            .filter_map(|cookie| cookie.ok())
            .find(|cookie| cookie.name() == self.cookie_name)
            .and_then(|cookie| SessionId::from_cookie_value(cookie.value()))
    }

    fn session_cookie(&self, id: &SessionId) -> Result<HeaderValue> {
        let max_age = i64::try_from(self.max_lifetime.as_secs()).unwrap_or(i64::MAX);
        let cookie = Cookie::build((self.cookie_name.clone(), id.to_cookie_value()))
            .path("/")
            .http_only(true)
            .max_age(cookie::time::Duration::seconds(max_age))
            .build();
        header_value(&cookie)
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("cookie_name", &self.cookie_name)
            .field("max_lifetime", &self.max_lifetime)
            .finish_non_exhaustive()
    }
}

fn header_value(cookie: &Cookie<'_>) -> Result<HeaderValue> {
    HeaderValue::from_str(&cookie.to_string()).map_err(|e| ReinetError::InvalidHeader(e.to_string()))
}

/// Handle to the recurring sweep task.
#[derive(Debug)]
pub struct GcTask {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl GcTask {
    /// Stop the sweeper and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "session sweeper exited abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
