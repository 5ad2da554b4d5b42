//! HTTP server wiring.

use std::future::Future;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::response::Response;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::app::App;
use crate::dispatch::Dispatcher;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Stop accepting connections on Ctrl+C and drain in-flight requests.
    pub graceful_shutdown: bool,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            graceful_shutdown: true,
        }
    }

    pub fn without_graceful_shutdown(mut self) -> Self {
        self.graceful_shutdown = false;
        self
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("127.0.0.1", 3000)
    }
}

/// Build the axum router that hands every request to `dispatcher`.
///
/// Requests are traced, and a panicking handler becomes a `500` for that
/// request only.
pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .fallback(dispatch_request)
        .with_state(dispatcher)
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
}

async fn dispatch_request(State(dispatcher): State<Arc<Dispatcher>>, request: Request) -> Response {
    dispatcher.dispatch(request).await
}

/// Bind and serve `app` until shutdown.
///
/// The session sweeper runs for the lifetime of the server and is stopped
/// before this returns.
pub async fn serve(config: ServerConfig, app: App) -> crate::Result<()> {
    let listener = TcpListener::bind(config.bind_address()).await?;

    if config.graceful_shutdown {
        serve_with_shutdown(listener, app, shutdown_signal()).await
    } else {
        serve_with_shutdown(listener, app, std::future::pending()).await
    }
}

/// Serve `app` on an already bound listener until `signal` completes.
pub async fn serve_with_shutdown<F>(listener: TcpListener, app: App, signal: F) -> crate::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    let dispatcher = Arc::new(app.into_dispatcher());
    let gc = dispatcher.sessions().spawn_gc();

    tracing::info!(
        address = %addr,
        routes = dispatcher.routes().len(),
        "HTTP server starting"
    );

    let result = axum::serve(listener, router(dispatcher))
        .with_graceful_shutdown(signal)
        .await;

    gc.shutdown().await;
    tracing::info!("HTTP server stopped");
    result.map_err(Into::into)
}

/// Wait for Ctrl+C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for Ctrl+C, running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
