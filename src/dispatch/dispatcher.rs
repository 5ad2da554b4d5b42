//! Request dispatch: route lookup, hooks, handler invocation.

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{CONTENT_LENGTH, SET_COOKIE};
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use percent_encoding::percent_decode_str;
use tracing::{debug, error, warn};

use super::reply::Outcome;
use super::{Hooks, RequestContext};
use crate::routing::RouteTable;
use crate::session::SessionManager;

const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
const BYTES_CONTENT_TYPE: &str = "application/octet-stream";

/// Default cap on request body size (2 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Routes requests to handlers.
///
/// Holds everything fixed at startup: the route table, the hook lists and
/// the session manager. It is shared read-only by every request.
#[derive(Debug)]
pub struct Dispatcher {
    routes: RouteTable,
    hooks: Hooks,
    sessions: Arc<SessionManager>,
    max_body_bytes: usize,
}

impl Dispatcher {
    pub fn new(
        routes: RouteTable,
        hooks: Hooks,
        sessions: Arc<SessionManager>,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            routes,
            hooks,
            sessions,
            max_body_bytes,
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Handle one request end to end.
    ///
    /// The path is percent-decoded before matching, so parameters carry
    /// decoded text. Unmatched requests get `404`; a failing handler gets
    /// `500` and skips the after-hooks.
    pub async fn dispatch(&self, request: Request<Body>) -> Response {
        let (parts, body) = request.into_parts();

        let path = match percent_decode_str(parts.uri.path()).decode_utf8() {
            Ok(path) => path,
            Err(_) => {
                debug!(path = parts.uri.path(), "path is not valid UTF-8 once decoded");
                return StatusCode::BAD_REQUEST.into_response();
            }
        };
        let Some(matched) = self.routes.find(&parts.method, &path) else {
            debug!(method = %parts.method, path = %path, "no route matched");
            return StatusCode::NOT_FOUND.into_response();
        };

        if declared_length(&parts.headers).is_some_and(|len| len > self.max_body_bytes) {
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
        let body = match axum::body::to_bytes(body, self.max_body_bytes).await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "failed to read request body");
                return StatusCode::BAD_REQUEST.into_response();
            }
        };

        let route = matched.route;
        let mut ctx = RequestContext::new(parts, body, Arc::clone(&self.sessions));

        self.hooks.run_before(&mut ctx);

        match route.handler().invoke(&mut ctx, matched.params) {
            Outcome::Text(text) => ctx.write_returned(text.as_bytes(), TEXT_CONTENT_TYPE),
            Outcome::Bytes(bytes) => ctx.write_returned(&bytes, BYTES_CONTENT_TYPE),
            Outcome::Written => {}
            Outcome::Failed(reason) => {
                error!(
                    method = %route.method(),
                    pattern = route.pattern().as_str(),
                    %reason,
                    "handler failed"
                );
                return failure_response(&ctx);
            }
        }

        self.hooks.run_after(&mut ctx);
        ctx.into_response()
    }
}

/// Bare `500` that still carries any session cookie the handler issued.
fn failure_response(ctx: &RequestContext) -> Response {
    let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
    for cookie in ctx.response_headers().get_all(SET_COOKIE) {
        response.headers_mut().append(SET_COOKIE, cookie.clone());
    }
    response
}

fn declared_length(headers: &axum::http::HeaderMap) -> Option<usize> {
    headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{IntoHandler, IntoHook};
    use crate::session::MemoryProvider;
    use axum::http::Method;
    use std::sync::Mutex;
    use std::time::Duration;

    fn dispatcher(routes: RouteTable, hooks: Hooks) -> Dispatcher {
        let sessions = SessionManager::with_provider(
            Arc::new(MemoryProvider::new()),
            "sid",
            Duration::from_secs(60),
        );
        Dispatcher::new(routes, hooks, Arc::new(sessions), 16)
    }

    fn request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8_lossy(&bytes).to_string()
    }

    fn user(_ctx: &mut RequestContext, id: String) -> String {
        format!("user:{id}")
    }

    #[tokio::test]
    async fn test_user_scenario() {
        let mut routes = RouteTable::new();
        routes
            .register(Method::GET, "/user/:id([0-9]+)", user.into_handler())
            .unwrap();
        let d = dispatcher(routes, Hooks::new());

        let response = d.dispatch(request(Method::GET, "/user/42")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], TEXT_CONTENT_TYPE);
        assert_eq!(body_text(response).await, "user:42");

        let response = d.dispatch(request(Method::GET, "/user/abc")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = d.dispatch(request(Method::POST, "/user/42")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_hooks_wrap_handler() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = Hooks::new();
        {
            let log = Arc::clone(&log);
            hooks.add_before((move || log.lock().unwrap().push("before")).into_hook());
        }
        {
            let log = Arc::clone(&log);
            hooks.add_after(
                (move |ctx: &mut RequestContext| {
                    log.lock().unwrap().push("after");
                    assert_eq!(ctx.response_body(), b"ok");
                })
                .into_hook(),
            );
        }

        let mut routes = RouteTable::new();
        let handler_log = Arc::clone(&log);
        routes
            .register(
                Method::GET,
                "/",
                (move || {
                    handler_log.lock().unwrap().push("handler");
                    "ok"
                })
                .into_handler(),
            )
            .unwrap();

        let d = dispatcher(routes, hooks);
        let response = d.dispatch(request(Method::GET, "/")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*log.lock().unwrap(), vec!["before", "handler", "after"]);
    }

    #[tokio::test]
    async fn test_hooks_skipped_when_unmatched() {
        let count = Arc::new(Mutex::new(0));
        let mut hooks = Hooks::new();
        let c = Arc::clone(&count);
        hooks.add_before((move || *c.lock().unwrap() += 1).into_hook());

        let d = dispatcher(RouteTable::new(), hooks);
        let response = d.dispatch(request(Method::GET, "/nothing")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(*count.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_bytes_body_is_octet_stream() {
        let mut routes = RouteTable::new();
        routes
            .register(Method::GET, "/raw", (|| vec![0u8, 159, 146, 150]).into_handler())
            .unwrap();
        let d = dispatcher(routes, Hooks::new());

        let response = d.dispatch(request(Method::GET, "/raw")).await;
        assert_eq!(response.headers()["content-type"], BYTES_CONTENT_TYPE);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], &[0u8, 159, 146, 150]);
    }

    #[tokio::test]
    async fn test_side_effecting_handler() {
        fn created(ctx: &mut RequestContext) {
            ctx.set_status(StatusCode::CREATED);
            ctx.set_header("content-type", "application/json").unwrap();
            ctx.write(br#"{"ok":true}"#);
        }

        let mut routes = RouteTable::new();
        routes
            .register(Method::POST, "/items", created.into_handler())
            .unwrap();
        let d = dispatcher(routes, Hooks::new());

        let response = d.dispatch(request(Method::POST, "/items")).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["content-type"], "application/json");
        assert_eq!(body_text(response).await, r#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn test_failing_handler_is_internal_error() {
        let ran_after = Arc::new(Mutex::new(false));
        let mut hooks = Hooks::new();
        let flag = Arc::clone(&ran_after);
        hooks.add_after((move || *flag.lock().unwrap() = true).into_hook());

        let mut routes = RouteTable::new();
        routes
            .register(
                Method::GET,
                "/fail",
                (|| -> Result<String, String> { Err("database down".into()) }).into_handler(),
            )
            .unwrap();
        let d = dispatcher(routes, hooks);

        let response = d.dispatch(request(Method::GET, "/fail")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!*ran_after.lock().unwrap());
    }

    #[tokio::test]
    async fn test_params_are_percent_decoded() {
        let mut routes = RouteTable::new();
        routes
            .register(Method::GET, "/user/:id([0-9]+)", user.into_handler())
            .unwrap();
        routes
            .register(
                Method::GET,
                "/files/:name",
                (|name: String| format!("file:{name}")).into_handler(),
            )
            .unwrap();
        let d = dispatcher(routes, Hooks::new());

        let response = d.dispatch(request(Method::GET, "/files/hello%20world")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "file:hello world");

        let response = d.dispatch(request(Method::GET, "/user/%34%32")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "user:42");

        let response = d.dispatch(request(Method::GET, "/files/%FF%FE")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_failed_handler_keeps_session_cookie() {
        fn save_then_fail(ctx: &mut RequestContext) -> crate::Result<String> {
            ctx.session()?.set("draft", "unsaved")?;
            Err(crate::ReinetError::LockPoisoned)
        }
        fn read_draft(ctx: &mut RequestContext) -> crate::Result<String> {
            Ok(ctx.session()?.get::<String>("draft")?.unwrap_or_default())
        }

        let mut routes = RouteTable::new();
        routes
            .register(Method::POST, "/draft", save_then_fail.into_handler())
            .unwrap();
        routes
            .register(Method::GET, "/draft", read_draft.into_handler())
            .unwrap();
        let d = dispatcher(routes, Hooks::new());

        let response = d.dispatch(request(Method::POST, "/draft")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let cookie = response.headers()[SET_COOKIE]
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("sid="));
        assert_eq!(d.sessions().provider().count().unwrap(), 1);

        let resumed = Request::builder()
            .method(Method::GET)
            .uri("/draft")
            .header(axum::http::header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap();
        let response = d.dispatch(resumed).await;
        assert!(response.headers().get(SET_COOKIE).is_none());
        assert_eq!(body_text(response).await, "unsaved");
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let mut routes = RouteTable::new();
        routes
            .register(Method::POST, "/upload", (|| "stored").into_handler())
            .unwrap();
        let d = dispatcher(routes, Hooks::new());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .header(CONTENT_LENGTH, "64")
            .body(Body::from(vec![b'x'; 64]))
            .unwrap();
        let response = d.dispatch(request).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
