//! Per-request context handed to handlers and hooks.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::header::{CONTENT_TYPE, LOCATION};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::Response;

use crate::error::ReinetError;
use crate::session::{Session, SessionManager};
use crate::Result;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// The inbound request, decoded parameters, and the outbound response
/// being built for it.
///
/// Created for one request and dropped once the response is produced.
pub struct RequestContext {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    form: HashMap<String, String>,
    query: HashMap<String, String>,
    status: StatusCode,
    response_headers: HeaderMap,
    response_body: Vec<u8>,
    sessions: Arc<SessionManager>,
    session: Option<Session>,
}

impl RequestContext {
    /// Build a context from request parts and the fully read body.
    pub fn new(parts: Parts, body: Bytes, sessions: Arc<SessionManager>) -> Self {
        let mut query = HashMap::new();
        if let Some(q) = parts.uri.query() {
            decode_first_values(q.as_bytes(), &mut query);
        }

        // Body fields take precedence over query fields of the same name.
        let mut form = HashMap::new();
        if carries_form_body(&parts.method, &parts.headers) {
            decode_first_values(&body, &mut form);
        }
        for (k, v) in &query {
            form.entry(k.clone()).or_insert_with(|| v.clone());
        }

        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            form,
            query,
            status: StatusCode::OK,
            response_headers: HeaderMap::new(),
            response_body: Vec::new(),
            sessions,
            session: None,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Raw request body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// First value of a form field (urlencoded body, then URL query).
    pub fn form(&self, name: &str) -> Option<&str> {
        self.form.get(name).map(String::as_str)
    }

    /// First value of a URL query parameter.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn form_fields(&self) -> &HashMap<String, String> {
        &self.form
    }

    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Set (replace) a response header.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ReinetError::InvalidHeader(e.to_string()))?;
        let value =
            HeaderValue::from_str(value).map_err(|e| ReinetError::InvalidHeader(e.to_string()))?;
        self.response_headers.insert(name, value);
        Ok(())
    }

    /// Current value of a response header, if set and valid text.
    pub fn response_header(&self, name: &str) -> Option<&str> {
        self.response_headers
            .get(name)
            .and_then(|v| v.to_str().ok())
    }

    pub fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }

    /// Append bytes to the response body.
    pub fn write(&mut self, data: impl AsRef<[u8]>) {
        self.response_body.extend_from_slice(data.as_ref());
    }

    /// Response body written so far.
    pub fn response_body(&self) -> &[u8] {
        &self.response_body
    }

    /// Respond with `302 Found` pointing at `location`.
    pub fn redirect(&mut self, location: &str) -> Result<()> {
        let value = HeaderValue::from_str(location)
            .map_err(|e| ReinetError::InvalidHeader(e.to_string()))?;
        self.response_headers.insert(LOCATION, value);
        self.status = StatusCode::FOUND;
        Ok(())
    }

    /// The session for this request, started or resumed on first use.
    ///
    /// A fresh session sets the session cookie on the response.
    pub fn session(&mut self) -> Result<Session> {
        if let Some(session) = &self.session {
            return Ok(session.clone());
        }
        let session = self
            .sessions
            .start(&self.headers, &mut self.response_headers)?;
        self.session = Some(session.clone());
        Ok(session)
    }

    /// Destroy this request's session and expire its cookie.
    pub fn destroy_session(&mut self) -> Result<()> {
        match self.session.take() {
            Some(session) => self
                .sessions
                .destroy_session(session.id(), &mut self.response_headers),
            None => self
                .sessions
                .destroy(&self.headers, &mut self.response_headers),
        }
    }

    /// Write a handler's returned body, defaulting the content type.
    pub(crate) fn write_returned(&mut self, body: &[u8], content_type: &'static str) {
        if !self.response_headers.contains_key(CONTENT_TYPE) {
            self.response_headers
                .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        self.write(body);
    }

    /// Consume the context into the HTTP response.
    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.response_body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.response_headers;
        response
    }

    #[cfg(test)]
    pub(crate) fn for_test() -> Self {
        Self::from_request(
            axum::http::Request::builder()
                .uri("/")
                .body(Bytes::new())
                .unwrap(),
        )
    }

    #[cfg(test)]
    pub(crate) fn from_request(request: axum::http::Request<Bytes>) -> Self {
        use crate::session::MemoryProvider;

        let (parts, body) = request.into_parts();
        let sessions = SessionManager::with_provider(
            Arc::new(MemoryProvider::new()),
            crate::session::DEFAULT_COOKIE_NAME,
            std::time::Duration::from_secs(3600),
        );
        Self::new(parts, body, Arc::new(sessions))
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

fn carries_form_body(method: &Method, headers: &HeaderMap) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
        && headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with(FORM_CONTENT_TYPE))
}

/// Decode urlencoded pairs, keeping the first value per name.
fn decode_first_values(input: &[u8], into: &mut HashMap<String, String>) {
    match serde_urlencoded::from_bytes::<Vec<(String, String)>>(input) {
        Ok(pairs) => {
            for (k, v) in pairs {
                into.entry(k).or_insert(v);
            }
        }
        Err(e) => tracing::debug!(error = %e, "ignoring malformed urlencoded data"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn ctx(method: Method, uri: &str, content_type: Option<&str>, body: &str) -> RequestContext {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(ct) = content_type {
            builder = builder.header(CONTENT_TYPE, ct);
        }
        RequestContext::from_request(builder.body(Bytes::from(body.to_string())).unwrap())
    }

    #[test]
    fn test_query_first_value_wins() {
        let c = ctx(Method::GET, "/s?q=one&q=two&page=3", None, "");
        assert_eq!(c.query("q"), Some("one"));
        assert_eq!(c.query("page"), Some("3"));
        assert_eq!(c.query("missing"), None);
        assert_eq!(c.path(), "/s");
    }

    #[test]
    fn test_form_body_precedes_query() {
        let c = ctx(
            Method::POST,
            "/login?user=from-query&next=%2Fhome",
            Some("application/x-www-form-urlencoded"),
            "user=from-body&pass=s%20cret",
        );
        assert_eq!(c.form("user"), Some("from-body"));
        assert_eq!(c.form("pass"), Some("s cret"));
        assert_eq!(c.form("next"), Some("/home"));
        assert_eq!(c.query("user"), Some("from-query"));
        assert!(c.query("pass").is_none());
    }

    #[test]
    fn test_form_body_ignored_for_get_and_other_types() {
        let c = ctx(
            Method::GET,
            "/",
            Some("application/x-www-form-urlencoded"),
            "a=1",
        );
        assert!(c.form("a").is_none());

        let c = ctx(Method::POST, "/", Some("application/json"), "a=1");
        assert!(c.form("a").is_none());
        assert_eq!(c.body().as_ref(), b"a=1");
    }

    #[test]
    fn test_returned_body_keeps_handler_content_type() {
        let mut c = RequestContext::for_test();
        c.set_header("content-type", "application/json").unwrap();
        c.write_returned(b"{}", "text/plain; charset=utf-8");
        assert_eq!(c.response_header("content-type"), Some("application/json"));

        let mut c = RequestContext::for_test();
        c.write_returned(b"hi", "text/plain; charset=utf-8");
        assert_eq!(
            c.response_header("content-type"),
            Some("text/plain; charset=utf-8")
        );
        assert_eq!(c.response_body(), b"hi");
    }

    #[test]
    fn test_redirect() {
        let mut c = RequestContext::for_test();
        c.redirect("/elsewhere").unwrap();
        let response = c.into_response();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[LOCATION], "/elsewhere");
    }

    #[test]
    fn test_invalid_header_rejected() {
        let mut c = RequestContext::for_test();
        assert!(c.set_header("bad header", "x").is_err());
        assert!(c.set_header("x-ok", "line\nbreak").is_err());
    }

    #[test]
    fn test_session_is_cached_per_request() {
        let mut c = RequestContext::for_test();
        let first = c.session().unwrap();
        let second = c.session().unwrap();
        assert_eq!(first.id(), second.id());
        // Only one cookie issued
        assert_eq!(
            c.response_headers()
                .get_all(axum::http::header::SET_COOKIE)
                .iter()
                .count(),
            1
        );
    }

    #[test]
    fn test_destroy_session_started_in_same_request() {
        let mut c = RequestContext::for_test();
        let session = c.session().unwrap();
        session.set("k", 1).unwrap();
        c.destroy_session().unwrap();

        let cookies: Vec<_> = c
            .response_headers()
            .get_all(axum::http::header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(cookies.len(), 2);
        assert!(cookies[1].contains("Max-Age=0"));
    }
}
