//! Transports that carry API requests.
//!
//! [`HttpTransport`](http::HttpTransport) talks to the real service.
//! Use [`MockTransport`] for testing without network access:
//!
//! ```
//! use cloudapi::transport::{Method, MockTransport, Request, Transport};
//! use reconcile::CallContext;
//!
//! let mock = MockTransport::new();
//! mock.route(Method::Get, "orgs/acme/teams/dev", 200, serde_json::json!({"name": "dev"}));
//!
//! let response = mock
//!     .send(&CallContext::new(), &Request::get("orgs/acme/teams/dev"))
//!     .unwrap();
//! assert_eq!(response.status, 200);
//! ```

pub mod http;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use reconcile::CallContext;

use crate::error::{Error, Result};

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        };
        write!(f, "{s}")
    }
}

/// One API request; `path` is relative to `<service>/api/`
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
}

impl Request {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Some(body),
        }
    }

    pub fn patch(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Patch,
            path: path.into(),
            body: Some(body),
        }
    }
}

/// Raw response: status and body text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Transport trait for sending API requests.
///
/// Implementations must refuse to start once `ctx` is interrupted and
/// must bound the request by the context's remaining time.
pub trait Transport: Send + Sync + fmt::Debug {
    /// Send one request and return the raw response, whatever its status.
    fn send(&self, ctx: &CallContext, request: &Request) -> Result<Response>;
}

/// Fail fast if the call context is already interrupted.
pub fn ensure_live(ctx: &CallContext) -> Result<()> {
    match ctx.interrupted() {
        Some(interrupt) => Err(Error::Cancelled(interrupt.to_string())),
        None => Ok(()),
    }
}

/// Mock transport for testing without network access.
///
/// Routes are keyed by method and path. Unrouted requests get a 404.
/// Every request is recorded for later inspection.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    routes: Arc<Mutex<HashMap<(Method, String), Response>>>,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl MockTransport {
    /// Create a new empty mock transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `method path` with a JSON body.
    pub fn route(&self, method: Method, path: &str, status: u16, body: serde_json::Value) {
        let body = if body.is_null() {
            String::new()
        } else {
            body.to_string()
        };
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((method, path.to_string()), Response { status, body });
    }

    /// Every request sent so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<Request> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Requests sent with this method and path.
    #[must_use]
    pub fn requests_to(&self, method: Method, path: &str) -> Vec<Request> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }
}

impl Transport for MockTransport {
    fn send(&self, ctx: &CallContext, request: &Request) -> Result<Response> {
        ensure_live(ctx)?;
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(routes
            .get(&(request.method, request.path.clone()))
            .cloned()
            .unwrap_or_else(|| Response {
                status: 404,
                body: r#"{"code":404,"message":"Not Found"}"#.to_string(),
            }))
    }
}
