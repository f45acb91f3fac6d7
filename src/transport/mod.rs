//! Transport abstraction between resource clients and the registry service.
//!
//! Resource clients speak in [`HttpRequest`]/[`HttpResponse`] values and hand
//! them to an [`HttpTransport`]. The transport is responsible only for moving
//! bytes: it does not interpret status codes, retry, or know anything about
//! ETags.
//!
//! Two implementations ship with the crate:
//!
//! - [`ReqwestTransport`] talks HTTPS to a real registry.
//! - [`InMemoryRegistry`] simulates the registry in-process, including ETag
//!   compare-and-swap, for tests and offline development.
//!
//! # Example Usage
//!
//! ```rust
//! use hub_registry::transport::{HttpRequest, HttpTransport, InMemoryRegistry, Method};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = InMemoryRegistry::new();
//! let request = HttpRequest::new(Method::Get, ["statistics", "devices"])
//!     .with_query("api-version", "2021-04-12")
//!     .with_header("Authorization", "SharedAccessSignature sr=example");
//! let response = registry.send(request).await?;
//! assert_eq!(response.status, 200);
//!
//! // Requests without a signature are rejected like the real service does.
//! let anonymous = HttpRequest::new(Method::Get, ["statistics", "devices"]);
//! assert_eq!(registry.send(anonymous).await?.status, 401);
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod http;
pub mod in_memory;

pub use errors::TransportError;
pub use http::ReqwestTransport;
pub use in_memory::{InMemoryRegistry, InMemoryRegistryStats};

use serde_json::Value;
use std::fmt;
use std::future::Future;

/// HTTP methods used by the registry API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Patch,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to the registry, relative to the registry host.
///
/// The path is kept as unencoded segments; transports encode them when
/// building the final URL.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl HttpRequest {
    /// Create a request for a path given as segments.
    pub fn new<I, S>(method: Method, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Add a query parameter.
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Add or replace a header. Header names compare case-insensitively.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Attach a JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// A header value, looked up case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// A query parameter value.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// The path as `/a/b/c`, for logging.
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

/// A response from the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    /// Raw body text; empty for `204 No Content`.
    pub body: String,
}

impl HttpResponse {
    /// Create a response with a JSON body.
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: body.to_string(),
        }
    }

    /// Create a response without a body.
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// A header value, looked up case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Moves requests to the registry and responses back.
///
/// Implementations must be safe to share between tasks; each call is
/// independent and carries all of its own state.
pub trait HttpTransport: Send + Sync {
    /// Send one request and return the service's response, whatever its status.
    ///
    /// # Errors
    ///
    /// Only failures to deliver the request or read the response are errors;
    /// a non-2xx status is a successful exchange.
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}
