//! HTTPS transport backed by `reqwest`.

use super::{HttpRequest, HttpResponse, HttpTransport, Method, TransportError};
use log::trace;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Sends registry requests over HTTPS.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Create a transport for `https://{host_name}`.
    pub fn new(host_name: &str, timeout: Duration) -> Result<Self, TransportError> {
        let base_url = Url::parse(&format!("https://{}", host_name)).map_err(|e| {
            TransportError::Configuration {
                message: format!("invalid host name '{}': {}", host_name, e),
            }
        })?;
        Self::with_base_url(base_url, timeout)
    }

    /// Create a transport for an explicit base URL (e.g. a local emulator).
    pub fn with_base_url(base_url: Url, timeout: Duration) -> Result<Self, TransportError> {
        if base_url.cannot_be_a_base() {
            return Err(TransportError::Configuration {
                message: format!("'{}' cannot be used as a base URL", base_url),
            });
        }

        let client = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| TransportError::Configuration {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// The base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, request: &HttpRequest) -> Result<Url, TransportError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| TransportError::invalid_request("base URL has no path"))?;
            segments.pop_if_empty();
            for segment in &request.segments {
                segments.push(segment);
            }
        }
        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &request.query {
                pairs.append_pair(name, value);
            }
        }
        Ok(url)
    }

    fn map_error(&self, error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout {
                duration: self.timeout,
            }
        } else if error.is_builder() {
            TransportError::invalid_request(error.to_string())
        } else if error.is_body() || error.is_decode() {
            TransportError::body(error.to_string())
        } else {
            TransportError::Connection {
                message: error.to_string(),
                endpoint: self.base_url.host_str().map(str::to_string),
            }
        }
    }
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Post => reqwest::Method::POST,
        Method::Delete => reqwest::Method::DELETE,
    }
}

impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = self.url_for(&request)?;
        trace!("{} {}", request.method, url.path());

        let mut builder = self.client.request(reqwest_method(request.method), url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| self.map_error(e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.text().await.map_err(|e| self.map_error(e))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
