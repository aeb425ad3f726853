//! HTTP request/response types and the transport seam.
//!
//! # Design
//! Requests and responses are plain data. `RequestBuilder` produces
//! `HttpRequest` values and `decode` consumes `HttpResponse` values without
//! touching the network; the only code that performs I/O sits behind the
//! `Transport` trait. Swapping the transport is how tests script server
//! behaviour without sockets.

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An HTTP request described as plain data.
///
/// `url` is absolute: endpoint base, node id and query string. Form bodies
/// are already urlencoded and announced through the `content-type` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// An HTTP response described as plain data, body fully read.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Canonical reason phrase, e.g. `Not Found`. May be empty.
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// First value of header `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Status line in the `404 Not Found` form.
    pub fn status_line(&self) -> String {
        if self.reason.is_empty() {
            self.status.to_string()
        } else {
            format!("{} {}", self.status, self.reason)
        }
    }
}

/// Executes one request and returns the complete response.
///
/// Implementations must return non-2xx responses as `Ok` so the decoder can
/// classify them; only failures to obtain a response at all are `Err`.
pub trait Transport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ureq::Error>;
}
