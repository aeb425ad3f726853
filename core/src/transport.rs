//! Blocking transport backed by a ureq agent.

use std::time::Duration;

use tracing::trace;

use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};

/// Upper bound on a response body.
pub const MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

/// Default `Transport`: one pooled ureq agent per client.
///
/// Status codes are never turned into errors here; the decoder classifies
/// them. The whole body is read as bytes before returning and converted
/// lossily, so a non-UTF-8 error page still reaches the decoder.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// `timeout` bounds each call end to end; `None` waits indefinitely.
    pub fn new(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(Some(crate::config::DEFAULT_TIMEOUT))
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ureq::Error> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let mut response = match method {
            HttpMethod::Get => with_headers(self.agent.get(&url), &headers).call(),
            HttpMethod::Delete => with_headers(self.agent.delete(&url), &headers).call(),
            HttpMethod::Post => send(with_headers(self.agent.post(&url), &headers), body),
            HttpMethod::Put => send(with_headers(self.agent.put(&url), &headers), body),
        }?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let bytes = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_vec()?;
        trace!(status = status.as_u16(), bytes = bytes.len(), "response received");
        let body = String::from_utf8_lossy(&bytes).into_owned();

        Ok(HttpResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn send(
    builder: ureq::RequestBuilder<ureq::typestate::WithBody>,
    body: Option<String>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}
