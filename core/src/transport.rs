//! Request execution.
//!
//! `Transport` is the single seam between an `HttpCall` and the network.
//! `UreqTransport` performs the real round-trip; any closure with the right
//! shape can stand in for it, which is how tests stub responses.

use std::fmt;

use ureq::typestate::WithBody;
use ureq::RequestBuilder;

use crate::error::Result;
use crate::http::{HttpRequest, HttpResponse, Method};

/// Executes an `HttpRequest` and returns the response as data.
///
/// Implementations must return non-2xx statuses as `Ok` responses; only
/// failures to complete the exchange are errors.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

impl<F> Transport for F
where
    F: Fn(&HttpRequest) -> Result<HttpResponse> + Send + Sync,
{
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self(request)
    }
}

/// Transport backed by a blocking `ureq::Agent`.
///
/// Redirects are not followed: a 3xx is the call's response. Bodies are read
/// in full whatever their size, and bytes that are not UTF-8 are replaced
/// with U+FFFD.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(0)
            .max_redirects_will_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let url = request.url.as_str();
        let body = request.body.as_deref();

        let sent = match request.method {
            Method::Get => with_headers(self.agent.get(url), &request.headers).call(),
            Method::Delete => with_headers(self.agent.delete(url), &request.headers).call(),
            Method::Post => send(with_headers(self.agent.post(url), &request.headers), body),
            Method::Put => send(with_headers(self.agent.put(url), &request.headers), body),
        };
        let mut response = sent?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let bytes = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()?;
        let body = String::from_utf8_lossy(&bytes).into_owned();

        Ok(HttpResponse {
            status: status.as_u16(),
            message: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

fn with_headers<B>(
    mut builder: RequestBuilder<B>,
    headers: &[(String, String)],
) -> RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn send(
    builder: RequestBuilder<WithBody>,
    body: Option<&str>,
) -> std::result::Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn closures_are_transports() {
        let transport = |req: &HttpRequest| -> Result<HttpResponse> {
            Ok(HttpResponse::new(200, "OK", req.url.clone()))
        };
        let resp = transport
            .execute(&HttpRequest::new(Method::Get, "http://test.com/a"))
            .unwrap();
        assert_eq!(resp.body, "http://test.com/a");
    }

    #[test]
    fn unreachable_host_is_a_transport_error() {
        // Port 9 (discard) on loopback is expected to refuse connections.
        let err = UreqTransport::new()
            .execute(&HttpRequest::new(Method::Get, "http://127.0.0.1:9/"))
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
