//! Error types for HTTP calls.
//!
//! # Design
//! Construction problems (`InvalidUri`, `UnsupportedMethod`) surface
//! immediately. A non-2xx status is never an error on its own: the response
//! is stored on the call and only becomes `HttpError` when the caller asks
//! for it through `HttpCall::raise_on_error`. Network failures come straight
//! from ureq as `Transport`, with the original error kept as the source.

use crate::http::HttpResponse;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while building, dispatching or inspecting an `HttpCall`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The URI could not be parsed, or it names no host to connect to.
    #[error("invalid URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    /// The method name is not one of GET, PUT, POST or DELETE.
    #[error("unsupported HTTP method '{0}'")]
    UnsupportedMethod(String),

    /// Raised on demand when the call has no 2xx response.
    #[error("HTTP error: {message}")]
    HttpError {
        message: String,
        response: Option<Box<HttpResponse>>,
    },

    /// Connection, DNS, TLS or I/O failure reported by the HTTP client.
    #[error("transport failed: {0}")]
    Transport(#[from] ureq::Error),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// A threaded invocation panicked before it could finish.
    #[error("call thread panicked: {0}")]
    ThreadPanicked(String),

    /// The file logger could not be installed.
    #[error("could not install log sink: {0}")]
    LogSink(String),
}

impl Error {
    /// The response carried by an `HttpError`, if any.
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            Error::HttpError { response, .. } => response.as_deref(),
            _ => None,
        }
    }
}
