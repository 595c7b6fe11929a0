//! One HTTP request and its eventual response.
//!
//! # Design
//! `HttpCall` is a cheap handle over shared state so a threaded invocation
//! can run against the same call the caller holds. The URI is split into its
//! parts once, at construction, and never re-parsed. The only things that
//! change afterwards are the user agent override, the recorded form data and
//! the stored response; they sit behind one mutex that is never held while
//! the transport runs or the callback executes.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread::{self, JoinHandle};

use base64::Engine as _;
use tracing::info;
use url::Url;
use uuid::Uuid;

use crate::config::{CallOptions, Callback, Config};
use crate::error::{Error, Result};
use crate::http::{FormData, HttpRequest, HttpResponse, Method};
use crate::logging::truncate;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const LOG_CUTOFF: usize = 512;

/// A single configured HTTP request plus its eventual response.
#[derive(Clone)]
pub struct HttpCall {
    inner: Arc<Inner>,
}

struct Inner {
    id: Uuid,
    method: Method,
    target: Target,
    threaded: bool,
    callback: Option<Callback>,
    config: Config,
    request: OnceLock<HttpRequest>,
    state: Mutex<State>,
}

/// The parts of the URI the call was built from.
#[derive(Debug)]
struct Target {
    scheme: String,
    host: String,
    port: u16,
    path: String,
    query: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    user_agent: Option<String>,
    data: Option<FormData>,
    response: Option<HttpResponse>,
}

/// What `HttpCall::invoke` hands back.
#[derive(Debug)]
pub enum Invocation {
    /// The call ran on the current thread.
    Inline(HttpResponse),
    /// The call is running on its own thread.
    Threaded(CallHandle),
}

impl Invocation {
    /// Wait for the call if it is threaded and return its response.
    pub fn wait(self) -> Result<HttpResponse> {
        match self {
            Invocation::Inline(response) => Ok(response),
            Invocation::Threaded(handle) => handle.join(),
        }
    }
}

/// Handle to a call running on a spawned thread.
pub struct CallHandle {
    call: HttpCall,
    handle: JoinHandle<Result<HttpResponse>>,
}

impl CallHandle {
    /// The call being run.
    pub fn call(&self) -> &HttpCall {
        &self.call
    }

    /// True once the call thread has returned, callback included. Never
    /// blocks.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the call, including its callback, has finished.
    pub fn join(self) -> Result<HttpResponse> {
        self.handle
            .join()
            .map_err(|payload| Error::ThreadPanicked(panic_message(payload.as_ref())))?
    }
}

impl fmt::Debug for CallHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallHandle")
            .field("call", &self.call.id())
            .field("finished", &self.is_finished())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl HttpCall {
    /// Build a call for `method` against `uri`.
    ///
    /// The URI may carry `user:password@` credentials, which are sent as
    /// HTTP basic auth. Fails with `InvalidUri` if the URI does not parse or
    /// has no host and port to connect to.
    pub fn new(method: Method, uri: &str, options: CallOptions) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidUri {
            uri: uri.to_string(),
            reason,
        };
        let parsed = Url::parse(uri).map_err(|e| invalid(e.to_string()))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| invalid("no host".to_string()))?
            .to_string();
        let port = parsed
            .port_or_known_default()
            .ok_or_else(|| invalid(format!("no port known for scheme '{}'", parsed.scheme())))?;

        let target = Target {
            scheme: parsed.scheme().to_string(),
            host,
            port,
            path: parsed.path().to_string(),
            query: parsed.query().map(str::to_string),
            username: Some(parsed.username())
                .filter(|u| !u.is_empty())
                .map(str::to_string),
            password: parsed.password().map(str::to_string),
        };

        let CallOptions {
            threaded,
            callback,
            config,
        } = options;

        Ok(Self {
            inner: Arc::new(Inner {
                id: Uuid::new_v4(),
                method,
                target,
                threaded,
                callback,
                config,
                request: OnceLock::new(),
                state: Mutex::new(State::default()),
            }),
        })
    }

    pub fn get(uri: &str, options: CallOptions) -> Result<Self> {
        Self::new(Method::Get, uri, options)
    }

    pub fn put(uri: &str, options: CallOptions) -> Result<Self> {
        Self::new(Method::Put, uri, options)
    }

    pub fn post(uri: &str, options: CallOptions) -> Result<Self> {
        Self::new(Method::Post, uri, options)
    }

    pub fn delete(uri: &str, options: CallOptions) -> Result<Self> {
        Self::new(Method::Delete, uri, options)
    }

    /// Run the call, inline or on a new thread depending on how it was built.
    ///
    /// `data` is only sent for POST. Calling this again re-sends the request
    /// and replaces the stored response.
    pub fn invoke(&self, data: Option<FormData>) -> Result<Invocation> {
        if self.inner.threaded {
            Ok(Invocation::Threaded(self.invoke_threaded(data)))
        } else {
            self.invoke_inline(data).map(Invocation::Inline)
        }
    }

    /// Run the call on a spawned thread and return without waiting.
    pub fn invoke_threaded(&self, data: Option<FormData>) -> CallHandle {
        let call = self.clone();
        let handle = thread::spawn(move || call.invoke_inline(data));
        CallHandle {
            call: self.clone(),
            handle,
        }
    }

    /// Run the call on the current thread: send the request, store the
    /// response, then run the callback.
    pub fn invoke_inline(&self, data: Option<FormData>) -> Result<HttpResponse> {
        info!(
            call = %self.inner.id,
            method = %self.inner.method,
            uri = %self.uri(),
            data = %loggable_data(data.as_ref()),
            "making request"
        );

        let request = self.prepare_request(data);
        let response = self.inner.config.transport().execute(&request)?;
        self.state().response = Some(response.clone());

        if response.is_success() {
            info!(
                call = %self.inner.id,
                status = response.status,
                message = %response.message,
                bytes = response.content_length(),
                body = %truncate(&response.body, LOG_CUTOFF),
                "response received"
            );
        } else {
            info!(
                call = %self.inner.id,
                status = response.status,
                message = %response.message,
                "response received: failed"
            );
        }

        if let Some(callback) = &self.inner.callback {
            info!(call = %self.inner.id, "invoking callback");
            callback(self);
        }

        Ok(response)
    }

    /// Copy the memoized request and apply headers, auth and form body.
    fn prepare_request(&self, data: Option<FormData>) -> HttpRequest {
        let target = &self.inner.target;
        let mut request = self.http_request().clone();
        let mut state = self.state();

        let user_agent = state
            .user_agent
            .clone()
            .unwrap_or_else(|| self.inner.config.user_agent().to_string());
        request.set_header("User-Agent", user_agent);

        if let Some(username) = &target.username {
            request.set_header(
                "Authorization",
                basic_auth(username, target.password.as_deref()),
            );
        }

        if self.inner.method == Method::Post {
            if let Some(data) = data {
                if !data.is_empty() {
                    request.set_header("Content-Type", FORM_CONTENT_TYPE);
                    request.body = Some(data.encode());
                }
                state.data = Some(data);
            }
        }

        request
    }

    /// The method-specific request, built from `method` and `uri()` on first
    /// use.
    pub fn http_request(&self) -> &HttpRequest {
        self.inner
            .request
            .get_or_init(|| HttpRequest::new(self.inner.method, self.uri()))
    }

    /// True iff a response exists and its status is 2xx.
    pub fn is_ok(&self) -> bool {
        self.state()
            .response
            .as_ref()
            .is_some_and(HttpResponse::is_success)
    }

    pub fn is_error(&self) -> bool {
        !self.is_ok()
    }

    /// Fail with `HttpError` unless the call has a 2xx response.
    pub fn raise_on_error(&self) -> Result<()> {
        match &self.state().response {
            Some(response) if response.is_success() => Ok(()),
            Some(response) => Err(Error::HttpError {
                message: response.message.clone(),
                response: Some(Box::new(response.clone())),
            }),
            None => Err(Error::HttpError {
                message: "no response".to_string(),
                response: None,
            }),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        self.state().response.as_ref().map(|r| r.status)
    }

    pub fn status_message(&self) -> Option<String> {
        self.state().response.as_ref().map(|r| r.message.clone())
    }

    pub fn response(&self) -> Option<HttpResponse> {
        self.state().response.clone()
    }

    /// Form data sent by the last POST, if any.
    pub fn data(&self) -> Option<FormData> {
        self.state().data.clone()
    }

    /// The request URI rebuilt from its parts, without credentials. The port
    /// is left out when it is the scheme's default.
    pub fn uri(&self) -> String {
        let target = &self.inner.target;
        let mut uri = format!("{}://{}", target.scheme, target.host);
        if default_port(&target.scheme) != Some(target.port) {
            uri.push_str(&format!(":{}", target.port));
        }
        uri.push_str(&target.path);
        if let Some(query) = &target.query {
            uri.push('?');
            uri.push_str(query);
        }
        uri
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn method(&self) -> Method {
        self.inner.method
    }

    pub fn scheme(&self) -> &str {
        &self.inner.target.scheme
    }

    pub fn host(&self) -> &str {
        &self.inner.target.host
    }

    pub fn port(&self) -> u16 {
        self.inner.target.port
    }

    pub fn path(&self) -> &str {
        &self.inner.target.path
    }

    pub fn query(&self) -> Option<&str> {
        self.inner.target.query.as_deref()
    }

    pub fn username(&self) -> Option<&str> {
        self.inner.target.username.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.inner.target.password.as_deref()
    }

    pub fn is_threaded(&self) -> bool {
        self.inner.threaded
    }

    /// The user agent this call will send.
    pub fn user_agent(&self) -> String {
        self.state()
            .user_agent
            .clone()
            .unwrap_or_else(|| self.inner.config.user_agent().to_string())
    }

    /// Override the configured user agent for this call only.
    pub fn set_user_agent(&self, user_agent: impl Into<String>) {
        self.state().user_agent = Some(user_agent.into());
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for HttpCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpCall")
            .field("id", &self.inner.id)
            .field("method", &self.inner.method)
            .field("uri", &self.uri())
            .field("threaded", &self.inner.threaded)
            .field("status", &self.status_code())
            .finish_non_exhaustive()
    }
}

fn basic_auth(username: &str, password: Option<&str>) -> String {
    let credentials = format!("{username}:{}", password.unwrap_or_default());
    format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(credentials)
    )
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" | "ws" => Some(80),
        "https" | "wss" => Some(443),
        "ftp" => Some(21),
        _ => None,
    }
}

fn loggable_data(data: Option<&FormData>) -> String {
    match data {
        Some(data) => data
            .iter()
            .map(|(key, value)| format!("{key}={}", truncate(value, LOG_CUTOFF)))
            .collect::<Vec<_>>()
            .join(","),
        None => "none".to_string(),
    }
}
