//! Call configuration.
//!
//! # Design
//! Everything a call reads besides its own URI lives in a `Config` handed to
//! it at construction: the default `User-Agent` and the `Transport` used to
//! execute requests. There is no global mutable state, so tests can give
//! each call its own stub transport.

use std::fmt;
use std::sync::Arc;

use crate::call::HttpCall;
use crate::transport::{Transport, UreqTransport};

/// User agent sent when a call has no override.
pub const DEFAULT_USER_AGENT: &str = concat!("Suck/", env!("CARGO_PKG_VERSION"));

/// Invoked with the finished call once its response has been stored.
pub type Callback = Arc<dyn Fn(&HttpCall) + Send + Sync>;

/// Shared settings for calls.
#[derive(Clone)]
pub struct Config {
    user_agent: String,
    transport: Arc<dyn Transport>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            transport: Arc::new(UreqTransport::new()),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Route requests through `transport` instead of the network.
    pub fn with_transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

/// Per-call options: dispatch mode, completion callback and configuration.
#[derive(Clone, Default)]
pub struct CallOptions {
    pub(crate) threaded: bool,
    pub(crate) callback: Option<Callback>,
    pub(crate) config: Config,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `invoke` on a spawned thread. Defaults to `false`.
    pub fn threaded(mut self, threaded: bool) -> Self {
        self.threaded = threaded;
        self
    }

    pub fn callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&HttpCall) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }
}

impl fmt::Debug for CallOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallOptions")
            .field("threaded", &self.threaded)
            .field("callback", &self.callback.is_some())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_user_agent_carries_crate_version() {
        assert_eq!(DEFAULT_USER_AGENT, "Suck/1.0.1");
        assert_eq!(Config::default().user_agent(), DEFAULT_USER_AGENT);
    }

    #[test]
    fn options_default_to_inline_without_callback() {
        let options = CallOptions::default();
        assert!(!options.threaded);
        assert!(options.callback.is_none());
    }

    #[test]
    fn options_builder_sets_fields() {
        let options = CallOptions::new()
            .threaded(true)
            .callback(|_| {})
            .config(Config::new().with_user_agent("MySuck/1.0"));
        assert!(options.threaded);
        assert!(options.callback.is_some());
        assert_eq!(options.config.user_agent(), "MySuck/1.0");
    }
}
