//! The client handle.

use std::sync::Arc;

use reqwest::Method;
use tokio::sync::OnceCell;

use crate::config::ClientConfig;
use crate::endpoints::{Acl, Agent, Catalog, Kv};
use crate::error::ConfigError;
use crate::request::Request;

/// A handle to one agent.
///
/// Cheap to clone; clones share the connection pool, the configuration and
/// the cached node name. Requests are independent of each other, so a handle
/// can be used from any number of tasks at once.
#[derive(Clone)]
pub struct ConsulClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    http: reqwest::Client,
    node_name: OnceCell<String>,
}

impl ConsulClient {
    /// Build a client and its HTTP connection pool from `config`.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()?;
        Ok(Self::with_http_client(config, http))
    }

    /// Use a caller-supplied HTTP client. `verify_tls` is then up to the caller.
    pub fn with_http_client(config: ClientConfig, http: reqwest::Client) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                config,
                http,
                node_name: OnceCell::new(),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    pub(crate) fn node_name_cell(&self) -> &OnceCell<String> {
        &self.inner.node_name
    }

    pub fn acl(&self) -> Acl<'_> {
        Acl::new(self)
    }

    pub fn agent(&self) -> Agent<'_> {
        Agent::new(self)
    }

    pub fn catalog(&self) -> Catalog<'_> {
        Catalog::new(self)
    }

    pub fn kv(&self) -> Kv<'_> {
        Kv::new(self)
    }

    pub fn get(&self, path: impl Into<String>) -> Request<'_> {
        Request::new(self, Method::GET, path)
    }

    pub fn put(&self, path: impl Into<String>) -> Request<'_> {
        Request::new(self, Method::PUT, path)
    }

    pub fn post(&self, path: impl Into<String>) -> Request<'_> {
        Request::new(self, Method::POST, path)
    }

    pub fn delete(&self, path: impl Into<String>) -> Request<'_> {
        Request::new(self, Method::DELETE, path)
    }
}

impl std::fmt::Debug for ConsulClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsulClient")
            .field("address", &self.inner.config.address.as_str())
            .field("datacenter", &self.inner.config.datacenter)
            .finish_non_exhaustive()
    }
}
