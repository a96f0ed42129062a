//! Async client for the Consul agent HTTP API.
//!
//! The core of the crate is a small request pipeline shared by every
//! endpoint:
//!
//! 1. an endpoint wrapper (or the caller) builds a [`Request`]: method, path,
//!    parameters, [`QueryOptions`] or [`WriteOptions`], optional body and a
//!    [`ResponsePolicy`];
//! 2. the options are folded into a sorted, percent-encoded query string
//!    ([`query`]);
//! 3. the request is sent with the ACL token header and a transport timeout
//!    stretched to cover blocking reads ([`blocking`]);
//! 4. the status is classified by the policy and the body decoded into a
//!    [`QueryResult`] or [`WriteResult`], or turned into a [`ClientError`].
//!
//! Blocking queries are ordinary reads with `wait_index` set: the agent holds
//! the request until the data changes or the wait elapses. Pass
//! `result.meta.last_index` back in to wait for the next change. Every call
//! takes a [`CancellationToken`] so a long poll can be abandoned at any time.
//!
//! ```no_run
//! use consul_client::{CancellationToken, ClientConfig, ConsulClient, QueryOptions};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ConsulClient::new(ClientConfig::from_env()?)?;
//! let cancel = CancellationToken::new();
//!
//! let mut opts = QueryOptions::new();
//! loop {
//!     let res = client.kv().get("service/web/leader", &opts, &cancel).await?;
//!     println!("{:?}", res.response.and_then(|p| p.value));
//!     opts = opts.wait_index(res.meta.last_index);
//! }
//! # }
//! ```

pub mod blocking;
mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod options;
pub mod policy;
pub mod query;
mod request;
pub mod result;
mod stream;

pub use client::ConsulClient;
pub use config::{BasicAuth, ClientConfig};
pub use endpoints::{Acl, Agent, Catalog, Kv};
pub use error::{ClientError, ConfigError};
pub use options::{ConsistencyMode, QueryOptions, WriteOptions};
pub use policy::{Disposition, ResponsePolicy};
pub use request::{Request, TOKEN_HEADER};
pub use result::{QueryMeta, QueryResult, WriteMeta, WriteResult};
pub use stream::LineStream;

pub use consul_api as api;
pub use tokio_util::sync::CancellationToken;
