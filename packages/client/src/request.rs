//! Request descriptors and their execution.
//!
//! A [`Request`] is built fresh for every call by an endpoint wrapper (or by
//! hand through [`ConsulClient::get`](crate::ConsulClient::get) and friends),
//! then consumed by one of the terminal methods:
//!
//! | Terminal | Envelope | Used for |
//! |----------|----------|----------|
//! | [`Request::query`] | [`QueryResult<T>`] | reads, including blocking reads |
//! | [`Request::write`] | [`WriteResult<T>`] | writes that return a body |
//! | [`Request::write_empty`] | [`WriteResult<()>`] | writes whose body is ignored |
//! | [`Request::open_stream`] | [`LineStream`] | open-ended text bodies |
//!
//! Every terminal takes a [`CancellationToken`], observed before dispatch,
//! while waiting for headers and while reading the body.

use std::time::{Duration, Instant};

use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::blocking::{request_timeout, SERVER_DEFAULT_WAIT};
use crate::client::ConsulClient;
use crate::error::ClientError;
use crate::options::{QueryOptions, WriteOptions};
use crate::policy::{Disposition, ResponsePolicy};
use crate::query::{self, Params};
use crate::result::{QueryMeta, QueryResult, WriteMeta, WriteResult};
use crate::stream::LineStream;

/// Header carrying the ACL token.
pub const TOKEN_HEADER: &str = "X-Consul-Token";

#[derive(Debug, Clone, Default)]
enum Options {
    #[default]
    None,
    Query(QueryOptions),
    Write(WriteOptions),
}

enum Body {
    Json(Vec<u8>),
    Bytes(Bytes),
    Stream(reqwest::Body),
}

/// One operation against the agent: method, path, parameters, options,
/// optional body and the policy used to classify the response.
pub struct Request<'a> {
    client: &'a ConsulClient,
    method: Method,
    path: String,
    params: Params,
    options: Options,
    body: Option<Body>,
    policy: ResponsePolicy,
}

impl<'a> Request<'a> {
    pub(crate) fn new(client: &'a ConsulClient, method: Method, path: impl Into<String>) -> Self {
        let mut params = Params::new();
        if let Some(dc) = client.config().datacenter.as_deref().filter(|dc| !dc.is_empty()) {
            params.insert("dc".into(), dc.to_string());
        }
        Self {
            client,
            method,
            path: path.into(),
            params,
            options: Options::None,
            body: None,
            policy: ResponsePolicy::default(),
        }
    }

    pub fn query_options(mut self, opts: &QueryOptions) -> Self {
        self.options = Options::Query(opts.clone());
        self
    }

    pub fn write_options(mut self, opts: &WriteOptions) -> Self {
        self.options = Options::Write(opts.clone());
        self
    }

    /// Add `key=value` to the query string.
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(key.into(), value.to_string());
        self
    }

    /// Add a bare `key` to the query string.
    pub fn flag(mut self, key: impl Into<String>) -> Self {
        self.params.insert(key.into(), String::new());
        self
    }

    /// JSON-encode `body` as the request body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ClientError> {
        let encoded = serde_json::to_vec(body).map_err(ClientError::Encode)?;
        self.body = Some(Body::Json(encoded));
        Ok(self)
    }

    /// Send `body` as-is.
    pub fn bytes(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(Body::Bytes(body.into()));
        self
    }

    /// Stream `body` as-is.
    pub fn stream_body(mut self, body: impl Into<reqwest::Body>) -> Self {
        self.body = Some(Body::Stream(body.into()));
        self
    }

    pub fn policy(mut self, policy: ResponsePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The query string this request will carry, without the leading `?`.
    pub fn encoded_query(&self) -> String {
        let mut params = self.params.clone();
        let config = self.client.config();
        match &self.options {
            Options::None => {}
            Options::Query(opts) => query::apply_query_options(&mut params, opts, config.wait_time),
            Options::Write(opts) => query::apply_write_options(&mut params, opts),
        }
        query::encode(&params)
    }

    /// Full target URL: agent address, path and query string.
    pub fn url(&self) -> Result<Url, ClientError> {
        if self.path.is_empty() || !self.path.starts_with('/') {
            return Err(ClientError::InvalidRequest(format!(
                "path must be absolute, got {:?}",
                self.path
            )));
        }
        let base = self.client.config().address.as_str().trim_end_matches('/');
        let query = self.encoded_query();
        let raw = if query.is_empty() {
            format!("{base}{}", self.path)
        } else {
            format!("{base}{}?{query}", self.path)
        };
        Url::parse(&raw).map_err(|e| ClientError::InvalidRequest(format!("{raw}: {e}")))
    }

    fn token(&self) -> Option<&str> {
        let per_call = match &self.options {
            Options::None => None,
            Options::Query(opts) => opts.token.as_deref(),
            Options::Write(opts) => opts.token.as_deref(),
        };
        per_call
            .filter(|t| !t.is_empty())
            .or_else(|| self.client.config().token.as_deref().filter(|t| !t.is_empty()))
    }

    /// Effective wait of a blocking read, `None` for anything else.
    fn blocking_wait(&self) -> Option<Duration> {
        match &self.options {
            Options::Query(opts) if opts.is_blocking() => Some(
                opts.wait_time
                    .or(self.client.config().wait_time)
                    .unwrap_or(SERVER_DEFAULT_WAIT),
            ),
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Terminals
    // -----------------------------------------------------------------------

    /// Execute a read and decode the body into `T`.
    pub async fn query<T: DeserializeOwned>(
        self,
        cancel: &CancellationToken,
    ) -> Result<QueryResult<T>, ClientError> {
        let policy = self.policy;
        let sent = self.send(cancel, true).await?;
        match policy.classify(sent.status) {
            Disposition::Decode => {
                let meta = QueryMeta::from_headers(sent.status, sent.elapsed, sent.response.headers())?;
                let body = read_body(sent.response, cancel).await?;
                let value = serde_json::from_slice(&body).map_err(ClientError::Decode)?;
                Ok(QueryResult { meta, response: Some(value) })
            }
            Disposition::Absent => {
                let meta = QueryMeta::from_headers(sent.status, sent.elapsed, sent.response.headers())?;
                Ok(QueryResult { meta, response: None })
            }
            Disposition::Fail => Err(sent.fail(cancel).await),
        }
    }

    /// Execute a write and decode the body into `T`.
    pub async fn write<T: DeserializeOwned>(
        self,
        cancel: &CancellationToken,
    ) -> Result<WriteResult<T>, ClientError> {
        let policy = self.policy;
        let sent = self.send(cancel, true).await?;
        let meta = WriteMeta {
            status_code: sent.status,
            request_time: sent.elapsed,
        };
        match policy.classify(sent.status) {
            Disposition::Decode => {
                let body = read_body(sent.response, cancel).await?;
                let value = serde_json::from_slice(&body).map_err(ClientError::Decode)?;
                Ok(WriteResult { meta, response: Some(value) })
            }
            Disposition::Absent => Ok(WriteResult { meta, response: None }),
            Disposition::Fail => Err(sent.fail(cancel).await),
        }
    }

    /// Execute a write whose response body carries nothing of interest.
    ///
    /// `response` is `Some(())` on success and `None` when the policy
    /// accepted the status as absent.
    pub async fn write_empty(self, cancel: &CancellationToken) -> Result<WriteResult, ClientError> {
        let policy = self.policy;
        let sent = self.send(cancel, true).await?;
        let meta = WriteMeta {
            status_code: sent.status,
            request_time: sent.elapsed,
        };
        match policy.classify(sent.status) {
            Disposition::Decode => Ok(WriteResult { meta, response: Some(()) }),
            Disposition::Absent => Ok(WriteResult { meta, response: None }),
            Disposition::Fail => Err(sent.fail(cancel).await),
        }
    }

    /// Open a streaming read. Any non-2xx status is a failure.
    ///
    /// No transport timeout applies to a stream; it lives until the body
    /// ends, the token is cancelled or the stream is dropped.
    pub async fn open_stream(self, cancel: &CancellationToken) -> Result<LineStream, ClientError> {
        let path = self.path.clone();
        let sent = self.send(cancel, false).await?;
        if !sent.status.is_success() {
            return Err(sent.fail(cancel).await);
        }
        Ok(LineStream::from_response(sent.response, cancel.clone(), path))
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    async fn send(self, cancel: &CancellationToken, timed: bool) -> Result<Sent, ClientError> {
        if cancel.is_cancelled() {
            return Err(ClientError::Cancelled);
        }

        let url = self.url()?;
        let config = self.client.config();
        let mut builder = self
            .client
            .http()
            .request(self.method.clone(), url)
            .header(reqwest::header::ACCEPT, "application/json");

        if timed {
            builder = builder.timeout(request_timeout(config.timeout, self.blocking_wait()));
        }
        if let Some(token) = self.token() {
            builder = builder.header(TOKEN_HEADER, token);
        }
        if let Some(auth) = &config.basic_auth {
            builder = builder.basic_auth(&auth.username, auth.password.as_deref());
        }
        builder = match self.body {
            Some(Body::Json(json)) => builder.header(CONTENT_TYPE, "application/json").body(json),
            Some(Body::Bytes(bytes)) => builder.body(bytes),
            Some(Body::Stream(body)) => builder.body(body),
            None => builder,
        };

        let started = Instant::now();
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            res = builder.send() => res?,
        };
        let elapsed = started.elapsed();
        let status = response.status();

        debug!(
            method = %self.method,
            path = %self.path,
            status = status.as_u16(),
            elapsed_ms = elapsed.as_millis() as u64,
            "request completed"
        );

        Ok(Sent {
            method: self.method,
            path: self.path,
            status,
            elapsed,
            response,
        })
    }
}

struct Sent {
    method: Method,
    path: String,
    status: StatusCode,
    elapsed: Duration,
    response: Response,
}

impl Sent {
    /// Read the body and turn it into a status failure.
    async fn fail(self, cancel: &CancellationToken) -> ClientError {
        let raw = match read_body(self.response, cancel).await {
            Ok(bytes) => bytes,
            Err(e) => return e,
        };
        let body = String::from_utf8_lossy(&raw).into_owned();
        warn!(
            method = %self.method,
            path = %self.path,
            status = self.status.as_u16(),
            body = %body,
            "request failed"
        );
        ClientError::Status {
            status: self.status,
            body,
            raw,
        }
    }
}

async fn read_body(response: Response, cancel: &CancellationToken) -> Result<Bytes, ClientError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ClientError::Cancelled),
        body = response.bytes() => body.map_err(ClientError::Transport),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::ClientConfig;

    fn client(config: ClientConfig) -> ConsulClient {
        ConsulClient::new(config).unwrap()
    }

    #[test]
    fn url_carries_client_datacenter_and_options() {
        let c = client(ClientConfig::default().with_datacenter("dc1"));
        let opts = QueryOptions::new()
            .datacenter("dc2")
            .wait_index(42)
            .wait_time(Duration::from_secs(10));
        let req = c.get("/v1/kv/foo").query_options(&opts);
        assert_eq!(req.encoded_query(), "dc=dc2&index=42&wait=10s");
        assert_eq!(
            req.url().unwrap().as_str(),
            "http://127.0.0.1:8500/v1/kv/foo?dc=dc2&index=42&wait=10s"
        );
    }

    #[test]
    fn endpoint_params_merge_with_defaults() {
        let c = client(ClientConfig::default().with_datacenter("dc1"));
        let req = c.get("/v1/kv/app").flag("recurse").param("separator", "/");
        assert_eq!(req.encoded_query(), "dc=dc1&recurse&separator=%2F");
    }

    #[test]
    fn url_without_params_has_no_question_mark() {
        let c = client(ClientConfig::default());
        let req = c.get("/v1/agent/self");
        assert_eq!(req.url().unwrap().as_str(), "http://127.0.0.1:8500/v1/agent/self");
    }

    #[test]
    fn relative_or_empty_path_is_invalid() {
        let c = client(ClientConfig::default());
        assert!(matches!(c.get("").url(), Err(ClientError::InvalidRequest(_))));
        assert!(matches!(c.get("v1/kv").url(), Err(ClientError::InvalidRequest(_))));
    }

    #[test]
    fn per_call_token_wins_over_client_token() {
        let c = client(ClientConfig::default().with_token("client-token"));
        let req = c.get("/v1/kv/a").query_options(&QueryOptions::new().token("call-token"));
        assert_eq!(req.token(), Some("call-token"));

        let req = c.get("/v1/kv/a").query_options(&QueryOptions::new().token(""));
        assert_eq!(req.token(), Some("client-token"));

        let c = client(ClientConfig::default().with_token(""));
        assert_eq!(c.put("/v1/kv/a").token(), None);
    }

    #[test]
    fn blocking_wait_falls_back_to_server_default() {
        let c = client(ClientConfig::default());
        let req = c.get("/v1/kv/a").query_options(&QueryOptions::new().wait_index(1));
        assert_eq!(req.blocking_wait(), Some(SERVER_DEFAULT_WAIT));

        let c = client(ClientConfig::default().with_wait_time(Duration::from_secs(30)));
        let req = c.get("/v1/kv/a").query_options(&QueryOptions::new().wait_index(1));
        assert_eq!(req.blocking_wait(), Some(Duration::from_secs(30)));

        let req = c.get("/v1/kv/a").query_options(&QueryOptions::new());
        assert_eq!(req.blocking_wait(), None);
    }

    #[test]
    fn unserialisable_body_is_an_encode_error() {
        use std::collections::HashMap;

        let c = client(ClientConfig::default());
        let mut bad: HashMap<(u8, u8), u8> = HashMap::new();
        bad.insert((1, 2), 3);
        assert!(matches!(c.put("/v1/txn").json(&bad), Err(ClientError::Encode(_))));
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_dispatch() {
        // Nothing listens on this port; a dispatched request would be a transport error.
        let c = client(ClientConfig::default().with_address("127.0.0.1:1").unwrap());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = c.get("/v1/agent/self").query::<serde_json::Value>(&cancel).await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
