//! Key/value store: `/v1/kv/{key}` and `/v1/txn`.

use consul_api::{KvPair, TxnOp, TxnResponse};
use tokio_util::sync::CancellationToken;

use super::key_path;
use crate::client::ConsulClient;
use crate::error::ClientError;
use crate::options::{QueryOptions, WriteOptions};
use crate::policy::ResponsePolicy;
use crate::result::{QueryResult, WriteResult};

/// KV operations. Obtained from [`ConsulClient::kv`].
#[derive(Debug, Clone, Copy)]
pub struct Kv<'a> {
    client: &'a ConsulClient,
}

impl<'a> Kv<'a> {
    pub(crate) fn new(client: &'a ConsulClient) -> Self {
        Self { client }
    }

    fn path(key: &str) -> String {
        format!("/v1/kv/{}", key_path(key))
    }

    /// Look up a single key. `response` is `None` when the key does not exist.
    pub async fn get(
        &self,
        key: &str,
        opts: &QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<QueryResult<KvPair>, ClientError> {
        let res = self
            .client
            .get(Self::path(key))
            .query_options(opts)
            .query::<Vec<KvPair>>(cancel)
            .await?;
        Ok(res.and_then(|pairs| pairs.into_iter().next()))
    }

    /// Every pair under `prefix`.
    pub async fn list(
        &self,
        prefix: &str,
        opts: &QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<QueryResult<Vec<KvPair>>, ClientError> {
        self.client
            .get(Self::path(prefix))
            .query_options(opts)
            .flag("recurse")
            .query(cancel)
            .await
    }

    /// Key names under `prefix`, optionally rolled up at `separator`.
    pub async fn keys(
        &self,
        prefix: &str,
        separator: Option<&str>,
        opts: &QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<QueryResult<Vec<String>>, ClientError> {
        let mut req = self
            .client
            .get(Self::path(prefix))
            .query_options(opts)
            .flag("keys");
        if let Some(sep) = separator.filter(|s| !s.is_empty()) {
            req = req.param("separator", sep);
        }
        req.query(cancel).await
    }

    /// Write a pair. `response` is the agent's verdict (always `true` for a plain put).
    pub async fn put(
        &self,
        pair: &KvPair,
        opts: &WriteOptions,
        cancel: &CancellationToken,
    ) -> Result<WriteResult<bool>, ClientError> {
        self.write_pair(pair, opts, None, cancel).await
    }

    /// Check-and-set: write only if the key's modify index still equals
    /// `pair.modify_index` (0 means "only if absent").
    pub async fn cas(
        &self,
        pair: &KvPair,
        opts: &WriteOptions,
        cancel: &CancellationToken,
    ) -> Result<WriteResult<bool>, ClientError> {
        self.write_pair(pair, opts, Some(("cas", pair.modify_index.to_string())), cancel)
            .await
    }

    /// Write the pair and take its lock for `pair.session`.
    pub async fn acquire(
        &self,
        pair: &KvPair,
        opts: &WriteOptions,
        cancel: &CancellationToken,
    ) -> Result<WriteResult<bool>, ClientError> {
        let session = session_of(pair)?;
        self.write_pair(pair, opts, Some(("acquire", session)), cancel).await
    }

    /// Write the pair and release the lock held by `pair.session`.
    pub async fn release(
        &self,
        pair: &KvPair,
        opts: &WriteOptions,
        cancel: &CancellationToken,
    ) -> Result<WriteResult<bool>, ClientError> {
        let session = session_of(pair)?;
        self.write_pair(pair, opts, Some(("release", session)), cancel).await
    }

    async fn write_pair(
        &self,
        pair: &KvPair,
        opts: &WriteOptions,
        extra: Option<(&str, String)>,
        cancel: &CancellationToken,
    ) -> Result<WriteResult<bool>, ClientError> {
        if pair.key.is_empty() {
            return Err(ClientError::InvalidRequest("KV pair has no key".into()));
        }
        let mut req = self
            .client
            .put(Self::path(&pair.key))
            .write_options(opts)
            .bytes(pair.value.clone().unwrap_or_default());
        if pair.flags != 0 {
            req = req.param("flags", pair.flags);
        }
        if let Some((key, value)) = extra {
            req = req.param(key, value);
        }
        req.write(cancel).await
    }

    /// Delete a key. A missing key is not an error.
    pub async fn delete(
        &self,
        key: &str,
        opts: &WriteOptions,
        cancel: &CancellationToken,
    ) -> Result<WriteResult<bool>, ClientError> {
        self.client
            .delete(Self::path(key))
            .write_options(opts)
            .write(cancel)
            .await
    }

    /// Delete a key only if its modify index still equals `pair.modify_index`.
    pub async fn delete_cas(
        &self,
        pair: &KvPair,
        opts: &WriteOptions,
        cancel: &CancellationToken,
    ) -> Result<WriteResult<bool>, ClientError> {
        self.client
            .delete(Self::path(&pair.key))
            .write_options(opts)
            .param("cas", pair.modify_index)
            .write(cancel)
            .await
    }

    /// Delete every key under `prefix`.
    pub async fn delete_tree(
        &self,
        prefix: &str,
        opts: &WriteOptions,
        cancel: &CancellationToken,
    ) -> Result<WriteResult<bool>, ClientError> {
        self.client
            .delete(Self::path(prefix))
            .write_options(opts)
            .flag("recurse")
            .write(cancel)
            .await
    }

    /// Apply `ops` atomically.
    ///
    /// A rolled-back transaction is not an error: the agent answers 409 and
    /// the decoded [`TxnResponse`] lists the failing operations.
    pub async fn txn(
        &self,
        ops: &[TxnOp],
        opts: &WriteOptions,
        cancel: &CancellationToken,
    ) -> Result<WriteResult<TxnResponse>, ClientError> {
        self.client
            .put("/v1/txn")
            .write_options(opts)
            .policy(ResponsePolicy::Transaction)
            .json(ops)?
            .write(cancel)
            .await
    }
}

fn session_of(pair: &KvPair) -> Result<String, ClientError> {
    pair.session
        .clone()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ClientError::InvalidRequest(format!("KV pair {:?} has no session", pair.key)))
}
