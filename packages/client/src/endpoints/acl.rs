//! Legacy ACL tokens: `/v1/acl/...`.

use consul_api::{AclCreated, AclEntry};
use tokio_util::sync::CancellationToken;

use super::segment;
use crate::client::ConsulClient;
use crate::error::ClientError;
use crate::options::{QueryOptions, WriteOptions};
use crate::policy::ResponsePolicy;
use crate::result::{QueryResult, WriteResult};

/// ACL operations. Obtained from [`ConsulClient::acl`].
#[derive(Debug, Clone, Copy)]
pub struct Acl<'a> {
    client: &'a ConsulClient,
}

impl<'a> Acl<'a> {
    pub(crate) fn new(client: &'a ConsulClient) -> Self {
        Self { client }
    }

    /// Create a token; `response` is the new token ID.
    pub async fn create(
        &self,
        entry: &AclEntry,
        opts: &WriteOptions,
        cancel: &CancellationToken,
    ) -> Result<WriteResult<String>, ClientError> {
        let res = self
            .client
            .put("/v1/acl/create")
            .write_options(opts)
            .policy(ResponsePolicy::Strict)
            .json(entry)?
            .write::<AclCreated>(cancel)
            .await?;
        Ok(res.map(|created| created.id))
    }

    /// Replace the name, type and rules of the token `entry.id`.
    pub async fn update(
        &self,
        entry: &AclEntry,
        opts: &WriteOptions,
        cancel: &CancellationToken,
    ) -> Result<WriteResult, ClientError> {
        if entry.id.is_empty() {
            return Err(ClientError::InvalidRequest("ACL update needs a token ID".into()));
        }
        self.client
            .put("/v1/acl/update")
            .write_options(opts)
            .policy(ResponsePolicy::Strict)
            .json(entry)?
            .write_empty(cancel)
            .await
    }

    pub async fn destroy(
        &self,
        id: &str,
        opts: &WriteOptions,
        cancel: &CancellationToken,
    ) -> Result<WriteResult<bool>, ClientError> {
        self.client
            .put(format!("/v1/acl/destroy/{}", segment(id)))
            .write_options(opts)
            .write(cancel)
            .await
    }

    /// Copy the token `id`; `response` is the new token's ID.
    pub async fn clone_token(
        &self,
        id: &str,
        opts: &WriteOptions,
        cancel: &CancellationToken,
    ) -> Result<WriteResult<String>, ClientError> {
        let res = self
            .client
            .put(format!("/v1/acl/clone/{}", segment(id)))
            .write_options(opts)
            .write::<AclCreated>(cancel)
            .await?;
        Ok(res.map(|created| created.id))
    }

    /// `response` is `None` when no such token exists.
    pub async fn info(
        &self,
        id: &str,
        opts: &QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<QueryResult<AclEntry>, ClientError> {
        let res = self
            .client
            .get(format!("/v1/acl/info/{}", segment(id)))
            .query_options(opts)
            .query::<Option<Vec<AclEntry>>>(cancel)
            .await?;
        Ok(res.and_then(|entries| entries.and_then(|e| e.into_iter().next())))
    }

    pub async fn list(
        &self,
        opts: &QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<QueryResult<Vec<AclEntry>>, ClientError> {
        self.client
            .get("/v1/acl/list")
            .query_options(opts)
            .query(cancel)
            .await
    }
}
