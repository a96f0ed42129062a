//! Cluster catalog: `/v1/catalog/...`.

use std::collections::HashMap;

use consul_api::{CatalogDeregistration, CatalogNode, CatalogRegistration, CatalogService, Node};
use tokio_util::sync::CancellationToken;

use super::segment;
use crate::client::ConsulClient;
use crate::error::ClientError;
use crate::options::{QueryOptions, WriteOptions};
use crate::policy::ResponsePolicy;
use crate::result::{QueryResult, WriteResult};

/// Catalog operations. Obtained from [`ConsulClient::catalog`].
#[derive(Debug, Clone, Copy)]
pub struct Catalog<'a> {
    client: &'a ConsulClient,
}

impl<'a> Catalog<'a> {
    pub(crate) fn new(client: &'a ConsulClient) -> Self {
        Self { client }
    }

    pub async fn register(
        &self,
        registration: &CatalogRegistration,
        opts: &WriteOptions,
        cancel: &CancellationToken,
    ) -> Result<WriteResult, ClientError> {
        self.client
            .put("/v1/catalog/register")
            .write_options(opts)
            .policy(ResponsePolicy::Strict)
            .json(registration)?
            .write_empty(cancel)
            .await
    }

    pub async fn deregister(
        &self,
        deregistration: &CatalogDeregistration,
        opts: &WriteOptions,
        cancel: &CancellationToken,
    ) -> Result<WriteResult, ClientError> {
        self.client
            .put("/v1/catalog/deregister")
            .write_options(opts)
            .policy(ResponsePolicy::Strict)
            .json(deregistration)?
            .write_empty(cancel)
            .await
    }

    /// Every datacenter known to the servers, nearest first.
    pub async fn datacenters(
        &self,
        cancel: &CancellationToken,
    ) -> Result<QueryResult<Vec<String>>, ClientError> {
        self.client.get("/v1/catalog/datacenters").query(cancel).await
    }

    pub async fn nodes(
        &self,
        opts: &QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<QueryResult<Vec<Node>>, ClientError> {
        self.client
            .get("/v1/catalog/nodes")
            .query_options(opts)
            .query(cancel)
            .await
    }

    /// A node and its services; `response` is `None` for an unknown node.
    pub async fn node(
        &self,
        name: &str,
        opts: &QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<QueryResult<CatalogNode>, ClientError> {
        let res = self
            .client
            .get(format!("/v1/catalog/node/{}", segment(name)))
            .query_options(opts)
            .query::<Option<CatalogNode>>(cancel)
            .await?;
        Ok(res.and_then(|node| node))
    }

    /// Service names mapped to the union of their tags.
    pub async fn services(
        &self,
        opts: &QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<QueryResult<HashMap<String, Vec<String>>>, ClientError> {
        self.client
            .get("/v1/catalog/services")
            .query_options(opts)
            .query(cancel)
            .await
    }

    /// Instances of `service`, optionally only those carrying `tag`.
    pub async fn service(
        &self,
        service: &str,
        tag: Option<&str>,
        opts: &QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<QueryResult<Vec<CatalogService>>, ClientError> {
        let mut req = self
            .client
            .get(format!("/v1/catalog/service/{}", segment(service)))
            .query_options(opts);
        if let Some(tag) = tag.filter(|t| !t.is_empty()) {
            req = req.param("tag", tag);
        }
        req.query(cancel).await
    }
}
