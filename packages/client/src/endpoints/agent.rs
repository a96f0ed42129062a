//! The local agent: `/v1/agent/...`.
//!
//! These calls talk to the agent the client is connected to rather than to
//! the servers, so they take no datacenter or consistency options.

use std::collections::HashMap;

use consul_api::{
    AgentCheck, AgentCheckRegistration, AgentMember, AgentSelf, AgentService,
    AgentServiceRegistration, CheckUpdate, LogLevel, TtlStatus,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::segment;
use crate::client::ConsulClient;
use crate::error::ClientError;
use crate::policy::ResponsePolicy;
use crate::result::{QueryResult, WriteResult};
use crate::stream::LineStream;

/// Agent operations. Obtained from [`ConsulClient::agent`].
#[derive(Debug, Clone, Copy)]
pub struct Agent<'a> {
    client: &'a ConsulClient,
}

impl<'a> Agent<'a> {
    pub(crate) fn new(client: &'a ConsulClient) -> Self {
        Self { client }
    }

    /// The agent's configuration and member record.
    pub async fn self_info(
        &self,
        cancel: &CancellationToken,
    ) -> Result<QueryResult<AgentSelf>, ClientError> {
        self.client.get("/v1/agent/self").query(cancel).await
    }

    /// The agent's node name.
    ///
    /// Read from `/v1/agent/self` on first use and cached for the lifetime of
    /// the client. Concurrent first callers share a single lookup; a failed
    /// lookup is not cached.
    pub async fn node_name(&self, cancel: &CancellationToken) -> Result<String, ClientError> {
        let name = self
            .client
            .node_name_cell()
            .get_or_try_init(|| async {
                let info = self.self_info(cancel).await?;
                let name = info
                    .response
                    .as_ref()
                    .and_then(|s| s.get("Config"))
                    .and_then(|config| config.get("NodeName"))
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| {
                        ClientError::MalformedResponse(
                            "agent self-description has no Config.NodeName".into(),
                        )
                    })?;
                debug!(node = name, "cached agent node name");
                Ok::<_, ClientError>(name.to_string())
            })
            .await?;
        Ok(name.clone())
    }

    pub async fn checks(
        &self,
        cancel: &CancellationToken,
    ) -> Result<QueryResult<HashMap<String, AgentCheck>>, ClientError> {
        self.client.get("/v1/agent/checks").query(cancel).await
    }

    pub async fn services(
        &self,
        cancel: &CancellationToken,
    ) -> Result<QueryResult<HashMap<String, AgentService>>, ClientError> {
        self.client.get("/v1/agent/services").query(cancel).await
    }

    /// Gossip members of the LAN pool, or of the WAN pool with `wan`.
    pub async fn members(
        &self,
        wan: bool,
        cancel: &CancellationToken,
    ) -> Result<QueryResult<Vec<AgentMember>>, ClientError> {
        let mut req = self.client.get("/v1/agent/members");
        if wan {
            req = req.param("wan", 1);
        }
        req.query(cancel).await
    }

    pub async fn service_register(
        &self,
        service: &AgentServiceRegistration,
        cancel: &CancellationToken,
    ) -> Result<WriteResult, ClientError> {
        self.client
            .put("/v1/agent/service/register")
            .policy(ResponsePolicy::Strict)
            .json(service)?
            .write_empty(cancel)
            .await
    }

    pub async fn service_deregister(
        &self,
        service_id: &str,
        cancel: &CancellationToken,
    ) -> Result<WriteResult, ClientError> {
        self.client.put(format!("/v1/agent/service/deregister/{}", segment(service_id)))
            .write_empty(cancel)
            .await
    }

    /// Mark a TTL check as passing.
    pub async fn pass_ttl(
        &self,
        check_id: &str,
        note: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<WriteResult, ClientError> {
        self.legacy_ttl(TtlStatus::Pass, check_id, note, cancel).await
    }

    pub async fn warn_ttl(
        &self,
        check_id: &str,
        note: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<WriteResult, ClientError> {
        self.legacy_ttl(TtlStatus::Warn, check_id, note, cancel).await
    }

    pub async fn fail_ttl(
        &self,
        check_id: &str,
        note: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<WriteResult, ClientError> {
        self.legacy_ttl(TtlStatus::Critical, check_id, note, cancel).await
    }

    async fn legacy_ttl(
        &self,
        status: TtlStatus,
        check_id: &str,
        note: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<WriteResult, ClientError> {
        let mut req = self.client.put(format!(
            "/v1/agent/check/{}/{}",
            status.legacy_segment(),
            segment(check_id)
        ));
        if let Some(note) = note.filter(|n| !n.is_empty()) {
            req = req.param("note", note);
        }
        req.write_empty(cancel).await
    }

    /// Set a TTL check's status and output in one call.
    pub async fn update_ttl(
        &self,
        check_id: &str,
        output: &str,
        status: TtlStatus,
        cancel: &CancellationToken,
    ) -> Result<WriteResult, ClientError> {
        let update = CheckUpdate {
            status: status.status(),
            output: output.to_string(),
        };
        self.client
            .put(format!("/v1/agent/check/update/{}", segment(check_id)))
            .json(&update)?
            .write_empty(cancel)
            .await
    }

    pub async fn check_register(
        &self,
        check: &AgentCheckRegistration,
        cancel: &CancellationToken,
    ) -> Result<WriteResult, ClientError> {
        self.client
            .put("/v1/agent/check/register")
            .policy(ResponsePolicy::Strict)
            .json(check)?
            .write_empty(cancel)
            .await
    }

    pub async fn check_deregister(
        &self,
        check_id: &str,
        cancel: &CancellationToken,
    ) -> Result<WriteResult, ClientError> {
        self.client.put(format!("/v1/agent/check/deregister/{}", segment(check_id)))
            .write_empty(cancel)
            .await
    }

    /// Ask the agent to join the cluster member at `addr`.
    pub async fn join(
        &self,
        addr: &str,
        wan: bool,
        cancel: &CancellationToken,
    ) -> Result<WriteResult, ClientError> {
        let mut req = self.client.put(format!("/v1/agent/join/{}", segment(addr)));
        if wan {
            req = req.param("wan", 1);
        }
        req.write_empty(cancel).await
    }

    /// Force a failed member into the `left` state.
    pub async fn force_leave(
        &self,
        node: &str,
        cancel: &CancellationToken,
    ) -> Result<WriteResult, ClientError> {
        self.client.put(format!("/v1/agent/force-leave/{}", segment(node)))
            .write_empty(cancel)
            .await
    }

    /// Gracefully leave the cluster and shut the agent down.
    pub async fn leave(&self, cancel: &CancellationToken) -> Result<WriteResult, ClientError> {
        self.client.put("/v1/agent/leave").write_empty(cancel).await
    }

    pub async fn reload(&self, cancel: &CancellationToken) -> Result<WriteResult, ClientError> {
        self.client.put("/v1/agent/reload").write_empty(cancel).await
    }

    pub async fn enable_service_maintenance(
        &self,
        service_id: &str,
        reason: &str,
        cancel: &CancellationToken,
    ) -> Result<WriteResult, ClientError> {
        self.client.put(format!("/v1/agent/service/maintenance/{}", segment(service_id)))
            .param("enable", true)
            .param("reason", reason)
            .write_empty(cancel)
            .await
    }

    pub async fn disable_service_maintenance(
        &self,
        service_id: &str,
        cancel: &CancellationToken,
    ) -> Result<WriteResult, ClientError> {
        self.client.put(format!("/v1/agent/service/maintenance/{}", segment(service_id)))
            .param("enable", false)
            .write_empty(cancel)
            .await
    }

    pub async fn enable_node_maintenance(
        &self,
        reason: &str,
        cancel: &CancellationToken,
    ) -> Result<WriteResult, ClientError> {
        self.client.put("/v1/agent/maintenance")
            .param("enable", true)
            .param("reason", reason)
            .write_empty(cancel)
            .await
    }

    pub async fn disable_node_maintenance(
        &self,
        cancel: &CancellationToken,
    ) -> Result<WriteResult, ClientError> {
        self.client.put("/v1/agent/maintenance")
            .param("enable", false)
            .write_empty(cancel)
            .await
    }

    /// Stream the agent's log at `level` and above.
    ///
    /// The stream stays open until the agent closes it, `cancel` fires, or
    /// the returned [`LineStream`] is closed or dropped.
    pub async fn monitor(
        &self,
        level: LogLevel,
        cancel: &CancellationToken,
    ) -> Result<LineStream, ClientError> {
        self.client
            .get("/v1/agent/monitor")
            .param("loglevel", level)
            .open_stream(cancel)
            .await
    }
}
