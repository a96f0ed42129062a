//! Request and response types for the Consul agent HTTP API.
//!
//! This crate encodes the JSON contract of the agent's `/v1/` endpoints as
//! Rust types. It performs no I/O; the `consul-client` crate moves these
//! types over the wire and the conformance mock agent serves them back.
//!
//! # Endpoints covered
//!
//! | Method | Path | Type |
//! |--------|------|------|
//! | PUT | `/v1/acl/create` | [`AclEntry`] → [`AclCreated`] |
//! | PUT | `/v1/acl/update` | [`AclEntry`] |
//! | GET | `/v1/acl/info/{id}` | → `[AclEntry]` |
//! | GET | `/v1/acl/list` | → `[AclEntry]` |
//! | GET | `/v1/agent/self` | → [`AgentSelf`] |
//! | GET | `/v1/agent/checks` | → `{id: AgentCheck}` |
//! | GET | `/v1/agent/services` | → `{id: AgentService}` |
//! | GET | `/v1/agent/members` | → `[AgentMember]` |
//! | PUT | `/v1/agent/service/register` | [`AgentServiceRegistration`] |
//! | PUT | `/v1/agent/check/register` | [`AgentCheckRegistration`] |
//! | PUT | `/v1/agent/check/update/{id}` | [`CheckUpdate`] |
//! | GET | `/v1/agent/monitor` | → text lines ([`LogLevel`]) |
//! | PUT | `/v1/catalog/register` | [`CatalogRegistration`] |
//! | PUT | `/v1/catalog/deregister` | [`CatalogDeregistration`] |
//! | GET | `/v1/catalog/nodes` | → `[Node]` |
//! | GET | `/v1/catalog/node/{name}` | → [`CatalogNode`] |
//! | GET | `/v1/catalog/service/{name}` | → `[CatalogService]` |
//! | GET/PUT/DELETE | `/v1/kv/{key}` | [`KvPair`] |
//! | PUT | `/v1/txn` | `[TxnOp]` → [`TxnResponse`] |
//!
//! Durations inside check definitions travel as Go duration strings; see
//! [`duration`].

pub mod acl;
pub mod agent;
pub mod catalog;
pub mod duration;
pub mod kv;

pub use acl::{AclCreated, AclEntry, AclType};
pub use agent::{
    AgentCheck, AgentCheckRegistration, AgentMember, AgentSelf, AgentService,
    AgentServiceCheck, AgentServiceRegistration, CheckUpdate, HealthStatus, LogLevel, TtlStatus,
};
pub use catalog::{CatalogDeregistration, CatalogNode, CatalogRegistration, CatalogService, Node};
pub use duration::DurationParseError;
pub use kv::{KvPair, KvTxnOp, KvTxnVerb, TxnError, TxnOp, TxnResponse, TxnResult};
