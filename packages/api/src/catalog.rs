//! Catalog types: `/v1/catalog/...`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::agent::{AgentCheck, AgentService};

/// A node in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct Node {
    #[serde(rename = "Node")]
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub tagged_addresses: HashMap<String, String>,
}

/// `GET /v1/catalog/node/{name}`: a node and every service on it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct CatalogNode {
    pub node: Node,
    #[serde(default)]
    pub services: HashMap<String, AgentService>,
}

/// One instance returned by `GET /v1/catalog/service/{name}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct CatalogService {
    pub node: String,
    pub address: String,
    #[serde(rename = "ServiceID")]
    pub service_id: String,
    pub service_name: String,
    #[serde(default)]
    pub service_address: String,
    #[serde(default)]
    pub service_tags: Option<Vec<String>>,
    #[serde(default)]
    pub service_port: u16,
    #[serde(default)]
    pub service_enable_tag_override: bool,
    #[serde(default)]
    pub service_meta: Option<HashMap<String, String>>,
}

/// Body of `PUT /v1/catalog/register`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct CatalogRegistration {
    pub node: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datacenter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<AgentService>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<AgentCheck>,
}

/// Body of `PUT /v1/catalog/deregister`.
///
/// With only `node` set the whole node is removed; `service_id` or
/// `check_id` narrow the removal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct CatalogDeregistration {
    pub node: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datacenter: Option<String>,
    #[serde(rename = "ServiceID", default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    #[serde(rename = "CheckID", default, skip_serializing_if = "Option::is_none")]
    pub check_id: Option<String>,
}
