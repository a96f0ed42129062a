//! Route handlers of the mock agent.
//!
//! Only as much of the agent is modelled as the client tests need: KV with
//! blocking reads and transactions, the local agent endpoints, legacy ACLs
//! and a one-node catalog. Every read carries `X-Consul-Index`,
//! `X-Consul-KnownLeader` and `X-Consul-LastContact`.

use std::collections::{BTreeSet, HashMap};
use std::convert::Infallible;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use consul_api::{
    duration, AclCreated, AclEntry, AgentCheck, AgentCheckRegistration, AgentMember, AgentService,
    AgentServiceRegistration, CatalogDeregistration, CatalogNode, CatalogRegistration,
    CatalogService, CheckUpdate, HealthStatus, KvPair, KvTxnVerb, LogLevel, TxnError, TxnOp,
    TxnResponse, TxnResult,
};
use futures::StreamExt;
use serde::Serialize;
use serde_json::json;

use crate::{lock, AgentState, NODE_NAME, ROOT_TOKEN};

type Shared = State<Arc<AgentState>>;
type Params = Query<HashMap<String, String>>;

/// Server-side default for blocking reads without `wait`.
const DEFAULT_WAIT: Duration = Duration::from_secs(300);

pub(crate) fn router(state: Arc<AgentState>) -> Router {
    Router::new()
        // KV
        .route("/v1/kv/{*key}", get(kv_get).put(kv_put).delete(kv_delete))
        .route("/v1/txn", put(txn))
        // Agent
        .route("/v1/agent/self", get(agent_self))
        .route("/v1/agent/members", get(agent_members))
        .route("/v1/agent/checks", get(agent_checks))
        .route("/v1/agent/services", get(agent_services))
        .route("/v1/agent/service/register", put(service_register))
        .route("/v1/agent/service/deregister/{id}", put(service_deregister))
        .route("/v1/agent/service/maintenance/{id}", put(service_maintenance))
        .route("/v1/agent/check/register", put(check_register))
        .route("/v1/agent/check/deregister/{id}", put(check_deregister))
        .route("/v1/agent/check/update/{id}", put(check_update))
        .route("/v1/agent/check/{action}/{id}", put(check_legacy_ttl))
        .route("/v1/agent/join/{addr}", put(empty_ok))
        .route("/v1/agent/force-leave/{node}", put(empty_ok))
        .route("/v1/agent/leave", put(empty_ok))
        .route("/v1/agent/reload", put(empty_ok))
        .route("/v1/agent/maintenance", put(node_maintenance))
        .route("/v1/agent/monitor", get(monitor))
        // ACL
        .route("/v1/acl/create", put(acl_create))
        .route("/v1/acl/update", put(acl_update))
        .route("/v1/acl/destroy/{id}", put(acl_destroy))
        .route("/v1/acl/clone/{id}", put(acl_clone))
        .route("/v1/acl/info/{id}", get(acl_info))
        .route("/v1/acl/list", get(acl_list))
        // Catalog
        .route("/v1/catalog/register", put(catalog_register))
        .route("/v1/catalog/deregister", put(catalog_deregister))
        .route("/v1/catalog/datacenters", get(catalog_datacenters))
        .route("/v1/catalog/nodes", get(catalog_nodes))
        .route("/v1/catalog/node/{name}", get(catalog_node))
        .route("/v1/catalog/services", get(catalog_services))
        .route("/v1/catalog/service/{name}", get(catalog_service))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn with_meta(state: &AgentState, mut resp: Response) -> Response {
    let headers = resp.headers_mut();
    if let Ok(v) = HeaderValue::from_str(&state.current_index().to_string()) {
        headers.insert("x-consul-index", v);
    }
    headers.insert("x-consul-knownleader", HeaderValue::from_static("true"));
    headers.insert("x-consul-lastcontact", HeaderValue::from_static("0"));
    resp
}

fn indexed<T: Serialize>(state: &AgentState, body: &T) -> Response {
    with_meta(state, Json(body).into_response())
}

fn not_found(state: &AgentState) -> Response {
    with_meta(state, StatusCode::NOT_FOUND.into_response())
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, message.into()).into_response()
}

fn permission_denied() -> Response {
    error(StatusCode::FORBIDDEN, "Permission denied")
}

fn is_root(headers: &HeaderMap) -> bool {
    headers
        .get("x-consul-token")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|t| t == ROOT_TOKEN)
}

/// Hold a blocking read until the index moves past `index` or `wait` elapses.
async fn block_on_index(state: &AgentState, params: &HashMap<String, String>) {
    let Some(index) = params.get("index").and_then(|i| i.parse::<u64>().ok()) else {
        return;
    };
    let wait = params
        .get("wait")
        .and_then(|w| duration::parse(w).ok())
        .unwrap_or(DEFAULT_WAIT);

    let mut rx = state.index.subscribe();
    let _ = tokio::time::timeout(wait, async {
        loop {
            let current = *rx.borrow_and_update();
            if current > index {
                break;
            }
            if rx.changed().await.is_err() {
                break;
            }
        }
    })
    .await;
}

async fn empty_ok() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// KV
// ---------------------------------------------------------------------------

/// Insert or replace a pair, stamping it with a fresh index.
pub(crate) fn store_pair(state: &AgentState, key: &str, value: Vec<u8>, flags: u64) -> u64 {
    let mut kv = lock(&state.kv);
    let index = state.bump_index();
    let create_index = kv.get(key).map_or(index, |p| p.create_index);
    kv.insert(
        key.to_string(),
        KvPair {
            key: key.to_string(),
            create_index,
            modify_index: index,
            lock_index: 0,
            flags,
            value: Some(value),
            session: None,
        },
    );
    index
}

async fn kv_get(State(state): Shared, Path(key): Path<String>, Query(params): Params) -> Response {
    block_on_index(&state, &params).await;

    let kv = lock(&state.kv);
    if params.contains_key("keys") {
        let separator = params.get("separator").filter(|s| !s.is_empty());
        let keys: BTreeSet<String> = kv
            .keys()
            .filter(|k| k.starts_with(&key))
            .map(|k| match separator {
                Some(sep) => match k[key.len()..].find(sep.as_str()) {
                    Some(pos) => k[..key.len() + pos + sep.len()].to_string(),
                    None => k.clone(),
                },
                None => k.clone(),
            })
            .collect();
        if keys.is_empty() {
            return not_found(&state);
        }
        return indexed(&state, &keys);
    }

    let pairs: Vec<&KvPair> = if params.contains_key("recurse") {
        kv.range(key.clone()..)
            .take_while(|(k, _)| k.starts_with(&key))
            .map(|(_, p)| p)
            .collect()
    } else {
        kv.get(&key).into_iter().collect()
    };
    if pairs.is_empty() {
        return not_found(&state);
    }
    indexed(&state, &pairs)
}

async fn kv_put(
    State(state): Shared,
    Path(key): Path<String>,
    Query(params): Params,
    body: Bytes,
) -> Response {
    if key.starts_with("locked/") {
        // Echo the rejected value so clients see arbitrary bytes in a failure body.
        let mut message = format!("key {key:?} is locked: ").into_bytes();
        message.extend_from_slice(&body);
        return (StatusCode::CONFLICT, message).into_response();
    }
    let flags = params.get("flags").and_then(|f| f.parse().ok()).unwrap_or(0);
    if let Some(cas) = params.get("cas").and_then(|c| c.parse::<u64>().ok()) {
        let current = lock(&state.kv).get(&key).map(|p| p.modify_index);
        let matches = match current {
            Some(index) => cas == index,
            None => cas == 0,
        };
        if !matches {
            return Json(false).into_response();
        }
    }
    store_pair(&state, &key, body.to_vec(), flags);
    Json(true).into_response()
}

async fn kv_delete(State(state): Shared, Path(key): Path<String>, Query(params): Params) -> Response {
    let mut kv = lock(&state.kv);
    if let Some(cas) = params.get("cas").and_then(|c| c.parse::<u64>().ok()) {
        if kv.get(&key).map(|p| p.modify_index) != Some(cas) {
            return Json(false).into_response();
        }
    }
    if params.contains_key("recurse") {
        kv.retain(|k, _| !k.starts_with(&key));
    } else {
        kv.remove(&key);
    }
    state.bump_index();
    Json(true).into_response()
}

async fn txn(State(state): Shared, Json(ops): Json<Vec<TxnOp>>) -> Response {
    let mut kv = lock(&state.kv);

    let mut errors = Vec::new();
    for (op_index, op) in ops.iter().enumerate() {
        match op.kv.verb {
            KvTxnVerb::CheckIndex => {
                let current = kv.get(&op.kv.key).map_or(0, |p| p.modify_index);
                if current != op.kv.index {
                    errors.push(TxnError {
                        op_index,
                        what: format!(
                            "current modify index {current} does not match {}",
                            op.kv.index
                        ),
                    });
                }
            }
            KvTxnVerb::Set | KvTxnVerb::Get | KvTxnVerb::Delete => {}
            other => errors.push(TxnError {
                op_index,
                what: format!("verb {other:?} is not supported"),
            }),
        }
    }
    if !errors.is_empty() {
        let body = TxnResponse {
            results: None,
            errors: Some(errors),
        };
        return (StatusCode::CONFLICT, Json(body)).into_response();
    }

    let index = state.bump_index();
    let mut results = Vec::new();
    for op in ops {
        let op = op.kv;
        match op.verb {
            KvTxnVerb::Set => {
                let create_index = kv.get(&op.key).map_or(index, |p| p.create_index);
                let pair = KvPair {
                    key: op.key.clone(),
                    create_index,
                    modify_index: index,
                    lock_index: 0,
                    flags: op.flags,
                    value: op.value,
                    session: None,
                };
                results.push(TxnResult {
                    kv: Some(KvPair {
                        value: None,
                        ..pair.clone()
                    }),
                });
                kv.insert(op.key, pair);
            }
            KvTxnVerb::Delete => {
                kv.remove(&op.key);
            }
            _ => results.push(TxnResult {
                kv: kv.get(&op.key).cloned(),
            }),
        }
    }
    Json(TxnResponse {
        results: Some(results),
        errors: None,
    })
    .into_response()
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

async fn agent_self(State(state): Shared) -> Response {
    state.self_calls.fetch_add(1, Ordering::SeqCst);
    // Slow enough for concurrent first lookups to overlap.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let body = json!({
        "Config": { "NodeName": NODE_NAME, "Datacenter": "dc1" },
        "Member": { "Name": NODE_NAME, "Addr": "127.0.0.1", "Port": 8301 },
    });
    indexed(&state, &body)
}

async fn agent_members(State(state): Shared, Query(params): Params) -> Response {
    let wan = params.get("wan").is_some_and(|w| w == "1");
    let member = if wan {
        AgentMember {
            name: format!("{NODE_NAME}.dc1"),
            addr: "127.0.0.1".into(),
            port: 8302,
            status: 1,
            ..Default::default()
        }
    } else {
        AgentMember {
            name: NODE_NAME.into(),
            addr: "127.0.0.1".into(),
            port: 8301,
            status: 1,
            ..Default::default()
        }
    };
    indexed(&state, &vec![member])
}

async fn agent_checks(State(state): Shared) -> Response {
    let checks = lock(&state.checks).clone();
    indexed(&state, &checks)
}

async fn agent_services(State(state): Shared) -> Response {
    let services = lock(&state.services).clone();
    indexed(&state, &services)
}

async fn service_register(
    State(state): Shared,
    Json(reg): Json<AgentServiceRegistration>,
) -> Response {
    let Some(name) = reg.name.clone().filter(|n| !n.is_empty()) else {
        return error(StatusCode::BAD_REQUEST, "Missing service name");
    };
    let id = reg.id.clone().filter(|i| !i.is_empty()).unwrap_or_else(|| name.clone());
    let service = AgentService {
        id: id.clone(),
        service: name.clone(),
        tags: reg.tags.clone(),
        port: reg.port.unwrap_or(0),
        address: reg.address.clone().unwrap_or_default(),
        enable_tag_override: reg.enable_tag_override,
        meta: reg.meta.clone(),
    };
    lock(&state.services).insert(id.clone(), service);

    if let Some(check) = &reg.check {
        lock(&state.checks).insert(
            format!("service:{id}"),
            AgentCheck {
                node: NODE_NAME.into(),
                check_id: format!("service:{id}"),
                name: format!("Service '{name}' check"),
                status: check.status.unwrap_or(HealthStatus::Critical),
                notes: String::new(),
                output: String::new(),
                service_id: id.clone(),
                service_name: name.clone(),
            },
        );
    }
    state.bump_index();
    StatusCode::OK.into_response()
}

async fn service_deregister(State(state): Shared, Path(id): Path<String>) -> Response {
    if lock(&state.services).remove(&id).is_none() {
        return error(StatusCode::NOT_FOUND, format!("Unknown service {id:?}"));
    }
    lock(&state.checks).retain(|_, c| c.service_id != id);
    state.bump_index();
    StatusCode::OK.into_response()
}

fn parse_enable(params: &HashMap<String, String>) -> Result<bool, Response> {
    match params.get("enable").map(String::as_str) {
        Some("true") => Ok(true),
        Some("false") => Ok(false),
        _ => Err(error(StatusCode::BAD_REQUEST, "Missing value for enable")),
    }
}

async fn service_maintenance(
    State(state): Shared,
    Path(id): Path<String>,
    Query(params): Params,
) -> Response {
    let enable = match parse_enable(&params) {
        Ok(enable) => enable,
        Err(resp) => return resp,
    };
    let Some(service) = lock(&state.services).get(&id).cloned() else {
        return error(StatusCode::NOT_FOUND, format!("Unknown service {id:?}"));
    };
    let check_id = format!("_service_maintenance:{id}");
    let mut checks = lock(&state.checks);
    if enable {
        checks.insert(
            check_id.clone(),
            AgentCheck {
                node: NODE_NAME.into(),
                check_id,
                name: "Service Maintenance Mode".into(),
                status: HealthStatus::Critical,
                notes: params.get("reason").cloned().unwrap_or_default(),
                output: String::new(),
                service_id: id,
                service_name: service.service,
            },
        );
    } else {
        checks.remove(&check_id);
    }
    StatusCode::OK.into_response()
}

async fn node_maintenance(State(state): Shared, Query(params): Params) -> Response {
    let enable = match parse_enable(&params) {
        Ok(enable) => enable,
        Err(resp) => return resp,
    };
    let check_id = "_node_maintenance".to_string();
    let mut checks = lock(&state.checks);
    if enable {
        checks.insert(
            check_id.clone(),
            AgentCheck {
                node: NODE_NAME.into(),
                check_id,
                name: "Node Maintenance Mode".into(),
                status: HealthStatus::Critical,
                notes: params.get("reason").cloned().unwrap_or_default(),
                output: String::new(),
                service_id: String::new(),
                service_name: String::new(),
            },
        );
    } else {
        checks.remove(&check_id);
    }
    StatusCode::OK.into_response()
}

async fn check_register(
    State(state): Shared,
    Json(reg): Json<AgentCheckRegistration>,
) -> Response {
    if reg.name.is_empty() {
        return error(StatusCode::BAD_REQUEST, "Missing check name");
    }
    let id = reg.id.clone().filter(|i| !i.is_empty()).unwrap_or_else(|| reg.name.clone());
    let check = AgentCheck {
        node: NODE_NAME.into(),
        check_id: id.clone(),
        name: reg.name.clone(),
        status: reg.check.status.unwrap_or(HealthStatus::Critical),
        notes: reg.notes.clone().unwrap_or_default(),
        output: String::new(),
        service_id: reg.service_id.clone().unwrap_or_default(),
        service_name: String::new(),
    };
    lock(&state.checks).insert(id, check);
    state.bump_index();
    StatusCode::OK.into_response()
}

async fn check_deregister(State(state): Shared, Path(id): Path<String>) -> Response {
    if lock(&state.checks).remove(&id).is_none() {
        return error(StatusCode::NOT_FOUND, format!("Unknown check {id:?}"));
    }
    state.bump_index();
    StatusCode::OK.into_response()
}

fn set_check_status(state: &AgentState, id: &str, status: HealthStatus, output: String) -> Response {
    let mut checks = lock(&state.checks);
    let Some(check) = checks.get_mut(id) else {
        return error(StatusCode::NOT_FOUND, format!("Unknown check {id:?}"));
    };
    check.status = status;
    check.output = output;
    StatusCode::OK.into_response()
}

async fn check_update(
    State(state): Shared,
    Path(id): Path<String>,
    Json(update): Json<CheckUpdate>,
) -> Response {
    set_check_status(&state, &id, update.status, update.output)
}

async fn check_legacy_ttl(
    State(state): Shared,
    Path((action, id)): Path<(String, String)>,
    Query(params): Params,
) -> Response {
    let status = match action.as_str() {
        "pass" => HealthStatus::Passing,
        "warn" => HealthStatus::Warning,
        "fail" => HealthStatus::Critical,
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    let note = params.get("note").cloned().unwrap_or_default();
    set_check_status(&state, &id, status, note)
}

async fn monitor(State(state): Shared, Query(params): Params) -> Response {
    if let Some(level) = params.get("loglevel") {
        if level.parse::<LogLevel>().is_err() {
            return error(StatusCode::BAD_REQUEST, format!("Unknown log level: {level}"));
        }
    }
    let lines: Vec<Result<Bytes, Infallible>> = lock(&state.monitor_lines)
        .iter()
        .map(|line| Ok(Bytes::from(format!("{line}\n"))))
        .collect();
    let tail = if state.hold_monitor_open.load(Ordering::SeqCst) {
        futures::stream::pending().left_stream()
    } else {
        futures::stream::empty().right_stream()
    };
    // The guard lives as long as the body, which the server drops once the
    // client hangs up or the last line is written.
    let release = MonitorRelease(Arc::clone(&state));
    let lines = futures::stream::iter(lines).chain(tail).map(move |line| {
        let _held = &release;
        line
    });
    let body = Body::from_stream(lines);
    ([(header::CONTENT_TYPE, "text/plain")], body).into_response()
}

/// Counts monitor bodies the server has let go of.
struct MonitorRelease(Arc<AgentState>);

impl Drop for MonitorRelease {
    fn drop(&mut self) {
        self.0.monitor_releases.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// ACL
// ---------------------------------------------------------------------------

async fn acl_create(
    State(state): Shared,
    headers: HeaderMap,
    Json(mut entry): Json<AclEntry>,
) -> Response {
    if !is_root(&headers) {
        return permission_denied();
    }
    if entry.id.is_empty() {
        entry.id = state.fresh_id("acl");
    }
    let index = state.bump_index();
    entry.create_index = index;
    entry.modify_index = index;
    let id = entry.id.clone();
    lock(&state.acls).insert(id.clone(), entry);
    Json(AclCreated { id }).into_response()
}

async fn acl_update(State(state): Shared, headers: HeaderMap, Json(entry): Json<AclEntry>) -> Response {
    if !is_root(&headers) {
        return permission_denied();
    }
    let index = state.bump_index();
    let mut acls = lock(&state.acls);
    let Some(existing) = acls.get_mut(&entry.id) else {
        return error(StatusCode::NOT_FOUND, "ACL not found");
    };
    existing.name = entry.name;
    existing.acl_type = entry.acl_type;
    existing.rules = entry.rules;
    existing.modify_index = index;
    StatusCode::OK.into_response()
}

async fn acl_destroy(State(state): Shared, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if !is_root(&headers) {
        return permission_denied();
    }
    lock(&state.acls).remove(&id);
    state.bump_index();
    Json(true).into_response()
}

async fn acl_clone(State(state): Shared, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if !is_root(&headers) {
        return permission_denied();
    }
    let Some(source) = lock(&state.acls).get(&id).cloned() else {
        return error(StatusCode::NOT_FOUND, "ACL not found");
    };
    let index = state.bump_index();
    let clone = AclEntry {
        id: state.fresh_id("acl"),
        create_index: index,
        modify_index: index,
        ..source
    };
    let new_id = clone.id.clone();
    lock(&state.acls).insert(new_id.clone(), clone);
    Json(AclCreated { id: new_id }).into_response()
}

async fn acl_info(State(state): Shared, Path(id): Path<String>, Query(params): Params) -> Response {
    block_on_index(&state, &params).await;
    let entries: Vec<AclEntry> = lock(&state.acls).get(&id).cloned().into_iter().collect();
    indexed(&state, &entries)
}

async fn acl_list(State(state): Shared, headers: HeaderMap, Query(params): Params) -> Response {
    if !is_root(&headers) {
        return permission_denied();
    }
    block_on_index(&state, &params).await;
    let entries: Vec<AclEntry> = lock(&state.acls).values().cloned().collect();
    indexed(&state, &entries)
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

async fn catalog_register(State(state): Shared, Json(reg): Json<CatalogRegistration>) -> Response {
    if reg.node.is_empty() || reg.address.is_empty() {
        return error(StatusCode::BAD_REQUEST, "Must provide node and address");
    }
    let mut catalog = lock(&state.catalog);
    let entry = catalog.entry(reg.node.clone()).or_insert_with(|| {
        (
            consul_api::Node {
                name: reg.node.clone(),
                address: reg.address.clone(),
                tagged_addresses: HashMap::new(),
            },
            HashMap::new(),
        )
    });
    entry.0.address = reg.address.clone();
    if let Some(service) = reg.service {
        entry.1.insert(service.id.clone(), service);
    }
    drop(catalog);
    state.bump_index();
    Json(true).into_response()
}

async fn catalog_deregister(
    State(state): Shared,
    Json(dereg): Json<CatalogDeregistration>,
) -> Response {
    let mut catalog = lock(&state.catalog);
    match (&dereg.service_id, &dereg.check_id) {
        (Some(service_id), _) => {
            if let Some((_, services)) = catalog.get_mut(&dereg.node) {
                services.remove(service_id);
            }
        }
        (None, Some(_)) => {}
        (None, None) => {
            catalog.remove(&dereg.node);
        }
    }
    drop(catalog);
    state.bump_index();
    Json(true).into_response()
}

async fn catalog_datacenters() -> Json<Vec<&'static str>> {
    Json(vec!["dc1", "dc2"])
}

async fn catalog_nodes(State(state): Shared, Query(params): Params) -> Response {
    block_on_index(&state, &params).await;
    let nodes: Vec<consul_api::Node> = lock(&state.catalog)
        .values()
        .map(|(node, _)| node.clone())
        .collect();
    indexed(&state, &nodes)
}

async fn catalog_node(
    State(state): Shared,
    Path(name): Path<String>,
    Query(params): Params,
) -> Response {
    block_on_index(&state, &params).await;
    let node = lock(&state.catalog)
        .get(&name)
        .map(|(node, services)| CatalogNode {
            node: node.clone(),
            services: services.clone(),
        });
    indexed(&state, &node)
}

async fn catalog_services(State(state): Shared, Query(params): Params) -> Response {
    block_on_index(&state, &params).await;
    let mut services: HashMap<String, BTreeSet<String>> = HashMap::new();
    for (_, node_services) in lock(&state.catalog).values() {
        for service in node_services.values() {
            let tags = services.entry(service.service.clone()).or_default();
            tags.extend(service.tags.iter().flatten().cloned());
        }
    }
    indexed(&state, &services)
}

async fn catalog_service(
    State(state): Shared,
    Path(name): Path<String>,
    Query(params): Params,
) -> Response {
    block_on_index(&state, &params).await;
    let tag = params.get("tag");
    let mut instances = Vec::new();
    for (node, services) in lock(&state.catalog).values() {
        for service in services.values().filter(|s| s.service == name) {
            let tagged = tag.map_or(true, |t| service.tags.iter().flatten().any(|s| s == t));
            if !tagged {
                continue;
            }
            instances.push(CatalogService {
                node: node.name.clone(),
                address: node.address.clone(),
                service_id: service.id.clone(),
                service_name: service.service.clone(),
                service_address: service.address.clone(),
                service_tags: service.tags.clone(),
                service_port: service.port,
                service_enable_tag_override: service.enable_tag_override,
                service_meta: service.meta.clone(),
            });
        }
    }
    indexed(&state, &instances)
}
