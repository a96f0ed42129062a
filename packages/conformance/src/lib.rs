//! Shared helpers for the client conformance test suite.
//!
//! Provides [`spawn_agent`]: binds a `TcpListener` on an ephemeral port and
//! serves an in-process mock of the agent HTTP API from it. The mock keeps
//! its data in memory, implements blocking reads on a single cluster-wide
//! index, and records every request it receives so tests can assert on the
//! exact query string and headers the client sent.

mod handlers;

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use consul_api::{AclEntry, AclType, AgentCheck, AgentService, KvPair, Node};
use consul_client::{ClientConfig, ConsulClient};
use tokio::sync::watch;

/// Node name reported by the mock in `/v1/agent/self`.
pub const NODE_NAME: &str = "conformance-node";

/// Token accepted by the mock's ACL endpoints.
pub const ROOT_TOKEN: &str = "root";

/// One request as seen by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    /// Raw query string, without the leading `?`.
    pub query: Option<String>,
    /// Every `X-Consul-Token` header value, in order.
    pub tokens: Vec<String>,
}

/// In-memory state behind the mock agent.
pub struct AgentState {
    pub(crate) kv: Mutex<BTreeMap<String, KvPair>>,
    pub(crate) index: watch::Sender<u64>,
    pub(crate) acls: Mutex<BTreeMap<String, AclEntry>>,
    pub(crate) services: Mutex<HashMap<String, AgentService>>,
    pub(crate) checks: Mutex<HashMap<String, AgentCheck>>,
    pub(crate) catalog: Mutex<BTreeMap<String, (Node, HashMap<String, AgentService>)>>,
    pub(crate) monitor_lines: Mutex<Vec<String>>,
    pub(crate) hold_monitor_open: AtomicBool,
    pub(crate) monitor_releases: AtomicUsize,
    pub(crate) self_calls: AtomicUsize,
    pub(crate) next_id: AtomicUsize,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl AgentState {
    fn new() -> Self {
        let (index, _) = watch::channel(1);
        let mut catalog = BTreeMap::new();
        catalog.insert(
            NODE_NAME.to_string(),
            (
                Node {
                    name: NODE_NAME.to_string(),
                    address: "127.0.0.1".into(),
                    tagged_addresses: HashMap::new(),
                },
                HashMap::new(),
            ),
        );
        let mut acls = BTreeMap::new();
        acls.insert(
            ROOT_TOKEN.to_string(),
            AclEntry {
                create_index: 1,
                modify_index: 1,
                id: ROOT_TOKEN.to_string(),
                name: "Master Token".into(),
                acl_type: AclType::Management,
                rules: String::new(),
            },
        );
        Self {
            kv: Mutex::new(BTreeMap::new()),
            index,
            acls: Mutex::new(acls),
            services: Mutex::new(HashMap::new()),
            checks: Mutex::new(HashMap::new()),
            catalog: Mutex::new(catalog),
            monitor_lines: Mutex::new(Vec::new()),
            hold_monitor_open: AtomicBool::new(false),
            monitor_releases: AtomicUsize::new(0),
            self_calls: AtomicUsize::new(0),
            next_id: AtomicUsize::new(1),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn current_index(&self) -> u64 {
        *self.index.borrow()
    }

    /// Advance the cluster index and return the new value.
    pub(crate) fn bump_index(&self) -> u64 {
        let mut next = 0;
        self.index.send_modify(|i| {
            *i += 1;
            next = *i;
        });
        next
    }

    pub(crate) fn fresh_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Handle to a running mock agent.
#[derive(Clone)]
pub struct MockAgent {
    /// e.g. `http://127.0.0.1:51234`
    pub base_url: String,
    pub state: Arc<AgentState>,
}

impl MockAgent {
    /// Client configuration pointing at this agent.
    pub fn config(&self) -> ClientConfig {
        ClientConfig::default()
            .with_address(&self.base_url)
            .expect("mock agent URL is valid")
    }

    /// A client with default settings pointing at this agent.
    pub fn client(&self) -> ConsulClient {
        self.client_with(self.config())
    }

    pub fn client_with(&self, config: ClientConfig) -> ConsulClient {
        ConsulClient::new(config).expect("build client")
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state.requests).clone()
    }

    /// The most recent request whose path is `path`.
    pub fn last_request_to(&self, path: &str) -> Option<RecordedRequest> {
        self.requests().into_iter().rev().find(|r| r.path == path)
    }

    /// How many times `/v1/agent/self` was hit.
    pub fn self_calls(&self) -> usize {
        self.state.self_calls.load(Ordering::SeqCst)
    }

    /// Store `value` under `key` directly, bumping the index.
    pub fn put_key(&self, key: &str, value: &[u8]) -> u64 {
        handlers::store_pair(&self.state, key, value.to_vec(), 0)
    }

    /// Lines served by `/v1/agent/monitor`.
    pub fn set_monitor_lines<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *lock(&self.state.monitor_lines) = lines.into_iter().map(Into::into).collect();
    }

    /// Keep the monitor response open after its lines have been written.
    pub fn hold_monitor_open(&self, hold: bool) {
        self.state.hold_monitor_open.store(hold, Ordering::SeqCst);
    }

    /// How many monitor response bodies the server has dropped, either
    /// after the last line or because the client went away.
    pub fn monitor_releases(&self) -> usize {
        self.state.monitor_releases.load(Ordering::SeqCst)
    }

    pub fn register_check(&self, check: AgentCheck) {
        lock(&self.state.checks).insert(check.check_id.clone(), check);
    }
}

async fn record_request(
    State(state): State<Arc<AgentState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let recorded = RecordedRequest {
        method: req.method().to_string(),
        path: req.uri().path().to_string(),
        query: req.uri().query().map(str::to_string),
        tokens: req
            .headers()
            .get_all("x-consul-token")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect(),
    };
    lock(&state.requests).push(recorded);
    next.run(req).await
}

/// Start an ephemeral in-process mock agent.
///
/// The agent runs in a background `tokio` task bound to an OS-assigned port
/// on `127.0.0.1`. The returned handle carries the base URL and the shared
/// state so tests can seed data and inspect recorded requests.
///
/// # Panics
///
/// Panics if the TCP listener cannot be bound or the server fails.
pub async fn spawn_agent() -> MockAgent {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("get local addr");
    let base_url = format!("http://{addr}");

    let state = Arc::new(AgentState::new());
    let router = handlers::router(Arc::clone(&state)).layer(
        axum::middleware::from_fn_with_state(Arc::clone(&state), record_request),
    );

    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("mock agent error");
    });

    MockAgent { base_url, state }
}
