use std::{
    collections::{HashMap, HashSet},
    convert::Infallible,
    str::FromStr,
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc, RwLock,
    },
    time::Duration,
};

use alloy_primitives::{Address, B256};
use anyhow::{Context, Result};
use hyper::service::{make_service_fn, service_fn};
use hyper::{body, Body, Method, Request, Response, Server, StatusCode};
use proposal_feed::rpc::abi;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const RESOLVER: &str = "0x4976fb03c32e5b8cfe2b6ccb31c09ba78ebaba41";

/// In-memory governance state served over both JSON-RPC (`eth_call`) and the
/// REST proposal endpoint.
#[derive(Clone, Default)]
pub struct MockGovernance {
    inner: Arc<RwLock<MockGovernanceInner>>,
    count: Arc<AtomicU64>,
    count_failures: Arc<AtomicUsize>,
    name_failures: Arc<AtomicUsize>,
    rpc_calls: Arc<AtomicUsize>,
}

#[derive(Default)]
struct MockGovernanceInner {
    proposals: HashMap<u64, Value>,
    names: HashMap<B256, String>,
    addresses: HashMap<B256, Address>,
    failing: HashSet<u64>,
    slow: HashSet<u64>,
    requested: Vec<u64>,
}

impl MockGovernance {
    pub fn new(count: u64) -> Self {
        let mock = Self::default();
        mock.count.store(count, Ordering::SeqCst);
        mock
    }

    pub fn insert_proposal(&self, id: u64, payload: Value) {
        self.write().proposals.insert(id, payload);
    }

    /// Adds a plain proposal by `proposer` with a couple of votes.
    pub fn insert_simple(&self, id: u64, proposer: &str) {
        self.insert_proposal(
            id,
            json!({
                "title": format!("Proposal title {id}"),
                "proposer": proposer,
                "quorumVotes": "20",
                "status": { "currentStatus": "ACTIVE" },
                "votes": [
                    { "support": "FOR", "votes": 30 },
                    { "support": "AGAINST", "votes": "5" },
                    { "support": "ABSTAIN", "votes": 1 },
                ],
            }),
        );
    }

    /// Reverse record for `address` plus a forward record pointing back at it.
    pub fn register_name(&self, address: &str, name: &str) {
        self.register_reverse_name(address, name, address);
    }

    /// Reverse record for `address` whose name forward-resolves to `resolves_to`.
    pub fn register_reverse_name(&self, address: &str, name: &str, resolves_to: &str) {
        let address = Address::from_str(address).expect("valid address");
        let resolves_to = Address::from_str(resolves_to).expect("valid address");
        let mut inner = self.write();
        inner
            .names
            .insert(abi::reverse_node(&address), name.to_owned());
        inner.addresses.insert(abi::namehash(name), resolves_to);
    }

    pub fn fail_proposal(&self, id: u64) {
        self.write().failing.insert(id);
    }

    pub fn slow_proposal(&self, id: u64) {
        self.write().slow.insert(id);
    }

    /// The next `count` proposalCount calls answer with a JSON-RPC error.
    pub fn fail_count_calls(&self, count: usize) {
        self.count_failures.store(count, Ordering::SeqCst);
    }

    /// The next `count` reverse-registry calls answer with a JSON-RPC error.
    pub fn fail_name_calls(&self, count: usize) {
        self.name_failures.store(count, Ordering::SeqCst);
    }

    pub fn requested_ids(&self) -> Vec<u64> {
        self.inner.read().expect("mock poisoned").requested.clone()
    }

    pub fn rpc_calls(&self) -> usize {
        self.rpc_calls.load(Ordering::SeqCst)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, MockGovernanceInner> {
        self.inner.write().expect("mock poisoned")
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| remaining.checked_sub(1))
            .is_ok()
    }
}

pub struct MockRpcServer {
    url: String,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl MockRpcServer {
    pub async fn start(governance: MockGovernance) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind mock RPC listener")?;
        let addr = listener
            .local_addr()
            .context("failed to read mock listener address")?;
        let std_listener = listener
            .into_std()
            .context("failed to convert mock listener")?;
        std_listener
            .set_nonblocking(true)
            .context("failed to set mock listener non-blocking")?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let make_service = make_service_fn(move |_| {
            let governance = governance.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |req| serve_request(governance.clone(), req)))
            }
        });

        let server = Server::from_tcp(std_listener)
            .context("failed to build mock HTTP server")?
            .serve(make_service);
        let graceful = server.with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });

        let handle = tokio::spawn(async move {
            if let Err(err) = graceful.await {
                eprintln!("mock RPC server stopped: {err}");
            }
        });

        Ok(Self {
            url: format!("http://{}", addr),
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

async fn serve_request(
    governance: MockGovernance,
    req: Request<Body>,
) -> Result<Response<Body>, Infallible> {
    if req.method() == Method::GET {
        let path = req.uri().path().to_owned();
        serve_proposal(governance, &path).await
    } else if req.method() == Method::POST {
        serve_rpc(governance, req).await
    } else {
        Ok(plain(StatusCode::METHOD_NOT_ALLOWED, "Unsupported method"))
    }
}

async fn serve_proposal(governance: MockGovernance, path: &str) -> Result<Response<Body>, Infallible> {
    let Some(id) = path
        .strip_prefix("/proposal/")
        .and_then(|raw| raw.parse::<u64>().ok())
    else {
        return Ok(plain(StatusCode::NOT_FOUND, "no such route"));
    };

    let (payload, failing, slow) = {
        let mut inner = governance.write();
        inner.requested.push(id);
        (
            inner.proposals.get(&id).cloned(),
            inner.failing.contains(&id),
            inner.slow.contains(&id),
        )
    };

    if slow {
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
    if failing {
        return Ok(plain(StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded"));
    }
    match payload {
        Some(payload) => Ok(json_response(&payload)),
        None => Ok(plain(StatusCode::NOT_FOUND, "proposal not found")),
    }
}

async fn serve_rpc(governance: MockGovernance, req: Request<Body>) -> Result<Response<Body>, Infallible> {
    let bytes = match body::to_bytes(req.into_body()).await {
        Ok(bytes) => bytes,
        Err(err) => {
            return Ok(plain(
                StatusCode::BAD_REQUEST,
                format!("failed to read body: {err}"),
            ))
        }
    };

    let payload: Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(err) => {
            return Ok(plain(
                StatusCode::BAD_REQUEST,
                format!("invalid JSON payload: {err}"),
            ))
        }
    };

    governance.rpc_calls.fetch_add(1, Ordering::SeqCst);
    Ok(json_response(&handle_call(&governance, payload)))
}

fn handle_call(governance: &MockGovernance, call: Value) -> Value {
    let id = call.get("id").cloned().unwrap_or(Value::Null);
    let method = call
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if method != "eth_call" {
        return error(id, -32601, format!("unknown method {method}"));
    }

    let data = call
        .pointer("/params/0/data")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let (selector, argument) = split_call(data);

    if selector == hex::encode(abi::selector("proposalCount()")) {
        if MockGovernance::take_failure(&governance.count_failures) {
            return error(id, -32000, "header not found");
        }
        let count = governance.count.load(Ordering::SeqCst);
        return success(id, abi::encode_u64(count));
    }

    let node = argument.and_then(|raw| B256::from_str(raw).ok());
    let inner = governance.inner.read().expect("mock poisoned");
    let name = node.and_then(|node| inner.names.get(&node).cloned());
    let forward = node.and_then(|node| inner.addresses.get(&node).copied());

    if selector == hex::encode(abi::selector("resolver(bytes32)")) {
        if MockGovernance::take_failure(&governance.name_failures) {
            return error(id, -32000, "execution reverted");
        }
        let resolver = if name.is_some() || forward.is_some() {
            Address::from_str(RESOLVER).expect("valid resolver address")
        } else {
            Address::ZERO
        };
        return success(id, abi::encode_address(&resolver));
    }

    if selector == hex::encode(abi::selector("name(bytes32)")) {
        return success(id, abi::encode_string(&name.unwrap_or_default()));
    }

    if selector == hex::encode(abi::selector("addr(bytes32)")) {
        return success(id, abi::encode_address(&forward.unwrap_or(Address::ZERO)));
    }

    error(id, -32000, format!("unexpected selector {selector}"))
}

fn split_call(data: &str) -> (&str, Option<&str>) {
    let stripped = data.strip_prefix("0x").unwrap_or(data);
    if stripped.len() < 8 {
        return (stripped, None);
    }
    let (selector, rest) = stripped.split_at(8);
    (selector, (!rest.is_empty()).then_some(rest))
}

fn success(id: Value, result: String) -> Value {
    json!({
        "jsonrpc": "2.0",
        "result": result,
        "id": id,
    })
}

fn error(id: Value, code: i64, message: impl Into<String>) -> Value {
    json!({
        "jsonrpc": "2.0",
        "error": {
            "code": code,
            "message": message.into(),
        },
        "id": id,
    })
}

fn json_response(value: &Value) -> Response<Body> {
    let mut response = Response::new(Body::from(value.to_string()));
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    response
}

fn plain(status: StatusCode, message: impl Into<String>) -> Response<Body> {
    let mut response = Response::new(Body::from(message.into()));
    *response.status_mut() = status;
    response
}
