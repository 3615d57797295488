//! # REST + JSON-RPC + WebSocket API
//!
//! Builds the axum router that exposes the presale contract. All endpoints
//! share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                   | Description                          |
//! |--------|------------------------|--------------------------------------|
//! | GET    | `/health`              | Liveness probe                       |
//! | GET    | `/status`              | Sale status summary                  |
//! | POST   | `/rpc`                 | JSON-RPC 2.0 gateway                 |
//! | GET    | `/ws`                  | WebSocket for live contract events   |
//! | GET    | `/accounts/:address`   | Balance, whitelist flag and tokens   |
//! | GET    | `/tokens/:id`          | Token owner and metadata URI         |
//! | GET    | `/whitelist/:address`  | Whitelist membership                 |
//!
//! ## Serialization of calls
//!
//! The contract lives behind one mutex. Each call takes the lock, runs to
//! completion and, if it changed anything, commits the new ledger to the
//! store before the lock is released. A failed commit restores the ledger
//! as it was before the call, so memory never runs ahead of disk.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use presale_contracts::{NftPresale, PresaleError, SalePhase, SaleStatus, TokenId};
use presale_protocol::{Address, Wei};

use crate::metrics::SharedMetrics;
use crate::store::{LedgerPersistence, StoreError};

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone; everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// The hosted contract. Every call goes through this lock.
    pub ledger: Arc<Mutex<NftPresale>>,
    /// Where accepted changes are committed.
    pub store: Arc<dyn LedgerPersistence>,
    /// Broadcast channel for live event notifications.
    pub event_tx: broadcast::Sender<NodeEvent>,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

/// Events pushed to WebSocket subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeEvent {
    /// Tokens were minted.
    Minted {
        call_id: Uuid,
        buyer: Address,
        first_token_id: TokenId,
        quantity: u64,
        phase: SalePhase,
        paid: Wei,
        total_supply: u64,
    },
    /// The owner admitted addresses to the presale.
    WhitelistUpdated {
        call_id: Uuid,
        added: usize,
        whitelist_size: usize,
    },
    /// The presale open time was set.
    PresaleScheduled {
        call_id: Uuid,
        open_time: u64,
        presale_end: Option<u64>,
    },
    OwnershipTransferred {
        call_id: Uuid,
        previous_owner: Address,
        new_owner: Address,
    },
    ProceedsWithdrawn {
        call_id: Uuid,
        owner: Address,
        amount: Wei,
    },
    /// The sale crossed from presale into the public phase.
    PhaseChanged { phase: SalePhase, timestamp: u64 },
}

// ---------------------------------------------------------------------------
// Call Execution
// ---------------------------------------------------------------------------

/// Why a mutating call did not take effect.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    /// The contract refused the call. Nothing changed.
    #[error(transparent)]
    Rejected(#[from] PresaleError),

    /// The contract accepted the call but the ledger could not be saved.
    /// The change was rolled back.
    #[error("ledger commit failed: {0}")]
    Storage(#[from] StoreError),
}

/// Output of an accepted call.
#[derive(Debug)]
pub struct Executed<T> {
    pub call_id: Uuid,
    pub output: T,
}

impl AppState {
    /// Runs one mutating call against the contract and commits the result.
    ///
    /// `operation` labels the call in logs and in the rejection metric.
    pub fn execute<T>(
        &self,
        operation: &'static str,
        call: impl FnOnce(&mut NftPresale) -> Result<T, PresaleError>,
    ) -> Result<Executed<T>, CallError> {
        let call_id = Uuid::new_v4();
        let _span = tracing::info_span!("call", %call_id, operation).entered();

        let mut ledger = self.ledger.lock();
        let before = ledger.state().clone();

        let output = match call(&mut *ledger) {
            Ok(output) => output,
            Err(e) => {
                self.metrics
                    .rejected_calls_total
                    .with_label_values(&[operation, e.reason()])
                    .inc();
                tracing::debug!(reason = e.reason(), "call rejected: {}", e);
                return Err(CallError::Rejected(e));
            }
        };

        if let Err(e) = self.store.save(ledger.state()) {
            ledger.restore(before);
            tracing::error!(error = %e, "ledger commit failed, call rolled back");
            return Err(CallError::Storage(e));
        }

        self.metrics.observe(&ledger);
        Ok(Executed { call_id, output })
    }

    /// Broadcasts `event` to WebSocket subscribers. Having no subscribers
    /// is not an error.
    fn publish(&self, event: NodeEvent) {
        let _ = self.event_tx.send(event);
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/rpc", post(rpc_handler))
        .route("/ws", get(ws_handler))
        .route("/accounts/:address", get(account_handler))
        .route("/tokens/:id", get(token_handler))
        .route("/whitelist/:address", get(whitelist_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// JSON-RPC Types
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 request envelope.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version. Must be "2.0".
    pub jsonrpc: String,
    /// The method to invoke.
    pub method: String,
    /// Method parameters, either named (object) or positional (array).
    pub params: Option<serde_json::Value>,
    /// Request identifier. Echoed back in the response.
    pub id: serde_json::Value,
}

/// A JSON-RPC 2.0 response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version. Always "2.0".
    pub jsonrpc: String,
    /// The result on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// The error on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    /// Request identifier, echoed from the request.
    pub id: serde_json::Value,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Numeric error code.
    pub code: i32,
    /// Short human-readable error description.
    pub message: String,
    /// Optional structured error data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
pub const NOT_FOUND: i32 = -32001;
/// The contract rejected the call. `data.reason` carries the cause.
pub const CALL_REJECTED: i32 = -32010;

impl JsonRpcError {
    fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl From<PresaleError> for JsonRpcError {
    fn from(e: PresaleError) -> Self {
        match e {
            PresaleError::TokenNotFound(_) => JsonRpcError::new(NOT_FOUND, e.to_string()),
            _ => JsonRpcError {
                code: CALL_REJECTED,
                message: e.to_string(),
                data: Some(serde_json::json!({ "reason": e.reason() })),
            },
        }
    }
}

impl From<CallError> for JsonRpcError {
    fn from(e: CallError) -> Self {
        match e {
            CallError::Rejected(e) => e.into(),
            CallError::Storage(e) => {
                JsonRpcError::new(INTERNAL_ERROR, format!("Internal error: {}", e))
            }
        }
    }
}

type RpcOutcome = Result<serde_json::Value, JsonRpcError>;

// -- Method parameters -------------------------------------------------------
//
// Each accepts named params (`{"address": "0x.."}`) or the same fields
// positionally (`["0x.."]`).

#[derive(Debug, Deserialize)]
struct AddressParams {
    address: Address,
}

#[derive(Debug, Deserialize)]
struct TokenParams {
    token_id: TokenId,
}

#[derive(Debug, Deserialize)]
struct MintParams {
    from: Address,
    quantity: u64,
    /// Attached payment in wei, as a decimal string.
    value: Wei,
}

#[derive(Debug, Deserialize)]
struct WhitelistParams {
    from: Address,
    addresses: Vec<Address>,
}

#[derive(Debug, Deserialize)]
struct OpenTimeParams {
    from: Address,
    timestamp: u64,
}

#[derive(Debug, Deserialize)]
struct TransferOwnershipParams {
    from: Address,
    new_owner: Address,
}

#[derive(Debug, Deserialize)]
struct CallerParams {
    from: Address,
}

fn parse_params<T: DeserializeOwned>(params: Option<serde_json::Value>) -> Result<T, JsonRpcError> {
    let value = params.unwrap_or(serde_json::Value::Null);
    serde_json::from_value(value)
        .map_err(|e| JsonRpcError::new(INVALID_PARAMS, format!("Invalid params: {}", e)))
}

fn to_result<T: Serialize>(value: T) -> RpcOutcome {
    serde_json::to_value(value)
        .map_err(|e| JsonRpcError::new(INTERNAL_ERROR, format!("Internal error: {}", e)))
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Node software version.
    pub version: String,
    /// Contract state at the time of the request.
    pub sale: SaleStatus,
    /// Unix time of the last ledger commit.
    pub last_saved_at: Option<u64>,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

/// Response payload for `GET /accounts/:address`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub address: Address,
    /// Tokens held.
    pub balance: u64,
    pub whitelisted: bool,
    /// Ids of the tokens held, ascending.
    pub tokens: Vec<TokenId>,
}

/// Response payload for `GET /tokens/:id`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token_id: TokenId,
    pub owner: Address,
    pub token_uri: String,
}

/// Response payload for `GET /whitelist/:address`.
#[derive(Debug, Serialize, Deserialize)]
pub struct WhitelistResponse {
    pub address: Address,
    pub whitelisted: bool,
}

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: returns 200 if the node is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status`: returns the sale status summary.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let sale = state.ledger.lock().status();
    let last_saved_at = match state.store.last_saved_at() {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!("failed to read last commit time: {}", e);
            None
        }
    };

    Json(StatusResponse {
        version: state.version.clone(),
        sale,
        last_saved_at,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// `POST /rpc`: JSON-RPC 2.0 gateway.
async fn rpc_handler(
    State(state): State<AppState>,
    Json(req): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    if req.jsonrpc != "2.0" {
        return Json(JsonRpcResponse {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(JsonRpcError::new(
                INVALID_REQUEST,
                "Invalid Request: jsonrpc must be \"2.0\"",
            )),
            id: req.id,
        });
    }

    let (result, error) = match dispatch(&state, &req.method, req.params) {
        Ok(value) => (Some(value), None),
        Err(e) => (None, Some(e)),
    };

    Json(JsonRpcResponse {
        jsonrpc: "2.0".into(),
        result,
        error,
        id: req.id,
    })
}

/// Routes a JSON-RPC method to the contract.
fn dispatch(state: &AppState, method: &str, params: Option<serde_json::Value>) -> RpcOutcome {
    match method {
        // -- Queries ---------------------------------------------------------
        "presale_version" => to_result(&state.version),
        "presale_status" => to_result(state.ledger.lock().status()),
        "presale_getPrice" => to_result(state.ledger.lock().get_price()),
        "presale_owner" => to_result(state.ledger.lock().owner()),
        "presale_presaleOpenTime" => to_result(state.ledger.lock().presale_open_time()),
        "presale_totalSupply" => to_result(state.ledger.lock().total_supply()),
        "presale_maximumSupply" => to_result(state.ledger.lock().maximum_nft_supply()),
        "presale_balanceOf" => {
            let p: AddressParams = parse_params(params)?;
            to_result(state.ledger.lock().balance_of(&p.address))
        }
        "presale_isWhitelisted" => {
            let p: AddressParams = parse_params(params)?;
            to_result(state.ledger.lock().is_whitelisted(&p.address))
        }
        "presale_tokensOfOwner" => {
            let p: AddressParams = parse_params(params)?;
            to_result(state.ledger.lock().tokens_of_owner(&p.address))
        }
        "presale_ownerOf" => {
            let p: TokenParams = parse_params(params)?;
            let owner = state.ledger.lock().owner_of(p.token_id)?;
            to_result(owner)
        }
        "presale_tokenURI" => {
            let p: TokenParams = parse_params(params)?;
            let uri = state.ledger.lock().token_uri(p.token_id)?;
            to_result(uri)
        }

        // -- Calls -----------------------------------------------------------
        "presale_mint" => mint(state, parse_params(params)?),
        "presale_whitelistUsers" => whitelist_users(state, parse_params(params)?),
        "presale_setPresaleOpenTime" => set_presale_open_time(state, parse_params(params)?),
        "presale_transferOwnership" => transfer_ownership(state, parse_params(params)?),
        "presale_withdraw" => withdraw(state, parse_params(params)?),

        _ => Err(JsonRpcError::new(
            METHOD_NOT_FOUND,
            format!("Method not found: {}", method),
        )),
    }
}

fn mint(state: &AppState, p: MintParams) -> RpcOutcome {
    let timer = state.metrics.mint_latency_seconds.start_timer();
    let done = state.execute("mint", |c| {
        let receipt = c.mint(p.from, p.quantity, p.value)?;
        Ok((receipt, c.total_supply()))
    });
    timer.observe_duration();
    let Executed {
        call_id,
        output: (receipt, total_supply),
    } = done?;

    state.metrics.mints_total.inc();
    state.metrics.tokens_minted_total.inc_by(receipt.quantity);
    state.publish(NodeEvent::Minted {
        call_id,
        buyer: receipt.buyer,
        first_token_id: receipt.first_token_id,
        quantity: receipt.quantity,
        phase: receipt.phase,
        paid: receipt.paid,
        total_supply,
    });

    to_result(serde_json::json!({
        "call_id": call_id,
        "receipt": receipt,
        "total_supply": total_supply,
    }))
}

fn whitelist_users(state: &AppState, p: WhitelistParams) -> RpcOutcome {
    let Executed {
        call_id,
        output: (added, whitelist_size),
    } = state.execute("whitelist_users", |c| {
        let added = c.whitelist_users(&p.from, &p.addresses)?;
        Ok((added, c.whitelist_len()))
    })?;

    state.publish(NodeEvent::WhitelistUpdated {
        call_id,
        added,
        whitelist_size,
    });
    to_result(serde_json::json!({
        "call_id": call_id,
        "added": added,
        "whitelist_size": whitelist_size,
    }))
}

fn set_presale_open_time(state: &AppState, p: OpenTimeParams) -> RpcOutcome {
    let Executed {
        call_id,
        output: presale_end,
    } = state.execute("set_presale_open_time", |c| {
        c.set_presale_open_time(&p.from, p.timestamp)?;
        Ok(c.presale_end())
    })?;

    state.publish(NodeEvent::PresaleScheduled {
        call_id,
        open_time: p.timestamp,
        presale_end,
    });
    to_result(serde_json::json!({
        "call_id": call_id,
        "open_time": p.timestamp,
        "presale_end": presale_end,
    }))
}

fn transfer_ownership(state: &AppState, p: TransferOwnershipParams) -> RpcOutcome {
    let Executed {
        call_id,
        output: previous_owner,
    } = state.execute("transfer_ownership", |c| {
        c.transfer_ownership(&p.from, p.new_owner)
    })?;

    state.publish(NodeEvent::OwnershipTransferred {
        call_id,
        previous_owner,
        new_owner: p.new_owner,
    });
    to_result(serde_json::json!({
        "call_id": call_id,
        "previous_owner": previous_owner,
        "new_owner": p.new_owner,
    }))
}

fn withdraw(state: &AppState, p: CallerParams) -> RpcOutcome {
    let Executed {
        call_id,
        output: amount,
    } = state.execute("withdraw", |c| c.withdraw(&p.from))?;

    state.publish(NodeEvent::ProceedsWithdrawn {
        call_id,
        owner: p.from,
        amount,
    });
    to_result(serde_json::json!({
        "call_id": call_id,
        "amount": amount,
    }))
}

/// `GET /ws`: WebSocket upgrade for live event streaming.
///
/// Clients receive JSON-encoded [`NodeEvent`] messages. Client messages
/// are ignored.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

/// Drives a single WebSocket connection, forwarding broadcast events
/// until the client disconnects or the channel is closed.
async fn handle_ws_connection(mut socket: WebSocket, state: AppState) {
    let mut rx = state.event_tx.subscribe();

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(ev) => {
                        let payload = match serde_json::to_string(&ev) {
                            Ok(s) => s,
                            Err(e) => {
                                tracing::warn!("failed to serialize ws event: {}", e);
                                continue;
                            }
                        };
                        if socket.send(Message::Text(payload.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("ws subscriber lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }
}

/// `GET /accounts/:address`: token holdings and whitelist membership.
async fn account_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let address: Address = match address.parse() {
        Ok(a) => a,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("Invalid address: {}", e)),
    };

    let ledger = state.ledger.lock();
    let resp = AccountResponse {
        address,
        balance: ledger.balance_of(&address),
        whitelisted: ledger.is_whitelisted(&address),
        tokens: ledger.tokens_of_owner(&address),
    };
    drop(ledger);

    (StatusCode::OK, Json(resp)).into_response()
}

/// `GET /tokens/:id`: owner and metadata URI of a minted token.
async fn token_handler(
    Path(token_id): Path<TokenId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let ledger = state.ledger.lock();
    let found = ledger
        .owner_of(token_id)
        .and_then(|owner| Ok((owner, ledger.token_uri(token_id)?)));
    drop(ledger);

    match found {
        Ok((owner, token_uri)) => (
            StatusCode::OK,
            Json(TokenResponse {
                token_id,
                owner,
                token_uri,
            }),
        )
            .into_response(),
        Err(e) => error_response(StatusCode::NOT_FOUND, e.to_string()),
    }
}

/// `GET /whitelist/:address`: presale whitelist membership.
async fn whitelist_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let address: Address = match address.parse() {
        Ok(a) => a,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("Invalid address: {}", e)),
    };
    let whitelisted = state.ledger.lock().is_whitelisted(&address);
    (
        StatusCode::OK,
        Json(WhitelistResponse {
            address,
            whitelisted,
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Phase Watcher
// ---------------------------------------------------------------------------

/// Checks whether the sale phase moved since `last` and, if so, publishes a
/// [`NodeEvent::PhaseChanged`] and refreshes the metrics. Returns the new
/// phase when it changed.
pub fn check_phase(state: &AppState, last: &mut SalePhase) -> Option<SalePhase> {
    let ledger = state.ledger.lock();
    let phase = ledger.phase();
    if phase == *last {
        return None;
    }
    let timestamp = ledger.status().now;
    state.metrics.observe(&ledger);
    drop(ledger);

    tracing::info!(from = %last, to = %phase, timestamp, "sale phase changed");
    *last = phase;
    state.publish(NodeEvent::PhaseChanged { phase, timestamp });
    Some(phase)
}

/// Polls the sale phase every `period` for the lifetime of the node.
pub async fn watch_phase(state: AppState, period: Duration) {
    let mut last = state.ledger.lock().phase();
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        check_phase(&state, &mut last);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
