//! JSON-RPC server over Unix socket.
//!
//! Listens on a Unix domain socket, accepts connections, and dispatches
//! JSON-RPC method calls to the appropriate command handlers. A connection
//! that calls `subscribe_events` also receives matching events as
//! `event` notifications until it unsubscribes or disconnects.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use yieldgate_protocol::{ErrorClass, ProtocolError};

use crate::auth::AuthError;
use crate::commands;
use crate::events::{Event, EventFilter};
use crate::DaemonState;

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Method name.
    pub method: String,
    /// Parameters.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC response.
#[derive(Debug, Serialize, Deserialize)]
pub struct RpcResponse {
    /// JSON-RPC version.
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Result or error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// Server-initiated notification.
#[derive(Debug, Serialize)]
pub struct RpcNotification {
    pub jsonrpc: String,
    pub method: String,
    pub params: serde_json::Value,
}

/// JSON-RPC error object.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RpcError {
    /// Error code.
    pub code: i32,
    /// Error name.
    pub message: String,
    /// Optional structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcResponse {
    /// Create a success response.
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: serde_json::Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

impl RpcError {
    fn new(code: i32, message: &str, data: Option<serde_json::Value>) -> Self {
        Self {
            code,
            message: message.to_string(),
            data,
        }
    }

    // Standard JSON-RPC errors

    /// Parse error (-32700).
    pub fn parse_error() -> Self {
        Self::new(-32700, "PARSE_ERROR", None)
    }

    /// Invalid request (-32600).
    pub fn invalid_request() -> Self {
        Self::new(-32600, "INVALID_REQUEST", None)
    }

    /// Method not found (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            -32601,
            "METHOD_NOT_FOUND",
            Some(serde_json::json!({"method": method})),
        )
    }

    /// Invalid params (-32602).
    pub fn invalid_params(detail: &str) -> Self {
        Self::new(
            -32602,
            "INVALID_PARAMS",
            Some(serde_json::json!({"detail": detail})),
        )
    }

    /// Internal error (-32603).
    pub fn internal_error(detail: &str) -> Self {
        Self::new(
            -32603,
            "INTERNAL_ERROR",
            Some(serde_json::json!({"detail": detail})),
        )
    }

    // Authentication

    /// Mutating method called without an auth envelope (-32010).
    pub fn auth_required() -> Self {
        Self::new(-32010, "AUTH_REQUIRED", None)
    }

    /// Signature does not verify (-32011).
    pub fn bad_signature() -> Self {
        Self::new(-32011, "BAD_SIGNATURE", None)
    }

    /// Nonce not above the caller's last accepted one (-32012).
    pub fn nonce_replayed(nonce: u64, last: u64) -> Self {
        Self::new(
            -32012,
            "NONCE_REPLAYED",
            Some(serde_json::json!({"nonce": nonce, "last": last})),
        )
    }

    // Protocol errors, one code per class

    /// Malformed input (-32020).
    pub fn validation_failed(detail: &str) -> Self {
        Self::new(
            -32020,
            "VALIDATION_FAILED",
            Some(serde_json::json!({"detail": detail})),
        )
    }

    /// Caller lacks the required role (-32021).
    pub fn unauthorized(detail: &str) -> Self {
        Self::new(
            -32021,
            "UNAUTHORIZED",
            Some(serde_json::json!({"detail": detail})),
        )
    }

    /// Current state forbids the command (-32022).
    pub fn precondition_failed(detail: &str) -> Self {
        Self::new(
            -32022,
            "PRECONDITION_FAILED",
            Some(serde_json::json!({"detail": detail})),
        )
    }

    /// A pool or balance cannot cover the request (-32023).
    pub fn insufficient_funds(detail: &str) -> Self {
        Self::new(
            -32023,
            "INSUFFICIENT_FUNDS",
            Some(serde_json::json!({"detail": detail})),
        )
    }
}

impl From<ProtocolError> for RpcError {
    fn from(err: ProtocolError) -> Self {
        let detail = err.to_string();
        match err.class() {
            ErrorClass::Validation => Self::validation_failed(&detail),
            ErrorClass::Authorization => Self::unauthorized(&detail),
            ErrorClass::Precondition => Self::precondition_failed(&detail),
            ErrorClass::Resource => Self::insufficient_funds(&detail),
            ErrorClass::Internal => Self::internal_error(&detail),
        }
    }
}

impl From<AuthError> for RpcError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Missing => Self::auth_required(),
            AuthError::Malformed(detail) => Self::invalid_params(&detail),
            AuthError::BadSignature => Self::bad_signature(),
        }
    }
}

/// The RPC server.
pub struct RpcServer {
    state: Arc<DaemonState>,
    socket_path: PathBuf,
}

impl RpcServer {
    /// Create a new RPC server.
    pub fn new(state: Arc<DaemonState>, socket_path: PathBuf) -> Self {
        Self { state, socket_path }
    }

    /// Run the server, accepting connections.
    pub async fn run(&self) -> anyhow::Result<()> {
        // Remove stale socket file
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        info!(socket = %self.socket_path.display(), "IPC server listening");

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(state, stream).await {
                            warn!(error = %e, "connection error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "accept error");
                }
            }
        }
    }
}

struct Subscription {
    filter: EventFilter,
    rx: broadcast::Receiver<Event>,
}

/// Next event matching the connection's subscription. Pends forever
/// without one.
async fn next_event(subscription: &mut Option<Subscription>) -> Option<Event> {
    let Some(sub) = subscription else {
        return std::future::pending().await;
    };
    loop {
        match sub.rx.recv().await {
            Ok(event) if sub.filter.matches(&event) => return Some(event),
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "subscriber lagged; events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

/// Handle a single client connection.
async fn handle_connection(
    state: Arc<DaemonState>,
    stream: tokio::net::UnixStream,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    let mut subscription: Option<Subscription> = None;

    loop {
        let outgoing = tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break; // EOF
                };
                if line.trim().is_empty() {
                    continue;
                }
                let response = match serde_json::from_str::<RpcRequest>(&line) {
                    Ok(request) => match request.method.as_str() {
                        "subscribe_events" => subscribe(&state, &mut subscription, request),
                        "unsubscribe_events" => {
                            subscription = None;
                            RpcResponse::success(request.id, serde_json::json!({"subscribed": false}))
                        }
                        _ => dispatch_request(state.clone(), request).await,
                    },
                    Err(_) => RpcResponse::error(serde_json::Value::Null, RpcError::parse_error()),
                };
                serde_json::to_string(&response)?
            }
            event = next_event(&mut subscription) => {
                let Some(event) = event else {
                    subscription = None;
                    continue;
                };
                serde_json::to_string(&RpcNotification {
                    jsonrpc: "2.0".to_string(),
                    method: "event".to_string(),
                    params: serde_json::to_value(&event)?,
                })?
            }
        };

        writer.write_all(outgoing.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    Ok(())
}

fn subscribe(
    state: &DaemonState,
    subscription: &mut Option<Subscription>,
    request: RpcRequest,
) -> RpcResponse {
    let filter = if request.params.is_null() {
        EventFilter::default()
    } else {
        match serde_json::from_value::<EventFilter>(request.params) {
            Ok(filter) => filter,
            Err(e) => {
                return RpcResponse::error(request.id, RpcError::invalid_params(&e.to_string()))
            }
        }
    };
    debug!(?filter, "event subscription opened");
    *subscription = Some(Subscription {
        filter,
        rx: state.event_bus.subscribe(),
    });
    RpcResponse::success(
        request.id,
        serde_json::json!({"subscribed": true, "sequence": state.event_bus.sequence()}),
    )
}

/// Dispatch a JSON-RPC request to the appropriate command handler.
pub async fn dispatch_request(state: Arc<DaemonState>, request: RpcRequest) -> RpcResponse {
    let id = request.id.clone();
    if request.jsonrpc != "2.0" {
        return RpcResponse::error(id, RpcError::invalid_request());
    }
    let method = request.method.as_str();
    let params = &request.params;

    debug!(method, "dispatching RPC method");

    let result = match method {
        // Attestor commands
        "register" => commands::attestor::register(&state, params).await,
        "add_stake" => commands::attestor::add_stake(&state, params).await,
        "attest_to_claim" => commands::attestor::attest_to_claim(&state, params).await,
        "finalize_and_reward" => commands::attestor::finalize_and_reward(&state, params).await,
        "claim_rewards" => commands::attestor::claim_rewards(&state, params).await,
        "slash" => commands::attestor::slash(&state, params).await,
        "flag_claim" => commands::attestor::flag_claim(&state, params).await,

        // Claim commands
        "submit_claim" => commands::claims::submit_claim(&state, params).await,
        "reject_claim" => commands::claims::reject_claim(&state, params).await,

        // Vault commands
        "deposit" => commands::vault::deposit(&state, params).await,
        "withdraw" => commands::vault::withdraw(&state, params).await,
        "commit_to_claim" => commands::vault::commit_to_claim(&state, params).await,
        "refund_commitment" => commands::vault::refund_commitment(&state, params).await,
        "unlock_yield" => commands::vault::unlock_yield(&state, params).await,

        // Queries
        "total_claims" => commands::queries::total_claims(&state).await,
        "get_claim" => commands::queries::get_claim(&state, params).await,
        "list_claims" => commands::queries::list_claims(&state, params).await,
        "get_attestor_stats" => commands::queries::get_attestor_stats(&state, params).await,
        "has_attested" => commands::queries::has_attested(&state, params).await,
        "get_claim_attestations" => {
            commands::queries::get_claim_attestations(&state, params).await
        }
        "can_unlock_yield" => commands::queries::can_unlock_yield(&state, params).await,
        "get_balance" => commands::queries::get_balance(&state, params).await,
        "get_escrow" => commands::queries::get_escrow(&state, params).await,
        "get_reward_pool" => commands::queries::get_reward_pool(&state).await,
        "get_vault_totals" => commands::queries::get_vault_totals(&state).await,
        "get_protocol_constants" => commands::queries::get_protocol_constants(&state).await,

        // System
        "get_daemon_status" => commands::system::get_daemon_status(&state).await,
        "get_recent_transactions" => {
            commands::system::get_recent_transactions(&state, params).await
        }
        "get_payouts" => commands::system::get_payouts(&state, params).await,
        "audit" => commands::system::audit(&state).await,
        "shutdown" => commands::system::shutdown(&state, params).await,

        _ => Err(RpcError::method_not_found(method)),
    };

    match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(err) => RpcResponse::error(id, err),
    }
}
