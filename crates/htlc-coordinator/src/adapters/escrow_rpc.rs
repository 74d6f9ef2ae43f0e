//! JSON-RPC client for an escrow signing gateway.
//!
//! The gateway holds the relayer key, submits contract calls and answers
//! with decoded receipts. Wire methods:
//!
//! | method               | params                                          | result          |
//! |----------------------|-------------------------------------------------|-----------------|
//! | `escrow_create`      | contract, sender, receiver, hashlock, timelock, value | `EscrowReceipt` |
//! | `escrow_claim`       | contract, lockId, preimage                      | `EscrowReceipt` |
//! | `escrow_refund`      | contract, lockId                                | `EscrowReceipt` |
//! | `escrow_get`         | contract, lockId                                | `EscrowRecord` or null |

use crate::domain::{ChainRejection, Hashlock, Preimage};
use crate::ports::{EscrowReceipt, EscrowRecord, EscrowRpc, LedgerCallError};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// JSON-RPC request envelope.
#[derive(Debug, Serialize)]
struct JsonRpcRequest<T> {
    jsonrpc: &'static str,
    method: &'static str,
    params: T,
    id: u64,
}

/// JSON-RPC response envelope.
#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Reverts come back as JSON-RPC code 3 (`execution reverted`).
const REVERT_CODE: i64 = 3;

/// Escrow gateway client.
pub struct JsonRpcEscrowClient {
    client: Client,
    url: String,
    contract: String,
    request_id: AtomicU64,
}

impl JsonRpcEscrowClient {
    /// Client for `contract` behind the gateway at `url`.
    pub fn new(
        url: impl Into<String>,
        contract: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LedgerCallError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(2))
            .build()
            .map_err(|e| LedgerCallError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
            contract: contract.into(),
            request_id: AtomicU64::new(1),
        })
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Call `method`; `Ok(None)` when the result is `null`.
    async fn call<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &'static str,
        params: P,
    ) -> Result<Option<R>, LedgerCallError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id(),
        };
        debug!(method, id = request.id, "[htlc] escrow RPC");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LedgerCallError::Transport(format!("{method}: {e}")))?;

        let status = response.status();
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LedgerCallError::Transport(format!("{method}: HTTP {status}")));
        }

        let body: JsonRpcResponse<R> = response
            .json()
            .await
            .map_err(|e| LedgerCallError::Rejected(ChainRejection::MalformedResult(e.to_string())))?;

        match body.error {
            Some(error) => Err(map_rpc_error(error.code, &error.message)),
            None => Ok(body.result),
        }
    }

    async fn call_receipt<P: Serialize>(
        &self,
        method: &'static str,
        params: P,
    ) -> Result<EscrowReceipt, LedgerCallError> {
        self.call(method, params).await?.ok_or_else(|| {
            LedgerCallError::Rejected(ChainRejection::MalformedResult(format!(
                "{method} returned no receipt"
            )))
        })
    }
}

/// Translate a JSON-RPC error into a ledger call error.
///
/// Reverts are matched on the contract's custom error name; anything that is
/// not a revert is treated as a gateway fault and retried.
pub fn map_rpc_error(code: i64, message: &str) -> LedgerCallError {
    let reverted = code == REVERT_CODE || message.contains("execution reverted");
    if !reverted {
        return LedgerCallError::Transport(format!("RPC error {code}: {message}"));
    }

    const REASONS: &[(&str, Option<ChainRejection>)] = &[
        ("AlreadyClaimed", None),
        ("AlreadyRefunded", None),
        ("InsufficientValue", Some(ChainRejection::InsufficientValue)),
        ("TimelockInPast", Some(ChainRejection::TimelockInPast)),
        ("NotReceiver", Some(ChainRejection::NotReceiver)),
        ("NotSender", Some(ChainRejection::NotSender)),
        ("TimelockNotExpired", Some(ChainRejection::TimelockNotReached)),
        ("TimelockExpired", Some(ChainRejection::TimelockReached)),
        ("InvalidPreimage", Some(ChainRejection::InvalidPreimage)),
        ("LockNotFound", Some(ChainRejection::LockNotFound)),
    ];

    for (name, rejection) in REASONS {
        if message.contains(name) {
            return match rejection {
                Some(r) => LedgerCallError::Rejected(r.clone()),
                None => LedgerCallError::AlreadyResolved,
            };
        }
    }
    LedgerCallError::Rejected(ChainRejection::Other(message.to_string()))
}

#[async_trait]
impl EscrowRpc for JsonRpcEscrowClient {
    async fn create_escrow(
        &self,
        sender: &str,
        receiver: &str,
        hashlock: &Hashlock,
        timelock: u64,
        value: u128,
    ) -> Result<EscrowReceipt, LedgerCallError> {
        self.call_receipt(
            "escrow_create",
            json!({
                "contract": self.contract,
                "sender": sender,
                "receiver": receiver,
                "hashlock": format!("0x{}", hashlock.to_hex()),
                "timelock": timelock,
                "value": value.to_string(),
            }),
        )
        .await
    }

    async fn claim(&self, lock_id: &str, preimage: &Preimage) -> Result<EscrowReceipt, LedgerCallError> {
        self.call_receipt(
            "escrow_claim",
            json!({
                "contract": self.contract,
                "lockId": lock_id,
                "preimage": format!("0x{}", preimage.to_hex()),
            }),
        )
        .await
    }

    async fn refund(&self, lock_id: &str) -> Result<EscrowReceipt, LedgerCallError> {
        self.call_receipt(
            "escrow_refund",
            json!({ "contract": self.contract, "lockId": lock_id }),
        )
        .await
    }

    async fn get_escrow(&self, lock_id: &str) -> Result<Option<EscrowRecord>, LedgerCallError> {
        self.call(
            "escrow_get",
            json!({ "contract": self.contract, "lockId": lock_id }),
        )
        .await
    }
}
