//! REST client for the claimable-balance ledger.
//!
//! Reads go to the ledger's query API, writes to a signing submission service
//! that holds the relayer key:
//!
//! - `GET  {horizon}/claimable_balances/{id}` -> `BalanceRecord` (404 once consumed)
//! - `GET  {horizon}/claimable_balances/{id}/claim` -> `ClaimRecord` (404 if none)
//! - `POST {submit}/claimable_balances` <- `CreateBalanceOp`
//! - `POST {submit}/claimable_balances/{id}/claim` <- `{claimant, preimage?}`
//!
//! Failed submissions come back as HTTP 400 with
//! `{"extras": {"result_codes": {"operations": ["op_..."]}}}`.

use crate::domain::{ChainRejection, Preimage};
use crate::ports::{
    rejection_from_code, BalanceRecord, ClaimRecord, ClaimableBalanceLedger, CreateBalanceOp,
    LedgerCallError, LedgerTxResult,
};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Claimable-balance ledger over HTTP.
pub struct HorizonLedgerClient {
    client: Client,
    horizon_url: String,
    submit_url: String,
}

impl HorizonLedgerClient {
    /// Client reading from `horizon_url` and submitting to `submit_url`.
    pub fn new(
        horizon_url: impl Into<String>,
        submit_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LedgerCallError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(2))
            .build()
            .map_err(|e| LedgerCallError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            horizon_url: horizon_url.into().trim_end_matches('/').to_string(),
            submit_url: submit_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_optional<R: DeserializeOwned>(&self, url: String) -> Result<Option<R>, LedgerCallError> {
        debug!(url = %url, "[htlc] ledger query");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LedgerCallError::Transport(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode(response).await.map(Some)
    }

    async fn submit(&self, url: String, body: serde_json::Value) -> Result<LedgerTxResult, LedgerCallError> {
        debug!(url = %url, "[htlc] ledger submit");
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerCallError::Transport(e.to_string()))?;
        decode(response).await
    }
}

async fn decode<R: DeserializeOwned>(response: Response) -> Result<R, LedgerCallError> {
    let status = response.status();
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        return Err(LedgerCallError::Transport(format!("HTTP {status}")));
    }
    if status.is_client_error() {
        let body: serde_json::Value = response.json().await.unwrap_or_default();
        return Err(classify_failure(status, &body));
    }
    response
        .json()
        .await
        .map_err(|e| LedgerCallError::Rejected(ChainRejection::MalformedResult(e.to_string())))
}

fn first_failed_code(body: &serde_json::Value) -> Option<String> {
    body.pointer("/extras/result_codes/operations")?
        .as_array()?
        .iter()
        .filter_map(|c| c.as_str())
        .find(|c| *c != "op_success")
        .map(str::to_string)
}

/// Map a 4xx problem document onto a ledger call error.
pub fn classify_failure(status: StatusCode, body: &serde_json::Value) -> LedgerCallError {
    match first_failed_code(body) {
        Some(code) => LedgerCallError::Rejected(rejection_from_code(&code)),
        None => LedgerCallError::Rejected(ChainRejection::Other(format!("HTTP {status}"))),
    }
}

#[async_trait]
impl ClaimableBalanceLedger for HorizonLedgerClient {
    async fn create_claimable_balance(
        &self,
        op: &CreateBalanceOp,
    ) -> Result<LedgerTxResult, LedgerCallError> {
        let body = serde_json::to_value(op)
            .map_err(|e| LedgerCallError::Rejected(ChainRejection::Other(e.to_string())))?;
        self.submit(format!("{}/claimable_balances", self.submit_url), body)
            .await
    }

    async fn claim_claimable_balance(
        &self,
        claimant: &str,
        balance_id: &str,
        preimage: Option<&Preimage>,
    ) -> Result<LedgerTxResult, LedgerCallError> {
        let body = json!({
            "claimant": claimant,
            "preimage": preimage.map(|p| p.to_hex()),
        });
        self.submit(
            format!("{}/claimable_balances/{balance_id}/claim", self.submit_url),
            body,
        )
        .await
    }

    async fn get_claimable_balance(
        &self,
        balance_id: &str,
    ) -> Result<Option<BalanceRecord>, LedgerCallError> {
        self.get_optional(format!("{}/claimable_balances/{balance_id}", self.horizon_url))
            .await
    }

    async fn get_claim_operation(
        &self,
        balance_id: &str,
    ) -> Result<Option<ClaimRecord>, LedgerCallError> {
        self.get_optional(format!(
            "{}/claimable_balances/{balance_id}/claim",
            self.horizon_url
        ))
        .await
    }
}
