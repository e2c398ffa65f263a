//! JSON-RPC ledger client.

pub mod types;

use arbor_core::{LedgerClient, LedgerError};
use arbor_types::{Address, Lamports, Signature, TransactionRecord};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, trace};
use types::{
    CommitmentConfig, EncodedTransaction, RpcRequest, RpcResponse, TransactionConfig, WithContext,
};

/// Commitment used for every read.
const COMMITMENT: &str = "confirmed";

/// [`LedgerClient`] over a cluster's JSON-RPC endpoint.
///
/// Cheap to share: the underlying HTTP client pools connections.
#[derive(Debug)]
pub struct RpcClient {
    endpoint: String,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Create a client with the default request timeout.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, LedgerError> {
        Self::with_timeout(endpoint, crate::config::DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, LedgerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
            next_id: AtomicU64::new(1),
        })
    }

    /// The endpoint this client talks to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call<P, R>(&self, method: &str, params: P) -> Result<Option<R>, LedgerError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest::new(id, method, params);
        trace!(method, id, "Sending RPC request");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerError::Transport(format!(
                "{} returned HTTP {}: {}",
                method,
                status.as_u16(),
                body
            )));
        }

        let body: RpcResponse<R> = response
            .json()
            .await
            .map_err(|e| LedgerError::Decode(format!("{}: {}", method, e)))?;

        if let Some(error) = body.error {
            debug!(method, code = error.code, message = %error.message, "RPC error");
            let signature = error.signature();
            return Err(LedgerError::Rpc {
                code: error.code,
                message: error.message,
                signature,
            });
        }

        Ok(body.result)
    }

    /// Like [`call`](Self::call), but a `null` result is a decode error.
    async fn call_required<P, R>(&self, method: &str, params: P) -> Result<R, LedgerError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        self.call(method, params)
            .await?
            .ok_or_else(|| LedgerError::Decode(format!("{}: missing result", method)))
    }
}

fn commitment() -> CommitmentConfig {
    CommitmentConfig {
        commitment: COMMITMENT,
    }
}

#[async_trait]
impl LedgerClient for RpcClient {
    async fn get_balance(&self, address: &Address) -> Result<Lamports, LedgerError> {
        let result: WithContext<u64> = self
            .call_required("getBalance", (address.to_base58(), commitment()))
            .await?;
        trace!(%address, slot = result.context.slot, balance = result.value, "Balance");
        Ok(Lamports(result.value))
    }

    async fn get_allocation_cost(&self, size_bytes: u64) -> Result<Lamports, LedgerError> {
        let cost: u64 = self
            .call_required("getMinimumBalanceForRentExemption", (size_bytes, commitment()))
            .await?;
        Ok(Lamports(cost))
    }

    async fn request_top_up(
        &self,
        address: &Address,
        amount: Lamports,
    ) -> Result<Signature, LedgerError> {
        let signature: String = self
            .call_required(
                "requestAirdrop",
                (address.to_base58(), amount.get(), commitment()),
            )
            .await?;
        signature
            .parse()
            .map_err(|e| LedgerError::Decode(format!("requestAirdrop: {}", e)))
    }

    async fn get_transaction_record(
        &self,
        signature: &str,
    ) -> Result<Option<TransactionRecord>, LedgerError> {
        let config = TransactionConfig {
            commitment: COMMITMENT,
            encoding: "json",
            max_supported_transaction_version: 0,
        };
        let result: Option<EncodedTransaction> =
            self.call("getTransaction", (signature, config)).await?;

        Ok(result.map(|tx| {
            let (log_messages, error) = match tx.meta {
                Some(meta) => (meta.log_messages, meta.err.map(|err| err.to_string())),
                None => (None, None),
            };
            TransactionRecord {
                slot: tx.slot,
                log_messages,
                error,
            }
        }))
    }
}
