mod json_rpc;

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, trace};
use ppos_common::economic::GenesisEconomicConfig;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::time::{sleep, Instant};

use crate::{
    quantity::{value_to_u128, value_to_u64},
    receipt::ReceiptPayload,
    transaction::{Address, SignedTransaction, TransactionRequest, TxHash},
};

pub use json_rpc::{normalize_node_url, JsonRpcClient, JsonRpcClientConfig};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("HTTP error {status}: {reason}")]
    Http { status: u16, reason: String },

    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    /// Error object returned by the node, contract logic failures land here
    #[error("RPC error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    #[error("Invalid response to {method}: {reason}")]
    InvalidResponse { method: String, reason: String },

    #[error("No receipt for transaction {hash} after {timeout:?}")]
    ReceiptTimeout { hash: TxHash, timeout: Duration },
}

impl TransportError {
    pub fn invalid_response(method: &str, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            method: method.to_string(),
            reason: reason.into(),
        }
    }
}

fn expect_u64(method: &str, value: &Value) -> Result<u64, TransportError> {
    value_to_u64(value)
        .ok_or_else(|| TransportError::invalid_response(method, format!("expected quantity, got {}", value)))
}

fn expect_u128(method: &str, value: &Value) -> Result<u128, TransportError> {
    value_to_u128(value)
        .ok_or_else(|| TransportError::invalid_response(method, format!("expected quantity, got {}", value)))
}

/// Connection to a node
///
/// Only [`ChainTransport::request`] must be implemented, the typed calls are built on it.
/// Nothing is retried at this level, callers own their retry policy.
#[async_trait]
pub trait ChainTransport: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> Result<Value, TransportError>;

    /// Delay between two receipt lookups in [`ChainTransport::wait_for_receipt`]
    fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(500)
    }

    async fn get_transaction_count(&self, address: &Address) -> Result<u64, TransportError> {
        const METHOD: &str = "platon_getTransactionCount";
        let value = self
            .request(METHOD, json!([address.as_str(), "pending"]))
            .await?;
        expect_u64(METHOD, &value)
    }

    async fn estimate_gas(&self, transaction: &TransactionRequest) -> Result<u64, TransportError> {
        const METHOD: &str = "platon_estimateGas";
        let value = self
            .request(METHOD, json!([transaction.to_rpc_object()]))
            .await?;
        expect_u64(METHOD, &value)
    }

    async fn gas_price(&self) -> Result<u128, TransportError> {
        const METHOD: &str = "platon_gasPrice";
        let value = self.request(METHOD, json!([])).await?;
        expect_u128(METHOD, &value)
    }

    async fn chain_id(&self) -> Result<u64, TransportError> {
        const METHOD: &str = "platon_chainId";
        let value = self.request(METHOD, json!([])).await?;
        expect_u64(METHOD, &value)
    }

    async fn block_number(&self) -> Result<u64, TransportError> {
        const METHOD: &str = "platon_blockNumber";
        let value = self.request(METHOD, json!([])).await?;
        expect_u64(METHOD, &value)
    }

    async fn send_raw_transaction(
        &self,
        transaction: &SignedTransaction,
    ) -> Result<TxHash, TransportError> {
        const METHOD: &str = "platon_sendRawTransaction";
        let value = self
            .request(METHOD, json!([transaction.raw_hex()]))
            .await?;
        let hash = value
            .as_str()
            .ok_or_else(|| TransportError::invalid_response(METHOD, "expected transaction hash string"))?;
        TxHash::from_hex(hash).map_err(|e| TransportError::invalid_response(METHOD, e.to_string()))
    }

    async fn get_transaction_receipt(
        &self,
        hash: &TxHash,
    ) -> Result<Option<ReceiptPayload>, TransportError> {
        let value = self
            .request("platon_getTransactionReceipt", json!([hash.to_string()]))
            .await?;
        Ok(match value {
            Value::Null => None,
            value => Some(ReceiptPayload::from_value(value)),
        })
    }

    /// Poll until the node knows a receipt for `hash`
    async fn wait_for_receipt(
        &self,
        hash: &TxHash,
        timeout: Duration,
    ) -> Result<ReceiptPayload, TransportError> {
        let deadline = Instant::now() + timeout;
        let poll_interval = self.receipt_poll_interval();

        loop {
            if let Some(receipt) = self.get_transaction_receipt(hash).await? {
                return Ok(receipt);
            }

            if Instant::now() + poll_interval > deadline {
                return Err(TransportError::ReceiptTimeout {
                    hash: *hash,
                    timeout,
                });
            }

            if log::log_enabled!(log::Level::Trace) {
                trace!("Receipt for {} not available yet", hash);
            }
            sleep(poll_interval).await;
        }
    }

    /// Read-only contract call, returns the raw output bytes
    async fn call(&self, transaction: &TransactionRequest) -> Result<Vec<u8>, TransportError> {
        const METHOD: &str = "platon_call";
        let value = self
            .request(METHOD, json!([transaction.to_rpc_object(), "latest"]))
            .await?;
        let output = value
            .as_str()
            .ok_or_else(|| TransportError::invalid_response(METHOD, "expected hex string"))?;
        hex::decode(output.strip_prefix("0x").unwrap_or(output))
            .map_err(|e| TransportError::invalid_response(METHOD, e.to_string()))
    }

    /// Genesis economic constants, fetched from the node debug API
    async fn economic_config(&self) -> Result<GenesisEconomicConfig, TransportError> {
        const METHOD: &str = "debug_economicConfig";
        let value = self.request(METHOD, json!([])).await?;

        // The node returns the config as JSON text, parsing it directly keeps 128-bit amounts exact
        let parsed = match &value {
            Value::String(text) => GenesisEconomicConfig::from_json(text),
            other => {
                debug!("Economic config returned as a JSON object, amounts beyond 17 significant digits may be rounded");
                GenesisEconomicConfig::from_value(other.clone())
            }
        };
        parsed.map_err(|e| TransportError::invalid_response(METHOD, e.to_string()))
    }

    async fn client_version(&self) -> Result<String, TransportError> {
        const METHOD: &str = "web3_clientVersion";
        let value = self.request(METHOD, json!([])).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| TransportError::invalid_response(METHOD, "expected version string"))
    }
}
