use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::Value;
use url::Url;

use super::{ChainTransport, TransportError};

/// Configuration for the JSON-RPC client timeouts
#[derive(Debug, Clone)]
pub struct JsonRpcClientConfig {
    pub request_timeout: Duration,
    pub connection_timeout: Duration,
    pub receipt_poll_interval: Duration,
}

impl Default for JsonRpcClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
            receipt_poll_interval: Duration::from_millis(500),
        }
    }
}

/// HTTP JSON-RPC 2.0 connection to a node
pub struct JsonRpcClient {
    client: Client,
    url: Url,
    config: JsonRpcClientConfig,
}

/// JSON-RPC request structure
#[derive(Debug, serde::Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u32,
    method: &'a str,
    params: Value,
}

/// JSON-RPC response structure
#[derive(Debug, serde::Deserialize)]
#[allow(dead_code)]
struct JsonRpcResponse {
    jsonrpc: Option<String>,
    id: Option<Value>,
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

/// JSON-RPC error structure
#[derive(Debug, serde::Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
    data: Option<Value>,
}

/// Prefix bare `host:port` node addresses with `http://`
pub fn normalize_node_url(address: &str) -> Result<Url, url::ParseError> {
    if address.starts_with("http://") || address.starts_with("https://") {
        Url::parse(address)
    } else {
        Url::parse(&format!("http://{}", address))
    }
}

impl JsonRpcClient {
    pub fn new(node_address: &str) -> Result<Self, TransportError> {
        Self::with_config(node_address, JsonRpcClientConfig::default())
    }

    pub fn with_config(
        node_address: &str,
        config: JsonRpcClientConfig,
    ) -> Result<Self, TransportError> {
        let url = normalize_node_url(node_address)
            .map_err(|e| TransportError::Connection(format!("invalid node address '{}': {}", node_address, e)))?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connection_timeout)
            .build()
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            url,
            config,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn config(&self) -> &JsonRpcClientConfig {
        &self.config
    }
}

#[async_trait]
impl ChainTransport for JsonRpcClient {
    async fn request(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: rand::random::<u32>(),
            method,
            params,
        };

        if log::log_enabled!(log::Level::Debug) {
            debug!("Making JSON-RPC request to {}: {}", self.url, method);
        }

        let response = self
            .client
            .post(self.url.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(self.config.request_timeout)
                } else {
                    TransportError::Connection(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(TransportError::Http {
                status: response.status().as_u16(),
                reason: response
                    .status()
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string(),
            });
        }

        let rpc_response: JsonRpcResponse = response.json().await.map_err(|e| {
            TransportError::invalid_response(method, format!("failed to parse JSON response: {}", e))
        })?;

        if let Some(error) = rpc_response.error {
            return Err(TransportError::Rpc {
                code: error.code,
                message: error.message,
                data: error.data,
            });
        }

        // A null result is meaningful, e.g. a receipt that is not available yet
        Ok(rpc_response.result.unwrap_or(Value::Null))
    }

    fn receipt_poll_interval(&self) -> Duration {
        self.config.receipt_poll_interval
    }
}
