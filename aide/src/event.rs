use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::receipt::Receipt;

/// Marker the node puts in front of the structured payload of a built-in contract
/// failure raised during gas estimation
pub const SOFT_FAILURE_MARKER: &str = "inner contract exec failed: ";

/// Built-in contract function identifier, selects the event decoder for a receipt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FunctionId(pub u16);

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Decoded outcome of a built-in contract invocation
///
/// Successes and soft failures share this shape, they are told apart by `code`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltinEvent {
    pub code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BuiltinEvent {
    pub fn success(data: Option<Value>) -> Self {
        Self {
            code: 0,
            message: None,
            data,
            extra: Map::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventDecodeError {
    #[error("No log matching function {0} in receipt")]
    NoMatchingLog(FunctionId),

    #[error("Function {0} has no known event layout")]
    UnknownFunction(FunctionId),

    #[error("Malformed event data: {0}")]
    Malformed(String),
}

/// Extracts the built-in contract event of a receipt
///
/// The log encoding belongs to the chain, implementations are provided by the caller.
pub trait EventDecoder: Send + Sync {
    fn decode(
        &self,
        receipt: &Receipt,
        function_id: FunctionId,
    ) -> Result<BuiltinEvent, EventDecodeError>;
}

/// Parse the payload of a built-in contract soft failure out of a node error message
///
/// The payload follows [`SOFT_FAILURE_MARKER`] and may be written with single quotes.
/// Returns `None` when the marker is absent or the payload is not a JSON object with
/// a `code` field, the caller must then treat the message as a regular error.
pub fn parse_soft_failure(message: &str) -> Option<BuiltinEvent> {
    let start = message.find(SOFT_FAILURE_MARKER)? + SOFT_FAILURE_MARKER.len();
    let payload = message[start..].trim();

    let event = serde_json::from_str::<BuiltinEvent>(payload)
        .or_else(|_| serde_json::from_str::<BuiltinEvent>(&payload.replace('\'', "\"")));

    match event {
        Ok(event) => Some(event),
        Err(e) => {
            if log::log_enabled!(log::Level::Debug) {
                log::debug!("Soft failure payload '{}' is not decodable: {}", payload, e);
            }
            None
        }
    }
}
