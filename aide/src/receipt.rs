use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{error::AideError, quantity};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub address: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub data: String,
}

impl LogEntry {
    pub fn data_bytes(&self) -> Result<Vec<u8>, hex::FromHexError> {
        let data = self.data.strip_prefix("0x").unwrap_or(&self.data);
        hex::decode(data)
    }
}

/// Transaction execution receipt
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub transaction_hash: String,
    #[serde(default, deserialize_with = "quantity::deserialize_opt_u64")]
    pub block_number: Option<u64>,
    #[serde(default)]
    pub block_hash: Option<String>,
    #[serde(default, deserialize_with = "quantity::deserialize_opt_u64")]
    pub status: Option<u64>,
    #[serde(default, deserialize_with = "quantity::deserialize_opt_u64")]
    pub gas_used: Option<u64>,
    #[serde(default)]
    pub contract_address: Option<String>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Receipt {
    /// Execution status, receipts from older nodes carry no status at all
    pub fn is_success(&self) -> bool {
        self.status.map_or(true, |status| status == 1)
    }
}

/// Receipt exactly as the node returned it
///
/// Some node versions send the receipt as a byte string holding JSON text instead
/// of a JSON object. Both are normalized to a [`Receipt`] by [`ReceiptPayload::into_receipt`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReceiptPayload {
    Json(Value),
    Bytes(Vec<u8>),
}

impl ReceiptPayload {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Bytes(text.into_bytes()),
            Value::Array(items) if !items.is_empty() && items.iter().all(is_byte) => Self::Bytes(
                items
                    .iter()
                    .filter_map(|v| v.as_u64())
                    .map(|v| v as u8)
                    .collect(),
            ),
            value => Self::Json(value),
        }
    }

    pub fn into_receipt(self) -> Result<Receipt, AideError> {
        let value = match self {
            Self::Json(value) => value,
            Self::Bytes(bytes) => {
                let text = String::from_utf8(bytes)
                    .map_err(|e| AideError::InvalidReceipt(format!("not UTF-8: {}", e)))?;
                let text = decode_hex_text(&text)?;
                serde_json::from_str(&text)
                    .map_err(|e| AideError::InvalidReceipt(format!("not JSON: {}", e)))?
            }
        };

        serde_json::from_value(value).map_err(|e| AideError::InvalidReceipt(e.to_string()))
    }
}

fn is_byte(value: &Value) -> bool {
    value.as_u64().is_some_and(|v| v <= u8::MAX as u64)
}

// A 0x prefixed string is the hex encoding of the JSON text
fn decode_hex_text(text: &str) -> Result<String, AideError> {
    let trimmed = text.trim();
    match trimmed.strip_prefix("0x") {
        Some(hex_text) => {
            let bytes = hex::decode(hex_text)
                .map_err(|e| AideError::InvalidReceipt(format!("invalid hex: {}", e)))?;
            String::from_utf8(bytes)
                .map_err(|e| AideError::InvalidReceipt(format!("not UTF-8: {}", e)))
        }
        None => Ok(trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn receipt_json() -> Value {
        json!({
            "transactionHash": "0x01",
            "blockNumber": "0x64",
            "blockHash": "0x02",
            "status": "0x1",
            "gasUsed": 21000,
            "contractAddress": null,
            "logs": [{
                "address": "lat1zqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqzsjx8h7",
                "topics": [],
                "data": "0xc3c20130"
            }],
            "cumulativeGasUsed": "0x5208"
        })
    }

    #[test]
    fn test_json_receipt() {
        let receipt = ReceiptPayload::from_value(receipt_json()).into_receipt().unwrap();
        assert_eq!(receipt.block_number, Some(100));
        assert_eq!(receipt.gas_used, Some(21_000));
        assert!(receipt.is_success());
        assert_eq!(receipt.logs[0].data_bytes().unwrap(), vec![0xc3, 0xc2, 0x01, 0x30]);
        assert_eq!(receipt.extra["cumulativeGasUsed"], json!("0x5208"));
    }

    #[test]
    fn test_byte_string_receipt_is_decoded() {
        let text = receipt_json().to_string();
        let from_text = ReceiptPayload::from_value(Value::String(text.clone()));
        assert!(matches!(from_text, ReceiptPayload::Bytes(_)));

        let from_hex = ReceiptPayload::from_value(Value::String(format!(
            "0x{}",
            hex::encode(text.as_bytes())
        )));
        let from_array = ReceiptPayload::from_value(Value::Array(
            text.bytes().map(|b| json!(b)).collect(),
        ));

        let expected = ReceiptPayload::Json(receipt_json()).into_receipt().unwrap();
        assert_eq!(from_text.into_receipt().unwrap(), expected);
        assert_eq!(from_hex.into_receipt().unwrap(), expected);
        assert_eq!(from_array.into_receipt().unwrap(), expected);
    }

    #[test]
    fn test_invalid_receipt() {
        let err = ReceiptPayload::Bytes(b"not a receipt".to_vec())
            .into_receipt()
            .unwrap_err();
        assert!(matches!(err, AideError::InvalidReceipt(_)));

        let failed = ReceiptPayload::Json(json!({"transactionHash": "0x01", "status": "0x0"}))
            .into_receipt()
            .unwrap();
        assert!(!failed.is_success());
    }
}
