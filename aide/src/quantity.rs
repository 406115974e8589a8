//! Hex quantities as used by the node JSON-RPC interface
//!
//! Numbers are sent as `0x` prefixed lowercase hex without leading zeros. Some
//! node versions reply with plain JSON numbers instead, both forms are accepted.

use serde::{de, Deserialize, Deserializer};
use serde_json::Value;

pub fn to_hex<T: std::fmt::LowerHex>(value: T) -> String {
    format!("{:#x}", value)
}

pub fn parse_u128(value: &str) -> Option<u128> {
    let value = value.trim();
    match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some("") => None,
        Some(hex) => u128::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

pub fn value_to_u128(value: &Value) -> Option<u128> {
    match value {
        Value::String(s) => parse_u128(s),
        Value::Number(n) => n.as_u64().map(u128::from),
        _ => None,
    }
}

pub fn value_to_u64(value: &Value) -> Option<u64> {
    value_to_u128(value).and_then(|v| u64::try_from(v).ok())
}

pub fn deserialize_opt_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        value => value_to_u64(&value)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid quantity: {}", value))),
    }
}
