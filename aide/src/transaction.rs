use std::{fmt, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::quantity::to_hex;

/// Account or contract address, either bech32 (`lat1...`) or `0x` hex
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressParseError {
    #[error("Address is empty")]
    Empty,
    #[error("Address '{0}' contains invalid characters")]
    InvalidCharacters(String),
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.is_empty() {
            return Err(AddressParseError::Empty);
        }
        if !value.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AddressParseError::InvalidCharacters(value.to_string()));
        }
        Ok(Self::new(value))
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HashParseError {
    #[error("Invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("Invalid hash length {0}, expected 32 bytes")]
    Length(usize),
}

/// Identifier of a broadcast transaction
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHash([u8; 32]);

impl TxHash {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_hex(value: &str) -> Result<Self, HashParseError> {
        let value = value.trim();
        let value = value.strip_prefix("0x").unwrap_or(value);
        let bytes = hex::decode(value)?;
        let bytes: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| HashParseError::Length(bytes.len()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self)
    }
}

impl Serialize for TxHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::from_hex(&value).map_err(de::Error::custom)
    }
}

/// Unsigned transaction payload
///
/// Built by a module from caller supplied and defaulted fields, then consumed once
/// by the resolver. Unset fields are filled from the node before signing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: Option<Address>,
    pub to: Option<Address>,
    pub value: Option<u128>,
    pub gas: Option<u64>,
    pub gas_price: Option<u128>,
    pub chain_id: Option<u64>,
    pub nonce: Option<u64>,
    pub data: Option<Vec<u8>>,
}

impl TransactionRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_to(mut self, to: Address) -> Self {
        self.to = Some(to);
        self
    }

    pub fn with_value(mut self, value: u128) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_gas(mut self, gas: u64) -> Self {
        self.gas = Some(gas);
        self
    }

    pub fn with_gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = Some(gas_price);
        self
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = Some(data);
        self
    }

    /// Apply caller supplied fields on top of the module defaults
    pub fn merge(&mut self, overrides: TransactionRequest) {
        let TransactionRequest {
            from,
            to,
            value,
            gas,
            gas_price,
            chain_id,
            nonce,
            data,
        } = overrides;

        if from.is_some() {
            self.from = from;
        }
        if to.is_some() {
            self.to = to;
        }
        if value.is_some() {
            self.value = value;
        }
        if gas.is_some() {
            self.gas = gas;
        }
        if gas_price.is_some() {
            self.gas_price = gas_price;
        }
        if chain_id.is_some() {
            self.chain_id = chain_id;
        }
        if nonce.is_some() {
            self.nonce = nonce;
        }
        if data.is_some() {
            self.data = data;
        }
    }

    /// JSON-RPC object form, unset fields are omitted
    pub fn to_rpc_object(&self) -> Value {
        let mut object = Map::new();
        if let Some(from) = &self.from {
            object.insert("from".into(), Value::String(from.to_string()));
        }
        if let Some(to) = &self.to {
            object.insert("to".into(), Value::String(to.to_string()));
        }
        if let Some(value) = self.value {
            object.insert("value".into(), Value::String(to_hex(value)));
        }
        if let Some(gas) = self.gas {
            object.insert("gas".into(), Value::String(to_hex(gas)));
        }
        if let Some(gas_price) = self.gas_price {
            object.insert("gasPrice".into(), Value::String(to_hex(gas_price)));
        }
        if let Some(chain_id) = self.chain_id {
            object.insert("chainId".into(), Value::String(to_hex(chain_id)));
        }
        if let Some(nonce) = self.nonce {
            object.insert("nonce".into(), Value::String(to_hex(nonce)));
        }
        if let Some(data) = &self.data {
            object.insert(
                "data".into(),
                Value::String(format!("0x{}", hex::encode(data))),
            );
        }
        Value::Object(object)
    }
}

/// Raw signed transaction, ready for broadcast
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTransaction {
    pub raw: Vec<u8>,
}

impl SignedTransaction {
    pub fn new(raw: Vec<u8>) -> Self {
        Self { raw }
    }

    pub fn raw_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_keeps_defaults_for_unset_fields() {
        let mut tx = TransactionRequest::new()
            .with_to(Address::from("lat1recipient"))
            .with_gas(21_000)
            .with_value(5);

        tx.merge(TransactionRequest::new().with_gas(42_000).with_nonce(3));

        assert_eq!(tx.to, Some(Address::from("lat1recipient")));
        assert_eq!(tx.gas, Some(42_000));
        assert_eq!(tx.value, Some(5));
        assert_eq!(tx.nonce, Some(3));
        assert_eq!(tx.gas_price, None);
    }

    #[test]
    fn test_rpc_object() {
        let tx = TransactionRequest::new()
            .with_to(Address::from("lat1recipient"))
            .with_value(1_000_000_000_000_000_000)
            .with_gas(21_000)
            .with_data(vec![0xde, 0xad]);

        assert_eq!(
            tx.to_rpc_object(),
            json!({
                "to": "lat1recipient",
                "value": "0xde0b6b3a7640000",
                "gas": "0x5208",
                "data": "0xdead"
            })
        );
    }

    #[test]
    fn test_tx_hash_hex() {
        let text = "0x00000000000000000000000000000000000000000000000000000000000000ff";
        let hash = TxHash::from_hex(text).unwrap();
        assert_eq!(hash.as_bytes()[31], 0xff);
        assert_eq!(hash.to_string(), text);

        assert_eq!(TxHash::from_hex("0xabcd"), Err(HashParseError::Length(2)));
        assert!(matches!(TxHash::from_hex("0xzz"), Err(HashParseError::Hex(_))));
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(
            "lat1zqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqr".parse::<Address>().unwrap().as_str(),
            "lat1zqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqr"
        );
        assert_eq!("".parse::<Address>(), Err(AddressParseError::Empty));
        assert!(matches!(
            "lat1 bad".parse::<Address>(),
            Err(AddressParseError::InvalidCharacters(_))
        ));
    }
}
