use std::fmt;

use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::transaction::{Address, SignedTransaction, TransactionRequest};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignerError {
    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    /// A field the signature covers was not filled before signing
    #[error("Transaction is missing field '{0}'")]
    IncompleteTransaction(&'static str),

    #[error("Signing failed: {0}")]
    Signing(String),
}

/// Secp256k1 private key material, wiped from memory on drop
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey([u8; 32]);

impl PrivateKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(value: &str) -> Result<Self, SignerError> {
        let value = value.trim();
        let value = value.strip_prefix("0x").unwrap_or(value);

        let mut bytes = hex::decode(value).map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        if bytes.len() != 32 {
            let len = bytes.len();
            bytes.zeroize();
            return Err(SignerError::InvalidKey(format!(
                "expected 32 bytes, got {}",
                len
            )));
        }

        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes);
        bytes.zeroize();
        Ok(Self(key))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

// Key material never ends up in logs
impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// Address derivation and transaction signing, backed by the chain cryptography
pub trait TransactionSigner: Send + Sync {
    fn address(&self, key: &PrivateKey) -> Result<Address, SignerError>;

    fn sign(
        &self,
        transaction: &TransactionRequest,
        key: &PrivateKey,
    ) -> Result<SignedTransaction, SignerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_key_from_hex() {
        let hex_key = format!("0x{}", "11".repeat(32));
        let key = PrivateKey::from_hex(&hex_key).unwrap();
        assert_eq!(key.as_bytes(), &[0x11; 32]);

        assert!(matches!(
            PrivateKey::from_hex("0x1234"),
            Err(SignerError::InvalidKey(_))
        ));
        assert!(matches!(
            PrivateKey::from_hex("not hex"),
            Err(SignerError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_private_key_is_redacted() {
        let key = PrivateKey::from_bytes([0xab; 32]);
        assert_eq!(format!("{:?}", key), "PrivateKey(<redacted>)");
    }
}
