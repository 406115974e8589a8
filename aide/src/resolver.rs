//! Transaction result resolution
//!
//! Every state changing module call goes through [`Resolver::resolve`], which runs only
//! the part of the build / sign / broadcast / wait / decode pipeline needed by the
//! requested [`ResultMode`]:
//!
//! 1. `Transaction` returns the request untouched, nothing is signed or sent
//! 2. missing fields are filled from the node, then the request is signed and broadcast
//! 3. `Hash` returns the transaction hash
//! 4. the receipt is awaited and normalized, `Receipt` returns it
//! 5. `Event` decodes the built-in contract event from the receipt
//!
//! Built-in contracts report logic failures while the node estimates gas. Such a
//! failure carries a structured payload which is returned as [`Resolution::Event`]
//! instead of an error, whatever the requested mode, since no transaction exists.

use std::{sync::Arc, time::Duration};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{
    error::AideError,
    event::{parse_soft_failure, BuiltinEvent, EventDecoder, FunctionId},
    nonce::NonceSequencer,
    receipt::Receipt,
    signer::{PrivateKey, TransactionSigner},
    transaction::{Address, TransactionRequest, TxHash},
    transport::{ChainTransport, TransportError},
};

/// Default delay before giving up on a transaction receipt
pub const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);

/// Shape of the value returned by a transaction producing call
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ResultMode {
    /// Built but unsigned transaction
    #[serde(alias = "txn")]
    #[strum(to_string = "transaction", serialize = "txn")]
    Transaction,
    Hash,
    Receipt,
    /// Decoded built-in contract event
    #[serde(alias = "ic-event")]
    #[strum(to_string = "event", serialize = "ic-event")]
    Event,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ModuleKind {
    /// Deployed contracts and plain transfers
    Ordinary,
    /// Protocol precompiled contracts (staking, delegation, slashing, governance, restricting)
    BuiltIn,
}

impl ModuleKind {
    pub fn default_result_mode(self) -> ResultMode {
        match self {
            Self::Ordinary => ResultMode::Receipt,
            Self::BuiltIn => ResultMode::Event,
        }
    }

    pub fn supports(self, mode: ResultMode) -> bool {
        mode != ResultMode::Event || self == Self::BuiltIn
    }

    pub fn check_result_mode(self, mode: ResultMode) -> Result<(), AideError> {
        if !self.supports(mode) {
            return Err(AideError::UnsupportedResultMode { mode, kind: self });
        }
        Ok(())
    }
}

/// Value produced by [`Resolver::resolve`]
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution {
    Transaction(TransactionRequest),
    Hash(TxHash),
    Receipt(Receipt),
    Event(BuiltinEvent),
}

impl Resolution {
    pub fn hash(&self) -> Option<&TxHash> {
        match self {
            Self::Hash(hash) => Some(hash),
            _ => None,
        }
    }

    pub fn into_receipt(self) -> Option<Receipt> {
        match self {
            Self::Receipt(receipt) => Some(receipt),
            _ => None,
        }
    }

    pub fn into_event(self) -> Option<BuiltinEvent> {
        match self {
            Self::Event(event) => Some(event),
            _ => None,
        }
    }
}

/// Per call parameters of [`Resolver::resolve`]
#[derive(Clone, Copy, Debug)]
pub struct Invocation<'a> {
    pub kind: ModuleKind,
    pub mode: ResultMode,
    pub signing_key: Option<&'a PrivateKey>,
    /// Selects the event decoder, built-in contract calls only
    pub function_id: Option<FunctionId>,
}

enum Prepared {
    Ready(TransactionRequest),
    SoftFailure(BuiltinEvent),
}

pub struct Resolver {
    transport: Arc<dyn ChainTransport>,
    signer: Arc<dyn TransactionSigner>,
    decoder: Arc<dyn EventDecoder>,
    nonces: Option<Arc<NonceSequencer>>,
    receipt_timeout: Duration,
}

impl Resolver {
    pub fn new(
        transport: Arc<dyn ChainTransport>,
        signer: Arc<dyn TransactionSigner>,
        decoder: Arc<dyn EventDecoder>,
    ) -> Self {
        Self {
            transport,
            signer,
            decoder,
            nonces: None,
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
        }
    }

    pub fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = timeout;
        self
    }

    /// Hand out nonces locally instead of reading the node count on every call
    pub fn with_nonce_sequencer(mut self, sequencer: Arc<NonceSequencer>) -> Self {
        self.nonces = Some(sequencer);
        self
    }

    pub fn transport(&self) -> &Arc<dyn ChainTransport> {
        &self.transport
    }

    pub fn signer(&self) -> &Arc<dyn TransactionSigner> {
        &self.signer
    }

    pub fn receipt_timeout(&self) -> Duration {
        self.receipt_timeout
    }

    pub async fn resolve(
        &self,
        transaction: TransactionRequest,
        invocation: Invocation<'_>,
    ) -> Result<Resolution, AideError> {
        let Invocation {
            kind,
            mode,
            signing_key,
            function_id,
        } = invocation;

        // Everything that can be rejected locally is rejected before any network call
        kind.check_result_mode(mode)?;
        let key = signing_key.ok_or(AideError::MissingSigningIdentity)?;
        if mode == ResultMode::Event && function_id.is_none() {
            return Err(AideError::MissingFunctionId);
        }

        if mode == ResultMode::Transaction {
            return Ok(Resolution::Transaction(transaction));
        }

        let address = self.signer.address(key)?;
        let transaction = match self.prepare(transaction, &address, kind).await? {
            Prepared::Ready(transaction) => transaction,
            Prepared::SoftFailure(event) => return Ok(Resolution::Event(event)),
        };

        let hash = match self.broadcast(&transaction, key).await {
            Ok(hash) => hash,
            Err(e) => {
                if let Some(nonces) = &self.nonces {
                    nonces.invalidate(&address);
                }
                return Err(e);
            }
        };

        if log::log_enabled!(log::Level::Info) {
            info!("Transaction {} sent from {}", hash, address);
        }

        if mode == ResultMode::Hash {
            return Ok(Resolution::Hash(hash));
        }

        let receipt = self
            .transport
            .wait_for_receipt(&hash, self.receipt_timeout)
            .await?
            .into_receipt()?;

        if log::log_enabled!(log::Level::Debug) {
            debug!(
                "Receipt for {} in block {:?}, status {:?}",
                hash, receipt.block_number, receipt.status
            );
        }

        match (mode, function_id) {
            (ResultMode::Event, Some(function_id)) => {
                Ok(Resolution::Event(self.decoder.decode(&receipt, function_id)?))
            }
            (ResultMode::Event, None) => Err(AideError::MissingFunctionId),
            _ => Ok(Resolution::Receipt(receipt)),
        }
    }

    /// Read-only contract call, never signed nor broadcast
    pub async fn call(
        &self,
        mut transaction: TransactionRequest,
        caller: Option<&PrivateKey>,
    ) -> Result<Vec<u8>, AideError> {
        if transaction.from.is_none() {
            if let Some(key) = caller {
                transaction.from = Some(self.signer.address(key)?);
            }
        }

        self.transport
            .call(&transaction)
            .await
            .map_err(|e| match e {
                TransportError::Rpc { code, message, .. } => {
                    AideError::ContractLogic { code, message }
                }
                e => e.into(),
            })
    }

    async fn prepare(
        &self,
        mut transaction: TransactionRequest,
        address: &Address,
        kind: ModuleKind,
    ) -> Result<Prepared, AideError> {
        if transaction.from.is_none() {
            transaction.from = Some(address.clone());
        }
        if transaction.chain_id.is_none() {
            transaction.chain_id = Some(self.transport.chain_id().await?);
        }
        if transaction.gas_price.is_none() {
            transaction.gas_price = Some(self.transport.gas_price().await?);
        }

        if transaction.gas.is_none() {
            match self.transport.estimate_gas(&transaction).await {
                Ok(gas) => transaction.gas = Some(gas),
                Err(TransportError::Rpc { code, message, .. }) => {
                    return Self::contract_failure(kind, code, message);
                }
                Err(e) => return Err(e.into()),
            }
        }

        // Filled last so a soft failure never consumes a sequenced nonce
        if transaction.nonce.is_none() {
            let nonce = match &self.nonces {
                Some(nonces) => nonces.next(self.transport.as_ref(), address).await?,
                None => self.transport.get_transaction_count(address).await?,
            };
            transaction.nonce = Some(nonce);
        }

        Ok(Prepared::Ready(transaction))
    }

    fn contract_failure(
        kind: ModuleKind,
        code: i64,
        message: String,
    ) -> Result<Prepared, AideError> {
        if kind == ModuleKind::BuiltIn {
            if let Some(event) = parse_soft_failure(&message) {
                if log::log_enabled!(log::Level::Info) {
                    info!(
                        "Built-in contract rejected the transaction with code {}",
                        event.code
                    );
                }
                return Ok(Prepared::SoftFailure(event));
            }
        }

        Err(AideError::ContractLogic { code, message })
    }

    async fn broadcast(
        &self,
        transaction: &TransactionRequest,
        key: &PrivateKey,
    ) -> Result<TxHash, AideError> {
        let signed = self.signer.sign(transaction, key)?;
        Ok(self.transport.send_raw_transaction(&signed).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_result_mode_names() {
        assert_eq!(ResultMode::from_str("txn").unwrap(), ResultMode::Transaction);
        assert_eq!(ResultMode::from_str("ic-event").unwrap(), ResultMode::Event);
        assert_eq!(ResultMode::from_str("Receipt").unwrap(), ResultMode::Receipt);
        assert_eq!(ResultMode::Transaction.to_string(), "transaction");
        assert!(ResultMode::from_str("auto").is_err());
    }

    #[test]
    fn test_module_kind_modes() {
        assert_eq!(ModuleKind::Ordinary.default_result_mode(), ResultMode::Receipt);
        assert_eq!(ModuleKind::BuiltIn.default_result_mode(), ResultMode::Event);
        assert_eq!(ModuleKind::BuiltIn.to_string(), "built-in");

        assert!(ModuleKind::BuiltIn.check_result_mode(ResultMode::Event).is_ok());
        assert!(ModuleKind::Ordinary.check_result_mode(ResultMode::Hash).is_ok());
        assert!(matches!(
            ModuleKind::Ordinary.check_result_mode(ResultMode::Event),
            Err(AideError::UnsupportedResultMode {
                mode: ResultMode::Event,
                kind: ModuleKind::Ordinary
            })
        ));
    }
}
