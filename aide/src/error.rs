use std::time::Duration;

use ppos_common::economic::EconomicError;
use thiserror::Error;

use crate::{
    event::EventDecodeError,
    resolver::{ModuleKind, ResultMode},
    signer::SignerError,
    transport::TransportError,
};

#[derive(Error, Debug)]
pub enum AideError {
    /// Neither a per-call private key nor a default account is available
    #[error("No signing identity: pass a private key or set a default account")]
    MissingSigningIdentity,

    #[error("Result mode '{mode}' is not supported by {kind} modules")]
    UnsupportedResultMode { mode: ResultMode, kind: ModuleKind },

    #[error("Built-in contract events can only be decoded with a function id")]
    MissingFunctionId,

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Contract execution failure reported by the node, left unparsed
    #[error("Contract execution failed ({code}): {message}")]
    ContractLogic { code: i64, message: String },

    #[error(transparent)]
    Signing(#[from] SignerError),

    #[error(transparent)]
    EventDecode(#[from] EventDecodeError),

    #[error("Invalid receipt: {0}")]
    InvalidReceipt(String),

    /// Node answered with a message that matches none of the known sentinels
    #[error("Unclassified node message: {0}")]
    UnclassifiedNodeMessage(String),

    #[error("Timed out after {timeout:?} waiting for block {target}, current block is {current}")]
    BlockTimeout {
        target: u64,
        current: u64,
        timeout: Duration,
    },

    #[error(transparent)]
    Economic(#[from] EconomicError),

    #[error("Invalid contract ABI: {0}")]
    InvalidAbi(String),

    #[error("Unknown contract function '{0}'")]
    UnknownFunction(String),

    #[error("Contract function '{0}' is overloaded")]
    AmbiguousFunction(String),

    #[error("Contract is not deployed yet")]
    MissingContractAddress,
}
