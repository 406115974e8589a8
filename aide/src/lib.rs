//! PPOS aide library
//!
//! Resolves module transactions to the result shape requested by the caller
//! (unsigned transaction, hash, receipt or built-in contract event) and exposes
//! the economic period calculator of a connected node.

pub mod aide;
pub mod builtin;
pub mod config;
pub mod contract;
pub mod error;
pub mod event;
pub mod module;
pub mod node_message;
pub mod nonce;
pub mod quantity;
pub mod receipt;
pub mod resolver;
pub mod signer;
pub mod transaction;
pub mod transfer;
pub mod transport;
pub mod waiter;

pub use aide::{Aide, AideOptions};
pub use builtin::{BuiltinContract, BuiltinModule};
pub use config::{AideConfig, ConfigValidationError};
pub use contract::{ContractBinding, ContractOutcome, FunctionDescriptor, StateMutability};
pub use error::AideError;
pub use event::{BuiltinEvent, EventDecoder, FunctionId};
pub use module::{Module, ModuleSettings};
pub use receipt::Receipt;
pub use resolver::{ModuleKind, Resolution, Resolver, ResultMode};
pub use signer::{PrivateKey, TransactionSigner};
pub use transaction::{Address, TransactionRequest, TxHash};
pub use transfer::Transfer;
pub use transport::{ChainTransport, JsonRpcClient, TransportError};
