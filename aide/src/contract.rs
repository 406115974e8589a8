use std::sync::Arc;

use indexmap::IndexMap;
use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    error::AideError,
    module::{Module, ModuleSettings},
    receipt::Receipt,
    resolver::{ModuleKind, Resolution, Resolver, ResultMode},
    signer::PrivateKey,
    transaction::{Address, TransactionRequest},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateMutability {
    Pure,
    View,
    Nonpayable,
    Payable,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AbiEntry {
    #[serde(rename = "type", default = "default_entry_type")]
    entry_type: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    inputs: Vec<AbiParam>,
    #[serde(default)]
    outputs: Vec<AbiParam>,
    #[serde(default)]
    state_mutability: Option<StateMutability>,
    // Pre 0.4.16 compilers only set these flags
    #[serde(default)]
    constant: bool,
    #[serde(default)]
    payable: bool,
}

fn default_entry_type() -> String {
    String::from("function")
}

impl AbiEntry {
    fn mutability(&self) -> StateMutability {
        match self.state_mutability {
            Some(mutability) => mutability,
            None if self.constant => StateMutability::View,
            None if self.payable => StateMutability::Payable,
            None => StateMutability::Nonpayable,
        }
    }
}

/// Callable contract function, captured once when the ABI is bound
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionDescriptor {
    pub name: String,
    pub mutability: StateMutability,
    pub inputs: Vec<AbiParam>,
    pub outputs: Vec<AbiParam>,
}

impl FunctionDescriptor {
    /// View and pure functions are called, never sent as transactions
    pub fn is_read_only(&self) -> bool {
        matches!(
            self.mutability,
            StateMutability::View | StateMutability::Pure
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ContractOutcome {
    /// Raw output of a read-only function
    Call(Vec<u8>),
    Transaction(Resolution),
}

/// Deployed (or to be deployed) contract described by its ABI
///
/// The function table is built once from the ABI and never changes afterwards.
/// Arguments are ABI encoded by the caller, the binding only routes the encoded call.
pub struct ContractBinding {
    module: Module,
    functions: IndexMap<String, Vec<FunctionDescriptor>>,
    address: Option<Address>,
}

impl ContractBinding {
    pub fn from_abi(
        abi: &str,
        resolver: Arc<Resolver>,
        settings: ModuleSettings,
    ) -> Result<Self, AideError> {
        let entries: Vec<AbiEntry> =
            serde_json::from_str(abi).map_err(|e| AideError::InvalidAbi(e.to_string()))?;

        let mut functions: IndexMap<String, Vec<FunctionDescriptor>> = IndexMap::new();
        for entry in entries {
            if entry.entry_type != "function" {
                continue;
            }

            let mutability = entry.mutability();
            let name = entry
                .name
                .filter(|name| !name.is_empty())
                .ok_or_else(|| AideError::InvalidAbi("function entry without a name".into()))?;

            functions
                .entry(name.clone())
                .or_default()
                .push(FunctionDescriptor {
                    name,
                    mutability,
                    inputs: entry.inputs,
                    outputs: entry.outputs,
                });
        }

        Ok(Self {
            module: Module::new(ModuleKind::Ordinary, resolver, settings)?,
            functions,
            address: None,
        })
    }

    pub fn at(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    pub fn address(&self) -> Option<&Address> {
        self.address.as_ref()
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn module_mut(&mut self) -> &mut Module {
        &mut self.module
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionDescriptor> {
        self.functions.values().flatten()
    }

    /// Function called `name`, overloaded names cannot be invoked by name
    pub fn function(&self, name: &str) -> Result<&FunctionDescriptor, AideError> {
        match self.functions.get(name).map(Vec::as_slice) {
            Some([function]) => Ok(function),
            Some(_) => Err(AideError::AmbiguousFunction(name.to_string())),
            None => Err(AideError::UnknownFunction(name.to_string())),
        }
    }

    /// Call a read-only function or send a transaction to a state changing one
    pub async fn invoke(
        &self,
        name: &str,
        data: Vec<u8>,
        overrides: Option<TransactionRequest>,
        private_key: Option<&PrivateKey>,
    ) -> Result<ContractOutcome, AideError> {
        let function = self.function(name)?;
        let address = self
            .address
            .clone()
            .ok_or(AideError::MissingContractAddress)?;

        let mut transaction = TransactionRequest::new().with_to(address).with_data(data);
        if let Some(overrides) = overrides {
            transaction.merge(overrides);
        }

        if function.is_read_only() {
            let output = self.module.call(transaction, private_key).await?;
            return Ok(ContractOutcome::Call(output));
        }

        let resolution = self.module.transact(transaction, None, private_key).await?;
        Ok(ContractOutcome::Transaction(resolution))
    }

    /// Deploy the contract and bind this instance to the created address
    ///
    /// `code` is the creation bytecode followed by the encoded constructor arguments.
    pub async fn deploy(
        &mut self,
        code: Vec<u8>,
        overrides: Option<TransactionRequest>,
        private_key: Option<&PrivateKey>,
    ) -> Result<Receipt, AideError> {
        let mut transaction = TransactionRequest::new().with_data(code);
        if let Some(overrides) = overrides {
            transaction.merge(overrides);
        }

        let receipt = self
            .module
            .transact_with_mode(transaction, ResultMode::Receipt, None, private_key)
            .await?
            .into_receipt()
            .ok_or(AideError::MissingContractAddress)?;

        let address = receipt
            .contract_address
            .as_deref()
            .map(Address::new)
            .ok_or(AideError::MissingContractAddress)?;

        if log::log_enabled!(log::Level::Info) {
            info!("Contract deployed at {}", address);
        }
        self.address = Some(address);
        Ok(receipt)
    }
}
