//! Built-in (precompiled) PPOS contracts
//!
//! Call data is RLP encoded by the caller, modules here only route the pre-encoded
//! payload to the right contract with the right function id.

use std::sync::Arc;

use ppos_common::config::{GOVERN_GAS_PRICE, RESTRICTING_GAS};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::{
    error::AideError,
    event::FunctionId,
    module::{Module, ModuleSettings},
    node_message,
    resolver::{ModuleKind, Resolution, Resolver},
    signer::PrivateKey,
    transaction::{Address, TransactionRequest},
};

pub mod function {
    use crate::event::FunctionId;

    // Staking
    pub const CREATE_STAKING: FunctionId = FunctionId(1000);
    pub const EDIT_CANDIDATE: FunctionId = FunctionId(1001);
    pub const INCREASE_STAKING: FunctionId = FunctionId(1002);
    pub const WITHDRAW_STAKING: FunctionId = FunctionId(1003);
    pub const DELEGATE: FunctionId = FunctionId(1004);
    pub const WITHDRAW_DELEGATE: FunctionId = FunctionId(1005);

    // Governance
    pub const SUBMIT_TEXT_PROPOSAL: FunctionId = FunctionId(2000);
    pub const SUBMIT_VERSION_PROPOSAL: FunctionId = FunctionId(2001);
    pub const VOTE: FunctionId = FunctionId(2002);
    pub const DECLARE_VERSION: FunctionId = FunctionId(2003);
    pub const SUBMIT_PARAM_PROPOSAL: FunctionId = FunctionId(2004);
    pub const SUBMIT_CANCEL_PROPOSAL: FunctionId = FunctionId(2005);

    // Slashing
    pub const REPORT_DUPLICATE_SIGN: FunctionId = FunctionId(3000);

    // Restricting
    pub const CREATE_RESTRICTING_PLAN: FunctionId = FunctionId(4000);

    // Delegate reward
    pub const WITHDRAW_DELEGATE_REWARD: FunctionId = FunctionId(5000);
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum BuiltinContract {
    Restricting,
    Staking,
    Slashing,
    Governance,
    DelegateReward,
}

impl BuiltinContract {
    pub fn address(self) -> Address {
        Address::new(match self {
            Self::Restricting => "0x1000000000000000000000000000000000000001",
            Self::Staking => "0x1000000000000000000000000000000000000002",
            Self::Slashing => "0x1000000000000000000000000000000000000004",
            Self::Governance => "0x1000000000000000000000000000000000000005",
            Self::DelegateReward => "0x1000000000000000000000000000000000000006",
        })
    }

    /// Contract owning a function id, `None` for ids outside the PPOS table
    pub fn of_function(function_id: FunctionId) -> Option<Self> {
        match function_id.0 {
            1000..=1005 => Some(Self::Staking),
            2000..=2005 => Some(Self::Governance),
            3000 => Some(Self::Slashing),
            4000 => Some(Self::Restricting),
            5000 => Some(Self::DelegateReward),
            _ => None,
        }
    }

    /// Fields every transaction to this contract starts with
    pub fn default_transaction(self) -> TransactionRequest {
        let transaction = TransactionRequest::new().with_to(self.address());
        match self {
            Self::Restricting => transaction.with_gas(RESTRICTING_GAS),
            Self::Governance => transaction.with_gas_price(GOVERN_GAS_PRICE),
            _ => transaction,
        }
    }
}

/// Module bound to one built-in contract
#[derive(Clone)]
pub struct BuiltinModule {
    contract: BuiltinContract,
    module: Module,
}

impl BuiltinModule {
    pub fn new(
        contract: BuiltinContract,
        resolver: Arc<Resolver>,
        settings: ModuleSettings,
    ) -> Result<Self, AideError> {
        Ok(Self {
            contract,
            module: Module::new(ModuleKind::BuiltIn, resolver, settings)?,
        })
    }

    pub fn contract(&self) -> BuiltinContract {
        self.contract
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn module_mut(&mut self) -> &mut Module {
        &mut self.module
    }

    /// Send an encoded call of `function_id` and resolve it with the module result mode
    pub async fn transact(
        &self,
        function_id: FunctionId,
        data: Vec<u8>,
        overrides: Option<TransactionRequest>,
        private_key: Option<&PrivateKey>,
    ) -> Result<Resolution, AideError> {
        let transaction = self.transaction(data, overrides);
        self.module
            .transact(transaction, Some(function_id), private_key)
            .await
    }

    /// Query the contract with an encoded read call
    pub async fn call(
        &self,
        data: Vec<u8>,
        private_key: Option<&PrivateKey>,
    ) -> Result<Vec<u8>, AideError> {
        let transaction = TransactionRequest::new()
            .with_to(self.contract.address())
            .with_data(data);
        self.module.call(transaction, private_key).await
    }

    /// Query a record, a "not found" answer of the node is `Ok(None)`
    pub async fn query<T: DeserializeOwned>(
        &self,
        data: Vec<u8>,
        private_key: Option<&PrivateKey>,
    ) -> Result<Option<T>, AideError> {
        let output = self.call(data, private_key).await?;
        node_message::query_result(&format!("{} query", self.contract), &output)
    }

    fn transaction(
        &self,
        data: Vec<u8>,
        overrides: Option<TransactionRequest>,
    ) -> TransactionRequest {
        let mut transaction = self.contract.default_transaction().with_data(data);
        if let Some(overrides) = overrides {
            transaction.merge(overrides);
        }
        transaction
    }
}
