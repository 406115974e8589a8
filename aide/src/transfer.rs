use std::sync::Arc;

use ppos_common::config::TRANSFER_GAS;

use crate::{
    error::AideError,
    module::{Module, ModuleSettings},
    resolver::{ModuleKind, Resolution, Resolver},
    signer::PrivateKey,
    transaction::{Address, TransactionRequest},
};

/// Plain value transfers
#[derive(Clone)]
pub struct Transfer {
    module: Module,
}

impl Transfer {
    pub fn new(resolver: Arc<Resolver>, settings: ModuleSettings) -> Result<Self, AideError> {
        Ok(Self {
            module: Module::new(ModuleKind::Ordinary, resolver, settings)?,
        })
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn module_mut(&mut self) -> &mut Module {
        &mut self.module
    }

    /// Send `amount` von to `to`, `overrides` replace the defaulted fields
    pub async fn transfer(
        &self,
        to: Address,
        amount: u128,
        overrides: Option<TransactionRequest>,
        private_key: Option<&PrivateKey>,
    ) -> Result<Resolution, AideError> {
        let mut transaction = TransactionRequest::new()
            .with_to(to)
            .with_value(amount)
            .with_gas(TRANSFER_GAS);
        if let Some(overrides) = overrides {
            transaction.merge(overrides);
        }

        self.module.transact(transaction, None, private_key).await
    }
}
