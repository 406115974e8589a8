use std::sync::Arc;

use crate::{
    error::AideError,
    event::FunctionId,
    resolver::{Invocation, ModuleKind, Resolution, Resolver, ResultMode},
    signer::PrivateKey,
    transaction::{Address, TransactionRequest},
};

/// Explicit settings handed to each module, there is no process wide default
#[derive(Clone, Debug)]
pub struct ModuleSettings {
    pub default_account: Option<Arc<PrivateKey>>,
    pub result_mode: ResultMode,
}

impl ModuleSettings {
    pub fn for_kind(kind: ModuleKind) -> Self {
        Self {
            default_account: None,
            result_mode: kind.default_result_mode(),
        }
    }

    pub fn with_default_account(mut self, account: Option<Arc<PrivateKey>>) -> Self {
        self.default_account = account;
        self
    }

    pub fn with_result_mode(mut self, mode: ResultMode) -> Self {
        self.result_mode = mode;
        self
    }
}

/// Common part of every module: its kind, its settings and the shared resolver
#[derive(Clone)]
pub struct Module {
    kind: ModuleKind,
    settings: ModuleSettings,
    resolver: Arc<Resolver>,
}

impl Module {
    pub fn new(
        kind: ModuleKind,
        resolver: Arc<Resolver>,
        settings: ModuleSettings,
    ) -> Result<Self, AideError> {
        kind.check_result_mode(settings.result_mode)?;
        Ok(Self {
            kind,
            settings,
            resolver,
        })
    }

    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    pub fn result_mode(&self) -> ResultMode {
        self.settings.result_mode
    }

    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    /// Change the default result mode, rejected when the module kind cannot produce it
    pub fn set_result_mode(&mut self, mode: ResultMode) -> Result<(), AideError> {
        self.kind.check_result_mode(mode)?;
        self.settings.result_mode = mode;
        Ok(())
    }

    pub fn set_default_account(&mut self, account: Option<Arc<PrivateKey>>) {
        self.settings.default_account = account;
    }

    pub fn default_account(&self) -> Option<&PrivateKey> {
        self.settings.default_account.as_deref()
    }

    /// Address of the per-call key, or of the default account
    pub fn signing_address(
        &self,
        private_key: Option<&PrivateKey>,
    ) -> Result<Option<Address>, AideError> {
        private_key
            .or(self.default_account())
            .map(|key| self.resolver.signer().address(key))
            .transpose()
            .map_err(Into::into)
    }

    pub async fn transact(
        &self,
        transaction: TransactionRequest,
        function_id: Option<FunctionId>,
        private_key: Option<&PrivateKey>,
    ) -> Result<Resolution, AideError> {
        self.transact_with_mode(
            transaction,
            self.settings.result_mode,
            function_id,
            private_key,
        )
        .await
    }

    pub async fn transact_with_mode(
        &self,
        transaction: TransactionRequest,
        mode: ResultMode,
        function_id: Option<FunctionId>,
        private_key: Option<&PrivateKey>,
    ) -> Result<Resolution, AideError> {
        let invocation = Invocation {
            kind: self.kind,
            mode,
            signing_key: private_key.or(self.default_account()),
            function_id,
        };
        self.resolver.resolve(transaction, invocation).await
    }

    pub async fn call(
        &self,
        transaction: TransactionRequest,
        private_key: Option<&PrivateKey>,
    ) -> Result<Vec<u8>, AideError> {
        self.resolver
            .call(transaction, private_key.or(self.default_account()))
            .await
    }
}
