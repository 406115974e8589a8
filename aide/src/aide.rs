use std::{sync::Arc, time::Duration};

use log::info;
use ppos_common::economic::{EconomicPeriods, PeriodDescriptor, PeriodIndexPolicy, PeriodType};

use crate::{
    builtin::{BuiltinContract, BuiltinModule},
    contract::ContractBinding,
    error::AideError,
    event::EventDecoder,
    module::ModuleSettings,
    nonce::NonceSequencer,
    resolver::{ModuleKind, Resolver, ResultMode, DEFAULT_RECEIPT_TIMEOUT},
    signer::{PrivateKey, TransactionSigner},
    transfer::Transfer,
    transport::ChainTransport,
    waiter::{wait_for_block, DEFAULT_BLOCK_POLL_INTERVAL},
};

#[derive(Clone, Debug)]
pub struct AideOptions {
    pub receipt_timeout: Duration,
    pub block_poll_interval: Duration,
    pub period_policy: PeriodIndexPolicy,
    /// Hand out nonces locally, needed when one account sends concurrently
    pub sequence_nonces: bool,
}

impl Default for AideOptions {
    fn default() -> Self {
        Self {
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
            block_poll_interval: DEFAULT_BLOCK_POLL_INTERVAL,
            period_policy: PeriodIndexPolicy::default(),
            sequence_nonces: false,
        }
    }
}

/// Entry point bound to one node
///
/// The economic constants are fetched once when connecting and shared read-only
/// by everything built from this instance. Modules receive a copy of the current
/// default account and result mode when they are created.
pub struct Aide {
    transport: Arc<dyn ChainTransport>,
    resolver: Arc<Resolver>,
    periods: Arc<EconomicPeriods>,
    options: AideOptions,
    default_account: Option<Arc<PrivateKey>>,
    ordinary_mode: ResultMode,
    builtin_mode: ResultMode,
}

impl Aide {
    pub async fn connect(
        transport: Arc<dyn ChainTransport>,
        signer: Arc<dyn TransactionSigner>,
        decoder: Arc<dyn EventDecoder>,
        options: AideOptions,
    ) -> Result<Self, AideError> {
        let genesis = transport.economic_config().await?;
        let periods = EconomicPeriods::with_policy(genesis, options.period_policy)?;

        if log::log_enabled!(log::Level::Info) {
            info!(
                "Economic config loaded: {} blocks per epoch, {} blocks per issuance cycle",
                periods.epoch_blocks(),
                periods.issuance_blocks()
            );
        }

        Ok(Self::with_periods(
            transport, signer, decoder, periods, options,
        ))
    }

    /// Build from an already known economic snapshot, no network access
    pub fn with_periods(
        transport: Arc<dyn ChainTransport>,
        signer: Arc<dyn TransactionSigner>,
        decoder: Arc<dyn EventDecoder>,
        periods: EconomicPeriods,
        options: AideOptions,
    ) -> Self {
        let mut resolver = Resolver::new(transport.clone(), signer, decoder)
            .with_receipt_timeout(options.receipt_timeout);
        if options.sequence_nonces {
            resolver = resolver.with_nonce_sequencer(Arc::new(NonceSequencer::new()));
        }

        Self {
            transport,
            resolver: Arc::new(resolver),
            periods: Arc::new(periods),
            options,
            default_account: None,
            ordinary_mode: ModuleKind::Ordinary.default_result_mode(),
            builtin_mode: ModuleKind::BuiltIn.default_result_mode(),
        }
    }

    pub fn transport(&self) -> &Arc<dyn ChainTransport> {
        &self.transport
    }

    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    pub fn periods(&self) -> &Arc<EconomicPeriods> {
        &self.periods
    }

    pub fn options(&self) -> &AideOptions {
        &self.options
    }

    pub fn default_account(&self) -> Option<&PrivateKey> {
        self.default_account.as_deref()
    }

    /// Account used by modules created afterwards when no key is passed per call
    pub fn set_default_account(&mut self, account: Option<PrivateKey>) {
        self.default_account = account.map(Arc::new);
    }

    pub fn result_mode(&self, kind: ModuleKind) -> ResultMode {
        match kind {
            ModuleKind::Ordinary => self.ordinary_mode,
            ModuleKind::BuiltIn => self.builtin_mode,
        }
    }

    /// Default result mode of modules of `kind` created afterwards
    pub fn set_result_mode(&mut self, kind: ModuleKind, mode: ResultMode) -> Result<(), AideError> {
        kind.check_result_mode(mode)?;
        match kind {
            ModuleKind::Ordinary => self.ordinary_mode = mode,
            ModuleKind::BuiltIn => self.builtin_mode = mode,
        }
        Ok(())
    }

    pub fn module_settings(&self, kind: ModuleKind) -> ModuleSettings {
        ModuleSettings::for_kind(kind)
            .with_default_account(self.default_account.clone())
            .with_result_mode(self.result_mode(kind))
    }

    pub fn transfer(&self) -> Result<Transfer, AideError> {
        Transfer::new(
            self.resolver.clone(),
            self.module_settings(ModuleKind::Ordinary),
        )
    }

    pub fn builtin(&self, contract: BuiltinContract) -> Result<BuiltinModule, AideError> {
        BuiltinModule::new(
            contract,
            self.resolver.clone(),
            self.module_settings(ModuleKind::BuiltIn),
        )
    }

    pub fn contract(&self, abi: &str) -> Result<ContractBinding, AideError> {
        ContractBinding::from_abi(
            abi,
            self.resolver.clone(),
            self.module_settings(ModuleKind::Ordinary),
        )
    }

    /// Period containing `block_number`, or the current block when omitted
    pub async fn period_containing(
        &self,
        block_number: Option<u64>,
        period_type: PeriodType,
    ) -> Result<PeriodDescriptor, AideError> {
        let block_number = match block_number {
            Some(block_number) => block_number,
            None => self.transport.block_number().await?,
        };
        Ok(self.periods.period_containing(block_number, period_type)?)
    }

    pub fn bounds_of_period(
        &self,
        index: u64,
        period_type: PeriodType,
    ) -> Result<PeriodDescriptor, AideError> {
        Ok(self.periods.bounds_of_period(index, period_type)?)
    }

    pub async fn wait_block(&self, target: u64, timeout: Option<Duration>) -> Result<u64, AideError> {
        wait_for_block(
            self.transport.as_ref(),
            target,
            timeout,
            self.options.block_poll_interval,
        )
        .await
    }

    /// Wait for the last block of a period
    pub async fn wait_period_end(
        &self,
        index: u64,
        period_type: PeriodType,
        timeout: Option<Duration>,
    ) -> Result<PeriodDescriptor, AideError> {
        let period = self.bounds_of_period(index, period_type)?;
        self.wait_block(period.end_block, timeout).await?;
        Ok(period)
    }
}
