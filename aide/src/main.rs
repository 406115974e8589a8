//! ppos-aide - PPOS economic period and reward tool
//!
//! ```bash
//! # Derived economic constants of a node
//! ppos-aide --node-url 127.0.0.1:6789 economic
//!
//! # Epoch containing the current block
//! ppos-aide period --period-type epoch
//!
//! # Wait for the end of issuance cycle 2
//! ppos-aide wait-block --period-end 2 --period-type issuance
//! ```

use std::{path::Path, sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use ppos_aide::{
    config::{defaults, report_validation, AideConfig, ConfigValidator},
    transport::{ChainTransport, JsonRpcClient},
    waiter::wait_for_block,
};
use ppos_common::{
    economic::{
        calc_delegate_reward, calc_node_reward, EconomicError, EconomicPeriods, PeriodIndexPolicy,
        PeriodType,
    },
    logger::{setup_logger, LogLevel, ModuleConfig},
};
use serde_json::json;

fn parse_period_type(value: &str) -> Result<PeriodType, EconomicError> {
    PeriodType::parse(value)
}

fn parse_policy(value: &str) -> Result<PeriodIndexPolicy, String> {
    value
        .parse()
        .map_err(|_| format!("unknown period index policy '{}'", value))
}

/// ppos-aide CLI configuration, mirrors the configuration file
#[derive(Parser, Clone, Debug)]
#[command(name = "ppos-aide")]
#[command(about = "PPOS economic periods, rewards and block waiting")]
#[command(version)]
#[command(styles = ppos_common::get_cli_styles())]
pub struct CliConfig {
    /// Set log level
    #[clap(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Disable the log file
    #[clap(long)]
    disable_file_logging: bool,

    /// Use a single log file instead of one per day
    #[clap(long)]
    disable_file_log_date_based: bool,

    /// Disable the usage of colors in log
    #[clap(long)]
    disable_log_color: bool,

    /// Log filename
    #[clap(long, default_value_t = String::from(defaults::FILENAME_LOG))]
    filename_log: String,

    /// Logs directory
    #[clap(long, default_value_t = String::from(defaults::LOGS_PATH))]
    logs_path: String,

    /// Per module log level, `module=level`
    #[clap(long = "log-module")]
    logs_modules: Vec<ModuleConfig>,

    /// Node JSON-RPC endpoint
    #[clap(long, default_value_t = String::from(defaults::NODE_URL))]
    node_url: String,

    /// Advanced: Request timeout in seconds
    #[clap(long, default_value_t = defaults::REQUEST_TIMEOUT_SECS)]
    request_timeout_secs: u64,

    /// Advanced: Connection timeout in seconds
    #[clap(long, default_value_t = defaults::CONNECTION_TIMEOUT_SECS)]
    connection_timeout_secs: u64,

    /// Advanced: Receipt timeout in seconds
    #[clap(long, default_value_t = defaults::RECEIPT_TIMEOUT_SECS)]
    receipt_timeout_secs: u64,

    /// Advanced: Receipt poll interval in milliseconds
    #[clap(long, default_value_t = defaults::RECEIPT_POLL_INTERVAL_MS)]
    receipt_poll_interval_ms: u64,

    /// Advanced: Block height poll interval in milliseconds
    #[clap(long, default_value_t = defaults::BLOCK_POLL_INTERVAL_MS)]
    block_poll_interval_ms: u64,

    /// Rounding rule from block height to period index (ceiling, floor_plus_one)
    #[clap(long, default_value = "ceiling", value_parser = parse_policy)]
    period_index_policy: PeriodIndexPolicy,

    /// Enable strict configuration validation
    #[clap(long)]
    strict_validation: bool,

    /// Disable auto-fix of configuration issues
    #[clap(long)]
    no_auto_fix: bool,

    /// JSON File to load the configuration from
    #[clap(long)]
    config_file: Option<String>,

    /// Generate the template at the `config_file` path
    #[clap(long)]
    generate_config_template: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Debug)]
enum Command {
    /// Print the economic constants derived from the node genesis
    Economic,
    /// Period containing a block
    Period {
        /// Block height, the current block when omitted
        block: Option<u64>,
        #[arg(short, long, default_value = "epoch", value_parser = parse_period_type)]
        period_type: PeriodType,
    },
    /// First and last block of a period
    Bounds {
        /// 1-based period index
        index: u64,
        #[arg(short, long, default_value = "epoch", value_parser = parse_period_type)]
        period_type: PeriodType,
    },
    /// Wait until the chain reaches a block height
    WaitBlock {
        /// Target block height
        #[arg(required_unless_present = "period_end")]
        target: Option<u64>,
        /// Wait for the last block of this period instead
        #[arg(long, conflicts_with = "target")]
        period_end: Option<u64>,
        #[arg(short, long, default_value = "epoch", value_parser = parse_period_type)]
        period_type: PeriodType,
        /// Timeout in seconds, 3 seconds per outstanding block by default
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Epoch reward of a validator node
    NodeReward {
        /// Epoch staking reward, in von
        epoch_staking_reward: u128,
        /// Number of validators of the epoch
        verifier_count: u64,
        /// Reward per produced block, in von
        epoch_block_reward: u128,
        /// Blocks produced by the node during the epoch
        block_count: u64,
    },
    /// Delegation pool of a node and the share of one delegator
    DelegateReward {
        /// Total epoch reward of the node, in von
        total_node_reward: u128,
        /// Delegation reward ratio, in basis points
        reward_ratio: u64,
        /// Total delegated amount of the node, in von
        delegate_total_amount: u128,
        /// Delegated amount of the delegator, in von
        delegate_amount: u128,
    },
    /// Duplicate sign slashing of a staking amount with the node parameters
    Slashing {
        /// Staked amount of the reported node, in von
        staking_amount: u128,
    },
}

impl CliConfig {
    /// Convert CLI configuration to AideConfig
    pub fn to_aide_config(&self) -> AideConfig {
        AideConfig {
            log_level: self.log_level,
            disable_file_logging: self.disable_file_logging,
            disable_file_log_date_based: self.disable_file_log_date_based,
            disable_log_color: self.disable_log_color,
            filename_log: self.filename_log.clone(),
            logs_path: self.logs_path.clone(),
            logs_modules: self.logs_modules.clone(),
            node_url: self.node_url.clone(),
            request_timeout_secs: self.request_timeout_secs,
            connection_timeout_secs: self.connection_timeout_secs,
            receipt_timeout_secs: self.receipt_timeout_secs,
            receipt_poll_interval_ms: self.receipt_poll_interval_ms,
            block_poll_interval_ms: self.block_poll_interval_ms,
            period_index_policy: self.period_index_policy,
            auto_fix_config: !self.no_auto_fix,
            strict_validation: self.strict_validation,
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_config = CliConfig::parse();

    // Handle config template generation
    if let Some(path) = cli_config.config_file.as_ref() {
        if cli_config.generate_config_template {
            if Path::new(path).exists() {
                eprintln!("Config file already exists at {path}");
                eprintln!("Use a different path or remove the existing file");
                return Ok(());
            }

            AideConfig::generate_template(path)?;
            println!("Configuration template generated at {path}");
            println!("Edit the file and run the application with --config-file {path}");
            return Ok(());
        }
    }

    // Load and validate configuration
    let (config, messages) = if let Some(config_path) = &cli_config.config_file {
        AideConfig::from_file(
            config_path,
            cli_config.strict_validation,
            !cli_config.no_auto_fix,
        )?
    } else {
        let mut config = cli_config.to_aide_config();
        let validator = ConfigValidator::new(config.strict_validation, config.auto_fix_config);
        let messages = validator.validate(&mut config)?;
        (config, messages)
    };

    setup_logger(config.to_logger_config())?;
    report_validation(&messages);

    let Some(command) = cli_config.command else {
        return Err(anyhow!("No command given, see --help"));
    };

    if log::log_enabled!(log::Level::Debug) {
        log::debug!("ppos-aide v{} starting", env!("CARGO_PKG_VERSION"));
    }

    match command {
        Command::NodeReward {
            epoch_staking_reward,
            verifier_count,
            epoch_block_reward,
            block_count,
        } => {
            let reward = calc_node_reward(
                epoch_staking_reward,
                verifier_count,
                epoch_block_reward,
                block_count,
            )?;
            print_json(&json!({
                "staking_reward": reward.staking_reward.to_string(),
                "block_reward": reward.block_reward.to_string(),
                "total": reward.total().to_string(),
            }))
        }
        Command::DelegateReward {
            total_node_reward,
            reward_ratio,
            delegate_total_amount,
            delegate_amount,
        } => {
            let reward = calc_delegate_reward(
                total_node_reward,
                reward_ratio,
                delegate_total_amount,
                delegate_amount,
            )?;
            print_json(&json!({
                "pool_reward": reward.pool_reward.to_string(),
                "share": reward.share.to_string(),
            }))
        }
        Command::Economic => {
            let (transport, periods) = connect(&config).await?;
            let version = match transport.client_version().await {
                Ok(version) => Some(version),
                Err(e) => {
                    if log::log_enabled!(log::Level::Warn) {
                        warn!("Node version unavailable: {}", e);
                    }
                    None
                }
            };
            print_json(&json!({
                "node_version": version,
                "period_index_policy": periods.policy().to_string(),
                "block_time": periods.block_time(),
                "round_blocks": periods.round_blocks(),
                "round_time": periods.round_time(),
                "validator_count": periods.validator_count(),
                "consensus_rounds": periods.consensus_rounds(),
                "consensus_blocks": periods.consensus_blocks(),
                "consensus_time": periods.consensus_time(),
                "epoch_consensus": periods.epoch_consensus(),
                "epoch_rounds": periods.epoch_rounds(),
                "epoch_blocks": periods.epoch_blocks(),
                "epoch_time": periods.epoch_time(),
                "issuance_epochs": periods.issuance_epochs(),
                "issuance_consensus": periods.issuance_consensus(),
                "issuance_rounds": periods.issuance_rounds(),
                "issuance_blocks": periods.issuance_blocks(),
                "issuance_time": periods.issuance_time(),
                "staking_limit": periods.staking_limit().to_string(),
                "add_staking_limit": periods.add_staking_limit().to_string(),
                "delegate_limit": periods.delegate_limit().to_string(),
                "unstaking_freeze_epochs": periods.unstaking_freeze_epochs(),
                "not_block_slash_rate": periods.not_block_slash_rate(),
                "param_proposal_epochs": periods.param_proposal_epochs(),
                "text_proposal_epochs": periods.text_proposal_epochs(),
                "version_proposal_epochs": periods.version_proposal_epochs(),
            }))
        }
        Command::Period { block, period_type } => {
            let (transport, periods) = connect(&config).await?;
            let block = match block {
                Some(block) => block,
                None => transport.block_number().await?,
            };
            print_json(&periods.period_containing(block, period_type)?)
        }
        Command::Bounds { index, period_type } => {
            let (_, periods) = connect(&config).await?;
            print_json(&periods.bounds_of_period(index, period_type)?)
        }
        Command::WaitBlock {
            target,
            period_end,
            period_type,
            timeout_secs,
        } => {
            let (transport, periods) = connect(&config).await?;
            let target = match (target, period_end) {
                (Some(target), _) => target,
                (None, Some(index)) => periods.bounds_of_period(index, period_type)?.end_block,
                (None, None) => return Err(anyhow!("A target block or --period-end is required")),
            };
            let height = wait_for_block(
                transport.as_ref(),
                target,
                timeout_secs.map(Duration::from_secs),
                Duration::from_millis(config.block_poll_interval_ms),
            )
            .await?;
            print_json(&json!({ "target": target, "block_number": height }))
        }
        Command::Slashing { staking_amount } => {
            let (_, periods) = connect(&config).await?;
            let split = periods.calc_report_multi_sign_reward(staking_amount)?;
            print_json(&json!({
                "slashing_amount": split.slashing_amount.to_string(),
                "reporter_reward": split.reporter_reward.to_string(),
                "to_incentive_pool": split.to_incentive_pool.to_string(),
            }))
        }
    }
}

/// Open the node connection and load its economic parameters
async fn connect(config: &AideConfig) -> Result<(Arc<dyn ChainTransport>, EconomicPeriods)> {
    let transport: Arc<dyn ChainTransport> = Arc::new(
        JsonRpcClient::with_config(&config.node_url, config.to_json_rpc_config())
            .with_context(|| format!("Cannot use node URL '{}'", config.node_url))?,
    );

    let genesis = transport
        .economic_config()
        .await
        .context("Failed to fetch the economic configuration")?;
    let periods = EconomicPeriods::with_policy(genesis, config.period_index_policy)?;
    if log::log_enabled!(log::Level::Info) {
        info!("Economic configuration loaded from {}", config.node_url);
    }

    Ok((transport, periods))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
