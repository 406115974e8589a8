use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use ppos_common::{
    economic::PeriodIndexPolicy,
    logger::{default_logs_datetime_format, LogLevel, LoggerConfig, ModuleConfig},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{
    aide::AideOptions,
    transport::{normalize_node_url, JsonRpcClientConfig},
};

/// Default values for configuration
pub mod defaults {
    use super::*;

    pub const LOG_LEVEL: LogLevel = LogLevel::Info;
    pub const FILENAME_LOG: &str = "ppos-aide.log";
    pub const LOGS_PATH: &str = "logs/";
    pub const NODE_URL: &str = "http://127.0.0.1:6789";
    pub const AUTO_FIX_CONFIG: bool = true;

    // JSON-RPC client defaults
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
    pub const CONNECTION_TIMEOUT_SECS: u64 = 10;

    // Resolver and waiter defaults
    pub const RECEIPT_TIMEOUT_SECS: u64 = 120;
    pub const RECEIPT_POLL_INTERVAL_MS: u64 = 500;
    pub const BLOCK_POLL_INTERVAL_MS: u64 = 1000;

    // Validation limits
    pub const MIN_TIMEOUT_SECS: u64 = 1;
    pub const MAX_TIMEOUT_SECS: u64 = 300;
    pub const MAX_RECEIPT_TIMEOUT_SECS: u64 = 3600;
    pub const MIN_POLL_INTERVAL_MS: u64 = 50;
    pub const MAX_POLL_INTERVAL_MS: u64 = 60_000;
}

/// File and command line configuration of the `ppos-aide` tool
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AideConfig {
    /// Log level configuration
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,

    /// File logging settings
    #[serde(default)]
    pub disable_file_logging: bool,

    #[serde(default)]
    pub disable_file_log_date_based: bool,

    #[serde(default)]
    pub disable_log_color: bool,

    #[serde(default = "default_filename_log")]
    pub filename_log: String,

    #[serde(default = "default_logs_path")]
    pub logs_path: String,

    #[serde(default)]
    pub logs_modules: Vec<ModuleConfig>,

    #[serde(default = "default_logs_datetime_format")]
    pub datetime_format: String,

    /// Node connection settings
    #[serde(default = "default_node_url")]
    pub node_url: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_connection_timeout_secs")]
    pub connection_timeout_secs: u64,

    /// Transaction and block waiting
    #[serde(default = "default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,

    #[serde(default = "default_receipt_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,

    #[serde(default = "default_block_poll_interval_ms")]
    pub block_poll_interval_ms: u64,

    /// Rounding rule from block height to period index
    #[serde(default)]
    pub period_index_policy: PeriodIndexPolicy,

    #[serde(default)]
    pub sequence_nonces: bool,

    /// Auto-fix configuration issues
    #[serde(default = "default_auto_fix_config")]
    pub auto_fix_config: bool,

    /// Validation settings
    #[serde(default)]
    pub strict_validation: bool,
}

// Default functions for serde
fn default_log_level() -> LogLevel {
    defaults::LOG_LEVEL
}
fn default_filename_log() -> String {
    defaults::FILENAME_LOG.to_string()
}
fn default_logs_path() -> String {
    defaults::LOGS_PATH.to_string()
}
fn default_node_url() -> String {
    defaults::NODE_URL.to_string()
}
fn default_request_timeout_secs() -> u64 {
    defaults::REQUEST_TIMEOUT_SECS
}
fn default_connection_timeout_secs() -> u64 {
    defaults::CONNECTION_TIMEOUT_SECS
}
fn default_receipt_timeout_secs() -> u64 {
    defaults::RECEIPT_TIMEOUT_SECS
}
fn default_receipt_poll_interval_ms() -> u64 {
    defaults::RECEIPT_POLL_INTERVAL_MS
}
fn default_block_poll_interval_ms() -> u64 {
    defaults::BLOCK_POLL_INTERVAL_MS
}
fn default_auto_fix_config() -> bool {
    defaults::AUTO_FIX_CONFIG
}

impl Default for AideConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            disable_file_logging: false,
            disable_file_log_date_based: false,
            disable_log_color: false,
            filename_log: default_filename_log(),
            logs_path: default_logs_path(),
            logs_modules: Vec::new(),
            datetime_format: default_logs_datetime_format(),
            node_url: default_node_url(),
            request_timeout_secs: default_request_timeout_secs(),
            connection_timeout_secs: default_connection_timeout_secs(),
            receipt_timeout_secs: default_receipt_timeout_secs(),
            receipt_poll_interval_ms: default_receipt_poll_interval_ms(),
            block_poll_interval_ms: default_block_poll_interval_ms(),
            period_index_policy: PeriodIndexPolicy::default(),
            sequence_nonces: false,
            auto_fix_config: default_auto_fix_config(),
            strict_validation: false,
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    InvalidNodeUrl(String),
    InvalidTimeout {
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },
    InvalidPollInterval {
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigValidationError::InvalidNodeUrl(url) => write!(
                f,
                "Invalid node URL: '{}' - must be a valid HTTP/HTTPS URL",
                url
            ),
            ConfigValidationError::InvalidTimeout {
                field,
                value,
                min,
                max,
            } => write!(
                f,
                "Invalid {}: {} seconds - must be between {} and {} seconds",
                field, value, min, max
            ),
            ConfigValidationError::InvalidPollInterval {
                field,
                value,
                min,
                max,
            } => write!(
                f,
                "Invalid {}: {} ms - must be between {} and {} ms",
                field, value, min, max
            ),
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Configuration validation result
pub type ValidationResult<T> = std::result::Result<T, ConfigValidationError>;

/// Configuration validator
///
/// In auto-fix mode (and not strict) an invalid value is replaced by its default
/// and reported, otherwise the first invalid value fails the validation.
pub struct ConfigValidator {
    strict_mode: bool,
    auto_fix: bool,
}

impl ConfigValidator {
    pub fn new(strict_mode: bool, auto_fix: bool) -> Self {
        Self {
            strict_mode,
            auto_fix,
        }
    }

    /// Validate the entire configuration, returns the fixes and warnings applied
    ///
    /// Runs before the logger exists, messages are reported with [`report_validation`]
    /// once it is installed.
    pub fn validate(&self, config: &mut AideConfig) -> Result<Vec<String>> {
        let mut warnings = Vec::new();
        let mut fixed_issues = Vec::new();

        if let Err(e) = validate_node_url(&config.node_url) {
            self.fix_or_fail(e, &mut fixed_issues, || {
                config.node_url = defaults::NODE_URL.to_string();
                format!("Fixed node URL to default: {}", config.node_url)
            })?;
        }

        if let Err(e) = validate_range(
            "request_timeout",
            config.request_timeout_secs,
            defaults::MIN_TIMEOUT_SECS,
            defaults::MAX_TIMEOUT_SECS,
        ) {
            self.fix_or_fail(e, &mut fixed_issues, || {
                config.request_timeout_secs = defaults::REQUEST_TIMEOUT_SECS;
                format!(
                    "Fixed request timeout to {} seconds",
                    config.request_timeout_secs
                )
            })?;
        }

        if let Err(e) = validate_range(
            "connection_timeout",
            config.connection_timeout_secs,
            defaults::MIN_TIMEOUT_SECS,
            defaults::MAX_TIMEOUT_SECS,
        ) {
            self.fix_or_fail(e, &mut fixed_issues, || {
                config.connection_timeout_secs = defaults::CONNECTION_TIMEOUT_SECS;
                format!(
                    "Fixed connection timeout to {} seconds",
                    config.connection_timeout_secs
                )
            })?;
        }

        if let Err(e) = validate_range(
            "receipt_timeout",
            config.receipt_timeout_secs,
            defaults::MIN_TIMEOUT_SECS,
            defaults::MAX_RECEIPT_TIMEOUT_SECS,
        ) {
            self.fix_or_fail(e, &mut fixed_issues, || {
                config.receipt_timeout_secs = defaults::RECEIPT_TIMEOUT_SECS;
                format!(
                    "Fixed receipt timeout to {} seconds",
                    config.receipt_timeout_secs
                )
            })?;
        }

        if let Err(e) = validate_poll_interval("receipt_poll_interval", config.receipt_poll_interval_ms)
        {
            self.fix_or_fail(e, &mut fixed_issues, || {
                config.receipt_poll_interval_ms = defaults::RECEIPT_POLL_INTERVAL_MS;
                format!(
                    "Fixed receipt poll interval to {} ms",
                    config.receipt_poll_interval_ms
                )
            })?;
        }

        if let Err(e) = validate_poll_interval("block_poll_interval", config.block_poll_interval_ms) {
            self.fix_or_fail(e, &mut fixed_issues, || {
                config.block_poll_interval_ms = defaults::BLOCK_POLL_INTERVAL_MS;
                format!(
                    "Fixed block poll interval to {} ms",
                    config.block_poll_interval_ms
                )
            })?;
        }

        if config.receipt_poll_interval_ms > config.receipt_timeout_secs.saturating_mul(1000) {
            warnings.push(format!(
                "Receipt poll interval ({} ms) is longer than the receipt timeout ({} s), receipts are polled once",
                config.receipt_poll_interval_ms, config.receipt_timeout_secs
            ));
        }

        if !config.disable_file_logging {
            self.validate_logs_path(config, &mut warnings, &mut fixed_issues)?;
        }

        let mut all_messages = fixed_issues;
        all_messages.extend(warnings);
        Ok(all_messages)
    }

    fn fix_or_fail(
        &self,
        error: ConfigValidationError,
        fixed_issues: &mut Vec<String>,
        fix: impl FnOnce() -> String,
    ) -> Result<()> {
        if !self.auto_fix || self.strict_mode {
            return Err(anyhow!("Configuration validation failed: {}", error));
        }

        fixed_issues.push(format!("{} ({})", fix(), error));
        Ok(())
    }

    fn validate_logs_path(
        &self,
        config: &AideConfig,
        warnings: &mut Vec<String>,
        fixed_issues: &mut Vec<String>,
    ) -> Result<()> {
        let path_buf = PathBuf::from(&config.logs_path);

        if !path_buf.exists() {
            std::fs::create_dir_all(&path_buf).with_context(|| {
                format!("Failed to create logs directory '{}'", config.logs_path)
            })?;
            fixed_issues.push(format!("Created logs directory: {}", config.logs_path));
        } else if !path_buf.is_dir() {
            return Err(anyhow!(
                "Path '{}' exists but is not a directory",
                config.logs_path
            ));
        }

        // Check write permissions
        let test_file = path_buf.join(".write_test");
        std::fs::write(&test_file, "test").with_context(|| {
            format!(
                "Insufficient write permissions for logs directory '{}'",
                config.logs_path
            )
        })?;
        let _ = std::fs::remove_file(test_file);

        if config.disable_file_log_date_based {
            let log_path = path_buf.join(&config.filename_log);
            if log_path.exists() && log_path.metadata()?.len() > 0 {
                warnings.push(format!(
                    "Log file '{}' already exists and is not empty - logs will be appended",
                    log_path.display()
                ));
            }
        }

        Ok(())
    }
}

/// Log the messages returned by [`ConfigValidator::validate`]
pub fn report_validation(messages: &[String]) {
    if messages.is_empty() || !log::log_enabled!(log::Level::Warn) {
        return;
    }
    warn!("Configuration loaded with {} adjustment(s)/warning(s):", messages.len());
    for message in messages {
        warn!("  {}", message);
    }
}

fn validate_node_url(url: &str) -> ValidationResult<()> {
    normalize_node_url(url)
        .map(|_| ())
        .map_err(|_| ConfigValidationError::InvalidNodeUrl(url.to_string()))
}

fn validate_range(field: &'static str, value: u64, min: u64, max: u64) -> ValidationResult<()> {
    if value < min || value > max {
        return Err(ConfigValidationError::InvalidTimeout {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

fn validate_poll_interval(field: &'static str, value: u64) -> ValidationResult<()> {
    if !(defaults::MIN_POLL_INTERVAL_MS..=defaults::MAX_POLL_INTERVAL_MS).contains(&value) {
        return Err(ConfigValidationError::InvalidPollInterval {
            field,
            value,
            min: defaults::MIN_POLL_INTERVAL_MS,
            max: defaults::MAX_POLL_INTERVAL_MS,
        });
    }
    Ok(())
}

impl AideConfig {
    pub fn to_json_rpc_config(&self) -> JsonRpcClientConfig {
        JsonRpcClientConfig {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            connection_timeout: Duration::from_secs(self.connection_timeout_secs),
            receipt_poll_interval: Duration::from_millis(self.receipt_poll_interval_ms),
        }
    }

    pub fn to_aide_options(&self) -> AideOptions {
        AideOptions {
            receipt_timeout: Duration::from_secs(self.receipt_timeout_secs),
            block_poll_interval: Duration::from_millis(self.block_poll_interval_ms),
            period_policy: self.period_index_policy,
            sequence_nonces: self.sequence_nonces,
        }
    }

    pub fn to_logger_config(&self) -> LoggerConfig<'_> {
        LoggerConfig {
            level: self.log_level,
            file_level: self.log_level,
            dir_path: &self.logs_path,
            filename_log: &self.filename_log,
            disable_file_logging: self.disable_file_logging,
            disable_file_log_date_based: self.disable_file_log_date_based,
            disable_colors: self.disable_log_color,
            module_logs: self.logs_modules.clone(),
            logs_datetime_format: self.datetime_format.clone(),
        }
    }

    /// Load and validate configuration from file, along with the validation messages
    pub fn from_file<P: AsRef<Path>>(
        path: P,
        strict_mode: bool,
        auto_fix: bool,
    ) -> Result<(Self, Vec<String>)> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;

        let mut config: AideConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;

        // Validate the loaded configuration
        let validator = ConfigValidator::new(strict_mode, auto_fix);
        let messages = validator.validate(&mut config)?;
        Ok((config, messages))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file '{}'", path.display()))?;

        if log::log_enabled!(log::Level::Info) {
            info!("Configuration saved to: {}", path.display());
        }
        Ok(())
    }

    /// Generate a configuration template with the default values
    pub fn generate_template<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let mut template = json!({
            "_info": {
                "description": "ppos-aide configuration",
                "version": "1.0",
                "sections": {
                    "logging": "Controls log output and file generation",
                    "node": "JSON-RPC endpoint and request timeouts",
                    "waiting": "Receipt and block polling",
                    "economics": "Period index rounding rule and nonce sequencing",
                    "validation": "Configuration validation behavior"
                }
            }
        });

        if let (Value::Object(template), Value::Object(fields)) =
            (&mut template, serde_json::to_value(AideConfig::default())?)
        {
            template.extend(fields);
        }

        let content = serde_json::to_string_pretty(&template)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write template to '{}'", path.display()))?;

        if log::log_enabled!(log::Level::Info) {
            info!("Configuration template generated at: {}", path.display());
        }
        Ok(())
    }
}
