use std::{fs, path::Path, str::FromStr};

use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

pub fn default_logs_datetime_format() -> String {
    String::from("%Y-%m-%d %H:%M:%S%.3f")
}

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Failed to prepare log output: {0}")]
    Io(#[from] std::io::Error),

    #[error("Logger already initialized: {0}")]
    SetLogger(#[from] log::SetLoggerError),

    /// Module filters are written as `module=level`
    #[error("Invalid module log filter '{0}', expected <module>=<level>")]
    InvalidModuleConfig(String),
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Level override for a single module path
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig {
    pub module: String,
    pub level: LogLevel,
}

impl FromStr for ModuleConfig {
    type Err = LoggerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (module, level) = value
            .split_once('=')
            .ok_or_else(|| LoggerError::InvalidModuleConfig(value.to_string()))?;

        let module = module.trim();
        if module.is_empty() {
            return Err(LoggerError::InvalidModuleConfig(value.to_string()));
        }

        let level = LogLevel::from_str(level.trim())
            .map_err(|_| LoggerError::InvalidModuleConfig(value.to_string()))?;

        Ok(Self {
            module: module.to_string(),
            level,
        })
    }
}

pub struct LoggerConfig<'a> {
    pub level: LogLevel,
    /// Level used for the log file, may be more verbose than the console
    pub file_level: LogLevel,
    pub dir_path: &'a str,
    pub filename_log: &'a str,
    pub disable_file_logging: bool,
    /// Use a single file instead of one `YYYY-MM-DD.<filename>` file per day
    pub disable_file_log_date_based: bool,
    pub disable_colors: bool,
    pub module_logs: Vec<ModuleConfig>,
    pub logs_datetime_format: String,
}

impl<'a> LoggerConfig<'a> {
    pub fn console(level: LogLevel) -> Self {
        Self {
            level,
            file_level: level,
            dir_path: "logs/",
            filename_log: "ppos-aide.log",
            disable_file_logging: true,
            disable_file_log_date_based: false,
            disable_colors: false,
            module_logs: Vec::new(),
            logs_datetime_format: default_logs_datetime_format(),
        }
    }
}

// Noisy dependencies are capped unless a module filter says otherwise
const QUIET_MODULES: [&str; 3] = ["hyper", "reqwest", "rustls"];

// Every dispatch in the tree filters on its own, so overrides go on each of them
fn with_module_levels(
    mut dispatch: fern::Dispatch,
    module_logs: &[ModuleConfig],
) -> fern::Dispatch {
    for module in QUIET_MODULES {
        if !module_logs.iter().any(|m| m.module == module) {
            dispatch = dispatch.level_for(module, LevelFilter::Warn);
        }
    }
    for module in module_logs {
        dispatch = dispatch.level_for(module.module.clone(), module.level.into());
    }
    dispatch
}

/// Install the global logger: colored console output and an optional log file
pub fn setup_logger(config: LoggerConfig<'_>) -> Result<(), LoggerError> {
    let console_level: LevelFilter = config.level.into();
    let file_level: LevelFilter = if config.disable_file_logging {
        LevelFilter::Off
    } else {
        config.file_level.into()
    };

    let mut base = with_module_levels(
        fern::Dispatch::new().level(console_level.max(file_level)),
        &config.module_logs,
    );

    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Cyan)
        .trace(Color::Magenta);

    let disable_colors = config.disable_colors;
    let console_format = config.logs_datetime_format.clone();
    let console = with_module_levels(
        fern::Dispatch::new().level(console_level),
        &config.module_logs,
    )
        .format(move |out, message, record| {
            let now = chrono::Local::now().format(&console_format);
            if disable_colors {
                out.finish(format_args!(
                    "[{}] [{}] [{}] {}",
                    now,
                    record.level(),
                    record.target(),
                    message
                ))
            } else {
                out.finish(format_args!(
                    "[{}] [{}] [{}] {}",
                    now,
                    colors.color(record.level()),
                    record.target(),
                    message
                ))
            }
        })
        .chain(std::io::stdout());
    base = base.chain(console);

    if !config.disable_file_logging {
        let dir = Path::new(config.dir_path);
        fs::create_dir_all(dir)?;

        let file_format = config.logs_datetime_format.clone();
        let file = with_module_levels(
            fern::Dispatch::new().level(file_level),
            &config.module_logs,
        )
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{}] [{}] [{}] {}",
                chrono::Local::now().format(&file_format),
                record.level(),
                record.target(),
                message
            ))
        });

        let file = if config.disable_file_log_date_based {
            file.chain(fern::log_file(dir.join(config.filename_log))?)
        } else {
            // DateBased appends the formatted date to the prefix as is
            let prefix = format!("{}/", config.dir_path.trim_end_matches('/'));
            file.chain(fern::DateBased::new(
                prefix,
                format!("%Y-%m-%d.{}", config.filename_log),
            ))
        };
        base = base.chain(file);
    }

    base.apply()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_module_config() {
        let config = ModuleConfig::from_str("ppos_aide::resolver=trace").unwrap();
        assert_eq!(config.module, "ppos_aide::resolver");
        assert_eq!(config.level, LogLevel::Trace);

        assert!(ModuleConfig::from_str("ppos_aide").is_err());
        assert!(ModuleConfig::from_str("=debug").is_err());
        assert!(ModuleConfig::from_str("ppos_aide=loud").is_err());
    }

    // Only test in this crate installing the global logger
    #[test]
    fn test_module_level_more_verbose_than_console() {
        let mut config = LoggerConfig::console(LogLevel::Info);
        config.module_logs.push(ModuleConfig {
            module: "ppos_verbose".to_string(),
            level: LogLevel::Trace,
        });
        config.module_logs.push(ModuleConfig {
            module: "ppos_quiet".to_string(),
            level: LogLevel::Error,
        });
        setup_logger(config).unwrap();

        assert!(log::log_enabled!(target: "ppos_verbose", log::Level::Trace));
        assert!(log::log_enabled!(target: "ppos_verbose::sub", log::Level::Debug));
        assert!(log::log_enabled!(target: "other", log::Level::Info));
        assert!(!log::log_enabled!(target: "other", log::Level::Debug));
        assert!(!log::log_enabled!(target: "ppos_quiet", log::Level::Warn));
        assert!(!log::log_enabled!(target: "reqwest", log::Level::Info));
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(LogLevel::from_str("WARN").unwrap(), LogLevel::Warn);
        assert_eq!(LevelFilter::from(LogLevel::Off), LevelFilter::Off);
        assert_eq!(LevelFilter::from(LogLevel::default()), LevelFilter::Info);
        assert_eq!(LogLevel::Debug.to_string(), "debug");
    }
}
