use std::path::PathBuf;
use clap::{Parser, ValueEnum};

use crate::config::types::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NotifierKind {
    /// Desktop message boxes
    Desktop,
    /// Log lines only
    Log,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Watches a beverage notifier and tells you when your drink is getting cold.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Args {
    /// Config file to use instead of the default location
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Notify when a reading drops below this temperature
    #[arg(long)]
    pub threshold: Option<f64>,

    /// How alerts are shown
    #[arg(long, value_enum, default_value_t = NotifierKind::Desktop)]
    pub notifier: NotifierKind,

    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

impl Args {
    pub fn apply(&self, config: &mut Config) {
        if let Some(threshold) = self.threshold {
            config.cold_threshold = threshold;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::parse_from(["beverage-notifier"]);

        assert_eq!(args.notifier, NotifierKind::Desktop);
        assert_eq!(args.log_level, LogLevel::Info);
        assert_eq!(args.config, None);
    }

    #[test]
    fn threshold_overrides_config() {
        let args = Args::parse_from(["beverage-notifier", "--threshold", "12.5", "--notifier", "log"]);
        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.cold_threshold, 12.5);
        assert_eq!(args.notifier, NotifierKind::Log);
    }
}
