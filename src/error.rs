use std::io;
use std::str::Utf8Error;
use thiserror::Error;
use btleplug;
use serde_json;
use tokio::task::JoinError;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to determine path to config file")]
    NoConfigPath,

    #[error("Failed to acquire file lock on config file: {source}")]
    CanNotLock { source: io::Error },

    #[error("Failed to encode/decode config as utf-8: {source}")]
    Utf8Error { #[from] source: Utf8Error },

    #[error("Failed to read/write config file: {source}")]
    IOError { #[from] source: io::Error },

    #[error("Failed to parse/build config file: {source}")]
    JsonError { #[from] source: serde_json::Error },
}

impl ConfigError {
    pub fn is_file_not_found_error(&self) -> bool {
        match self {
            ConfigError::IOError { source } => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Error communicating with device (btleplug): {source}")]
    Btle { #[from] source: btleplug::Error },

    #[error("Invalid UUID: {source}")]
    InvalidUuid { #[from] source: uuid::Error },

    #[error("No bluetooth adapter available")]
    NoAdapter,

    #[error("The bluetooth platform has not been started")]
    NotStarted,

    #[error("Unknown peripheral {id}")]
    UnknownPeripheral { id: String },

    #[error("Peripheral {id} is not connected")]
    NotConnected { id: String },

    #[error("A required bluetooth characteristic is not available")]
    MissingCharacteristic,
}

impl PlatformError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, PlatformError::Btle { source: btleplug::Error::PermissionDenied })
    }
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Failed to display notification: {message}")]
    Display { message: String },

    #[error("Notification task failed: {source}")]
    Join { #[from] source: JoinError },
}

#[derive(Error, Debug)]
pub enum AppRunError {
    #[error("Failed to start application (config): {source}")]
    ConfigError { #[from] source: ConfigError },

    #[error("Failed to read console input: {source}")]
    Console { #[from] source: io::Error },

    #[error("Failed to open LOG_FILE: {source}")]
    LogFile { source: io::Error },

    #[error("Failed to initialize logging: {source}")]
    Logging { #[from] source: log::SetLoggerError },

    #[error("Session task failed: {source}")]
    Join { #[from] source: JoinError },
}
