//! Error types for storstack
//!
//! This module defines the common error types used throughout the system.
//! None of these are recovered locally: every failure aborts the action that
//! triggered it.

use thiserror::Error;

/// Common result type for storstack operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for storstack
#[derive(Debug, Error)]
pub enum Error {
    // Merge errors
    #[error("inconsistent types at '{path}': cannot merge {lhs} with {rhs}")]
    InconsistentType {
        path: String,
        lhs: &'static str,
        rhs: &'static str,
    },

    // Derivation errors
    #[error("invalid RAID level: {0}")]
    InvalidRaidLevel(i64),

    #[error("RAID {level} needs at least {required} disks, got {available}")]
    InsufficientDisks {
        level: u8,
        required: usize,
        available: usize,
    },

    #[error("empty device set: {0}")]
    EmptyDeviceSet(String),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    // Lookup errors
    #[error("unknown RAID volume: {0}")]
    UnknownRaidVolume(String),

    #[error("unknown FS volume: {0}")]
    UnknownFsVolume(String),

    #[error("unknown crypt volume: {0}")]
    UnknownCryptVolume(String),

    #[error("unknown export host group: {0}")]
    UnknownHostGroup(String),

    #[error("unknown export option set: {0}")]
    UnknownExportOptions(String),

    // Configuration errors
    #[error("invalid field '{path}': {reason}")]
    InvalidField { path: String, reason: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("YAML error: {0}")]
    Yaml(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    // Host interaction errors
    #[error("probe failed for {device}: {reason}")]
    Probe { device: String, reason: String },

    #[error("command '{command}' failed: {reason}")]
    Command { command: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an empty device set error
    pub fn empty_devices(what: impl Into<String>) -> Self {
        Self::EmptyDeviceSet(what.into())
    }

    /// Create an invalid field error
    pub fn invalid_field(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a probe error
    pub fn probe(device: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Probe {
            device: device.into(),
            reason: reason.into(),
        }
    }

    /// Create a command error
    pub fn command(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Command {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// Check if this is a failed name lookup
    #[must_use]
    pub const fn is_lookup_failure(&self) -> bool {
        matches!(
            self,
            Self::UnknownRaidVolume(_)
                | Self::UnknownFsVolume(_)
                | Self::UnknownCryptVolume(_)
                | Self::UnknownHostGroup(_)
                | Self::UnknownExportOptions(_)
        )
    }

    /// Check if this error was caused by the topology document itself
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::InconsistentType { .. }
                | Self::InvalidRaidLevel(_)
                | Self::InvalidField { .. }
                | Self::Configuration(_)
                | Self::Yaml(_)
        ) || self.is_lookup_failure()
    }
}
