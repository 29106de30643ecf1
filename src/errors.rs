//! Error types for the Aviator round engine
//!
//! Each subsystem keeps its own error enum; `AviatorError` is the root used
//! at the application boundary (CLI, config loading, driver shutdown).

use crate::common::traits::{LedgerError, StoreError};
use crate::driver::DriverError;
use crate::games::fairness::FairnessError;
use crate::games::round_engine::RoundError;
use std::fmt;

/// Root error type for all Aviator operations
#[derive(Debug)]
pub enum AviatorError {
    /// Configuration related errors
    Configuration(ConfigurationError),

    /// Rejected bets and cash-outs
    Round(RoundError),

    /// Balance ledger errors
    Ledger(LedgerError),

    /// Seed parsing and verification errors
    Fairness(FairnessError),

    /// Result persistence errors
    Store(StoreError),

    /// Round driver task errors
    Driver(DriverError),

    /// Filesystem and terminal I/O
    Io(std::io::Error),
}

/// Configuration and validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    ValidationFailed(String),
    MissingRequired(String),
    InvalidValue { field: String, value: String, reason: String },
    LoadFailed(String),
    SaveFailed(String),
}

impl fmt::Display for AviatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AviatorError::Configuration(e) => write!(f, "Configuration error: {}", e),
            AviatorError::Round(e) => write!(f, "Round error: {}", e),
            AviatorError::Ledger(e) => write!(f, "Ledger error: {}", e),
            AviatorError::Fairness(e) => write!(f, "Fairness error: {}", e),
            AviatorError::Store(e) => write!(f, "Store error: {}", e),
            AviatorError::Driver(e) => write!(f, "Driver error: {}", e),
            AviatorError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::ValidationFailed(msg) => write!(f, "Validation failed: {}", msg),
            ConfigurationError::MissingRequired(field) => write!(f, "Missing required field: {}", field),
            ConfigurationError::InvalidValue { field, value, reason } => {
                write!(f, "Invalid value for {}: '{}' ({})", field, value, reason)
            }
            ConfigurationError::LoadFailed(msg) => write!(f, "Failed to load configuration: {}", msg),
            ConfigurationError::SaveFailed(msg) => write!(f, "Failed to save configuration: {}", msg),
        }
    }
}

impl std::error::Error for AviatorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AviatorError::Configuration(e) => Some(e),
            AviatorError::Round(e) => Some(e),
            AviatorError::Ledger(e) => Some(e),
            AviatorError::Fairness(e) => Some(e),
            AviatorError::Store(e) => Some(e),
            AviatorError::Driver(e) => Some(e),
            AviatorError::Io(e) => Some(e),
        }
    }
}

impl std::error::Error for ConfigurationError {}

impl From<ConfigurationError> for AviatorError {
    fn from(e: ConfigurationError) -> Self {
        AviatorError::Configuration(e)
    }
}

impl From<RoundError> for AviatorError {
    fn from(e: RoundError) -> Self {
        AviatorError::Round(e)
    }
}

impl From<LedgerError> for AviatorError {
    fn from(e: LedgerError) -> Self {
        AviatorError::Ledger(e)
    }
}

impl From<FairnessError> for AviatorError {
    fn from(e: FairnessError) -> Self {
        AviatorError::Fairness(e)
    }
}

impl From<StoreError> for AviatorError {
    fn from(e: StoreError) -> Self {
        AviatorError::Store(e)
    }
}

impl From<DriverError> for AviatorError {
    fn from(e: DriverError) -> Self {
        AviatorError::Driver(e)
    }
}

impl From<std::io::Error> for AviatorError {
    fn from(e: std::io::Error) -> Self {
        AviatorError::Io(e)
    }
}

impl From<serde_json::Error> for AviatorError {
    fn from(e: serde_json::Error) -> Self {
        AviatorError::Configuration(ConfigurationError::LoadFailed(e.to_string()))
    }
}

impl From<toml::de::Error> for AviatorError {
    fn from(e: toml::de::Error) -> Self {
        AviatorError::Configuration(ConfigurationError::LoadFailed(e.to_string()))
    }
}

// Convenience type alias for Results
pub type AviatorResult<T> = Result<T, AviatorError>;
