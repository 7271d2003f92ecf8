//! Error types for the oracle coordination service

use thiserror::Error;

use crate::models::OracleIdentity;

/// Errors returned by a ledger round-trip.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// RPC or transport failure; the ledger may never have seen the call
    #[error("ledger transport error: {0}")]
    Transport(String),

    /// Contract-level revert (insufficient fee, already registered, index mismatch...)
    #[error("ledger rejected {operation}: {reason}")]
    Rejected {
        operation: &'static str,
        reason: String,
    },

    /// The ledger answered with something we could not decode
    #[error("malformed ledger response: {0}")]
    Malformed(String),
}

impl LedgerError {
    pub fn is_rejection(&self) -> bool {
        matches!(self, LedgerError::Rejected { .. })
    }
}

impl From<reqwest::Error> for LedgerError {
    fn from(err: reqwest::Error) -> Self {
        LedgerError::Transport(err.to_string())
    }
}

/// Errors raised by the in-memory account registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("oracle {0} is already registered")]
    DuplicateRegistration(OracleIdentity),
}

/// Reason an identity was left out of the oracle pool during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Startup configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}
