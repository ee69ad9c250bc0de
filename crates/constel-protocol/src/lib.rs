//! # constel-protocol
//!
//! The accounting core assembled into one host.
//!
//! [`host::Protocol`] owns every component's state together with the asset
//! ledger and the role directory. Each operation runs as a transaction
//! against a copy of the state and is committed only if it succeeds, so a
//! rejected operation leaves nothing behind.
//!
//! ## Modules
//!
//! - [`accounts`] — Protocol-owned account identities
//! - [`config`] — TOML configuration
//! - [`events`] — Committed event log
//! - [`host`] — Transaction host and snapshots

pub mod accounts;
pub mod config;
pub mod events;
pub mod host;

use constel_auth::AuthError;
use constel_distributor::DistributorError;
use constel_oracle::OracleError;
use constel_streamer::StreamError;
use constel_types::{Identity, LedgerError};
use constel_vault::VaultError;

/// Error types for protocol operations.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The caller lacks the role required for a host-level operation.
    #[error("caller {caller} is not authorized")]
    Unauthorized {
        /// The rejected caller.
        caller: Identity,
    },

    /// Signed authorization failure.
    #[error("auth: {0}")]
    Auth(#[from] AuthError),

    /// Vault or coverage failure.
    #[error("vault: {0}")]
    Vault(#[from] VaultError),

    /// Reward split or minipool failure.
    #[error("distributor: {0}")]
    Distributor(#[from] DistributorError),

    /// Yield attestation failure.
    #[error("oracle: {0}")]
    Oracle(#[from] OracleError),

    /// Claim streaming failure.
    #[error("streamer: {0}")]
    Stream(#[from] StreamError),

    /// Asset ledger failure.
    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),

    /// Configuration file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file is not valid TOML.
    #[error("config: {0}")]
    Config(#[from] toml::de::Error),
}

/// Convenience result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
