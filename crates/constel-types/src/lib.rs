//! # constel-types
//!
//! Shared domain types used across the Constellation workspace.
//!
//! The accounting core talks to its collaborators (role registry, price feed,
//! asset ledger) through the narrow traits defined here so that every crate
//! can be exercised against in-memory implementations.
//!
//! ## Modules
//!
//! - [`ledger`] — Asset ledger trait and the in-memory [`ledger::Bank`]
//! - [`math`] — Fixed-point helpers (`RATE_SCALE` = 1.0)
//! - [`price`] — Price feed collaborator
//! - [`roles`] — Identity registry and role directory

pub mod ledger;
pub mod math;
pub mod price;
pub mod roles;

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use math::RATE_SCALE;

/// Amounts are carried in the smallest unit of each asset (wei-style).
pub type Amount = u128;

/// Fixed-point rate or ratio where [`RATE_SCALE`] represents 1.0.
pub type Rate = u128;

/// One whole unit of an 18-decimal asset.
pub const ONE_ETHER: Amount = 1_000_000_000_000_000_000;

/// A 32-byte account identity.
///
/// Key-controlled identities are `BLAKE3(public_key)`; protocol-owned
/// accounts use a domain-separated hash of their label.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Identity(pub [u8; 32]);

impl Identity {
    /// The all-zero identity. Never a valid account owner.
    pub const ZERO: Identity = Identity([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps log lines readable.
        write!(f, "Identity({}..)", &hex::encode(self.0)[..12])
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let bytes = hex::decode(&encoded).map_err(serde::de::Error::custom)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("identity must be 32 bytes"))?;
        Ok(Identity(arr))
    }
}

/// The two assets handled by the protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Asset {
    /// The staked base asset (e.g. wrapped ether).
    Base,
    /// The collateral asset backing operator bonds.
    Collateral,
}

impl Asset {
    /// Both assets, base first.
    pub const ALL: [Asset; 2] = [Asset::Base, Asset::Collateral];

    /// The asset on the other side of the coverage ratio.
    pub fn counterpart(self) -> Asset {
        match self {
            Asset::Base => Asset::Collateral,
            Asset::Collateral => Asset::Base,
        }
    }

    /// Stable one-byte tag used in signed payloads.
    pub fn tag(self) -> u8 {
        match self {
            Asset::Base => 0,
            Asset::Collateral => 1,
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Base => f.write_str("base"),
            Asset::Collateral => f.write_str("collateral"),
        }
    }
}

/// Capabilities consulted before every privileged mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Protocol administrator: configuration setters, exit distribution.
    Admin,
    /// Distribution trigger: reward splits, minipool creation, sweeps.
    Protocol,
    /// May sign yield attestations.
    OracleAdmin,
    /// Authorizer for signed reward claims and operator onboarding.
    AdminServer,
}

/// Target bound into every signed payload: the verifying component and the
/// chain it runs on. A signature for one deployment never verifies on another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningDomain {
    /// Identity of the component that verifies the payload.
    pub contract: Identity,
    /// Chain identifier.
    pub chain_id: u64,
}

impl SigningDomain {
    pub fn new(contract: Identity, chain_id: u64) -> Self {
        Self { contract, chain_id }
    }
}

/// Error types for asset ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The sender does not hold enough of the asset.
    #[error("insufficient {asset} balance for {account}: available {available}, required {required}")]
    InsufficientBalance {
        /// The account being debited.
        account: Identity,
        /// The asset being moved.
        asset: Asset,
        /// The balance available.
        available: Amount,
        /// The amount requested.
        required: Amount,
    },

    /// The recipient refused the transfer.
    #[error("transfer rejected by recipient {account}")]
    TransferRejected {
        /// The refusing account.
        account: Identity,
    },

    /// A balance would overflow.
    #[error("arithmetic overflow in ledger balance")]
    Overflow,
}
