//! Protocol-owned account identities.
//!
//! Each account is `derive_key(ACCOUNT_LABEL, contract_label || "/" || name)`,
//! so two deployments with different contract labels never share an
//! account. The contract identity itself is derived under its own context.

use serde::{Deserialize, Serialize};

use constel_crypto::blake3::{contexts, derive_key};
use constel_types::Identity;

/// Identity of the deployment named `contract_label`.
pub fn contract_identity(contract_label: &str) -> Identity {
    Identity(derive_key(contexts::CONTRACT_IDENTITY, contract_label.as_bytes()))
}

/// Identity of the protocol account `name` under `contract_label`.
pub fn account_identity(contract_label: &str, name: &str) -> Identity {
    let label = format!("{contract_label}/{name}");
    Identity(derive_key(contexts::ACCOUNT_LABEL, label.as_bytes()))
}

/// Every account the protocol controls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolAccounts {
    pub contract: Identity,
    pub base_vault: Identity,
    pub collateral_vault: Identity,
    pub pool: Identity,
    pub treasury: Identity,
    pub operator_rewards: Identity,
    pub streamer: Identity,
}

impl ProtocolAccounts {
    pub fn derive(contract_label: &str) -> Self {
        Self {
            contract: contract_identity(contract_label),
            base_vault: account_identity(contract_label, "base-vault"),
            collateral_vault: account_identity(contract_label, "collateral-vault"),
            pool: account_identity(contract_label, "distribution-pool"),
            treasury: account_identity(contract_label, "treasury"),
            operator_rewards: account_identity(contract_label, "operator-rewards"),
            streamer: account_identity(contract_label, "claim-streamer"),
        }
    }

    /// All protocol-owned accounts, for snapshots.
    pub fn all(&self) -> [(&'static str, Identity); 7] {
        [
            ("contract", self.contract),
            ("base_vault", self.base_vault),
            ("collateral_vault", self.collateral_vault),
            ("pool", self.pool),
            ("treasury", self.treasury),
            ("operator_rewards", self.operator_rewards),
            ("streamer", self.streamer),
        ]
    }
}
