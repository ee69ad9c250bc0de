//! Scenario script format.
//!
//! A script is a JSON list of steps replayed in order. Every step carries the
//! ledger time it runs at and one action. Actors are referenced by name; see
//! [`crate::actors`] for how names resolve to identities and keys.
//!
//! ```json
//! {
//!   "admin": "admin",
//!   "steps": [
//!     { "now": 1700000000, "action": { "fund": { "account": "alice", "asset": "base", "amount": 1000 } } },
//!     { "now": 1700000000, "action": { "deposit": { "depositor": "alice", "asset": "base", "amount": 1000 } } }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

use constel_types::{Amount, Asset, Rate, Role};
use constel_vault::coverage::RatioBound;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    /// Actor that receives the admin role at construction.
    #[serde(default = "default_admin")]
    pub admin: String,
    pub steps: Vec<Step>,
}

fn default_admin() -> String {
    "admin".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Ledger time the action runs at.
    pub now: u64,
    pub action: Action,
    /// The step is expected to be rejected. A rejection is then logged and
    /// the replay continues; an acceptance aborts it.
    #[serde(default)]
    pub expect_rejection: bool,
}

/// One protocol operation, with actors named as strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Fund {
        account: String,
        asset: Asset,
        amount: Amount,
    },
    GrantRole {
        caller: String,
        role: Role,
        identity: String,
    },
    RevokeRole {
        caller: String,
        role: Role,
        identity: String,
    },
    Deposit {
        depositor: String,
        asset: Asset,
        amount: Amount,
    },
    Redeem {
        owner: String,
        asset: Asset,
        shares: Amount,
    },
    SetMintFeeRate {
        caller: String,
        asset: Asset,
        rate: Rate,
    },
    SetLiquidityReserveRate {
        caller: String,
        asset: Asset,
        rate: Rate,
    },
    SetRatioBound {
        caller: String,
        asset: Asset,
        bound: RatioBound,
    },
    RewardReceived {
        caller: String,
        reward: Amount,
        treasury_rate: Rate,
        operator_rate: Rate,
    },
    CreateMinipool {
        caller: String,
        minipool: String,
        sub_operator: String,
    },
    DistributeExitedMinipool {
        caller: String,
        minipool: String,
    },
    SetFeeSplit {
        caller: String,
        treasury_rate: Rate,
        operator_rate: Rate,
    },
    SetBondSize {
        caller: String,
        bond: Amount,
    },
    TransferToVault {
        caller: String,
        asset: Asset,
        amount: Amount,
    },
    /// Sign and submit a yield attestation timestamped at the step time.
    AttestYield {
        signer: String,
        new_yield: i128,
        /// Defaults to the oracle error at signing time.
        #[serde(default)]
        expected_oracle_error: Option<i128>,
    },
    SweepLockedResidue {
        caller: String,
    },
    FinalizeClaims {
        caller: String,
        base: Amount,
        collateral: Amount,
    },
    SetStreamingInterval {
        caller: String,
        interval: u64,
    },
    /// Sign a reward-claim grant at the live nonces and redeem it.
    ClaimReward {
        signer: String,
        rewardee: String,
        asset: Asset,
        amount: Amount,
    },
    /// Sign an onboarding grant at the live nonces and redeem it.
    AddOperator {
        signer: String,
        operator: String,
    },
    RemoveOperator {
        caller: String,
        operator: String,
    },
    BumpIdentityNonce {
        caller: String,
        identity: String,
    },
    BumpGlobalEpoch {
        caller: String,
    },
    /// Move the development price feed.
    SetPrice {
        price: Rate,
    },
}

impl Action {
    /// Operation name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Fund { .. } => "fund",
            Action::GrantRole { .. } => "grant_role",
            Action::RevokeRole { .. } => "revoke_role",
            Action::Deposit { .. } => "deposit",
            Action::Redeem { .. } => "redeem",
            Action::SetMintFeeRate { .. } => "set_mint_fee_rate",
            Action::SetLiquidityReserveRate { .. } => "set_liquidity_reserve_rate",
            Action::SetRatioBound { .. } => "set_ratio_bound",
            Action::RewardReceived { .. } => "reward_received",
            Action::CreateMinipool { .. } => "create_minipool",
            Action::DistributeExitedMinipool { .. } => "distribute_exited_minipool",
            Action::SetFeeSplit { .. } => "set_fee_split",
            Action::SetBondSize { .. } => "set_bond_size",
            Action::TransferToVault { .. } => "transfer_to_vault",
            Action::AttestYield { .. } => "attest_yield",
            Action::SweepLockedResidue { .. } => "sweep_locked_residue",
            Action::FinalizeClaims { .. } => "finalize_claims",
            Action::SetStreamingInterval { .. } => "set_streaming_interval",
            Action::ClaimReward { .. } => "claim_reward",
            Action::AddOperator { .. } => "add_operator",
            Action::RemoveOperator { .. } => "remove_operator",
            Action::BumpIdentityNonce { .. } => "bump_identity_nonce",
            Action::BumpGlobalEpoch { .. } => "bump_global_epoch",
            Action::SetPrice { .. } => "set_price",
        }
    }
}
