//! Reward-split engine.
//!
//! Owns the distribution pool's bookkeeping: the oracle error, the bond total
//! deployed into minipools, the configured fee split and the minipool
//! records. Pool balances themselves live in the asset ledger under the pool
//! account.
//!
//! ## Oracle error
//!
//! Every community portion is value realized on-ledger that the last yield
//! attestation has not seen. It is added to `oracle_error` here and removed
//! again when an attestation settles.

use serde::{Deserialize, Serialize};

use constel_auth::whitelist::Whitelist;
use constel_auth::AuthError;
use constel_types::ledger::{AssetLedger, Transfer};
use constel_types::roles::IdentityRegistry;
use constel_types::{Amount, Asset, Identity, Rate, Role};

use crate::minipool::{MinipoolRecord, MinipoolRegistry};
use crate::splits::{split_reward, FeeSplit, Split};
use crate::{DistributorError, Result};

/// Ledger accounts the engine pays between.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributorAccounts {
    pub pool: Identity,
    pub treasury: Identity,
    pub operator_rewards: Identity,
}

/// Outcome of an exit distribution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitReport {
    pub record: MinipoolRecord,
    /// Minipool balance returned to the pool.
    pub final_balance: Amount,
    /// `max(0, final_balance - bond)`.
    pub proceeds: Amount,
    pub split: Split,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardSplitEngine {
    accounts: DistributorAccounts,
    oracle_error: i128,
    deployed_bonds: Amount,
    bond_size: Amount,
    fee_split: FeeSplit,
    minipools: MinipoolRegistry,
}

impl RewardSplitEngine {
    pub fn new(accounts: DistributorAccounts, bond_size: Amount, fee_split: FeeSplit) -> Self {
        Self {
            accounts,
            oracle_error: 0,
            deployed_bonds: 0,
            bond_size,
            fee_split,
            minipools: MinipoolRegistry::new(),
        }
    }

    pub fn accounts(&self) -> &DistributorAccounts {
        &self.accounts
    }

    pub fn oracle_error(&self) -> i128 {
        self.oracle_error
    }

    pub fn deployed_bonds(&self) -> Amount {
        self.deployed_bonds
    }

    pub fn bond_size(&self) -> Amount {
        self.bond_size
    }

    pub fn fee_split(&self) -> FeeSplit {
        self.fee_split
    }

    pub fn minipools(&self) -> &MinipoolRegistry {
        &self.minipools
    }

    /// Pool balance of `asset`.
    pub fn pool_balance<L: AssetLedger + ?Sized>(&self, ledger: &L, asset: Asset) -> Amount {
        ledger.balance_of(&self.accounts.pool, asset)
    }

    fn require<R: IdentityRegistry + ?Sized>(
        registry: &R,
        caller: &Identity,
        roles: &[Role],
    ) -> Result<()> {
        if !registry.has_any_role(caller, roles) {
            tracing::warn!(%caller, ?roles, "distributor call rejected");
            return Err(DistributorError::Unauthorized { caller: *caller });
        }
        Ok(())
    }

    fn add_community(&self, community: Amount) -> Result<i128> {
        let community = i128::try_from(community).map_err(|_| DistributorError::Overflow)?;
        self.oracle_error
            .checked_add(community)
            .ok_or(DistributorError::Overflow)
    }

    fn payouts(&self, split: &Split) -> [Transfer; 2] {
        [
            Transfer::new(
                self.accounts.pool,
                self.accounts.treasury,
                Asset::Base,
                split.treasury,
            ),
            Transfer::new(
                self.accounts.pool,
                self.accounts.operator_rewards,
                Asset::Base,
                split.operator,
            ),
        ]
    }

    /// Split a reward that has already landed in the pool.
    ///
    /// Treasury and operator portions are paid out in one batch; the
    /// community portion stays in the pool and raises the oracle error.
    /// A zero reward at valid rates succeeds without effect.
    ///
    /// # Errors
    ///
    /// - [`DistributorError::Unauthorized`] unless `caller` holds the protocol role
    /// - [`DistributorError::ArithmeticUnderflow`] if the rates sum above 1.0
    /// - [`DistributorError::Ledger`] if either payout fails
    pub fn on_reward_received<R, L>(
        &mut self,
        registry: &R,
        ledger: &mut L,
        caller: &Identity,
        reward: Amount,
        treasury_rate: Rate,
        operator_rate: Rate,
    ) -> Result<Split>
    where
        R: IdentityRegistry + ?Sized,
        L: AssetLedger + ?Sized,
    {
        Self::require(registry, caller, &[Role::Protocol])?;
        let split = split_reward(reward, treasury_rate, operator_rate)?;
        if reward == 0 {
            return Ok(split);
        }

        let oracle_error = self.add_community(split.community)?;
        ledger.settle(&self.payouts(&split))?;
        self.oracle_error = oracle_error;

        tracing::info!(
            reward,
            treasury = split.treasury,
            operator = split.operator,
            community = split.community,
            oracle_error,
            "reward distributed"
        );
        Ok(split)
    }

    /// Fund a new minipool for a whitelisted sub-operator.
    ///
    /// Moves one bond from the pool to the minipool account and snapshots the
    /// current fee split into the record.
    ///
    /// # Errors
    ///
    /// - [`DistributorError::Unauthorized`] unless `caller` holds the protocol role
    /// - [`DistributorError::Auth`] if the sub-operator is not whitelisted
    /// - [`DistributorError::DuplicateMinipool`] if the id is taken
    /// - [`DistributorError::InsufficientLiquidity`] if the pool cannot fund the bond
    #[allow(clippy::too_many_arguments)]
    pub fn create_minipool<R, L>(
        &mut self,
        registry: &R,
        whitelist: &mut Whitelist,
        ledger: &mut L,
        caller: &Identity,
        minipool: Identity,
        sub_operator: Identity,
        now: u64,
    ) -> Result<MinipoolRecord>
    where
        R: IdentityRegistry + ?Sized,
        L: AssetLedger + ?Sized,
    {
        Self::require(registry, caller, &[Role::Protocol])?;
        if !whitelist.is_whitelisted(&sub_operator) {
            return Err(AuthError::NotWhitelisted(sub_operator).into());
        }
        if self.minipools.contains(&minipool) {
            return Err(DistributorError::DuplicateMinipool(minipool));
        }

        let available = self.pool_balance(ledger, Asset::Base);
        if available < self.bond_size {
            return Err(DistributorError::InsufficientLiquidity {
                available,
                required: self.bond_size,
            });
        }
        let deployed = self
            .deployed_bonds
            .checked_add(self.bond_size)
            .ok_or(DistributorError::Overflow)?;

        let record = MinipoolRecord {
            minipool,
            sub_operator,
            bond: self.bond_size,
            fees: self.fee_split,
            created_at: now,
        };

        ledger.settle(&[Transfer::new(
            self.accounts.pool,
            minipool,
            Asset::Base,
            record.bond,
        )])?;
        whitelist.increment_validators(&sub_operator)?;
        self.minipools.insert(record)?;
        self.deployed_bonds = deployed;

        tracing::info!(
            %minipool,
            %sub_operator,
            bond = record.bond,
            treasury_rate = record.fees.treasury_rate,
            operator_rate = record.fees.operator_rate,
            "minipool created"
        );
        Ok(record)
    }

    /// Return an exited minipool's balance to the pool and split any
    /// proceeds above the bond using the minipool's own fee snapshot.
    ///
    /// The record is removed and the operator's validator count decremented
    /// whether or not there were proceeds.
    ///
    /// # Errors
    ///
    /// - [`DistributorError::Unauthorized`] unless `caller` is admin or protocol
    /// - [`DistributorError::UnknownMinipool`] if there is no such record
    /// - [`DistributorError::Ledger`] if a transfer fails
    pub fn distribute_exited_minipool<R, L>(
        &mut self,
        registry: &R,
        whitelist: &mut Whitelist,
        ledger: &mut L,
        caller: &Identity,
        minipool: &Identity,
    ) -> Result<ExitReport>
    where
        R: IdentityRegistry + ?Sized,
        L: AssetLedger + ?Sized,
    {
        Self::require(registry, caller, &[Role::Admin, Role::Protocol])?;
        let record = *self
            .minipools
            .get(minipool)
            .ok_or(DistributorError::UnknownMinipool(*minipool))?;

        let final_balance = ledger.balance_of(minipool, Asset::Base);
        let proceeds = final_balance.saturating_sub(record.bond);
        let split = if proceeds == 0 {
            Split::default()
        } else {
            split_reward(proceeds, record.fees.treasury_rate, record.fees.operator_rate)?
        };
        let oracle_error = self.add_community(split.community)?;
        let deployed = self
            .deployed_bonds
            .checked_sub(record.bond)
            .ok_or(DistributorError::Overflow)?;
        let active = whitelist
            .operator(&record.sub_operator)
            .map(|op| op.active_validators)
            .unwrap_or(0);
        if active == 0 {
            return Err(AuthError::ValidatorCountOutOfRange(record.sub_operator).into());
        }

        let [treasury, operator] = self.payouts(&split);
        ledger.settle(&[
            Transfer::new(*minipool, self.accounts.pool, Asset::Base, final_balance),
            treasury,
            operator,
        ])?;
        whitelist.decrement_validators(&record.sub_operator)?;
        self.minipools.remove(minipool)?;
        self.deployed_bonds = deployed;
        self.oracle_error = oracle_error;

        tracing::info!(
            %minipool,
            final_balance,
            proceeds,
            treasury = split.treasury,
            operator = split.operator,
            community = split.community,
            oracle_error,
            "exited minipool distributed"
        );

        Ok(ExitReport {
            record,
            final_balance,
            proceeds,
            split,
        })
    }

    /// Replace the fee split used for new minipools. Admin only.
    ///
    /// # Errors
    ///
    /// - [`DistributorError::Unauthorized`] unless `caller` is admin
    /// - [`DistributorError::InvalidFeeSplit`] if the rates sum above 1.0
    pub fn set_fee_split<R: IdentityRegistry + ?Sized>(
        &mut self,
        registry: &R,
        caller: &Identity,
        treasury_rate: Rate,
        operator_rate: Rate,
    ) -> Result<FeeSplit> {
        Self::require(registry, caller, &[Role::Admin])?;
        self.fee_split = FeeSplit::new(treasury_rate, operator_rate)?;
        tracing::info!(treasury_rate, operator_rate, "fee split updated");
        Ok(self.fee_split)
    }

    /// Change the bond funded into new minipools. Admin only.
    ///
    /// # Errors
    ///
    /// - [`DistributorError::Unauthorized`] unless `caller` is admin
    pub fn set_bond_size<R: IdentityRegistry + ?Sized>(
        &mut self,
        registry: &R,
        caller: &Identity,
        bond_size: Amount,
    ) -> Result<()> {
        Self::require(registry, caller, &[Role::Admin])?;
        self.bond_size = bond_size;
        tracing::info!(bond_size, "bond size updated");
        Ok(())
    }

    /// Reduce the oracle error by an accepted attestation's delta.
    ///
    /// # Errors
    ///
    /// - [`DistributorError::OracleErrorUnderflow`] if the result would be negative
    pub fn settle_oracle_error(&mut self, reduction: i128) -> Result<i128> {
        let reduced = self
            .oracle_error
            .checked_sub(reduction)
            .filter(|value| *value >= 0)
            .ok_or(DistributorError::OracleErrorUnderflow {
                current: self.oracle_error,
                reduction,
            })?;
        tracing::debug!(before = self.oracle_error, after = reduced, "oracle error settled");
        self.oracle_error = reduced;
        Ok(reduced)
    }

    /// Return pool liquidity to a vault account.
    ///
    /// # Errors
    ///
    /// - [`DistributorError::Unauthorized`] unless `caller` is admin or protocol
    /// - [`DistributorError::Ledger`] if the pool cannot cover `amount`
    pub fn transfer_to_vault<R, L>(
        &self,
        registry: &R,
        ledger: &mut L,
        caller: &Identity,
        vault: Identity,
        asset: Asset,
        amount: Amount,
    ) -> Result<()>
    where
        R: IdentityRegistry + ?Sized,
        L: AssetLedger + ?Sized,
    {
        Self::require(registry, caller, &[Role::Admin, Role::Protocol])?;
        ledger.settle(&[Transfer::new(self.accounts.pool, vault, asset, amount)])?;
        tracing::info!(%vault, %asset, amount, "pool liquidity returned to vault");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use constel_auth::grant::SignedClaimAuthorization;
    use constel_auth::whitelist::onboarding_digest;
    use constel_crypto::ed25519::KeyPair;
    use constel_types::ledger::Bank;
    use constel_types::roles::RoleDirectory;
    use constel_types::{LedgerError, SigningDomain, ONE_ETHER, RATE_SCALE};

    const POOL: Identity = Identity([0x20; 32]);
    const TREASURY: Identity = Identity([0x30; 32]);
    const OPERATOR_REWARDS: Identity = Identity([0x40; 32]);
    const PROTOCOL: Identity = Identity([0x50; 32]);
    const ADMIN: Identity = Identity([0xAD; 32]);
    const OPERATOR: Identity = Identity([0x0F; 32]);
    const MINIPOOL: Identity = Identity([0x99; 32]);

    struct Fixture {
        engine: RewardSplitEngine,
        registry: RoleDirectory,
        whitelist: Whitelist,
        bank: Bank,
    }

    fn fixture(bond: Amount) -> Fixture {
        let mut registry = RoleDirectory::new();
        registry.grant(Role::Protocol, PROTOCOL);
        registry.grant(Role::Admin, ADMIN);

        let signer = KeyPair::from_bytes(&[7u8; 32]);
        registry.grant(Role::AdminServer, Identity(signer.identity()));
        let mut auth = SignedClaimAuthorization::new(SigningDomain::new(Identity([0xC3; 32]), 1));
        let mut whitelist = Whitelist::new();
        let grant = signer.endorse(&onboarding_digest(&auth, &OPERATOR, 0, 0));
        whitelist
            .add_operator(&mut auth, &registry, OPERATOR, &grant, 0)
            .expect("onboard");

        let accounts = DistributorAccounts {
            pool: POOL,
            treasury: TREASURY,
            operator_rewards: OPERATOR_REWARDS,
        };
        Fixture {
            engine: RewardSplitEngine::new(accounts, bond, FeeSplit::default()),
            registry,
            whitelist,
            bank: Bank::new(),
        }
    }

    #[test]
    fn test_reward_sixty_forty() {
        let mut f = fixture(0);
        f.bank.mint(POOL, Asset::Base, ONE_ETHER).expect("reward lands");

        let split = f
            .engine
            .on_reward_received(
                &f.registry,
                &mut f.bank,
                &PROTOCOL,
                ONE_ETHER,
                RATE_SCALE * 6 / 10,
                RATE_SCALE * 4 / 10,
            )
            .expect("split");
        assert_eq!(split.community, 0);
        assert_eq!(f.bank.balance_of(&TREASURY, Asset::Base), ONE_ETHER * 6 / 10);
        assert_eq!(f.bank.balance_of(&OPERATOR_REWARDS, Asset::Base), ONE_ETHER * 4 / 10);
        assert_eq!(f.engine.oracle_error(), 0);
    }

    #[test]
    fn test_reward_community_raises_oracle_error() {
        let mut f = fixture(0);
        f.bank.mint(POOL, Asset::Base, 1_000).expect("reward lands");
        f.engine
            .on_reward_received(&f.registry, &mut f.bank, &PROTOCOL, 1_000, RATE_SCALE / 10, 0)
            .expect("split");
        assert_eq!(f.engine.oracle_error(), 900);
        assert_eq!(f.engine.pool_balance(&f.bank, Asset::Base), 900);
    }

    #[test]
    fn test_reward_rejections_leave_state() {
        let mut f = fixture(0);
        f.bank.mint(POOL, Asset::Base, 1_000).expect("reward lands");

        assert!(matches!(
            f.engine
                .on_reward_received(&f.registry, &mut f.bank, &ADMIN, 1_000, 0, 0),
            Err(DistributorError::Unauthorized { .. })
        ));
        assert!(matches!(
            f.engine
                .on_reward_received(&f.registry, &mut f.bank, &PROTOCOL, 1_000, RATE_SCALE, 1),
            Err(DistributorError::ArithmeticUnderflow { .. })
        ));

        f.bank.set_rejecting(OPERATOR_REWARDS, true);
        assert!(matches!(
            f.engine.on_reward_received(
                &f.registry,
                &mut f.bank,
                &PROTOCOL,
                1_000,
                RATE_SCALE / 10,
                RATE_SCALE / 10
            ),
            Err(DistributorError::Ledger(LedgerError::TransferRejected { .. }))
        ));
        assert_eq!(f.bank.balance_of(&TREASURY, Asset::Base), 0);
        assert_eq!(f.engine.oracle_error(), 0);
    }

    #[test]
    fn test_zero_reward_is_noop() {
        let mut f = fixture(0);
        let split = f
            .engine
            .on_reward_received(&f.registry, &mut f.bank, &PROTOCOL, 0, RATE_SCALE, 0)
            .expect("noop");
        assert_eq!(split, Split::default());
        assert_eq!(f.bank.balance_of(&TREASURY, Asset::Base), 0);
        assert_eq!(f.engine.oracle_error(), 0);

        // Invalid rates are refused even with nothing to split.
        assert!(matches!(
            f.engine
                .on_reward_received(&f.registry, &mut f.bank, &PROTOCOL, 0, RATE_SCALE, 1),
            Err(DistributorError::ArithmeticUnderflow { .. })
        ));
    }

    #[test]
    fn test_reward_rejects_rates_hidden_by_rounding() {
        let mut f = fixture(0);
        f.bank.mint(POOL, Asset::Base, 999).expect("reward lands");
        let half_plus = RATE_SCALE / 2 + 1;

        assert!(matches!(
            f.engine
                .on_reward_received(&f.registry, &mut f.bank, &PROTOCOL, 999, half_plus, half_plus),
            Err(DistributorError::ArithmeticUnderflow { .. })
        ));
        assert_eq!(f.bank.balance_of(&TREASURY, Asset::Base), 0);
        assert_eq!(f.bank.balance_of(&OPERATOR_REWARDS, Asset::Base), 0);
        assert_eq!(f.engine.pool_balance(&f.bank, Asset::Base), 999);
        assert_eq!(f.engine.oracle_error(), 0);
    }

    #[test]
    fn test_exit_with_proceeds() {
        let mut f = fixture(32 * ONE_ETHER);
        f.bank.mint(POOL, Asset::Base, 32 * ONE_ETHER).expect("fund pool");
        f.engine
            .create_minipool(
                &f.registry,
                &mut f.whitelist,
                &mut f.bank,
                &PROTOCOL,
                MINIPOOL,
                OPERATOR,
                10,
            )
            .expect("create");
        assert_eq!(f.engine.deployed_bonds(), 32 * ONE_ETHER);
        assert_eq!(f.whitelist.operator(&OPERATOR).expect("op").active_validators, 1);

        // Beacon chain returns 33 ETH.
        f.bank.mint(MINIPOOL, Asset::Base, ONE_ETHER).expect("rewards");
        let report = f
            .engine
            .distribute_exited_minipool(
                &f.registry,
                &mut f.whitelist,
                &mut f.bank,
                &ADMIN,
                &MINIPOOL,
            )
            .expect("exit");

        assert_eq!(report.proceeds, ONE_ETHER);
        assert_eq!(report.split.treasury, ONE_ETHER / 10);
        assert_eq!(report.split.operator, ONE_ETHER / 10);
        assert_eq!(report.split.community, ONE_ETHER * 8 / 10);
        assert_eq!(f.engine.oracle_error(), (ONE_ETHER * 8 / 10) as i128);
        assert_eq!(f.engine.deployed_bonds(), 0);
        assert_eq!(f.bank.balance_of(&MINIPOOL, Asset::Base), 0);
        assert_eq!(
            f.engine.pool_balance(&f.bank, Asset::Base),
            32 * ONE_ETHER + ONE_ETHER * 8 / 10
        );
        assert!(f.engine.minipools().is_empty());
        assert_eq!(f.whitelist.operator(&OPERATOR).expect("op").active_validators, 0);
    }

    #[test]
    fn test_exit_at_a_loss_returns_principal_only() {
        let mut f = fixture(32 * ONE_ETHER);
        f.bank.mint(POOL, Asset::Base, 32 * ONE_ETHER).expect("fund pool");
        f.engine
            .create_minipool(
                &f.registry,
                &mut f.whitelist,
                &mut f.bank,
                &PROTOCOL,
                MINIPOOL,
                OPERATOR,
                10,
            )
            .expect("create");
        // Slashed: 31 ETH comes back.
        f.bank
            .settle(&[Transfer::new(MINIPOOL, Identity([0xBB; 32]), Asset::Base, ONE_ETHER)])
            .expect("slash");

        let report = f
            .engine
            .distribute_exited_minipool(
                &f.registry,
                &mut f.whitelist,
                &mut f.bank,
                &PROTOCOL,
                &MINIPOOL,
            )
            .expect("exit");
        assert_eq!(report.proceeds, 0);
        assert_eq!(report.split, Split::default());
        assert_eq!(f.engine.oracle_error(), 0);
        assert_eq!(f.engine.pool_balance(&f.bank, Asset::Base), 31 * ONE_ETHER);
        assert_eq!(f.whitelist.operator(&OPERATOR).expect("op").active_validators, 0);
    }

    #[test]
    fn test_exit_rejects_outsiders_and_unknown_minipools() {
        let mut f = fixture(0);
        assert!(matches!(
            f.engine.distribute_exited_minipool(
                &f.registry,
                &mut f.whitelist,
                &mut f.bank,
                &OPERATOR,
                &MINIPOOL
            ),
            Err(DistributorError::Unauthorized { .. })
        ));
        assert!(matches!(
            f.engine.distribute_exited_minipool(
                &f.registry,
                &mut f.whitelist,
                &mut f.bank,
                &ADMIN,
                &MINIPOOL
            ),
            Err(DistributorError::UnknownMinipool(_))
        ));
    }

    #[test]
    fn test_fee_snapshot_survives_fee_change() {
        let mut f = fixture(ONE_ETHER);
        f.bank.mint(POOL, Asset::Base, ONE_ETHER).expect("fund pool");
        f.engine
            .create_minipool(
                &f.registry,
                &mut f.whitelist,
                &mut f.bank,
                &PROTOCOL,
                MINIPOOL,
                OPERATOR,
                0,
            )
            .expect("create");
        f.engine
            .set_fee_split(&f.registry, &ADMIN, RATE_SCALE / 2, RATE_SCALE / 2)
            .expect("fee change");

        f.bank.mint(MINIPOOL, Asset::Base, 100).expect("proceeds");
        let report = f
            .engine
            .distribute_exited_minipool(
                &f.registry,
                &mut f.whitelist,
                &mut f.bank,
                &ADMIN,
                &MINIPOOL,
            )
            .expect("exit");
        assert_eq!(report.split.treasury, 10);
        assert_eq!(report.split.operator, 10);
        assert_eq!(report.split.community, 80);
    }

    #[test]
    fn test_create_minipool_checks() {
        let mut f = fixture(ONE_ETHER);
        assert!(matches!(
            f.engine.create_minipool(
                &f.registry,
                &mut f.whitelist,
                &mut f.bank,
                &PROTOCOL,
                MINIPOOL,
                OPERATOR,
                0
            ),
            Err(DistributorError::InsufficientLiquidity { available: 0, .. })
        ));
        f.bank.mint(POOL, Asset::Base, 2 * ONE_ETHER).expect("fund pool");
        assert!(matches!(
            f.engine.create_minipool(
                &f.registry,
                &mut f.whitelist,
                &mut f.bank,
                &PROTOCOL,
                MINIPOOL,
                Identity([0x77; 32]),
                0
            ),
            Err(DistributorError::Auth(AuthError::NotWhitelisted(_)))
        ));
        f.engine
            .create_minipool(
                &f.registry,
                &mut f.whitelist,
                &mut f.bank,
                &PROTOCOL,
                MINIPOOL,
                OPERATOR,
                0,
            )
            .expect("create");
        assert!(matches!(
            f.engine.create_minipool(
                &f.registry,
                &mut f.whitelist,
                &mut f.bank,
                &PROTOCOL,
                MINIPOOL,
                OPERATOR,
                0
            ),
            Err(DistributorError::DuplicateMinipool(_))
        ));
    }

    #[test]
    fn test_set_fee_split_rules() {
        let mut f = fixture(0);
        assert!(matches!(
            f.engine.set_fee_split(&f.registry, &PROTOCOL, 0, 0),
            Err(DistributorError::Unauthorized { .. })
        ));
        assert!(matches!(
            f.engine.set_fee_split(&f.registry, &ADMIN, RATE_SCALE, 1),
            Err(DistributorError::InvalidFeeSplit { .. })
        ));
        assert_eq!(f.engine.fee_split(), FeeSplit::default());
    }

    #[test]
    fn test_settle_oracle_error() {
        let mut f = fixture(0);
        f.bank.mint(POOL, Asset::Base, 100).expect("reward lands");
        f.engine
            .on_reward_received(&f.registry, &mut f.bank, &PROTOCOL, 100, 0, 0)
            .expect("split");
        assert_eq!(f.engine.settle_oracle_error(60).expect("settle"), 40);
        assert!(matches!(
            f.engine.settle_oracle_error(41),
            Err(DistributorError::OracleErrorUnderflow { .. })
        ));
        assert_eq!(f.engine.oracle_error(), 40);
    }

    #[test]
    fn test_transfer_to_vault() {
        let mut f = fixture(0);
        let vault = Identity([0x10; 32]);
        f.bank.mint(POOL, Asset::Collateral, 500).expect("fund pool");
        f.engine
            .transfer_to_vault(&f.registry, &mut f.bank, &PROTOCOL, vault, Asset::Collateral, 200)
            .expect("transfer");
        assert_eq!(f.bank.balance_of(&vault, Asset::Collateral), 200);
        assert!(matches!(
            f.engine
                .transfer_to_vault(
                    &f.registry,
                    &mut f.bank,
                    &OPERATOR,
                    vault,
                    Asset::Collateral,
                    1,
                ),
            Err(DistributorError::Unauthorized { .. })
        ));
    }
}
