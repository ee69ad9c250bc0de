//! Transaction host.
//!
//! ## Total assets
//!
//! ```text
//! base       = base vault + pool base + deployed bonds + streamed base
//!              +/- distributable yield (floored at zero)
//! collateral = collateral vault + pool collateral + streamed collateral
//! ```
//!
//! Locked claims count only as far as they have streamed.
//!
//! ## Atomicity
//!
//! [`Protocol::transact`] runs each operation on a clone of the state and
//! swaps it in only on success. Components may therefore touch the ledger
//! and their own state in whatever order is natural.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use constel_auth::grant::SignedClaimAuthorization;
use constel_auth::rewards::RewardClaims;
use constel_auth::whitelist::Whitelist;
use constel_crypto::ed25519::Endorsement;
use constel_distributor::engine::{DistributorAccounts, ExitReport, RewardSplitEngine};
use constel_distributor::minipool::MinipoolRecord;
use constel_distributor::splits::{FeeSplit, Split};
use constel_oracle::attestation::{
    DistributableYield, OracleState, Settlement, SignedAttestation, YieldOracle,
};
use constel_oracle::stub::StubPriceFeed;
use constel_streamer::stream::{ClaimStreamer, StreamState, StreamerAccounts, Sweep};
use constel_types::ledger::{AssetLedger, Bank, Holdings};
use constel_types::price::PriceFeed;
use constel_types::roles::{IdentityRegistry, RoleDirectory};
use constel_types::{Amount, Asset, Identity, Rate, Role, SigningDomain};
use constel_vault::coverage::{coverage_ratio, PriceNormalizer, RatioBound};
use constel_vault::vault::{
    AssetTotals, DepositReceipt, RedeemReceipt, Vault, VaultAccounts, VaultParams,
};
use constel_vault::VaultError;

use crate::accounts::ProtocolAccounts;
use crate::config::{bps_to_rate, ProtocolConfig};
use crate::events::{EventLog, ProtocolEvent};
use crate::{ProtocolError, Result};

/// Every piece of mutable protocol state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProtocolState {
    pub bank: Bank,
    pub roles: RoleDirectory,
    pub base_vault: Vault,
    pub collateral_vault: Vault,
    pub distributor: RewardSplitEngine,
    pub oracle: YieldOracle,
    pub streamer: ClaimStreamer,
    pub auth: SignedClaimAuthorization,
    pub whitelist: Whitelist,
}

impl ProtocolState {
    pub fn vault(&self, asset: Asset) -> &Vault {
        match asset {
            Asset::Base => &self.base_vault,
            Asset::Collateral => &self.collateral_vault,
        }
    }

    fn vault_and_bank(&mut self, asset: Asset) -> (&mut Vault, &mut Bank) {
        let vault = match asset {
            Asset::Base => &mut self.base_vault,
            Asset::Collateral => &mut self.collateral_vault,
        };
        (vault, &mut self.bank)
    }

    /// Total assets backing the `asset` vault at `now`.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::Stream`] if `now` precedes the last claim
    /// - [`ProtocolError::Vault`] on overflow
    pub fn total_assets(&self, asset: Asset, now: u64) -> Result<Amount> {
        let vault = self.vault(asset).accounts().vault;
        let pool = self.distributor.accounts().pool;
        let streamed = self.streamer.streamed_amount(asset, now)?;
        let mut total = self
            .bank
            .balance_of(&vault, asset)
            .checked_add(self.bank.balance_of(&pool, asset))
            .and_then(|sum| sum.checked_add(streamed))
            .ok_or(VaultError::Overflow)?;

        if asset == Asset::Base {
            total = total
                .checked_add(self.distributor.deployed_bonds())
                .ok_or(VaultError::Overflow)?;
            total = self
                .oracle
                .distributable_yield()
                .apply_to(total)
                .ok_or(VaultError::Overflow)?;
        }
        Ok(total)
    }

    /// Both totals at `now`.
    ///
    /// # Errors
    ///
    /// See [`ProtocolState::total_assets`].
    pub fn totals(&self, now: u64) -> Result<AssetTotals> {
        Ok(AssetTotals {
            base: self.total_assets(Asset::Base, now)?,
            collateral: self.total_assets(Asset::Collateral, now)?,
        })
    }
}

/// Point-in-time view for reporting.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: u64,
    pub totals: AssetTotals,
    pub coverage_ratio: Rate,
    pub oracle_error: i128,
    pub oracle: OracleState,
    pub distributable_yield: DistributableYield,
    pub stream: StreamState,
    pub deployed_bonds: Amount,
    pub minipools: Vec<MinipoolRecord>,
    pub base_shares: Amount,
    pub collateral_shares: Amount,
    pub accounts: BTreeMap<String, Holdings>,
    pub epoch: u64,
    pub events: u64,
}

/// The protocol host.
pub struct Protocol<P = StubPriceFeed> {
    accounts: ProtocolAccounts,
    state: ProtocolState,
    normalizer: PriceNormalizer<P>,
    events: EventLog,
}

impl Protocol<StubPriceFeed> {
    /// Build a protocol priced by the stub feed at the configured price.
    ///
    /// # Errors
    ///
    /// See [`Protocol::with_feed`].
    pub fn new(config: &ProtocolConfig, admin: Identity) -> Result<Self> {
        let feed = StubPriceFeed::with_price(config.price.collateral_price());
        Self::with_feed(config, admin, feed)
    }
}

impl<P: PriceFeed> Protocol<P> {
    /// Build a protocol from configuration with `admin` as the first admin.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::Vault`] if a configured rate exceeds 1.0
    /// - [`ProtocolError::Distributor`] if the fee split exceeds 1.0
    /// - [`ProtocolError::Stream`] if the streaming interval is zero
    pub fn with_feed(config: &ProtocolConfig, admin: Identity, feed: P) -> Result<Self> {
        let accounts = ProtocolAccounts::derive(&config.network.contract_label);
        let domain = SigningDomain::new(accounts.contract, config.network.chain_id);

        let vault_accounts = |vault| VaultAccounts {
            vault,
            pool: accounts.pool,
            treasury: accounts.treasury,
        };
        let base_vault = Vault::new(
            Asset::Base,
            vault_accounts(accounts.base_vault),
            VaultParams {
                mint_fee_rate: bps_to_rate(config.vaults.base_mint_fee_bps),
                liquidity_reserve_rate: bps_to_rate(config.vaults.base_liquidity_reserve_bps),
                bound: RatioBound::Max(config.vaults.max_coverage_ratio()),
            },
        )?;
        let collateral_vault = Vault::new(
            Asset::Collateral,
            vault_accounts(accounts.collateral_vault),
            VaultParams {
                mint_fee_rate: bps_to_rate(config.vaults.collateral_mint_fee_bps),
                liquidity_reserve_rate: bps_to_rate(config.vaults.collateral_liquidity_reserve_bps),
                bound: RatioBound::Min(bps_to_rate(config.vaults.min_coverage_ratio_bps)),
            },
        )?;

        let fee_split = FeeSplit::new(
            bps_to_rate(config.distributor.treasury_fee_bps),
            bps_to_rate(config.distributor.operator_fee_bps),
        )?;
        let distributor = RewardSplitEngine::new(
            DistributorAccounts {
                pool: accounts.pool,
                treasury: accounts.treasury,
                operator_rewards: accounts.operator_rewards,
            },
            config.distributor.bond(),
            fee_split,
        );
        let streamer = ClaimStreamer::new(
            StreamerAccounts {
                streamer: accounts.streamer,
                pool: accounts.pool,
            },
            config.streamer.interval_secs,
        )?;

        let mut roles = RoleDirectory::new();
        roles.grant(Role::Admin, admin);

        tracing::info!(
            contract = %accounts.contract,
            chain_id = config.network.chain_id,
            %admin,
            "protocol initialized"
        );

        Ok(Self {
            accounts,
            state: ProtocolState {
                bank: Bank::new(),
                roles,
                base_vault,
                collateral_vault,
                distributor,
                oracle: YieldOracle::new(domain),
                streamer,
                auth: SignedClaimAuthorization::new(domain),
                whitelist: Whitelist::new(),
            },
            normalizer: PriceNormalizer::new(feed),
            events: EventLog::new(),
        })
    }

    pub fn accounts(&self) -> &ProtocolAccounts {
        &self.accounts
    }

    pub fn state(&self) -> &ProtocolState {
        &self.state
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn feed(&self) -> &P {
        self.normalizer.feed()
    }

    pub fn feed_mut(&mut self) -> &mut P {
        self.normalizer.feed_mut()
    }

    /// Signing domain grants and attestations must be bound to.
    pub fn signing_domain(&self) -> SigningDomain {
        *self.state.auth.domain()
    }

    /// Run `op` against a copy of the state and commit it only on success.
    fn transact<T, F>(&mut self, now: u64, op: F) -> Result<T>
    where
        F: FnOnce(
            &mut ProtocolState,
            &ProtocolAccounts,
            &PriceNormalizer<P>,
        ) -> Result<(T, ProtocolEvent)>,
    {
        let mut draft = self.state.clone();
        match op(&mut draft, &self.accounts, &self.normalizer) {
            Ok((value, event)) => {
                self.state = draft;
                self.events.record(now, event);
                Ok(value)
            }
            Err(err) => {
                tracing::warn!(error = %err, now, "transaction rejected");
                Err(err)
            }
        }
    }

    fn require_admin(state: &ProtocolState, caller: &Identity) -> Result<()> {
        if !state.roles.has_role(caller, Role::Admin) {
            return Err(ProtocolError::Unauthorized { caller: *caller });
        }
        Ok(())
    }

    // Ledger and roles

    /// Credit funds arriving from outside the protocol (wallet funding,
    /// beacon-chain proceeds landing on a minipool).
    ///
    /// The in-memory bank has no outside world, so this is how hosts and
    /// simulations model value entering it. It is not an operation of the
    /// protocol itself: a host backed by a real asset ledger does not expose
    /// it. Every call is recorded as a [`ProtocolEvent::Funded`] event.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::Ledger`] if the balance would overflow
    pub fn fund(
        &mut self,
        account: Identity,
        asset: Asset,
        amount: Amount,
        now: u64,
    ) -> Result<()> {
        self.transact(now, |s, _, _| {
            s.bank.mint(account, asset, amount)?;
            Ok(((), ProtocolEvent::Funded { account, asset, amount }))
        })
    }

    /// Grant `role` to `identity`. Admin only.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::Unauthorized`] if `caller` is not an admin
    pub fn grant_role(
        &mut self,
        caller: Identity,
        role: Role,
        identity: Identity,
        now: u64,
    ) -> Result<()> {
        self.transact(now, |s, _, _| {
            Self::require_admin(s, &caller)?;
            s.roles.grant(role, identity);
            Ok(((), ProtocolEvent::RoleGranted { role, identity }))
        })
    }

    /// Revoke `role` from `identity`. Admin only.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::Unauthorized`] if `caller` is not an admin
    pub fn revoke_role(
        &mut self,
        caller: Identity,
        role: Role,
        identity: Identity,
        now: u64,
    ) -> Result<bool> {
        self.transact(now, |s, _, _| {
            Self::require_admin(s, &caller)?;
            let held = s.roles.revoke(role, &identity);
            Ok((held, ProtocolEvent::RoleRevoked { role, identity }))
        })
    }

    // Vaults

    /// Coverage-gated deposit into the `asset` vault.
    ///
    /// # Errors
    ///
    /// See [`Vault::deposit`].
    pub fn deposit(
        &mut self,
        depositor: Identity,
        asset: Asset,
        amount: Amount,
        now: u64,
    ) -> Result<DepositReceipt> {
        self.transact(now, |s, _, normalizer| {
            let totals = s.totals(now)?;
            let (vault, bank) = s.vault_and_bank(asset);
            let receipt = vault.deposit(normalizer, totals, bank, depositor, amount)?;
            Ok((
                receipt,
                ProtocolEvent::Deposited {
                    asset,
                    depositor,
                    receipt,
                },
            ))
        })
    }

    /// Redeem shares of the `asset` vault. Never gated by coverage.
    ///
    /// # Errors
    ///
    /// See [`Vault::redeem`].
    pub fn redeem(
        &mut self,
        owner: Identity,
        asset: Asset,
        shares: Amount,
        now: u64,
    ) -> Result<RedeemReceipt> {
        self.transact(now, |s, _, _| {
            let totals = s.totals(now)?;
            let (vault, bank) = s.vault_and_bank(asset);
            let receipt = vault.redeem(totals, bank, owner, shares)?;
            Ok((
                receipt,
                ProtocolEvent::Redeemed {
                    asset,
                    owner,
                    receipt,
                },
            ))
        })
    }

    /// Admin setter for a vault's mint fee.
    ///
    /// # Errors
    ///
    /// See [`Vault::set_mint_fee_rate`].
    pub fn set_mint_fee_rate(
        &mut self,
        caller: Identity,
        asset: Asset,
        rate: Rate,
        now: u64,
    ) -> Result<()> {
        self.transact(now, |s, _, _| {
            let vault = match asset {
                Asset::Base => &mut s.base_vault,
                Asset::Collateral => &mut s.collateral_vault,
            };
            vault.set_mint_fee_rate(&s.roles, &caller, rate)?;
            Ok(((), ProtocolEvent::MintFeeChanged { asset, rate }))
        })
    }

    /// Admin setter for a vault's liquidity reserve.
    ///
    /// # Errors
    ///
    /// See [`Vault::set_liquidity_reserve_rate`].
    pub fn set_liquidity_reserve_rate(
        &mut self,
        caller: Identity,
        asset: Asset,
        rate: Rate,
        now: u64,
    ) -> Result<()> {
        self.transact(now, |s, _, _| {
            let vault = match asset {
                Asset::Base => &mut s.base_vault,
                Asset::Collateral => &mut s.collateral_vault,
            };
            vault.set_liquidity_reserve_rate(&s.roles, &caller, rate)?;
            Ok(((), ProtocolEvent::LiquidityReserveChanged { asset, rate }))
        })
    }

    /// Admin setter for the bound owned by the `asset` vault.
    ///
    /// # Errors
    ///
    /// See [`Vault::set_ratio_bound`].
    pub fn set_ratio_bound(
        &mut self,
        caller: Identity,
        asset: Asset,
        bound: RatioBound,
        now: u64,
    ) -> Result<()> {
        self.transact(now, |s, _, _| {
            let vault = match asset {
                Asset::Base => &mut s.base_vault,
                Asset::Collateral => &mut s.collateral_vault,
            };
            vault.set_ratio_bound(&s.roles, &caller, bound)?;
            Ok(((), ProtocolEvent::RatioBoundChanged { asset, bound }))
        })
    }

    // Distribution

    /// See [`RewardSplitEngine::on_reward_received`].
    ///
    /// # Errors
    ///
    /// See [`RewardSplitEngine::on_reward_received`].
    pub fn on_reward_received(
        &mut self,
        caller: Identity,
        reward: Amount,
        treasury_rate: Rate,
        operator_rate: Rate,
        now: u64,
    ) -> Result<Split> {
        self.transact(now, |s, _, _| {
            let split = s.distributor.on_reward_received(
                &s.roles,
                &mut s.bank,
                &caller,
                reward,
                treasury_rate,
                operator_rate,
            )?;
            Ok((split, ProtocolEvent::RewardDistributed { reward, split }))
        })
    }

    /// See [`RewardSplitEngine::create_minipool`].
    ///
    /// # Errors
    ///
    /// See [`RewardSplitEngine::create_minipool`].
    pub fn create_minipool(
        &mut self,
        caller: Identity,
        minipool: Identity,
        sub_operator: Identity,
        now: u64,
    ) -> Result<MinipoolRecord> {
        self.transact(now, |s, _, _| {
            let record = s.distributor.create_minipool(
                &s.roles,
                &mut s.whitelist,
                &mut s.bank,
                &caller,
                minipool,
                sub_operator,
                now,
            )?;
            Ok((record, ProtocolEvent::MinipoolCreated { record }))
        })
    }

    /// See [`RewardSplitEngine::distribute_exited_minipool`].
    ///
    /// # Errors
    ///
    /// See [`RewardSplitEngine::distribute_exited_minipool`].
    pub fn distribute_exited_minipool(
        &mut self,
        caller: Identity,
        minipool: Identity,
        now: u64,
    ) -> Result<ExitReport> {
        self.transact(now, |s, _, _| {
            let report = s.distributor.distribute_exited_minipool(
                &s.roles,
                &mut s.whitelist,
                &mut s.bank,
                &caller,
                &minipool,
            )?;
            Ok((report, ProtocolEvent::MinipoolExited { report }))
        })
    }

    /// See [`RewardSplitEngine::set_fee_split`].
    ///
    /// # Errors
    ///
    /// See [`RewardSplitEngine::set_fee_split`].
    pub fn set_fee_split(
        &mut self,
        caller: Identity,
        treasury_rate: Rate,
        operator_rate: Rate,
        now: u64,
    ) -> Result<FeeSplit> {
        self.transact(now, |s, _, _| {
            let fee_split = s
                .distributor
                .set_fee_split(&s.roles, &caller, treasury_rate, operator_rate)?;
            Ok((fee_split, ProtocolEvent::FeeSplitChanged { fee_split }))
        })
    }

    /// See [`RewardSplitEngine::set_bond_size`].
    ///
    /// # Errors
    ///
    /// See [`RewardSplitEngine::set_bond_size`].
    pub fn set_bond_size(&mut self, caller: Identity, bond: Amount, now: u64) -> Result<()> {
        self.transact(now, |s, _, _| {
            s.distributor.set_bond_size(&s.roles, &caller, bond)?;
            Ok(((), ProtocolEvent::BondSizeChanged { bond }))
        })
    }

    /// Move pool liquidity back into the `asset` vault.
    ///
    /// # Errors
    ///
    /// See [`RewardSplitEngine::transfer_to_vault`].
    pub fn transfer_to_vault(
        &mut self,
        caller: Identity,
        asset: Asset,
        amount: Amount,
        now: u64,
    ) -> Result<()> {
        self.transact(now, |s, accounts, _| {
            let vault = match asset {
                Asset::Base => accounts.base_vault,
                Asset::Collateral => accounts.collateral_vault,
            };
            s.distributor
                .transfer_to_vault(&s.roles, &mut s.bank, &caller, vault, asset, amount)?;
            Ok(((), ProtocolEvent::LiquidityReturned { asset, amount }))
        })
    }

    // Oracle

    /// Accept a signed yield attestation and settle the oracle error.
    ///
    /// # Errors
    ///
    /// See [`YieldOracle::set_total_yield_accrued`].
    pub fn set_total_yield_accrued(
        &mut self,
        signed: &SignedAttestation,
        now: u64,
    ) -> Result<Settlement> {
        self.transact(now, |s, _, _| {
            let settlement =
                s.oracle
                    .set_total_yield_accrued(&s.roles, signed, s.distributor.oracle_error(), now)?;
            s.distributor
                .settle_oracle_error(settlement.oracle_error_reduction)?;
            Ok((
                settlement,
                ProtocolEvent::YieldAttested {
                    timestamp: signed.attestation.timestamp,
                    settlement,
                },
            ))
        })
    }

    pub fn distributable_yield(&self) -> DistributableYield {
        self.state.oracle.distributable_yield()
    }

    // Streamer

    /// Vested part of the locked `asset` claims at `now`.
    ///
    /// # Errors
    ///
    /// See [`ClaimStreamer::streamed_amount`].
    pub fn streamed_amount(&self, asset: Asset, now: u64) -> Result<Amount> {
        Ok(self.state.streamer.streamed_amount(asset, now)?)
    }

    /// See [`ClaimStreamer::sweep_locked_residue`].
    ///
    /// # Errors
    ///
    /// See [`ClaimStreamer::sweep_locked_residue`].
    pub fn sweep_locked_residue(&mut self, caller: Identity, now: u64) -> Result<Sweep> {
        self.transact(now, |s, _, _| {
            let sweep = s
                .streamer
                .sweep_locked_residue(&s.roles, &mut s.bank, &caller, now)?;
            Ok((sweep, ProtocolEvent::ResidueSwept { sweep }))
        })
    }

    /// See [`ClaimStreamer::finalize_claims`].
    ///
    /// # Errors
    ///
    /// See [`ClaimStreamer::finalize_claims`].
    pub fn finalize_claims(
        &mut self,
        caller: Identity,
        base: Amount,
        collateral: Amount,
        now: u64,
    ) -> Result<Sweep> {
        self.transact(now, |s, _, _| {
            let swept = s
                .streamer
                .finalize_claims(&s.roles, &mut s.bank, &caller, base, collateral, now)?;
            Ok((
                swept,
                ProtocolEvent::ClaimsFinalized {
                    base,
                    collateral,
                    swept,
                },
            ))
        })
    }

    /// See [`ClaimStreamer::set_streaming_interval`].
    ///
    /// # Errors
    ///
    /// See [`ClaimStreamer::set_streaming_interval`].
    pub fn set_streaming_interval(
        &mut self,
        caller: Identity,
        interval: u64,
        now: u64,
    ) -> Result<()> {
        self.transact(now, |s, _, _| {
            s.streamer.set_streaming_interval(&s.roles, &caller, interval)?;
            Ok(((), ProtocolEvent::StreamingIntervalChanged { interval }))
        })
    }

    // Signed claims

    /// Pay a signed reward claim from the operator-reward account.
    ///
    /// # Errors
    ///
    /// See [`RewardClaims::claim`].
    pub fn claim_reward(
        &mut self,
        rewardee: Identity,
        asset: Asset,
        amount: Amount,
        grant: &Endorsement,
        now: u64,
    ) -> Result<Amount> {
        self.transact(now, |s, accounts, _| {
            let paid = RewardClaims::new(accounts.operator_rewards).claim(
                &mut s.auth,
                &s.roles,
                &mut s.bank,
                rewardee,
                asset,
                amount,
                grant,
            )?;
            Ok((
                paid,
                ProtocolEvent::RewardClaimed {
                    rewardee,
                    asset,
                    amount: paid,
                },
            ))
        })
    }

    /// Onboard an operator with a signed grant.
    ///
    /// # Errors
    ///
    /// See [`Whitelist::add_operator`].
    pub fn add_operator(
        &mut self,
        operator: Identity,
        grant: &Endorsement,
        now: u64,
    ) -> Result<()> {
        self.transact(now, |s, _, _| {
            s.whitelist
                .add_operator(&mut s.auth, &s.roles, operator, grant, now)?;
            Ok(((), ProtocolEvent::OperatorAdded { operator }))
        })
    }

    /// See [`Whitelist::remove_operator`].
    ///
    /// # Errors
    ///
    /// See [`Whitelist::remove_operator`].
    pub fn remove_operator(
        &mut self,
        caller: Identity,
        operator: Identity,
        now: u64,
    ) -> Result<()> {
        self.transact(now, |s, _, _| {
            s.whitelist.remove_operator(&s.roles, &caller, &operator)?;
            Ok(((), ProtocolEvent::OperatorRemoved { operator }))
        })
    }

    /// See [`SignedClaimAuthorization::bump_identity_nonce`].
    ///
    /// # Errors
    ///
    /// See [`SignedClaimAuthorization::bump_identity_nonce`].
    pub fn bump_identity_nonce(
        &mut self,
        caller: Identity,
        identity: Identity,
        now: u64,
    ) -> Result<u64> {
        self.transact(now, |s, _, _| {
            let nonce = s.auth.bump_identity_nonce(&s.roles, &caller, identity)?;
            Ok((nonce, ProtocolEvent::IdentityNonceBumped { identity, nonce }))
        })
    }

    /// See [`SignedClaimAuthorization::bump_global_epoch`].
    ///
    /// # Errors
    ///
    /// See [`SignedClaimAuthorization::bump_global_epoch`].
    pub fn bump_global_epoch(&mut self, caller: Identity, now: u64) -> Result<u64> {
        self.transact(now, |s, _, _| {
            let epoch = s.auth.bump_global_epoch(&s.roles, &caller)?;
            Ok((epoch, ProtocolEvent::GlobalEpochBumped { epoch }))
        })
    }

    // Views

    /// See [`ProtocolState::total_assets`].
    ///
    /// # Errors
    ///
    /// See [`ProtocolState::total_assets`].
    pub fn total_assets(&self, asset: Asset, now: u64) -> Result<Amount> {
        self.state.total_assets(asset, now)
    }

    /// Current coverage ratio.
    ///
    /// # Errors
    ///
    /// See [`ProtocolState::total_assets`].
    pub fn coverage_ratio(&self, now: u64) -> Result<Rate> {
        let totals = self.state.totals(now)?;
        Ok(coverage_ratio(&self.normalizer, totals.base, totals.collateral)?)
    }

    /// Reporting snapshot at `now`.
    ///
    /// # Errors
    ///
    /// See [`ProtocolState::total_assets`].
    pub fn snapshot(&self, now: u64) -> Result<Snapshot> {
        let s = &self.state;
        let accounts = self
            .accounts
            .all()
            .into_iter()
            .map(|(name, id)| (name.to_string(), s.bank.holdings(&id)))
            .collect();

        Ok(Snapshot {
            timestamp: now,
            totals: s.totals(now)?,
            coverage_ratio: self.coverage_ratio(now)?,
            oracle_error: s.distributor.oracle_error(),
            oracle: *s.oracle.state(),
            distributable_yield: s.oracle.distributable_yield(),
            stream: *s.streamer.state(),
            deployed_bonds: s.distributor.deployed_bonds(),
            minipools: s.distributor.minipools().iter().copied().collect(),
            base_shares: s.base_vault.total_shares(),
            collateral_shares: s.collateral_vault.total_shares(),
            accounts,
            epoch: s.auth.nonces().epoch(),
            events: self.events.sequence(),
        })
    }
}
