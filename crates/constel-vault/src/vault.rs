//! Share vaults.
//!
//! A vault holds one asset. Deposits pay the mint fee to the treasury and
//! mint shares against the net amount:
//!
//! ```text
//! fee    = assets * mint_fee_rate
//! net    = assets - fee
//! shares = net * total_shares / total_assets     (1:1 for the first deposit)
//! ```
//!
//! `total_assets` is the vault's share of everything the protocol controls
//! in that asset (vault holdings, pool balance, deployed bonds, streamed
//! claims, attested yield). The host computes it and passes an
//! [`AssetTotals`] snapshot in.
//!
//! After a deposit the vault keeps `total_assets * liquidity_reserve_rate`
//! on hand and sweeps the rest to the distribution pool. Redemptions draw on
//! the vault first and pull any shortfall back from the pool.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use constel_types::ledger::{AssetLedger, Transfer};
use constel_types::math::{mul_div, mul_rate};
use constel_types::roles::IdentityRegistry;
use constel_types::{Amount, Asset, Identity, Rate, Role, RATE_SCALE};

use crate::coverage::{check_mint, Normalize, RatioBound};
use crate::{Result, VaultError};

/// Total assets of both vaults at one instant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetTotals {
    pub base: Amount,
    pub collateral: Amount,
}

impl AssetTotals {
    pub fn get(&self, asset: Asset) -> Amount {
        match asset {
            Asset::Base => self.base,
            Asset::Collateral => self.collateral,
        }
    }

    /// Copy with `asset` replaced by `amount`.
    pub fn with(mut self, asset: Asset, amount: Amount) -> Self {
        match asset {
            Asset::Base => self.base = amount,
            Asset::Collateral => self.collateral = amount,
        }
        self
    }
}

/// Ledger accounts a vault moves funds between.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultAccounts {
    /// The vault's own holdings.
    pub vault: Identity,
    /// Distribution pool receiving sweeps.
    pub pool: Identity,
    /// Treasury receiving mint fees.
    pub treasury: Identity,
}

/// Initial vault parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultParams {
    pub mint_fee_rate: Rate,
    pub liquidity_reserve_rate: Rate,
    pub bound: RatioBound,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositReceipt {
    pub assets: Amount,
    pub fee: Amount,
    pub net: Amount,
    pub shares: Amount,
    /// Amount moved from the vault to the pool after the deposit.
    pub swept: Amount,
    /// Coverage ratio after the deposit.
    pub ratio: Rate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemReceipt {
    pub shares: Amount,
    pub assets: Amount,
    /// Part of `assets` pulled back from the pool.
    pub from_pool: Amount,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    asset: Asset,
    accounts: VaultAccounts,
    total_shares: Amount,
    shares: BTreeMap<Identity, Amount>,
    mint_fee_rate: Rate,
    liquidity_reserve_rate: Rate,
    bound: RatioBound,
}

fn check_rate(rate: Rate) -> Result<Rate> {
    if rate > RATE_SCALE {
        return Err(VaultError::InvalidRate(rate));
    }
    Ok(rate)
}

impl Vault {
    /// Create an empty vault.
    ///
    /// # Errors
    ///
    /// - [`VaultError::InvalidRate`] if a rate exceeds 1.0
    /// - [`VaultError::BoundMismatch`] if the bound belongs to the other vault
    pub fn new(asset: Asset, accounts: VaultAccounts, params: VaultParams) -> Result<Self> {
        if !params.bound.belongs_to(asset) {
            return Err(VaultError::BoundMismatch { asset });
        }
        Ok(Self {
            asset,
            accounts,
            total_shares: 0,
            shares: BTreeMap::new(),
            mint_fee_rate: check_rate(params.mint_fee_rate)?,
            liquidity_reserve_rate: check_rate(params.liquidity_reserve_rate)?,
            bound: params.bound,
        })
    }

    pub fn asset(&self) -> Asset {
        self.asset
    }

    pub fn accounts(&self) -> &VaultAccounts {
        &self.accounts
    }

    pub fn total_shares(&self) -> Amount {
        self.total_shares
    }

    pub fn shares_of(&self, owner: &Identity) -> Amount {
        self.shares.get(owner).copied().unwrap_or(0)
    }

    pub fn mint_fee_rate(&self) -> Rate {
        self.mint_fee_rate
    }

    pub fn liquidity_reserve_rate(&self) -> Rate {
        self.liquidity_reserve_rate
    }

    pub fn bound(&self) -> RatioBound {
        self.bound
    }

    /// Assets `shares` would redeem for against `total_assets`.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Overflow`] on arithmetic overflow
    pub fn convert_to_assets(&self, shares: Amount, total_assets: Amount) -> Result<Amount> {
        if self.total_shares == 0 {
            return Ok(0);
        }
        mul_div(shares, total_assets, self.total_shares).ok_or(VaultError::Overflow)
    }

    /// Shares a net deposit of `net` would mint against `total_assets`.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Insolvent`] if shares exist but no assets back them
    /// - [`VaultError::Overflow`] on arithmetic overflow
    pub fn convert_to_shares(&self, net: Amount, total_assets: Amount) -> Result<Amount> {
        if self.total_shares == 0 {
            return Ok(net);
        }
        if total_assets == 0 {
            return Err(VaultError::Insolvent { asset: self.asset });
        }
        mul_div(net, self.total_shares, total_assets).ok_or(VaultError::Overflow)
    }

    /// Deposit `assets` from `depositor` and mint shares.
    ///
    /// The fee payment, the deposit and the reserve sweep settle as one
    /// ledger batch; shares are credited only once it succeeds.
    ///
    /// # Errors
    ///
    /// - [`VaultError::ZeroDeposit`] if `assets` is zero
    /// - [`VaultError::ZeroShares`] if the deposit rounds down to no shares
    /// - [`VaultError::InsufficientCollateralCoverage`] / [`VaultError::InsufficientBaseCoverage`]
    ///   if the post-deposit ratio breaches this vault's bound
    /// - [`VaultError::Ledger`] if the depositor cannot pay
    pub fn deposit<N, L>(
        &mut self,
        normalizer: &N,
        totals: AssetTotals,
        ledger: &mut L,
        depositor: Identity,
        assets: Amount,
    ) -> Result<DepositReceipt>
    where
        N: Normalize + ?Sized,
        L: AssetLedger + ?Sized,
    {
        if assets == 0 {
            return Err(VaultError::ZeroDeposit);
        }

        let fee = mul_rate(assets, self.mint_fee_rate).ok_or(VaultError::Overflow)?;
        let net = assets.checked_sub(fee).ok_or(VaultError::Overflow)?;
        let total_before = totals.get(self.asset);
        let shares = self.convert_to_shares(net, total_before)?;
        if shares == 0 {
            return Err(VaultError::ZeroShares);
        }

        let total_after = total_before.checked_add(net).ok_or(VaultError::Overflow)?;
        let after = totals.with(self.asset, total_after);
        let ratio = check_mint(normalizer, self.asset, self.bound, after.base, after.collateral)?;

        let holdings = ledger
            .balance_of(&self.accounts.vault, self.asset)
            .checked_add(net)
            .ok_or(VaultError::Overflow)?;
        let reserve =
            mul_rate(total_after, self.liquidity_reserve_rate).ok_or(VaultError::Overflow)?;
        let swept = holdings.saturating_sub(reserve);

        ledger.settle(&[
            Transfer::new(depositor, self.accounts.treasury, self.asset, fee),
            Transfer::new(depositor, self.accounts.vault, self.asset, net),
            Transfer::new(self.accounts.vault, self.accounts.pool, self.asset, swept),
        ])?;

        let total_shares = self.total_shares.checked_add(shares).ok_or(VaultError::Overflow)?;
        let held = self.shares_of(&depositor).checked_add(shares).ok_or(VaultError::Overflow)?;
        self.total_shares = total_shares;
        self.shares.insert(depositor, held);

        tracing::info!(
            asset = %self.asset,
            %depositor,
            assets,
            fee,
            shares,
            swept,
            "vault deposit"
        );

        Ok(DepositReceipt {
            assets,
            fee,
            net,
            shares,
            swept,
            ratio,
        })
    }

    /// Burn `shares` from `owner` and pay out the assets they represent.
    ///
    /// Not gated by coverage.
    ///
    /// # Errors
    ///
    /// - [`VaultError::ZeroShares`] if `shares` is zero or redeems for nothing
    /// - [`VaultError::InsufficientShares`] if `owner` holds fewer shares
    /// - [`VaultError::InsufficientLiquidity`] if vault and pool cannot pay
    pub fn redeem<L: AssetLedger + ?Sized>(
        &mut self,
        totals: AssetTotals,
        ledger: &mut L,
        owner: Identity,
        shares: Amount,
    ) -> Result<RedeemReceipt> {
        if shares == 0 {
            return Err(VaultError::ZeroShares);
        }
        let held = self.shares_of(&owner);
        if held < shares {
            return Err(VaultError::InsufficientShares {
                owner,
                held,
                requested: shares,
            });
        }

        let assets = self.convert_to_assets(shares, totals.get(self.asset))?;
        if assets == 0 {
            return Err(VaultError::ZeroShares);
        }

        let holdings = ledger.balance_of(&self.accounts.vault, self.asset);
        let from_pool = assets.saturating_sub(holdings);
        let pool_balance = ledger.balance_of(&self.accounts.pool, self.asset);
        if from_pool > pool_balance {
            return Err(VaultError::InsufficientLiquidity {
                asset: self.asset,
                available: holdings.saturating_add(pool_balance),
                required: assets,
            });
        }

        ledger.settle(&[
            Transfer::new(self.accounts.pool, self.accounts.vault, self.asset, from_pool),
            Transfer::new(self.accounts.vault, owner, self.asset, assets),
        ])?;

        self.total_shares -= shares;
        let remaining = held - shares;
        if remaining == 0 {
            self.shares.remove(&owner);
        } else {
            self.shares.insert(owner, remaining);
        }

        tracing::info!(asset = %self.asset, %owner, shares, assets, from_pool, "vault redeem");

        Ok(RedeemReceipt {
            shares,
            assets,
            from_pool,
        })
    }

    fn require_admin<R: IdentityRegistry + ?Sized>(
        &self,
        registry: &R,
        caller: &Identity,
    ) -> Result<()> {
        if !registry.has_role(caller, Role::Admin) {
            tracing::warn!(asset = %self.asset, %caller, "vault admin call rejected");
            return Err(VaultError::Unauthorized { caller: *caller });
        }
        Ok(())
    }

    /// Set the mint fee. Admin only.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Unauthorized`] if `caller` is not an admin
    /// - [`VaultError::InvalidRate`] if `rate` exceeds 1.0
    pub fn set_mint_fee_rate<R: IdentityRegistry + ?Sized>(
        &mut self,
        registry: &R,
        caller: &Identity,
        rate: Rate,
    ) -> Result<()> {
        self.require_admin(registry, caller)?;
        self.mint_fee_rate = check_rate(rate)?;
        tracing::info!(asset = %self.asset, rate, "mint fee updated");
        Ok(())
    }

    /// Set the liquidity reserve. Admin only.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Unauthorized`] if `caller` is not an admin
    /// - [`VaultError::InvalidRate`] if `rate` exceeds 1.0
    pub fn set_liquidity_reserve_rate<R: IdentityRegistry + ?Sized>(
        &mut self,
        registry: &R,
        caller: &Identity,
        rate: Rate,
    ) -> Result<()> {
        self.require_admin(registry, caller)?;
        self.liquidity_reserve_rate = check_rate(rate)?;
        tracing::info!(asset = %self.asset, rate, "liquidity reserve updated");
        Ok(())
    }

    /// Replace this vault's ratio bound. Admin only; a vault can only set
    /// the bound it owns.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Unauthorized`] if `caller` is not an admin
    /// - [`VaultError::BoundMismatch`] if `bound` belongs to the other vault
    pub fn set_ratio_bound<R: IdentityRegistry + ?Sized>(
        &mut self,
        registry: &R,
        caller: &Identity,
        bound: RatioBound,
    ) -> Result<()> {
        self.require_admin(registry, caller)?;
        if !bound.belongs_to(self.asset) {
            return Err(VaultError::BoundMismatch { asset: self.asset });
        }
        self.bound = bound;
        tracing::info!(asset = %self.asset, ?bound, "ratio bound updated");
        Ok(())
    }
}
