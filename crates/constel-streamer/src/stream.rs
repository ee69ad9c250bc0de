//! Claim stream.
//!
//! ```text
//! elapsed  = now - last_claim_time
//! streamed = prior * elapsed / interval     if elapsed < interval
//!          = prior                          otherwise
//! ```
//!
//! Integer division, no rounding correction. `streamed` never exceeds the
//! locked amount and never decreases as time moves forward.

use serde::{Deserialize, Serialize};

use constel_types::ledger::{AssetLedger, Transfer};
use constel_types::math::mul_div;
use constel_types::roles::IdentityRegistry;
use constel_types::{Amount, Asset, Identity, Role};

use crate::{Result, StreamError};

/// Default streaming interval: one day.
pub const DEFAULT_STREAMING_INTERVAL: u64 = 24 * 3600;

/// Ledger accounts the streamer moves funds between.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamerAccounts {
    /// Where finalized claims are locked.
    pub streamer: Identity,
    /// Distribution pool receiving swept residue.
    pub pool: Identity,
}

/// Persisted stream state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamState {
    pub prior_base: Amount,
    pub prior_collateral: Amount,
    pub last_claim_time: u64,
    pub streaming_interval: u64,
    /// Set once the first batch is finalized.
    #[serde(default)]
    pub started: bool,
}

impl StreamState {
    pub fn prior(&self, asset: Asset) -> Amount {
        match asset {
            Asset::Base => self.prior_base,
            Asset::Collateral => self.prior_collateral,
        }
    }

    fn prior_mut(&mut self, asset: Asset) -> &mut Amount {
        match asset {
            Asset::Base => &mut self.prior_base,
            Asset::Collateral => &mut self.prior_collateral,
        }
    }
}

/// Result of a residue sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sweep {
    pub base: Amount,
    pub collateral: Amount,
}

impl Sweep {
    pub fn is_empty(&self) -> bool {
        self.base == 0 && self.collateral == 0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimStreamer {
    accounts: StreamerAccounts,
    state: StreamState,
}

impl ClaimStreamer {
    /// # Errors
    ///
    /// - [`StreamError::ZeroInterval`] if `streaming_interval` is zero
    pub fn new(accounts: StreamerAccounts, streaming_interval: u64) -> Result<Self> {
        if streaming_interval == 0 {
            return Err(StreamError::ZeroInterval);
        }
        Ok(Self {
            accounts,
            state: StreamState {
                prior_base: 0,
                prior_collateral: 0,
                last_claim_time: 0,
                streaming_interval,
                started: false,
            },
        })
    }

    pub fn accounts(&self) -> &StreamerAccounts {
        &self.accounts
    }

    pub fn state(&self) -> &StreamState {
        &self.state
    }

    fn elapsed(&self, now: u64) -> Result<u64> {
        now.checked_sub(self.state.last_claim_time)
            .ok_or(StreamError::ClockRegression {
                now,
                last_claim_time: self.state.last_claim_time,
            })
    }

    fn require_interval_finished(&self, now: u64) -> Result<()> {
        let elapsed = self.elapsed(now)?;
        if elapsed < self.state.streaming_interval {
            return Err(StreamError::IntervalNotFinished {
                elapsed,
                interval: self.state.streaming_interval,
            });
        }
        Ok(())
    }

    /// Vested part of the locked `asset` amount at `now`.
    ///
    /// # Errors
    ///
    /// - [`StreamError::ClockRegression`] if `now` precedes the last claim
    pub fn streamed_amount(&self, asset: Asset, now: u64) -> Result<Amount> {
        let elapsed = self.elapsed(now)?;
        let prior = self.state.prior(asset);
        if elapsed >= self.state.streaming_interval {
            return Ok(prior);
        }
        mul_div(
            prior,
            u128::from(elapsed),
            u128::from(self.state.streaming_interval),
        )
        .ok_or(StreamError::Overflow)
    }

    /// Move every nonzero locked amount to the pool once the interval is
    /// over. Protocol role only. Does not touch `last_claim_time`.
    ///
    /// # Errors
    ///
    /// - [`StreamError::Unauthorized`] unless `caller` holds the protocol role
    /// - [`StreamError::IntervalNotFinished`] if the interval is still running
    /// - [`StreamError::Ledger`] if a transfer fails
    pub fn sweep_locked_residue<R, L>(
        &mut self,
        registry: &R,
        ledger: &mut L,
        caller: &Identity,
        now: u64,
    ) -> Result<Sweep>
    where
        R: IdentityRegistry + ?Sized,
        L: AssetLedger + ?Sized,
    {
        if !registry.has_role(caller, Role::Protocol) {
            tracing::warn!(%caller, "residue sweep rejected");
            return Err(StreamError::Unauthorized { caller: *caller });
        }
        self.require_interval_finished(now)?;
        self.sweep(ledger)
    }

    fn sweep<L: AssetLedger + ?Sized>(&mut self, ledger: &mut L) -> Result<Sweep> {
        let swept = Sweep {
            base: self.state.prior_base,
            collateral: self.state.prior_collateral,
        };
        if swept.is_empty() {
            return Ok(swept);
        }

        let transfers: Vec<Transfer> = Asset::ALL
            .into_iter()
            .filter(|asset| self.state.prior(*asset) > 0)
            .map(|asset| {
                Transfer::new(
                    self.accounts.streamer,
                    self.accounts.pool,
                    asset,
                    self.state.prior(asset),
                )
            })
            .collect();
        ledger.settle(&transfers)?;

        for asset in Asset::ALL {
            *self.state.prior_mut(asset) = 0;
        }
        tracing::info!(base = swept.base, collateral = swept.collateral, "locked residue swept");
        Ok(swept)
    }

    /// Lock a new batch of finalized claims, starting a new interval at
    /// `now`. Protocol role only.
    ///
    /// Any residue from the previous batch is swept first. The batch must
    /// already sit in the streamer account. The first batch is accepted at
    /// any time.
    ///
    /// # Errors
    ///
    /// - [`StreamError::Unauthorized`] unless `caller` holds the protocol role
    /// - [`StreamError::IntervalNotFinished`] if the previous interval is still running
    /// - [`StreamError::UnfundedClaims`] if the streamer account is short
    pub fn finalize_claims<R, L>(
        &mut self,
        registry: &R,
        ledger: &mut L,
        caller: &Identity,
        base_amount: Amount,
        collateral_amount: Amount,
        now: u64,
    ) -> Result<Sweep>
    where
        R: IdentityRegistry + ?Sized,
        L: AssetLedger + ?Sized,
    {
        if !registry.has_role(caller, Role::Protocol) {
            tracing::warn!(%caller, "claim finalization rejected");
            return Err(StreamError::Unauthorized { caller: *caller });
        }
        if self.state.started {
            self.require_interval_finished(now)?;
        }

        let batch = [
            (Asset::Base, base_amount),
            (Asset::Collateral, collateral_amount),
        ];
        for (asset, amount) in batch {
            let available = ledger
                .balance_of(&self.accounts.streamer, asset)
                .saturating_sub(self.state.prior(asset));
            if available < amount {
                return Err(StreamError::UnfundedClaims {
                    asset,
                    available,
                    required: amount,
                });
            }
        }

        let swept = self.sweep(ledger)?;
        self.state.prior_base = base_amount;
        self.state.prior_collateral = collateral_amount;
        self.state.last_claim_time = now;
        self.state.started = true;

        tracing::info!(base_amount, collateral_amount, now, "claims finalized");
        Ok(swept)
    }

    /// Change the streaming interval. Admin only.
    ///
    /// # Errors
    ///
    /// - [`StreamError::Unauthorized`] unless `caller` is admin
    /// - [`StreamError::ZeroInterval`] if `interval` is zero
    pub fn set_streaming_interval<R: IdentityRegistry + ?Sized>(
        &mut self,
        registry: &R,
        caller: &Identity,
        interval: u64,
    ) -> Result<()> {
        if !registry.has_role(caller, Role::Admin) {
            return Err(StreamError::Unauthorized { caller: *caller });
        }
        if interval == 0 {
            return Err(StreamError::ZeroInterval);
        }
        self.state.streaming_interval = interval;
        tracing::info!(interval, "streaming interval updated");
        Ok(())
    }
}
