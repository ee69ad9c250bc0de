//! Asset ledger collaborator.
//!
//! Native and fungible-token transfers are modelled as one primitive:
//! [`AssetLedger::settle`] applies a batch of transfers all-or-nothing. A
//! payout that cannot be delivered aborts the whole batch, which is what lets
//! the split engine promise "no partial success".

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{Amount, Asset, Identity, LedgerError};

/// A single movement of funds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: Identity,
    pub to: Identity,
    pub asset: Asset,
    pub amount: Amount,
}

impl Transfer {
    pub fn new(from: Identity, to: Identity, asset: Asset, amount: Amount) -> Self {
        Self {
            from,
            to,
            asset,
            amount,
        }
    }
}

/// Balance lookup and atomic transfer batches.
pub trait AssetLedger {
    /// Current balance of `account` in `asset`.
    fn balance_of(&self, account: &Identity, asset: Asset) -> Amount;

    /// Apply every transfer in order, or none of them.
    ///
    /// Zero-amount transfers are skipped, even towards rejecting accounts.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InsufficientBalance`] if a sender cannot cover a transfer
    /// - [`LedgerError::TransferRejected`] if a recipient refuses funds
    /// - [`LedgerError::Overflow`] if a recipient balance would overflow
    fn settle(&mut self, transfers: &[Transfer]) -> Result<(), LedgerError>;
}

/// Per-account holdings of both assets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holdings {
    pub base: Amount,
    pub collateral: Amount,
}

impl Holdings {
    pub fn get(&self, asset: Asset) -> Amount {
        match asset {
            Asset::Base => self.base,
            Asset::Collateral => self.collateral,
        }
    }

    fn slot(&mut self, asset: Asset) -> &mut Amount {
        match asset {
            Asset::Base => &mut self.base,
            Asset::Collateral => &mut self.collateral,
        }
    }
}

/// In-memory asset ledger.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Bank {
    accounts: BTreeMap<Identity, Holdings>,
    /// Accounts that refuse incoming transfers (e.g. a recipient without a
    /// receive hook).
    rejecting: BTreeSet<Identity>,
}

impl Bank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` from outside the system (wallet funding, beacon-chain
    /// proceeds landing on a minipool).
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Overflow`] if the balance would overflow
    pub fn mint(
        &mut self,
        account: Identity,
        asset: Asset,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let slot = self.accounts.entry(account).or_default().slot(asset);
        *slot = slot.checked_add(amount).ok_or(LedgerError::Overflow)?;
        Ok(())
    }

    /// Mark `account` as refusing (or accepting again) incoming transfers.
    pub fn set_rejecting(&mut self, account: Identity, rejecting: bool) {
        if rejecting {
            self.rejecting.insert(account);
        } else {
            self.rejecting.remove(&account);
        }
    }

    /// Holdings of `account` (zero if unknown).
    pub fn holdings(&self, account: &Identity) -> Holdings {
        self.accounts.get(account).copied().unwrap_or_default()
    }
}

impl AssetLedger for Bank {
    fn balance_of(&self, account: &Identity, asset: Asset) -> Amount {
        self.holdings(account).get(asset)
    }

    fn settle(&mut self, transfers: &[Transfer]) -> Result<(), LedgerError> {
        let mut scratch = self.accounts.clone();
        let mut applied = Vec::with_capacity(transfers.len());

        for transfer in transfers.iter().filter(|t| t.amount > 0) {
            if self.rejecting.contains(&transfer.to) {
                return Err(LedgerError::TransferRejected {
                    account: transfer.to,
                });
            }

            let sender = scratch.entry(transfer.from).or_default().slot(transfer.asset);
            let available = *sender;
            *sender = available
                .checked_sub(transfer.amount)
                .ok_or(LedgerError::InsufficientBalance {
                    account: transfer.from,
                    asset: transfer.asset,
                    available,
                    required: transfer.amount,
                })?;

            let recipient = scratch.entry(transfer.to).or_default().slot(transfer.asset);
            *recipient = recipient
                .checked_add(transfer.amount)
                .ok_or(LedgerError::Overflow)?;

            applied.push(transfer);
        }

        for transfer in &applied {
            tracing::trace!(
                from = %transfer.from,
                to = %transfer.to,
                asset = %transfer.asset,
                amount = transfer.amount,
                "ledger transfer"
            );
        }

        self.accounts = scratch;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(byte: u8) -> Identity {
        Identity([byte; 32])
    }

    #[test]
    fn test_settle_moves_funds() {
        let mut bank = Bank::new();
        bank.mint(id(1), Asset::Base, 100).expect("mint");

        bank.settle(&[Transfer::new(id(1), id(2), Asset::Base, 40)])
            .expect("settle");

        assert_eq!(bank.balance_of(&id(1), Asset::Base), 60);
        assert_eq!(bank.balance_of(&id(2), Asset::Base), 40);
        assert_eq!(bank.balance_of(&id(2), Asset::Collateral), 0);
    }

    #[test]
    fn test_settle_is_all_or_nothing() {
        let mut bank = Bank::new();
        bank.mint(id(1), Asset::Base, 100).expect("mint");

        let err = bank
            .settle(&[
                Transfer::new(id(1), id(2), Asset::Base, 60),
                Transfer::new(id(1), id(3), Asset::Base, 60),
            ])
            .expect_err("second leg overdraws");
        assert!(matches!(
            err,
            LedgerError::InsufficientBalance { available: 40, required: 60, .. }
        ));

        assert_eq!(bank.balance_of(&id(1), Asset::Base), 100);
        assert_eq!(bank.balance_of(&id(2), Asset::Base), 0);
        assert_eq!(bank.balance_of(&id(3), Asset::Base), 0);
    }

    #[test]
    fn test_rejecting_recipient_aborts_batch() {
        let mut bank = Bank::new();
        bank.mint(id(1), Asset::Base, 100).expect("mint");
        bank.set_rejecting(id(3), true);

        let err = bank
            .settle(&[
                Transfer::new(id(1), id(2), Asset::Base, 10),
                Transfer::new(id(1), id(3), Asset::Base, 10),
            ])
            .expect_err("recipient refuses");
        assert!(matches!(err, LedgerError::TransferRejected { .. }));
        assert_eq!(bank.balance_of(&id(2), Asset::Base), 0);

        bank.set_rejecting(id(3), false);
        bank.settle(&[Transfer::new(id(1), id(3), Asset::Base, 10)])
            .expect("accepts again");
    }

    #[test]
    fn test_zero_transfers_are_skipped() {
        let mut bank = Bank::new();
        bank.set_rejecting(id(2), true);
        bank.settle(&[Transfer::new(id(1), id(2), Asset::Collateral, 0)])
            .expect("no-op");
        assert_eq!(bank.holdings(&id(1)), Holdings::default());
        assert_eq!(bank.holdings(&id(2)), Holdings::default());
    }
}
