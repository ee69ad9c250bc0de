//! Signed reward claims.
//!
//! Operator rewards accumulate in a protocol-owned rewards account. A
//! rewardee withdraws by presenting a grant from the admin server that binds
//! `(rewardee, asset, amount)` to the rewardee's identity nonce.

use constel_crypto::blake3::contexts;
use constel_crypto::ed25519::Endorsement;
use constel_types::ledger::{AssetLedger, Transfer};
use constel_types::roles::IdentityRegistry;
use constel_types::{Amount, Asset, Identity};

use crate::grant::{grant_digest, SignedClaimAuthorization};
use crate::{AuthError, Result};

/// Subject fields bound into a reward-claim grant.
pub fn claim_fields(
    rewardee: &Identity,
    asset: Asset,
    amount: Amount,
) -> ([u8; 32], [u8; 1], [u8; 16]) {
    (*rewardee.as_bytes(), [asset.tag()], amount.to_le_bytes())
}

/// Digest the admin server signs to authorize a reward claim.
pub fn reward_claim_digest(
    auth: &SignedClaimAuthorization,
    rewardee: &Identity,
    asset: Asset,
    amount: Amount,
    identity_nonce: u64,
    epoch: u64,
) -> [u8; 32] {
    let (who, tag, value) = claim_fields(rewardee, asset, amount);
    grant_digest(
        contexts::REWARD_CLAIM,
        &[&who, &tag, &value],
        identity_nonce,
        epoch,
        auth.domain(),
    )
}

/// Pays out signed reward claims from the rewards account.
#[derive(Clone, Debug)]
pub struct RewardClaims {
    rewards_account: Identity,
}

impl RewardClaims {
    pub fn new(rewards_account: Identity) -> Self {
        Self { rewards_account }
    }

    pub fn rewards_account(&self) -> Identity {
        self.rewards_account
    }

    /// Redeem a reward-claim grant.
    ///
    /// The payout and the nonce advance happen together or not at all.
    ///
    /// # Errors
    ///
    /// - [`AuthError::ZeroAmount`] if `amount` is zero
    /// - [`AuthError::InvalidSignature`] if the grant does not verify
    /// - [`AuthError::Ledger`] if the rewards account cannot pay
    #[allow(clippy::too_many_arguments)]
    pub fn claim<R, L>(
        &self,
        auth: &mut SignedClaimAuthorization,
        registry: &R,
        ledger: &mut L,
        rewardee: Identity,
        asset: Asset,
        amount: Amount,
        grant: &Endorsement,
    ) -> Result<Amount>
    where
        R: IdentityRegistry + ?Sized,
        L: AssetLedger + ?Sized,
    {
        if amount == 0 {
            return Err(AuthError::ZeroAmount);
        }

        let (who, tag, value) = claim_fields(&rewardee, asset, amount);
        let authorization = auth.authorize(
            registry,
            contexts::REWARD_CLAIM,
            &rewardee,
            &[&who, &tag, &value],
            grant,
        )?;

        ledger.settle(&[Transfer::new(self.rewards_account, rewardee, asset, amount)])?;
        let nonce = auth.commit(authorization)?;

        tracing::info!(%rewardee, %asset, amount, nonce, "reward claimed");
        Ok(amount)
    }
}
