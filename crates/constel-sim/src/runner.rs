//! Serial replay of a script against one protocol instance.

use std::collections::BTreeMap;

use anyhow::{bail, Context};
use serde::Serialize;

use constel_auth::rewards::reward_claim_digest;
use constel_auth::whitelist::onboarding_digest;
use constel_oracle::attestation::{attestation_digest, SignedAttestation, YieldAttestation};
use constel_protocol::config::ProtocolConfig;
use constel_protocol::events::RecordedEvent;
use constel_protocol::host::{Protocol, Snapshot};
use constel_protocol::ProtocolError;
use constel_types::Identity;

use crate::actors::Actors;
use crate::script::{Action, Script, Step};

/// What a finished replay prints.
#[derive(Debug, Serialize)]
pub struct Report {
    pub accepted: usize,
    pub rejected: usize,
    pub actors: BTreeMap<String, Identity>,
    pub snapshot: Snapshot,
    pub events: Vec<RecordedEvent>,
}

pub struct Simulation {
    protocol: Protocol,
    actors: Actors,
    accepted: usize,
    rejected: usize,
    clock: u64,
}

impl Simulation {
    pub fn new(config: &ProtocolConfig, admin: &str) -> anyhow::Result<Self> {
        let mut actors = Actors::new();
        let accounts =
            constel_protocol::accounts::ProtocolAccounts::derive(&config.network.contract_label);
        let admin = actors.identity(&accounts, admin)?;
        let protocol = Protocol::new(config, admin).context("invalid protocol configuration")?;
        Ok(Self {
            protocol,
            actors,
            accepted: 0,
            rejected: 0,
            clock: 0,
        })
    }

    /// Replay every step of `script`.
    pub fn run(&mut self, script: &Script) -> anyhow::Result<()> {
        for (index, step) in script.steps.iter().enumerate() {
            self.step(step)
                .with_context(|| format!("step {index} ({})", step.action.name()))?;
        }
        Ok(())
    }

    /// Run one step and check its outcome against the expectation.
    pub fn step(&mut self, step: &Step) -> anyhow::Result<()> {
        self.clock = self.clock.max(step.now);
        match (self.execute(step.now, &step.action)?, step.expect_rejection) {
            (Ok(()), false) => {
                self.accepted += 1;
                tracing::debug!(action = step.action.name(), now = step.now, "step accepted");
            }
            (Err(err), true) => {
                self.rejected += 1;
                tracing::info!(
                    action = step.action.name(),
                    now = step.now,
                    error = %err,
                    "step rejected as expected"
                );
            }
            (Ok(()), true) => bail!("expected a rejection, but the step was accepted"),
            (Err(err), false) => return Err(err).context("step rejected"),
        }
        Ok(())
    }

    /// Apply `action`. The outer error is a malformed script; the inner one a
    /// protocol rejection.
    fn execute(&mut self, now: u64, action: &Action) -> anyhow::Result<Result<(), ProtocolError>> {
        let accounts = *self.protocol.accounts();
        let mut id = |name: &str| self.actors.identity(&accounts, name);

        let outcome = match action {
            Action::Fund {
                account,
                asset,
                amount,
            } => self.protocol.fund(id(account)?, *asset, *amount, now),
            Action::GrantRole {
                caller,
                role,
                identity,
            } => {
                let (caller, identity) = (id(caller)?, id(identity)?);
                self.protocol.grant_role(caller, *role, identity, now)
            }
            Action::RevokeRole {
                caller,
                role,
                identity,
            } => {
                let (caller, identity) = (id(caller)?, id(identity)?);
                self.protocol
                    .revoke_role(caller, *role, identity, now)
                    .map(|_| ())
            }
            Action::Deposit {
                depositor,
                asset,
                amount,
            } => self
                .protocol
                .deposit(id(depositor)?, *asset, *amount, now)
                .map(|_| ()),
            Action::Redeem {
                owner,
                asset,
                shares,
            } => self
                .protocol
                .redeem(id(owner)?, *asset, *shares, now)
                .map(|_| ()),
            Action::SetMintFeeRate {
                caller,
                asset,
                rate,
            } => self
                .protocol
                .set_mint_fee_rate(id(caller)?, *asset, *rate, now),
            Action::SetLiquidityReserveRate {
                caller,
                asset,
                rate,
            } => self
                .protocol
                .set_liquidity_reserve_rate(id(caller)?, *asset, *rate, now),
            Action::SetRatioBound {
                caller,
                asset,
                bound,
            } => self
                .protocol
                .set_ratio_bound(id(caller)?, *asset, *bound, now),
            Action::RewardReceived {
                caller,
                reward,
                treasury_rate,
                operator_rate,
            } => self
                .protocol
                .on_reward_received(id(caller)?, *reward, *treasury_rate, *operator_rate, now)
                .map(|_| ()),
            Action::CreateMinipool {
                caller,
                minipool,
                sub_operator,
            } => {
                let (caller, minipool, sub_operator) =
                    (id(caller)?, id(minipool)?, id(sub_operator)?);
                self.protocol
                    .create_minipool(caller, minipool, sub_operator, now)
                    .map(|_| ())
            }
            Action::DistributeExitedMinipool { caller, minipool } => {
                let (caller, minipool) = (id(caller)?, id(minipool)?);
                self.protocol
                    .distribute_exited_minipool(caller, minipool, now)
                    .map(|_| ())
            }
            Action::SetFeeSplit {
                caller,
                treasury_rate,
                operator_rate,
            } => self
                .protocol
                .set_fee_split(id(caller)?, *treasury_rate, *operator_rate, now)
                .map(|_| ()),
            Action::SetBondSize { caller, bond } => {
                self.protocol.set_bond_size(id(caller)?, *bond, now)
            }
            Action::TransferToVault {
                caller,
                asset,
                amount,
            } => self
                .protocol
                .transfer_to_vault(id(caller)?, *asset, *amount, now),
            Action::AttestYield {
                signer,
                new_yield,
                expected_oracle_error,
            } => {
                let attestation = YieldAttestation {
                    new_yield: *new_yield,
                    expected_oracle_error: expected_oracle_error
                        .unwrap_or_else(|| self.protocol.state().distributor.oracle_error()),
                    timestamp: now,
                };
                let digest = attestation_digest(&attestation, &self.protocol.signing_domain());
                let endorsement = self.actors.keypair(signer)?.endorse(&digest);
                self.protocol
                    .set_total_yield_accrued(
                        &SignedAttestation {
                            attestation,
                            endorsement,
                        },
                        now,
                    )
                    .map(|_| ())
            }
            Action::SweepLockedResidue { caller } => self
                .protocol
                .sweep_locked_residue(id(caller)?, now)
                .map(|_| ()),
            Action::FinalizeClaims {
                caller,
                base,
                collateral,
            } => self
                .protocol
                .finalize_claims(id(caller)?, *base, *collateral, now)
                .map(|_| ()),
            Action::SetStreamingInterval { caller, interval } => self
                .protocol
                .set_streaming_interval(id(caller)?, *interval, now),
            Action::ClaimReward {
                signer,
                rewardee,
                asset,
                amount,
            } => {
                let rewardee = id(rewardee)?;
                let auth = &self.protocol.state().auth;
                let digest = reward_claim_digest(
                    auth,
                    &rewardee,
                    *asset,
                    *amount,
                    auth.nonces().identity_nonce(&rewardee),
                    auth.nonces().epoch(),
                );
                let grant = self.actors.keypair(signer)?.endorse(&digest);
                self.protocol
                    .claim_reward(rewardee, *asset, *amount, &grant, now)
                    .map(|_| ())
            }
            Action::AddOperator { signer, operator } => {
                let operator = id(operator)?;
                let auth = &self.protocol.state().auth;
                let digest = onboarding_digest(
                    auth,
                    &operator,
                    auth.nonces().identity_nonce(&operator),
                    auth.nonces().epoch(),
                );
                let grant = self.actors.keypair(signer)?.endorse(&digest);
                self.protocol.add_operator(operator, &grant, now)
            }
            Action::RemoveOperator { caller, operator } => {
                let (caller, operator) = (id(caller)?, id(operator)?);
                self.protocol.remove_operator(caller, operator, now)
            }
            Action::BumpIdentityNonce { caller, identity } => {
                let (caller, identity) = (id(caller)?, id(identity)?);
                self.protocol
                    .bump_identity_nonce(caller, identity, now)
                    .map(|_| ())
            }
            Action::BumpGlobalEpoch { caller } => self
                .protocol
                .bump_global_epoch(id(caller)?, now)
                .map(|_| ()),
            Action::SetPrice { price } => {
                self.protocol.feed_mut().dev_set_price(*price);
                Ok(())
            }
        };
        Ok(outcome)
    }

    /// Final report at the latest step time.
    pub fn report(&self) -> anyhow::Result<Report> {
        Ok(Report {
            accepted: self.accepted,
            rejected: self.rejected,
            actors: self.actors.directory(),
            snapshot: self.protocol.snapshot(self.clock)?,
            events: self.protocol.events().events().to_vec(),
        })
    }
}
