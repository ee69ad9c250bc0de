//! Protocol event log.
//!
//! Every committed transaction appends one event. Rejected transactions
//! leave no trace here. Sequence numbers start at 1 and never repeat.

use serde::{Deserialize, Serialize};

use constel_distributor::engine::ExitReport;
use constel_distributor::minipool::MinipoolRecord;
use constel_distributor::splits::{FeeSplit, Split};
use constel_oracle::attestation::Settlement;
use constel_streamer::stream::Sweep;
use constel_types::{Amount, Asset, Identity, Rate, Role};
use constel_vault::coverage::RatioBound;
use constel_vault::vault::{DepositReceipt, RedeemReceipt};

/// A committed state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolEvent {
    Funded {
        account: Identity,
        asset: Asset,
        amount: Amount,
    },
    RoleGranted {
        role: Role,
        identity: Identity,
    },
    RoleRevoked {
        role: Role,
        identity: Identity,
    },
    Deposited {
        asset: Asset,
        depositor: Identity,
        receipt: DepositReceipt,
    },
    Redeemed {
        asset: Asset,
        owner: Identity,
        receipt: RedeemReceipt,
    },
    RewardDistributed {
        reward: Amount,
        split: Split,
    },
    MinipoolCreated {
        record: MinipoolRecord,
    },
    MinipoolExited {
        report: ExitReport,
    },
    YieldAttested {
        timestamp: u64,
        settlement: Settlement,
    },
    ResidueSwept {
        sweep: Sweep,
    },
    ClaimsFinalized {
        base: Amount,
        collateral: Amount,
        swept: Sweep,
    },
    RewardClaimed {
        rewardee: Identity,
        asset: Asset,
        amount: Amount,
    },
    OperatorAdded {
        operator: Identity,
    },
    OperatorRemoved {
        operator: Identity,
    },
    IdentityNonceBumped {
        identity: Identity,
        nonce: u64,
    },
    GlobalEpochBumped {
        epoch: u64,
    },
    FeeSplitChanged {
        fee_split: FeeSplit,
    },
    BondSizeChanged {
        bond: Amount,
    },
    MintFeeChanged {
        asset: Asset,
        rate: Rate,
    },
    LiquidityReserveChanged {
        asset: Asset,
        rate: Rate,
    },
    RatioBoundChanged {
        asset: Asset,
        bound: RatioBound,
    },
    StreamingIntervalChanged {
        interval: u64,
    },
    LiquidityReturned {
        asset: Asset,
        amount: Amount,
    },
}

/// An event with its position and ledger time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub sequence: u64,
    pub timestamp: u64,
    pub event: ProtocolEvent,
}

/// Append-only log of committed events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<RecordedEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event and return its sequence number.
    pub fn record(&mut self, timestamp: u64, event: ProtocolEvent) -> u64 {
        let sequence = self.sequence() + 1;
        tracing::debug!(sequence, ?event, "event recorded");
        self.events.push(RecordedEvent {
            sequence,
            timestamp,
            event,
        });
        sequence
    }

    /// Sequence number of the latest event (0 if empty).
    pub fn sequence(&self) -> u64 {
        self.events.last().map(|e| e.sequence).unwrap_or(0)
    }

    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    /// Events recorded after `sequence`.
    pub fn since(&self, sequence: u64) -> &[RecordedEvent] {
        let start = self.events.partition_point(|e| e.sequence <= sequence);
        &self.events[start..]
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
