// Holder Raffle Engine - State
use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Transaction signature recorded for entrants taken from an eligibility snapshot
pub const SNAPSHOT_SIGNATURE: &str = "snapshot";

/// Status of a round
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    /// Waiting for an operator to begin the round
    Idle,
    /// Participants loaded, reveal animation running
    Starting,
    /// Open for entries
    Active,
    /// Suspense window before the draw
    SelectingWinner,
    /// Winner drawn, about to be replaced by a fresh round
    Completed,
}

impl RoundStatus {
    /// The only status this one may advance to.
    pub fn next(self) -> RoundStatus {
        match self {
            RoundStatus::Idle => RoundStatus::Starting,
            RoundStatus::Starting => RoundStatus::Active,
            RoundStatus::Active => RoundStatus::SelectingWinner,
            RoundStatus::SelectingWinner => RoundStatus::Completed,
            RoundStatus::Completed => RoundStatus::Idle,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RoundStatus::Idle => "idle",
            RoundStatus::Starting => "starting",
            RoundStatus::Active => "active",
            RoundStatus::SelectingWinner => "selecting_winner",
            RoundStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded entry in a round
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entrant {
    /// Base58 wallet address of the entrant
    pub wallet_address: String,
    /// Selection weight, at least 1
    pub ticket_count: u64,
    /// Payment transaction, or `SNAPSHOT_SIGNATURE` for snapshot entrants
    pub transaction_signature: String,
    /// Entry time (unix millis)
    pub timestamp: i64,
}

impl Entrant {
    pub fn is_from_snapshot(&self) -> bool {
        self.transaction_signature == SNAPSHOT_SIGNATURE
    }
}

/// The drawn winner, as stored on the round and returned to callers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerSummary {
    pub wallet_address: String,
    pub ticket_count: u64,
    /// Prize pool at draw time, in lamports
    pub prize_amount: u64,
}

/// The current round record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    /// Unique identifier for this round
    pub id: String,
    /// Sequential number for this round (1, 2, 3, etc.)
    pub index: u64,
    /// Lifecycle status
    pub status: RoundStatus,
    /// Display title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Display description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Creation time (unix millis)
    pub created_at: i64,
    /// Set when the round becomes active
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    /// Set when the winner is drawn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    /// Entrants in arrival order
    #[serde(default)]
    pub participants: Vec<Entrant>,
    /// Sum of all participants' tickets
    pub total_tickets: u64,
    /// Operator-seeded starting value of the prize pool, in lamports
    #[serde(default)]
    pub prize_pool_seed: u64,
    /// Prize pool in lamports
    pub prize_pool: u64,
    /// Reference to the stored eligibility snapshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_reference: Option<String>,
    /// Drawn winner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<WinnerSummary>,
}

impl Round {
    /// Create a new idle round
    pub fn new(index: u64, created_at: i64) -> Self {
        Self {
            id: format!("round_{}_{}", created_at, index),
            index,
            status: RoundStatus::Idle,
            title: None,
            description: None,
            created_at,
            start_time: None,
            end_time: None,
            participants: Vec::new(),
            total_tickets: 0,
            prize_pool_seed: 0,
            prize_pool: 0,
            snapshot_reference: None,
            winner: None,
        }
    }

    /// Ticket total recomputed from the participant list
    pub fn recomputed_tickets(&self) -> u64 {
        self.participants.iter().map(|p| p.ticket_count).sum()
    }

    /// Prize pool recomputed from the seed and the paid (non-snapshot) entries
    pub fn recomputed_prize_pool(&self, unit_price: u64) -> u64 {
        let paid: u64 = self
            .participants
            .iter()
            .filter(|p| !p.is_from_snapshot())
            .map(|p| p.ticket_count)
            .sum();
        self.prize_pool_seed + paid * unit_price
    }

    /// True when the incrementally maintained totals agree with the ledger
    pub fn is_consistent(&self, unit_price: u64) -> bool {
        self.total_tickets == self.recomputed_tickets()
            && self.prize_pool == self.recomputed_prize_pool(unit_price)
    }
}

/// Archived outcome of a concluded round
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerRecord {
    pub round_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub wallet_address: String,
    pub ticket_count: u64,
    /// Prize in lamports
    pub prize_amount: u64,
    /// Draw time (unix millis)
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_reference: Option<String>,
}

impl WinnerSummary {
    pub fn for_entrant(entrant: &Entrant, prize_amount: u64) -> Self {
        Self {
            wallet_address: entrant.wallet_address.clone(),
            ticket_count: entrant.ticket_count,
            prize_amount,
        }
    }
}

impl WinnerRecord {
    pub fn new(round: &Round, winner: &WinnerSummary, timestamp: i64) -> Self {
        Self {
            round_id: round.id.clone(),
            title: round.title.clone(),
            description: round.description.clone(),
            wallet_address: winner.wallet_address.clone(),
            ticket_count: winner.ticket_count,
            prize_amount: winner.prize_amount,
            timestamp,
            snapshot_reference: round.snapshot_reference.clone(),
        }
    }

    pub fn summary(&self) -> WinnerSummary {
        WinnerSummary {
            wallet_address: self.wallet_address.clone(),
            ticket_count: self.ticket_count,
            prize_amount: self.prize_amount,
        }
    }
}

/// A balance reported by the holder lookup
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenHolder {
    pub wallet_address: String,
    /// Balance in UI units (decimals applied)
    pub token_amount: f64,
}

/// A holder that qualified for the round, with derived tickets
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibleHolder {
    pub wallet_address: String,
    pub token_amount: f64,
    pub ticket_count: u64,
}

impl EligibleHolder {
    pub fn into_entrant(self, timestamp: i64) -> Entrant {
        Entrant {
            wallet_address: self.wallet_address,
            ticket_count: self.ticket_count,
            transaction_signature: SNAPSHOT_SIGNATURE.to_string(),
            timestamp,
        }
    }
}

/// Point-in-time capture of the eligible holders of a round
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub participants: Vec<EligibleHolder>,
    /// Capture time (unix millis)
    pub timestamp: i64,
    pub total_tickets: u64,
}
