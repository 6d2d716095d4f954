// Holder Raffle Engine - Errors
use solana_program::msg;
use thiserror::Error;

use crate::state::RoundStatus;

/// Broad classes of failure, so a caller can decide whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input, rejected before any mutation
    Validation,
    /// Round missing or in the wrong status, rejected before any mutation
    State,
    /// Snapshot or record absent
    NotFound,
    /// Holder lookup or store failure
    Upstream,
}

/// Errors that may be returned by the raffle engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GameError {
    #[error("Invalid instruction data")]
    InvalidInstruction,

    #[error("Invalid wallet address format: {0}")]
    InvalidAddress(String),

    #[error("Invalid ticket count: {0}")]
    InvalidTicketCount(u64),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Ticket total overflow")]
    TicketOverflow,

    #[error("No game found")]
    NoRoundRecord,

    #[error("No active game")]
    RoundNotActive,

    #[error("Invalid round transition from {from} to {to}")]
    InvalidTransition { from: RoundStatus, to: RoundStatus },

    #[error("Round {0} is no longer current")]
    RoundReplaced(String),

    #[error("No participants")]
    NoParticipants,

    #[error("No weighted participants (all have 0 tickets)")]
    NoWeightedParticipants,

    #[error("Ticket index {index} outside [0, {total})")]
    TicketIndexOutOfRange { index: u64, total: u64 },

    #[error("No eligible holders found")]
    NoHoldersFound,

    #[error("No eligible holders after excluding liquidity pool")]
    NoEligibleHolders,

    #[error("Too many requests. Please try again later.")]
    RateLimited,

    #[error("Another round sequence is already running")]
    SequenceInProgress,

    #[error("Winner selection was cancelled")]
    Cancelled,

    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(String),

    #[error("Concurrent update conflict on {0}")]
    Conflict(String),

    #[error("Holder lookup failed: {0}")]
    Upstream(String),

    #[error("Store failure: {0}")]
    Store(String),

    #[error("Serialization failure: {0}")]
    Serialization(String),

    #[error("Invalid configuration for {key}: {value}")]
    InvalidConfig { key: &'static str, value: String },
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::InvalidInstruction
            | GameError::InvalidAddress(_)
            | GameError::InvalidTicketCount(_)
            | GameError::MissingField(_)
            | GameError::TicketOverflow
            | GameError::TicketIndexOutOfRange { .. }
            | GameError::InvalidConfig { .. } => ErrorKind::Validation,
            GameError::NoRoundRecord
            | GameError::RoundNotActive
            | GameError::InvalidTransition { .. }
            | GameError::RoundReplaced(_)
            | GameError::NoParticipants
            | GameError::NoWeightedParticipants
            | GameError::NoHoldersFound
            | GameError::NoEligibleHolders
            | GameError::RateLimited
            | GameError::SequenceInProgress
            | GameError::Cancelled => ErrorKind::State,
            GameError::SnapshotNotFound(_) => ErrorKind::NotFound,
            GameError::Conflict(_)
            | GameError::Upstream(_)
            | GameError::Store(_)
            | GameError::Serialization(_) => ErrorKind::Upstream,
        }
    }

    /// Infrastructure failures may succeed on a later attempt; validation and
    /// state failures will not until the input or the round changes.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GameError::Conflict(_) | GameError::Upstream(_) | GameError::Store(_)
        )
    }

    pub fn log(&self) {
        msg!("Raffle error ({:?}): {}", self.kind(), self);
    }
}

impl From<serde_json::Error> for GameError {
    fn from(e: serde_json::Error) -> Self {
        GameError::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for GameError {
    fn from(e: std::io::Error) -> Self {
        GameError::Serialization(e.to_string())
    }
}
