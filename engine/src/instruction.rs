// Holder Raffle Engine - Instructions
use borsh::{BorshDeserialize, BorshSerialize};

use crate::{error::GameError, state::EligibleHolder};

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub enum GameInstruction {
    /// Fetch the current round, creating an idle one if none exists
    GetCurrentRound,

    /// Fetch the winner recorded on the current round, if any
    CurrentWinner,

    /// Open the current idle round to the eligible token holders
    StartRound {
        title: Option<String>,
        description: Option<String>,
        /// Starting prize pool in lamports
        prize_pool_seed: u64,
    },

    /// Enter the active round
    AddEntrant {
        /// Rate limit key of the caller (e.g. the forwarded client address)
        source: String,
        wallet_address: String,
        ticket_count: u64,
        transaction_signature: String,
    },

    /// Draw the winner of the active round and roll over to a new one
    RunSelection,

    /// Most recent winners, newest first
    ListWinners { limit: u32 },

    /// Most recently concluded rounds, newest first
    ListRounds { limit: u32 },

    /// Remove all winner history
    ClearWinners,

    /// Fetch a stored eligibility snapshot
    GetSnapshot { snapshot_id: String },

    /// Store an eligibility snapshot
    SaveSnapshot { participants: Vec<EligibleHolder> },

    /// Repair a round interrupted mid-sequence
    Recover,
}

impl GameInstruction {
    /// Unpacks a byte buffer into a GameInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, GameError> {
        Self::try_from_slice(input).map_err(|_| GameError::InvalidInstruction)
    }

    pub fn pack(&self) -> Result<Vec<u8>, GameError> {
        Ok(self.try_to_vec()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpack_rejects_garbage() {
        assert_eq!(GameInstruction::unpack(&[]), Err(GameError::InvalidInstruction));
        assert_eq!(GameInstruction::unpack(&[250]), Err(GameError::InvalidInstruction));
        // Trailing bytes are not accepted
        let mut data = GameInstruction::RunSelection.pack().unwrap();
        data.push(0);
        assert_eq!(GameInstruction::unpack(&data), Err(GameError::InvalidInstruction));
    }

    #[test]
    fn test_start_round_layout() {
        let data = GameInstruction::StartRound {
            title: None,
            description: None,
            prize_pool_seed: 5,
        }
        .pack()
        .unwrap();
        // variant tag, two absent options, little-endian seed
        assert_eq!(data, vec![2, 0, 0, 5, 0, 0, 0, 0, 0, 0, 0]);
    }
}
