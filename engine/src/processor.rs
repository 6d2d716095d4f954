// Holder Raffle Engine - Instruction Processor
use serde::{Deserialize, Serialize};
use solana_program::msg;

use crate::{
    error::GameError,
    instruction::GameInstruction,
    ledger::EntryRequest,
    orchestrator::{Orchestrator, RecoveryReport, RoundStarted, StartRequest},
    state::{Entrant, Round, Snapshot, WinnerRecord, WinnerSummary},
};

/// Result of a processed instruction, serialized as JSON for the caller
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameResponse {
    Game { game: Round },
    CurrentWinner { winner: Option<WinnerSummary> },
    Started(RoundStarted),
    Entered { entrant: Entrant },
    Selected { winner: WinnerSummary },
    Winners { winners: Vec<WinnerRecord> },
    Rounds { rounds: Vec<Round> },
    Cleared,
    Snapshot(Snapshot),
    SnapshotSaved { snapshot_id: String },
    Recovered(RecoveryReport),
}

/// Instruction dispatcher.
pub struct Processor;

impl Processor {
    pub async fn process(
        orchestrator: &Orchestrator,
        instruction_data: &[u8],
    ) -> Result<GameResponse, GameError> {
        let instruction = GameInstruction::unpack(instruction_data)?;

        match instruction {
            GameInstruction::GetCurrentRound => {
                msg!("Instruction: Get Current Round");
                let game = orchestrator.get_current_round()?;
                Ok(GameResponse::Game { game })
            }
            GameInstruction::CurrentWinner => {
                msg!("Instruction: Current Winner");
                let winner = orchestrator.current_winner()?;
                Ok(GameResponse::CurrentWinner { winner })
            }
            GameInstruction::StartRound {
                title,
                description,
                prize_pool_seed,
            } => {
                msg!("Instruction: Start Round");
                let started = orchestrator
                    .start_round(StartRequest {
                        title,
                        description,
                        prize_pool_seed,
                    })
                    .await?;
                Ok(GameResponse::Started(started))
            }
            GameInstruction::AddEntrant {
                source,
                wallet_address,
                ticket_count,
                transaction_signature,
            } => {
                msg!("Instruction: Add Entrant");
                let entrant = orchestrator.add_entrant(
                    &source,
                    EntryRequest {
                        wallet_address,
                        ticket_count,
                        transaction_signature,
                    },
                )?;
                Ok(GameResponse::Entered { entrant })
            }
            GameInstruction::RunSelection => {
                msg!("Instruction: Select Winner");
                let winner = orchestrator.run_selection().await?;
                Ok(GameResponse::Selected { winner })
            }
            GameInstruction::ListWinners { limit } => {
                msg!("Instruction: List Winners");
                let winners = orchestrator.list_winners(limit as usize);
                Ok(GameResponse::Winners { winners })
            }
            GameInstruction::ListRounds { limit } => {
                msg!("Instruction: List Rounds");
                let rounds = orchestrator.list_rounds(limit as usize);
                Ok(GameResponse::Rounds { rounds })
            }
            GameInstruction::ClearWinners => {
                msg!("Instruction: Clear Winners");
                orchestrator.clear_winners()?;
                Ok(GameResponse::Cleared)
            }
            GameInstruction::GetSnapshot { snapshot_id } => {
                msg!("Instruction: Get Snapshot");
                let snapshot = orchestrator.get_snapshot(&snapshot_id)?;
                Ok(GameResponse::Snapshot(snapshot))
            }
            GameInstruction::SaveSnapshot { participants } => {
                msg!("Instruction: Save Snapshot");
                let snapshot_id = orchestrator.save_snapshot(participants)?;
                Ok(GameResponse::SnapshotSaved { snapshot_id })
            }
            GameInstruction::Recover => {
                msg!("Instruction: Recover");
                let report = orchestrator.recover()?;
                Ok(GameResponse::Recovered(report))
            }
        }
    }

    /// Process and encode the response as JSON
    pub async fn process_json(
        orchestrator: &Orchestrator,
        instruction_data: &[u8],
    ) -> Result<Vec<u8>, GameError> {
        let response = Self::process(orchestrator, instruction_data).await?;
        Ok(serde_json::to_vec(&response)?)
    }
}
