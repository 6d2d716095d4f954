// Holder Raffle Engine - Round orchestration
use std::{
    future::{self, Future},
    sync::{Arc, Mutex},
};

use serde::{Deserialize, Serialize};
use solana_program::msg;

use crate::{
    archive::WinnerArchive,
    clock::{Clock, SystemClock, Timer, TokioTimer},
    config::GameConfig,
    error::GameError,
    holders::HolderSource,
    ledger::{self, EntryRequest},
    rate_limit::RateLimiter,
    rounds::CurrentRound,
    selector::{self, ChaChaSource, RandomSource},
    snapshot::SnapshotStore,
    state::{EligibleHolder, Entrant, Round, RoundStatus, Snapshot, WinnerRecord, WinnerSummary},
    store::Store,
    utils,
};

/// Operator input for opening a round
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StartRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Starting prize pool, in lamports
    pub prize_pool_seed: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundStarted {
    pub round: Round,
    pub holders_count: usize,
    pub total_tickets: u64,
}

/// Repairs applied by `Orchestrator::recover`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    /// A round stuck in `starting` was opened
    Activated,
    /// A draw that never reached the archive was abandoned
    RolledBack,
    /// A draw found in the archive was written back onto its round
    Finalized,
    /// A completed round missing from the archive was archived
    Reappended,
    /// A completed round was replaced by a fresh idle round
    RolledOver,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryReport {
    pub actions: Vec<RecoveryAction>,
    pub current: Round,
}

pub struct OrchestratorBuilder {
    config: GameConfig,
    store: Arc<dyn Store>,
    holders: Arc<dyn HolderSource>,
    clock: Arc<dyn Clock>,
    timer: Arc<dyn Timer>,
    random: Box<dyn RandomSource>,
}

impl OrchestratorBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn timer(mut self, timer: Arc<dyn Timer>) -> Self {
        self.timer = timer;
        self
    }

    pub fn random(mut self, random: Box<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    pub fn build(self) -> Orchestrator {
        let config = self.config;
        Orchestrator {
            rounds: CurrentRound::new(
                self.store.clone(),
                self.clock.clone(),
                config.max_write_attempts,
            ),
            archive: WinnerArchive::new(self.store.clone()),
            snapshots: SnapshotStore::new(self.store, self.clock.clone(), config.snapshot_ttl),
            limiter: RateLimiter::new(
                config.rate_limit_max,
                config.rate_limit_window,
                self.clock.clone(),
            ),
            holders: self.holders,
            random: Mutex::new(self.random),
            timer: self.timer,
            clock: self.clock,
            sequence: tokio::sync::Mutex::new(()),
            config,
        }
    }
}

/// Sequences round transitions, draws and archival
pub struct Orchestrator {
    config: GameConfig,
    rounds: CurrentRound,
    archive: WinnerArchive,
    snapshots: SnapshotStore,
    limiter: RateLimiter,
    holders: Arc<dyn HolderSource>,
    random: Mutex<Box<dyn RandomSource>>,
    timer: Arc<dyn Timer>,
    clock: Arc<dyn Clock>,
    // Held for the whole of a start or selection sequence
    sequence: tokio::sync::Mutex<()>,
}

fn report<T>(result: Result<T, GameError>) -> Result<T, GameError> {
    if let Err(err) = &result {
        err.log();
    }
    result
}

impl Orchestrator {
    /// Defaults to the system clock, tokio timers and an entropy-seeded draw
    pub fn builder(
        config: GameConfig,
        store: Arc<dyn Store>,
        holders: Arc<dyn HolderSource>,
    ) -> OrchestratorBuilder {
        OrchestratorBuilder {
            config,
            store,
            holders,
            clock: Arc::new(SystemClock),
            timer: Arc::new(TokioTimer),
            random: Box::new(ChaChaSource::from_entropy()),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// The current round; an idle one is created when none exists
    pub fn get_current_round(&self) -> Result<Round, GameError> {
        report(self.rounds.get_or_create())
    }

    pub fn current_winner(&self) -> Result<Option<WinnerSummary>, GameError> {
        report(self.rounds.get().map(|round| round.and_then(|r| r.winner)))
    }

    /// Open the current idle round to the eligible holders
    pub async fn start_round(&self, request: StartRequest) -> Result<RoundStarted, GameError> {
        report(self.process_start_round(request).await)
    }

    async fn process_start_round(&self, request: StartRequest) -> Result<RoundStarted, GameError> {
        let _sequence = self
            .sequence
            .try_lock()
            .map_err(|_| GameError::SequenceInProgress)?;

        // Verify there is an idle round to open
        let current = self.rounds.get_or_create()?;
        if current.status != RoundStatus::Idle {
            return Err(GameError::InvalidTransition {
                from: current.status,
                to: RoundStatus::Starting,
            });
        }
        let round_id = current.id;

        // Load holders and derive tickets
        let holders = self.holders.list_token_holders().await?;
        if holders.is_empty() {
            return Err(GameError::NoHoldersFound);
        }
        let eligible = ledger::load_eligible_entrants(&holders, self.config.ticket_threshold)?;
        let holders_count = eligible.len();

        let snapshot_id = self.snapshots.save(eligible.clone())?;
        let now = self.clock.now_millis();
        let entrants: Vec<Entrant> = eligible
            .into_iter()
            .map(|holder| holder.into_entrant(now))
            .collect();

        let starting = self.rounds.update_round(&round_id, |round| {
            round.begin_start(
                request.title.clone(),
                request.description.clone(),
                entrants.clone(),
                request.prize_pool_seed,
                Some(snapshot_id.clone()),
            )
        })?;
        msg!(
            "Round {} starting with {} holders and {} tickets",
            round_id,
            holders_count,
            starting.total_tickets
        );

        // Wait for the reveal
        self.timer.sleep(self.config.starting_delay).await;

        let round = self
            .rounds
            .update_round(&round_id, |round| round.activate(self.clock.now_millis()))?;
        msg!("Round {} is active", round_id);

        Ok(RoundStarted {
            holders_count,
            total_tickets: round.total_tickets,
            round,
        })
    }

    /// Record an entry from `source` in the active round
    pub fn add_entrant(&self, source: &str, request: EntryRequest) -> Result<Entrant, GameError> {
        report(self.process_add_entrant(source, request))
    }

    fn process_add_entrant(&self, source: &str, request: EntryRequest) -> Result<Entrant, GameError> {
        self.limiter.check(source)?;
        ledger::validate_entry(&request, self.config.max_tickets_per_entry)?;

        let entrant = Entrant {
            wallet_address: request.wallet_address,
            ticket_count: request.ticket_count,
            transaction_signature: request.transaction_signature,
            timestamp: self.clock.now_millis(),
        };
        let unit_price = self.config.unit_price;
        let round = self
            .rounds
            .update(|round| ledger::add_entrant(round, entrant.clone(), unit_price))
            .map_err(|err| match err {
                GameError::NoRoundRecord => GameError::RoundNotActive,
                other => other,
            })?;

        msg!(
            "{} entered round {} with {} tickets, prize pool {} SOL",
            entrant.wallet_address,
            round.id,
            entrant.ticket_count,
            utils::lamports_to_sol(round.prize_pool)
        );
        Ok(entrant)
    }

    /// Draw the winner of the active round, archive it and open the next round
    pub async fn run_selection(&self) -> Result<WinnerSummary, GameError> {
        self.run_selection_until(future::pending()).await
    }

    /// As `run_selection`, abandoning the draw if `cancel` resolves during
    /// the suspense window. An abandoned draw puts the round back to `active`.
    pub async fn run_selection_until<F>(&self, cancel: F) -> Result<WinnerSummary, GameError>
    where
        F: Future<Output = ()>,
    {
        report(self.process_selection(cancel).await)
    }

    async fn process_selection<F>(&self, cancel: F) -> Result<WinnerSummary, GameError>
    where
        F: Future<Output = ()>,
    {
        let _sequence = self
            .sequence
            .try_lock()
            .map_err(|_| GameError::SequenceInProgress)?;

        // Verify the round is active with participants
        let current = self.rounds.get()?.ok_or(GameError::RoundNotActive)?;
        let round_id = current.id;
        let selecting = self
            .rounds
            .update_round(&round_id, |round| round.begin_selection())?;
        msg!(
            "Round {} selecting winner among {} tickets",
            round_id,
            selecting.total_tickets
        );

        let cancelled = tokio::select! {
            _ = self.timer.sleep(self.config.suspense_delay) => false,
            _ = cancel => true,
        };
        if cancelled {
            self.rounds
                .update_round(&round_id, |round| round.abandon_selection())?;
            msg!("Round {} selection cancelled, back to active", round_id);
            return Err(GameError::Cancelled);
        }

        // Participants cannot change while selecting, so the list read at the
        // transition is the one drawn from
        let winner = {
            let mut random = self
                .random
                .lock()
                .map_err(|_| GameError::Store("random source lock poisoned".to_string()))?;
            let entrant = selector::select_winner(&selecting.participants, random.as_mut())?;
            WinnerSummary::for_entrant(entrant, selecting.prize_pool)
        };

        let now = self.clock.now_millis();
        let record = WinnerRecord::new(&selecting, &winner, now);
        self.archive.append(&record)?;

        let completed = self
            .rounds
            .update_round(&round_id, |round| round.complete(winner.clone(), now))?;
        msg!(
            "Round {} won by {} with {} tickets, prize {} SOL",
            round_id,
            winner.wallet_address,
            winner.ticket_count,
            utils::lamports_to_sol(winner.prize_amount)
        );

        self.roll_over(&completed)?;
        Ok(winner)
    }

    fn roll_over(&self, completed: &Round) -> Result<Round, GameError> {
        // A repeated roll-over of the same round keeps a single history entry
        let recorded = self.archive.contains_round(&completed.id).and_then(|found| {
            if found {
                Ok(())
            } else {
                self.archive.append_round(completed)
            }
        });
        if let Err(err) = recorded {
            // The winner archive already holds the outcome
            msg!("Failed to record round history for {}: {}", completed.id, err);
        }
        let next = self.rounds.roll_over(&completed.id)?;
        msg!("Round {} replaced by {}", completed.id, next.id);
        Ok(next)
    }

    /// Most recent winners, newest first. Read failures yield an empty list.
    pub fn list_winners(&self, limit: usize) -> Vec<WinnerRecord> {
        self.archive.list(limit).unwrap_or_else(|err| {
            err.log();
            Vec::new()
        })
    }

    /// Most recently concluded rounds, newest first
    pub fn list_rounds(&self, limit: usize) -> Vec<Round> {
        self.archive.list_rounds(limit).unwrap_or_else(|err| {
            err.log();
            Vec::new()
        })
    }

    pub fn clear_winners(&self) -> Result<(), GameError> {
        report(self.archive.clear())
    }

    pub fn get_snapshot(&self, snapshot_id: &str) -> Result<Snapshot, GameError> {
        report(self.snapshots.get(snapshot_id))
    }

    pub fn save_snapshot(&self, participants: Vec<EligibleHolder>) -> Result<String, GameError> {
        if participants.is_empty() {
            return report(Err(GameError::NoParticipants));
        }
        report(self.snapshots.save(participants))
    }

    /// Repair a round left mid-sequence by a crash or a failed write
    pub fn recover(&self) -> Result<RecoveryReport, GameError> {
        report(self.process_recover())
    }

    fn process_recover(&self) -> Result<RecoveryReport, GameError> {
        let _sequence = self
            .sequence
            .try_lock()
            .map_err(|_| GameError::SequenceInProgress)?;

        let mut actions = Vec::new();
        let round = match self.rounds.get()? {
            Some(round) => round,
            None => {
                let current = self.rounds.get_or_create()?;
                return Ok(RecoveryReport { actions, current });
            }
        };
        let round_id = round.id.clone();

        let current = match round.status {
            RoundStatus::Idle | RoundStatus::Active => round,
            RoundStatus::Starting => {
                let now = self.clock.now_millis();
                let round = self
                    .rounds
                    .update_round(&round_id, |round| round.activate(now))?;
                actions.push(RecoveryAction::Activated);
                round
            }
            RoundStatus::SelectingWinner => match self.archive.find(&round_id)? {
                Some(record) => {
                    let completed = self.rounds.update_round(&round_id, |round| {
                        round.complete(record.summary(), record.timestamp)
                    })?;
                    actions.push(RecoveryAction::Finalized);
                    let next = self.roll_over(&completed)?;
                    actions.push(RecoveryAction::RolledOver);
                    next
                }
                None => {
                    let round = self
                        .rounds
                        .update_round(&round_id, |round| round.abandon_selection())?;
                    actions.push(RecoveryAction::RolledBack);
                    round
                }
            },
            RoundStatus::Completed => {
                if let Some(winner) = &round.winner {
                    if !self.archive.contains(&round_id)? {
                        let timestamp = round.end_time.unwrap_or_else(|| self.clock.now_millis());
                        self.archive
                            .append(&WinnerRecord::new(&round, winner, timestamp))?;
                        actions.push(RecoveryAction::Reappended);
                    }
                }
                let next = self.roll_over(&round)?;
                actions.push(RecoveryAction::RolledOver);
                next
            }
        };

        msg!("Recovery of {} applied {:?}", round_id, actions);
        Ok(RecoveryReport { actions, current })
    }
}
