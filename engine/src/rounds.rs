// Holder Raffle Engine - Current round record
use std::sync::Arc;

use solana_program::msg;

use crate::{
    clock::Clock,
    error::GameError,
    state::Round,
    store::{Store, StoredValue, CURRENT_ROUND_KEY, ROUND_SEQUENCE_KEY},
};

/// The singleton current round, written only through compare-and-set so
/// concurrent writers cannot overwrite each other
pub struct CurrentRound {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    max_attempts: u32,
}

impl CurrentRound {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, max_attempts: u32) -> Self {
        Self {
            store,
            clock,
            max_attempts: max_attempts.max(1),
        }
    }

    /// The round and its version token
    pub fn load(&self) -> Result<Option<(Round, u64)>, GameError> {
        match self.store.get(CURRENT_ROUND_KEY)? {
            Some(stored) => Ok(Some((stored.value.decode()?, stored.version))),
            None => Ok(None),
        }
    }

    pub fn get(&self) -> Result<Option<Round>, GameError> {
        Ok(self.load()?.map(|(round, _)| round))
    }

    fn fresh_round(&self) -> Result<Round, GameError> {
        let index = self.store.increment(ROUND_SEQUENCE_KEY)?;
        Ok(Round::new(index, self.clock.now_millis()))
    }

    /// The current round, creating an idle one if none exists
    pub fn get_or_create(&self) -> Result<Round, GameError> {
        for _ in 0..self.max_attempts {
            if let Some(round) = self.get()? {
                return Ok(round);
            }
            let round = self.fresh_round()?;
            if self
                .store
                .compare_and_set(CURRENT_ROUND_KEY, None, StoredValue::encode(&round)?)?
                .is_some()
            {
                msg!("No game found, created round {}", round.id);
                return Ok(round);
            }
        }
        Err(GameError::Conflict(CURRENT_ROUND_KEY.to_string()))
    }

    /// Read-modify-write of the current round. `apply` is re-run against the
    /// latest record whenever another writer wins the race.
    pub fn update<F>(&self, apply: F) -> Result<Round, GameError>
    where
        F: FnMut(&mut Round) -> Result<(), GameError>,
    {
        self.update_checked(None, apply)
    }

    /// As `update`, but fails with `RoundReplaced` once `round_id` is no
    /// longer the current round
    pub fn update_round<F>(&self, round_id: &str, apply: F) -> Result<Round, GameError>
    where
        F: FnMut(&mut Round) -> Result<(), GameError>,
    {
        self.update_checked(Some(round_id), apply)
    }

    fn update_checked<F>(&self, round_id: Option<&str>, mut apply: F) -> Result<Round, GameError>
    where
        F: FnMut(&mut Round) -> Result<(), GameError>,
    {
        for _ in 0..self.max_attempts {
            let (mut round, version) = self.load()?.ok_or(GameError::NoRoundRecord)?;
            if let Some(expected) = round_id {
                if round.id != expected {
                    return Err(GameError::RoundReplaced(expected.to_string()));
                }
            }
            apply(&mut round)?;
            if self
                .store
                .compare_and_set(CURRENT_ROUND_KEY, Some(version), StoredValue::encode(&round)?)?
                .is_some()
            {
                return Ok(round);
            }
        }
        Err(GameError::Conflict(CURRENT_ROUND_KEY.to_string()))
    }

    /// Replace the completed round `completed_id` with a fresh idle round
    pub fn roll_over(&self, completed_id: &str) -> Result<Round, GameError> {
        for _ in 0..self.max_attempts {
            let (round, version) = self.load()?.ok_or(GameError::NoRoundRecord)?;
            if round.id != completed_id {
                return Err(GameError::RoundReplaced(completed_id.to_string()));
            }
            let index = self.store.increment(ROUND_SEQUENCE_KEY)?;
            let next = round.successor(index, self.clock.now_millis())?;
            if self
                .store
                .compare_and_set(CURRENT_ROUND_KEY, Some(version), StoredValue::encode(&next)?)?
                .is_some()
            {
                return Ok(next);
            }
        }
        Err(GameError::Conflict(CURRENT_ROUND_KEY.to_string()))
    }
}
