// Holder Raffle Engine - Winner archive
use std::sync::Arc;

use serde::de::DeserializeOwned;
use solana_program::msg;

use crate::{
    error::GameError,
    state::{Round, WinnerRecord},
    store::{Store, StoredValue, ROUND_HISTORY_KEY, WINNERS_KEY},
};

/// Append-only history of winners and of concluded rounds, newest first
pub struct WinnerArchive {
    store: Arc<dyn Store>,
}

impl WinnerArchive {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn append(&self, record: &WinnerRecord) -> Result<(), GameError> {
        self.store
            .list_prepend(WINNERS_KEY, StoredValue::encode(record)?)?;

        // Read back the head to confirm the write landed
        let head = self.store.list_range(WINNERS_KEY, 0, Some(0))?;
        match head.first().map(|v| v.decode::<WinnerRecord>()) {
            Some(Ok(stored)) if stored.round_id == record.round_id => Ok(()),
            _ => Err(GameError::Store(
                "winner was not saved - verification failed".to_string(),
            )),
        }
    }

    /// Up to `limit` most recent winners. Malformed entries are skipped.
    pub fn list(&self, limit: usize) -> Result<Vec<WinnerRecord>, GameError> {
        list_decoded(self.store.as_ref(), WINNERS_KEY, limit)
    }

    pub fn contains(&self, round_id: &str) -> Result<bool, GameError> {
        Ok(self.find(round_id)?.is_some())
    }

    pub fn find(&self, round_id: &str) -> Result<Option<WinnerRecord>, GameError> {
        let all: Vec<WinnerRecord> = decode_all(self.store.list_range(WINNERS_KEY, 0, None)?);
        Ok(all.into_iter().find(|r| r.round_id == round_id))
    }

    /// Removes every winner record. Callers gate this.
    pub fn clear(&self) -> Result<(), GameError> {
        self.store.delete(WINNERS_KEY)?;
        msg!("All winners cleared");
        Ok(())
    }

    pub fn contains_round(&self, round_id: &str) -> Result<bool, GameError> {
        let rounds: Vec<Round> = decode_all(self.store.list_range(ROUND_HISTORY_KEY, 0, None)?);
        Ok(rounds.iter().any(|r| r.id == round_id))
    }

    pub fn append_round(&self, round: &Round) -> Result<(), GameError> {
        self.store
            .list_prepend(ROUND_HISTORY_KEY, StoredValue::encode(round)?)?;
        Ok(())
    }

    pub fn list_rounds(&self, limit: usize) -> Result<Vec<Round>, GameError> {
        list_decoded(self.store.as_ref(), ROUND_HISTORY_KEY, limit)
    }
}

fn list_decoded<T: DeserializeOwned>(
    store: &dyn Store,
    key: &str,
    limit: usize,
) -> Result<Vec<T>, GameError> {
    if limit == 0 {
        return Ok(Vec::new());
    }
    Ok(decode_all(store.list_range(key, 0, Some(limit - 1))?))
}

fn decode_all<T: DeserializeOwned>(values: Vec<StoredValue>) -> Vec<T> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match value.decode() {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                msg!("Skipping malformed archive entry at index {}: {}", index, err);
                None
            }
        })
        .collect()
}
