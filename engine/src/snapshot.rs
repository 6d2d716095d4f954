// Holder Raffle Engine - Eligibility snapshots
use std::{sync::Arc, time::Duration};

use solana_program::msg;

use crate::{
    clock::Clock,
    error::GameError,
    state::{EligibleHolder, Snapshot},
    store::{snapshot_key, Store, StoredValue},
};

const SNAPSHOT_SEQUENCE_KEY: &str = "snapshot:sequence";

/// Point-in-time participant lists, kept for a fixed retention period
pub struct SnapshotStore {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl SnapshotStore {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    /// Store the participants and return the snapshot reference
    pub fn save(&self, participants: Vec<EligibleHolder>) -> Result<String, GameError> {
        let timestamp = self.clock.now_millis();
        let sequence = self.store.increment(SNAPSHOT_SEQUENCE_KEY)?;
        let snapshot_id = format!("snapshot_{}_{}", timestamp, sequence);
        let total_tickets = participants.iter().map(|p| p.ticket_count).sum();

        let snapshot = Snapshot {
            participants,
            timestamp,
            total_tickets,
        };
        self.store.set(
            &snapshot_key(&snapshot_id),
            StoredValue::encode(&snapshot)?,
            Some(self.ttl),
        )?;

        msg!(
            "Snapshot {} saved with {} participants",
            snapshot_id,
            snapshot.participants.len()
        );
        Ok(snapshot_id)
    }

    pub fn get(&self, snapshot_id: &str) -> Result<Snapshot, GameError> {
        if snapshot_id.is_empty() {
            return Err(GameError::MissingField("snapshotId"));
        }
        match self.store.get(&snapshot_key(snapshot_id))? {
            Some(stored) => stored.value.decode(),
            None => Err(GameError::SnapshotNotFound(snapshot_id.to_string())),
        }
    }
}
