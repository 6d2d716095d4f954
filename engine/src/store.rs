// Holder Raffle Engine - Store adapter
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use serde::{de::DeserializeOwned, Serialize};

use crate::{
    clock::{Clock, SystemClock},
    error::GameError,
};

/// Key of the current round record
pub const CURRENT_ROUND_KEY: &str = "game:current";
/// Counter used for sequential round numbers
pub const ROUND_SEQUENCE_KEY: &str = "game:sequence";
/// Append-only list of concluded round records
pub const ROUND_HISTORY_KEY: &str = "game:history";
/// Append-only list of winner records
pub const WINNERS_KEY: &str = "winners:list";

pub fn snapshot_key(snapshot_id: &str) -> String {
    format!("snapshot:{}", snapshot_id)
}

/// A stored value. Backends may hand back the raw JSON text or a value they
/// already decoded; readers accept both.
#[derive(Clone, Debug, PartialEq)]
pub enum StoredValue {
    Text(String),
    Json(serde_json::Value),
}

impl StoredValue {
    pub fn encode<T: Serialize>(value: &T) -> Result<Self, GameError> {
        Ok(StoredValue::Text(serde_json::to_string(value)?))
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, GameError> {
        match self {
            StoredValue::Text(text) => Ok(serde_json::from_str(text)?),
            // A JSON string holding the encoded record
            StoredValue::Json(serde_json::Value::String(text)) => Ok(serde_json::from_str(text)?),
            StoredValue::Json(value) => Ok(serde_json::from_value(value.clone())?),
        }
    }
}

/// A record together with its version token
#[derive(Clone, Debug, PartialEq)]
pub struct Versioned {
    pub value: StoredValue,
    pub version: u64,
}

/// Key-value persistence consumed by the engine
pub trait Store: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Versioned>, GameError>;

    /// Unconditional write. Returns the new version.
    fn set(&self, key: &str, value: StoredValue, ttl: Option<Duration>) -> Result<u64, GameError>;

    /// Write only if the record is still at `expected_version` (`None` means
    /// the key must be absent). Returns the new version, or `None` when
    /// another writer got there first.
    fn compare_and_set(
        &self,
        key: &str,
        expected_version: Option<u64>,
        value: StoredValue,
    ) -> Result<Option<u64>, GameError>;

    /// Atomically increment a counter and return the new value
    fn increment(&self, key: &str) -> Result<u64, GameError>;

    /// Push to the head of a list. Returns the new length.
    fn list_prepend(&self, key: &str, value: StoredValue) -> Result<usize, GameError>;

    /// Elements `start..=stop` from the head; `stop = None` reads to the end
    fn list_range(
        &self,
        key: &str,
        start: usize,
        stop: Option<usize>,
    ) -> Result<Vec<StoredValue>, GameError>;

    fn delete(&self, key: &str) -> Result<bool, GameError>;
}

struct Record {
    value: StoredValue,
    version: u64,
    expires_at: Option<i64>,
}

#[derive(Default)]
struct Inner {
    records: HashMap<String, Record>,
    lists: HashMap<String, VecDeque<StoredValue>>,
    counters: HashMap<String, u64>,
    next_version: u64,
}

impl Inner {
    fn bump_version(&mut self) -> u64 {
        self.next_version += 1;
        self.next_version
    }

    fn live_version(&mut self, key: &str, now: i64) -> Option<u64> {
        let expired = match self.records.get(key) {
            Some(record) => record.expires_at.map_or(false, |at| at <= now),
            None => return None,
        };
        if expired {
            self.records.remove(key);
            return None;
        }
        self.records.get(key).map(|r| r.version)
    }
}

/// In-process store with the same semantics a shared key-value service
/// provides: versioned records, expiry, atomic counters and lists.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            clock,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, GameError> {
        self.inner
            .lock()
            .map_err(|_| GameError::Store("store lock poisoned".to_string()))
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Versioned>, GameError> {
        let now = self.clock.now_millis();
        let mut inner = self.lock()?;
        if inner.live_version(key, now).is_none() {
            return Ok(None);
        }
        Ok(inner.records.get(key).map(|r| Versioned {
            value: r.value.clone(),
            version: r.version,
        }))
    }

    fn set(&self, key: &str, value: StoredValue, ttl: Option<Duration>) -> Result<u64, GameError> {
        let now = self.clock.now_millis();
        let mut inner = self.lock()?;
        // Drop expired records so unread snapshots do not accumulate
        inner
            .records
            .retain(|_, record| record.expires_at.map_or(true, |at| at > now));
        let version = inner.bump_version();
        inner.records.insert(
            key.to_string(),
            Record {
                value,
                version,
                expires_at: ttl.map(|ttl| now + ttl.as_millis() as i64),
            },
        );
        Ok(version)
    }

    fn compare_and_set(
        &self,
        key: &str,
        expected_version: Option<u64>,
        value: StoredValue,
    ) -> Result<Option<u64>, GameError> {
        let now = self.clock.now_millis();
        let mut inner = self.lock()?;
        if inner.live_version(key, now) != expected_version {
            return Ok(None);
        }
        let version = inner.bump_version();
        inner.records.insert(
            key.to_string(),
            Record {
                value,
                version,
                expires_at: None,
            },
        );
        Ok(Some(version))
    }

    fn increment(&self, key: &str) -> Result<u64, GameError> {
        let mut inner = self.lock()?;
        let counter = inner.counters.entry(key.to_string()).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    fn list_prepend(&self, key: &str, value: StoredValue) -> Result<usize, GameError> {
        let mut inner = self.lock()?;
        let list = inner.lists.entry(key.to_string()).or_default();
        list.push_front(value);
        Ok(list.len())
    }

    fn list_range(
        &self,
        key: &str,
        start: usize,
        stop: Option<usize>,
    ) -> Result<Vec<StoredValue>, GameError> {
        let inner = self.lock()?;
        let list = match inner.lists.get(key) {
            Some(list) => list,
            None => return Ok(Vec::new()),
        };
        let take = match stop {
            Some(stop) if stop < start => 0,
            Some(stop) => stop - start + 1,
            None => usize::MAX,
        };
        Ok(list.iter().skip(start).take(take).cloned().collect())
    }

    fn delete(&self, key: &str) -> Result<bool, GameError> {
        let mut inner = self.lock()?;
        let record = inner.records.remove(key).is_some();
        let list = inner.lists.remove(key).is_some();
        let counter = inner.counters.remove(key).is_some();
        Ok(record || list || counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn test_compare_and_set_rejects_stale_version() {
        let store = MemoryStore::default();
        let v1 = store
            .compare_and_set("k", None, StoredValue::Text("1".into()))
            .unwrap()
            .unwrap();
        assert_eq!(
            store
                .compare_and_set("k", None, StoredValue::Text("x".into()))
                .unwrap(),
            None
        );
        let v2 = store
            .compare_and_set("k", Some(v1), StoredValue::Text("2".into()))
            .unwrap()
            .unwrap();
        assert!(v2 > v1);
        assert_eq!(
            store
                .compare_and_set("k", Some(v1), StoredValue::Text("3".into()))
                .unwrap(),
            None
        );
        assert_eq!(
            store.get("k").unwrap().unwrap().value,
            StoredValue::Text("2".into())
        );
    }

    #[test]
    fn test_ttl_expiry() {
        let clock = Arc::new(ManualClock::new(1_000));
        let store = MemoryStore::new(clock.clone());
        store
            .set("s", StoredValue::Text("{}".into()), Some(Duration::from_secs(10)))
            .unwrap();
        clock.advance(Duration::from_secs(9));
        assert!(store.get("s").unwrap().is_some());
        clock.advance(Duration::from_secs(1));
        assert!(store.get("s").unwrap().is_none());
    }

    #[test]
    fn test_set_sweeps_expired_records() {
        let clock = Arc::new(ManualClock::new(1_000));
        let store = MemoryStore::new(clock.clone());
        let ttl = Some(Duration::from_secs(10));
        store.set("a", StoredValue::Text("{}".into()), ttl).unwrap();
        store.set("b", StoredValue::Text("{}".into()), ttl).unwrap();
        store.set("kept", StoredValue::Text("{}".into()), None).unwrap();

        clock.advance(Duration::from_secs(10));
        store.set("c", StoredValue::Text("{}".into()), ttl).unwrap();

        let inner = store.inner.lock().unwrap();
        let mut keys: Vec<&str> = inner.records.keys().map(|k| k.as_str()).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["c", "kept"]);
    }

    #[test]
    fn test_list_prepend_and_range() {
        let store = MemoryStore::default();
        for i in 0..5 {
            store
                .list_prepend("l", StoredValue::Text(i.to_string()))
                .unwrap();
        }
        let head = store.list_range("l", 0, Some(1)).unwrap();
        assert_eq!(
            head,
            vec![StoredValue::Text("4".into()), StoredValue::Text("3".into())]
        );
        assert_eq!(store.list_range("l", 0, None).unwrap().len(), 5);
        assert!(store.list_range("missing", 0, None).unwrap().is_empty());
        assert!(store.delete("l").unwrap());
        assert!(store.list_range("l", 0, None).unwrap().is_empty());
    }

    #[test]
    fn test_decode_tolerates_both_encodings() {
        let text = StoredValue::Text(r#"{"a":1}"#.into());
        let json = StoredValue::Json(serde_json::json!({ "a": 1 }));
        let nested = StoredValue::Json(serde_json::Value::String(r#"{"a":1}"#.into()));
        for value in [text, json, nested] {
            let decoded: HashMap<String, u32> = value.decode().unwrap();
            assert_eq!(decoded["a"], 1);
        }
    }
}
