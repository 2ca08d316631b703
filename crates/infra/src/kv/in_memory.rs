use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{KeyValueStore, StoreError};

#[derive(Debug, Clone)]
enum Value {
    Text(String),
    List(VecDeque<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }

    fn text(&self, key: &str) -> Result<&str, StoreError> {
        match &self.value {
            Value::Text(v) => Ok(v),
            Value::List(_) => Err(wrong_type(key)),
        }
    }
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::WrongType {
        key: key.to_string(),
    }
}

/// In-memory key/value store.
///
/// Intended for tests/dev. Expired entries are dropped lazily on access.
#[derive(Debug, Default)]
pub struct InMemoryKvStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, Entry>, Instant) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        let now = Instant::now();
        f(&mut entries, now)
    }
}

fn live<'a>(
    entries: &'a mut HashMap<String, Entry>,
    key: &str,
    now: Instant,
) -> Option<&'a mut Entry> {
    if entries.get(key).is_some_and(|e| !e.is_live(now)) {
        entries.remove(key);
    }
    entries.get_mut(key)
}

#[async_trait]
impl KeyValueStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.with_entries(|entries, now| match live(entries, key, now) {
            Some(entry) => entry.text(key).map(|v| Some(v.to_string())),
            None => Ok(None),
        })
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), StoreError> {
        self.with_entries(|entries, now| {
            entries.insert(
                key.to_string(),
                Entry {
                    value: Value::Text(value),
                    expires_at: ttl.map(|t| now + t),
                },
            );
            Ok(())
        })
    }

    async fn increment(&self, key: &str, by: i64) -> Result<i64, StoreError> {
        self.with_entries(|entries, now| match live(entries, key, now) {
            Some(entry) => {
                let current: i64 = entry.text(key)?.parse().map_err(|_| {
                    StoreError::NotAnInteger {
                        key: key.to_string(),
                    }
                })?;
                let next = current + by;
                entry.value = Value::Text(next.to_string());
                Ok(next)
            }
            None => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: Value::Text(by.to_string()),
                        expires_at: None,
                    },
                );
                Ok(by)
            }
        })
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        self.with_entries(|entries, now| {
            Ok(match live(entries, key, now) {
                Some(entry) => {
                    entry.expires_at = Some(now + ttl);
                    true
                }
                None => false,
            })
        })
    }

    async fn list_push(&self, key: &str, value: String) -> Result<u64, StoreError> {
        self.with_entries(|entries, now| {
            if live(entries, key, now).is_none() {
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: Value::List(VecDeque::new()),
                        expires_at: None,
                    },
                );
            }
            match entries.get_mut(key).map(|e| &mut e.value) {
                Some(Value::List(items)) => {
                    items.push_front(value);
                    Ok(items.len() as u64)
                }
                _ => Err(wrong_type(key)),
            }
        })
    }

    async fn list_range(
        &self,
        key: &str,
        start: usize,
        stop: usize,
    ) -> Result<Vec<String>, StoreError> {
        self.with_entries(|entries, now| match live(entries, key, now) {
            Some(Entry {
                value: Value::List(items),
                ..
            }) => Ok(items
                .iter()
                .skip(start)
                .take((stop + 1).saturating_sub(start))
                .cloned()
                .collect()),
            Some(_) => Err(wrong_type(key)),
            None => Ok(Vec::new()),
        })
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
