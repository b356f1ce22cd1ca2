use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::application::store::{KeyValueStore, StoreError};

#[derive(Debug, Clone)]
enum Value {
    Counter(i64),
    Set(HashSet<String>),
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Value::Counter(_) => "counter",
            Value::Set(_) => "set",
        }
    }
}

/// Process-local store for development and tests. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn wrong_type(command: &'static str, key: &str, found: &Value) -> StoreError {
    StoreError::command(
        command,
        format!("WRONGTYPE `{key}` holds a {}", found.kind()),
    )
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn set_contains(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        match self.entries.get(key).as_deref() {
            None => Ok(false),
            Some(Value::Set(members)) => Ok(members.contains(member)),
            Some(other) => Err(wrong_type("SISMEMBER", key, other)),
        }
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        match self.entries.entry(key.to_string()) {
            Entry::Vacant(vacant) => {
                vacant.insert(Value::Set(HashSet::from([member.to_string()])));
                Ok(true)
            }
            Entry::Occupied(mut occupied) => match occupied.get_mut() {
                Value::Set(members) => Ok(members.insert(member.to_string())),
                other => Err(wrong_type("SADD", key, other)),
            },
        }
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        match self.entries.get(key).as_deref() {
            None => Ok(Vec::new()),
            Some(Value::Set(members)) => Ok(members.iter().cloned().collect()),
            Some(other) => Err(wrong_type("SMEMBERS", key, other)),
        }
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert(Value::Counter(0));
        match entry.value_mut() {
            Value::Counter(value) => {
                *value = value.checked_add(1).ok_or_else(|| {
                    StoreError::command("INCR", "increment or decrement would overflow")
                })?;
                Ok(*value)
            }
            other => Err(wrong_type("INCR", key, other)),
        }
    }

    async fn get_counter(&self, key: &str) -> Result<Option<i64>, StoreError> {
        match self.entries.get(key).as_deref() {
            None => Ok(None),
            Some(Value::Counter(value)) => Ok(Some(*value)),
            Some(other) => Err(wrong_type("GET", key, other)),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
