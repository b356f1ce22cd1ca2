//! Key-value store seam used for view counters and the subscriber set.
//!
//! Adapters live in `infra::kv`; services only ever talk to this trait.

use async_trait::async_trait;
use thiserror::Error;

/// Global set holding every subscribed email address.
pub const SUBSCRIBERS_KEY: &str = "subscribed_emails";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key-value store unreachable: {0}")]
    Unavailable(String),
    #[error("key-value store rejected `{command}`: {message}")]
    Command {
        command: &'static str,
        message: String,
    },
    #[error("unexpected reply to `{command}`: {detail}")]
    Protocol {
        command: &'static str,
        detail: String,
    },
}

impl StoreError {
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::Unavailable(err.to_string())
    }

    pub fn command(command: &'static str, message: impl Into<String>) -> Self {
        Self::Command {
            command,
            message: message.into(),
        }
    }

    pub fn protocol(command: &'static str, detail: impl Into<String>) -> Self {
        Self::Protocol {
            command,
            detail: detail.into(),
        }
    }
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// `SISMEMBER key member`.
    async fn set_contains(&self, key: &str, member: &str) -> Result<bool, StoreError>;

    /// `SADD key member`; `true` when the member was not present before.
    async fn set_add(&self, key: &str, member: &str) -> Result<bool, StoreError>;

    /// `SMEMBERS key`, in no particular order.
    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError>;

    /// `INCR key`, returning the value after the increment.
    async fn incr(&self, key: &str) -> Result<i64, StoreError>;

    /// `GET key` interpreted as an integer counter.
    async fn get_counter(&self, key: &str) -> Result<Option<i64>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
