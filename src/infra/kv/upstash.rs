use async_trait::async_trait;
use reqwest::{Client, Url, header};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;

use crate::application::store::{KeyValueStore, StoreError};

/// Redis-over-REST client in the Upstash dialect.
///
/// Each command is a `POST` of the JSON-encoded argument vector to the
/// database URL; replies arrive as `{"result": ...}` or `{"error": "..."}`.
#[derive(Clone)]
pub struct UpstashStore {
    client: Client,
    url: Url,
    token: SecretString,
}

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

impl UpstashStore {
    pub fn new(client: Client, url: Url, token: SecretString) -> Self {
        Self { client, url, token }
    }

    async fn command(&self, name: &'static str, args: &[&str]) -> Result<Value, StoreError> {
        let mut body = Vec::with_capacity(args.len() + 1);
        body.push(name);
        body.extend_from_slice(args);

        let response = self
            .client
            .post(self.url.clone())
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.token.expose_secret()),
            )
            .json(&body)
            .send()
            .await
            .map_err(StoreError::unavailable)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(StoreError::unavailable)?;
        let reply: Reply = match serde_json::from_slice(&bytes) {
            Ok(reply) => reply,
            Err(err) if status.is_success() => {
                return Err(StoreError::protocol(name, format!("malformed reply: {err}")));
            }
            Err(_) => {
                let text = String::from_utf8_lossy(&bytes).into_owned();
                return Err(StoreError::unavailable(format!("status {status} body {text}")));
            }
        };

        if let Some(message) = reply.error {
            return Err(StoreError::command(name, message));
        }
        if !status.is_success() {
            return Err(StoreError::unavailable(format!("status {status}")));
        }
        Ok(reply.result)
    }
}

fn as_integer(command: &'static str, value: &Value) -> Result<i64, StoreError> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .ok_or_else(|| StoreError::protocol(command, format!("non-integer {number}"))),
        Value::String(text) => text
            .parse()
            .map_err(|_| StoreError::protocol(command, format!("non-integer `{text}`"))),
        other => Err(StoreError::protocol(command, format!("expected integer, got {other}"))),
    }
}

#[async_trait]
impl KeyValueStore for UpstashStore {
    async fn set_contains(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let result = self.command("SISMEMBER", &[key, member]).await?;
        Ok(as_integer("SISMEMBER", &result)? == 1)
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let result = self.command("SADD", &[key, member]).await?;
        Ok(as_integer("SADD", &result)? > 0)
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        match self.command("SMEMBERS", &[key]).await? {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(member) => Ok(member),
                    other => Err(StoreError::protocol(
                        "SMEMBERS",
                        format!("expected string member, got {other}"),
                    )),
                })
                .collect(),
            Value::Null => Ok(Vec::new()),
            other => Err(StoreError::protocol(
                "SMEMBERS",
                format!("expected array, got {other}"),
            )),
        }
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let result = self.command("INCR", &[key]).await?;
        as_integer("INCR", &result)
    }

    async fn get_counter(&self, key: &str) -> Result<Option<i64>, StoreError> {
        match self.command("GET", &[key]).await? {
            Value::Null => Ok(None),
            value => as_integer("GET", &value).map(Some),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        match self.command("PING", &[]).await? {
            Value::String(pong) if pong.eq_ignore_ascii_case("PONG") => Ok(()),
            other => Err(StoreError::protocol("PING", format!("unexpected reply {other}"))),
        }
    }
}
