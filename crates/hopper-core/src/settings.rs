//! Consumer/producer settings loaded from `BROKER_*` environment variables.
//!
//! Validation happens at construction so a misconfigured consumer fails at
//! startup, not on its first poisoned message.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

use crate::domain::topic::{DLQ_MARKER, RETRY_MARKER};

/// Every session must fit at least this many heartbeats.
pub const HEARTBEATS_PER_SESSION: u64 = 4;

/// Upper bound for the retry budget.
pub const RETRY_MAX_TIMES_LIMIT: u32 = 3;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Producer acknowledgement level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Acks {
    #[default]
    All,
    Zero,
    One,
}

impl Acks {
    fn parse(value: &str) -> Result<Self, SettingsError> {
        match value {
            "all" => Ok(Acks::All),
            "0" => Ok(Acks::Zero),
            "1" => Ok(Acks::One),
            other => Err(SettingsError::Invalid {
                var: "BROKER_ACKS",
                reason: format!("{other:?} is not one of: all, 0, 1"),
            }),
        }
    }

    /// Value as passed to the broker client config.
    pub fn as_config_value(&self) -> &'static str {
        match self {
            Acks::All => "all",
            Acks::Zero => "0",
            Acks::One => "1",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerSettings {
    pub bootstrap_servers: String,
    pub topics: Vec<String>,
    pub group_id: String,
    pub enable_auto_commit: bool,
    pub max_poll_records: u32,
    pub max_poll_interval_ms: u64,
    pub heartbeat_interval_ms: u64,
    pub session_timeout_ms: u64,
    pub retry_max_times: u32,
    pub retry_delay_secs: u64,
}

impl ConsumerSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_vars(&std::env::vars().collect())
    }

    /// Build from an explicit variable map (tests use this to avoid touching
    /// process environment).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, SettingsError> {
        let settings = Self {
            bootstrap_servers: required(vars, "BROKER_BOOTSTRAP_SERVERS")?,
            topics: required(vars, "BROKER_TOPICS")?
                .split(',')
                .map(str::to_string)
                .collect(),
            group_id: required(vars, "BROKER_GROUP_ID")?,
            enable_auto_commit: parsed(vars, "BROKER_ENABLE_AUTO_COMMIT", false)?,
            max_poll_records: parsed(vars, "BROKER_MAX_POLL_RECORDS", 100)?,
            max_poll_interval_ms: parsed(vars, "BROKER_MAX_POLL_INTERVAL_MS", 5 * 60 * 1000)?,
            heartbeat_interval_ms: parsed(vars, "BROKER_HEARTBEAT_INTERVAL_MS", 15 * 1000)?,
            session_timeout_ms: parsed(vars, "BROKER_SESSION_TIMEOUT_MS", 90 * 1000)?,
            retry_max_times: parsed(vars, "BROKER_RETRY_MAX_TIMES", 0)?,
            retry_delay_secs: parsed(vars, "BROKER_RETRY_DELAY_SECS", 3)?,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        for topic in &self.topics {
            if topic.is_empty()
                || !topic
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c == '-' || c == '.')
            {
                return Err(SettingsError::Invalid {
                    var: "BROKER_TOPICS",
                    reason: format!(
                        "topic {topic:?} must contain only lowercase letters, hyphens and dots"
                    ),
                });
            }
        }

        if !(1..=500).contains(&self.max_poll_records) {
            return Err(SettingsError::Invalid {
                var: "BROKER_MAX_POLL_RECORDS",
                reason: format!("{} is outside 1..=500", self.max_poll_records),
            });
        }

        if self.retry_max_times > RETRY_MAX_TIMES_LIMIT {
            return Err(SettingsError::Invalid {
                var: "BROKER_RETRY_MAX_TIMES",
                reason: format!(
                    "{} exceeds the limit of {RETRY_MAX_TIMES_LIMIT}",
                    self.retry_max_times
                ),
            });
        }

        if self.max_poll_interval_ms < self.session_timeout_ms {
            return Err(SettingsError::Invalid {
                var: "BROKER_MAX_POLL_INTERVAL_MS",
                reason: "max poll interval must be greater than session timeout".to_string(),
            });
        }

        if self.heartbeat_interval_ms == 0
            || self.session_timeout_ms / self.heartbeat_interval_ms < HEARTBEATS_PER_SESSION
        {
            return Err(SettingsError::Invalid {
                var: "BROKER_HEARTBEAT_INTERVAL_MS",
                reason: format!(
                    "session must fit at least {HEARTBEATS_PER_SESSION} heartbeats"
                ),
            });
        }

        Ok(())
    }

    /// Base topics plus their dead-letter topics, plus every retry topic when
    /// the budget is positive. This is the full subscription list for one
    /// consumer group.
    pub fn subscription_topics(&self) -> Vec<String> {
        let mut all = self.topics.clone();
        all.extend(self.topics.iter().map(|t| format!("{t}{DLQ_MARKER}")));
        for topic in &self.topics {
            for attempt in 1..=self.retry_max_times {
                all.push(format!("{topic}{RETRY_MARKER}{attempt}"));
            }
        }
        all
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerSettings {
    pub bootstrap_servers: String,
    pub request_timeout_ms: u64,
    pub acks: Acks,
    pub connections_max_idle_ms: u64,
}

impl ProducerSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_vars(&std::env::vars().collect())
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, SettingsError> {
        let acks = match vars.get("BROKER_ACKS") {
            Some(value) => Acks::parse(value)?,
            None => Acks::All,
        };
        Ok(Self {
            bootstrap_servers: required(vars, "BROKER_BOOTSTRAP_SERVERS")?,
            request_timeout_ms: parsed(vars, "BROKER_REQUEST_TIMEOUT_MS", 5000)?,
            acks,
            connections_max_idle_ms: parsed(vars, "BROKER_CONNECTIONS_MAX_IDLE_MS", 10_000)?,
        })
    }
}

fn required(vars: &HashMap<String, String>, name: &'static str) -> Result<String, SettingsError> {
    vars.get(name).cloned().ok_or(SettingsError::Missing(name))
}

fn parsed<T: std::str::FromStr>(
    vars: &HashMap<String, String>,
    name: &'static str,
    default: T,
) -> Result<T, SettingsError>
where
    T::Err: std::fmt::Display,
{
    match vars.get(name) {
        Some(value) => value.parse().map_err(|e: T::Err| SettingsError::Invalid {
            var: name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
