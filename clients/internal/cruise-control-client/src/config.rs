// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Configuration for the Cruise Control client and task poller

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Default Cruise Control REST address
const DEFAULT_BASE_URL: &str = "http://localhost:9090";

/// Default HTTP timeout (seconds)
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default delay before the first status poll (milliseconds)
const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;

/// Upper bound for the doubling poll delay (milliseconds)
const DEFAULT_MAX_POLL_INTERVAL_MS: u64 = 30_000;

/// Status polls issued before giving up on a task
const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Extra polls granted while the service reports insufficient data
const DEFAULT_MAX_NOT_ENOUGH_DATA_RETRIES: u32 = 5;

/// Task poller configuration
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Delay before the first poll; doubled after every poll
    pub poll_interval_ms: u64,
    /// Cap for the doubled delay
    pub max_poll_interval_ms: u64,
    /// Number of status polls before the task is declared timed out
    pub max_attempts: u32,
    /// How many insufficient-data replies may each add one poll to the budget
    pub max_not_enough_data_retries: u32,
    /// Optional wall-clock bound on the whole poll sequence (seconds)
    pub deadline_secs: Option<u64>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_poll_interval_ms: DEFAULT_MAX_POLL_INTERVAL_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_not_enough_data_retries: DEFAULT_MAX_NOT_ENOUGH_DATA_RETRIES,
            deadline_secs: None,
        }
    }
}

impl PollerConfig {
    /// Delay to wait before poll number `attempt` (1-based).
    pub fn delay_before(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        let delay = self.poll_interval_ms.saturating_mul(1u64 << shift);
        Duration::from_millis(delay.min(self.max_poll_interval_ms.max(self.poll_interval_ms)))
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}

/// Client configuration loaded from environment variables or a JSON file
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CruiseControlConfig {
    /// Base URL of the Cruise Control REST API, e.g. `http://cruise-control:9090`
    pub base_url: String,
    /// HTTP request timeout in seconds
    pub http_timeout_secs: u64,
    /// Task poller settings
    pub poll: PollerConfig,
}

impl Default for CruiseControlConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            poll: PollerConfig::default(),
        }
    }
}

impl CruiseControlConfig {
    /// Configuration for a Cruise Control instance at `host:port`.
    pub fn for_host(host: &str, port: u16) -> Self {
        Self {
            base_url: format!("http://{}:{}", host, port),
            ..Default::default()
        }
    }

    /// Load configuration from environment variables
    ///
    /// `CRUISE_CONTROL_URL` is required; everything else falls back to the
    /// defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("CRUISE_CONTROL_URL")
            .context("CRUISE_CONTROL_URL environment variable required")?;

        let defaults = PollerConfig::default();
        let poll = PollerConfig {
            poll_interval_ms: parse_or(
                &lookup,
                "CRUISE_CONTROL_POLL_INTERVAL_MS",
                defaults.poll_interval_ms,
            )?,
            max_poll_interval_ms: parse_or(
                &lookup,
                "CRUISE_CONTROL_MAX_POLL_INTERVAL_MS",
                defaults.max_poll_interval_ms,
            )?,
            max_attempts: parse_or(
                &lookup,
                "CRUISE_CONTROL_MAX_POLL_ATTEMPTS",
                defaults.max_attempts,
            )?,
            max_not_enough_data_retries: parse_or(
                &lookup,
                "CRUISE_CONTROL_MAX_NOT_ENOUGH_DATA_RETRIES",
                defaults.max_not_enough_data_retries,
            )?,
            deadline_secs: match lookup("CRUISE_CONTROL_POLL_DEADLINE_SECS") {
                Some(v) => Some(
                    v.parse()
                        .context("Invalid CRUISE_CONTROL_POLL_DEADLINE_SECS")?,
                ),
                None => None,
            },
        };

        Ok(Self {
            base_url,
            http_timeout_secs: parse_or(
                &lookup,
                "CRUISE_CONTROL_HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?,
            poll,
        })
    }

    /// Load configuration from a JSON file
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}", key)),
        None => Ok(default),
    }
}
