// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Cruise Control REST client
//!
//! Every reply is classified before it leaves this module:
//!
//! - send/read failures become [`CruiseControlError::Transport`]
//! - a `NotEnoughValidWindowsException` error document becomes a successful
//!   [`CruiseControlResponse`] of kind [`ResponseKind::NotEnoughData`]
//! - any other error document in a user task status reply becomes
//!   [`CruiseControlError::TaskFailed`]
//! - any other error document, non-success status or unparsable body becomes
//!   a protocol error
//!
//! [`ResponseKind::NotEnoughData`]: crate::ResponseKind::NotEnoughData

use std::time::Duration;

use async_trait::async_trait;
use cruise_control_types::{
    Endpoint, NOT_ENOUGH_VALID_WINDOWS_SIGNATURE, Parameter, RebalanceOptions,
    USER_TASK_ID_HEADER, query_string,
};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::CruiseControlConfig;
use crate::error::CruiseControlError;
use crate::metrics;
use crate::response::{self, CruiseControlResponse};

/// The Cruise Control operations used by the operator.
///
/// Implementations hold no per-call state, so one instance may serve
/// concurrent calls for different user tasks.
#[async_trait]
pub trait CruiseControlApi: Send + Sync {
    /// Fetch executor, analyzer and monitor state.
    async fn get_cruise_control_state(
        &self,
        verbose: bool,
    ) -> Result<CruiseControlResponse, CruiseControlError>;

    /// Submit a rebalance (dry run or full run).
    async fn rebalance(
        &self,
        options: &RebalanceOptions,
    ) -> Result<CruiseControlResponse, CruiseControlError>;

    /// Fetch the current status of a previously submitted user task.
    async fn get_user_task_status(
        &self,
        user_task_id: &str,
    ) -> Result<CruiseControlResponse, CruiseControlError>;

    /// Stop any ongoing proposal execution. Succeeds when nothing is running.
    async fn stop_execution(&self) -> Result<CruiseControlResponse, CruiseControlError>;
}

/// How a reply must identify its user task.
#[derive(Clone, Copy)]
enum TaskIdPolicy<'a> {
    /// Reply must carry the `User-Task-ID` header
    Required,
    /// Fall back to the id the request was made for
    Echo(&'a str),
    /// No task id needed
    Optional,
}

/// HTTP client for a single Cruise Control instance
#[derive(Clone, Debug)]
pub struct CruiseControlClient {
    client: Client,
    base_url: String,
}

impl CruiseControlClient {
    /// Create a new client
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, CruiseControlError> {
        // reqwest is built without a bundled crypto provider. Errors mean a
        // provider is already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(CruiseControlError::ClientBuild)?;

        let base_url: String = base_url.into();
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &CruiseControlConfig) -> Result<Self, CruiseControlError> {
        Self::new(config.base_url.clone(), config.http_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: Endpoint, query: &str) -> String {
        format!("{}{}{}", self.base_url, endpoint.path(), query)
    }

    /// Send a request and classify its reply, recording the outcome.
    async fn execute(
        &self,
        endpoint: Endpoint,
        request: RequestBuilder,
        task_id: TaskIdPolicy<'_>,
    ) -> Result<CruiseControlResponse, CruiseControlError> {
        let result = self.execute_inner(endpoint, request, task_id).await;

        let outcome = match &result {
            Ok(r) if r.is_not_enough_data() => "not_enough_data",
            Ok(_) => "ok",
            Err(e) => e.metric_label(),
        };
        metrics::record_request(endpoint, outcome);

        result
    }

    async fn execute_inner(
        &self,
        endpoint: Endpoint,
        request: RequestBuilder,
        task_id: TaskIdPolicy<'_>,
    ) -> Result<CruiseControlResponse, CruiseControlError> {
        let response = request
            .send()
            .await
            .map_err(|source| CruiseControlError::Transport { endpoint, source })?;

        let status = response.status();
        let header_task_id = response
            .headers()
            .get(USER_TASK_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .text()
            .await
            .map_err(|source| CruiseControlError::Transport { endpoint, source })?;

        debug!(
            endpoint = %endpoint,
            status = %status,
            user_task_id = ?header_task_id,
            "Cruise Control replied"
        );

        let json = parse_body(endpoint, &body)?;

        let mut not_enough_data = false;
        if let Some(message) = response::error_message(&json) {
            if !message.contains(NOT_ENOUGH_VALID_WINDOWS_SIGNATURE) {
                // An error document for a polled task is that task's failure.
                if let TaskIdPolicy::Echo(id) = task_id {
                    return Err(CruiseControlError::TaskFailed {
                        user_task_id: header_task_id.unwrap_or_else(|| id.to_string()),
                        detail: message.to_string(),
                    });
                }
                return Err(CruiseControlError::Service {
                    endpoint,
                    message: message.to_string(),
                });
            }
            warn!(
                endpoint = %endpoint,
                "Cruise Control does not have enough metric windows for a proposal yet"
            );
            not_enough_data = true;
        } else if !status.is_success() {
            return Err(CruiseControlError::unexpected_status(
                endpoint,
                status.as_u16(),
                &body,
            ));
        }

        let user_task_id = match (header_task_id, task_id) {
            (Some(id), _) => id,
            (None, TaskIdPolicy::Echo(id)) => id.to_string(),
            (None, TaskIdPolicy::Optional) => String::new(),
            // Insufficient-data replies are not tied to a task.
            (None, TaskIdPolicy::Required) if not_enough_data => String::new(),
            (None, TaskIdPolicy::Required) => {
                return Err(CruiseControlError::Malformed {
                    endpoint,
                    detail: format!("missing {} header", USER_TASK_ID_HEADER),
                });
            }
        };

        Ok(CruiseControlResponse::new(user_task_id, json))
    }
}

/// Parse a reply body. An empty body is `null`.
fn parse_body(endpoint: Endpoint, body: &str) -> Result<Value, CruiseControlError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(|e| CruiseControlError::Malformed {
        endpoint,
        detail: format!("invalid JSON: {}", e),
    })
}

#[async_trait]
impl CruiseControlApi for CruiseControlClient {
    async fn get_cruise_control_state(
        &self,
        verbose: bool,
    ) -> Result<CruiseControlResponse, CruiseControlError> {
        let query = query_string([
            Parameter::Json.as_pair(true),
            Parameter::Verbose.as_pair(verbose),
        ]);
        let url = self.url(Endpoint::State, &query);
        debug!(url = %url, "Fetching Cruise Control state");

        self.execute(Endpoint::State, self.client.get(&url), TaskIdPolicy::Optional)
            .await
    }

    async fn rebalance(
        &self,
        options: &RebalanceOptions,
    ) -> Result<CruiseControlResponse, CruiseControlError> {
        let url = self.url(Endpoint::Rebalance, &options.query_string());
        debug!(
            url = %url,
            dry_run = options.is_dry_run(),
            goals = ?options.goals(),
            "Submitting rebalance"
        );

        self.execute(
            Endpoint::Rebalance,
            self.client.post(&url),
            TaskIdPolicy::Required,
        )
        .await
    }

    async fn get_user_task_status(
        &self,
        user_task_id: &str,
    ) -> Result<CruiseControlResponse, CruiseControlError> {
        let query = query_string([Parameter::Json.as_pair(true)]);
        let url = self.url(Endpoint::Rebalance, &query);
        debug!(url = %url, user_task_id = %user_task_id, "Fetching user task status");

        let request = self
            .client
            .get(&url)
            .header(USER_TASK_ID_HEADER, user_task_id);

        self.execute(
            Endpoint::Rebalance,
            request,
            TaskIdPolicy::Echo(user_task_id),
        )
        .await
    }

    async fn stop_execution(&self) -> Result<CruiseControlResponse, CruiseControlError> {
        let query = query_string([Parameter::Json.as_pair(true)]);
        let url = self.url(Endpoint::Stop, &query);
        debug!(url = %url, "Stopping proposal execution");

        self.execute(Endpoint::Stop, self.client.post(&url), TaskIdPolicy::Optional)
            .await
    }
}
