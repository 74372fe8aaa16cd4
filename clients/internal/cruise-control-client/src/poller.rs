// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! User task poller
//!
//! Drives a submitted rebalance to a terminal state:
//!
//! ```text
//! Submitted -> Polling{1} -> ... -> Polling{n} -> Completed
//!                                             \-> Failed
//!                                             \-> TimedOut
//!                                             \-> Cancelled
//!                                             \-> NotEnoughData
//! ```
//!
//! A submission that already carries a proposal completes without polling.
//! A task fails either through an error `Status` token or through an error
//! document in the status reply, which the client reports as
//! [`CruiseControlError::TaskFailed`].
//! Each status poll is preceded by a timer wait; the poller never blocks a
//! thread while waiting. Every wait and every in-flight status call races the
//! cancellation token, so once it fires no further status call is issued.

use std::sync::Arc;

use cruise_control_types::{Endpoint, RebalanceOptions, TaskStatus, keys};
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

use crate::client::CruiseControlApi;
use crate::config::PollerConfig;
use crate::error::CruiseControlError;
use crate::metrics;
use crate::response::CruiseControlResponse;

/// Observable poller state
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollState {
    Submitted,
    /// Waiting for, or awaiting the reply of, status poll number `attempt`
    Polling { attempt: u32 },
    Completed,
    Failed,
    TimedOut,
    Cancelled,
    /// The poll budget ran out while the service still lacked metric windows
    NotEnoughData,
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollState::Submitted | PollState::Polling { .. })
    }
}

/// Non-error result of a poll sequence
#[derive(Clone, Debug, PartialEq)]
pub enum PollOutcome {
    /// The task finished; `attempts` is 0 when the submission itself carried
    /// the proposal.
    Completed {
        response: CruiseControlResponse,
        attempts: u32,
    },
    /// The service is still warming up; retry the whole operation later.
    NotEnoughData {
        response: CruiseControlResponse,
        attempts: u32,
    },
    /// The owner cancelled before a terminal status was seen.
    Cancelled,
}

/// What a single status reply means for the poll loop.
enum Observation {
    Running,
    NotEnoughData(CruiseControlResponse),
    Finished(CruiseControlResponse),
}

/// Polls a user task until it finishes.
///
/// Holds no per-task state; one poller may drive many tasks at once.
#[derive(Clone)]
pub struct TaskPoller {
    api: Arc<dyn CruiseControlApi>,
    config: PollerConfig,
}

impl TaskPoller {
    pub fn new(api: Arc<dyn CruiseControlApi>, config: PollerConfig) -> Self {
        Self { api, config }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Submit a rebalance and poll it to completion.
    pub async fn rebalance_and_wait(
        &self,
        options: &RebalanceOptions,
        cancel: &CancellationToken,
    ) -> Result<PollOutcome, CruiseControlError> {
        let submission = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(PollOutcome::Cancelled),
            result = self.api.rebalance(options) => result?,
        };
        self.run(submission, cancel).await
    }

    /// Drive `submission` to a terminal state inline.
    pub async fn run(
        &self,
        submission: CruiseControlResponse,
        cancel: &CancellationToken,
    ) -> Result<PollOutcome, CruiseControlError> {
        let (state, _) = watch::channel(PollState::Submitted);
        self.run_observed(submission, cancel, &state).await
    }

    /// Drive `submission` on the runtime and return a handle to it.
    pub fn spawn(self, submission: CruiseControlResponse) -> PollHandle {
        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(PollState::Submitted);

        let token = cancel.clone();
        let task = tokio::spawn(async move {
            self.run_observed(submission, &token, &state_tx).await
        });

        PollHandle {
            guard: cancel.clone().drop_guard(),
            cancel,
            state: state_rx,
            task,
        }
    }

    async fn run_observed(
        &self,
        submission: CruiseControlResponse,
        cancel: &CancellationToken,
        state: &watch::Sender<PollState>,
    ) -> Result<PollOutcome, CruiseControlError> {
        let user_task_id = submission.user_task_id().to_string();
        let result = self.poll(submission, cancel, state).await;

        let final_state = match &result {
            Ok(PollOutcome::Completed { attempts, .. }) => {
                info!(user_task_id = %user_task_id, attempts, "User task completed");
                PollState::Completed
            }
            Ok(PollOutcome::NotEnoughData { attempts, .. }) => {
                warn!(
                    user_task_id = %user_task_id,
                    attempts,
                    "Cruise Control still lacks metric windows, giving up for now"
                );
                PollState::NotEnoughData
            }
            Ok(PollOutcome::Cancelled) => {
                info!(user_task_id = %user_task_id, "Polling cancelled");
                PollState::Cancelled
            }
            Err(CruiseControlError::TaskTimeout { attempts, .. }) => {
                warn!(user_task_id = %user_task_id, attempts, "User task timed out");
                PollState::TimedOut
            }
            Err(e) => {
                warn!(user_task_id = %user_task_id, error = %e, "User task failed");
                PollState::Failed
            }
        };
        state.send_replace(final_state);

        result
    }

    async fn poll(
        &self,
        submission: CruiseControlResponse,
        cancel: &CancellationToken,
        state: &watch::Sender<PollState>,
    ) -> Result<PollOutcome, CruiseControlError> {
        if submission.is_not_enough_data() {
            return Ok(PollOutcome::NotEnoughData {
                response: submission,
                attempts: 0,
            });
        }
        if submission.has_proposal() {
            return Ok(PollOutcome::Completed {
                response: submission,
                attempts: 0,
            });
        }

        let user_task_id = submission.user_task_id().to_string();
        let deadline = self.config.deadline().map(|d| Instant::now() + d);

        let mut budget = self.config.max_attempts;
        let mut extensions = 0;
        let mut last_not_enough_data = None;
        let mut attempt = 0;

        while attempt < budget {
            attempt += 1;
            state.send_replace(PollState::Polling { attempt });

            let delay = self.config.delay_before(attempt);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(PollOutcome::Cancelled),
                _ = sleep(delay) => {}
            }

            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(CruiseControlError::TaskTimeout {
                    user_task_id,
                    attempts: attempt - 1,
                });
            }

            debug!(user_task_id = %user_task_id, attempt, "Polling user task");
            let reply = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(PollOutcome::Cancelled),
                result = self.api.get_user_task_status(&user_task_id) => result?,
            };

            match observe(&user_task_id, reply)? {
                Observation::Running => {
                    last_not_enough_data = None;
                }
                Observation::NotEnoughData(reply) => {
                    if extensions < self.config.max_not_enough_data_retries {
                        extensions += 1;
                        budget += 1;
                    }
                    last_not_enough_data = Some(reply);
                }
                Observation::Finished(response) => {
                    return Ok(PollOutcome::Completed {
                        response,
                        attempts: attempt,
                    });
                }
            }
        }

        match last_not_enough_data {
            Some(response) => Ok(PollOutcome::NotEnoughData {
                response,
                attempts: attempt,
            }),
            None => Err(CruiseControlError::TaskTimeout {
                user_task_id,
                attempts: attempt,
            }),
        }
    }
}

/// Interpret one status reply.
fn observe(
    user_task_id: &str,
    reply: CruiseControlResponse,
) -> Result<Observation, CruiseControlError> {
    if reply.is_not_enough_data() {
        metrics::record_poll("not_enough_data");
        return Ok(Observation::NotEnoughData(reply));
    }

    let Some(token) = reply.status_token() else {
        // Older services answer a finished task with the bare proposal.
        if reply.has_proposal() {
            metrics::record_poll("completed");
            return Ok(Observation::Finished(reply));
        }
        metrics::record_poll("unknown");
        return Err(CruiseControlError::Malformed {
            endpoint: Endpoint::Rebalance,
            detail: format!("status of user task {} has no Status field", user_task_id),
        });
    };

    match TaskStatus::from_wire(token) {
        Some(TaskStatus::InProgress) => {
            metrics::record_poll("in_progress");
            Ok(Observation::Running)
        }
        Some(TaskStatus::Completed) => {
            metrics::record_poll("completed");
            Ok(Observation::Finished(reply))
        }
        Some(TaskStatus::Error) => {
            metrics::record_poll("error");
            let detail = reply
                .json()
                .get(keys::ERROR_MESSAGE)
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("service reported status '{}'", token));
            Err(CruiseControlError::TaskFailed {
                user_task_id: user_task_id.to_string(),
                detail,
            })
        }
        None => {
            metrics::record_poll("unknown");
            Err(CruiseControlError::UnknownTaskStatus {
                user_task_id: user_task_id.to_string(),
                status: token.to_string(),
            })
        }
    }
}

/// Handle to a spawned poll sequence.
///
/// Dropping the handle cancels the poller.
pub struct PollHandle {
    cancel: CancellationToken,
    state: watch::Receiver<PollState>,
    task: JoinHandle<Result<PollOutcome, CruiseControlError>>,
    guard: DropGuard,
}

impl PollHandle {
    /// Stop polling. No status call is issued after this returns.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> watch::Receiver<PollState> {
        self.state.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the poll sequence to end.
    pub async fn join(self) -> Result<PollOutcome, CruiseControlError> {
        let PollHandle { task, guard, .. } = self;
        let result = task
            .await
            .map_err(|e| CruiseControlError::PollerAborted(e.to_string()))?;
        drop(guard);
        result
    }
}
