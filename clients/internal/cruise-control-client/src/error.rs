// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Error types for the Cruise Control client

use cruise_control_types::Endpoint;
use thiserror::Error;

/// Upper bound on how much of an unexpected reply body is kept in an error.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Broad classification of a [`CruiseControlError`].
///
/// Callers pick their retry/backoff policy from this. A transport failure
/// usually warrants a quick retry of the whole operation, a timeout a longer
/// one, while protocol failures point at a version or configuration mismatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The client itself could not be set up
    Config,
    /// Connection refused, DNS failure, HTTP-layer timeout
    Transport,
    /// Unexpected status code or reply shape
    Protocol,
    /// The service reported the polled task as failed
    TaskFailed,
    /// Polling gave up before the task reached a terminal state
    TaskTimeout,
    /// The polling task itself died
    Internal,
}

/// Cruise Control client errors
#[derive(Debug, Error)]
pub enum CruiseControlError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Request to {endpoint} endpoint failed: {source}")]
    Transport {
        endpoint: Endpoint,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} endpoint returned HTTP {status}: {body}")]
    UnexpectedStatus {
        endpoint: Endpoint,
        status: u16,
        body: String,
    },

    #[error("Cruise Control reported an error on {endpoint} endpoint: {message}")]
    Service { endpoint: Endpoint, message: String },

    #[error("Malformed reply from {endpoint} endpoint: {detail}")]
    Malformed { endpoint: Endpoint, detail: String },

    #[error("User task {user_task_id} reported unrecognized status '{status}'")]
    UnknownTaskStatus {
        user_task_id: String,
        status: String,
    },

    #[error("User task {user_task_id} failed: {detail}")]
    TaskFailed {
        user_task_id: String,
        detail: String,
    },

    #[error("User task {user_task_id} not finished after {attempts} poll attempt(s)")]
    TaskTimeout { user_task_id: String, attempts: u32 },

    #[error("Poller task aborted: {0}")]
    PollerAborted(String),
}

impl CruiseControlError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CruiseControlError::ClientBuild(_) => ErrorKind::Config,
            CruiseControlError::Transport { .. } => ErrorKind::Transport,
            CruiseControlError::UnexpectedStatus { .. }
            | CruiseControlError::Service { .. }
            | CruiseControlError::Malformed { .. }
            | CruiseControlError::UnknownTaskStatus { .. } => ErrorKind::Protocol,
            CruiseControlError::TaskFailed { .. } => ErrorKind::TaskFailed,
            CruiseControlError::TaskTimeout { .. } => ErrorKind::TaskTimeout,
            CruiseControlError::PollerAborted(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn unexpected_status(endpoint: Endpoint, status: u16, body: &str) -> Self {
        CruiseControlError::UnexpectedStatus {
            endpoint,
            status,
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        }
    }

    /// Label used for the request outcome metric.
    pub(crate) fn metric_label(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Transport => "transport_error",
            ErrorKind::TaskTimeout => "timeout",
            ErrorKind::TaskFailed => "task_failed",
            ErrorKind::Config => "config_error",
            ErrorKind::Internal => "internal_error",
            ErrorKind::Protocol => "protocol_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_variants_share_a_kind() {
        let errors = [
            CruiseControlError::unexpected_status(Endpoint::State, 503, "busy"),
            CruiseControlError::Service {
                endpoint: Endpoint::Rebalance,
                message: "boom".to_string(),
            },
            CruiseControlError::Malformed {
                endpoint: Endpoint::Stop,
                detail: "not json".to_string(),
            },
            CruiseControlError::UnknownTaskStatus {
                user_task_id: "t".to_string(),
                status: "Weird".to_string(),
            },
        ];
        for err in &errors {
            assert_eq!(err.kind(), ErrorKind::Protocol);
            assert_eq!(err.metric_label(), "protocol_error");
        }
    }

    #[test]
    fn timeout_is_distinct_from_transport() {
        let err = CruiseControlError::TaskTimeout {
            user_task_id: "abc".to_string(),
            attempts: 5,
        };
        assert_eq!(err.kind(), ErrorKind::TaskTimeout);
        assert_eq!(
            err.to_string(),
            "User task abc not finished after 5 poll attempt(s)"
        );
    }

    #[test]
    fn config_and_internal_errors_have_their_own_labels() {
        let aborted = CruiseControlError::PollerAborted("task panicked".to_string());
        assert_eq!(aborted.kind(), ErrorKind::Internal);
        assert_eq!(aborted.metric_label(), "internal_error");

        let failed = CruiseControlError::TaskFailed {
            user_task_id: "t".to_string(),
            detail: "broker down".to_string(),
        };
        assert_eq!(failed.metric_label(), "task_failed");
    }

    #[test]
    fn unexpected_status_body_is_truncated() {
        let body = "x".repeat(4 * MAX_ERROR_BODY_CHARS);
        match CruiseControlError::unexpected_status(Endpoint::State, 500, &body) {
            CruiseControlError::UnexpectedStatus { body, status, .. } => {
                assert_eq!(status, 500);
                assert_eq!(body.len(), MAX_ERROR_BODY_CHARS);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
