// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Cruise Control replies

use std::fmt;

use cruise_control_types::{NOT_ENOUGH_VALID_WINDOWS_SIGNATURE, keys};
use serde_json::Value;

/// What a reply means for a rebalance in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseKind {
    /// The reply carries an optimization result (`summary` is present)
    Proposal,
    /// The task is still running; poll it with its user task id
    Pending,
    /// The service has not collected enough metric windows yet
    NotEnoughData,
}

/// A single Cruise Control reply and the user task it belongs to.
///
/// The kind is derived from the payload once, when the reply is built, and
/// never changes afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct CruiseControlResponse {
    user_task_id: String,
    json: Value,
    kind: ResponseKind,
}

impl CruiseControlResponse {
    pub fn new(user_task_id: impl Into<String>, json: Value) -> Self {
        let kind = if is_not_enough_data_document(&json) {
            ResponseKind::NotEnoughData
        } else if json.get(keys::SUMMARY).is_some() {
            ResponseKind::Proposal
        } else {
            ResponseKind::Pending
        };

        Self {
            user_task_id: user_task_id.into(),
            json,
            kind,
        }
    }

    pub fn user_task_id(&self) -> &str {
        &self.user_task_id
    }

    pub fn json(&self) -> &Value {
        &self.json
    }

    pub fn kind(&self) -> ResponseKind {
        self.kind
    }

    pub fn is_not_enough_data(&self) -> bool {
        self.kind == ResponseKind::NotEnoughData
    }

    pub fn has_proposal(&self) -> bool {
        self.kind == ResponseKind::Proposal
    }

    /// The raw `Status` token, if the reply has one.
    pub fn status_token(&self) -> Option<&str> {
        self.json.get(keys::STATUS).and_then(Value::as_str)
    }

    pub fn pretty_print(&self) -> String {
        let json = serde_json::to_string_pretty(&self.json)
            .unwrap_or_else(|_| self.json.to_string());
        format!("User Task ID: {}\nJSON:\n {}", self.user_task_id, json)
    }
}

impl fmt::Display for CruiseControlResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "User Task ID: {} JSON: {}", self.user_task_id, self.json)
    }
}

/// The `errorMessage` of a Cruise Control error document.
pub(crate) fn error_message(json: &Value) -> Option<&str> {
    json.get(keys::ERROR_MESSAGE).and_then(Value::as_str)
}

fn is_not_enough_data_document(json: &Value) -> bool {
    error_message(json).is_some_and(|msg| msg.contains(NOT_ENOUGH_VALID_WINDOWS_SIGNATURE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn summary_means_proposal() {
        let response = CruiseControlResponse::new(
            "task-1",
            json!({"summary": {"numReplicaMovements": 3}, "goalSummary": []}),
        );
        assert_eq!(response.kind(), ResponseKind::Proposal);
        assert!(response.has_proposal());
        assert!(!response.is_not_enough_data());
        assert_eq!(response.user_task_id(), "task-1");
    }

    #[test]
    fn progress_only_means_pending() {
        let response = CruiseControlResponse::new(
            "task-2",
            json!({"progress": [{"operation": "Rebalance"}], "version": 1}),
        );
        assert_eq!(response.kind(), ResponseKind::Pending);

        let empty = CruiseControlResponse::new("task-3", Value::Null);
        assert_eq!(empty.kind(), ResponseKind::Pending);
    }

    #[test]
    fn not_enough_windows_signature_is_recognized() {
        let response = CruiseControlResponse::new(
            "task-4",
            json!({
                "errorMessage": "com.linkedin.kafka.cruisecontrol.exception.NotEnoughValidWindowsException: \
                                 There is no window available in range",
                "version": 1
            }),
        );
        assert_eq!(response.kind(), ResponseKind::NotEnoughData);
        assert!(!response.has_proposal());
    }

    #[test]
    fn other_error_messages_are_not_insufficient_data() {
        let doc = json!({"errorMessage": "java.lang.IllegalArgumentException: bad goal"});
        assert_eq!(error_message(&doc), Some("java.lang.IllegalArgumentException: bad goal"));
        assert!(!is_not_enough_data_document(&doc));
    }

    #[test]
    fn status_token_and_printing() {
        let response = CruiseControlResponse::new("abc", json!({"Status": "in-progress"}));
        assert_eq!(response.status_token(), Some("in-progress"));
        assert_eq!(
            response.to_string(),
            r#"User Task ID: abc JSON: {"Status":"in-progress"}"#
        );
        assert!(response.pretty_print().starts_with("User Task ID: abc\nJSON:\n {"));
    }
}
