// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Shared types for talking to the Cruise Control REST API.
//!
//! This crate holds the fixed wire catalogue (endpoint paths, query parameter
//! keys, header names) and the immutable request options used by the
//! Cruise Control client. Nothing here performs I/O.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

// ============================================================================
// Wire Constants
// ============================================================================

/// Header carrying the user task identifier assigned by Cruise Control.
///
/// The service sets it on every reply; the client sends it back when polling
/// the status of a previously submitted task.
pub const USER_TASK_ID_HEADER: &str = "User-Task-ID";

/// Exception name Cruise Control reports when its load monitor has not yet
/// collected enough metric windows to build a proposal.
pub const NOT_ENOUGH_VALID_WINDOWS_SIGNATURE: &str = "NotEnoughValidWindowsException";

/// Top-level keys of interest in Cruise Control JSON replies.
pub mod keys {
    pub const SUMMARY: &str = "summary";
    pub const GOAL_SUMMARY: &str = "goalSummary";
    pub const PROPOSALS: &str = "proposals";
    pub const LOAD_BEFORE_OPTIMIZATION: &str = "loadBeforeOptimization";
    pub const LOAD_AFTER_OPTIMIZATION: &str = "loadAfterOptimization";
    pub const STATUS: &str = "Status";
    pub const ERROR_MESSAGE: &str = "errorMessage";
    pub const PROGRESS: &str = "progress";
}

// ============================================================================
// Endpoint Catalogue
// ============================================================================

/// Cruise Control operations used by the operator.
///
/// Task status polling has no path of its own: it reuses the rebalance path
/// and identifies the task through [`USER_TASK_ID_HEADER`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Endpoint {
    /// Executor, analyzer and monitor state
    State,
    /// Proposal generation (dry run) or execution
    Rebalance,
    /// Stop an ongoing proposal execution
    Stop,
}

impl Endpoint {
    /// The fixed URL path of this endpoint.
    pub const fn path(self) -> &'static str {
        match self {
            Endpoint::State => "/kafkacruisecontrol/state",
            Endpoint::Rebalance => "/kafkacruisecontrol/rebalance",
            Endpoint::Stop => "/kafkacruisecontrol/stop_proposal_execution",
        }
    }
}

// ============================================================================
// Parameter Catalogue
// ============================================================================

/// Query parameters understood by the Cruise Control endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Parameter {
    #[strum(to_string = "dryrun")]
    DryRun,
    #[strum(to_string = "json")]
    Json,
    #[strum(to_string = "goals")]
    Goals,
    #[strum(to_string = "verbose")]
    Verbose,
    #[strum(to_string = "skip_hard_goal_check")]
    SkipHardGoalCheck,
}

impl Parameter {
    /// The wire key of this parameter.
    pub const fn key(self) -> &'static str {
        match self {
            Parameter::DryRun => "dryrun",
            Parameter::Json => "json",
            Parameter::Goals => "goals",
            Parameter::Verbose => "verbose",
            Parameter::SkipHardGoalCheck => "skip_hard_goal_check",
        }
    }

    /// Render as `key=value`.
    pub fn as_pair(self, value: impl Display) -> String {
        format!("{}={}", self.key(), value)
    }

    /// Render as `key=v1,v2,...`, keeping the order of `values`.
    pub fn as_list<I, S>(self, values: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = values
            .into_iter()
            .map(|v| v.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(",");
        format!("{}={}", self.key(), joined)
    }
}

/// Join rendered parameter fragments into a query string with a leading `?`.
pub fn query_string<I>(fragments: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let joined = fragments.into_iter().collect::<Vec<_>>().join("&");
    format!("?{}", joined)
}

// ============================================================================
// Rebalance Options
// ============================================================================

/// Cruise Control always replies with JSON for operator requests.
const REPLY_WITH_JSON: bool = true;

/// Options for a single rebalance request.
///
/// Built with [`RebalanceOptionsBuilder`]; immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RebalanceOptions {
    dry_run: bool,
    verbose: bool,
    goals: Option<Vec<String>>,
    skip_hard_goal_check: bool,
}

impl RebalanceOptions {
    /// Start a builder with the default options (dry run, not verbose,
    /// service default goals).
    pub fn builder() -> RebalanceOptionsBuilder {
        RebalanceOptionsBuilder::default()
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Goals in priority order, `None` when the service defaults apply.
    pub fn goals(&self) -> Option<&[String]> {
        self.goals.as_deref()
    }

    pub fn skip_hard_goal_check(&self) -> bool {
        self.skip_hard_goal_check
    }

    /// Render the query string for the rebalance endpoint.
    ///
    /// Parameter order is fixed: `dryrun`, `json`, `verbose`, then `goals`
    /// when a non-empty goal list was given, then `skip_hard_goal_check`
    /// when enabled.
    pub fn query_string(&self) -> String {
        let mut fragments = vec![
            Parameter::DryRun.as_pair(self.dry_run),
            Parameter::Json.as_pair(REPLY_WITH_JSON),
            Parameter::Verbose.as_pair(self.verbose),
        ];

        if let Some(goals) = self.goals.as_deref().filter(|g| !g.is_empty()) {
            fragments.push(Parameter::Goals.as_list(goals));
        }

        if self.skip_hard_goal_check {
            fragments.push(Parameter::SkipHardGoalCheck.as_pair(true));
        }

        query_string(fragments)
    }
}

impl Default for RebalanceOptions {
    fn default() -> Self {
        RebalanceOptionsBuilder::default().build()
    }
}

/// Accumulates rebalance options by value.
///
/// Every mutator consumes the builder and returns the updated copy, so a
/// builder is never shared mutably. Clone it to branch off several requests
/// from a common prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub struct RebalanceOptionsBuilder {
    dry_run: bool,
    verbose: bool,
    goals: Option<Vec<String>>,
    skip_hard_goal_check: bool,
}

impl Default for RebalanceOptionsBuilder {
    fn default() -> Self {
        Self {
            dry_run: true,
            verbose: false,
            goals: None,
            skip_hard_goal_check: false,
        }
    }
}

impl RebalanceOptionsBuilder {
    /// Execute the proposal instead of only generating it.
    pub fn with_full_run(mut self) -> Self {
        self.dry_run = false;
        self
    }

    /// Ask for the per-partition proposals in the reply.
    pub fn with_verbose_response(mut self) -> Self {
        self.verbose = true;
        self
    }

    /// Replace the goal list. Order is kept; duplicates are not removed.
    pub fn with_goals<I, S>(mut self, goals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.goals = Some(goals.into_iter().map(Into::into).collect());
        self
    }

    /// Allow Cruise Control to drop hard goals it cannot satisfy.
    pub fn with_skip_hard_goal_check(mut self) -> Self {
        self.skip_hard_goal_check = true;
        self
    }

    pub fn build(&self) -> RebalanceOptions {
        RebalanceOptions {
            dry_run: self.dry_run,
            verbose: self.verbose,
            goals: self.goals.clone(),
            skip_hard_goal_check: self.skip_hard_goal_check,
        }
    }
}

// ============================================================================
// Custom Resource Types
// ============================================================================

/// The rebalance section of the Kafka cluster custom resource.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebalanceSpec {
    /// Goals ordered by decreasing priority. Empty or absent means the
    /// `default.goals` configured in Cruise Control are used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goals: Option<Vec<String>>,
    /// Whether hard goals may be skipped during proposal generation
    #[serde(default)]
    pub skip_hard_goal_check: bool,
}

impl From<&RebalanceSpec> for RebalanceOptionsBuilder {
    fn from(spec: &RebalanceSpec) -> Self {
        let mut builder = RebalanceOptionsBuilder::default();
        if let Some(goals) = spec.goals.as_ref().filter(|g| !g.is_empty()) {
            builder = builder.with_goals(goals.iter().cloned());
        }
        if spec.skip_hard_goal_check {
            builder = builder.with_skip_hard_goal_check();
        }
        builder
    }
}

// ============================================================================
// Task Status
// ============================================================================

/// Status of a user task as reported in the `Status` field.
///
/// `Completed` and `Error` are terminal: once observed for a task, the
/// service keeps reporting the same outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum TaskStatus {
    #[strum(to_string = "in-progress", serialize = "active", serialize = "inexecution")]
    InProgress,
    #[strum(to_string = "completed")]
    Completed,
    #[strum(to_string = "error", serialize = "completedwitherror")]
    Error,
}

impl TaskStatus {
    /// Parse a `Status` token. Returns `None` for tokens the client does not
    /// know, which callers must treat as a protocol failure.
    pub fn from_wire(token: &str) -> Option<TaskStatus> {
        token.trim().parse().ok()
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Error)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;
    use strum::IntoEnumIterator;

    const DEFAULT_QUERY: &str = "?dryrun=true&json=true&verbose=false";

    #[test]
    fn default_options_render_default_query() {
        let options = RebalanceOptions::builder().build();
        assert_eq!(options.query_string(), DEFAULT_QUERY);
        assert_eq!(RebalanceOptions::default(), options);
    }

    #[test]
    fn goals_are_appended_in_caller_order() {
        let goals = ["goal.one", "goal.two", "goal.three", "goal.four", "goal.five"];
        let options = RebalanceOptions::builder().with_goals(goals).build();

        assert_eq!(
            options.query_string(),
            "?dryrun=true&json=true&verbose=false&goals=goal.one,goal.two,goal.three,goal.four,goal.five"
        );
    }

    #[test]
    fn goals_are_not_sorted_or_deduplicated() {
        let options = RebalanceOptions::builder()
            .with_goals(["b", "a", "b"])
            .build();
        assert_eq!(
            options.query_string(),
            format!("{}&goals=b,a,b", DEFAULT_QUERY)
        );
    }

    #[test]
    fn empty_goal_list_is_omitted() {
        let options = RebalanceOptions::builder()
            .with_goals(Vec::<String>::new())
            .build();
        assert_eq!(options.query_string(), DEFAULT_QUERY);
        assert_eq!(options.goals(), Some(&[][..]));
    }

    #[test]
    fn with_goals_replaces_previous_list() {
        let options = RebalanceOptions::builder()
            .with_goals(["first"])
            .with_goals(["second", "third"])
            .build();
        assert_eq!(
            options.goals().unwrap(),
            &["second".to_string(), "third".to_string()]
        );
    }

    #[test]
    fn full_run_and_verbose_flags() {
        let options = RebalanceOptions::builder()
            .with_full_run()
            .with_verbose_response()
            .build();
        assert!(!options.is_dry_run());
        assert!(options.is_verbose());
        assert_eq!(
            options.query_string(),
            "?dryrun=false&json=true&verbose=true"
        );
    }

    #[test]
    fn skip_hard_goal_check_renders_last() {
        let options = RebalanceOptions::builder()
            .with_skip_hard_goal_check()
            .with_goals(["g1"])
            .build();
        assert_eq!(
            options.query_string(),
            format!("{}&goals=g1&skip_hard_goal_check=true", DEFAULT_QUERY)
        );
    }

    #[test]
    fn cloned_builders_are_independent() {
        let base = RebalanceOptions::builder().with_goals(["shared"]);
        let dry = base.clone().build();
        let full = base.with_full_run().build();

        assert!(dry.is_dry_run());
        assert!(!full.is_dry_run());
        assert_eq!(dry.goals(), full.goals());
    }

    #[test]
    fn rebalance_spec_converts_to_builder() {
        let spec: RebalanceSpec = serde_json::from_str(
            r#"{"goals": ["RackAwareGoal", "DiskCapacityGoal"], "skipHardGoalCheck": true}"#,
        )
        .unwrap();
        let options = RebalanceOptionsBuilder::from(&spec).build();

        assert_eq!(
            options.query_string(),
            format!(
                "{}&goals=RackAwareGoal,DiskCapacityGoal&skip_hard_goal_check=true",
                DEFAULT_QUERY
            )
        );
    }

    #[test]
    fn rebalance_spec_empty_goals_means_defaults() {
        let spec: RebalanceSpec = serde_json::from_str(r#"{"goals": []}"#).unwrap();
        let options = RebalanceOptionsBuilder::from(&spec).build();
        assert_eq!(options.goals(), None);
        assert_eq!(options.query_string(), DEFAULT_QUERY);
    }

    #[test]
    fn endpoint_paths() {
        assert_eq!(Endpoint::State.path(), "/kafkacruisecontrol/state");
        assert_eq!(Endpoint::Rebalance.path(), "/kafkacruisecontrol/rebalance");
        assert_eq!(
            Endpoint::Stop.path(),
            "/kafkacruisecontrol/stop_proposal_execution"
        );
        for endpoint in Endpoint::iter() {
            assert!(endpoint.path().starts_with("/kafkacruisecontrol/"));
        }
        assert_eq!(Endpoint::Stop.to_string(), "stop");
    }

    #[test]
    fn parameter_keys_match_display() {
        for param in Parameter::iter() {
            assert_eq!(param.key(), param.to_string());
        }
        assert_eq!(Parameter::DryRun.as_pair(false), "dryrun=false");
        assert_eq!(Parameter::Goals.as_list(["x", "y"]), "goals=x,y");
    }

    #[test]
    fn task_status_tokens() {
        assert_eq!(TaskStatus::from_wire("in-progress"), Some(TaskStatus::InProgress));
        assert_eq!(TaskStatus::from_wire("Active"), Some(TaskStatus::InProgress));
        assert_eq!(TaskStatus::from_wire("InExecution"), Some(TaskStatus::InProgress));
        assert_eq!(TaskStatus::from_wire("completed"), Some(TaskStatus::Completed));
        assert_eq!(TaskStatus::from_wire("Completed"), Some(TaskStatus::Completed));
        assert_eq!(
            TaskStatus::from_wire("CompletedWithError"),
            Some(TaskStatus::Error)
        );
        assert_eq!(TaskStatus::from_wire("exploded"), None);

        assert!(!TaskStatus::InProgress.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Error.is_terminal());
        assert_eq!(TaskStatus::InProgress.to_string(), "in-progress");
    }

    quickcheck! {
        fn query_without_goals_has_fixed_order(dry_run: bool, verbose: bool) -> bool {
            let mut builder = RebalanceOptions::builder();
            if !dry_run {
                builder = builder.with_full_run();
            }
            if verbose {
                builder = builder.with_verbose_response();
            }
            builder.build().query_string()
                == format!("?dryrun={}&json=true&verbose={}", dry_run, verbose)
        }

        fn query_with_goals_preserves_order(goals: Vec<String>) -> bool {
            let query = RebalanceOptions::builder()
                .with_goals(goals.clone())
                .build()
                .query_string();
            if goals.is_empty() {
                query == DEFAULT_QUERY
            } else {
                query == format!("{}&goals={}", DEFAULT_QUERY, goals.join(","))
            }
        }
    }
}
