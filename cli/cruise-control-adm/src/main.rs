// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Cruise Control administration CLI
//!
//! Queries Cruise Control state, submits rebalances (dry run by default),
//! follows user tasks and stops proposal execution.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cruise_control_client::{
    CruiseControlApi, CruiseControlClient, CruiseControlConfig, CruiseControlResponse, PollOutcome,
    RebalanceOptions, ResponseKind, TaskPoller, metrics,
};
use tracing::{debug, warn};

#[derive(Parser)]
#[command(name = "cruise-control-adm")]
#[command(about = "Cruise Control client utility", long_about = None)]
#[command(version)]
struct Cli {
    /// Base URL of the Cruise Control REST API
    #[arg(long, env = "CRUISE_CONTROL_URL")]
    url: Option<String>,

    /// JSON configuration file (fields not given take their defaults)
    #[arg(long, env = "CRUISE_CONTROL_CONFIG")]
    config: Option<PathBuf>,

    /// HTTP request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Delay before the first status poll, in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Status polls before giving up on a user task
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Print Prometheus metrics to stderr when done
    #[arg(long)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show executor, analyzer and monitor state
    State {
        /// Include detailed state
        #[arg(long)]
        verbose: bool,
    },

    /// Request a rebalance proposal, or execute one with --full-run
    Rebalance {
        /// Execute the proposal instead of a dry run
        #[arg(long)]
        full_run: bool,

        /// Include the individual partition movements in the reply
        #[arg(long)]
        verbose: bool,

        /// Comma separated goals, in priority order
        #[arg(long, value_delimiter = ',')]
        goals: Vec<String>,

        /// Do not require the configured hard goals to be in the goal list
        #[arg(long)]
        skip_hard_goal_check: bool,

        /// Poll the user task until it finishes
        #[arg(long)]
        wait: bool,
    },

    /// Show the status of a user task
    Task {
        /// User task id returned by a rebalance
        user_task_id: String,

        /// Poll the user task until it finishes
        #[arg(long)]
        wait: bool,
    },

    /// Stop the ongoing proposal execution
    Stop,
}

impl Cli {
    async fn load_config(&self) -> Result<CruiseControlConfig> {
        let mut config = match &self.config {
            Some(path) => CruiseControlConfig::from_file(path).await?,
            None => CruiseControlConfig::default(),
        };

        if let Some(url) = &self.url {
            config.base_url = url.clone();
        }
        if let Some(timeout) = self.timeout {
            config.http_timeout_secs = timeout;
        }
        if let Some(interval) = self.poll_interval_ms {
            config.poll.poll_interval_ms = interval;
        }
        if let Some(attempts) = self.max_attempts {
            config.poll.max_attempts = attempts;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| {
                "cruise_control_adm=info,cruise_control_client=info".to_string()
            }),
        ))
        .init();

    if cli.metrics {
        metrics::register_metrics().context("Failed to register metrics")?;
    }

    let config = cli.load_config().await?;
    debug!(base_url = %config.base_url, "Using Cruise Control");

    let client = CruiseControlClient::from_config(&config)
        .context("Failed to create Cruise Control client")?;
    let client = Arc::new(client);
    let poller = TaskPoller::new(client.clone(), config.poll.clone());

    let result = run(&cli.command, client, poller).await;

    if cli.metrics {
        eprint!("{}", metrics::gather_metrics());
    }

    result
}

async fn run(
    command: &Commands,
    client: Arc<CruiseControlClient>,
    poller: TaskPoller,
) -> Result<()> {
    match command {
        Commands::State { verbose } => {
            let response = client
                .get_cruise_control_state(*verbose)
                .await
                .context("Failed to get Cruise Control state")?;
            println!("{}", response.pretty_print());
        }

        Commands::Rebalance {
            full_run,
            verbose,
            goals,
            skip_hard_goal_check,
            wait,
        } => {
            let options = rebalance_options(*full_run, *verbose, goals, *skip_hard_goal_check);
            let response = client
                .rebalance(&options)
                .await
                .context("Failed to submit rebalance")?;

            if *wait && response.kind() == ResponseKind::Pending {
                println!("User Task ID: {}", response.user_task_id());
                wait_for(poller, response).await?;
            } else {
                print_submission(&response);
            }
        }

        Commands::Task { user_task_id, wait } => {
            let response = client
                .get_user_task_status(user_task_id)
                .await
                .with_context(|| format!("Failed to get status of user task {}", user_task_id))?;

            if *wait && response.kind() == ResponseKind::Pending {
                wait_for(poller, response).await?;
            } else {
                println!("{}", response.pretty_print());
            }
        }

        Commands::Stop => {
            let response = client
                .stop_execution()
                .await
                .context("Failed to stop proposal execution")?;
            println!("{}", response.pretty_print());
        }
    }

    Ok(())
}

fn rebalance_options(
    full_run: bool,
    verbose: bool,
    goals: &[String],
    skip_hard_goal_check: bool,
) -> RebalanceOptions {
    let mut builder = RebalanceOptions::builder();
    if full_run {
        builder = builder.with_full_run();
    }
    if verbose {
        builder = builder.with_verbose_response();
    }
    if !goals.is_empty() {
        builder = builder.with_goals(goals.iter().cloned());
    }
    if skip_hard_goal_check {
        builder = builder.with_skip_hard_goal_check();
    }
    builder.build()
}

fn print_submission(response: &CruiseControlResponse) {
    match response.kind() {
        ResponseKind::NotEnoughData => {
            warn!("Cruise Control has not collected enough metrics yet; retry later");
            println!("{}", response.pretty_print());
        }
        ResponseKind::Pending => {
            println!(
                "Rebalance accepted, follow it with: cruise-control-adm task {} --wait",
                response.user_task_id()
            );
        }
        ResponseKind::Proposal => println!("{}", response.pretty_print()),
    }
}

/// Poll until the task finishes or Ctrl-C is pressed.
async fn wait_for(poller: TaskPoller, submission: CruiseControlResponse) -> Result<()> {
    let handle = poller.spawn(submission);
    let cancel = handle.cancellation_token();
    let outcome = until_interrupted(handle.join(), tokio::signal::ctrl_c(), || cancel.cancel())
        .await
        .context("Polling user task failed")?;

    match outcome {
        PollOutcome::Completed { response, attempts } => {
            debug!(attempts, "User task finished");
            println!("{}", response.pretty_print());
        }
        PollOutcome::NotEnoughData { response, .. } => {
            warn!("Cruise Control has not collected enough metrics yet; retry later");
            println!("{}", response.pretty_print());
        }
        PollOutcome::Cancelled => eprintln!("Cancelled."),
    }

    Ok(())
}

/// Await `task`, calling `on_interrupt` once if `interrupt` fires first.
///
/// A failure to listen for the interrupt leaves `task` running undisturbed.
async fn until_interrupted<T, I, F>(task: T, interrupt: I, on_interrupt: F) -> T::Output
where
    T: Future,
    I: Future<Output = std::io::Result<()>>,
    F: FnOnce(),
{
    tokio::pin!(task);

    tokio::select! {
        output = &mut task => return output,
        signal = interrupt => match signal {
            Ok(()) => on_interrupt(),
            Err(e) => warn!(error = %e, "Unable to listen for Ctrl-C; polling continues"),
        },
    }

    task.await
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_cmd::Command;
    use escargot::CargoBuild;
    use predicates::prelude::*;

    /// Build the binary and return a Command to run it.
    #[allow(clippy::expect_used)]
    fn build_cmd() -> Command {
        let cargo_build = CargoBuild::new()
            .bin("cruise-control-adm")
            .current_release()
            .run()
            .expect("failed to build cruise-control-adm");
        Command::from_std(cargo_build.command())
    }

    #[test]
    fn no_params() {
        build_cmd()
            .assert()
            .failure()
            .stderr(predicate::str::contains("Usage:"))
            .stderr(predicate::str::contains("cruise-control-adm"));
    }

    #[test]
    fn task_requires_id() {
        build_cmd()
            .args(["task"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("<USER_TASK_ID>"))
            .stderr(predicate::str::contains("required"));
    }

    #[test]
    fn stop_rejects_extra_params() {
        build_cmd()
            .args(["stop", "now"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("unexpected argument"));
    }

    #[tokio::test]
    async fn interrupt_cancels_the_task() {
        let cancelled = std::cell::Cell::new(false);
        let output = until_interrupted(
            async {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                "finished"
            },
            std::future::ready(Ok(())),
            || cancelled.set(true),
        )
        .await;

        assert_eq!(output, "finished");
        assert!(cancelled.get());
    }

    #[tokio::test]
    async fn failed_signal_listener_does_not_cancel() {
        let cancelled = std::cell::Cell::new(false);
        let output = until_interrupted(
            async {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                "finished"
            },
            std::future::ready(Err(std::io::Error::other("signal unavailable"))),
            || cancelled.set(true),
        )
        .await;

        assert_eq!(output, "finished");
        assert!(!cancelled.get());
    }

    #[test]
    fn default_options_are_a_dry_run() {
        let options = rebalance_options(false, false, &[], false);
        assert_eq!(options.query_string(), "?dryrun=true&json=true&verbose=false");
    }

    #[test]
    fn goal_flags_become_query_parameters() {
        let goals = vec!["RackAwareGoal".to_string(), "DiskCapacityGoal".to_string()];
        let options = rebalance_options(true, true, &goals, true);
        assert_eq!(
            options.query_string(),
            "?dryrun=false&json=true&verbose=true&goals=RackAwareGoal,DiskCapacityGoal\
             &skip_hard_goal_check=true"
        );
    }
}
