// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Cruise Control client
//!
//! Async client for the Cruise Control REST API used to rebalance Kafka
//! clusters, plus a poller that follows a submitted rebalance (a "user task")
//! until Cruise Control reports it finished.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use cruise_control_client::{
//!     CruiseControlApi, CruiseControlClient, PollOutcome, PollerConfig, RebalanceOptions,
//!     TaskPoller,
//! };
//!
//! # async fn example() -> Result<(), cruise_control_client::CruiseControlError> {
//! let client = Arc::new(CruiseControlClient::new(
//!     "http://cruise-control:9090",
//!     Duration::from_secs(30),
//! )?);
//!
//! let options = RebalanceOptions::builder()
//!     .with_goals(["RackAwareGoal", "DiskCapacityGoal"])
//!     .build();
//! let submission = client.rebalance(&options).await?;
//!
//! let handle = TaskPoller::new(client, PollerConfig::default()).spawn(submission);
//! if let PollOutcome::Completed { response, .. } = handle.join().await? {
//!     println!("{}", response.pretty_print());
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod poller;
pub mod response;

pub use client::{CruiseControlApi, CruiseControlClient};
pub use config::{CruiseControlConfig, PollerConfig};
pub use error::{CruiseControlError, ErrorKind};
pub use poller::{PollHandle, PollOutcome, PollState, TaskPoller};
pub use response::{CruiseControlResponse, ResponseKind};

pub use cruise_control_types::{
    Endpoint, RebalanceOptions, RebalanceOptionsBuilder, RebalanceSpec, TaskStatus,
};
