//! fleet-rollout — rolling deploys across the proxy fleet.
//!
//! A rollout walks the host list in order. Each host gets the deploy
//! command over the remote executor and must then pass its health gate
//! before the next host is touched. The first failure halts the rollout;
//! there is no rollback.
//!
//! # Components
//!
//! - **`executor`** — `RemoteExecutor` trait and the `ssh`/`scp` implementation
//! - **`controller`** — sequential rollout with health gates
//! - **`setup`** — one-time node preparation and install instructions

pub mod controller;
pub mod executor;
pub mod setup;

pub use controller::{HostOutcome, Rollout, RolloutEvent, RolloutPhase, RolloutReport, Step, validate_version};
pub use executor::{RemoteCommand, RemoteExecutor, RemoteStatus, SshExecutor, shell_quote};
pub use setup::{RegistryCredentials, SetupFailure, SetupReport, install_instructions, setup_nodes};
