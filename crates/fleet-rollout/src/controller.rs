//! Rollout controller — deploys a version to each host in order.
//!
//! For every host the controller runs the remote deploy command, then
//! holds at a health gate until the host's probe reports healthy. The
//! first failure ends the rollout: hosts already deployed stay on the new
//! version, later hosts are never contacted, nothing is rolled back.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use fleet_core::{FleetError, FleetResult, HostList};
use fleet_health::{HealthProbe, PollPolicy, ProbeResult, WaitOutcome, wait_until};

use crate::executor::{RemoteCommand, RemoteExecutor};

/// Current phase of a rollout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RolloutPhase {
    /// Rollout not started.
    Pending,
    /// Running the deploy command on host `index` (0-based).
    Deploying { index: usize, host: String },
    /// Waiting for host `index` to report healthy.
    HealthGate { index: usize, host: String },
    /// Every host deployed and healthy.
    Completed,
    /// Stopped at `host` during `step`.
    Halted { host: String, step: Step },
}

/// Per-host step that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Deploy,
    Healthcheck,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Deploy => f.write_str("deploy"),
            Step::Healthcheck => f.write_str("healthcheck"),
        }
    }
}

/// Progress notifications for whoever drives the rollout.
#[derive(Debug, Clone, Copy)]
pub enum RolloutEvent<'a> {
    HostStarted {
        index: usize,
        total: usize,
        host: &'a str,
        version: &'a str,
    },
    Deploying {
        host: &'a str,
        command: &'a str,
    },
    Probed {
        host: &'a str,
        url: &'a str,
        attempt: u32,
        result: ProbeResult,
        policy: PollPolicy,
    },
    HostHealthy {
        host: &'a str,
        attempts: u32,
        elapsed: Duration,
    },
}

/// Outcome for one host of a finished rollout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostOutcome {
    pub host: String,
    pub deploy_time: Duration,
    pub health_attempts: u32,
    pub health_time: Duration,
}

/// Summary of a successful rollout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolloutReport {
    pub version: String,
    pub hosts: Vec<HostOutcome>,
    pub elapsed: Duration,
}

/// Sequential rollout over a host list.
pub struct Rollout<E, P> {
    executor: E,
    probe: P,
    policy: PollPolicy,
    script: String,
    phase: RolloutPhase,
}

impl<E: RemoteExecutor, P: HealthProbe> Rollout<E, P> {
    pub fn new(executor: E, probe: P, policy: PollPolicy, script: impl Into<String>) -> Self {
        Self {
            executor,
            probe,
            policy,
            script: script.into(),
            phase: RolloutPhase::Pending,
        }
    }

    pub fn phase(&self) -> &RolloutPhase {
        &self.phase
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Deploy `version` to every host in `hosts`, in order.
    ///
    /// `observer` sees every step as it happens; it is not consulted for
    /// control flow.
    pub async fn run<O>(
        &mut self,
        version: &str,
        hosts: &HostList,
        observer: O,
    ) -> FleetResult<RolloutReport>
    where
        O: Fn(&RolloutEvent<'_>),
    {
        let version = validate_version(version)?;
        if hosts.is_empty() {
            return Err(FleetError::HostListEmpty(hosts.source().to_path_buf()));
        }

        let started = Instant::now();
        let total = hosts.len();
        let mut outcomes = Vec::with_capacity(total);
        info!(version, hosts = total, "starting rollout");

        for (index, host) in hosts.iter().enumerate() {
            observer(&RolloutEvent::HostStarted {
                index,
                total,
                host,
                version,
            });

            self.phase = RolloutPhase::Deploying {
                index,
                host: host.to_string(),
            };
            let deploy_time = match self.deploy(host, version, &observer).await {
                Ok(t) => t,
                Err(e) => {
                    self.halt(host, Step::Deploy);
                    return Err(e);
                }
            };

            self.phase = RolloutPhase::HealthGate {
                index,
                host: host.to_string(),
            };
            let (health_attempts, health_time) = match self.await_healthy(host, &observer).await {
                Ok(v) => v,
                Err(e) => {
                    self.halt(host, Step::Healthcheck);
                    return Err(e);
                }
            };

            outcomes.push(HostOutcome {
                host: host.to_string(),
                deploy_time,
                health_attempts,
                health_time,
            });
            debug!(host, index, "host done, advancing");
        }

        self.phase = RolloutPhase::Completed;
        let elapsed = started.elapsed();
        info!(version, ?elapsed, "rollout completed");

        Ok(RolloutReport {
            version: version.to_string(),
            hosts: outcomes,
            elapsed,
        })
    }

    async fn deploy<O>(&self, host: &str, version: &str, observer: &O) -> FleetResult<Duration>
    where
        O: Fn(&RolloutEvent<'_>),
    {
        let command = RemoteCommand::deploy(&self.script, version);
        let described = self.executor.describe(host, &command);
        observer(&RolloutEvent::Deploying {
            host,
            command: &described,
        });

        let started = Instant::now();
        let status = match self.executor.execute(host, &command).await {
            Ok(status) => status,
            Err(e) => {
                warn!(host, error = %e, "could not start deploy command");
                return Err(FleetError::Deployment {
                    host: host.to_string(),
                    command: described,
                    code: None,
                });
            }
        };

        if !status.success() {
            warn!(host, code = ?status.code, "deploy command failed");
            return Err(FleetError::Deployment {
                host: host.to_string(),
                command: described,
                code: status.code,
            });
        }
        Ok(started.elapsed())
    }

    async fn await_healthy<O>(&self, host: &str, observer: &O) -> FleetResult<(u32, Duration)>
    where
        O: Fn(&RolloutEvent<'_>),
    {
        let url = self.probe.target(host);
        let probe = &self.probe;
        let policy = self.policy;
        let url_ref = url.as_str();

        let outcome = wait_until(policy, move |attempt| async move {
            let result = probe.probe(host).await;
            observer(&RolloutEvent::Probed {
                host,
                url: url_ref,
                attempt,
                result,
                policy,
            });
            result.is_healthy()
        })
        .await;

        match outcome {
            WaitOutcome::Ready { attempts, elapsed } => {
                observer(&RolloutEvent::HostHealthy {
                    host,
                    attempts,
                    elapsed,
                });
                Ok((attempts, elapsed))
            }
            WaitOutcome::TimedOut { attempts, elapsed } => {
                warn!(host, attempts, ?elapsed, "healthcheck timed out");
                Err(FleetError::HealthcheckTimeout {
                    host: host.to_string(),
                    url,
                    timeout: policy.timeout,
                })
            }
        }
    }

    fn halt(&mut self, host: &str, step: Step) {
        warn!(host, %step, "halting rollout");
        self.phase = RolloutPhase::Halted {
            host: host.to_string(),
            step,
        };
    }
}

/// Trim a version and reject it if nothing is left.
pub fn validate_version(version: &str) -> FleetResult<&str> {
    let version = version.trim();
    if version.is_empty() {
        return Err(FleetError::Input("no version to deploy".to_string()));
    }
    Ok(version)
}
