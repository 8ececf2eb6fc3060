//! Composite dependency health checking.
//!
//! [`HealthAggregator`] runs every registered [`Probe`] concurrently, each
//! under its own timeout, and folds the outcomes into a [`HealthReport`].
//! The gateway is healthy only when every dependency is.

pub mod probes;

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::time::Instant;
use tracing::error;

use crate::traits::Probe;

pub use probes::{BrokerProbe, QueryServiceProbe};

// ---------------------------------------------------------------------------
// HealthConfig
// ---------------------------------------------------------------------------

/// Health check tuning.
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Upper bound on a single probe. A probe still running when it elapses
    /// is reported as failed.
    pub probe_timeout: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_millis(3000),
        }
    }
}

// ---------------------------------------------------------------------------
// ProbeResult / HealthReport
// ---------------------------------------------------------------------------

/// Outcome of checking one dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub dependency: &'static str,
    /// Why the dependency is unhealthy; `None` when the probe succeeded.
    pub error: Option<String>,
    pub elapsed: Duration,
}

impl ProbeResult {
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcomes of one health check, in probe registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthReport {
    pub results: Vec<ProbeResult>,
}

impl HealthReport {
    /// Healthy iff every probe succeeded.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.results.iter().all(ProbeResult::is_healthy)
    }

    /// The failed probes.
    pub fn failures(&self) -> impl Iterator<Item = &ProbeResult> {
        self.results.iter().filter(|r| !r.is_healthy())
    }

    /// `"<dependency>: <error>"` for each failure, joined by `"; "`.
    #[must_use]
    pub fn failure_summary(&self) -> String {
        self.failures()
            .map(|r| format!("{}: {}", r.dependency, r.error.as_deref().unwrap_or_default()))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

// ---------------------------------------------------------------------------
// HealthAggregator
// ---------------------------------------------------------------------------

/// Runs a fixed set of probes concurrently.
#[derive(Clone)]
pub struct HealthAggregator {
    probes: Vec<Arc<dyn Probe>>,
    probe_timeout: Duration,
}

impl HealthAggregator {
    #[must_use]
    pub fn new(probes: Vec<Arc<dyn Probe>>, config: &HealthConfig) -> Self {
        Self {
            probes,
            probe_timeout: config.probe_timeout,
        }
    }

    /// Names of the checked dependencies, in registration order.
    #[must_use]
    pub fn dependencies(&self) -> Vec<&'static str> {
        self.probes.iter().map(|p| p.name()).collect()
    }

    /// Check every dependency. Total latency is roughly that of the slowest
    /// probe, capped by the probe timeout.
    pub async fn check(&self) -> HealthReport {
        let checks = self
            .probes
            .iter()
            .map(|probe| run_probe(probe.as_ref(), self.probe_timeout));

        HealthReport {
            results: join_all(checks).await,
        }
    }
}

impl std::fmt::Debug for HealthAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthAggregator")
            .field("dependencies", &self.dependencies())
            .field("probe_timeout", &self.probe_timeout)
            .finish()
    }
}

async fn run_probe(probe: &dyn Probe, timeout: Duration) -> ProbeResult {
    let dependency = probe.name();
    let start = Instant::now();

    let error = match tokio::time::timeout(timeout, probe.check()).await {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(format!("{e:#}")),
        Err(_elapsed) => Some(format!("timed out after {}ms", timeout.as_millis())),
    };

    let up = if let Some(ref e) = error {
        error!(dependency, error = %e, "Health check failed");
        0.0
    } else {
        1.0
    };
    metrics::gauge!("bob_dependency_up", "dependency" => dependency).set(up);

    ProbeResult {
        dependency,
        error,
        elapsed: start.elapsed(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
