// src/health/checker.rs
use crate::config::HealthCheckConfig;
use crate::metrics::MetricsCollector;
use crate::proxy::{Backend, BackendPool};
use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn, Level};

pub struct HealthChecker {
    config: HealthCheckConfig,
    pool: Arc<BackendPool>,
    metrics: Option<Arc<MetricsCollector>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheckResult {
    pub backend_id: String,
    pub healthy: bool,
    /// Whether this probe flipped the backend's health flag.
    pub transitioned: bool,
    pub response_time_ms: u64,
}

impl HealthChecker {
    pub fn new(
        config: HealthCheckConfig,
        pool: Arc<BackendPool>,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Self {
        Self {
            config,
            pool,
            metrics,
        }
    }

    /// Sweeps the pool once per interval, forever. The first sweep runs
    /// immediately.
    pub async fn start(self: Arc<Self>) {
        let mut ticker = interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Starting health checker with interval: {:?}, probe timeout: {:?}",
            self.config.interval(),
            self.config.timeout()
        );

        loop {
            ticker.tick().await;
            self.check_all_backends().await;
        }
    }

    /// Probes every backend concurrently, applies the transitions, then
    /// reports the pool snapshot.
    pub async fn check_all_backends(&self) -> Vec<HealthCheckResult> {
        let checks = self
            .pool
            .all_backends()
            .iter()
            .map(|backend| self.check_backend(backend));
        let results = futures::future::join_all(checks).await;

        let healthy_count = results.iter().filter(|r| r.healthy).count();
        let total = self.pool.len();

        if let Some(metrics) = &self.metrics {
            metrics.update_backend_counts(self.pool.healthy_count().await, total);
        }

        info!(
            "Health check complete: {} healthy, {} unhealthy",
            healthy_count,
            total - healthy_count
        );
        self.pool.log_snapshot(Level::INFO).await;

        results
    }

    async fn check_backend(&self, backend: &Arc<Backend>) -> HealthCheckResult {
        let start = std::time::Instant::now();
        let reachable = backend.probe(self.config.timeout()).await;
        let response_time_ms = start.elapsed().as_millis() as u64;

        // set_health is a no-op when the flag already matches
        let transitioned = backend.set_health(reachable).await;

        if transitioned {
            if reachable {
                info!(backend = %backend.id, "Backend {} is now healthy", backend.id);
            } else {
                warn!(backend = %backend.id, "Backend {} is now unhealthy", backend.id);
            }
            if let Some(metrics) = &self.metrics {
                metrics.update_backend_health(&backend.id, reachable);
            }
        } else {
            debug!(
                backend = %backend.id,
                healthy = reachable,
                response_time_ms,
                "health unchanged"
            );
        }

        HealthCheckResult {
            backend_id: backend.id.clone(),
            healthy: reachable,
            transitioned,
            response_time_ms,
        }
    }
}
