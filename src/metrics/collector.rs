// src/metrics/collector.rs
use anyhow::Result;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// In-memory registry. Nothing is served over the network; `gather` exists
/// so the counters can be inspected.
pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    pub fn gather(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayDirection {
    ClientToBackend,
    BackendToClient,
}

impl RelayDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayDirection::ClientToBackend => "client_to_backend",
            RelayDirection::BackendToClient => "backend_to_client",
        }
    }
}

pub struct MetricsCollector {
    // Connection metrics
    pub connections_total: IntCounterVec,
    pub relay_bytes_total: IntCounterVec,
    pub active_relays: IntGauge,

    // Backend metrics
    pub backend_requests_total: IntCounterVec,
    pub backend_dial_failures_total: IntCounterVec,
    pub backend_connect_duration_seconds: HistogramVec,
    pub backend_health_status: IntGaugeVec,

    // Pool metrics
    pub healthy_backends: IntGauge,
    pub total_backends: IntGauge,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let connections_total = IntCounterVec::new(
            Opts::new("lb_connections_total", "Accepted client connections by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(connections_total.clone()))?;

        let relay_bytes_total = IntCounterVec::new(
            Opts::new("lb_relay_bytes_total", "Bytes relayed per direction"),
            &["direction"],
        )?;
        registry.register(Box::new(relay_bytes_total.clone()))?;

        let active_relays = IntGauge::new("lb_active_relays", "Relays with a live direction")?;
        registry.register(Box::new(active_relays.clone()))?;

        let backend_requests_total = IntCounterVec::new(
            Opts::new(
                "lb_backend_requests_total",
                "Connections successfully routed to a backend",
            ),
            &["backend"],
        )?;
        registry.register(Box::new(backend_requests_total.clone()))?;

        let backend_dial_failures_total = IntCounterVec::new(
            Opts::new("lb_backend_dial_failures_total", "Failed backend dials"),
            &["backend"],
        )?;
        registry.register(Box::new(backend_dial_failures_total.clone()))?;

        let backend_connect_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "lb_backend_connect_duration_seconds",
                "Backend dial duration",
            ),
            &["backend"],
        )?;
        registry.register(Box::new(backend_connect_duration_seconds.clone()))?;

        let backend_health_status = IntGaugeVec::new(
            Opts::new(
                "lb_backend_health_status",
                "Backend health status (1=healthy, 0=unhealthy)",
            ),
            &["backend"],
        )?;
        registry.register(Box::new(backend_health_status.clone()))?;

        let healthy_backends =
            IntGauge::new("lb_healthy_backends", "Number of healthy backends")?;
        registry.register(Box::new(healthy_backends.clone()))?;

        let total_backends = IntGauge::new("lb_total_backends", "Total number of backends")?;
        registry.register(Box::new(total_backends.clone()))?;

        Ok(Self {
            connections_total,
            relay_bytes_total,
            active_relays,
            backend_requests_total,
            backend_dial_failures_total,
            backend_connect_duration_seconds,
            backend_health_status,
            healthy_backends,
            total_backends,
        })
    }

    pub fn record_routed(&self, backend: &str, connect_duration: Duration) {
        self.connections_total.with_label_values(&["routed"]).inc();
        self.backend_requests_total
            .with_label_values(&[backend])
            .inc();
        self.backend_connect_duration_seconds
            .with_label_values(&[backend])
            .observe(connect_duration.as_secs_f64());
    }

    pub fn record_dial_failure(&self, backend: &str, connect_duration: Duration) {
        self.connections_total
            .with_label_values(&["dial_failed"])
            .inc();
        self.backend_dial_failures_total
            .with_label_values(&[backend])
            .inc();
        self.backend_connect_duration_seconds
            .with_label_values(&[backend])
            .observe(connect_duration.as_secs_f64());
    }

    pub fn record_rejected(&self) {
        self.connections_total.with_label_values(&["rejected"]).inc();
    }

    pub fn record_relay_bytes(&self, direction: RelayDirection, bytes: u64) {
        self.relay_bytes_total
            .with_label_values(&[direction.as_str()])
            .inc_by(bytes);
    }

    pub fn relay_started(&self) {
        self.active_relays.inc();
    }

    pub fn relay_finished(&self) {
        self.active_relays.dec();
    }

    pub fn update_backend_health(&self, backend: &str, healthy: bool) {
        let value = if healthy { 1 } else { 0 };
        self.backend_health_status
            .with_label_values(&[backend])
            .set(value);
    }

    pub fn update_backend_counts(&self, healthy: usize, total: usize) {
        self.healthy_backends.set(healthy as i64);
        self.total_backends.set(total as i64);
    }
}

// Helper for timing operations
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_render_in_text_format() {
        let registry = MetricsRegistry::new().unwrap();
        let metrics = registry.collector();

        metrics.record_routed("localhost:8081", Duration::from_millis(2));
        metrics.record_dial_failure("localhost:8082", Duration::from_millis(1));
        metrics.record_relay_bytes(RelayDirection::ClientToBackend, 42);
        metrics.update_backend_health("localhost:8082", false);
        metrics.update_backend_counts(3, 4);

        assert_eq!(
            metrics
                .backend_requests_total
                .with_label_values(&["localhost:8081"])
                .get(),
            1
        );
        assert_eq!(
            metrics.connections_total.with_label_values(&["dial_failed"]).get(),
            1
        );

        let text = registry.gather().unwrap();
        assert!(text.contains("lb_backend_requests_total{backend=\"localhost:8081\"} 1"));
        assert!(text.contains("lb_relay_bytes_total{direction=\"client_to_backend\"} 42"));
        assert!(text.contains("lb_backend_health_status{backend=\"localhost:8082\"} 0"));
        assert!(text.contains("lb_healthy_backends 3"));
    }

    #[test]
    fn test_active_relays_gauge() {
        let registry = MetricsRegistry::new().unwrap();
        let metrics = registry.collector();
        metrics.relay_started();
        metrics.relay_started();
        metrics.relay_finished();
        assert_eq!(metrics.active_relays.get(), 1);
    }
}
