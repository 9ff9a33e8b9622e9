// ────────────────────────────────
// src/proxy/proxy.rs
// Service context shared by the listener and the health checker, and the
// per-connection relay logic.
// ────────────────────────────────

use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Level};

use super::{relay, BackendPool, IncomingConnection};
use crate::config::Config;
use crate::health::HealthChecker;
use crate::load_balancer::{create_load_balancer, LoadBalancer};
use crate::metrics::{MetricsCollector, Timer};

pub struct Proxy {
    config: Config,
    pool: Arc<BackendPool>,
    balancer: Arc<dyn LoadBalancer>,
    metrics: Arc<MetricsCollector>,
}

impl Proxy {
    pub fn new(config: Config, pool: Arc<BackendPool>, metrics: Arc<MetricsCollector>) -> Self {
        let balancer = create_load_balancer(config.load_balancer, pool.clone());
        metrics.update_backend_counts(pool.len(), pool.len());
        for backend in pool.all_backends() {
            metrics.update_backend_health(&backend.id, true);
        }

        Self {
            config,
            pool,
            balancer,
            metrics,
        }
    }

    pub fn pool(&self) -> &Arc<BackendPool> {
        &self.pool
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    /// Spawns the periodic health checker. It runs until the runtime stops.
    pub fn start_health_checker(&self) -> JoinHandle<()> {
        let checker = Arc::new(HealthChecker::new(
            self.config.health_check.clone(),
            self.pool.clone(),
            Some(self.metrics.clone()),
        ));
        tokio::spawn(checker.start())
    }

    /// Routes one client connection. Returns once the relay tasks are
    /// launched, or after the client has been told the backend is down.
    pub async fn handle(&self, conn: IncomingConnection) -> Result<(), ProxyError> {
        let backend = self
            .balancer
            .next_backend()
            .ok_or(ProxyError::NoBackends)?;

        let timer = Timer::new();
        let upstream = match backend.connect().await {
            Ok(upstream) => upstream,
            Err(source) => {
                self.metrics
                    .record_dial_failure(&backend.id, timer.elapsed());
                warn!(
                    backend = %backend.id,
                    error = %source,
                    "Error connecting to backend server at {}",
                    backend.id
                );

                if backend.set_health(false).await {
                    warn!(backend = %backend.id, "Backend marked unhealthy after dial failure");
                    self.metrics.update_backend_health(&backend.id, false);
                    self.pool.log_snapshot(Level::DEBUG).await;
                }

                self.reject_client(conn).await;
                return Err(ProxyError::Dial {
                    backend: backend.id.clone(),
                    source,
                });
            }
        };

        info!(backend = %backend.id, "Request routed to {}", backend.id);

        if backend.set_health(true).await {
            info!(backend = %backend.id, "Backend recovered after successful dial");
            self.metrics.update_backend_health(&backend.id, true);
        }

        backend.increment_requests();
        self.metrics.record_routed(&backend.id, timer.elapsed());
        debug!(
            backend = %backend.id,
            waited_ms = conn.age_ms(),
            "relay starting"
        );
        self.pool.log_snapshot(Level::DEBUG).await;

        relay::spawn_relay(conn.stream, upstream, self.metrics.clone());
        Ok(())
    }

    async fn reject_client(&self, conn: IncomingConnection) {
        let mut stream = conn.stream;
        let message = self.config.listener.failure_message.as_bytes();

        if let Err(e) = stream.write_all(message).await {
            debug!(peer = %conn.peer, error = %e, "could not notify client");
        }
        let _ = stream.shutdown().await;
    }
}

// Custom error type for proxy operations
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("No backends configured")]
    NoBackends,

    #[error("Failed to connect to backend {backend}: {source}")]
    Dial {
        backend: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use crate::metrics::MetricsRegistry;
    use std::net::SocketAddr;
    use tokio::io::AsyncReadExt;
    use tokio::net::{TcpListener, TcpStream};

    async fn incoming() -> (TcpStream, IncomingConnection) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (client, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
        let (stream, peer) = accepted.unwrap();
        (client.unwrap(), IncomingConnection::new(stream, peer))
    }

    async fn dead_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        addr.port()
    }

    fn proxy_for(ports: &[u16]) -> (Proxy, MetricsRegistry) {
        let config = Config {
            backends: ports
                .iter()
                .map(|&p| BackendConfig::new("127.0.0.1", p))
                .collect(),
            ..Config::default()
        };
        let registry = MetricsRegistry::new().unwrap();
        let pool = Arc::new(BackendPool::new(&config.backends));
        let proxy = Proxy::new(config, pool, registry.collector());
        (proxy, registry)
    }

    #[tokio::test]
    async fn test_dial_failure_notifies_client_and_marks_unhealthy() {
        let port = dead_port().await;
        let (proxy, _registry) = proxy_for(&[port]);
        let backend = proxy.pool().get(0).unwrap().clone();

        let (mut client, conn) = incoming().await;
        let err = proxy.handle(conn).await.unwrap_err();
        assert!(matches!(err, ProxyError::Dial { .. }));

        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"Server is down");

        assert!(!backend.is_healthy().await);
        assert_eq!(backend.total_requests(), 0);
        assert_eq!(
            proxy
                .metrics()
                .backend_dial_failures_total
                .with_label_values(&[backend.id.as_str()])
                .get(),
            1
        );
    }

    #[tokio::test]
    async fn test_successful_dial_recovers_health_and_counts_once() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (proxy, _registry) = proxy_for(&[port]);
        let backend = proxy.pool().get(0).unwrap().clone();
        backend.set_health(false).await;

        let (_client, conn) = incoming().await;
        proxy.handle(conn).await.unwrap();

        assert!(backend.is_healthy().await);
        assert_eq!(backend.total_requests(), 1);
        assert_eq!(
            proxy
                .metrics()
                .backend_health_status
                .with_label_values(&[backend.id.as_str()])
                .get(),
            1
        );
    }
}
