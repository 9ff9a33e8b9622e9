// src/proxy/backend.rs
use chrono::{DateTime, Utc};
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::RwLock;
use tokio::time::timeout;

use crate::config::BackendConfig;

#[derive(Debug)]
pub struct Backend {
    pub id: String,
    pub host: String,
    pub port: u16,

    // Runtime state
    total_requests: AtomicU64,
    health: RwLock<HealthState>,
}

#[derive(Debug)]
struct HealthState {
    healthy: bool,
    last_transition: Option<DateTime<Utc>>,
}

impl Backend {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        let id = format!("{}:{}", host, port);

        Self {
            id,
            host,
            port,
            total_requests: AtomicU64::new(0),
            health: RwLock::new(HealthState {
                healthy: true,
                last_transition: None,
            }),
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(config.host.clone(), config.port)
    }

    pub async fn is_healthy(&self) -> bool {
        self.health.read().await.healthy
    }

    /// Sets the health flag and returns `true` only if the value changed.
    /// The comparison and the write happen under one write lock.
    pub async fn set_health(&self, healthy: bool) -> bool {
        let mut state = self.health.write().await;
        if state.healthy == healthy {
            return false;
        }
        state.healthy = healthy;
        state.last_transition = Some(Utc::now());
        true
    }

    pub fn increment_requests(&self) -> u64 {
        self.total_requests.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::SeqCst)
    }

    pub async fn connect(&self) -> io::Result<TcpStream> {
        TcpStream::connect((self.host.as_str(), self.port)).await
    }

    /// Single TCP connect attempt bounded by `limit`. The probe socket is
    /// dropped as soon as it is established.
    pub async fn probe(&self, limit: Duration) -> bool {
        match timeout(limit, self.connect()).await {
            Ok(Ok(stream)) => {
                drop(stream);
                true
            }
            Ok(Err(e)) => {
                tracing::debug!(backend = %self.id, error = %e, "probe failed");
                false
            }
            Err(_) => {
                tracing::debug!(backend = %self.id, "probe timed out after {:?}", limit);
                false
            }
        }
    }

    pub async fn snapshot(&self) -> BackendSnapshot {
        let state = self.health.read().await;
        BackendSnapshot {
            id: self.id.clone(),
            host: self.host.clone(),
            port: self.port,
            total_requests: self.total_requests(),
            healthy: state.healthy,
            last_transition: state.last_transition,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSnapshot {
    pub id: String,
    pub host: String,
    pub port: u16,
    pub total_requests: u64,
    pub healthy: bool,
    pub last_transition: Option<DateTime<Utc>>,
}

impl fmt::Display for BackendSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} requests={} healthy={}",
            self.host, self.port, self.total_requests, self.healthy
        )?;
        if let Some(at) = self.last_transition {
            write!(f, " last_transition={}", at.to_rfc3339())?;
        }
        Ok(())
    }
}
