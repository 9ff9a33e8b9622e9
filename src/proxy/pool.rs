//
// src/proxy/pool.rs
//

use super::backend::{Backend, BackendSnapshot};
use crate::config::BackendConfig;
use std::sync::Arc;

/// Ordered, fixed-size set of backends. Order defines the rotation and
/// membership never changes after construction.
#[derive(Debug, Clone)]
pub struct BackendPool {
    backends: Arc<[Arc<Backend>]>,
}

impl BackendPool {
    pub fn new(configs: &[BackendConfig]) -> Self {
        let backends = configs
            .iter()
            .map(|config| Arc::new(Backend::from_config(config)))
            .collect::<Vec<_>>();

        Self {
            backends: backends.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Backend>> {
        self.backends.get(index)
    }

    pub fn get_backend(&self, id: &str) -> Option<Arc<Backend>> {
        self.backends.iter().find(|b| b.id == id).cloned()
    }

    pub fn all_backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub async fn healthy_count(&self) -> usize {
        let mut healthy = 0;
        for backend in self.backends.iter() {
            if backend.is_healthy().await {
                healthy += 1;
            }
        }
        healthy
    }

    pub async fn snapshot(&self) -> Vec<BackendSnapshot> {
        let mut snapshots = Vec::with_capacity(self.backends.len());
        for backend in self.backends.iter() {
            snapshots.push(backend.snapshot().await);
        }
        snapshots
    }

    /// Emits one line per backend with host, port, request count and health.
    pub async fn log_snapshot(&self, level: tracing::Level) {
        for snapshot in self.snapshot().await {
            if level == tracing::Level::DEBUG {
                tracing::debug!(backend = %snapshot.id, "{}", snapshot);
            } else {
                tracing::info!(backend = %snapshot.id, "{}", snapshot);
            }
        }
    }
}
