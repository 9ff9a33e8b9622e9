// src/load_balancer/round_robin.rs
use crate::load_balancer::LoadBalancer;
use crate::proxy::{Backend, BackendPool};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Cyclic cursor over the pool. The cursor starts at 0 and is advanced
/// before it is read, so the first selection is the pool's second entry.
/// Health is not consulted.
pub struct RoundRobinSelector {
    pool: Arc<BackendPool>,
    cursor: AtomicUsize,
}

impl RoundRobinSelector {
    pub fn new(pool: Arc<BackendPool>) -> Self {
        Self {
            pool,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Advances the cursor and returns the new index, as one atomic step.
    pub fn next_index(&self) -> Option<usize> {
        let len = self.pool.len();
        if len == 0 {
            return None;
        }

        let previous = self
            .cursor
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |i| Some((i + 1) % len))
            .unwrap_or_else(|i| i);
        Some((previous + 1) % len)
    }

    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }
}

impl LoadBalancer for RoundRobinSelector {
    fn next_backend(&self) -> Option<Arc<Backend>> {
        let index = self.next_index()?;
        self.pool.get(index).cloned()
    }

    fn name(&self) -> &'static str {
        "round_robin"
    }
}
