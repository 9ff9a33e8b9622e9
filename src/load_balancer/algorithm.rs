// src/load_balancer/algorithm.rs
use crate::proxy::Backend;
use std::sync::Arc;

/// Picks the backend for the next client connection.
pub trait LoadBalancer: Send + Sync {
    fn next_backend(&self) -> Option<Arc<Backend>>;

    fn name(&self) -> &'static str;
}
