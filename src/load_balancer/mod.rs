// src/load_balancer/mod.rs
mod algorithm;
mod round_robin;

pub use algorithm::LoadBalancer; // trait
pub use round_robin::RoundRobinSelector;
pub use crate::config::LoadBalancerAlgorithm; // enum exposed if needed

use crate::proxy::BackendPool;
use std::sync::Arc;

pub fn create_load_balancer(
    algorithm: LoadBalancerAlgorithm,
    pool: Arc<BackendPool>,
) -> Arc<dyn LoadBalancer> {
    match algorithm {
        LoadBalancerAlgorithm::RoundRobin => Arc::new(RoundRobinSelector::new(pool)),
    }
}
