// src/main.rs
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use tcp_load_balancer::{
    config::{self, Config},
    metrics::MetricsRegistry,
    proxy::{BackendPool, Proxy},
    server::ServerBuilder,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tcp_load_balancer=debug".parse()?),
        )
        .init();

    // Load configuration; without a path the built-in backend list is used
    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            config::load_config(&path).await?
        }
        None => {
            info!("No configuration file given, using built-in defaults");
            let config = Config::default();
            config.validate()?;
            config
        }
    };

    let metrics_registry = MetricsRegistry::new()?;
    let metrics = metrics_registry.collector();

    let pool = Arc::new(BackendPool::new(&config.backends));
    info!("Backend pool: {} backends", pool.len());

    let addr = config.listener.addr()?;
    let proxy = Arc::new(Proxy::new(config, pool, metrics));

    proxy.start_health_checker();

    ServerBuilder::new(addr)
        .with_proxy(proxy)
        .serve()
        .await
}
