// ────────────────────────────────
// src/server/listener.rs
// Encapsulates low‑level TCP bind so the accept loop stays transport-agnostic.
// ────────────────────────────────
use anyhow::{Context, Result};
use std::net::SocketAddr;
use tokio::net::TcpListener;

pub async fn bind_tcp(addr: SocketAddr) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind listener on {}", addr))?;
    Ok(listener)
}
