// ────────────────────────────────
// src/server/builder.rs
// ────────────────────────────────
use crate::proxy::{IncomingConnection, Proxy};
use crate::server::listener::bind_tcp;
use crate::server::policy::{AcceptPolicy, Unbounded};
use anyhow::{anyhow, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::Instrument;

/// Builder pattern so `main.rs` can inject its Proxy and admission policy.
pub struct ServerBuilder {
    addr: SocketAddr,
    proxy: Option<Arc<Proxy>>,
    policy: Arc<dyn AcceptPolicy>,
}

impl ServerBuilder {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            proxy: None,
            policy: Arc::new(Unbounded),
        }
    }

    pub fn with_proxy(mut self, proxy: Arc<Proxy>) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn with_accept_policy(mut self, policy: Arc<dyn AcceptPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Bind the TCP socket, then run the accept loop. Only a bind failure
    /// returns.
    pub async fn serve(self) -> Result<()> {
        let listener = bind_tcp(self.addr).await?;
        self.serve_on(listener).await
    }

    /// Run the accept loop on an already bound listener.
    pub async fn serve_on(self, listener: TcpListener) -> Result<()> {
        let proxy = self
            .proxy
            .ok_or_else(|| anyhow!("proxy must be set via with_proxy()"))?;
        let policy = self.policy;

        let local = listener.local_addr()?;
        tracing::info!(
            policy = policy.name(),
            "Load Balancer is listening on {}",
            local
        );

        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    tracing::warn!(%err, "Error accepting client connection");
                    // Back off briefly so a persistent error (e.g. EMFILE) does not spin.
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    continue;
                }
            };

            let conn = IncomingConnection::new(stream, peer);
            if !policy.admit(&conn).await {
                tracing::warn!(%peer, policy = policy.name(), "connection rejected");
                proxy.metrics().record_rejected();
                continue;
            }

            let span = tracing::info_span!("connection", id = %conn.id, %peer);
            let proxy = proxy.clone();

            // One Tokio task per connection.
            tokio::spawn(
                async move {
                    if let Err(err) = proxy.handle(conn).await {
                        tracing::debug!(%err, "connection dropped");
                    }
                }
                .instrument(span),
            );
        }
    }
}
