// ────────────────────────────────
// src/proxy/relay.rs
// Raw bidirectional byte pass-through between client and backend.
// ────────────────────────────────
use crate::metrics::{MetricsCollector, RelayDirection};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, Instrument};

/// Keeps `lb_active_relays` raised while either direction is still running.
struct RelayGuard {
    metrics: Arc<MetricsCollector>,
}

impl RelayGuard {
    fn new(metrics: Arc<MetricsCollector>) -> Self {
        metrics.relay_started();
        Self { metrics }
    }
}

impl Drop for RelayGuard {
    fn drop(&mut self) {
        self.metrics.relay_finished();
    }
}

/// Launches one task per direction and returns immediately. Each task owns
/// its halves, so the sockets are released on every exit path.
pub(crate) fn spawn_relay(client: TcpStream, upstream: TcpStream, metrics: Arc<MetricsCollector>) {
    let (client_read, client_write) = client.into_split();
    let (backend_read, backend_write) = upstream.into_split();
    let guard = Arc::new(RelayGuard::new(metrics.clone()));
    let span = tracing::Span::current();

    tokio::spawn(
        copy_one_way(
            client_read,
            backend_write,
            RelayDirection::ClientToBackend,
            guard.clone(),
            metrics.clone(),
        )
        .instrument(span.clone()),
    );
    tokio::spawn(
        copy_one_way(
            backend_read,
            client_write,
            RelayDirection::BackendToClient,
            guard,
            metrics,
        )
        .instrument(span),
    );
}

async fn copy_one_way<R, W>(
    mut reader: R,
    mut writer: W,
    direction: RelayDirection,
    _guard: Arc<RelayGuard>,
    metrics: Arc<MetricsCollector>,
) where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    match tokio::io::copy(&mut reader, &mut writer).await {
        Ok(bytes) => {
            metrics.record_relay_bytes(direction, bytes);
            debug!(direction = direction.as_str(), bytes, "relay direction finished");
        }
        Err(e) => {
            debug!(direction = direction.as_str(), error = %e, "relay direction aborted");
        }
    }

    // Propagate the half-close to the peer.
    let _ = writer.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsRegistry;
    use std::time::Duration;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    async fn socket_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (connected, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
        (connected.unwrap(), accepted.unwrap().0)
    }

    #[tokio::test]
    async fn test_relay_forwards_both_directions_and_releases() {
        let registry = MetricsRegistry::new().unwrap();
        let metrics = registry.collector();

        let (mut client, client_side) = socket_pair().await;
        let (upstream, mut backend) = socket_pair().await;

        spawn_relay(client_side, upstream, metrics.clone());
        assert_eq!(metrics.active_relays.get(), 1);

        client.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        backend.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        backend.write_all(b"pong").await.unwrap();
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"pong");

        // Half-close from the client reaches the backend as EOF.
        client.shutdown().await.unwrap();
        let mut rest = Vec::new();
        backend.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());

        drop(backend);
        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());

        tokio::time::timeout(Duration::from_secs(5), async {
            while metrics.active_relays.get() != 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(
            metrics
                .relay_bytes_total
                .with_label_values(&["client_to_backend"])
                .get(),
            4
        );
    }
}
