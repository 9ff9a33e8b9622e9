// src/proxy/connection.rs
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use tokio::net::TcpStream;
use uuid::Uuid;

/// A freshly accepted client socket, consumed by exactly one relay.
#[derive(Debug)]
pub struct IncomingConnection {
    pub id: Uuid,
    pub peer: SocketAddr,
    pub stream: TcpStream,
    pub accepted_at: DateTime<Utc>,
}

impl IncomingConnection {
    pub fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self {
            id: Uuid::new_v4(),
            peer,
            stream,
            accepted_at: Utc::now(),
        }
    }

    /// Milliseconds elapsed since the socket was accepted.
    pub fn age_ms(&self) -> i64 {
        (Utc::now() - self.accepted_at).num_milliseconds()
    }
}
