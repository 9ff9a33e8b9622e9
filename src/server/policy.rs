// src/server/policy.rs
use async_trait::async_trait;

use crate::proxy::IncomingConnection;

/// Decides whether an accepted connection gets a relay task.
#[async_trait]
pub trait AcceptPolicy: Send + Sync {
    async fn admit(&self, conn: &IncomingConnection) -> bool;

    fn name(&self) -> &'static str;
}

/// Admits every connection; there is no connection limit.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbounded;

#[async_trait]
impl AcceptPolicy for Unbounded {
    async fn admit(&self, _conn: &IncomingConnection) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "unbounded"
    }
}
