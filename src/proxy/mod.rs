//
// src/proxy/mod.rs
//
mod backend;
mod connection;
mod pool;
mod proxy;
mod relay;

pub use backend::{Backend, BackendSnapshot};
pub use connection::IncomingConnection;
pub use pool::BackendPool;
pub use proxy::{Proxy, ProxyError};
