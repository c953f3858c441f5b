//! Pooled HTTP transport shared by every outbound API client

pub mod client_pool;

pub use client_pool::{ClientPool, ClientPoolConfig, PooledClient, PoolStats};

#[cfg(test)]
pub(crate) mod test_server;
