//! Infrastructure layer - transport, external APIs, persistence

pub mod api_clients;
pub mod http;
pub mod storage;
