//! Adapters - Concrete implementations of ports, plus the inbound HTTP layer.

pub mod http;
pub mod process;
