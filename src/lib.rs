//! VOD encoder - queued HLS encoding service
//!
//! Hexagonal Architecture:
//! - domain/: Pure business logic (tasks, renditions, probe parsing, command planning, manifests)
//! - ports/: Trait definitions (subprocess execution)
//! - adapters/: Concrete implementations (tokio subprocesses, HTTP API)
//! - application/: Unbounded queue, task processor, scheduler
//! - config: Environment configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use application::processor::TaskProcessor;
pub use application::queue::UnboundedQueue;
pub use application::status::{Scheduler, StatusBoard};
pub use config::EncoderConfig;
