//! Domain layer - Pure business logic.

pub mod commands;
pub mod hls;
pub mod probe;
pub mod rendition;
pub mod task;
