//! Application layer - Queue, worker and the scheduler facade.

pub mod processor;
pub mod queue;
pub mod status;
