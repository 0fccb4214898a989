use crate::domain::commands::{CommandSpec, Tool};
use async_trait::async_trait;

/// What a finished subprocess left behind.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub stdout: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("failed to spawn {tool}")]
    Spawn {
        tool: Tool,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}: {stderr}")]
    Failed {
        tool: Tool,
        status: String,
        stderr: String,
    },
}

/// Runs a planned command to completion.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    async fn run(&self, command: &CommandSpec) -> Result<ProcessOutput, ExecError>;
}
