use crate::domain::commands::{CommandSpec, Tool};
use crate::ports::executor::{ExecError, ProcessExecutor, ProcessOutput};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command as TokioCommand;
use tracing::debug;

const STDERR_TAIL_LINES: usize = 12;

/// Spawns the real probe and transcode binaries.
#[derive(Debug, Clone)]
pub struct TokioProcessExecutor {
    probe_bin: PathBuf,
    transcode_bin: PathBuf,
}

impl TokioProcessExecutor {
    pub fn new(probe_bin: impl Into<PathBuf>, transcode_bin: impl Into<PathBuf>) -> Self {
        Self {
            probe_bin: probe_bin.into(),
            transcode_bin: transcode_bin.into(),
        }
    }

    fn program(&self, tool: Tool) -> &PathBuf {
        match tool {
            Tool::Probe => &self.probe_bin,
            Tool::Transcode => &self.transcode_bin,
        }
    }
}

#[async_trait]
impl ProcessExecutor for TokioProcessExecutor {
    async fn run(&self, command: &CommandSpec) -> Result<ProcessOutput, ExecError> {
        let program = self.program(command.tool);
        debug!(program = %program.display(), args = ?command.args, "spawning");

        let output = TokioCommand::new(program)
            .args(&command.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ExecError::Spawn {
                tool: command.tool,
                source,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            debug!(tool = %command.tool, stderr = %stderr, "subprocess stderr");
        }

        if !output.status.success() {
            return Err(ExecError::Failed {
                tool: command.tool,
                status: output.status.to_string(),
                stderr: tail_lines(&stderr, STDERR_TAIL_LINES),
            });
        }

        Ok(ProcessOutput {
            stdout: output.stdout,
        })
    }
}

fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.trim_end().lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}
