//! The single worker that drives each task through the encode pipeline.

use super::queue::UnboundedQueue;
use super::status::StatusBoard;
use crate::domain::commands::{CommandPlanner, CommandSpec};
use crate::domain::hls::{MasterPlaylist, MASTER_PLAYLIST_NAME};
use crate::domain::probe::ProbeError;
use crate::domain::rendition::select_renditions;
use crate::domain::task::{ShortInputMetadata, Task};
use crate::ports::executor::{ExecError, ProcessExecutor};
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Probe,
    Plan,
    Posters,
    Thumbnails,
    Streams,
    Manifest,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Probe => "probe",
            Stage::Plan => "plan",
            Stage::Posters => "posters",
            Stage::Thumbnails => "thumbnails",
            Stage::Streams => "streams",
            Stage::Manifest => "manifest",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error(transparent)]
    Exec(#[from] ExecError),
    #[error(transparent)]
    Probe(#[from] ProbeError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
#[error("{stage} stage failed")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: StageError,
}

fn at(stage: Stage) -> impl FnOnce(StageError) -> PipelineError {
    move |source| PipelineError { stage, source }
}

/// `outer: inner: innermost`
fn error_chain(err: &dyn StdError) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

pub struct TaskProcessor<E> {
    queue: UnboundedQueue<Task>,
    board: Arc<StatusBoard>,
    planner: CommandPlanner,
    executor: E,
}

impl<E> TaskProcessor<E>
where
    E: ProcessExecutor + 'static,
{
    pub fn new(
        queue: UnboundedQueue<Task>,
        board: Arc<StatusBoard>,
        planner: CommandPlanner,
        executor: E,
    ) -> Self {
        Self {
            queue,
            board,
            planner,
            executor,
        }
    }

    /// Process tasks one at a time until the queue is closed and drained.
    pub async fn run(self) {
        info!("Task processor started");

        loop {
            let board = &self.board;
            let next = self
                .queue
                .take_with(|task| {
                    task.start();
                    board.update(task);
                })
                .await;
            let Some(mut task) = next else {
                break;
            };

            let span = info_span!("task", task_id = task.id);
            self.handle(&mut task).instrument(span).await;
            self.board.retire(task);
        }

        info!("Task processor stopped");
    }

    async fn handle(&self, task: &mut Task) {
        info!(input = %task.input, "Processing task");

        match self.process(task).await {
            Ok(()) => {
                task.succeed();
                info!("Task finished");
            }
            Err(e) => {
                let detail = error_chain(&e);
                error!(stage = %e.stage, error = %detail, "Task failed");
                task.fail(detail);
            }
        }
    }

    async fn process(&self, task: &mut Task) -> Result<(), PipelineError> {
        let meta = self.probe(task).await?;
        task.input_meta = Some(meta.clone());
        self.board.update(task);

        let renditions = select_renditions(meta.width, meta.height, &meta.aspect_ratio);
        if renditions.is_empty() {
            warn!(
                aspect_ratio = %meta.aspect_ratio,
                height = meta.height,
                "No renditions for source, skipping adaptive streams"
            );
        }
        let transcodes = self.planner.plan_transcode(task, &meta, &renditions);
        let posters = self
            .planner
            .plan_posters(task, &meta, &mut rand::thread_rng());
        let thumbnails = self.planner.plan_thumbnails(task);

        let dir = self.planner.task_dir(task);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| at(Stage::Plan)(e.into()))?;

        for poster in &posters {
            debug!(index = poster.index, offset = ?poster.offset, "Capturing poster");
            self.run_all(Stage::Posters, &poster.commands).await?;
        }

        self.run_all(Stage::Thumbnails, &thumbnails).await?;

        for (rendition, spec) in renditions.iter().zip(&transcodes) {
            info!(height = rendition.height, width = rendition.width, "Encoding rendition");
            self.run_one(Stage::Streams, spec).await?;
        }

        MasterPlaylist::for_renditions(&renditions, meta.fps)
            .write_to(&dir.join(MASTER_PLAYLIST_NAME))
            .await
            .map_err(|e| at(Stage::Manifest)(e.into()))?;

        Ok(())
    }

    async fn probe(&self, task: &Task) -> Result<ShortInputMetadata, PipelineError> {
        let output = self
            .executor
            .run(&self.planner.plan_probe(task))
            .await
            .map_err(|e| at(Stage::Probe)(e.into()))?;

        let meta = ShortInputMetadata::from_probe_json(&output.stdout)
            .map_err(|e| at(Stage::Probe)(e.into()))?;
        debug!(?meta, "Probed input");
        Ok(meta)
    }

    async fn run_all(&self, stage: Stage, specs: &[CommandSpec]) -> Result<(), PipelineError> {
        for spec in specs {
            self.run_one(stage, spec).await?;
        }
        Ok(())
    }

    async fn run_one(&self, stage: Stage, spec: &CommandSpec) -> Result<(), PipelineError> {
        debug!(%stage, command = %spec, "Running");
        self.executor
            .run(spec)
            .await
            .map(|_| ())
            .map_err(|e| at(stage)(e.into()))
    }
}
