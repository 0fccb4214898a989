use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a task.
///
/// Serialized as its integer code so `/stats` consumers can compare directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum TaskStatus {
    /// Only ever carried by the idle "current task" sentinel.
    #[default]
    None,
    Scheduled,
    InProcess,
    Success,
    Failure,
}

impl From<TaskStatus> for u8 {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::None => 0,
            TaskStatus::Scheduled => 1,
            TaskStatus::InProcess => 2,
            TaskStatus::Success => 3,
            TaskStatus::Failure => 4,
        }
    }
}

impl TryFrom<u8> for TaskStatus {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(TaskStatus::None),
            1 => Ok(TaskStatus::Scheduled),
            2 => Ok(TaskStatus::InProcess),
            3 => Ok(TaskStatus::Success),
            4 => Ok(TaskStatus::Failure),
            other => Err(format!("unknown task status code {}", other)),
        }
    }
}

/// Subset of the probe output the pipeline actually needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShortInputMetadata {
    pub format: String,
    pub size: u64,
    pub video_codec: String,
    pub height: u32,
    pub width: u32,
    pub aspect_ratio: String,
    /// Floor of the rational frame rate.
    pub fps: u32,
    pub audio_codec: String,
    /// Whole seconds, rounded.
    pub duration: u64,
}

/// Body accepted by `POST /schedule`.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleRequest {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub channel_id: i64,
    #[serde(default)]
    pub playlist_id: i64,
    pub input: String,
}

/// One encode job.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Task {
    pub id: i64,
    pub channel_id: i64,
    pub playlist_id: i64,
    pub input: String,

    pub status: TaskStatus,

    pub scheduled_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_meta: Option<ShortInputMetadata>,

    /// Diagnostic for a task that ended in `Failure`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Task {
    /// Stamp a freshly submitted request.
    pub fn scheduled(request: ScheduleRequest) -> Self {
        Self {
            id: request.id,
            channel_id: request.channel_id,
            playlist_id: request.playlist_id,
            input: request.input.trim().to_string(),
            status: TaskStatus::Scheduled,
            scheduled_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// Sentinel reported while no task is running.
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn is_in_process(&self) -> bool {
        self.status == TaskStatus::InProcess
    }

    pub fn start(&mut self) {
        self.status = TaskStatus::InProcess;
        self.started_at = Some(Utc::now());
    }

    pub fn succeed(&mut self) {
        self.status = TaskStatus::Success;
        self.finished_at = Some(Utc::now());
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = TaskStatus::Failure;
        self.finished_at = Some(Utc::now());
        self.error = Some(error.into());
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InProcess {
    pub is_running: bool,
    pub task: Task,
}

/// Snapshot served by `GET /stats`.
#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    /// Waiting tasks plus the one in process, if any.
    pub length: usize,
    pub in_process: InProcess,
    pub waiting: Vec<Task>,
    pub finished: Vec<Task>,
}
