//! Shared view of what the worker is doing, and the API-facing scheduler.

use super::queue::{QueueClosed, UnboundedQueue};
use crate::domain::task::{InProcess, ScheduleRequest, Stats, Task};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

struct BoardState {
    current: Task,
    finished: VecDeque<Task>,
}

/// The "current task" marker plus a bounded history of retired tasks.
///
/// Written only by the worker; readers always get copies.
pub struct StatusBoard {
    state: Mutex<BoardState>,
    finished_limit: usize,
}

impl StatusBoard {
    pub fn new(finished_limit: usize) -> Self {
        Self {
            state: Mutex::new(BoardState {
                current: Task::idle(),
                finished: VecDeque::with_capacity(finished_limit),
            }),
            finished_limit,
        }
    }

    pub fn current(&self) -> Task {
        self.state.lock().current.clone()
    }

    /// Publish the worker's latest copy of the running task.
    pub fn update(&self, task: &Task) {
        self.state.lock().current = task.clone();
    }

    /// Reset the marker to idle and remember the terminal task.
    pub fn retire(&self, task: Task) {
        let mut state = self.state.lock();
        state.current = Task::idle();
        if self.finished_limit == 0 {
            return;
        }
        if state.finished.len() == self.finished_limit {
            state.finished.pop_front();
        }
        state.finished.push_back(task);
    }

    pub fn finished(&self) -> Vec<Task> {
        self.state.lock().finished.iter().cloned().collect()
    }

    /// Current marker and finished history, read under one lock.
    pub fn snapshot(&self) -> (Task, Vec<Task>) {
        let state = self.state.lock();
        (
            state.current.clone(),
            state.finished.iter().cloned().collect(),
        )
    }
}

/// Front door used by the HTTP layer: submit tasks, read stats.
#[derive(Clone)]
pub struct Scheduler {
    queue: UnboundedQueue<Task>,
    board: Arc<StatusBoard>,
}

impl Scheduler {
    pub fn new(queue: UnboundedQueue<Task>, board: Arc<StatusBoard>) -> Self {
        Self { queue, board }
    }

    /// Stamp the request as scheduled and append it to the backlog.
    pub fn submit(&self, request: ScheduleRequest) -> Result<Task, QueueClosed<Task>> {
        let task = Task::scheduled(request);
        self.queue.submit(task.clone())?;
        Ok(task)
    }

    pub fn stats(&self) -> Stats {
        let (waiting, (current, finished)) = self.queue.snapshot_with(|backlog| {
            let waiting: Vec<Task> = backlog.iter().cloned().collect();
            (waiting, self.board.snapshot())
        });

        let is_running = current.is_in_process();
        Stats {
            length: waiting.len() + usize::from(is_running),
            in_process: InProcess {
                is_running,
                task: current,
            },
            waiting,
            finished,
        }
    }

    pub fn queue(&self) -> &UnboundedQueue<Task> {
        &self.queue
    }
}
