//! Unbounded FIFO hand-off between any number of producers and one consumer.
//!
//! Producers never wait on the consumer: `submit` appends to the backlog under
//! a short lock and returns. The consumer's `take` suspends while the backlog
//! is empty and is woken by the next submission (or by `close`).

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, thiserror::Error)]
#[error("queue is closed")]
pub struct QueueClosed<T>(pub T);

struct State<T> {
    backlog: VecDeque<T>,
    closed: bool,
}

struct Inner<T> {
    state: Mutex<State<T>>,
    available: Notify,
}

pub struct UnboundedQueue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for UnboundedQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for UnboundedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> UnboundedQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    backlog: VecDeque::new(),
                    closed: false,
                }),
                available: Notify::new(),
            }),
        }
    }

    /// Append to the back of the backlog. Fails only once the queue is closed,
    /// handing the item back.
    pub fn submit(&self, item: T) -> Result<(), QueueClosed<T>> {
        {
            let mut state = self.inner.state.lock();
            if state.closed {
                return Err(QueueClosed(item));
            }
            state.backlog.push_back(item);
        }
        self.inner.available.notify_one();
        Ok(())
    }

    /// Oldest waiting item, suspending until one exists.
    ///
    /// Returns `None` once the queue is closed and fully drained.
    pub async fn take(&self) -> Option<T> {
        self.take_with(|_| ()).await
    }

    /// Like [`take`](Self::take), but lets `on_handover` update the item while
    /// it is being removed, so a concurrent [`snapshot_with`](Self::snapshot_with) sees the
    /// item either still waiting or already handed over, never in between.
    pub async fn take_with<F>(&self, on_handover: F) -> Option<T>
    where
        F: FnOnce(&mut T),
    {
        let mut on_handover = Some(on_handover);

        loop {
            // Registered before the check so a submit in between is not lost.
            let notified = self.inner.available.notified();
            {
                let mut state = self.inner.state.lock();
                if let Some(mut item) = state.backlog.pop_front() {
                    if let Some(f) = on_handover.take() {
                        f(&mut item);
                    }
                    return Some(item);
                }
                if state.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Run `f` against the backlog, oldest first, while no hand-over can happen.
    pub fn snapshot_with<R>(&self, f: impl FnOnce(&VecDeque<T>) -> R) -> R {
        let state = self.inner.state.lock();
        f(&state.backlog)
    }

    pub fn snapshot(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.snapshot_with(|backlog| backlog.iter().cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().backlog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop accepting submissions. Items already waiting are still handed out.
    pub fn close(&self) {
        self.inner.state.lock().closed = true;
        self.inner.available.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }
}
