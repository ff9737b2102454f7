pub mod registry;

pub use registry::SessionRegistry;

use crate::protocol::message::ServerMessage;
use chrono::{DateTime, Utc};
use lineage_graph::CancelToken;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Resolving,
    Streaming,
}

/// How the last task of a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    Completed,
    Failed,
    Cancelled,
}

struct ActiveTask {
    id: u64,
    cancel: CancelToken,
    handle: JoinHandle<()>,
}

/// Server-side state of one client connection.
///
/// Holds at most one task. Messages from a task go through [`Session::emit`],
/// which drops them once the task's token is cancelled or the connection is
/// gone; cancelling happens under the same gate, so nothing from a superseded
/// task can slip out after [`Session::cancel`] returns.
pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    outbound: mpsc::Sender<ServerMessage>,
    active: AtomicBool,
    phase: StdMutex<SessionPhase>,
    last_outcome: StdMutex<Option<TaskOutcome>>,
    gate: Mutex<()>,
    task: Mutex<Option<ActiveTask>>,
    current_task: AtomicU64,
}

impl Session {
    pub fn new(outbound: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            outbound,
            active: AtomicBool::new(true),
            phase: StdMutex::new(SessionPhase::Idle),
            last_outcome: StdMutex::new(None),
            gate: Mutex::new(()),
            task: Mutex::new(None),
            current_task: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase.lock().map(|p| *p).unwrap_or(SessionPhase::Idle)
    }

    pub fn set_phase(&self, phase: SessionPhase) {
        if let Ok(mut current) = self.phase.lock() {
            *current = phase;
        }
    }

    pub fn last_outcome(&self) -> Option<TaskOutcome> {
        self.last_outcome.lock().ok().and_then(|o| *o)
    }

    /// Send outside of any task (validation errors, cancel acknowledgements)
    pub async fn send(&self, message: ServerMessage) -> bool {
        if !self.is_active() {
            return false;
        }
        self.outbound.send(message).await.is_ok()
    }

    /// Send on behalf of the task owning `token`; a no-op once it is superseded
    pub async fn emit(&self, token: &CancelToken, message: ServerMessage) -> bool {
        let _gate = self.gate.lock().await;
        if token.is_cancelled() || !self.is_active() {
            return false;
        }
        self.outbound.send(message).await.is_ok()
    }

    /// Cancel the running task (if any), wait for it, then run `make`'s future
    /// as the session's new task
    pub async fn spawn_task<F, Fut>(self: &Arc<Self>, make: F)
    where
        F: FnOnce(CancelToken) -> Fut,
        Fut: Future<Output = TaskOutcome> + Send + 'static,
    {
        let mut slot = self.task.lock().await;
        if let Some(previous) = slot.take() {
            self.teardown(previous).await;
        }
        if !self.is_active() {
            return;
        }

        let id = self.current_task.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancelToken::new();
        let future = make(cancel.clone());
        let session = Arc::clone(self);
        let token = cancel.clone();

        // The job runs in its own task so a panic surfaces here as a JoinError
        let handle = tokio::spawn(async move {
            let outcome = match tokio::spawn(future).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(session_id = %session.id, task_id = id, error = %e, "Session task panicked");
                    session.emit(&token, ServerMessage::error("Internal error")).await;
                    TaskOutcome::Failed
                }
            };
            session.finish(id, outcome);
        });

        *slot = Some(ActiveTask { id, cancel, handle });
    }

    /// Cancel the running task; returns whether one was still running
    pub async fn cancel(&self) -> bool {
        let previous = self.task.lock().await.take();
        match previous {
            Some(task) => {
                let running = !task.handle.is_finished();
                self.teardown(task).await;
                running
            }
            None => false,
        }
    }

    /// Mark the connection gone and stop its task
    pub async fn close(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.cancel().await;
    }

    async fn teardown(&self, task: ActiveTask) {
        {
            let _gate = self.gate.lock().await;
            task.cancel.cancel();
        }
        // A task that ran to the end has already recorded its outcome
        if let Err(e) = task.handle.await {
            tracing::error!(session_id = %self.id, task_id = task.id, error = %e, "Session task panicked");
            self.finish(task.id, TaskOutcome::Failed);
        }
    }

    fn finish(&self, id: u64, outcome: TaskOutcome) {
        if self.current_task.load(Ordering::SeqCst) != id {
            return;
        }
        if let Ok(mut last) = self.last_outcome.lock() {
            *last = Some(outcome);
        }
        self.set_phase(SessionPhase::Idle);
        tracing::debug!(session_id = %self.id, task_id = id, outcome = ?outcome, "Session task ended");
    }
}
