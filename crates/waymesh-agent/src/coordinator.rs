//! Path request queue and completion events.
//!
//! Requests are commands, not calls: `request_path` only enqueues, and the
//! per-tick update starts a command when a navmesh exists, no task is
//! already running for that entity, and a query context is free. The queue
//! is strict FIFO; a blocked head blocks everything behind it, which is
//! the backpressure policy rather than a reordering one. Completion,
//! failure, and cancellation all surface as events drained by the host,
//! exactly one per request.

use std::collections::VecDeque;

use waymesh_common::Vec3;
use waymesh_nav::{
    NavMesh, Path, PathQueryPool, PathRequest, PathTask, QueryConfig, TaskState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

struct PathCommand {
    request: RequestId,
    listener: ListenerId,
    entity: EntityId,
    start: Vec3,
    end: Vec3,
}

#[derive(Debug)]
pub enum PathOutcome {
    Complete(Path),
    Failed,
    Cancelled,
}

/// Terminal notification for one request.
#[derive(Debug)]
pub struct PathEvent {
    pub request: RequestId,
    pub listener: ListenerId,
    pub entity: EntityId,
    pub outcome: PathOutcome,
}

struct ActiveTask {
    request: RequestId,
    listener: ListenerId,
    entity: EntityId,
    task: PathTask,
}

pub struct NavCoordinator {
    config: QueryConfig,
    queue: VecDeque<PathCommand>,
    active: Vec<ActiveTask>,
    events: VecDeque<PathEvent>,
    next_request: u64,
}

impl NavCoordinator {
    pub fn new(config: QueryConfig) -> Self {
        Self {
            config,
            queue: VecDeque::new(),
            active: Vec::new(),
            events: VecDeque::new(),
            next_request: 0,
        }
    }

    /// Enqueue a path request. Execution starts on a later update tick.
    pub fn request_path(
        &mut self,
        listener: ListenerId,
        entity: EntityId,
        start: Vec3,
        end: Vec3,
    ) -> RequestId {
        self.next_request += 1;
        let request = RequestId(self.next_request);
        self.queue.push_back(PathCommand {
            request,
            listener,
            entity,
            start,
            end,
        });
        request
    }

    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn has_active(&self, entity: EntityId) -> bool {
        self.active.iter().any(|t| t.entity == entity)
    }

    /// Drop the listener's queued commands and cancel its running tasks.
    /// Every affected request fires exactly one `Cancelled` event.
    pub fn cancel_by_listener(&mut self, listener: ListenerId) {
        let events = &mut self.events;
        self.queue.retain(|cmd| {
            if cmd.listener == listener {
                events.push_back(PathEvent {
                    request: cmd.request,
                    listener: cmd.listener,
                    entity: cmd.entity,
                    outcome: PathOutcome::Cancelled,
                });
                false
            } else {
                true
            }
        });
        self.cancel_active(|task| task.listener == listener);
    }

    /// Cancel every running task. Queued commands stay queued; they carry
    /// no mesh state and snap fresh when they eventually run.
    pub fn cancel_all(&mut self) {
        self.cancel_active(|_| true);
    }

    fn cancel_active<F: Fn(&ActiveTask) -> bool>(&mut self, pred: F) {
        let mut i = 0;
        while i < self.active.len() {
            if pred(&self.active[i]) {
                let mut entry = self.active.swap_remove(i);
                entry.task.cancel();
                log::debug!("path request {:?} cancelled", entry.request);
                self.events.push_back(PathEvent {
                    request: entry.request,
                    listener: entry.listener,
                    entity: entry.entity,
                    outcome: PathOutcome::Cancelled,
                });
                // Dropping the task returns its query context.
            } else {
                i += 1;
            }
        }
    }

    /// Per-tick update: start queued commands that can run, then advance
    /// every active task by one slice and retire the finished ones.
    pub fn update(&mut self, mesh: Option<&NavMesh>, pool: &PathQueryPool) {
        if let Some(mesh) = mesh {
            loop {
                let Some(front) = self.queue.front() else {
                    break;
                };
                if self.active.iter().any(|t| t.entity == front.entity) {
                    break;
                }
                let Some(handle) = pool.acquire() else {
                    break;
                };
                let Some(cmd) = self.queue.pop_front() else {
                    break;
                };
                let request = PathRequest {
                    start: cmd.start,
                    end: cmd.end,
                    half_extents: self.config.half_extents,
                    filter: self.config.filter(),
                };
                let task = PathTask::new(handle, request)
                    .with_nodes_per_update(self.config.nodes_per_update);
                self.active.push(ActiveTask {
                    request: cmd.request,
                    listener: cmd.listener,
                    entity: cmd.entity,
                    task,
                });
            }

            for entry in &mut self.active {
                entry.task.update(mesh);
            }
        }

        let mut i = 0;
        while i < self.active.len() {
            if !self.active[i].task.state().is_terminal() {
                i += 1;
                continue;
            }
            let mut entry = self.active.swap_remove(i);
            let outcome = match entry.task.state() {
                TaskState::Done => match entry.task.take_result() {
                    Some(path) => PathOutcome::Complete(path),
                    None => PathOutcome::Failed,
                },
                TaskState::Cancelled => PathOutcome::Cancelled,
                _ => PathOutcome::Failed,
            };
            log::debug!(
                "path request {:?} finished: {}",
                entry.request,
                match &outcome {
                    PathOutcome::Complete(_) => "complete",
                    PathOutcome::Failed => "failed",
                    PathOutcome::Cancelled => "cancelled",
                }
            );
            self.events.push_back(PathEvent {
                request: entry.request,
                listener: entry.listener,
                entity: entry.entity,
                outcome,
            });
        }
    }

    /// Take all pending completion events, oldest first.
    pub fn drain_events(&mut self) -> impl Iterator<Item = PathEvent> + '_ {
        self.events.drain(..)
    }
}
