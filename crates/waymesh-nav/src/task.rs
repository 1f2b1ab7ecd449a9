//! One asynchronous path request, driven a slice at a time.

use waymesh_common::Vec3;

use crate::filter::QueryFilter;
use crate::mesh::NavMesh;
use crate::path::Path;
use crate::pool::QueryHandle;
use crate::query::SearchStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Endpoints not yet snapped to the mesh.
    Pending,
    /// Search running across ticks.
    Searching,
    Done,
    Failed,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Done | TaskState::Failed | TaskState::Cancelled)
    }
}

/// Parameters of one path request.
#[derive(Debug, Clone, Copy)]
pub struct PathRequest {
    pub start: Vec3,
    pub end: Vec3,
    /// Search box for snapping the endpoints onto the mesh.
    pub half_extents: Vec3,
    pub filter: QueryFilter,
}

/// A sliced pathfinding task. Holds exactly one pool handle from creation
/// until the task itself is dropped.
pub struct PathTask {
    handle: QueryHandle,
    request: PathRequest,
    state: TaskState,
    nodes_per_update: usize,
    snapped: Option<(Vec3, Vec3)>,
    result: Option<Path>,
}

impl PathTask {
    pub fn new(handle: QueryHandle, request: PathRequest) -> Self {
        Self {
            handle,
            request,
            state: TaskState::Pending,
            nodes_per_update: 64,
            snapped: None,
            result: None,
        }
    }

    pub fn with_nodes_per_update(mut self, nodes: usize) -> Self {
        self.nodes_per_update = nodes.max(1);
        self
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn request(&self) -> &PathRequest {
        &self.request
    }

    /// Abandon the task. Terminal states are unaffected.
    pub fn cancel(&mut self) {
        if !self.state.is_terminal() {
            self.state = TaskState::Cancelled;
        }
    }

    /// Advance by one slice. Snapping happens on the first call, then each
    /// call spends at most `nodes_per_update` node expansions.
    pub fn update(&mut self, mesh: &NavMesh) -> TaskState {
        match self.state {
            TaskState::Pending => self.snap_and_start(mesh),
            TaskState::Searching => self.step_search(mesh),
            _ => {}
        }
        self.state
    }

    fn snap_and_start(&mut self, mesh: &NavMesh) {
        let he = self.request.half_extents;
        let start = mesh.find_nearest_poly(self.request.start, he, &self.request.filter);
        let end = mesh.find_nearest_poly(self.request.end, he, &self.request.filter);

        let (Some((start_ref, start_pos)), Some((end_ref, end_pos))) = (start, end) else {
            log::debug!("path task: endpoint off the mesh");
            self.state = TaskState::Failed;
            return;
        };
        self.snapped = Some((start_pos, end_pos));

        if start_ref == end_ref {
            self.result = Some(Path::new(vec![start_ref], start_pos, end_pos));
            self.state = TaskState::Done;
            return;
        }

        match self.handle.start_search(
            mesh,
            start_ref,
            start_pos,
            end_ref,
            end_pos,
            self.request.filter,
        ) {
            Ok(()) => self.state = TaskState::Searching,
            Err(err) => {
                log::debug!("path task: {err}");
                self.state = TaskState::Failed;
            }
        }
    }

    fn step_search(&mut self, mesh: &NavMesh) {
        match self.handle.update(mesh, self.nodes_per_update) {
            SearchStatus::InProgress => {}
            SearchStatus::Success => {
                let Some((start_pos, end_pos)) = self.snapped else {
                    self.state = TaskState::Failed;
                    return;
                };
                match self.handle.build_corridor() {
                    Ok(corridor) if !corridor.is_empty() => {
                        self.result = Some(Path::new(corridor, start_pos, end_pos));
                        self.state = TaskState::Done;
                    }
                    _ => self.state = TaskState::Failed,
                }
            }
            SearchStatus::Failed => self.state = TaskState::Failed,
        }
    }

    /// The finished path, once.
    pub fn take_result(&mut self) -> Option<Path> {
        self.result.take()
    }
}
