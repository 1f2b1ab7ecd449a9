//! Top-level navigation front end.
//!
//! The pathfinder owns the current navmesh, at most one running bake, the
//! query pool, and the coordinator, and is driven by the host's tick. A
//! rebake is serialized behind the running path tasks: on completion all
//! in-flight tasks are cancelled first, then the mesh is swapped and the
//! bake generation advances, so no stale `PolyRef` survives the swap.

use std::collections::VecDeque;

use waymesh_build::{BakeConfig, BuildPipeline, BuildStage, DebugDraw, GeometrySource};
use waymesh_common::{Result, Vec3};
use waymesh_nav::{NavMesh, PathQueryPool, QueryConfig};

use crate::coordinator::{EntityId, ListenerId, NavCoordinator, PathEvent, RequestId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BakeId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BakeOutcome {
    Completed,
    Failed,
    /// Superseded by a newer `generate` call.
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
pub struct BakeEvent {
    pub bake: BakeId,
    pub outcome: BakeOutcome,
}

pub struct Pathfinder {
    bake_config: BakeConfig,
    query_config: QueryConfig,
    mesh: Option<NavMesh>,
    generation: u32,
    pipeline: Option<(BakeId, BuildPipeline)>,
    pool: PathQueryPool,
    coordinator: NavCoordinator,
    bake_events: VecDeque<BakeEvent>,
    next_bake: u64,
}

impl Pathfinder {
    pub fn new(bake_config: BakeConfig, query_config: QueryConfig) -> Self {
        let pool = PathQueryPool::new(query_config.pool_capacity, query_config.node_budget);
        let coordinator = NavCoordinator::new(query_config.clone());
        Self {
            bake_config,
            query_config,
            mesh: None,
            generation: 0,
            pipeline: None,
            pool,
            coordinator,
            bake_events: VecDeque::new(),
            next_bake: 0,
        }
    }

    /// Start baking a navmesh from `sources`. A bake already in flight is
    /// superseded: it fires a `Cancelled` bake event and its partial state
    /// is dropped. The current mesh, if any, stays queryable until the new
    /// bake completes.
    pub fn generate(&mut self, sources: &[GeometrySource]) -> Result<BakeId> {
        if let Some((old, _)) = self.pipeline.take() {
            log::debug!("bake {:?} superseded", old);
            self.bake_events.push_back(BakeEvent {
                bake: old,
                outcome: BakeOutcome::Cancelled,
            });
        }
        let pipeline = BuildPipeline::new(self.bake_config.clone(), sources)?;
        self.next_bake += 1;
        let bake = BakeId(self.next_bake);
        self.pipeline = Some((bake, pipeline));
        Ok(bake)
    }

    /// One tick: advance the bake by one stage, then the coordinator and
    /// its path tasks by one slice each.
    pub fn update(&mut self) {
        let finished = match self.pipeline.as_mut() {
            Some((_, pipeline)) => {
                pipeline.update();
                pipeline.is_finished()
            }
            None => false,
        };
        if finished {
            if let Some((bake, mut pipeline)) = self.pipeline.take() {
                self.finish_bake(bake, &mut pipeline);
            }
        }
        self.coordinator.update(self.mesh.as_ref(), &self.pool);
    }

    fn finish_bake(&mut self, bake: BakeId, pipeline: &mut BuildPipeline) {
        let outcome = match pipeline.take_output() {
            Some((mesh, detail)) => {
                // Drain in-flight refs before the old mesh goes away.
                self.coordinator.cancel_all();
                self.generation += 1;
                match NavMesh::assemble(&mesh, detail, self.generation) {
                    Ok(nav) => {
                        log::debug!(
                            "bake {:?} complete: {} polys, generation {}",
                            bake,
                            nav.poly_count(),
                            self.generation
                        );
                        self.mesh = Some(nav);
                        BakeOutcome::Completed
                    }
                    Err(err) => {
                        log::warn!("bake {bake:?} assembly failed: {err}");
                        BakeOutcome::Failed
                    }
                }
            }
            None => {
                match pipeline.error() {
                    Some(err) => log::warn!("bake {bake:?} failed: {err}"),
                    None => log::warn!("bake {bake:?} failed"),
                }
                BakeOutcome::Failed
            }
        };
        self.bake_events.push_back(BakeEvent { bake, outcome });
    }

    pub fn request_path(
        &mut self,
        listener: ListenerId,
        entity: EntityId,
        start: Vec3,
        end: Vec3,
    ) -> RequestId {
        self.coordinator.request_path(listener, entity, start, end)
    }

    pub fn cancel_by_listener(&mut self, listener: ListenerId) {
        self.coordinator.cancel_by_listener(listener);
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = PathEvent> + '_ {
        self.coordinator.drain_events()
    }

    pub fn drain_bake_events(&mut self) -> impl Iterator<Item = BakeEvent> + '_ {
        self.bake_events.drain(..)
    }

    pub fn navmesh(&self) -> Option<&NavMesh> {
        self.mesh.as_ref()
    }

    pub fn pool(&self) -> &PathQueryPool {
        &self.pool
    }

    pub fn query_config(&self) -> &QueryConfig {
        &self.query_config
    }

    pub fn is_baking(&self) -> bool {
        self.pipeline.is_some()
    }

    pub fn bake_stage(&self) -> Option<BuildStage> {
        self.pipeline.as_ref().map(|(_, p)| p.stage())
    }

    /// Is there walkable mesh within the box around `point`? False while
    /// no bake has completed.
    pub fn is_walkable(&self, point: Vec3, half_extents: Vec3) -> bool {
        match &self.mesh {
            Some(mesh) => mesh.is_walkable(point, half_extents),
            None => false,
        }
    }

    /// Hand the running bake's intermediate state to a debug renderer.
    pub fn debug_draw(&self, draw: &mut dyn DebugDraw) {
        if let Some((_, pipeline)) = &self.pipeline {
            pipeline.debug_draw(draw);
        }
    }
}
