//! Staged bake pipeline.
//!
//! The bake is an explicit state machine: each call to
//! [`BuildPipeline::update`] runs exactly one stage, so a host can spread
//! the work across frames, inspect intermediates through
//! [`BuildPipeline::debug_draw`], and cancel between steps. Stage scratch
//! data lives in the state enum itself; nothing survives a stage except
//! what the next one needs.

use waymesh_common::{Error, Result, Vec3};

use crate::compact::CompactHeightfield;
use crate::config::{BakeConfig, GridConfig};
use crate::contour::{build_contours, ContourSet};
use crate::debug::DebugDraw;
use crate::detail::{build_detail_mesh, DetailMesh};
use crate::heightfield::{Heightfield, NULL_AREA};
use crate::input::{GeometryBuffer, GeometrySource};
use crate::polymesh::{build_poly_mesh, PolyMesh};
use crate::region::build_regions;

/// Pipeline progress. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    Rasterize,
    Filter,
    Partition,
    Contour,
    Mesh,
    Finalize,
    Done,
    Failed,
}

enum StageData {
    Rasterize { geometry: GeometryBuffer },
    Filter { heightfield: Heightfield },
    Partition { heightfield: Heightfield },
    Contour { compact: CompactHeightfield },
    Mesh { compact: CompactHeightfield, contours: ContourSet },
    Finalize { compact: CompactHeightfield, mesh: PolyMesh },
    Terminal,
}

pub struct BuildPipeline {
    config: BakeConfig,
    grid: GridConfig,
    stage: BuildStage,
    data: StageData,
    output: Option<(PolyMesh, DetailMesh)>,
    error: Option<Error>,
}

impl BuildPipeline {
    /// Validate the configuration, collect the input geometry, and set the
    /// pipeline up to run. No bake work happens here.
    pub fn new(config: BakeConfig, sources: &[GeometrySource]) -> Result<Self> {
        config.validate()?;
        let geometry = GeometryBuffer::collect(sources)?;
        let grid = GridConfig::derive(&config, &geometry.bounds)?;
        log::debug!(
            "bake pipeline: {} triangles over a {}x{} grid",
            geometry.triangle_count(),
            grid.width,
            grid.depth
        );
        Ok(Self {
            config,
            grid,
            stage: BuildStage::Rasterize,
            data: StageData::Rasterize { geometry },
            output: None,
            error: None,
        })
    }

    /// The next stage to run, or the terminal state.
    pub fn stage(&self) -> BuildStage {
        self.stage
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.stage, BuildStage::Done | BuildStage::Failed)
    }

    /// Abandon the bake. Terminal pipelines are unaffected.
    pub fn cancel(&mut self) {
        if !self.is_finished() {
            self.stage = BuildStage::Failed;
            self.data = StageData::Terminal;
            self.error = Some(Error::Cancelled);
        }
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// The finished mesh pair, once. `None` before `Done` or after taking.
    pub fn take_output(&mut self) -> Option<(PolyMesh, DetailMesh)> {
        self.output.take()
    }

    /// Run one stage. Returns the stage the pipeline is now waiting on.
    pub fn update(&mut self) -> BuildStage {
        if self.is_finished() {
            return self.stage;
        }
        let data = std::mem::replace(&mut self.data, StageData::Terminal);
        match self.advance(data) {
            Ok((stage, data)) => {
                self.stage = stage;
                self.data = data;
            }
            Err(err) => {
                log::debug!("bake pipeline failed in {:?}: {err}", self.stage);
                self.stage = BuildStage::Failed;
                self.error = Some(err);
            }
        }
        self.stage
    }

    fn advance(&mut self, data: StageData) -> Result<(BuildStage, StageData)> {
        match data {
            StageData::Rasterize { geometry } => {
                let mut heightfield = Heightfield::new(&self.grid);
                heightfield.rasterize(&geometry, self.config.walkable_slope_deg)?;
                Ok((BuildStage::Filter, StageData::Filter { heightfield }))
            }
            StageData::Filter { mut heightfield } => {
                heightfield.filter_low_hanging_obstacles(self.grid.walkable_climb);
                heightfield.filter_ledge_spans(self.grid.walkable_height, self.grid.walkable_climb);
                heightfield.filter_low_height_spans(self.grid.walkable_height);
                if heightfield.walkable_span_count() == 0 {
                    return Err(Error::Geometry("no walkable surface after filtering".into()));
                }
                Ok((BuildStage::Partition, StageData::Partition { heightfield }))
            }
            StageData::Partition { heightfield } => {
                let mut compact = CompactHeightfield::build(
                    &heightfield,
                    self.grid.walkable_height,
                    self.grid.walkable_climb,
                )?;
                compact.erode_walkable_area(self.grid.walkable_radius)?;
                compact.build_distance_field()?;
                build_regions(
                    &mut compact,
                    self.config.min_region_area,
                    self.config.merge_region_area,
                )?;
                Ok((BuildStage::Contour, StageData::Contour { compact }))
            }
            StageData::Contour { compact } => {
                let contours = build_contours(
                    &compact,
                    self.config.max_simplification_error,
                    self.grid.max_edge_len,
                )?;
                Ok((BuildStage::Mesh, StageData::Mesh { compact, contours }))
            }
            StageData::Mesh { compact, contours } => {
                let mesh = build_poly_mesh(&contours, self.config.max_verts_per_poly)?;
                Ok((BuildStage::Finalize, StageData::Finalize { compact, mesh }))
            }
            StageData::Finalize { compact, mesh } => {
                let detail = build_detail_mesh(
                    &mesh,
                    &compact,
                    self.config.detail_sample_dist,
                    self.config.detail_sample_max_error,
                )?;
                log::debug!("bake pipeline: done, {} polygons", mesh.npolys);
                self.output = Some((mesh, detail));
                Ok((BuildStage::Done, StageData::Terminal))
            }
            StageData::Terminal => Ok((self.stage, StageData::Terminal)),
        }
    }

    /// Feed whatever intermediate the pipeline currently holds to `draw`.
    pub fn debug_draw(&self, draw: &mut dyn DebugDraw) {
        match &self.data {
            StageData::Filter { heightfield } | StageData::Partition { heightfield } => {
                let hf = heightfield;
                for z in 0..hf.depth {
                    for x in 0..hf.width {
                        for s in hf.column(x, z) {
                            let min = Vec3::new(
                                hf.bmin.x + x as f32 * hf.cell_size,
                                hf.bmin.y + s.min as f32 * hf.cell_height,
                                hf.bmin.z + z as f32 * hf.cell_size,
                            );
                            let max = Vec3::new(
                                min.x + hf.cell_size,
                                hf.bmin.y + s.max as f32 * hf.cell_height,
                                min.z + hf.cell_size,
                            );
                            draw.span(min, max, s.area);
                        }
                    }
                }
            }
            StageData::Contour { compact } => {
                for z in 0..compact.depth {
                    for x in 0..compact.width {
                        let cell = compact.cell(x, z);
                        for si in cell.first as usize..(cell.first + cell.count) as usize {
                            if compact.areas[si] != NULL_AREA {
                                draw.region_span(
                                    compact.span_position(x, z, si),
                                    compact.regions[si],
                                );
                            }
                        }
                    }
                }
            }
            StageData::Mesh { contours, .. } => {
                let mut world = Vec::new();
                for c in &contours.contours {
                    world.clear();
                    for v in &c.vertices {
                        world.push(Vec3::new(
                            contours.bmin.x + v.x as f32 * contours.cell_size,
                            contours.bmin.y + v.y as f32 * contours.cell_height,
                            contours.bmin.z + v.z as f32 * contours.cell_size,
                        ));
                    }
                    draw.contour(&world, c.region);
                }
            }
            StageData::Finalize { mesh, .. } => {
                let mut world = Vec::new();
                for p in 0..mesh.npolys {
                    world.clear();
                    let count = mesh.poly_vertex_count(p);
                    let (vs, _) = mesh.poly(p);
                    for &vi in &vs[..count] {
                        world.push(mesh.vertex_world(vi as usize));
                    }
                    draw.polygon(&world, mesh.flags[p]);
                }
            }
            StageData::Rasterize { .. } | StageData::Terminal => {}
        }
    }
}
