//! Bake configuration and the grid parameters derived from it.

use serde::{Deserialize, Serialize};
use waymesh_common::{Aabb, Error, Result, Vec3};

/// Navigation mesh bake parameters.
///
/// Distances are in world units unless noted; `min_region_area` and
/// `merge_region_area` are in cells, `max_simplification_error` in cell
/// units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BakeConfig {
    /// XZ size of one voxel cell.
    pub cell_size: f32,
    /// Vertical size of one voxel cell.
    pub cell_height: f32,
    /// Minimum clearance an agent needs to stand.
    pub agent_height: f32,
    /// Agent radius; walkable area is eroded by this much.
    pub agent_radius: f32,
    /// Maximum ledge height an agent can step over.
    pub agent_max_climb: f32,
    /// Maximum walkable surface slope, in degrees.
    pub walkable_slope_deg: f32,
    /// Regions smaller than this (in cells) are merged away or discarded.
    pub min_region_area: i32,
    /// Regions smaller than this (in cells) are merged when possible.
    pub merge_region_area: i32,
    /// Maximum contour deviation from the raw outline, in cell units.
    pub max_simplification_error: f32,
    /// Maximum contour edge length before it is split, in world units.
    /// Zero disables splitting.
    pub max_edge_len: f32,
    /// Detail mesh sampling distance, in world units. Zero disables
    /// subdivision.
    pub detail_sample_dist: f32,
    /// Maximum detail surface deviation before a sample is kept.
    pub detail_sample_max_error: f32,
    /// Vertex cap per polygon after convex merging.
    pub max_verts_per_poly: usize,
}

impl Default for BakeConfig {
    fn default() -> Self {
        Self {
            cell_size: 0.3,
            cell_height: 0.2,
            agent_height: 2.0,
            agent_radius: 0.6,
            agent_max_climb: 0.9,
            walkable_slope_deg: 45.0,
            min_region_area: 8,
            merge_region_area: 20,
            max_simplification_error: 1.3,
            max_edge_len: 12.0,
            detail_sample_dist: 6.0,
            detail_sample_max_error: 1.0,
            max_verts_per_poly: 6,
        }
    }
}

impl BakeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.cell_size <= 0.0 {
            return Err(Error::Configuration("cell_size must be > 0".into()));
        }
        if self.cell_height <= 0.0 {
            return Err(Error::Configuration("cell_height must be > 0".into()));
        }
        if self.agent_height <= 0.0 {
            return Err(Error::Configuration("agent_height must be > 0".into()));
        }
        if self.agent_radius < 0.0 {
            return Err(Error::Configuration("agent_radius must be >= 0".into()));
        }
        if self.agent_max_climb < 0.0 {
            return Err(Error::Configuration("agent_max_climb must be >= 0".into()));
        }
        if !(0.0..=90.0).contains(&self.walkable_slope_deg) {
            return Err(Error::Configuration(
                "walkable_slope_deg must be in [0, 90]".into(),
            ));
        }
        if self.min_region_area < 0 || self.merge_region_area < 0 {
            return Err(Error::Configuration("region areas must be >= 0".into()));
        }
        if self.max_simplification_error < 0.0 {
            return Err(Error::Configuration(
                "max_simplification_error must be >= 0".into(),
            ));
        }
        if self.max_edge_len < 0.0 {
            return Err(Error::Configuration("max_edge_len must be >= 0".into()));
        }
        if self.detail_sample_dist < 0.0 {
            return Err(Error::Configuration(
                "detail_sample_dist must be >= 0".into(),
            ));
        }
        if self.detail_sample_max_error < 0.0 {
            return Err(Error::Configuration(
                "detail_sample_max_error must be >= 0".into(),
            ));
        }
        if !(3..=6).contains(&self.max_verts_per_poly) {
            return Err(Error::Configuration(
                "max_verts_per_poly must be in [3, 6]".into(),
            ));
        }
        Ok(())
    }
}

/// Grid parameters derived from a [`BakeConfig`] and the input bounds.
///
/// Clearance and radius round up (conservative: never under-require space),
/// climb rounds down (never step further than allowed).
#[derive(Debug, Clone)]
pub struct GridConfig {
    pub width: i32,
    pub depth: i32,
    pub bmin: Vec3,
    pub bmax: Vec3,
    pub cell_size: f32,
    pub cell_height: f32,
    /// Agent clearance in cells, rounded up.
    pub walkable_height: i32,
    /// Step-over limit in cells, rounded down.
    pub walkable_climb: i32,
    /// Erosion radius in cells, rounded up.
    pub walkable_radius: i32,
    /// Contour edge limit in cells.
    pub max_edge_len: i32,
}

impl GridConfig {
    pub fn derive(config: &BakeConfig, bounds: &Aabb) -> Result<Self> {
        let extents = bounds.extents();
        if extents.x <= 0.0 || extents.z <= 0.0 {
            return Err(Error::Geometry(
                "input bounds have zero horizontal extent".into(),
            ));
        }
        let width = (extents.x / config.cell_size + 0.5) as i32;
        let depth = (extents.z / config.cell_size + 0.5) as i32;
        if width <= 0 || depth <= 0 {
            return Err(Error::Geometry(
                "input bounds smaller than one cell".into(),
            ));
        }
        Ok(Self {
            width,
            depth,
            bmin: bounds.min,
            bmax: bounds.max,
            cell_size: config.cell_size,
            cell_height: config.cell_height,
            walkable_height: (config.agent_height / config.cell_height).ceil() as i32,
            walkable_climb: (config.agent_max_climb / config.cell_height).floor() as i32,
            walkable_radius: (config.agent_radius / config.cell_size).ceil() as i32,
            max_edge_len: (config.max_edge_len / config.cell_size) as i32,
        })
    }
}
