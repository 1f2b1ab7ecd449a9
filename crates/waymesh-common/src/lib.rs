//! Shared types for the waymesh navigation stack.
//!
//! Everything downstream (the bake pipeline, the runtime mesh, the agent
//! layer) speaks in terms of these types, so the error taxonomy and the
//! small geometry kit live here rather than in any one stage.

mod geometry;

pub use geometry::{
    calc_bounds, closest_point_on_segment_2d, dist_point_segment_2d_sqr, point_in_poly_2d,
    tri_area_2d, triangle_height_at, Aabb,
};

/// Re-exported so downstream crates agree on the math type.
pub type Vec3 = glam::Vec3;

/// Error type shared by every waymesh crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Bake or query configuration failed validation.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Input geometry is empty, malformed, or degenerate.
    #[error("invalid input geometry: {0}")]
    Geometry(String),

    /// A fixed-capacity structure (span column, node table, vertex budget)
    /// would exceed its limit.
    #[error("allocation limit exceeded: {0}")]
    Allocation(String),

    /// The search ran to completion without reaching the target.
    #[error("no path found: {0}")]
    PathNotFound(String),

    /// The operation was cancelled before it produced a result.
    #[error("operation cancelled")]
    Cancelled,
}

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, Error>;
