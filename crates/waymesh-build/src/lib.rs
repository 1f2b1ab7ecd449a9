//! Navigation mesh construction.
//!
//! The bake is a staged pipeline: source triangles are voxelized into a
//! heightfield, unwalkable spans are filtered out, the open space is
//! partitioned into regions, region outlines are traced and simplified into
//! contours, and the contours are triangulated and merged into the convex
//! polygon mesh (plus a detail mesh for accurate surface height). Each
//! stage runs as one step of [`pipeline::BuildPipeline`], so a host can
//! spread a bake across frames and cancel it between steps.

pub mod compact;
pub mod config;
pub mod contour;
pub mod debug;
pub mod detail;
pub mod heightfield;
pub mod input;
pub mod pipeline;
pub mod polymesh;
pub mod region;

pub use compact::CompactHeightfield;
pub use config::{BakeConfig, GridConfig};
pub use contour::{build_contours, Contour, ContourSet};
pub use debug::DebugDraw;
pub use detail::{build_detail_mesh, DetailMesh};
pub use heightfield::{Heightfield, Span, NULL_AREA, WALKABLE_AREA};
pub use input::{GeometryBuffer, GeometrySource};
pub use pipeline::{BuildPipeline, BuildStage};
pub use polymesh::{build_poly_mesh, PolyMesh, NULL_INDEX, POLY_FLAG_WALKABLE};
