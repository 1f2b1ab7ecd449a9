//! Read-only visualization hook for bake intermediates.

use waymesh_common::Vec3;

/// Receives draw primitives for whatever intermediate data the pipeline
/// currently holds. All methods default to no-ops so implementors only
/// override what they render.
pub trait DebugDraw {
    /// Solid heightfield span as a world-space box.
    fn span(&mut self, _min: Vec3, _max: Vec3, _area: u8) {}

    /// Open span floor with its region id (0 = unassigned).
    fn region_span(&mut self, _position: Vec3, _region: u16) {}

    /// One simplified contour outline in world space.
    fn contour(&mut self, _vertices: &[Vec3], _region: u16) {}

    /// One polygon of the final mesh in world space.
    fn polygon(&mut self, _vertices: &[Vec3], _flags: u16) {}
}
