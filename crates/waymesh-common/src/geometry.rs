//! Small geometry kit used by both the bake pipeline and runtime queries.
//!
//! All "2d" helpers work in the XZ plane; Y is carried through untouched.

use glam::Vec3;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Empty box that grows to fit whatever is added to it.
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::MAX),
            max: Vec3::splat(f32::MIN),
        }
    }

    pub fn add_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    pub fn extents(&self) -> Vec3 {
        self.max - self.min
    }
}

/// Bounds of a vertex set. Returns an empty box for an empty slice.
pub fn calc_bounds(vertices: &[Vec3]) -> Aabb {
    let mut bounds = Aabb::empty();
    for &v in vertices {
        bounds.add_point(v);
    }
    bounds
}

/// Signed double area of the triangle (a, b, c) projected onto XZ.
/// Positive when c lies to the left of the directed segment a -> b.
pub fn tri_area_2d(a: Vec3, b: Vec3, c: Vec3) -> f32 {
    let abx = b.x - a.x;
    let abz = b.z - a.z;
    let acx = c.x - a.x;
    let acz = c.z - a.z;
    acx * abz - abx * acz
}

/// Point-in-polygon test in the XZ plane (crossing number).
pub fn point_in_poly_2d(pt: Vec3, verts: &[Vec3]) -> bool {
    let n = verts.len();
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let vi = verts[i];
        let vj = verts[j];
        if ((vi.z > pt.z) != (vj.z > pt.z))
            && (pt.x < (vj.x - vi.x) * (pt.z - vi.z) / (vj.z - vi.z) + vi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Squared distance from `pt` to the segment (a, b) in the XZ plane.
pub fn dist_point_segment_2d_sqr(pt: Vec3, a: Vec3, b: Vec3) -> f32 {
    let bx = b.x - a.x;
    let bz = b.z - a.z;
    let dx = pt.x - a.x;
    let dz = pt.z - a.z;
    let d = bx * bx + bz * bz;
    let mut t = bx * dx + bz * dz;
    if d > 0.0 {
        t /= d;
    }
    let t = t.clamp(0.0, 1.0);
    let dx = a.x + t * bx - pt.x;
    let dz = a.z + t * bz - pt.z;
    dx * dx + dz * dz
}

/// Closest point on segment (a, b) to `pt`, interpolating in the XZ plane.
/// Y is lerped along the segment with the same parameter.
pub fn closest_point_on_segment_2d(pt: Vec3, a: Vec3, b: Vec3) -> Vec3 {
    let bx = b.x - a.x;
    let bz = b.z - a.z;
    let d = bx * bx + bz * bz;
    let mut t = bx * (pt.x - a.x) + bz * (pt.z - a.z);
    if d > 0.0 {
        t /= d;
    }
    let t = t.clamp(0.0, 1.0);
    a + (b - a) * t
}

/// Height of the triangle (a, b, c) at the XZ location of `pt`, via
/// barycentric interpolation. `None` when `pt` is outside the triangle.
pub fn triangle_height_at(pt: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
    const EPS: f32 = 1e-6;
    let v0x = c.x - a.x;
    let v0z = c.z - a.z;
    let v1x = b.x - a.x;
    let v1z = b.z - a.z;
    let v2x = pt.x - a.x;
    let v2z = pt.z - a.z;

    let dot00 = v0x * v0x + v0z * v0z;
    let dot01 = v0x * v1x + v0z * v1z;
    let dot02 = v0x * v2x + v0z * v2z;
    let dot11 = v1x * v1x + v1z * v1z;
    let dot12 = v1x * v2x + v1z * v2z;

    let denom = dot00 * dot11 - dot01 * dot01;
    if denom.abs() < EPS {
        return None;
    }
    let u = (dot11 * dot02 - dot01 * dot12) / denom;
    let v = (dot00 * dot12 - dot01 * dot02) / denom;
    if u >= -EPS && v >= -EPS && (u + v) <= 1.0 + EPS {
        Some(a.y + u * (c.y - a.y) + v * (b.y - a.y))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_of_points() {
        let b = calc_bounds(&[
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(-1.0, 0.0, 5.0),
            Vec3::new(0.5, 4.0, -2.0),
        ]);
        assert_eq!(b.min, Vec3::new(-1.0, 0.0, -2.0));
        assert_eq!(b.max, Vec3::new(1.0, 4.0, 5.0));
    }

    #[test]
    fn tri_area_sign() {
        let a = Vec3::ZERO;
        let b = Vec3::new(1.0, 0.0, 0.0);
        let left = Vec3::new(0.0, 0.0, 1.0);
        let right = Vec3::new(0.0, 0.0, -1.0);
        assert!(tri_area_2d(a, b, left) > 0.0);
        assert!(tri_area_2d(a, b, right) < 0.0);
    }

    #[test]
    fn point_in_square() {
        let square = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 2.0),
            Vec3::new(0.0, 0.0, 2.0),
        ];
        assert!(point_in_poly_2d(Vec3::new(1.0, 0.0, 1.0), &square));
        assert!(!point_in_poly_2d(Vec3::new(3.0, 0.0, 1.0), &square));
    }

    #[test]
    fn segment_distance() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(2.0, 0.0, 0.0);
        let d = dist_point_segment_2d_sqr(Vec3::new(1.0, 0.0, 1.0), a, b);
        assert!((d - 1.0).abs() < 1e-6);
        // Past the endpoint the distance is to the endpoint itself.
        let d = dist_point_segment_2d_sqr(Vec3::new(3.0, 0.0, 0.0), a, b);
        assert!((d - 1.0).abs() < 1e-6);
    }

    #[test]
    fn barycentric_height() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 0.0, 2.0);
        let c = Vec3::new(2.0, 2.0, 0.0);
        let h = triangle_height_at(Vec3::new(1.0, 0.0, 0.0), a, b, c);
        assert!(h.is_some());
        assert!((h.unwrap() - 1.0).abs() < 1e-5);
        assert!(triangle_height_at(Vec3::new(5.0, 0.0, 5.0), a, b, c).is_none());
    }
}
