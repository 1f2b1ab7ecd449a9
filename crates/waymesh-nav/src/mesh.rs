//! Immutable runtime navigation mesh.

use waymesh_build::detail::DetailMesh;
use waymesh_build::polymesh::{PolyMesh, NULL_INDEX};
use waymesh_common::{
    closest_point_on_segment_2d, point_in_poly_2d, Aabb, Error, Result, Vec3,
};

use crate::filter::QueryFilter;

/// Hard cap on polygon vertex count; bakes must stay at or under it.
pub const MAX_VERTS_PER_POLY: usize = 6;

/// Flag set on every walkable polygon; the bake assigns it, so the
/// constant lives there.
pub use waymesh_build::polymesh::POLY_FLAG_WALKABLE;
/// Hosts may set this on polygons bridged by an off-mesh link; straight
/// paths flag the entry point and steering stops there.
pub const POLY_FLAG_OFF_MESH: u16 = 0x02;

const INDEX_BITS: u32 = 20;
const INDEX_MASK: u32 = (1 << INDEX_BITS) - 1;

/// Generation-stamped polygon handle. The high bits carry the bake
/// generation of the owning mesh, so a ref minted against one bake never
/// validates against another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PolyRef(u32);

impl PolyRef {
    pub const NULL: PolyRef = PolyRef(0);

    pub fn new(generation: u32, index: usize) -> Self {
        PolyRef((generation.max(1) << INDEX_BITS) | (index as u32 & INDEX_MASK))
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    pub fn generation(self) -> u32 {
        self.0 >> INDEX_BITS
    }

    pub fn index(self) -> usize {
        (self.0 & INDEX_MASK) as usize
    }
}

/// One convex polygon of the mesh.
pub struct NavPoly {
    pub verts: [u16; MAX_VERTS_PER_POLY],
    /// Per-edge neighbor as polygon index + 1; 0 = border edge.
    pub neis: [u16; MAX_VERTS_PER_POLY],
    pub vert_count: u8,
    pub flags: u16,
    pub area: u8,
    pub region: u16,
    pub bounds: Aabb,
    pub center: Vec3,
}

/// Immutable navigation mesh produced by one bake.
pub struct NavMesh {
    generation: u32,
    verts: Vec<Vec3>,
    polys: Vec<NavPoly>,
    detail: DetailMesh,
    bounds: Aabb,
}

impl NavMesh {
    /// Assemble the runtime mesh from bake output. `generation` stamps
    /// every [`PolyRef`] this mesh hands out; zero is promoted to one so
    /// refs are never null.
    pub fn assemble(mesh: &PolyMesh, detail: DetailMesh, generation: u32) -> Result<Self> {
        if mesh.nvp > MAX_VERTS_PER_POLY {
            return Err(Error::Configuration(format!(
                "mesh has {} verts per poly, runtime cap is {}",
                mesh.nvp, MAX_VERTS_PER_POLY
            )));
        }
        if mesh.npolys > INDEX_MASK as usize {
            return Err(Error::Allocation(format!(
                "{} polygons exceed the poly ref index range",
                mesh.npolys
            )));
        }

        let verts: Vec<Vec3> = (0..mesh.verts.len()).map(|i| mesh.vertex_world(i)).collect();

        let mut polys = Vec::with_capacity(mesh.npolys);
        for p in 0..mesh.npolys {
            let count = mesh.poly_vertex_count(p);
            let (vs, ns) = mesh.poly(p);

            let mut poly = NavPoly {
                verts: [0; MAX_VERTS_PER_POLY],
                neis: [0; MAX_VERTS_PER_POLY],
                vert_count: count as u8,
                flags: mesh.flags[p],
                area: mesh.areas[p],
                region: mesh.regions[p],
                bounds: Aabb::empty(),
                center: Vec3::ZERO,
            };
            for i in 0..count {
                poly.verts[i] = vs[i];
                poly.neis[i] = if ns[i] == NULL_INDEX { 0 } else { ns[i] + 1 };
                poly.bounds.add_point(verts[vs[i] as usize]);
                poly.center += verts[vs[i] as usize];
            }
            poly.center /= count as f32;
            polys.push(poly);
        }

        let mut bounds = Aabb::empty();
        for v in &verts {
            bounds.add_point(*v);
        }

        Ok(Self {
            generation: generation.max(1),
            verts,
            polys,
            detail,
            bounds,
        })
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn poly_count(&self) -> usize {
        self.polys.len()
    }

    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    pub fn poly_ref(&self, index: usize) -> PolyRef {
        PolyRef::new(self.generation, index)
    }

    /// A ref is valid only if it was minted by this mesh's generation and
    /// addresses an existing polygon.
    pub fn is_valid(&self, r: PolyRef) -> bool {
        !r.is_null() && r.generation() == self.generation && r.index() < self.polys.len()
    }

    pub fn poly(&self, r: PolyRef) -> Option<&NavPoly> {
        if self.is_valid(r) {
            self.polys.get(r.index())
        } else {
            None
        }
    }

    pub fn vertex(&self, i: u16) -> Vec3 {
        self.verts[i as usize]
    }

    /// Neighbor across `edge`, if the edge is interior.
    pub fn neighbor(&self, r: PolyRef, edge: usize) -> Option<PolyRef> {
        let poly = self.poly(r)?;
        if edge >= poly.vert_count as usize {
            return None;
        }
        match poly.neis[edge] {
            0 => None,
            n => Some(self.poly_ref(n as usize - 1)),
        }
    }

    /// Endpoints of the portal edge from `from` into `to`, in `from`'s
    /// winding order.
    pub fn portal_points(&self, from: PolyRef, to: PolyRef) -> Option<(Vec3, Vec3)> {
        let poly = self.poly(from)?;
        if !self.is_valid(to) {
            return None;
        }
        let count = poly.vert_count as usize;
        for edge in 0..count {
            if poly.neis[edge] as usize == to.index() + 1 {
                let left = self.verts[poly.verts[edge] as usize];
                let right = self.verts[poly.verts[(edge + 1) % count] as usize];
                return Some((left, right));
            }
        }
        None
    }

    /// Detail-accurate surface height at `pos` over polygon `r`.
    pub fn poly_height(&self, r: PolyRef, pos: Vec3) -> Option<f32> {
        if !self.is_valid(r) {
            return None;
        }
        self.detail.poly_height(r.index(), pos)
    }

    /// Closest point on polygon `r` to `pos`: `pos` dropped onto the
    /// detail surface when inside, the nearest boundary point otherwise.
    pub fn closest_point_on_poly(&self, r: PolyRef, pos: Vec3) -> Option<Vec3> {
        let poly = self.poly(r)?;
        let count = poly.vert_count as usize;
        let mut world = [Vec3::ZERO; MAX_VERTS_PER_POLY];
        for i in 0..count {
            world[i] = self.verts[poly.verts[i] as usize];
        }

        if point_in_poly_2d(pos, &world[..count]) {
            let y = self.poly_height(r, pos).unwrap_or(poly.center.y);
            return Some(Vec3::new(pos.x, y, pos.z));
        }

        let mut best = world[0];
        let mut best_d = f32::MAX;
        for i in 0..count {
            let a = world[i];
            let b = world[(i + 1) % count];
            let candidate = closest_point_on_segment_2d(pos, a, b);
            let dx = candidate.x - pos.x;
            let dz = candidate.z - pos.z;
            let d = dx * dx + dz * dz;
            if d < best_d {
                best_d = d;
                best = candidate;
            }
        }
        Some(best)
    }

    /// Polygon nearest `center` within the search box, with the closest
    /// point on it. Linear scan over poly bounds; the mesh is monolithic.
    pub fn find_nearest_poly(
        &self,
        center: Vec3,
        half_extents: Vec3,
        filter: &QueryFilter,
    ) -> Option<(PolyRef, Vec3)> {
        let query = Aabb::new(center - half_extents, center + half_extents);
        let mut best: Option<(PolyRef, Vec3)> = None;
        let mut best_d = f32::MAX;

        for (i, poly) in self.polys.iter().enumerate() {
            if !filter.passes(poly.flags) || !query.overlaps(&poly.bounds) {
                continue;
            }
            let r = self.poly_ref(i);
            if let Some(pt) = self.closest_point_on_poly(r, center) {
                let d = pt.distance_squared(center);
                if d < best_d {
                    best_d = d;
                    best = Some((r, pt));
                }
            }
        }
        best
    }

    /// Is there walkable mesh within the box around `point`?
    pub fn is_walkable(&self, point: Vec3, half_extents: Vec3) -> bool {
        let filter = QueryFilter::default();
        match self.find_nearest_poly(point, half_extents, &filter) {
            Some((_, pt)) => {
                let d = (pt - point).abs();
                d.x <= half_extents.x && d.y <= half_extents.y && d.z <= half_extents.z
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poly_ref_packs_generation_and_index() {
        let r = PolyRef::new(7, 1234);
        assert_eq!(r.generation(), 7);
        assert_eq!(r.index(), 1234);
        assert!(!r.is_null());
    }

    #[test]
    fn zero_generation_is_promoted() {
        let r = PolyRef::new(0, 0);
        assert!(!r.is_null());
        assert_eq!(r.generation(), 1);
    }

    #[test]
    fn null_ref_is_null() {
        assert!(PolyRef::NULL.is_null());
    }
}
