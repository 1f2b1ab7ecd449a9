//! Convex polygon mesh built from simplified contours.
//!
//! Each contour is ear-clipped into triangles, triangles are greedily
//! merged into convex polygons of up to `nvp` vertices, vertices are
//! deduplicated through a spatial hash, and polygon adjacency is derived
//! from shared edges.

use std::collections::HashMap;

use waymesh_common::{Error, Result, Vec3};

use crate::contour::{ContourSet, ContourVertex};
use crate::heightfield::WALKABLE_AREA;

/// Sentinel for "no vertex / no neighbor" slots in poly rows.
pub const NULL_INDEX: u16 = 0xffff;
/// Default flag set on every walkable polygon.
pub const POLY_FLAG_WALKABLE: u16 = 0x01;

const VERTEX_BUCKET_COUNT: usize = 1 << 12;

pub struct PolyMesh {
    /// Vertices in cell coordinates.
    pub verts: Vec<[u16; 3]>,
    /// `npolys` rows of `2 * nvp`: the first `nvp` entries are vertex
    /// indices (unused slots = [`NULL_INDEX`]), the second `nvp` are the
    /// neighbor poly per edge ([`NULL_INDEX`] = border).
    pub polys: Vec<u16>,
    pub regions: Vec<u16>,
    pub areas: Vec<u8>,
    pub flags: Vec<u16>,
    pub npolys: usize,
    pub nvp: usize,
    pub bmin: Vec3,
    pub bmax: Vec3,
    pub cell_size: f32,
    pub cell_height: f32,
}

impl PolyMesh {
    /// Vertex-index and neighbor halves of poly `i`'s row.
    pub fn poly(&self, i: usize) -> (&[u16], &[u16]) {
        let row = &self.polys[i * self.nvp * 2..(i + 1) * self.nvp * 2];
        (&row[..self.nvp], &row[self.nvp..])
    }

    pub fn poly_vertex_count(&self, i: usize) -> usize {
        let (vs, _) = self.poly(i);
        vs.iter().take_while(|&&v| v != NULL_INDEX).count()
    }

    pub fn vertex_world(&self, vi: usize) -> Vec3 {
        let v = self.verts[vi];
        Vec3::new(
            self.bmin.x + v[0] as f32 * self.cell_size,
            self.bmin.y + v[1] as f32 * self.cell_height,
            self.bmin.z + v[2] as f32 * self.cell_size,
        )
    }
}

/// Build the polygon mesh from a contour set. `nvp` is the per-polygon
/// vertex cap (3..=6).
pub fn build_poly_mesh(cset: &ContourSet, nvp: usize) -> Result<PolyMesh> {
    let mut verts: Vec<[u16; 3]> = Vec::new();
    let mut first_vert = [-1i32; VERTEX_BUCKET_COUNT];
    let mut next_vert: Vec<i32> = Vec::new();

    let mut polys: Vec<u16> = Vec::new();
    let mut regions: Vec<u16> = Vec::new();
    let mut areas: Vec<u8> = Vec::new();

    for contour in &cset.contours {
        let n = contour.vertices.len();
        if n < 3 {
            continue;
        }

        let mut tris = Vec::new();
        if !triangulate(&contour.vertices, &mut tris) {
            // A partial triangle set would leave holes in the mesh.
            return Err(Error::Geometry(format!(
                "failed to triangulate the outline of region {}",
                contour.region
            )));
        }

        // Contour verts -> deduplicated mesh verts.
        let mut global: Vec<u16> = Vec::with_capacity(n);
        for v in &contour.vertices {
            let idx = add_vertex(
                v.x as u16,
                v.y.max(0) as u16,
                v.z as u16,
                &mut verts,
                &mut first_vert,
                &mut next_vert,
            )?;
            global.push(idx);
        }

        // Seed polys with the triangles; duplicates from hole bridges
        // collapse to degenerate triangles and are dropped here.
        let mut contour_polys: Vec<Vec<u16>> = Vec::new();
        for t in &tris {
            let a = global[t[0] as usize];
            let b = global[t[1] as usize];
            let c = global[t[2] as usize];
            if a != b && a != c && b != c {
                contour_polys.push(vec![a, b, c]);
            }
        }

        // Greedy convex merge: repeatedly join the pair sharing the
        // longest edge whose union stays convex and under the cap.
        if nvp > 3 {
            loop {
                let mut best = 0i64;
                let mut best_pair = None;
                for j in 0..contour_polys.len() {
                    for k in j + 1..contour_polys.len() {
                        if let Some((value, ea, eb)) =
                            merge_value(&contour_polys[j], &contour_polys[k], nvp, &verts)
                        {
                            if value > best {
                                best = value;
                                best_pair = Some((j, k, ea, eb));
                            }
                        }
                    }
                }
                let Some((j, k, ea, eb)) = best_pair else { break };
                let merged = merge_polys(&contour_polys[j], &contour_polys[k], ea, eb);
                contour_polys[j] = merged;
                contour_polys.swap_remove(k);
            }
        }

        for p in &contour_polys {
            let mut row = vec![NULL_INDEX; nvp * 2];
            row[..p.len()].copy_from_slice(p);
            polys.extend_from_slice(&row);
            regions.push(contour.region);
            areas.push(contour.area);
        }
    }

    if verts.len() > NULL_INDEX as usize - 1 {
        return Err(Error::Allocation(format!(
            "polygon mesh vertex count {} exceeds index range",
            verts.len()
        )));
    }
    // Neighbor slots store poly indices as u16 with NULL_INDEX reserved.
    if regions.len() > NULL_INDEX as usize {
        return Err(Error::Allocation(format!(
            "polygon count {} exceeds neighbor index range",
            regions.len()
        )));
    }

    let npolys = regions.len();
    let flags = areas
        .iter()
        .map(|&a| if a != 0 { POLY_FLAG_WALKABLE } else { 0 })
        .collect();

    let mut mesh = PolyMesh {
        verts,
        polys,
        regions,
        areas,
        flags,
        npolys,
        nvp,
        bmin: cset.bmin,
        bmax: cset.bmax,
        cell_size: cset.cell_size,
        cell_height: cset.cell_height,
    };
    build_adjacency(&mut mesh);

    log::debug!(
        "polymesh: {} polygons, {} vertices (nvp {})",
        mesh.npolys,
        mesh.verts.len(),
        nvp
    );
    debug_assert!(mesh.areas.iter().all(|&a| a == 0 || a == WALKABLE_AREA));
    Ok(mesh)
}

/// Link polys that share an edge. Each interior edge appears once in each
/// winding direction, so an unordered key pairs them up.
fn build_adjacency(mesh: &mut PolyMesh) {
    let nvp = mesh.nvp;
    let mut open_edges: HashMap<(u16, u16), (usize, usize)> = HashMap::new();

    for p in 0..mesh.npolys {
        let count = mesh.poly_vertex_count(p);
        for e in 0..count {
            let row = p * nvp * 2;
            let v0 = mesh.polys[row + e];
            let v1 = mesh.polys[row + (e + 1) % count];
            let key = (v0.min(v1), v0.max(v1));
            match open_edges.remove(&key) {
                Some((op, oe)) => {
                    mesh.polys[row + nvp + e] = op as u16;
                    mesh.polys[op * nvp * 2 + nvp + oe] = p as u16;
                }
                None => {
                    open_edges.insert(key, (p, e));
                }
            }
        }
    }
}

fn add_vertex(
    x: u16,
    y: u16,
    z: u16,
    verts: &mut Vec<[u16; 3]>,
    first_vert: &mut [i32; VERTEX_BUCKET_COUNT],
    next_vert: &mut Vec<i32>,
) -> Result<u16> {
    let bucket = vertex_hash(x as i32, z as i32);
    let mut i = first_vert[bucket];
    while i != -1 {
        let v = verts[i as usize];
        if v[0] == x && v[2] == z && (v[1] as i32 - y as i32).abs() <= 2 {
            return Ok(i as u16);
        }
        i = next_vert[i as usize];
    }

    let i = verts.len();
    if i >= NULL_INDEX as usize {
        return Err(Error::Allocation("too many polygon mesh vertices".into()));
    }
    verts.push([x, y, z]);
    next_vert.push(first_vert[bucket]);
    first_vert[bucket] = i as i32;
    Ok(i as u16)
}

fn vertex_hash(x: i32, z: i32) -> usize {
    const H1: u32 = 0x8da6b343;
    const H3: u32 = 0xcb1ab31f;
    let n = H1
        .wrapping_mul(x as u32)
        .wrapping_add(H3.wrapping_mul(z as u32));
    (n as usize) & (VERTEX_BUCKET_COUNT - 1)
}

// Ear-clip triangulation over the contour's XZ projection. Index values
// carry a "removable ear" marker in the high bit while clipping.

const EAR_FLAG: u32 = 0x8000_0000;
const IDX_MASK: u32 = 0x7fff_ffff;

fn triangulate(vertices: &[ContourVertex], tris: &mut Vec<[u16; 3]>) -> bool {
    let n = vertices.len();
    let mut indices: Vec<u32> = (0..n as u32).collect();

    for i in 0..n {
        let i1 = next(i, n);
        let i2 = next(i1, n);
        if diagonal(i, i2, &indices, vertices) {
            indices[i1] |= EAR_FLAG;
        }
    }

    let mut n = n;
    let mut ok = true;
    while n > 3 {
        let mut min_len = i64::MAX;
        let mut min_i = None;
        for i in 0..n {
            let i1 = next(i, n);
            if indices[i1] & EAR_FLAG != 0 {
                let p0 = &vertices[(indices[i] & IDX_MASK) as usize];
                let p2 = &vertices[(indices[next(i1, n)] & IDX_MASK) as usize];
                let dx = (p2.x - p0.x) as i64;
                let dz = (p2.z - p0.z) as i64;
                let len = dx * dx + dz * dz;
                if len < min_len {
                    min_len = len;
                    min_i = Some(i);
                }
            }
        }

        let mut i = match min_i {
            Some(i) => i,
            None => {
                // Outline pinched by a hole bridge; retry with the loose
                // test that tolerates collinear bridge edges.
                let mut loose = None;
                for i in 0..n {
                    let i1 = next(i, n);
                    let i2 = next(i1, n);
                    if diagonal_loose(i, i2, &indices[..n], vertices) {
                        loose = Some(i);
                        break;
                    }
                }
                match loose {
                    Some(i) => i,
                    None => {
                        ok = false;
                        break;
                    }
                }
            }
        };

        let i1 = next(i, n);
        let i2 = next(i1, n);
        tris.push([
            (indices[i] & IDX_MASK) as u16,
            (indices[i1] & IDX_MASK) as u16,
            (indices[i2] & IDX_MASK) as u16,
        ]);

        // Remove i1, then refresh the ear flags around the cut.
        indices.remove(i1);
        n -= 1;
        let mut i1 = i1;
        if i1 >= n {
            i1 = 0;
        }
        i = prev(i1, n);
        if diagonal(prev(i, n), i1, &indices[..n], vertices) {
            indices[i] |= EAR_FLAG;
        } else {
            indices[i] &= IDX_MASK;
        }
        if diagonal(i, next(i1, n), &indices[..n], vertices) {
            indices[i1] |= EAR_FLAG;
        } else {
            indices[i1] &= IDX_MASK;
        }
    }

    if n == 3 {
        tris.push([
            (indices[0] & IDX_MASK) as u16,
            (indices[1] & IDX_MASK) as u16,
            (indices[2] & IDX_MASK) as u16,
        ]);
    }
    ok
}

#[inline]
fn prev(i: usize, n: usize) -> usize {
    if i == 0 {
        n - 1
    } else {
        i - 1
    }
}

#[inline]
fn next(i: usize, n: usize) -> usize {
    (i + 1) % n
}

fn at<'a>(indices: &[u32], vertices: &'a [ContourVertex], i: usize) -> &'a ContourVertex {
    &vertices[(indices[i] & IDX_MASK) as usize]
}

fn area2(a: &ContourVertex, b: &ContourVertex, c: &ContourVertex) -> i64 {
    (b.x - a.x) as i64 * (c.z - a.z) as i64 - (c.x - a.x) as i64 * (b.z - a.z) as i64
}

fn left(a: &ContourVertex, b: &ContourVertex, c: &ContourVertex) -> bool {
    area2(a, b, c) < 0
}

fn left_on(a: &ContourVertex, b: &ContourVertex, c: &ContourVertex) -> bool {
    area2(a, b, c) <= 0
}

fn collinear(a: &ContourVertex, b: &ContourVertex, c: &ContourVertex) -> bool {
    area2(a, b, c) == 0
}

/// Proper intersection: segments cross at a point interior to both.
fn intersect_prop(
    a: &ContourVertex,
    b: &ContourVertex,
    c: &ContourVertex,
    d: &ContourVertex,
) -> bool {
    if collinear(a, b, c) || collinear(a, b, d) || collinear(c, d, a) || collinear(c, d, b) {
        return false;
    }
    (left(a, b, c) ^ left(a, b, d)) && (left(c, d, a) ^ left(c, d, b))
}

/// Is c on the closed segment (a, b)? Assumes collinearity.
fn between(a: &ContourVertex, b: &ContourVertex, c: &ContourVertex) -> bool {
    if !collinear(a, b, c) {
        return false;
    }
    if a.x != b.x {
        (a.x <= c.x && c.x <= b.x) || (a.x >= c.x && c.x >= b.x)
    } else {
        (a.z <= c.z && c.z <= b.z) || (a.z >= c.z && c.z >= b.z)
    }
}

fn intersect(a: &ContourVertex, b: &ContourVertex, c: &ContourVertex, d: &ContourVertex) -> bool {
    intersect_prop(a, b, c, d)
        || between(a, b, c)
        || between(a, b, d)
        || between(c, d, a)
        || between(c, d, b)
}

/// (i, j) is a diagonal strictly inside the polygon, touching no edge.
fn diagonalie(i: usize, j: usize, indices: &[u32], vertices: &[ContourVertex]) -> bool {
    let n = indices.len();
    let d0 = at(indices, vertices, i);
    let d1 = at(indices, vertices, j);
    for k in 0..n {
        let k1 = next(k, n);
        if k == i || k1 == i || k == j || k1 == j {
            continue;
        }
        let p0 = at(indices, vertices, k);
        let p1 = at(indices, vertices, k1);
        if (d0.x == p0.x && d0.z == p0.z)
            || (d1.x == p0.x && d1.z == p0.z)
            || (d0.x == p1.x && d0.z == p1.z)
            || (d1.x == p1.x && d1.z == p1.z)
        {
            continue;
        }
        if intersect(d0, d1, p0, p1) {
            return false;
        }
    }
    true
}

fn in_cone(i: usize, j: usize, indices: &[u32], vertices: &[ContourVertex]) -> bool {
    let n = indices.len();
    let pi = at(indices, vertices, i);
    let pj = at(indices, vertices, j);
    let pi1 = at(indices, vertices, next(i, n));
    let pin1 = at(indices, vertices, prev(i, n));

    if left_on(pin1, pi, pi1) {
        left(pi, pj, pin1) && left(pj, pi, pi1)
    } else {
        !(left_on(pi, pj, pi1) && left_on(pj, pi, pin1))
    }
}

fn diagonal(i: usize, j: usize, indices: &[u32], vertices: &[ContourVertex]) -> bool {
    in_cone(i, j, indices, vertices) && diagonalie(i, j, indices, vertices)
}

fn diagonalie_loose(i: usize, j: usize, indices: &[u32], vertices: &[ContourVertex]) -> bool {
    let n = indices.len();
    let d0 = at(indices, vertices, i);
    let d1 = at(indices, vertices, j);
    for k in 0..n {
        let k1 = next(k, n);
        if k == i || k1 == i || k == j || k1 == j {
            continue;
        }
        let p0 = at(indices, vertices, k);
        let p1 = at(indices, vertices, k1);
        if (d0.x == p0.x && d0.z == p0.z)
            || (d1.x == p0.x && d1.z == p0.z)
            || (d0.x == p1.x && d0.z == p1.z)
            || (d1.x == p1.x && d1.z == p1.z)
        {
            continue;
        }
        if intersect_prop(d0, d1, p0, p1) {
            return false;
        }
    }
    true
}

fn in_cone_loose(i: usize, j: usize, indices: &[u32], vertices: &[ContourVertex]) -> bool {
    let n = indices.len();
    let pi = at(indices, vertices, i);
    let pj = at(indices, vertices, j);
    let pi1 = at(indices, vertices, next(i, n));
    let pin1 = at(indices, vertices, prev(i, n));

    if left_on(pin1, pi, pi1) {
        left_on(pi, pj, pin1) && left_on(pj, pi, pi1)
    } else {
        !(left_on(pi, pj, pi1) && left_on(pj, pi, pin1))
    }
}

fn diagonal_loose(i: usize, j: usize, indices: &[u32], vertices: &[ContourVertex]) -> bool {
    in_cone_loose(i, j, indices, vertices) && diagonalie_loose(i, j, indices, vertices)
}

/// Squared length of the shared edge if merging keeps the union convex
/// and within the vertex cap, plus the edge indices in each poly.
fn merge_value(pa: &[u16], pb: &[u16], nvp: usize, verts: &[[u16; 3]]) -> Option<(i64, usize, usize)> {
    let na = pa.len();
    let nb = pb.len();
    if na + nb - 2 > nvp {
        return None;
    }

    let mut shared = None;
    for i in 0..na {
        let va = pa[i];
        let vb = pa[(i + 1) % na];
        for j in 0..nb {
            if pb[j] == vb && pb[(j + 1) % nb] == va {
                shared = Some((i, j));
            }
        }
    }
    let (ea, eb) = shared?;

    // Junction vertices must stay convex.
    let va = verts[pa[(ea + na - 1) % na] as usize];
    let vb = verts[pa[ea] as usize];
    let vc = verts[pb[(eb + 2) % nb] as usize];
    if !uleft(va, vb, vc) {
        return None;
    }
    let va = verts[pb[(eb + nb - 1) % nb] as usize];
    let vb = verts[pb[eb] as usize];
    let vc = verts[pa[(ea + 2) % na] as usize];
    if !uleft(va, vb, vc) {
        return None;
    }

    let va = verts[pa[ea] as usize];
    let vb = verts[pa[(ea + 1) % na] as usize];
    let dx = va[0] as i64 - vb[0] as i64;
    let dz = va[2] as i64 - vb[2] as i64;
    Some((dx * dx + dz * dz, ea, eb))
}

fn uleft(a: [u16; 3], b: [u16; 3], c: [u16; 3]) -> bool {
    (b[0] as i64 - a[0] as i64) * (c[2] as i64 - a[2] as i64)
        - (c[0] as i64 - a[0] as i64) * (b[2] as i64 - a[2] as i64)
        < 0
}

fn merge_polys(pa: &[u16], pb: &[u16], ea: usize, eb: usize) -> Vec<u16> {
    let na = pa.len();
    let nb = pb.len();
    let mut merged = Vec::with_capacity(na + nb - 2);
    for i in 0..na - 1 {
        merged.push(pa[(ea + 1 + i) % na]);
    }
    for i in 0..nb - 1 {
        merged.push(pb[(eb + 1 + i) % nb]);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compact::CompactHeightfield;
    use crate::config::{BakeConfig, GridConfig};
    use crate::contour::{build_contours, Contour};
    use crate::heightfield::{Heightfield, WALKABLE_AREA};
    use crate::region::build_regions;
    use waymesh_common::Aabb;

    fn mesh_for(fill: impl Fn(&mut Heightfield), nvp: usize) -> PolyMesh {
        let config = BakeConfig {
            cell_size: 1.0,
            cell_height: 0.5,
            ..Default::default()
        };
        let bounds = Aabb::new(Vec3::ZERO, Vec3::new(20.0, 5.0, 20.0));
        let grid = GridConfig::derive(&config, &bounds).unwrap();
        let mut hf = Heightfield::new(&grid);
        fill(&mut hf);
        let mut chf = CompactHeightfield::build(&hf, 4, 1).unwrap();
        chf.build_distance_field().unwrap();
        build_regions(&mut chf, 8, 400).unwrap();
        let cset = build_contours(&chf, 1.3, 0).unwrap();
        build_poly_mesh(&cset, nvp).unwrap()
    }

    fn fill_square(hf: &mut Heightfield) {
        for z in 0..10 {
            for x in 0..10 {
                hf.add_span(x, z, 0, 1, WALKABLE_AREA);
            }
        }
    }

    #[test]
    fn square_becomes_single_poly() {
        let mesh = mesh_for(fill_square, 6);
        assert_eq!(mesh.npolys, 1);
        assert_eq!(mesh.poly_vertex_count(0), 4);
        assert_eq!(mesh.flags[0], POLY_FLAG_WALKABLE);
    }

    #[test]
    fn triangles_only_when_nvp_is_three() {
        let mesh = mesh_for(fill_square, 3);
        assert!(mesh.npolys >= 2);
        for p in 0..mesh.npolys {
            assert_eq!(mesh.poly_vertex_count(p), 3);
        }
    }

    #[test]
    fn polys_are_convex_and_within_cap() {
        let mesh = mesh_for(
            |hf| {
                // L-shaped floor.
                for z in 0..16 {
                    for x in 0..8 {
                        hf.add_span(x, z, 0, 1, WALKABLE_AREA);
                    }
                }
                for z in 0..8 {
                    for x in 8..16 {
                        hf.add_span(x, z, 0, 1, WALKABLE_AREA);
                    }
                }
            },
            6,
        );
        assert!(mesh.npolys >= 1);
        for p in 0..mesh.npolys {
            let count = mesh.poly_vertex_count(p);
            assert!((3..=6).contains(&count));
            let (vs, _) = mesh.poly(p);
            for i in 0..count {
                let a = mesh.verts[vs[i] as usize];
                let b = mesh.verts[vs[(i + 1) % count] as usize];
                let c = mesh.verts[vs[(i + 2) % count] as usize];
                // Same turn direction (or collinear) everywhere.
                assert!(
                    uleft(a, b, c) || {
                        let cross = (b[0] as i64 - a[0] as i64) * (c[2] as i64 - a[2] as i64)
                            - (c[0] as i64 - a[0] as i64) * (b[2] as i64 - a[2] as i64);
                        cross == 0
                    },
                    "poly {p} is not convex"
                );
            }
        }
    }

    #[test]
    fn adjacency_is_symmetric() {
        let mesh = mesh_for(fill_square, 3);
        for p in 0..mesh.npolys {
            let count = mesh.poly_vertex_count(p);
            let (_, neis) = mesh.poly(p);
            for e in 0..count {
                let n = neis[e];
                if n == NULL_INDEX {
                    continue;
                }
                let ncount = mesh.poly_vertex_count(n as usize);
                let (_, nneis) = mesh.poly(n as usize);
                assert!(
                    nneis[..ncount].contains(&(p as u16)),
                    "poly {n} does not link back to {p}"
                );
            }
        }
    }

    #[test]
    fn shared_vertices_are_deduplicated() {
        let mesh = mesh_for(fill_square, 3);
        // Two triangles over a square share the diagonal: 4 verts total.
        assert_eq!(mesh.verts.len(), 4);
    }

    fn synthetic_cset(contours: Vec<Contour>, extent: i32) -> ContourSet {
        ContourSet {
            contours,
            bmin: Vec3::ZERO,
            bmax: Vec3::new(extent as f32, 1.0, extent as f32),
            cell_size: 1.0,
            cell_height: 0.5,
            width: extent,
            depth: extent,
        }
    }

    fn cv(x: i32, z: i32) -> ContourVertex {
        ContourVertex {
            x,
            y: 0,
            z,
            region: 0,
        }
    }

    #[test]
    fn poly_count_over_index_range_is_rejected() {
        // A triangulated grid yields roughly two polys per vertex, so the
        // poly cap trips while the vertex count is still in range.
        let cells = 183;
        let mut contours = Vec::new();
        for z in 0..cells {
            for x in 0..cells {
                contours.push(Contour {
                    vertices: vec![cv(x, z), cv(x, z + 1), cv(x + 1, z)],
                    region: 1,
                    area: WALKABLE_AREA,
                });
                contours.push(Contour {
                    vertices: vec![cv(x + 1, z), cv(x, z + 1), cv(x + 1, z + 1)],
                    region: 1,
                    area: WALKABLE_AREA,
                });
            }
        }
        assert!(contours.len() > NULL_INDEX as usize);
        let cset = synthetic_cset(contours, cells + 1);
        assert!(matches!(
            build_poly_mesh(&cset, 3),
            Err(Error::Allocation(_))
        ));
    }

    #[test]
    fn untriangulatable_outline_fails_the_build() {
        // Counter-clockwise ring, the opposite of the outline walk; no ear
        // passes the cone test, strict or loose.
        let contour = Contour {
            vertices: vec![cv(0, 0), cv(2, 0), cv(2, 2), cv(0, 2)],
            region: 1,
            area: WALKABLE_AREA,
        };
        let cset = synthetic_cset(vec![contour], 3);
        assert!(matches!(
            build_poly_mesh(&cset, 6),
            Err(Error::Geometry(_))
        ));
    }
}
