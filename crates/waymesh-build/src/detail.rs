//! Detail mesh: per-polygon triangulation carrying accurate surface
//! height.
//!
//! Polygon rims are subdivided at the sample distance with heights read
//! back from the compact heightfield; a center sample is added only when
//! the flat interpolation misses the sampled surface by more than the
//! allowed error. Runtime height queries interpolate barycentrically over
//! these triangles.

use waymesh_common::{triangle_height_at, Result, Vec3};

use crate::compact::CompactHeightfield;
use crate::polymesh::PolyMesh;

pub struct DetailMesh {
    /// Per polygon: `[vert_base, vert_count, tri_base, tri_count]`.
    pub meshes: Vec<[u32; 4]>,
    /// World-space vertices.
    pub verts: Vec<Vec3>,
    /// Triangles with indices local to the owning polygon's vertex range.
    pub tris: Vec<[u16; 3]>,
}

impl DetailMesh {
    /// Surface height of polygon `poly` at the XZ position of `pos`.
    pub fn poly_height(&self, poly: usize, pos: Vec3) -> Option<f32> {
        let m = self.meshes.get(poly)?;
        let base = m[0] as usize;
        let tri_base = m[2] as usize;
        let tri_count = m[3] as usize;
        for t in &self.tris[tri_base..tri_base + tri_count] {
            let a = self.verts[base + t[0] as usize];
            let b = self.verts[base + t[1] as usize];
            let c = self.verts[base + t[2] as usize];
            if let Some(h) = triangle_height_at(pos, a, b, c) {
                return Some(h);
            }
        }
        None
    }
}

pub fn build_detail_mesh(
    pmesh: &PolyMesh,
    chf: &CompactHeightfield,
    sample_dist: f32,
    sample_max_error: f32,
) -> Result<DetailMesh> {
    let mut meshes = Vec::with_capacity(pmesh.npolys);
    let mut verts: Vec<Vec3> = Vec::new();
    let mut tris: Vec<[u16; 3]> = Vec::new();

    for p in 0..pmesh.npolys {
        let count = pmesh.poly_vertex_count(p);
        let (poly_verts, _) = pmesh.poly(p);

        let vert_base = verts.len() as u32;
        let tri_base = tris.len() as u32;

        // Rim, subdivided so long edges track the surface.
        let mut rim: Vec<Vec3> = Vec::new();
        for i in 0..count {
            let a = pmesh.vertex_world(poly_verts[i] as usize);
            let b = pmesh.vertex_world(poly_verts[(i + 1) % count] as usize);
            rim.push(a);
            if sample_dist > 0.0 {
                let len = (b - a).length();
                let segments = (len / sample_dist).ceil() as usize;
                for s in 1..segments {
                    let t = s as f32 / segments as f32;
                    let mut pt = a + (b - a) * t;
                    if let Some(h) = sample_height(chf, pt) {
                        pt.y = h;
                    }
                    rim.push(pt);
                }
            }
        }

        let n = rim.len();
        let center = rim.iter().copied().sum::<Vec3>() / n as f32;
        let sampled_center = sample_height(chf, center);
        let center_off = sampled_center.map_or(0.0, |h| (h - center.y).abs());

        verts.extend_from_slice(&rim);
        if center_off > sample_max_error {
            // Surface bows away from the flat polygon; pin the middle.
            let mut c = center;
            c.y = sampled_center.unwrap_or(center.y);
            verts.push(c);
            let ci = n as u16;
            for i in 0..n {
                tris.push([ci, i as u16, ((i + 1) % n) as u16]);
            }
        } else {
            for i in 1..n - 1 {
                tris.push([0, i as u16, (i + 1) as u16]);
            }
        }

        meshes.push([
            vert_base,
            verts.len() as u32 - vert_base,
            tri_base,
            tris.len() as u32 - tri_base,
        ]);
    }

    Ok(DetailMesh { meshes, verts, tris })
}

/// Floor height of the open span nearest `pos`, searching the cell under
/// it and its eight neighbors.
fn sample_height(chf: &CompactHeightfield, pos: Vec3) -> Option<f32> {
    let ix = (((pos.x - chf.bmin.x) / chf.cell_size) as i32).clamp(0, chf.width - 1);
    let iz = (((pos.z - chf.bmin.z) / chf.cell_size) as i32).clamp(0, chf.depth - 1);

    let mut best: Option<f32> = None;
    for dz in -1..=1 {
        for dx in -1..=1 {
            let x = ix + dx;
            let z = iz + dz;
            if x < 0 || z < 0 || x >= chf.width || z >= chf.depth {
                continue;
            }
            let cell = chf.cell(x, z);
            for si in cell.first as usize..(cell.first + cell.count) as usize {
                let h = chf.bmin.y + chf.spans[si].y as f32 * chf.cell_height;
                match best {
                    Some(b) if (b - pos.y).abs() <= (h - pos.y).abs() => {}
                    _ => best = Some(h),
                }
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BakeConfig, GridConfig};
    use crate::contour::build_contours;
    use crate::heightfield::{Heightfield, WALKABLE_AREA};
    use crate::polymesh::build_poly_mesh;
    use crate::region::build_regions;
    use waymesh_common::Aabb;

    fn flat_setup() -> (PolyMesh, CompactHeightfield) {
        let config = BakeConfig {
            cell_size: 1.0,
            cell_height: 0.5,
            ..Default::default()
        };
        let bounds = Aabb::new(Vec3::ZERO, Vec3::new(20.0, 5.0, 20.0));
        let grid = GridConfig::derive(&config, &bounds).unwrap();
        let mut hf = Heightfield::new(&grid);
        for z in 0..10 {
            for x in 0..10 {
                hf.add_span(x, z, 0, 1, WALKABLE_AREA);
            }
        }
        let mut chf = CompactHeightfield::build(&hf, 4, 1).unwrap();
        chf.build_distance_field().unwrap();
        build_regions(&mut chf, 8, 400).unwrap();
        let cset = build_contours(&chf, 1.3, 0).unwrap();
        let pmesh = build_poly_mesh(&cset, 6).unwrap();
        (pmesh, chf)
    }

    #[test]
    fn every_poly_gets_triangles() {
        let (pmesh, chf) = flat_setup();
        let dmesh = build_detail_mesh(&pmesh, &chf, 4.0, 1.0).unwrap();
        assert_eq!(dmesh.meshes.len(), pmesh.npolys);
        for m in &dmesh.meshes {
            assert!(m[1] >= 3);
            assert!(m[3] >= 1);
        }
    }

    #[test]
    fn height_query_inside_and_outside() {
        let (pmesh, chf) = flat_setup();
        let dmesh = build_detail_mesh(&pmesh, &chf, 0.0, 1.0).unwrap();
        // Flat floor: spans end at cell 1, so the surface sits one cell
        // height above the grid origin.
        let h = dmesh.poly_height(0, Vec3::new(5.0, 0.0, 5.0));
        assert!(h.is_some());
        assert!((h.unwrap() - 0.5).abs() < 0.51);
        assert!(dmesh
            .poly_height(0, Vec3::new(50.0, 0.0, 50.0))
            .is_none());
    }

    #[test]
    fn subdivision_adds_rim_vertices() {
        let (pmesh, chf) = flat_setup();
        let coarse = build_detail_mesh(&pmesh, &chf, 0.0, 1.0).unwrap();
        let fine = build_detail_mesh(&pmesh, &chf, 2.0, 1.0).unwrap();
        assert!(fine.verts.len() > coarse.verts.len());
    }
}
