//! Region outline tracing and simplification.
//!
//! Walks the boundary of every region keeping the interior on the left,
//! records raw cell-resolution outlines, then simplifies them: vertices
//! where the neighboring region changes are always kept, everything else
//! is thinned until the outline deviates from the raw walk by at most the
//! configured error, and overlong wall edges are split back up. Holes are
//! spliced into their region's outer outline so each contour is a single
//! closed loop.

use waymesh_common::{dist_point_segment_2d_sqr, Result, Vec3};

use crate::compact::CompactHeightfield;
use crate::heightfield::{DIR_OFFSET_X, DIR_OFFSET_Z};

/// Contour vertex in cell coordinates. `region` is the region on the far
/// side of the edge leaving this vertex (0 for walls).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContourVertex {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub region: u16,
}

#[derive(Debug, Clone)]
pub struct Contour {
    pub vertices: Vec<ContourVertex>,
    pub region: u16,
    pub area: u8,
}

pub struct ContourSet {
    pub contours: Vec<Contour>,
    pub bmin: Vec3,
    pub bmax: Vec3,
    pub cell_size: f32,
    pub cell_height: f32,
    pub width: i32,
    pub depth: i32,
}

struct SimplifiedVertex {
    x: i32,
    y: i32,
    z: i32,
    /// Index into the raw outline this vertex came from.
    raw: usize,
}

/// Trace and simplify the outlines of every region in `chf`.
pub fn build_contours(
    chf: &CompactHeightfield,
    max_error: f32,
    max_edge_len: i32,
) -> Result<ContourSet> {
    // Bit per direction: set = region boundary in that direction.
    let mut flags = vec![0u8; chf.span_count()];
    for z in 0..chf.depth {
        for x in 0..chf.width {
            let cell = chf.cell(x, z);
            for si in cell.first as usize..(cell.first + cell.count) as usize {
                if chf.regions[si] == 0 {
                    continue;
                }
                let mut connected = 0u8;
                for dir in 0..4 {
                    if let Some(ni) = chf.neighbor(x, z, si, dir) {
                        if chf.regions[ni] == chf.regions[si] {
                            connected |= 1 << dir;
                        }
                    }
                }
                flags[si] = connected ^ 0xf;
            }
        }
    }

    let mut contours: Vec<Contour> = Vec::new();
    let mut raw_points: Vec<ContourVertex> = Vec::new();

    for z in 0..chf.depth {
        for x in 0..chf.width {
            let cell = chf.cell(x, z);
            for si in cell.first as usize..(cell.first + cell.count) as usize {
                if flags[si] == 0 || flags[si] == 0xf {
                    flags[si] = 0;
                    continue;
                }
                let region = chf.regions[si];
                let area = chf.areas[si];

                raw_points.clear();
                walk_contour(chf, x, z, si, &mut flags, &mut raw_points);
                if raw_points.len() < 3 {
                    continue;
                }

                let simplified = simplify_contour(&raw_points, max_error, max_edge_len);
                let vertices = remove_degenerate(simplified);
                if vertices.len() >= 3 {
                    contours.push(Contour {
                        vertices,
                        region,
                        area,
                    });
                }
            }
        }
    }

    merge_region_holes(&mut contours);
    contours.retain(|c| c.vertices.len() >= 3);

    log::debug!("contours: traced {} outlines", contours.len());

    Ok(ContourSet {
        contours,
        bmin: chf.bmin,
        bmax: chf.bmax,
        cell_size: chf.cell_size,
        cell_height: chf.cell_height,
        width: chf.width,
        depth: chf.depth,
    })
}

/// Walk one region boundary, clearing boundary flags as it goes and
/// emitting one raw vertex per boundary corner.
fn walk_contour(
    chf: &CompactHeightfield,
    mut x: i32,
    mut z: i32,
    mut span: usize,
    flags: &mut [u8],
    points: &mut Vec<ContourVertex>,
) {
    let mut dir = 0;
    while flags[span] & (1 << dir) == 0 {
        dir += 1;
    }
    let start_span = span;
    let start_dir = dir;

    let mut iterations = 0;
    loop {
        if flags[span] & (1 << dir) != 0 {
            let y = corner_height(chf, x, z, span, dir);
            let (mut px, mut pz) = (x, z);
            match dir {
                0 => pz += 1,
                1 => {
                    px += 1;
                    pz += 1;
                }
                2 => px += 1,
                _ => {}
            }
            let region = chf
                .neighbor(x, z, span, dir)
                .map_or(0, |ni| chf.regions[ni]);
            points.push(ContourVertex {
                x: px,
                y,
                z: pz,
                region,
            });
            flags[span] &= !(1 << dir);
            dir = (dir + 1) & 3;
        } else {
            match chf.neighbor(x, z, span, dir) {
                Some(ni) => {
                    x += DIR_OFFSET_X[dir];
                    z += DIR_OFFSET_Z[dir];
                    span = ni;
                }
                // Boundary flag and connection disagree; bail out.
                None => break,
            }
            dir = (dir + 3) & 3;
        }

        if span == start_span && dir == start_dir {
            break;
        }
        iterations += 1;
        if iterations > 40_000 {
            break;
        }
    }
}

/// Highest floor among the up-to-four spans meeting at the corner in `dir`.
fn corner_height(chf: &CompactHeightfield, x: i32, z: i32, span: usize, dir: usize) -> i32 {
    let dirp = (dir + 1) & 3;
    let mut height = chf.spans[span].y as i32;

    for &(d0, d1) in &[(dir, dirp), (dirp, dir)] {
        if let Some(ni) = chf.neighbor(x, z, span, d0) {
            height = height.max(chf.spans[ni].y as i32);
            let nx = x + DIR_OFFSET_X[d0];
            let nz = z + DIR_OFFSET_Z[d0];
            if let Some(di) = chf.neighbor(nx, nz, ni, d1) {
                height = height.max(chf.spans[di].y as i32);
            }
        }
    }
    height
}

fn simplify_contour(
    points: &[ContourVertex],
    max_error: f32,
    max_edge_len: i32,
) -> Vec<ContourVertex> {
    let n = points.len();
    let mut simplified: Vec<SimplifiedVertex> = Vec::new();

    // Vertices where the neighbor region changes must survive; they anchor
    // portal edges shared with adjacent regions.
    let has_connections = points.iter().any(|p| p.region != 0);
    if has_connections {
        for i in 0..n {
            let next = (i + 1) % n;
            if points[i].region != points[next].region {
                simplified.push(SimplifiedVertex {
                    x: points[i].x,
                    y: points[i].y,
                    z: points[i].z,
                    raw: i,
                });
            }
        }
    }

    if simplified.is_empty() {
        // Pure wall outline: seed with the lower-left and upper-right
        // extremes so there is something to refine between.
        let mut ll = 0;
        let mut ur = 0;
        for (i, p) in points.iter().enumerate() {
            let l = &points[ll];
            if p.x < l.x || (p.x == l.x && p.z < l.z) {
                ll = i;
            }
            let u = &points[ur];
            if p.x > u.x || (p.x == u.x && p.z > u.z) {
                ur = i;
            }
        }
        for &i in &[ll, ur] {
            simplified.push(SimplifiedVertex {
                x: points[i].x,
                y: points[i].y,
                z: points[i].z,
                raw: i,
            });
        }
    }

    // Re-insert raw vertices until the outline is within max_error.
    let max_error_sqr = max_error * max_error;
    let mut i = 0;
    while i < simplified.len() {
        let next = (i + 1) % simplified.len();
        let a = &simplified[i];
        let b = &simplified[next];
        let av = Vec3::new(a.x as f32, 0.0, a.z as f32);
        let bv = Vec3::new(b.x as f32, 0.0, b.z as f32);

        let mut max_dev = 0.0f32;
        let mut max_raw: Option<usize> = None;
        let mut ci = (a.raw + 1) % n;
        while ci != b.raw {
            let p = Vec3::new(points[ci].x as f32, 0.0, points[ci].z as f32);
            let d = dist_point_segment_2d_sqr(p, av, bv);
            if d > max_dev {
                max_dev = d;
                max_raw = Some(ci);
            }
            ci = (ci + 1) % n;
        }

        match max_raw {
            Some(raw) if max_dev > max_error_sqr => {
                simplified.insert(
                    i + 1,
                    SimplifiedVertex {
                        x: points[raw].x,
                        y: points[raw].y,
                        z: points[raw].z,
                        raw,
                    },
                );
            }
            _ => i += 1,
        }
    }

    // Split overlong wall edges so erosion artifacts cannot stretch.
    if max_edge_len > 0 {
        let limit_sqr = (max_edge_len * max_edge_len) as i64;
        let mut i = 0;
        while i < simplified.len() {
            let next = (i + 1) % simplified.len();
            let a_raw = simplified[i].raw;
            let b_raw = simplified[next].raw;
            let edge_region = points[(a_raw + 1) % n].region;
            let dx = (simplified[next].x - simplified[i].x) as i64;
            let dz = (simplified[next].z - simplified[i].z) as i64;
            if edge_region == 0 && dx * dx + dz * dz > limit_sqr {
                let span = if b_raw < a_raw {
                    b_raw + n - a_raw
                } else {
                    b_raw - a_raw
                };
                if span > 1 {
                    let mid = (a_raw + span / 2) % n;
                    simplified.insert(
                        i + 1,
                        SimplifiedVertex {
                            x: points[mid].x,
                            y: points[mid].y,
                            z: points[mid].z,
                            raw: mid,
                        },
                    );
                    continue;
                }
            }
            i += 1;
        }
    }

    // The neighbor region of the simplified edge comes from the raw edge
    // just past the kept vertex.
    simplified
        .into_iter()
        .map(|v| ContourVertex {
            x: v.x,
            y: v.y,
            z: v.z,
            region: points[(v.raw + 1) % n].region,
        })
        .collect()
}

fn remove_degenerate(mut vertices: Vec<ContourVertex>) -> Vec<ContourVertex> {
    let mut i = 0;
    while i < vertices.len() && vertices.len() > 1 {
        let next = (i + 1) % vertices.len();
        if vertices[i].x == vertices[next].x && vertices[i].z == vertices[next].z {
            vertices.remove(next);
        } else {
            i += 1;
        }
    }
    vertices
}

/// Twice the signed XZ area of a contour. The boundary walk emits outer
/// outlines clockwise (negative area); holes come out positive.
fn signed_area_2d(vertices: &[ContourVertex]) -> i64 {
    let mut area = 0i64;
    let n = vertices.len();
    for i in 0..n {
        let a = &vertices[i];
        let b = &vertices[(i + 1) % n];
        area += a.x as i64 * b.z as i64 - b.x as i64 * a.z as i64;
    }
    area
}

fn segments_intersect_2d(
    a0: (i32, i32),
    a1: (i32, i32),
    b0: (i32, i32),
    b1: (i32, i32),
) -> bool {
    fn orient(p: (i32, i32), q: (i32, i32), r: (i32, i32)) -> i64 {
        (q.0 - p.0) as i64 * (r.1 - p.1) as i64 - (q.1 - p.1) as i64 * (r.0 - p.0) as i64
    }
    let d1 = orient(b0, b1, a0);
    let d2 = orient(b0, b1, a1);
    let d3 = orient(a0, a1, b0);
    let d4 = orient(a0, a1, b1);
    ((d1 > 0 && d2 < 0) || (d1 < 0 && d2 > 0)) && ((d3 > 0 && d4 < 0) || (d3 < 0 && d4 > 0))
}

/// Does the open segment (p, q) cross any edge of `contour`, ignoring
/// edges incident to either endpoint?
fn segment_crosses_contour(p: (i32, i32), q: (i32, i32), contour: &Contour) -> bool {
    let n = contour.vertices.len();
    for i in 0..n {
        let a = &contour.vertices[i];
        let b = &contour.vertices[(i + 1) % n];
        let a = (a.x, a.z);
        let b = (b.x, b.z);
        if a == p || a == q || b == p || b == q {
            continue;
        }
        if segments_intersect_2d(p, q, a, b) {
            return true;
        }
    }
    false
}

/// Splice hole outlines (positive winding) into their region's outer
/// outline via a non-crossing bridge edge, leftmost holes first.
fn merge_region_holes(contours: &mut [Contour]) {
    use std::collections::HashMap;

    let mut by_region: HashMap<u16, (Option<usize>, Vec<usize>)> = HashMap::new();
    for (i, c) in contours.iter().enumerate() {
        let entry = by_region.entry(c.region).or_default();
        if signed_area_2d(&c.vertices) > 0 {
            entry.1.push(i);
        } else {
            entry.0 = Some(i);
        }
    }

    for (region, (outline, mut holes)) in by_region {
        if holes.is_empty() {
            continue;
        }
        let Some(outline_idx) = outline else {
            log::warn!("region {region} has holes but no outer outline, dropping them");
            for h in holes {
                contours[h].vertices.clear();
            }
            continue;
        };

        // Leftmost-first keeps bridges from crossing unmerged holes.
        holes.sort_by_key(|&h| {
            contours[h]
                .vertices
                .iter()
                .map(|v| (v.x, v.z))
                .min()
                .unwrap_or((i32::MAX, i32::MAX))
        });

        for hole_idx in holes {
            let hole = std::mem::take(&mut contours[hole_idx].vertices);
            if hole.len() < 3 {
                continue;
            }
            let mut hole_start = 0;
            for (i, v) in hole.iter().enumerate() {
                let s = &hole[hole_start];
                if v.x < s.x || (v.x == s.x && v.z < s.z) {
                    hole_start = i;
                }
            }
            let hp = (hole[hole_start].x, hole[hole_start].z);

            // Try outline vertices nearest the hole's leftmost vertex until
            // a bridge does not cross either loop.
            let mut candidates: Vec<usize> = (0..contours[outline_idx].vertices.len()).collect();
            candidates.sort_by_key(|&j| {
                let v = &contours[outline_idx].vertices[j];
                let dx = (v.x - hp.0) as i64;
                let dz = (v.z - hp.1) as i64;
                dx * dx + dz * dz
            });

            let hole_contour = Contour {
                vertices: hole.clone(),
                region,
                area: contours[hole_idx].area,
            };
            let mut bridged = false;
            for j in candidates {
                let op = {
                    let v = &contours[outline_idx].vertices[j];
                    (v.x, v.z)
                };
                if segment_crosses_contour(hp, op, &contours[outline_idx])
                    || segment_crosses_contour(hp, op, &hole_contour)
                {
                    continue;
                }
                splice(&mut contours[outline_idx].vertices, j, &hole, hole_start);
                bridged = true;
                break;
            }
            if !bridged {
                log::warn!("could not bridge hole in region {region}");
            }
        }
    }
}

/// Insert `hole` (rotated to start at `hole_start`) into `outline` after
/// vertex `at`, duplicating both bridge endpoints to keep the loop closed.
fn splice(outline: &mut Vec<ContourVertex>, at: usize, hole: &[ContourVertex], hole_start: usize) {
    let n = hole.len();
    let mut insert = Vec::with_capacity(n + 2);
    for i in 0..=n {
        insert.push(hole[(hole_start + i) % n]);
    }
    insert.push(outline[at]);
    let tail = outline.split_off(at + 1);
    outline.extend(insert);
    outline.extend(tail);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BakeConfig, GridConfig};
    use crate::heightfield::{Heightfield, WALKABLE_AREA};
    use crate::region::build_regions;
    use waymesh_common::Aabb;

    fn contours_for(fill: impl Fn(&mut Heightfield), max_error: f32) -> ContourSet {
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
        build_contours(&chf, max_error, 0).unwrap()
    }

    #[test]
    fn square_region_gives_square_contour() {
        let cset = contours_for(
            |hf| {
                for z in 0..10 {
                    for x in 0..10 {
                        hf.add_span(x, z, 0, 1, WALKABLE_AREA);
                    }
                }
            },
            1.3,
        );
        assert_eq!(cset.contours.len(), 1);
        let c = &cset.contours[0];
        // A flat square simplifies to its four corners.
        assert_eq!(c.vertices.len(), 4);
        for v in &c.vertices {
            assert!(v.x == 0 || v.x == 10);
            assert!(v.z == 0 || v.z == 10);
        }
    }

    #[test]
    fn outer_contours_wind_clockwise() {
        let cset = contours_for(
            |hf| {
                for z in 0..10 {
                    for x in 0..10 {
                        hf.add_span(x, z, 0, 1, WALKABLE_AREA);
                    }
                }
            },
            1.3,
        );
        for c in &cset.contours {
            assert!(signed_area_2d(&c.vertices) < 0);
        }
    }

    #[test]
    fn hole_is_spliced_into_outline() {
        // Walkable ring: 20x20 floor with a 4x4 gap in the middle.
        let cset = contours_for(
            |hf| {
                for z in 0..20 {
                    for x in 0..20 {
                        if (8..12).contains(&x) && (8..12).contains(&z) {
                            continue;
                        }
                        hf.add_span(x, z, 0, 1, WALKABLE_AREA);
                    }
                }
            },
            1.3,
        );
        // Every surviving contour is a single loop with nonnegative
        // winding; the hole ring is folded into an outline.
        for c in &cset.contours {
            assert!(c.vertices.len() >= 3);
        }
        let hole_corner_covered = cset.contours.iter().any(|c| {
            c.vertices
                .iter()
                .any(|v| (v.x == 8 || v.x == 12) && (v.z == 8 || v.z == 12))
        });
        assert!(hole_corner_covered);
    }

    #[test]
    fn degenerate_vertices_removed() {
        let verts = vec![
            ContourVertex { x: 0, y: 0, z: 0, region: 0 },
            ContourVertex { x: 0, y: 1, z: 0, region: 0 },
            ContourVertex { x: 4, y: 0, z: 0, region: 0 },
            ContourVertex { x: 4, y: 0, z: 4, region: 0 },
        ];
        let out = remove_degenerate(verts);
        assert_eq!(out.len(), 3);
    }
}
