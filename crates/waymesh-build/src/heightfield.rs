//! Span heightfield built by voxelizing the input triangles.
//!
//! Each XZ cell holds a column of solid spans sorted by height. Spans are
//! plain values in a flat `Vec` per column; all later stages address them
//! by (column, index) pairs.

use waymesh_common::{Result, Vec3};

use crate::config::GridConfig;
use crate::input::GeometryBuffer;

/// Area id for unwalkable voxels.
pub const NULL_AREA: u8 = 0;
/// Area id for walkable voxels.
pub const WALKABLE_AREA: u8 = 63;

/// Sentinel for "no ceiling above this span".
pub const MAX_HEIGHT: i32 = u16::MAX as i32;

/// One solid span in a column. `min`/`max` are in cell-height units from
/// the grid's vertical origin; the walkable floor sits at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub min: u16,
    pub max: u16,
    pub area: u8,
}

/// Solid span heightfield.
pub struct Heightfield {
    pub width: i32,
    pub depth: i32,
    pub bmin: Vec3,
    pub bmax: Vec3,
    pub cell_size: f32,
    pub cell_height: f32,
    columns: Vec<Vec<Span>>,
}

impl Heightfield {
    pub fn new(grid: &GridConfig) -> Self {
        let cells = (grid.width * grid.depth) as usize;
        Self {
            width: grid.width,
            depth: grid.depth,
            bmin: grid.bmin,
            bmax: grid.bmax,
            cell_size: grid.cell_size,
            cell_height: grid.cell_height,
            columns: vec![Vec::new(); cells],
        }
    }

    #[inline]
    fn column_index(&self, x: i32, z: i32) -> usize {
        (z * self.width + x) as usize
    }

    pub fn column(&self, x: i32, z: i32) -> &[Span] {
        &self.columns[self.column_index(x, z)]
    }

    /// Insert a span, merging it with any spans it overlaps or touches.
    /// When tops land within one cell of each other the more permissive
    /// area wins.
    pub fn add_span(&mut self, x: i32, z: i32, min: u16, max: u16, area: u8) {
        let idx = self.column_index(x, z);
        let col = &mut self.columns[idx];

        let mut new = Span { min, max, area };
        let mut i = 0;
        while i < col.len() {
            let s = col[i];
            if s.min > new.max {
                break;
            }
            if s.max < new.min {
                i += 1;
                continue;
            }
            new.min = new.min.min(s.min);
            new.max = new.max.max(s.max);
            if (new.max as i32 - s.max as i32).abs() <= 1 {
                new.area = new.area.max(s.area);
            }
            col.remove(i);
        }
        col.insert(i, new);
    }

    /// Voxelize every triangle of `geometry` into the field. Triangles
    /// whose surface normal is within `walkable_slope_deg` of vertical
    /// produce walkable spans; steeper ones still produce solid (null-area)
    /// spans so they block space.
    pub fn rasterize(&mut self, geometry: &GeometryBuffer, walkable_slope_deg: f32) -> Result<()> {
        let walkable_cos = walkable_slope_deg.to_radians().cos();
        for t in 0..geometry.triangle_count() {
            let [v0, v1, v2] = geometry.triangle(t);
            let normal = (v1 - v0).cross(v2 - v0).normalize_or_zero();
            let area = if normal.y > walkable_cos {
                WALKABLE_AREA
            } else {
                NULL_AREA
            };
            self.rasterize_triangle(v0, v1, v2, area);
        }
        Ok(())
    }

    fn rasterize_triangle(&mut self, v0: Vec3, v1: Vec3, v2: Vec3, area: u8) {
        let cs = self.cell_size;
        let ics = 1.0 / cs;
        let ich = 1.0 / self.cell_height;

        let tmin = v0.min(v1).min(v2);
        let tmax = v0.max(v1).max(v2);
        if tmax.x < self.bmin.x
            || tmin.x > self.bmax.x
            || tmax.z < self.bmin.z
            || tmin.z > self.bmax.z
        {
            return;
        }

        let z0 = (((tmin.z - self.bmin.z) * ics) as i32).clamp(0, self.depth - 1);
        let z1 = (((tmax.z - self.bmin.z) * ics) as i32).clamp(0, self.depth - 1);

        let tri = [v0, v1, v2];
        let mut row = Vec::with_capacity(7);
        let mut cell = Vec::with_capacity(7);
        for z in z0..=z1 {
            let cz = self.bmin.z + z as f32 * cs;
            clip_poly(&tri, &mut row, false, cz, cz + cs);
            if row.len() < 3 {
                continue;
            }

            let (mut rminx, mut rmaxx) = (f32::MAX, f32::MIN);
            for p in &row {
                rminx = rminx.min(p.x);
                rmaxx = rmaxx.max(p.x);
            }
            let x0 = (((rminx - self.bmin.x) * ics) as i32).clamp(0, self.width - 1);
            let x1 = (((rmaxx - self.bmin.x) * ics) as i32).clamp(0, self.width - 1);

            for x in x0..=x1 {
                let cx = self.bmin.x + x as f32 * cs;
                clip_poly(&row, &mut cell, true, cx, cx + cs);
                if cell.len() < 3 {
                    continue;
                }
                let (mut ymin, mut ymax) = (f32::MAX, f32::MIN);
                for p in &cell {
                    ymin = ymin.min(p.y);
                    ymax = ymax.max(p.y);
                }
                if ymax < self.bmin.y {
                    continue;
                }
                let smin = (((ymin - self.bmin.y) * ich).floor() as i32).clamp(0, MAX_HEIGHT - 1);
                let smax = (((ymax - self.bmin.y) * ich).ceil() as i32).clamp(smin + 1, MAX_HEIGHT);
                self.add_span(x, z, smin as u16, smax as u16, area);
            }
        }
    }

    /// Walkable span count across the whole field.
    pub fn walkable_span_count(&self) -> usize {
        self.columns
            .iter()
            .flatten()
            .filter(|s| s.area != NULL_AREA)
            .count()
    }

    /// Unwalkable spans directly below a walkable one, within climb reach
    /// of it, inherit its area. Catches curbs and small debris sitting on
    /// walkable ground.
    pub fn filter_low_hanging_obstacles(&mut self, walkable_climb: i32) {
        for col in &mut self.columns {
            let mut prev_walkable = false;
            let mut prev_area = NULL_AREA;
            let mut prev_max = 0i32;
            for s in col.iter_mut() {
                let walkable = s.area != NULL_AREA;
                if !walkable
                    && prev_walkable
                    && (s.max as i32 - prev_max).abs() <= walkable_climb
                {
                    s.area = prev_area;
                }
                prev_walkable = walkable;
                prev_area = s.area;
                prev_max = s.max as i32;
            }
        }
    }

    /// Unwalk spans whose floor drops more than the climb limit toward any
    /// neighbor, or whose traversable neighbors disagree about floor height
    /// by more than the climb limit. Grid borders count as drops.
    pub fn filter_ledge_spans(&mut self, walkable_height: i32, walkable_climb: i32) {
        let mut ledges: Vec<(usize, usize)> = Vec::new();

        for z in 0..self.depth {
            for x in 0..self.width {
                let ci = self.column_index(x, z);
                for (si, s) in self.columns[ci].iter().enumerate() {
                    if s.area == NULL_AREA {
                        continue;
                    }
                    let bot = s.max as i32;
                    let top = self.columns[ci]
                        .get(si + 1)
                        .map_or(MAX_HEIGHT, |n| n.min as i32);

                    let mut min_drop = MAX_HEIGHT;
                    // Floor range across traversable neighbors.
                    let mut access_min = bot;
                    let mut access_max = bot;

                    for dir in 0..4 {
                        let nx = x + DIR_OFFSET_X[dir];
                        let nz = z + DIR_OFFSET_Z[dir];
                        if nx < 0 || nz < 0 || nx >= self.width || nz >= self.depth {
                            min_drop = min_drop.min(-walkable_climb - 1);
                            continue;
                        }

                        let ncol = &self.columns[self.column_index(nx, nz)];
                        // Gap below the neighbor's first span.
                        let mut nbot = -walkable_climb;
                        let mut ntop = ncol.first().map_or(MAX_HEIGHT, |n| n.min as i32);
                        if top.min(ntop) - bot.max(nbot) > walkable_height {
                            min_drop = min_drop.min(nbot - bot);
                        }
                        for (ni, ns) in ncol.iter().enumerate() {
                            nbot = ns.max as i32;
                            ntop = ncol.get(ni + 1).map_or(MAX_HEIGHT, |n| n.min as i32);
                            if top.min(ntop) - bot.max(nbot) > walkable_height {
                                min_drop = min_drop.min(nbot - bot);
                                if (nbot - bot).abs() <= walkable_climb {
                                    access_min = access_min.min(nbot);
                                    access_max = access_max.max(nbot);
                                }
                            }
                        }
                    }

                    if min_drop < -walkable_climb || access_max - access_min > walkable_climb {
                        ledges.push((ci, si));
                    }
                }
            }
        }

        for (ci, si) in ledges {
            self.columns[ci][si].area = NULL_AREA;
        }
    }

    /// Unwalk spans without enough clearance to the span above.
    pub fn filter_low_height_spans(&mut self, walkable_height: i32) {
        for col in &mut self.columns {
            for i in 0..col.len() {
                let bot = col[i].max as i32;
                let top = col.get(i + 1).map_or(MAX_HEIGHT, |n| n.min as i32);
                if top - bot <= walkable_height {
                    col[i].area = NULL_AREA;
                }
            }
        }
    }
}

/// Neighbor direction offsets. Order matters: the compact heightfield's
/// connection slots and the contour walk both index by it.
pub const DIR_OFFSET_X: [i32; 4] = [-1, 0, 1, 0];
pub const DIR_OFFSET_Z: [i32; 4] = [0, 1, 0, -1];

/// Clip a convex polygon against an axis-aligned slab `[lo, hi]` on X
/// (`on_x`) or Z. Result replaces `out`.
fn clip_poly(input: &[Vec3], out: &mut Vec<Vec3>, on_x: bool, lo: f32, hi: f32) {
    let axis = |p: &Vec3| if on_x { p.x } else { p.z };

    let mut tmp: Vec<Vec3> = Vec::with_capacity(input.len() + 2);
    clip_side(input, &mut tmp, |p| axis(p) >= lo, |a, b| {
        let t = (lo - axis(a)) / (axis(b) - axis(a));
        *a + (*b - *a) * t
    });
    out.clear();
    clip_side(&tmp, out, |p| axis(p) <= hi, |a, b| {
        let t = (hi - axis(a)) / (axis(b) - axis(a));
        *a + (*b - *a) * t
    });
}

fn clip_side<I, C>(input: &[Vec3], out: &mut Vec<Vec3>, inside: I, cross: C)
where
    I: Fn(&Vec3) -> bool,
    C: Fn(&Vec3, &Vec3) -> Vec3,
{
    out.clear();
    if input.is_empty() {
        return;
    }
    let mut prev = &input[input.len() - 1];
    let mut prev_in = inside(prev);
    for cur in input {
        let cur_in = inside(cur);
        if cur_in != prev_in {
            out.push(cross(prev, cur));
        }
        if cur_in {
            out.push(*cur);
        }
        prev = cur;
        prev_in = cur_in;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BakeConfig, GridConfig};
    use crate::input::{GeometryBuffer, GeometrySource};
    use waymesh_common::Aabb;

    fn field_10x10() -> Heightfield {
        let config = BakeConfig {
            cell_size: 1.0,
            cell_height: 0.5,
            ..Default::default()
        };
        let bounds = Aabb::new(Vec3::ZERO, Vec3::new(10.0, 5.0, 10.0));
        Heightfield::new(&GridConfig::derive(&config, &bounds).unwrap())
    }

    #[test]
    fn add_span_merges_overlaps() {
        let mut hf = field_10x10();
        hf.add_span(1, 1, 0, 4, WALKABLE_AREA);
        hf.add_span(1, 1, 3, 6, WALKABLE_AREA);
        assert_eq!(hf.column(1, 1).len(), 1);
        assert_eq!(hf.column(1, 1)[0].min, 0);
        assert_eq!(hf.column(1, 1)[0].max, 6);
    }

    #[test]
    fn add_span_keeps_disjoint() {
        let mut hf = field_10x10();
        hf.add_span(2, 2, 0, 2, WALKABLE_AREA);
        hf.add_span(2, 2, 6, 8, NULL_AREA);
        assert_eq!(hf.column(2, 2).len(), 2);
        assert!(hf.column(2, 2)[0].max < hf.column(2, 2)[1].min);
    }

    #[test]
    fn rasterize_flat_square_fills_cells() {
        let verts = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 10.0),
            Vec3::new(0.0, 0.0, 10.0),
        ];
        let indices = [0u32, 2, 1, 0, 3, 2];
        let sources = [GeometrySource::new(&verts, &indices)];
        let geometry = GeometryBuffer::collect(&sources).unwrap();

        let config = BakeConfig {
            cell_size: 1.0,
            cell_height: 0.5,
            ..Default::default()
        };
        let grid = GridConfig::derive(&config, &geometry.bounds).unwrap();
        let mut hf = Heightfield::new(&grid);
        hf.rasterize(&geometry, 45.0).unwrap();

        // Every cell under the square gets exactly one walkable span.
        for z in 0..hf.depth {
            for x in 0..hf.width {
                let col = hf.column(x, z);
                assert_eq!(col.len(), 1, "cell ({x},{z})");
                assert_eq!(col[0].area, WALKABLE_AREA);
            }
        }
    }

    #[test]
    fn steep_wall_is_unwalkable() {
        let verts = [
            Vec3::new(5.0, 0.0, 0.0),
            Vec3::new(5.0, 5.0, 0.0),
            Vec3::new(5.0, 5.0, 10.0),
            Vec3::new(5.0, 0.0, 10.0),
        ];
        let indices = [0u32, 1, 2, 0, 2, 3];
        let sources = [GeometrySource::new(&verts, &indices)];
        let geometry = GeometryBuffer::collect(&sources).unwrap();

        let config = BakeConfig {
            cell_size: 1.0,
            cell_height: 0.5,
            ..Default::default()
        };
        let bounds = Aabb::new(Vec3::ZERO, Vec3::new(10.0, 5.0, 10.0));
        let grid = GridConfig::derive(&config, &bounds).unwrap();
        let mut hf = Heightfield::new(&grid);
        hf.rasterize(&geometry, 45.0).unwrap();

        assert!(hf.walkable_span_count() == 0);
        assert!(!hf.column(5, 5).is_empty());
    }

    #[test]
    fn low_height_filter_clears_tight_gaps() {
        let mut hf = field_10x10();
        // Floor span with a ceiling two cells above it.
        hf.add_span(3, 3, 0, 1, WALKABLE_AREA);
        hf.add_span(3, 3, 3, 4, WALKABLE_AREA);
        hf.filter_low_height_spans(4);
        assert_eq!(hf.column(3, 3)[0].area, NULL_AREA);
    }

    #[test]
    fn ledge_filter_marks_border_of_platform() {
        let mut hf = field_10x10();
        // Raised 3x3 platform surrounded by nothing.
        for z in 3..6 {
            for x in 3..6 {
                hf.add_span(x, z, 0, 6, WALKABLE_AREA);
            }
        }
        hf.filter_ledge_spans(3, 1);
        // Center survives, rim becomes unwalkable.
        assert_eq!(hf.column(4, 4)[0].area, WALKABLE_AREA);
        assert_eq!(hf.column(3, 3)[0].area, NULL_AREA);
        assert_eq!(hf.column(5, 4)[0].area, NULL_AREA);
    }

    #[test]
    fn low_hanging_obstacle_becomes_walkable() {
        let mut hf = field_10x10();
        hf.add_span(2, 2, 0, 2, WALKABLE_AREA);
        hf.add_span(2, 2, 4, 5, NULL_AREA);
        hf.filter_low_hanging_obstacles(3);
        let col = hf.column(2, 2);
        assert_eq!(col[col.len() - 1].area, WALKABLE_AREA);
    }
}
