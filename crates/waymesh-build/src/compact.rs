//! Compact (open-space) heightfield.
//!
//! Inverts the solid heightfield into walkable floor spans packed into one
//! flat array, with per-cell (first, count) ranges and per-span neighbor
//! connection offsets. Region ids and the distance field live in parallel
//! arrays indexed by span.

use waymesh_common::{Error, Result, Vec3};

use crate::heightfield::{Heightfield, DIR_OFFSET_X, DIR_OFFSET_Z, MAX_HEIGHT, NULL_AREA};

/// Connection slot value for "no traversable neighbor in this direction".
pub const NOT_CONNECTED: u8 = 0xff;

/// Cell range into the flat span array.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompactCell {
    pub first: u32,
    pub count: u32,
}

/// One open span: `y` is the floor, `clearance` the free space above it.
/// `con[dir]` is the index of the connected span within the neighbor
/// cell's range, or [`NOT_CONNECTED`].
#[derive(Debug, Clone, Copy)]
pub struct CompactSpan {
    pub y: u16,
    pub clearance: u16,
    pub con: [u8; 4],
}

pub struct CompactHeightfield {
    pub width: i32,
    pub depth: i32,
    pub bmin: Vec3,
    pub bmax: Vec3,
    pub cell_size: f32,
    pub cell_height: f32,
    pub walkable_height: i32,
    pub walkable_climb: i32,
    pub cells: Vec<CompactCell>,
    pub spans: Vec<CompactSpan>,
    pub areas: Vec<u8>,
    /// Region id per span; 0 = unassigned.
    pub regions: Vec<u16>,
    /// Distance-to-border per span, in chamfer units.
    pub dist: Vec<u16>,
    pub max_distance: u16,
    pub max_region: u16,
}

impl CompactHeightfield {
    /// Build from the filtered solid heightfield. Only walkable solid spans
    /// become open spans.
    pub fn build(hf: &Heightfield, walkable_height: i32, walkable_climb: i32) -> Result<Self> {
        let width = hf.width;
        let depth = hf.depth;
        let cell_count = (width * depth) as usize;

        let mut cells = vec![CompactCell::default(); cell_count];
        let mut spans = Vec::new();
        let mut areas = Vec::new();

        for z in 0..depth {
            for x in 0..width {
                let col = hf.column(x, z);
                let first = spans.len() as u32;
                for (i, s) in col.iter().enumerate() {
                    if s.area == NULL_AREA {
                        continue;
                    }
                    let floor = s.max as i32;
                    let ceiling = col.get(i + 1).map_or(MAX_HEIGHT, |n| n.min as i32);
                    spans.push(CompactSpan {
                        y: floor as u16,
                        clearance: (ceiling - floor).clamp(0, MAX_HEIGHT) as u16,
                        con: [NOT_CONNECTED; 4],
                    });
                    areas.push(s.area);
                }
                let cell = &mut cells[(z * width + x) as usize];
                cell.first = first;
                cell.count = spans.len() as u32 - first;
            }
        }

        let span_count = spans.len();
        let mut chf = Self {
            width,
            depth,
            bmin: hf.bmin,
            bmax: hf.bmax,
            cell_size: hf.cell_size,
            cell_height: hf.cell_height,
            walkable_height,
            walkable_climb,
            cells,
            spans,
            areas,
            regions: vec![0; span_count],
            dist: vec![0; span_count],
            max_distance: 0,
            max_region: 0,
        };
        chf.build_connections()?;
        Ok(chf)
    }

    fn build_connections(&mut self) -> Result<()> {
        for z in 0..self.depth {
            for x in 0..self.width {
                let cell = self.cells[(z * self.width + x) as usize];
                for si in cell.first..cell.first + cell.count {
                    let (floor, ceiling) = {
                        let s = &self.spans[si as usize];
                        (s.y as i32, s.y as i32 + s.clearance as i32)
                    };
                    for dir in 0..4 {
                        let nx = x + DIR_OFFSET_X[dir];
                        let nz = z + DIR_OFFSET_Z[dir];
                        if nx < 0 || nz < 0 || nx >= self.width || nz >= self.depth {
                            continue;
                        }
                        let ncell = self.cells[(nz * self.width + nx) as usize];
                        for k in 0..ncell.count {
                            let ns = &self.spans[(ncell.first + k) as usize];
                            let nfloor = ns.y as i32;
                            let nceiling = nfloor + ns.clearance as i32;
                            // Enough headroom across the step, and the step
                            // itself within climb reach.
                            if ceiling.min(nceiling) - floor.max(nfloor) >= self.walkable_height
                                && (nfloor - floor).abs() <= self.walkable_climb
                            {
                                if k >= NOT_CONNECTED as u32 {
                                    return Err(Error::Allocation(format!(
                                        "more than {} spans in one cell",
                                        NOT_CONNECTED
                                    )));
                                }
                                self.spans[si as usize].con[dir] = k as u8;
                                break;
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    #[inline]
    pub fn cell(&self, x: i32, z: i32) -> CompactCell {
        self.cells[(z * self.width + x) as usize]
    }

    /// Index of the connected neighbor span, if any.
    #[inline]
    pub fn neighbor(&self, x: i32, z: i32, span: usize, dir: usize) -> Option<usize> {
        let con = self.spans[span].con[dir];
        if con == NOT_CONNECTED {
            return None;
        }
        let nx = x + DIR_OFFSET_X[dir];
        let nz = z + DIR_OFFSET_Z[dir];
        Some(self.cell(nx, nz).first as usize + con as usize)
    }

    pub fn span_count(&self) -> usize {
        self.spans.len()
    }

    /// World position of a span's floor center.
    pub fn span_position(&self, x: i32, z: i32, span: usize) -> Vec3 {
        Vec3::new(
            self.bmin.x + (x as f32 + 0.5) * self.cell_size,
            self.bmin.y + self.spans[span].y as f32 * self.cell_height,
            self.bmin.z + (z as f32 + 0.5) * self.cell_size,
        )
    }

    /// Erode the walkable area by `radius` cells using a two-pass chamfer
    /// distance from area borders. Distance units are half-cells, so the
    /// threshold is `radius * 2`.
    pub fn erode_walkable_area(&mut self, radius: i32) -> Result<()> {
        let mut dist = vec![0xffu8; self.spans.len()];

        // Border seeds: null-area spans, and spans missing any neighbor.
        for z in 0..self.depth {
            for x in 0..self.width {
                let cell = self.cell(x, z);
                for si in cell.first as usize..(cell.first + cell.count) as usize {
                    if self.areas[si] == NULL_AREA {
                        dist[si] = 0;
                        continue;
                    }
                    let mut connections = 0;
                    for dir in 0..4 {
                        if let Some(ni) = self.neighbor(x, z, si, dir) {
                            if self.areas[ni] != NULL_AREA {
                                connections += 1;
                            }
                        }
                    }
                    if connections != 4 {
                        dist[si] = 0;
                    }
                }
            }
        }

        self.chamfer_u8(&mut dist);

        let threshold = (radius * 2).min(255) as u8;
        for (si, &d) in dist.iter().enumerate() {
            if d < threshold {
                self.areas[si] = NULL_AREA;
            }
        }
        Ok(())
    }

    /// Distance field over walkable spans: 0 at area borders, growing
    /// inward in chamfer units, box-blurred once. Feeds the watershed
    /// partitioner.
    pub fn build_distance_field(&mut self) -> Result<()> {
        let mut dist = vec![0xffffu16; self.spans.len()];

        for z in 0..self.depth {
            for x in 0..self.width {
                let cell = self.cell(x, z);
                for si in cell.first as usize..(cell.first + cell.count) as usize {
                    let area = self.areas[si];
                    let mut connections = 0;
                    for dir in 0..4 {
                        if let Some(ni) = self.neighbor(x, z, si, dir) {
                            if self.areas[ni] == area {
                                connections += 1;
                            }
                        }
                    }
                    if connections != 4 {
                        dist[si] = 0;
                    }
                }
            }
        }

        self.chamfer_u16(&mut dist);

        let max_distance = dist.iter().copied().max().unwrap_or(0);
        self.dist = self.box_blur(&dist, 1);
        self.max_distance = max_distance;
        Ok(())
    }

    fn chamfer_u8(&self, dist: &mut [u8]) {
        let mut wide = vec![0u16; dist.len()];
        for (i, &d) in dist.iter().enumerate() {
            wide[i] = if d == 0xff { 0xffff } else { d as u16 };
        }
        self.chamfer_u16(&mut wide);
        for (i, &d) in wide.iter().enumerate() {
            dist[i] = d.min(0xff) as u8;
        }
    }

    /// Two-pass chamfer propagation: straight steps cost 2, diagonal 3.
    fn chamfer_u16(&self, dist: &mut [u16]) {
        // Forward pass: west (0), south (3) and their diagonals.
        for z in 0..self.depth {
            for x in 0..self.width {
                let cell = self.cell(x, z);
                for si in cell.first as usize..(cell.first + cell.count) as usize {
                    self.relax(dist, x, z, si, 0, 3);
                    self.relax(dist, x, z, si, 3, 2);
                }
            }
        }
        // Reverse pass: east (2), north (1) and their diagonals.
        for z in (0..self.depth).rev() {
            for x in (0..self.width).rev() {
                let cell = self.cell(x, z);
                for si in cell.first as usize..(cell.first + cell.count) as usize {
                    self.relax(dist, x, z, si, 2, 1);
                    self.relax(dist, x, z, si, 1, 0);
                }
            }
        }
    }

    /// Relax `dist[si]` against the neighbor in `dir` (+2) and that
    /// neighbor's neighbor in `diag_dir` (+3).
    fn relax(&self, dist: &mut [u16], x: i32, z: i32, si: usize, dir: usize, diag_dir: usize) {
        if let Some(ni) = self.neighbor(x, z, si, dir) {
            let d = dist[ni].saturating_add(2);
            if d < dist[si] {
                dist[si] = d;
            }
            let nx = x + DIR_OFFSET_X[dir];
            let nz = z + DIR_OFFSET_Z[dir];
            if let Some(di) = self.neighbor(nx, nz, ni, diag_dir) {
                let d = dist[di].saturating_add(3);
                if d < dist[si] {
                    dist[si] = d;
                }
            }
        }
    }

    /// One box-blur pass over the distance field. Values at or below
    /// `threshold * 2` are kept sharp so borders stay crisp.
    fn box_blur(&self, dist: &[u16], threshold: u16) -> Vec<u16> {
        let threshold = threshold * 2;
        let mut out = dist.to_vec();
        for z in 0..self.depth {
            for x in 0..self.width {
                let cell = self.cell(x, z);
                for si in cell.first as usize..(cell.first + cell.count) as usize {
                    let cd = dist[si];
                    if cd <= threshold {
                        continue;
                    }
                    let mut sum = cd as u32;
                    for dir in 0..4 {
                        match self.neighbor(x, z, si, dir) {
                            Some(ni) => {
                                sum += dist[ni] as u32;
                                let nx = x + DIR_OFFSET_X[dir];
                                let nz = z + DIR_OFFSET_Z[dir];
                                match self.neighbor(nx, nz, ni, (dir + 1) & 3) {
                                    Some(di) => sum += dist[di] as u32,
                                    None => sum += cd as u32,
                                }
                            }
                            None => sum += cd as u32 * 2,
                        }
                    }
                    out[si] = ((sum + 5) / 9) as u16;
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BakeConfig, GridConfig};
    use crate::heightfield::WALKABLE_AREA;
    use waymesh_common::Aabb;

    /// Flat 12x12 field of walkable spans at floor height 1.
    fn flat_field() -> CompactHeightfield {
        let config = BakeConfig {
            cell_size: 1.0,
            cell_height: 0.5,
            ..Default::default()
        };
        let bounds = Aabb::new(Vec3::ZERO, Vec3::new(12.0, 5.0, 12.0));
        let grid = GridConfig::derive(&config, &bounds).unwrap();
        let mut hf = Heightfield::new(&grid);
        for z in 0..12 {
            for x in 0..12 {
                hf.add_span(x, z, 0, 1, WALKABLE_AREA);
            }
        }
        CompactHeightfield::build(&hf, 4, 1).unwrap()
    }

    #[test]
    fn open_spans_match_walkable_spans() {
        let chf = flat_field();
        assert_eq!(chf.span_count(), 144);
        let cell = chf.cell(0, 0);
        assert_eq!(cell.count, 1);
    }

    #[test]
    fn connections_are_mutual() {
        let chf = flat_field();
        for z in 0..chf.depth {
            for x in 0..chf.width {
                let cell = chf.cell(x, z);
                for si in cell.first as usize..(cell.first + cell.count) as usize {
                    for dir in 0..4 {
                        if let Some(ni) = chf.neighbor(x, z, si, dir) {
                            let nx = x + DIR_OFFSET_X[dir];
                            let nz = z + DIR_OFFSET_Z[dir];
                            let back = chf.neighbor(nx, nz, ni, (dir + 2) & 3);
                            assert_eq!(back, Some(si));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn border_cells_miss_outward_connections() {
        let chf = flat_field();
        let cell = chf.cell(0, 0);
        let si = cell.first as usize;
        // West (dir 0) and south (dir 3) are off-grid.
        assert!(chf.neighbor(0, 0, si, 0).is_none());
        assert!(chf.neighbor(0, 0, si, 3).is_none());
        assert!(chf.neighbor(0, 0, si, 1).is_some());
        assert!(chf.neighbor(0, 0, si, 2).is_some());
    }

    #[test]
    fn tall_step_is_not_connected() {
        let config = BakeConfig {
            cell_size: 1.0,
            cell_height: 0.5,
            ..Default::default()
        };
        let bounds = Aabb::new(Vec3::ZERO, Vec3::new(4.0, 10.0, 4.0));
        let grid = GridConfig::derive(&config, &bounds).unwrap();
        let mut hf = Heightfield::new(&grid);
        hf.add_span(0, 0, 0, 1, WALKABLE_AREA);
        hf.add_span(1, 0, 0, 8, WALKABLE_AREA); // floor 7 cells higher
        let chf = CompactHeightfield::build(&hf, 4, 2).unwrap();
        let si = chf.cell(0, 0).first as usize;
        assert!(chf.neighbor(0, 0, si, 2).is_none());
    }

    #[test]
    fn erosion_shrinks_walkable_area() {
        let mut chf = flat_field();
        chf.erode_walkable_area(2).unwrap();
        // Corner span is gone, center span survives.
        let corner = chf.cell(0, 0).first as usize;
        assert_eq!(chf.areas[corner], NULL_AREA);
        let center = chf.cell(6, 6).first as usize;
        assert_eq!(chf.areas[center], WALKABLE_AREA);
    }

    #[test]
    fn distance_field_peaks_at_center() {
        let mut chf = flat_field();
        chf.build_distance_field().unwrap();
        let corner = chf.cell(0, 0).first as usize;
        let center = chf.cell(6, 6).first as usize;
        assert!(chf.dist[center] > chf.dist[corner]);
        assert!(chf.max_distance > 0);
    }
}
