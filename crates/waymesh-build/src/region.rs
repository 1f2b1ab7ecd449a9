//! Watershed region partitioning.
//!
//! Grows regions from distance-field peaks downward so that region borders
//! land along the medial ridges of the walkable area, then merges or
//! discards fragments below the configured area thresholds and compacts
//! region ids to a dense range.

use std::collections::HashMap;

use waymesh_common::{Error, Result};

use crate::compact::CompactHeightfield;
use crate::heightfield::{DIR_OFFSET_X, DIR_OFFSET_Z, NULL_AREA};

/// Span address used on the grow stacks.
#[derive(Clone, Copy)]
struct Entry {
    x: i32,
    z: i32,
    span: usize,
}

const CLAIMED: usize = usize::MAX;

/// Partition the walkable spans of `chf` into regions. Requires the
/// distance field to be built.
pub fn build_regions(
    chf: &mut CompactHeightfield,
    min_region_area: i32,
    merge_region_area: i32,
) -> Result<()> {
    let span_count = chf.span_count();
    let mut src_reg = vec![0u16; span_count];
    let mut src_dist = vec![0u16; span_count];
    let mut region_id: u16 = 1;

    let mut level = (chf.max_distance + 1) & !1;
    while level > 0 {
        level = level.saturating_sub(2);

        let mut stack = collect_unassigned(chf, &src_reg, level);
        expand_regions(chf, 8, level, &mut src_reg, &mut src_dist, &mut stack);

        // Whatever expansion could not claim seeds a new region.
        for entry in &stack {
            if entry.span == CLAIMED || src_reg[entry.span] != 0 {
                continue;
            }
            if flood_region(chf, *entry, level, region_id, &mut src_reg, &mut src_dist) {
                region_id = region_id.checked_add(1).ok_or_else(|| {
                    Error::Allocation("region id space exhausted".into())
                })?;
            }
        }
    }

    // Final sweep catches spans isolated from every peak.
    let mut stack = collect_unassigned(chf, &src_reg, 0);
    expand_regions(chf, 8 * 8, 0, &mut src_reg, &mut src_dist, &mut stack);

    let max_region = merge_and_filter(
        chf,
        &mut src_reg,
        region_id,
        min_region_area,
        merge_region_area,
    );

    log::debug!(
        "watershed: {} spans partitioned into {} regions",
        span_count,
        max_region
    );

    chf.regions = src_reg;
    chf.max_region = max_region;
    Ok(())
}

fn collect_unassigned(chf: &CompactHeightfield, src_reg: &[u16], level: u16) -> Vec<Entry> {
    let mut stack = Vec::new();
    for z in 0..chf.depth {
        for x in 0..chf.width {
            let cell = chf.cell(x, z);
            for si in cell.first as usize..(cell.first + cell.count) as usize {
                if chf.areas[si] != NULL_AREA && src_reg[si] == 0 && chf.dist[si] >= level {
                    stack.push(Entry { x, z, span: si });
                }
            }
        }
    }
    stack
}

/// Grow existing regions over the stacked spans. Each span joins the
/// neighboring region closest to a border (smallest propagated distance).
fn expand_regions(
    chf: &CompactHeightfield,
    max_iterations: i32,
    level: u16,
    src_reg: &mut [u16],
    src_dist: &mut [u16],
    stack: &mut [Entry],
) {
    for entry in stack.iter_mut() {
        if src_reg[entry.span] != 0 {
            entry.span = CLAIMED;
        }
    }

    let mut dirty: Vec<(usize, u16, u16)> = Vec::new();
    let mut iterations = 0;
    loop {
        dirty.clear();
        for entry in stack.iter_mut() {
            if entry.span == CLAIMED {
                continue;
            }
            let si = entry.span;
            let area = chf.areas[si];
            let mut region = 0u16;
            let mut dist = u16::MAX;
            for dir in 0..4 {
                if let Some(ni) = chf.neighbor(entry.x, entry.z, si, dir) {
                    if chf.areas[ni] != area {
                        continue;
                    }
                    if src_reg[ni] > 0 && src_dist[ni].saturating_add(2) < dist {
                        region = src_reg[ni];
                        dist = src_dist[ni] + 2;
                    }
                }
            }
            if region > 0 {
                dirty.push((si, region, dist));
                entry.span = CLAIMED;
            }
        }

        if dirty.is_empty() {
            break;
        }
        for &(si, region, dist) in &dirty {
            src_reg[si] = region;
            src_dist[si] = dist;
        }

        if level > 0 {
            iterations += 1;
            if iterations >= max_iterations {
                break;
            }
        }
    }
}

/// Flood-fill a new region from `seed` across spans at or above the
/// current level. Refuses spans that already touch a different region
/// (including diagonally), which keeps regions from interleaving.
fn flood_region(
    chf: &CompactHeightfield,
    seed: Entry,
    level: u16,
    region: u16,
    src_reg: &mut [u16],
    src_dist: &mut [u16],
) -> bool {
    let area = chf.areas[seed.span];
    let lev = level.saturating_sub(2);

    let mut stack = vec![seed];
    src_reg[seed.span] = region;
    src_dist[seed.span] = 0;
    let mut count = 0;

    while let Some(entry) = stack.pop() {
        let Entry { x, z, span } = entry;

        // Adjacent to an already-built region? Give the span up.
        let mut adjacent = 0u16;
        for dir in 0..4 {
            if let Some(ni) = chf.neighbor(x, z, span, dir) {
                if chf.areas[ni] != area {
                    continue;
                }
                let nr = src_reg[ni];
                if nr != 0 && nr != region {
                    adjacent = nr;
                    break;
                }
                let nx = x + DIR_OFFSET_X[dir];
                let nz = z + DIR_OFFSET_Z[dir];
                if let Some(di) = chf.neighbor(nx, nz, ni, (dir + 1) & 3) {
                    if chf.areas[di] == area {
                        let dr = src_reg[di];
                        if dr != 0 && dr != region {
                            adjacent = dr;
                            break;
                        }
                    }
                }
            }
        }
        if adjacent != 0 {
            src_reg[span] = 0;
            continue;
        }
        count += 1;

        for dir in 0..4 {
            if let Some(ni) = chf.neighbor(x, z, span, dir) {
                if chf.areas[ni] == area && chf.dist[ni] >= lev && src_reg[ni] == 0 {
                    src_reg[ni] = region;
                    src_dist[ni] = 0;
                    stack.push(Entry {
                        x: x + DIR_OFFSET_X[dir],
                        z: z + DIR_OFFSET_Z[dir],
                        span: ni,
                    });
                }
            }
        }
    }

    count > 0
}

/// Per-region span counts and shared-border lengths with each neighbor.
fn region_stats(
    chf: &CompactHeightfield,
    src_reg: &[u16],
    region_count: usize,
) -> (Vec<i32>, Vec<HashMap<u16, i32>>) {
    let mut counts = vec![0i32; region_count];
    let mut borders: Vec<HashMap<u16, i32>> = vec![HashMap::new(); region_count];

    for z in 0..chf.depth {
        for x in 0..chf.width {
            let cell = chf.cell(x, z);
            for si in cell.first as usize..(cell.first + cell.count) as usize {
                let r = src_reg[si];
                if r == 0 {
                    continue;
                }
                counts[r as usize] += 1;
                for dir in 0..4 {
                    if let Some(ni) = chf.neighbor(x, z, si, dir) {
                        let nr = src_reg[ni];
                        if nr != 0 && nr != r {
                            *borders[r as usize].entry(nr).or_insert(0) += 1;
                        }
                    }
                }
            }
        }
    }
    (counts, borders)
}

fn remap(src_reg: &mut [u16], from: u16, to: u16) {
    for r in src_reg.iter_mut() {
        if *r == from {
            *r = to;
        }
    }
}

/// Merge undersized regions into their longest-border neighbor; discard
/// fragments below the minimum with no neighbor at all. Ids are compacted
/// to `1..=result` afterward.
fn merge_and_filter(
    chf: &CompactHeightfield,
    src_reg: &mut [u16],
    region_count: u16,
    min_region_area: i32,
    merge_region_area: i32,
) -> u16 {
    let n = region_count as usize;

    // Small fragments first: merge if possible, drop otherwise.
    loop {
        let (counts, borders) = region_stats(chf, src_reg, n);
        let mut changed = false;
        for r in 1..n {
            if counts[r] == 0 || counts[r] >= min_region_area {
                continue;
            }
            let best = borders[r].iter().max_by_key(|(_, &len)| len);
            match best {
                Some((&target, _)) => remap(src_reg, r as u16, target),
                None => remap(src_reg, r as u16, 0),
            }
            changed = true;
            break;
        }
        if !changed {
            break;
        }
    }

    // Then coalesce regions below the merge threshold into neighbors.
    loop {
        let (counts, borders) = region_stats(chf, src_reg, n);
        let mut changed = false;
        for r in 1..n {
            if counts[r] == 0 || counts[r] >= merge_region_area {
                continue;
            }
            if let Some((&target, _)) = borders[r].iter().max_by_key(|(_, &len)| len) {
                remap(src_reg, r as u16, target);
                changed = true;
                break;
            }
        }
        if !changed {
            break;
        }
    }

    // Compact surviving ids.
    let mut id_map = vec![0u16; n];
    let mut next = 0u16;
    for r in src_reg.iter_mut() {
        if *r == 0 {
            continue;
        }
        if id_map[*r as usize] == 0 {
            next += 1;
            id_map[*r as usize] = next;
        }
        *r = id_map[*r as usize];
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BakeConfig, GridConfig};
    use crate::heightfield::{Heightfield, WALKABLE_AREA};
    use waymesh_common::{Aabb, Vec3};

    fn partitioned_field(
        fill: impl Fn(&mut Heightfield),
        min_area: i32,
        merge_area: i32,
    ) -> CompactHeightfield {
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
        build_regions(&mut chf, min_area, merge_area).unwrap();
        chf
    }

    #[test]
    fn flat_field_becomes_one_region() {
        let chf = partitioned_field(
            |hf| {
                for z in 0..20 {
                    for x in 0..20 {
                        hf.add_span(x, z, 0, 1, WALKABLE_AREA);
                    }
                }
            },
            8,
            400,
        );
        assert_eq!(chf.max_region, 1);
        for si in 0..chf.span_count() {
            assert_eq!(chf.regions[si], 1);
        }
    }

    #[test]
    fn region_spans_are_connected_same_area() {
        // Two islands separated by a gap never share a region.
        let chf = partitioned_field(
            |hf| {
                for z in 0..20 {
                    for x in 0..8 {
                        hf.add_span(x, z, 0, 1, WALKABLE_AREA);
                    }
                    for x in 12..20 {
                        hf.add_span(x, z, 0, 1, WALKABLE_AREA);
                    }
                }
            },
            8,
            400,
        );
        assert!(chf.max_region >= 2);
        let left = chf.regions[chf.cell(2, 10).first as usize];
        let right = chf.regions[chf.cell(14, 10).first as usize];
        assert_ne!(left, 0);
        assert_ne!(right, 0);
        assert_ne!(left, right);
    }

    #[test]
    fn tiny_island_is_discarded() {
        let chf = partitioned_field(
            |hf| {
                for z in 0..20 {
                    for x in 0..10 {
                        hf.add_span(x, z, 0, 1, WALKABLE_AREA);
                    }
                }
                // 2x2 island far from the main area.
                for z in 15..17 {
                    for x in 15..17 {
                        hf.add_span(x, z, 0, 1, WALKABLE_AREA);
                    }
                }
            },
            8,
            400,
        );
        let island = chf.regions[chf.cell(15, 15).first as usize];
        assert_eq!(island, 0);
        let main = chf.regions[chf.cell(5, 10).first as usize];
        assert_ne!(main, 0);
    }

    #[test]
    fn region_ids_are_dense() {
        let chf = partitioned_field(
            |hf| {
                for z in 0..20 {
                    for x in 0..20 {
                        hf.add_span(x, z, 0, 1, WALKABLE_AREA);
                    }
                }
            },
            8,
            50,
        );
        let mut seen = vec![false; chf.max_region as usize + 1];
        for &r in &chf.regions {
            assert!(r <= chf.max_region);
            seen[r as usize] = true;
        }
        for r in 1..=chf.max_region as usize {
            assert!(seen[r], "region id {r} unused");
        }
    }
}
