//! Budgeted A* over the polygon graph and the string-pulling pass.
//!
//! A [`QueryContext`] owns the node table and open list for one search at
//! a time. Searches are sliced: [`QueryContext::update`] expands at most
//! the given number of nodes and parks the rest of the search for the next
//! tick. Node storage is capped; a search that outgrows the budget fails
//! rather than grows.

use std::collections::{BinaryHeap, HashMap};

use waymesh_common::{tri_area_2d, Error, Result, Vec3};

use crate::filter::QueryFilter;
use crate::mesh::{NavMesh, PolyRef, POLY_FLAG_OFF_MESH};

/// Heuristic scale; slightly under 1 keeps the search admissible under
/// floating point error.
const HEURISTIC_SCALE: f32 = 0.999;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    InProgress,
    Success,
    Failed,
}

struct Node {
    poly: PolyRef,
    parent: Option<u32>,
    position: Vec3,
    cost: f32,
    total: f32,
    closed: bool,
}

/// Open-list entry; the heap is lazy, stale entries are skipped on pop.
struct HeapEntry {
    total: f32,
    node: u32,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node && self.total.total_cmp(&other.total).is_eq()
    }
}
impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reversed: BinaryHeap is a max-heap, we want the cheapest node.
        other.total.total_cmp(&self.total)
    }
}

struct ActiveSearch {
    end: PolyRef,
    end_position: Vec3,
    filter: QueryFilter,
    found: Option<u32>,
}

pub struct QueryContext {
    nodes: Vec<Node>,
    lookup: HashMap<PolyRef, u32>,
    open: BinaryHeap<HeapEntry>,
    node_budget: usize,
    search: Option<ActiveSearch>,
}

impl QueryContext {
    pub fn new(node_budget: usize) -> Self {
        Self {
            nodes: Vec::new(),
            lookup: HashMap::new(),
            open: BinaryHeap::new(),
            node_budget,
            search: None,
        }
    }

    /// Clear all search state, keeping allocations.
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.lookup.clear();
        self.open.clear();
        self.search = None;
    }

    pub fn node_budget(&self) -> usize {
        self.node_budget
    }

    /// Prime the context for a search from `start` to `end`. Positions are
    /// the snapped points on those polygons.
    pub fn start_search(
        &mut self,
        mesh: &NavMesh,
        start: PolyRef,
        start_position: Vec3,
        end: PolyRef,
        end_position: Vec3,
        filter: QueryFilter,
    ) -> Result<()> {
        if !mesh.is_valid(start) || !mesh.is_valid(end) {
            return Err(Error::PathNotFound("stale or invalid endpoint".into()));
        }
        self.reset();

        let h = start_position.distance(end_position) * HEURISTIC_SCALE;
        self.nodes.push(Node {
            poly: start,
            parent: None,
            position: start_position,
            cost: 0.0,
            total: h,
            closed: false,
        });
        self.lookup.insert(start, 0);
        self.open.push(HeapEntry { total: h, node: 0 });
        self.search = Some(ActiveSearch {
            end,
            end_position,
            filter,
            found: None,
        });
        Ok(())
    }

    /// Expand up to `max_expansions` nodes. Returns `InProgress` when the
    /// budget ran out with work remaining.
    pub fn update(&mut self, mesh: &NavMesh, max_expansions: usize) -> SearchStatus {
        let Some(search) = self.search.as_mut() else {
            return SearchStatus::Failed;
        };
        if search.found.is_some() {
            return SearchStatus::Success;
        }

        let mut expansions = 0;
        while expansions < max_expansions {
            let Some(entry) = self.open.pop() else {
                return SearchStatus::Failed;
            };
            let ni = entry.node as usize;
            if self.nodes[ni].closed || entry.total > self.nodes[ni].total {
                continue; // superseded heap entry
            }
            self.nodes[ni].closed = true;
            expansions += 1;

            if self.nodes[ni].poly == search.end {
                search.found = Some(entry.node);
                return SearchStatus::Success;
            }

            let current = self.nodes[ni].poly;
            let current_pos = self.nodes[ni].position;
            let current_cost = self.nodes[ni].cost;
            let Some(poly) = mesh.poly(current) else {
                return SearchStatus::Failed;
            };

            for edge in 0..poly.vert_count as usize {
                let Some(next) = mesh.neighbor(current, edge) else {
                    continue;
                };
                let Some(next_poly) = mesh.poly(next) else {
                    continue;
                };
                if !search.filter.passes(next_poly.flags) {
                    continue;
                }

                // Enter through the middle of the shared edge.
                let Some((left, right)) = mesh.portal_points(current, next) else {
                    continue;
                };
                let position = (left + right) * 0.5;

                let cost = current_cost + current_pos.distance(position);
                let heuristic = if next == search.end {
                    position.distance(search.end_position)
                } else {
                    position.distance(search.end_position) * HEURISTIC_SCALE
                };
                let total = cost + heuristic;

                match self.lookup.get(&next) {
                    Some(&idx) => {
                        let node = &mut self.nodes[idx as usize];
                        if cost >= node.cost {
                            continue;
                        }
                        node.parent = Some(entry.node);
                        node.position = position;
                        node.cost = cost;
                        node.total = total;
                        node.closed = false;
                        self.open.push(HeapEntry { total, node: idx });
                    }
                    None => {
                        if self.nodes.len() >= self.node_budget {
                            // Out of nodes; the frontier just gets poorer.
                            continue;
                        }
                        let idx = self.nodes.len() as u32;
                        self.nodes.push(Node {
                            poly: next,
                            parent: Some(entry.node),
                            position,
                            cost,
                            total,
                            closed: false,
                        });
                        self.lookup.insert(next, idx);
                        self.open.push(HeapEntry { total, node: idx });
                    }
                }
            }
        }
        SearchStatus::InProgress
    }

    /// Corridor from start to end after a successful search.
    pub fn build_corridor(&self) -> Result<Vec<PolyRef>> {
        let found = self
            .search
            .as_ref()
            .and_then(|s| s.found)
            .ok_or_else(|| Error::PathNotFound("search has no result".into()))?;

        let mut corridor = Vec::new();
        let mut cursor = Some(found);
        while let Some(idx) = cursor {
            let node = &self.nodes[idx as usize];
            corridor.push(node.poly);
            cursor = node.parent;
        }
        corridor.reverse();
        Ok(corridor)
    }
}

pub const STRAIGHT_START: u8 = 0x01;
pub const STRAIGHT_END: u8 = 0x02;
pub const STRAIGHT_OFF_MESH: u8 = 0x04;

/// One vertex of a string-pulled path.
#[derive(Debug, Clone, Copy)]
pub struct StraightPoint {
    pub position: Vec3,
    pub flags: u8,
    /// Polygon entered at this point.
    pub poly: PolyRef,
}

#[inline]
fn vequal_2d(a: Vec3, b: Vec3) -> bool {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    dx * dx + dz * dz < 1e-6
}

/// Funnel (string-pulling) pass over a polygon corridor. Produces at most
/// `max_points` waypoints; a truncated result simply ends early, which is
/// all a bounded steering window needs.
pub fn find_straight_path(
    mesh: &NavMesh,
    start: Vec3,
    end: Vec3,
    corridor: &[PolyRef],
    max_points: usize,
) -> Result<Vec<StraightPoint>> {
    if corridor.is_empty() {
        return Err(Error::PathNotFound("empty corridor".into()));
    }

    let mut points = vec![StraightPoint {
        position: start,
        flags: STRAIGHT_START,
        poly: corridor[0],
    }];
    if max_points <= 1 {
        return Ok(points);
    }

    let n = corridor.len();
    let mut apex = start;
    let mut left = start;
    let mut right = start;
    let mut apex_index = 0usize;
    let mut left_index = 0usize;
    let mut right_index = 0usize;
    let mut left_poly = corridor[0];
    let mut right_poly = corridor[0];

    let mut push = |points: &mut Vec<StraightPoint>, position: Vec3, poly: PolyRef| -> bool {
        let flags = match mesh.poly(poly) {
            Some(p) if p.flags & POLY_FLAG_OFF_MESH != 0 => STRAIGHT_OFF_MESH,
            _ => 0,
        };
        // Collapse repeats at the funnel apex.
        if let Some(last) = points.last() {
            if vequal_2d(last.position, position) {
                return points.len() < max_points;
            }
        }
        points.push(StraightPoint {
            position,
            flags,
            poly,
        });
        points.len() < max_points
    };

    let mut i = 0usize;
    while i < n {
        let (portal_left, portal_right, to_poly) = if i + 1 < n {
            let Some((l, r)) = mesh.portal_points(corridor[i], corridor[i + 1]) else {
                return Err(Error::PathNotFound("broken corridor adjacency".into()));
            };
            (l, r, corridor[i + 1])
        } else {
            (end, end, PolyRef::NULL)
        };

        // Tighten the right side of the funnel.
        if tri_area_2d(apex, right, portal_right) <= 0.0 {
            if vequal_2d(apex, right) || tri_area_2d(apex, left, portal_right) > 0.0 {
                right = portal_right;
                right_poly = to_poly;
                right_index = i;
            } else {
                // Right would cross left: emit the left corner and restart
                // the funnel from it.
                if !push(&mut points, left, left_poly) {
                    return Ok(points);
                }
                apex = left;
                apex_index = left_index;
                left = apex;
                right = apex;
                left_index = apex_index;
                right_index = apex_index;
                i = apex_index + 1;
                continue;
            }
        }

        // Tighten the left side.
        if tri_area_2d(apex, left, portal_left) >= 0.0 {
            if vequal_2d(apex, left) || tri_area_2d(apex, right, portal_left) < 0.0 {
                left = portal_left;
                left_poly = to_poly;
                left_index = i;
            } else {
                if !push(&mut points, right, right_poly) {
                    return Ok(points);
                }
                apex = right;
                apex_index = right_index;
                left = apex;
                right = apex;
                left_index = apex_index;
                right_index = apex_index;
                i = apex_index + 1;
                continue;
            }
        }

        i += 1;
    }

    if points.len() < max_points {
        let last = corridor[n - 1];
        if !vequal_2d(points[points.len() - 1].position, end) || points.len() == 1 {
            points.push(StraightPoint {
                position: end,
                flags: STRAIGHT_END,
                poly: last,
            });
        } else if let Some(p) = points.last_mut() {
            p.flags |= STRAIGHT_END;
        }
    } else if let Some(p) = points.last_mut() {
        p.flags |= STRAIGHT_END;
    }

    Ok(points)
}
