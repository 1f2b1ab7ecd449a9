//! Query-time polygon filtering and query tuning knobs.

use serde::{Deserialize, Serialize};
use waymesh_common::Vec3;

/// Include/exclude flag filter applied to every polygon a query touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryFilter {
    pub include_flags: u16,
    pub exclude_flags: u16,
}

impl Default for QueryFilter {
    fn default() -> Self {
        Self {
            include_flags: 0xffff,
            exclude_flags: 0,
        }
    }
}

impl QueryFilter {
    pub fn passes(&self, flags: u16) -> bool {
        flags & self.include_flags != 0 && flags & self.exclude_flags == 0
    }
}

/// Host-tunable query parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Search box half-extents for snapping positions onto the mesh.
    pub half_extents: Vec3,
    pub include_flags: u16,
    pub exclude_flags: u16,
    /// Concurrent query context count.
    pub pool_capacity: usize,
    /// Node table cap per context; searches that outgrow it fail.
    pub node_budget: usize,
    /// Node expansions one path task spends per update.
    pub nodes_per_update: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            half_extents: Vec3::new(0.5, 1.0, 0.5),
            include_flags: 0xffff,
            exclude_flags: 0,
            pool_capacity: 8,
            node_budget: 4096,
            nodes_per_update: 64,
        }
    }
}

impl QueryConfig {
    pub fn filter(&self) -> QueryFilter {
        QueryFilter {
            include_flags: self.include_flags,
            exclude_flags: self.exclude_flags,
        }
    }
}
