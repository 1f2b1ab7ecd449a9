//! Runtime navigation mesh and path queries.
//!
//! [`NavMesh`] is the immutable product of a bake: flat vertex and polygon
//! arrays addressed by generation-stamped [`PolyRef`] handles, so
//! references into a superseded mesh go quietly stale instead of dangling.
//! Queries run through contexts rented from a [`PathQueryPool`] and are
//! sliced: a [`PathTask`] spends a bounded number of node expansions per
//! update and carries its state between ticks.

pub mod filter;
pub mod mesh;
pub mod path;
pub mod pool;
pub mod query;
pub mod task;

#[cfg(test)]
mod query_tests;

pub use filter::{QueryConfig, QueryFilter};
pub use mesh::{
    NavMesh, NavPoly, PolyRef, MAX_VERTS_PER_POLY, POLY_FLAG_OFF_MESH, POLY_FLAG_WALKABLE,
};
pub use path::Path;
pub use pool::{PathQueryPool, QueryHandle};
pub use query::{
    find_straight_path, QueryContext, SearchStatus, StraightPoint, STRAIGHT_END, STRAIGHT_OFF_MESH,
    STRAIGHT_START,
};
pub use task::{PathRequest, PathTask, TaskState};
