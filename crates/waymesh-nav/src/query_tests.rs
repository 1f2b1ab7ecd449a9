//! End-to-end query tests over freshly baked meshes.

use glam::Vec3;

use waymesh_build::{BakeConfig, BuildPipeline, GeometrySource};

use crate::filter::QueryFilter;
use crate::mesh::{NavMesh, POLY_FLAG_WALKABLE};
use crate::path::Path;
use crate::pool::PathQueryPool;
use crate::query::{find_straight_path, STRAIGHT_END, STRAIGHT_START};
use crate::task::{PathRequest, PathTask, TaskState};

fn test_config() -> BakeConfig {
    BakeConfig {
        cell_size: 0.2,
        cell_height: 0.2,
        agent_radius: 0.2,
        agent_height: 1.0,
        ..Default::default()
    }
}

fn bake(verts: &[Vec3], indices: &[u32], generation: u32) -> NavMesh {
    let sources = [GeometrySource::new(verts, indices)];
    let mut pipeline = BuildPipeline::new(test_config(), &sources).unwrap();
    while !pipeline.is_finished() {
        pipeline.update();
    }
    let (mesh, detail) = pipeline.take_output().unwrap();
    NavMesh::assemble(&mesh, detail, generation).unwrap()
}

/// 10x10 flat square at the origin.
fn square_mesh(generation: u32) -> NavMesh {
    let verts = [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(10.0, 0.0, 0.0),
        Vec3::new(10.0, 0.0, 10.0),
        Vec3::new(0.0, 0.0, 10.0),
    ];
    let indices = [0u32, 2, 1, 0, 3, 2];
    bake(&verts, &indices, generation)
}

/// L-shaped floor: a 12x4 leg along X joined to a 4x12 leg along Z.
fn l_mesh() -> NavMesh {
    let verts = [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(12.0, 0.0, 0.0),
        Vec3::new(12.0, 0.0, 4.0),
        Vec3::new(0.0, 0.0, 4.0),
        Vec3::new(4.0, 0.0, 12.0),
        Vec3::new(0.0, 0.0, 12.0),
    ];
    let indices = [0u32, 2, 1, 0, 3, 2, 3, 4, 2, 3, 5, 4];
    bake(&verts, &indices, 1)
}

fn snap_extents() -> Vec3 {
    Vec3::new(0.5, 1.0, 0.5)
}

#[test]
fn walkable_inside_unwalkable_outside() {
    let mesh = square_mesh(1);
    assert!(mesh.poly_count() >= 1);
    assert!(mesh.is_walkable(Vec3::new(5.0, 0.2, 5.0), Vec3::new(0.5, 1.0, 0.5)));
    assert!(!mesh.is_walkable(Vec3::new(20.0, 0.2, 20.0), Vec3::new(0.5, 1.0, 0.5)));
}

#[test]
fn nearest_poly_snaps_onto_the_surface() {
    let mesh = square_mesh(1);
    let filter = QueryFilter::default();
    let (r, pt) = mesh
        .find_nearest_poly(Vec3::new(5.0, 0.9, 5.0), snap_extents(), &filter)
        .unwrap();
    assert!(mesh.is_valid(r));
    // The bake's walkable flag survives into the runtime polygons.
    assert!(mesh.poly(r).unwrap().flags & POLY_FLAG_WALKABLE != 0);
    assert!((pt.x - 5.0).abs() < 1e-3);
    assert!((pt.z - 5.0).abs() < 1e-3);
    // The floor sits one cell height above the grid origin.
    assert!(pt.y >= 0.0 && pt.y <= 0.5);
}

#[test]
fn refs_from_an_old_bake_never_validate() {
    let old = square_mesh(1);
    let new = square_mesh(2);
    let stale = old.poly_ref(0);
    assert!(old.is_valid(stale));
    assert!(!new.is_valid(stale));
    assert!(new.poly(stale).is_none());
    assert!(new.closest_point_on_poly(stale, Vec3::ZERO).is_none());
}

#[test]
fn path_task_crosses_the_l() {
    let mesh = l_mesh();
    let pool = PathQueryPool::new(2, 2048);
    let request = PathRequest {
        start: Vec3::new(10.0, 0.2, 2.0),
        end: Vec3::new(2.0, 0.2, 10.0),
        half_extents: snap_extents(),
        filter: QueryFilter::default(),
    };
    let mut task = PathTask::new(pool.acquire().unwrap(), request);

    let mut guard = 0;
    while !task.state().is_terminal() {
        task.update(&mesh);
        guard += 1;
        assert!(guard < 10_000, "search did not terminate");
    }
    assert_eq!(task.state(), TaskState::Done);

    let path = task.take_result().unwrap();
    assert!(!path.is_empty());
    // Consecutive corridor polys share an edge.
    let corridor = path.corridor();
    for w in corridor.windows(2) {
        assert!(mesh.portal_points(w[0], w[1]).is_some());
    }
    // Endpoints live on the first and last polygon.
    assert_eq!(
        mesh.find_nearest_poly(request.start, snap_extents(), &request.filter)
            .unwrap()
            .0,
        corridor[0]
    );
}

#[test]
fn sliced_search_spans_multiple_updates() {
    let mesh = l_mesh();
    let pool = PathQueryPool::new(1, 2048);
    let request = PathRequest {
        start: Vec3::new(10.0, 0.2, 2.0),
        end: Vec3::new(2.0, 0.2, 10.0),
        half_extents: snap_extents(),
        filter: QueryFilter::default(),
    };
    let mut task = PathTask::new(pool.acquire().unwrap(), request).with_nodes_per_update(1);

    let mut updates = 0;
    while !task.state().is_terminal() {
        task.update(&mesh);
        updates += 1;
        assert!(updates < 10_000);
    }
    assert_eq!(task.state(), TaskState::Done);
    // Snap tick plus at least one expansion per remaining tick.
    assert!(updates >= 2, "expected a sliced search, got {updates} updates");
}

#[test]
fn unreachable_target_fails() {
    let mesh = square_mesh(1);
    let pool = PathQueryPool::new(1, 64);
    let request = PathRequest {
        start: Vec3::new(5.0, 0.2, 5.0),
        end: Vec3::new(50.0, 0.2, 50.0), // far off the mesh
        half_extents: snap_extents(),
        filter: QueryFilter::default(),
    };
    let mut task = PathTask::new(pool.acquire().unwrap(), request);
    let mut guard = 0;
    while !task.state().is_terminal() {
        task.update(&mesh);
        guard += 1;
        assert!(guard < 1_000);
    }
    assert_eq!(task.state(), TaskState::Failed);
    assert!(task.take_result().is_none());
}

#[test]
fn straight_path_spans_start_to_end() {
    let mesh = l_mesh();
    let pool = PathQueryPool::new(1, 2048);
    let request = PathRequest {
        start: Vec3::new(10.0, 0.2, 2.0),
        end: Vec3::new(2.0, 0.2, 10.0),
        half_extents: snap_extents(),
        filter: QueryFilter::default(),
    };
    let mut task = PathTask::new(pool.acquire().unwrap(), request);
    while !task.state().is_terminal() {
        task.update(&mesh);
    }
    let path: Path = task.take_result().unwrap();

    let points =
        find_straight_path(&mesh, path.start(), path.target(), path.corridor(), 32).unwrap();
    assert!(points.len() >= 2);
    assert!(points[0].flags & STRAIGHT_START != 0);
    assert!(points[points.len() - 1].flags & STRAIGHT_END != 0);
    let first = points[0].position;
    let last = points[points.len() - 1].position;
    assert!((first - path.start()).length() < 1e-3);
    assert!((last - path.target()).length() < 1e-3);
    // Every waypoint stays on the mesh.
    for p in &points {
        assert!(mesh.is_walkable(p.position, Vec3::new(0.3, 1.0, 0.3)));
    }
}

#[test]
fn cancelled_task_stays_cancelled() {
    let mesh = l_mesh();
    let pool = PathQueryPool::new(1, 2048);
    let request = PathRequest {
        start: Vec3::new(10.0, 0.2, 2.0),
        end: Vec3::new(2.0, 0.2, 10.0),
        half_extents: snap_extents(),
        filter: QueryFilter::default(),
    };
    let mut task = PathTask::new(pool.acquire().unwrap(), request).with_nodes_per_update(1);
    task.update(&mesh);
    task.cancel();
    assert_eq!(task.state(), TaskState::Cancelled);
    assert_eq!(task.update(&mesh), TaskState::Cancelled);
    assert!(task.take_result().is_none());

    // The pool slot frees once the task is dropped.
    assert_eq!(pool.available(), 0);
    drop(task);
    assert_eq!(pool.available(), 1);
}
