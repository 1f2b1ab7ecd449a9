//! Corridor-following steering.
//!
//! Steering looks a short straight-path window ahead along the corridor,
//! picks a lookahead point, and turns the result into a desired linear
//! velocity plus a turn axis. It never moves the agent itself; the host
//! applies the output through its own integration.

use glam::Vec3;
use waymesh_nav::{find_straight_path, NavMesh, Path, STRAIGHT_OFF_MESH};

/// Straight-path points projected ahead of the agent per tick.
const LOOKAHEAD_POINTS: usize = 3;

/// Alignment cosine above which no turn is requested, and below whose
/// negation the cross product degenerates and the body spins about up.
const ALIGNED_COS: f32 = 0.98;

/// Desired motion for one tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct Steering {
    /// Direction to the lookahead point scaled by the travel distance.
    pub linear: Vec3,
    /// Turn axis scaled by the angular budget; zero when already aligned.
    pub angular: Vec3,
}

/// Compute the desired velocity and turn toward the next corridor
/// waypoint. The lookahead stops early at an off-mesh link flag or once
/// the accumulated distance covers `travel_dist`. An empty corridor, a
/// broken one, or a lookahead point on top of the agent all steer to zero.
pub fn steer(
    mesh: &NavMesh,
    path: &Path,
    position: Vec3,
    forward: Vec3,
    up: Vec3,
    travel_dist: f32,
    angular_budget: f32,
) -> Steering {
    if path.is_empty() || travel_dist <= 0.0 {
        return Steering::default();
    }

    let points = match find_straight_path(
        mesh,
        position,
        path.target(),
        path.corridor(),
        LOOKAHEAD_POINTS + 1,
    ) {
        Ok(points) => points,
        Err(err) => {
            log::debug!("steering: {err}");
            return Steering::default();
        }
    };

    // First point at or beyond the travel distance, else the last one.
    let mut chosen = None;
    let mut travelled = 0.0;
    let mut prev = position;
    for p in points.iter().skip(1) {
        travelled += prev.distance(p.position);
        chosen = Some(p.position);
        if p.flags & STRAIGHT_OFF_MESH != 0 || travelled >= travel_dist {
            break;
        }
        prev = p.position;
    }
    let Some(target) = chosen else {
        return Steering::default();
    };

    let Some(direction) = (target - position).try_normalize() else {
        return Steering::default();
    };

    Steering {
        linear: direction * travel_dist,
        angular: turn_axis(forward, up, direction) * angular_budget,
    }
}

fn turn_axis(forward: Vec3, up: Vec3, desired: Vec3) -> Vec3 {
    let d = forward.dot(desired);
    if d > ALIGNED_COS {
        Vec3::ZERO
    } else if d < -ALIGNED_COS {
        up
    } else {
        forward.cross(desired).normalize_or_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligned_forward_needs_no_turn() {
        assert_eq!(turn_axis(Vec3::X, Vec3::Y, Vec3::X), Vec3::ZERO);
    }

    #[test]
    fn opposed_forward_spins_about_up() {
        assert_eq!(turn_axis(Vec3::X, Vec3::Y, -Vec3::X), Vec3::Y);
    }

    #[test]
    fn perpendicular_turn_uses_the_cross_product() {
        let axis = turn_axis(Vec3::X, Vec3::Y, Vec3::Z);
        assert!((axis - Vec3::X.cross(Vec3::Z)).length() < 1e-6);
    }
}
