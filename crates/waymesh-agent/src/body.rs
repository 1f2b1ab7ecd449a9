//! Per-agent path-following state machine.

use std::cell::RefCell;
use std::rc::Weak;

use glam::{Mat3, Vec3};
use waymesh_nav::{NavMesh, Path, QueryFilter};

use crate::steering::steer;

/// Capability interface to the entity that owns the body. The body only
/// reads and writes through this trait, never the scene itself.
///
/// Basis convention: `x_axis` right, `y_axis` up, `z_axis` forward.
pub trait TransformProvider {
    fn transform(&self) -> (Vec3, Mat3);
    fn set_transform(&mut self, position: Vec3, basis: Mat3);
    fn set_velocity(&mut self, linear: Vec3, angular: Vec3);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyState {
    Idle,
    /// Path assigned, not yet running.
    PathStart,
    /// Following the corridor.
    PathRun,
    /// Pushed off the corridor; waiting for a reset.
    PathBreak,
    /// Arrived; waiting for a reset.
    PathEnd,
}

/// One agent following a polygon corridor.
///
/// The body holds the provider weakly: when the owning entity despawns the
/// body drops back to `Idle` on its next update instead of keeping the
/// entity alive.
pub struct NavigationBody {
    provider: Weak<RefCell<dyn TransformProvider>>,
    path: Option<Path>,
    state: BodyState,
    speed: f32,
    /// Absolute speed at `speed == 1.0`, world units per second.
    pub speed_limit: f32,
    /// Turn budget, radians per second.
    pub angular_speed: f32,
    /// Horizontal distance to the target that counts as arrival.
    pub arrive_radius: f32,
    /// Search box for matching the body position to the corridor.
    pub half_extents: Vec3,
    filter: QueryFilter,
}

impl NavigationBody {
    pub fn new(provider: Weak<RefCell<dyn TransformProvider>>) -> Self {
        Self {
            provider,
            path: None,
            state: BodyState::Idle,
            speed: 1.0,
            speed_limit: 1.0,
            angular_speed: std::f32::consts::PI,
            arrive_radius: 0.3,
            half_extents: Vec3::new(0.5, 1.0, 0.5),
            filter: QueryFilter::default(),
        }
    }

    pub fn state(&self) -> BodyState {
        self.state
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_ref()
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Speed scalar in `[0, 1]`; out-of-range values are clamped.
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed.clamp(0.0, 1.0);
    }

    /// Assign a new path. Any previous path is replaced; the body waits in
    /// `PathStart` until [`run`](Self::run).
    pub fn set_path(&mut self, path: Path) {
        self.path = Some(path);
        self.state = BodyState::PathStart;
    }

    /// Start following the assigned path. An empty path drops straight
    /// back to `Idle`.
    pub fn run(&mut self) {
        if self.state != BodyState::PathStart {
            return;
        }
        match &self.path {
            Some(path) if !path.is_empty() => self.state = BodyState::PathRun,
            _ => {
                self.path = None;
                self.state = BodyState::Idle;
            }
        }
    }

    /// Clear the path and return to `Idle` from any state.
    pub fn reset(&mut self) {
        self.path = None;
        self.state = BodyState::Idle;
        if let Some(provider) = self.provider.upgrade() {
            provider.borrow_mut().set_velocity(Vec3::ZERO, Vec3::ZERO);
        }
    }

    /// Per-tick update. Matches the current position to the remaining
    /// corridor (trimming monotonically), detects arrival, and writes the
    /// steering output through the provider.
    pub fn update(&mut self, dt: f32, mesh: &NavMesh) -> BodyState {
        if self.state != BodyState::PathRun {
            return self.state;
        }
        let Some(provider) = self.provider.upgrade() else {
            self.path = None;
            self.state = BodyState::Idle;
            return self.state;
        };
        let Some(path) = self.path.as_mut() else {
            self.state = BodyState::PathBreak;
            return self.state;
        };
        if path.is_empty() {
            self.state = BodyState::PathEnd;
            return self.state;
        }

        let (position, basis) = provider.borrow().transform();

        let matched = mesh
            .find_nearest_poly(position, self.half_extents, &self.filter)
            .is_some_and(|(poly, _)| path.advance_to(poly));
        if !matched {
            provider.borrow_mut().set_velocity(Vec3::ZERO, Vec3::ZERO);
            self.state = BodyState::PathBreak;
            return self.state;
        }

        if path.len() == 1 {
            let to_target = path.target() - position;
            let horizontal = Vec3::new(to_target.x, 0.0, to_target.z);
            if horizontal.length() <= self.arrive_radius {
                path.consume();
                provider.borrow_mut().set_velocity(Vec3::ZERO, Vec3::ZERO);
                self.state = BodyState::PathEnd;
                return self.state;
            }
        }

        let travel = self.speed * self.speed_limit * dt;
        let steering = steer(
            mesh,
            path,
            position,
            basis.z_axis,
            basis.y_axis,
            travel,
            self.angular_speed * dt,
        );
        provider
            .borrow_mut()
            .set_velocity(steering.linear, steering.angular);
        self.state
    }
}
