//! Agent-side navigation.
//!
//! [`Pathfinder`] is the host-facing front end: it bakes navmeshes through
//! `waymesh-build`, answers path requests through a [`NavCoordinator`]
//! command queue, and reports completions as drained events. Each mobile
//! agent carries a [`NavigationBody`] that follows its corridor with
//! [`steer`] and talks to the scene only through [`TransformProvider`].
//! Everything is single-threaded and cooperative, sliced across the host's
//! simulation ticks.

pub mod body;
pub mod coordinator;
pub mod pathfinder;
pub mod steering;


pub use body::{BodyState, NavigationBody, TransformProvider};
pub use coordinator::{
    EntityId, ListenerId, NavCoordinator, PathEvent, PathOutcome, RequestId,
};
pub use pathfinder::{BakeEvent, BakeId, BakeOutcome, Pathfinder};
pub use steering::{steer, Steering};
