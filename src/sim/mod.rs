//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by player, then ball precedence)
//! - Contact effects applied one tick after the physics step that caused them

pub mod clock;
pub mod collision;
pub mod contact;
pub mod controller;
pub mod field;
pub mod hitting_ball;
pub mod physics;
pub mod player;
pub mod possession;
pub mod rapier_world;
pub mod rng;
pub mod scoring_ball;
pub mod state;
pub mod tick;

pub use clock::MatchClock;
pub use collision::CollisionResult;
pub use contact::{BodyRole, ContactEffect, ContactResolver};
pub use controller::{ControllerView, CpuController};
pub use field::{Field, Goal};
pub use hitting_ball::{HittingBall, HittingBallMode};
pub use physics::{ArenaWorld, BodyDesc, BodyHandle, Contact, ContactListener, PhysicsBackend};
pub use player::{GrabAction, Player};
pub use possession::{BallCore, GrabbableBall, MovementContext};
pub use rapier_world::RapierWorld;
pub use rng::SimRng;
pub use scoring_ball::ScoringBall;
pub use state::{BallId, BallView, Intent, MatchSnapshot, PlayerId, PlayerView, Pose};
pub use tick::{Balls, Match};
