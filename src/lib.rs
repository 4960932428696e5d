//! Arenaball - a two-player arena ball sport
//!
//! Core modules:
//! - `sim`: Per-tick simulation core (possession, seeking balls, contacts, controllers)
//! - `settings`: Match configuration loaded from JSON
//! - `error`: Configuration errors

pub mod error;
pub mod settings;
pub mod sim;

pub use error::{ConfigError, InvalidPlayerId};
pub use settings::{ControlMode, MatchSettings, PlayerSetup};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    use std::f32::consts::PI;

    /// Logic ticks per second
    pub const FPS: f32 = 60.0;
    /// Fixed simulation timestep
    pub const SIM_DT: f32 = 1.0 / FPS;

    /// Field dimensions (meters)
    pub const FIELD_WIDTH: f32 = 100.0;
    pub const FIELD_HEIGHT: f32 = 50.0;
    pub const FIELD_LINE_WIDTH: f32 = 1.0;
    pub const WALL_THICKNESS: f32 = 10.0;
    pub const WALL_RESTITUTION: f32 = 0.5;

    /// Default match length in seconds
    pub const MATCH_DURATION_SECS: f32 = 200.0;

    /// Player body
    pub const PLAYER_RADIUS: f32 = 1.0;
    pub const PLAYER_MASS: f32 = 1.0;
    pub const PLAYER_LINEAR_DAMPING: f32 = 0.5;
    pub const PLAYER_RESTITUTION: f32 = 0.5;
    /// Forward speed caps (m/s), lower while carrying a ball
    pub const MAX_FORWARD_PLAYER_SPEED: f32 = 20.0;
    pub const MAX_FORWARD_PLAYER_SPEED_WITH_BALL: f32 = 16.0;
    pub const MAX_BACKWARD_PLAYER_SPEED: f32 = 5.0;
    /// Thrust (newtons)
    pub const PLAYER_FORWARD_FORCE: f32 = 30.0;
    pub const PLAYER_BACKWARD_FORCE: f32 = 35.0;
    /// Turning sets angular velocity directly (rad/s)
    pub const PLAYER_TURNING_SPEED: f32 = PI;

    /// Cooldowns (seconds of match clock)
    pub const PLAYER_GRAB_DELAY: f32 = 0.25;
    pub const PLAYER_THROW_DELAY: f32 = 0.75;
    pub const PLAYER_DROP_PENALTY: f32 = 0.75;

    /// Stun
    pub const PLAYER_STUN_DURATION: f32 = 1.0;
    pub const PLAYER_STUN_ROTATIONS: f32 = 4.0;
    /// Velocity nudge applied along the contact normal on generic contact
    pub const PLAYER_CONTACT_BUMPER_VELOCITY: f32 = 1.0;

    /// Fraction of holder velocity a dropped ball keeps
    pub const BALL_DROP_VELOCITY_FRACTION: f32 = 0.25;
    /// Gap between thrower surface and ball surface at release
    pub const THROW_DISTANCE_FROM_PLAYER: f32 = 0.1;

    /// Scoring ball
    pub const SCORING_BALL_RADIUS: f32 = 0.5;
    pub const SCORING_BALL_MASS: f32 = 0.1;
    pub const SCORING_BALL_LINEAR_DAMPING: f32 = 2.0;
    pub const SCORING_BALL_RESTITUTION: f32 = 0.1;
    pub const SCORING_BALL_THROW_SPEED: f32 = 40.0;
    pub const SCORING_BALL_GRAB_RANGE: f32 = 2.0;
    pub const SCORING_BALL_SCORE: u32 = 10;

    /// Hitting ball
    pub const HITTING_BALL_RADIUS: f32 = 1.25;
    pub const HITTING_BALL_MASS: f32 = 2.0;
    pub const HITTING_BALL_LINEAR_DAMPING: f32 = 0.5;
    pub const HITTING_BALL_RESTITUTION: f32 = 0.1;
    pub const HITTING_BALL_MAX_SPEED: f32 = 40.0;
    pub const HITTING_BALL_GRAB_RANGE: f32 = 2.0;
    pub const HITTING_BALL_MIN_COLLISION_SPEED: f32 = 1.0;
    pub const HITTING_BALL_SEEKING_FORCE: f32 = 60.0;
    pub const HITTING_BALL_TURN_SPEED: f32 = PI;
    pub const HITTING_BALL_MIN_MODE_TIME: f32 = 1.0;
    pub const HITTING_BALL_MAX_MODE_TIME: f32 = 3.0;
    pub const HITTING_BALL_SCORING_BALL_ARRIVAL: f32 = 0.1;
    /// Below this speed a thrown hitting ball no longer counts as recently thrown
    pub const RECENT_PLAYER_THROW_MIN_SPEED: f32 = 20.0;

    /// Aim assist
    pub const AIM_ASSIST_SEEK_TIME: f32 = 1.5;
    pub const AIM_ASSIST_MAX_ANGLE: f32 = 45.0 * PI / 180.0;

    /// Goals
    pub const GOAL_WIDTH: f32 = 5.0;
    pub const GOAL_POST_RADIUS: f32 = 0.5;
    pub const GOAL_POST_RESTITUTION: f32 = 0.5;

    /// Built-in controller
    pub const MAX_CPU_LEVEL: u8 = 10;
    pub const MIN_CPU_NOISE_INTERVAL: f32 = 1.0;
    pub const MAX_CPU_NOISE_INTERVAL: f32 = 2.0;
    pub const MAX_POSITIONAL_NOISE_STD: f32 = 5.0;
}

/// Signed difference `a - b` wrapped to [-π, π]
#[inline]
pub fn angle_difference(a: f32, b: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    let mut diff = a - b;
    while diff > PI {
        diff -= TAU;
    }
    while diff < -PI {
        diff += TAU;
    }
    diff
}

/// Unit vector for a heading angle
#[inline]
pub fn heading(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Heading angle of a vector, or `None` for a zero vector
#[inline]
pub fn bearing(v: Vec2) -> Option<f32> {
    if v.length_squared() <= f32::EPSILON {
        None
    } else {
        Some(v.y.atan2(v.x))
    }
}
