//! Field layout
//!
//! Static geometry (walls, goal posts, goal sensors) and the fixed
//! starting positions of every entity.

use std::f32::consts::PI;

use glam::Vec2;

use super::physics::{BodyDesc, BodyHandle, PhysicsBackend};
use super::state::PlayerId;
use crate::consts::*;

/// Distance of the goal rows from the side lines
const GOAL_ROW_OFFSET: f32 =
    GOAL_WIDTH / 2.0 + FIELD_LINE_WIDTH + 2.0 * GOAL_POST_RADIUS + 2.0 * SCORING_BALL_RADIUS;

/// Goal sensor strip thickness
const GOAL_SENSOR_WIDTH: f32 = GOAL_POST_RADIUS / 2.0;

pub fn field_center() -> Vec2 {
    Vec2::new(FIELD_WIDTH / 2.0, FIELD_HEIGHT / 2.0)
}

/// Starting position and facing for a player
pub fn starting_pose(player: PlayerId) -> (Vec2, f32) {
    match player.index() {
        0 => (Vec2::new(FIELD_WIDTH / 4.0, FIELD_HEIGHT / 2.0), 0.0),
        _ => (Vec2::new(FIELD_WIDTH * 3.0 / 4.0, FIELD_HEIGHT / 2.0), PI),
    }
}

/// Starting positions of the hitting balls, one per ball
pub fn hitting_ball_starts() -> [Vec2; 2] {
    [
        Vec2::new(FIELD_WIDTH / 2.0, FIELD_HEIGHT / 4.0),
        Vec2::new(FIELD_WIDTH / 2.0, FIELD_HEIGHT * 3.0 / 4.0),
    ]
}

/// Rectangle hitting balls pick wander points from
pub fn wander_bounds() -> (Vec2, Vec2) {
    (
        Vec2::new(FIELD_WIDTH / 10.0, FIELD_LINE_WIDTH),
        Vec2::new(FIELD_WIDTH * 9.0 / 10.0, FIELD_HEIGHT - FIELD_LINE_WIDTH),
    )
}

#[derive(Debug, Clone)]
pub struct Goal {
    /// Midpoint between the posts
    pub center: Vec2,
    /// Player credited when the scoring ball enters
    pub credits: PlayerId,
    pub posts: [BodyHandle; 2],
    pub sensor: BodyHandle,
}

impl Goal {
    fn build(physics: &mut dyn PhysicsBackend, center: Vec2, credits: PlayerId) -> Self {
        let half_gap = Vec2::new(0.0, GOAL_WIDTH / 2.0);
        let posts = [
            Self::post(physics, center + half_gap),
            Self::post(physics, center - half_gap),
        ];
        let sensor = physics.create_body(
            &BodyDesc::static_box(Vec2::new(GOAL_SENSOR_WIDTH / 2.0, GOAL_WIDTH / 2.0), center)
                .sensor(),
        );
        Self {
            center,
            credits,
            posts,
            sensor,
        }
    }

    fn post(physics: &mut dyn PhysicsBackend, at: Vec2) -> BodyHandle {
        physics.create_body(
            &BodyDesc::static_circle(GOAL_POST_RADIUS, at).restitution(GOAL_POST_RESTITUTION),
        )
    }
}

/// Walls and goals, created once per match
#[derive(Debug, Clone)]
pub struct Field {
    pub walls: [BodyHandle; 4],
    pub goals: Vec<Goal>,
}

impl Field {
    pub fn build(physics: &mut dyn PhysicsBackend) -> Self {
        let half = WALL_THICKNESS / 2.0;
        let inner_min = Vec2::splat(FIELD_LINE_WIDTH);
        let inner_max = Vec2::new(FIELD_WIDTH, FIELD_HEIGHT) - FIELD_LINE_WIDTH;
        // Long enough to close the corners
        let vertical = Vec2::new(half, FIELD_HEIGHT / 2.0 + WALL_THICKNESS);
        let horizontal = Vec2::new(FIELD_WIDTH / 2.0 + WALL_THICKNESS, half);

        let mut wall = |extents: Vec2, at: Vec2| {
            physics.create_body(&BodyDesc::static_box(extents, at).restitution(WALL_RESTITUTION))
        };
        let walls = [
            wall(vertical, Vec2::new(inner_min.x - half, FIELD_HEIGHT / 2.0)),
            wall(vertical, Vec2::new(inner_max.x + half, FIELD_HEIGHT / 2.0)),
            wall(horizontal, Vec2::new(FIELD_WIDTH / 2.0, inner_min.y - half)),
            wall(horizontal, Vec2::new(FIELD_WIDTH / 2.0, inner_max.y + half)),
        ];

        // Goals on the left credit player 2, goals on the right player 1
        let rows = [
            GOAL_ROW_OFFSET,
            FIELD_HEIGHT / 2.0,
            FIELD_HEIGHT - GOAL_ROW_OFFSET,
        ];
        let mut goals = Vec::with_capacity(rows.len() * 2);
        for y in rows {
            goals.push(Goal::build(physics, Vec2::new(FIELD_WIDTH * 0.15, y), PlayerId::TWO));
            goals.push(Goal::build(physics, Vec2::new(FIELD_WIDTH * 0.85, y), PlayerId::ONE));
        }

        Self { walls, goals }
    }

    /// Goals this player scores in
    pub fn target_goals(&self, player: PlayerId) -> impl Iterator<Item = &Goal> {
        self.goals.iter().filter(move |g| g.credits == player)
    }
}
