//! Scoring ball
//!
//! Delivered into a goal to score. Follows its holder while held and
//! returns to the field center after a goal.

use glam::Vec2;

use super::field::field_center;
use super::physics::{BodyDesc, PhysicsBackend};
use super::possession::{BallCore, GrabbableBall, MovementContext, pin_to_holder};
use crate::consts::*;

#[derive(Debug, Clone)]
pub struct ScoringBall {
    core: BallCore,
    entered_goal: bool,
}

impl ScoringBall {
    pub fn new(physics: &mut dyn PhysicsBackend) -> Self {
        let desc = BodyDesc::dynamic_circle(SCORING_BALL_RADIUS, SCORING_BALL_MASS)
            .damping(SCORING_BALL_LINEAR_DAMPING)
            .restitution(SCORING_BALL_RESTITUTION)
            .at(field_center());
        Self {
            core: BallCore::new(
                physics,
                &desc,
                SCORING_BALL_GRAB_RANGE,
                SCORING_BALL_THROW_SPEED,
            ),
            entered_goal: false,
        }
    }

    /// Back to the center, at rest
    ///
    /// Possession must already be released.
    pub fn reset(&mut self, physics: &mut dyn PhysicsBackend) {
        debug_assert!(!self.core.is_held(), "reset while held");
        physics.set_position(self.core.body, field_center());
        physics.set_linear_velocity(self.core.body, Vec2::ZERO);
        physics.set_angle(self.core.body, 0.0);
        physics.set_angular_velocity(self.core.body, 0.0);
        physics.set_sensor(self.core.body, false);
        self.entered_goal = false;
    }

    /// Flag a goal; the ball resets on its next movement update
    pub fn mark_entered_goal(&mut self) {
        self.entered_goal = true;
    }

    pub fn entered_goal(&self) -> bool {
        self.entered_goal
    }
}

impl GrabbableBall for ScoringBall {
    fn core(&self) -> &BallCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BallCore {
        &mut self.core
    }

    fn update_movement(&mut self, ctx: &mut MovementContext<'_>, physics: &mut dyn PhysicsBackend) {
        if let Some(holder) = self.core.holder {
            pin_to_holder(&self.core, &ctx.players[holder.index()], physics);
        }
    }
}
