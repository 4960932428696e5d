//! Player state machine
//!
//! A player is Normal or Stunned. Stun, cooldowns and held-ball state are
//! all measured against the match clock; movement is applied to the
//! player's physics body once per tick.

use std::f32::consts::TAU;

use glam::Vec2;

use super::clock::MatchClock;
use super::field::starting_pose;
use super::physics::{BodyDesc, BodyHandle, PhysicsBackend};
use super::state::{BallId, Intent, PlayerId, Pose};
use crate::consts::*;
use crate::settings::ControlMode;
use crate::{bearing, heading};

/// What the grab button asks for this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabAction {
    None,
    /// Try balls in precedence order
    Grab,
    Throw,
}

#[derive(Debug, Clone)]
pub struct Player {
    id: PlayerId,
    control: ControlMode,
    body: BodyHandle,
    radius: f32,
    score: u32,
    pub(crate) held: Option<BallId>,
    /// Clock value at which the stun wears off
    stunned_until: f32,
    /// Clock value before which grab/throw is disallowed
    next_action_at: f32,
    pending_stun: bool,
    /// Sum of bump normals received since the last tick
    pending_bump: Option<Vec2>,
    intent: Intent,
}

impl Player {
    pub fn new(
        id: PlayerId,
        control: ControlMode,
        physics: &mut dyn PhysicsBackend,
        clock: &MatchClock,
    ) -> Self {
        let desc = BodyDesc::dynamic_circle(PLAYER_RADIUS, PLAYER_MASS)
            .damping(PLAYER_LINEAR_DAMPING)
            .restitution(PLAYER_RESTITUTION);
        let body = physics.create_body(&desc);
        let mut player = Self {
            id,
            control,
            body,
            radius: PLAYER_RADIUS,
            score: 0,
            held: None,
            stunned_until: clock.remaining(),
            next_action_at: clock.remaining(),
            pending_stun: false,
            pending_bump: None,
            intent: Intent::default(),
        };
        player.reset(physics, clock);
        player
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn control(&self) -> ControlMode {
        self.control
    }

    pub fn body(&self) -> BodyHandle {
        self.body
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn held(&self) -> Option<BallId> {
        self.held
    }

    pub fn next_action_at(&self) -> f32 {
        self.next_action_at
    }

    pub fn intent(&self) -> Intent {
        self.intent
    }

    pub fn set_intent(&mut self, intent: Intent) {
        self.intent = intent;
    }

    pub fn pose(&self, physics: &dyn PhysicsBackend) -> Pose {
        Pose {
            position: physics.position(self.body),
            angle: physics.angle(self.body),
            radius: self.radius,
        }
    }

    pub fn is_stunned(&self, clock: &MatchClock) -> bool {
        clock.is_active(self.stunned_until)
    }

    /// Free to grab or throw
    pub fn can_act(&self, clock: &MatchClock) -> bool {
        !self.is_stunned(clock) && clock.is_expired(self.next_action_at)
    }

    /// Block grab/throw for `delay` seconds, never shortening a running cooldown
    pub fn extend_cooldown(&mut self, clock: &MatchClock, delay: f32) {
        self.next_action_at = self.next_action_at.min(clock.after(delay));
    }

    pub(crate) fn add_score(&mut self, points: u32) {
        self.score += points;
    }

    pub(crate) fn flag_stun(&mut self) {
        self.pending_stun = true;
    }

    pub(crate) fn flag_bump(&mut self, normal: Vec2) {
        *self.pending_bump.get_or_insert(Vec2::ZERO) += normal;
    }

    /// Consume stun and bump flags set by the contact resolver
    ///
    /// Returns true when the held ball must be dropped.
    pub fn apply_pending_effects(
        &mut self,
        physics: &mut dyn PhysicsBackend,
        clock: &MatchClock,
    ) -> bool {
        let mut must_drop = false;

        if std::mem::take(&mut self.pending_stun) {
            self.stunned_until = self.stunned_until.min(clock.after(PLAYER_STUN_DURATION));
            physics.set_angular_velocity(
                self.body,
                TAU * PLAYER_STUN_ROTATIONS / PLAYER_STUN_DURATION,
            );
            must_drop = true;
            log::debug!("Player {} stunned", self.id.side());
        }

        if let Some(normal) = self.pending_bump.take() {
            let velocity =
                physics.linear_velocity(self.body) + normal.normalize_or_zero() * PLAYER_CONTACT_BUMPER_VELOCITY;
            physics.set_linear_velocity(self.body, velocity);
            if let Some(angle) = bearing(velocity) {
                physics.set_angle(self.body, angle);
            }
            must_drop = true;
        }

        must_drop && self.held.is_some()
    }

    /// Edge-triggered grab/throw against the cooldown
    pub fn grab_action(&self, clock: &MatchClock) -> GrabAction {
        match (self.intent.grab, self.held) {
            (true, None) if self.can_act(clock) => GrabAction::Grab,
            (false, Some(_)) => GrabAction::Throw,
            _ => GrabAction::None,
        }
    }

    /// Push intent into the physics body and clamp speed
    pub fn apply_movement(&self, physics: &mut dyn PhysicsBackend, clock: &MatchClock) {
        let max_forward = if self.held.is_some() {
            MAX_FORWARD_PLAYER_SPEED_WITH_BALL
        } else {
            MAX_FORWARD_PLAYER_SPEED
        };

        if self.is_stunned(clock) {
            // Still slides, just not faster than the cap
            let velocity = physics.linear_velocity(self.body);
            physics.set_linear_velocity(self.body, velocity.clamp_length_max(max_forward));
            return;
        }

        let facing = heading(physics.angle(self.body));
        if self.intent.forward {
            physics.apply_force(self.body, facing * PLAYER_FORWARD_FORCE);
        }
        if self.intent.backward {
            physics.apply_force(self.body, -facing * PLAYER_BACKWARD_FORCE);
        }

        let omega = if self.intent.turn_left {
            PLAYER_TURNING_SPEED
        } else if self.intent.turn_right {
            -PLAYER_TURNING_SPEED
        } else {
            0.0
        };
        physics.set_angular_velocity(self.body, omega);

        // No sideways drift: keep only the component along the facing
        let speed = physics
            .linear_velocity(self.body)
            .dot(facing)
            .clamp(-MAX_BACKWARD_PLAYER_SPEED, max_forward);
        physics.set_linear_velocity(self.body, facing * speed);
    }

    /// Back to the starting pose with all timers cleared
    ///
    /// The caller releases any held ball first.
    pub fn reset(&mut self, physics: &mut dyn PhysicsBackend, clock: &MatchClock) {
        debug_assert!(self.held.is_none(), "reset while holding a ball");
        let (position, angle) = starting_pose(self.id);
        physics.set_position(self.body, position);
        physics.set_angle(self.body, angle);
        physics.set_linear_velocity(self.body, Vec2::ZERO);
        physics.set_angular_velocity(self.body, 0.0);

        self.score = 0;
        self.stunned_until = clock.remaining();
        self.next_action_at = clock.remaining();
        self.pending_stun = false;
        self.pending_bump = None;
        self.intent = Intent::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::physics::{ArenaWorld, NoContacts};

    fn setup() -> (ArenaWorld, Player, MatchClock) {
        let mut world = ArenaWorld::new();
        let clock = MatchClock::new(100.0);
        let player = Player::new(PlayerId::ONE, ControlMode::Human, &mut world, &clock);
        (world, player, clock)
    }

    #[test]
    fn test_fresh_player_can_act() {
        let (_world, player, clock) = setup();
        assert!(!player.is_stunned(&clock));
        assert!(player.can_act(&clock));
    }

    #[test]
    fn test_cooldown_never_shortened() {
        let (_world, mut player, mut clock) = setup();
        player.extend_cooldown(&clock, PLAYER_THROW_DELAY);
        let long = player.next_action_at();

        clock.advance(0.1);
        player.extend_cooldown(&clock, PLAYER_GRAB_DELAY);
        assert_eq!(player.next_action_at(), long);

        clock.advance(0.7);
        assert!(player.can_act(&clock));
    }

    #[test]
    fn test_stun_blocks_actions_and_spins() {
        let (mut world, mut player, mut clock) = setup();
        player.flag_stun();
        assert!(!player.apply_pending_effects(&mut world, &clock), "nothing held");
        assert!(player.is_stunned(&clock));
        assert!(!player.can_act(&clock));
        assert!((world.angular_velocity(player.body()) - TAU * 4.0).abs() < 1e-4);

        clock.advance(PLAYER_STUN_DURATION);
        assert!(!player.is_stunned(&clock));
    }

    #[test]
    fn test_stunned_player_ignores_intent_but_is_clamped() {
        let (mut world, mut player, clock) = setup();
        player.flag_stun();
        player.apply_pending_effects(&mut world, &clock);
        player.set_intent(Intent {
            forward: true,
            turn_left: true,
            ..Default::default()
        });
        world.set_linear_velocity(player.body(), Vec2::new(0.0, 30.0));

        player.apply_movement(&mut world, &clock);
        let v = world.linear_velocity(player.body());
        assert!((v - Vec2::new(0.0, MAX_FORWARD_PLAYER_SPEED)).length() < 1e-4);
        // Stun spin left untouched
        assert!(world.angular_velocity(player.body()) > PLAYER_TURNING_SPEED);
    }

    #[test]
    fn test_movement_follows_facing() {
        let (mut world, mut player, clock) = setup();
        player.set_intent(Intent {
            forward: true,
            turn_right: true,
            ..Default::default()
        });
        world.set_linear_velocity(player.body(), Vec2::new(0.0, 3.0));
        player.apply_movement(&mut world, &clock);
        // Sideways velocity removed, turning set directly
        assert_eq!(world.linear_velocity(player.body()), Vec2::ZERO);
        assert_eq!(world.angular_velocity(player.body()), -PLAYER_TURNING_SPEED);

        for _ in 0..120 {
            world.step(SIM_DT, &mut NoContacts);
            player.apply_movement(&mut world, &clock);
        }
        let speed = world.linear_velocity(player.body()).length();
        assert!(speed <= MAX_FORWARD_PLAYER_SPEED + 1e-3);
        assert!(speed > 1.0);
    }

    #[test]
    fn test_backward_speed_capped() {
        let (mut world, mut player, clock) = setup();
        world.set_linear_velocity(player.body(), Vec2::new(-12.0, 0.0));
        player.apply_movement(&mut world, &clock);
        assert_eq!(
            world.linear_velocity(player.body()),
            Vec2::new(-MAX_BACKWARD_PLAYER_SPEED, 0.0)
        );
    }

    #[test]
    fn test_bump_reorients_to_velocity() {
        let (mut world, mut player, clock) = setup();
        player.held = Some(BallId::Scoring);
        player.flag_bump(Vec2::new(0.0, 2.0));
        assert!(player.apply_pending_effects(&mut world, &clock), "bump drops the ball");
        let v = world.linear_velocity(player.body());
        assert!((v - Vec2::new(0.0, PLAYER_CONTACT_BUMPER_VELOCITY)).length() < 1e-6);
        assert!((world.angle(player.body()) - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn test_zero_bump_keeps_heading() {
        let (mut world, mut player, clock) = setup();
        player.flag_bump(Vec2::ZERO);
        player.apply_pending_effects(&mut world, &clock);
        assert_eq!(world.angle(player.body()), 0.0);
    }

    #[test]
    fn test_grab_action_edges() {
        let (_world, mut player, clock) = setup();
        assert_eq!(player.grab_action(&clock), GrabAction::None);

        player.set_intent(Intent {
            grab: true,
            ..Default::default()
        });
        assert_eq!(player.grab_action(&clock), GrabAction::Grab);

        player.held = Some(BallId::Hitting(0));
        assert_eq!(player.grab_action(&clock), GrabAction::None);

        player.set_intent(Intent::default());
        assert_eq!(player.grab_action(&clock), GrabAction::Throw);
    }
}
