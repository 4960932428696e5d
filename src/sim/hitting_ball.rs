//! Hitting ball
//!
//! Thrown at the opponent to stun them. When free it steers itself
//! according to a seeking mode that is re-rolled on arrival, on timeout,
//! after strikes and after drops.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::clock::MatchClock;
use super::field::wander_bounds;
use super::physics::{BodyDesc, PhysicsBackend};
use super::player::Player;
use super::possession::{self, BallCore, GrabbableBall, MovementContext, pin_to_holder};
use super::rng::SimRng;
use super::state::{PlayerId, Pose};
use crate::consts::*;
use crate::{angle_difference, bearing, heading};

/// Autonomous steering target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HittingBallMode {
    /// Wander toward a random point on the field
    Random,
    /// Chase whichever player is closer to the scoring ball
    SeekNearestBallHolder,
    /// Home in on one player; cannot be grabbed meanwhile
    SeekPlayer,
    SeekScoringBall,
    /// No steering
    Idle,
}

/// Periodic re-roll choices
const CHURN_MODES: [HittingBallMode; 2] = [
    HittingBallMode::Random,
    HittingBallMode::SeekNearestBallHolder,
];

#[derive(Debug, Clone)]
pub struct HittingBall {
    core: BallCore,
    start: Vec2,
    mode: HittingBallMode,
    /// Clock value at which the mode is re-rolled
    mode_expires_at: f32,
    /// Meaningful only in SeekPlayer
    target: Option<PlayerId>,
    /// Meaningful only in Random
    wander_point: Vec2,
    /// Last player to release this ball while it is still travelling fast
    recent_thrower: Option<PlayerId>,
    seeking_disabled: bool,
}

impl HittingBall {
    pub fn new(
        physics: &mut dyn PhysicsBackend,
        start: Vec2,
        seeking_disabled: bool,
        clock: &MatchClock,
        rng: &mut SimRng,
    ) -> Self {
        let desc = BodyDesc::dynamic_circle(HITTING_BALL_RADIUS, HITTING_BALL_MASS)
            .damping(HITTING_BALL_LINEAR_DAMPING)
            .restitution(HITTING_BALL_RESTITUTION)
            .at(start);
        let mut ball = Self {
            core: BallCore::new(physics, &desc, HITTING_BALL_GRAB_RANGE, HITTING_BALL_MAX_SPEED),
            start,
            mode: HittingBallMode::Idle,
            mode_expires_at: clock.remaining(),
            target: None,
            wander_point: start,
            recent_thrower: None,
            seeking_disabled,
        };
        ball.reset(physics, clock, rng);
        ball
    }

    pub fn mode(&self) -> HittingBallMode {
        self.mode
    }

    /// Player being homed in on (SeekPlayer only)
    pub fn target(&self) -> Option<PlayerId> {
        match self.mode {
            HittingBallMode::SeekPlayer => self.target,
            _ => None,
        }
    }

    pub fn mode_expires_at(&self) -> f32 {
        self.mode_expires_at
    }

    pub fn wander_point(&self) -> Vec2 {
        self.wander_point
    }

    pub fn recent_thrower(&self) -> Option<PlayerId> {
        self.recent_thrower
    }

    /// Back to the starting spot, wandering
    ///
    /// Possession must already be released.
    pub fn reset(&mut self, physics: &mut dyn PhysicsBackend, clock: &MatchClock, rng: &mut SimRng) {
        debug_assert!(!self.core.is_held(), "reset while held");
        physics.set_position(self.core.body, self.start);
        physics.set_linear_velocity(self.core.body, Vec2::ZERO);
        physics.set_angle(self.core.body, 0.0);
        physics.set_angular_velocity(self.core.body, 0.0);
        physics.set_sensor(self.core.body, false);
        self.recent_thrower = None;
        self.roll_mode(&[HittingBallMode::Random], clock, rng);
    }

    /// Pick a mode uniformly from `options` and schedule the next re-roll
    pub fn roll_mode(&mut self, options: &[HittingBallMode], clock: &MatchClock, rng: &mut SimRng) {
        let mode = if self.seeking_disabled {
            HittingBallMode::Idle
        } else {
            rng.pick(options).unwrap_or(HittingBallMode::Random)
        };
        let duration = rng.range(HITTING_BALL_MIN_MODE_TIME, HITTING_BALL_MAX_MODE_TIME);
        let (min, max) = wander_bounds();
        self.wander_point = rng.point_in(min, max);
        self.target = match mode {
            HittingBallMode::SeekPlayer => rng.pick(&PlayerId::ALL),
            _ => None,
        };
        self.enter(mode, clock.after(duration));
    }

    /// Force a mode for `duration` seconds
    pub fn set_mode(
        &mut self,
        mode: HittingBallMode,
        duration: f32,
        target: Option<PlayerId>,
        clock: &MatchClock,
    ) {
        let mode = if self.seeking_disabled {
            HittingBallMode::Idle
        } else {
            mode
        };
        self.target = target;
        self.enter(mode, clock.after(duration));
    }

    fn enter(&mut self, mode: HittingBallMode, expires_at: f32) {
        if mode != self.mode {
            log::debug!("Hitting ball mode {:?} -> {:?}", self.mode, mode);
        }
        self.mode = mode;
        self.mode_expires_at = expires_at;
    }

    /// Aim assist: home in on the opponent if the throw was roughly at them
    pub fn on_thrown(&mut self, thrower: PlayerId, thrower_pose: &Pose, opponent_position: Vec2, clock: &MatchClock) {
        self.recent_thrower = Some(thrower);
        let to_opponent = bearing(opponent_position - thrower_pose.position).unwrap_or(thrower_pose.angle);
        let error = angle_difference(thrower_pose.angle, to_opponent);
        if error.abs() < AIM_ASSIST_MAX_ANGLE {
            self.set_mode(
                HittingBallMode::SeekPlayer,
                AIM_ASSIST_SEEK_TIME,
                Some(thrower.opponent()),
                clock,
            );
        } else {
            self.set_mode(HittingBallMode::Idle, AIM_ASSIST_SEEK_TIME, None, clock);
        }
    }

    pub fn on_dropped(&mut self, holder: PlayerId, clock: &MatchClock, rng: &mut SimRng) {
        self.recent_thrower = Some(holder);
        self.roll_mode(&[HittingBallMode::Random], clock, rng);
    }

    pub fn on_grabbed(&mut self) {
        self.recent_thrower = None;
    }

    /// Struck a player hard enough to stun
    pub fn on_player_strike(&mut self, clock: &MatchClock, rng: &mut SimRng) {
        self.recent_thrower = None;
        self.roll_mode(&[HittingBallMode::Random], clock, rng);
    }

    /// Timed mode churn; also ends thrower immunity once the ball slows down
    pub fn update_mode_timer(&mut self, clock: &MatchClock, rng: &mut SimRng, physics: &dyn PhysicsBackend) {
        if self.recent_thrower.is_some()
            && physics.linear_velocity(self.core.body).length() < RECENT_PLAYER_THROW_MIN_SPEED
        {
            self.recent_thrower = None;
        }
        if clock.is_expired(self.mode_expires_at) {
            self.roll_mode(&CHURN_MODES, clock, rng);
        }
    }

    /// Base eligibility, minus the player this ball is homing in on
    pub fn eligible_holders(
        &self,
        players: &[Player],
        physics: &dyn PhysicsBackend,
        clock: &MatchClock,
    ) -> Vec<PlayerId> {
        let mut eligible = possession::eligible_holders(&self.core, players, physics, clock);
        if let Some(target) = self.target() {
            eligible.retain(|&p| p != target);
        }
        eligible
    }

    /// Direction to steer toward this tick, re-rolling on arrival
    fn steering_target(&mut self, position: Vec2, ctx: &mut MovementContext<'_>) -> Option<Vec2> {
        match self.mode {
            HittingBallMode::Random => {
                let delta = self.wander_point - position;
                if delta.length() <= self.core.radius {
                    self.roll_mode(&CHURN_MODES, ctx.clock, ctx.rng);
                    return None;
                }
                Some(delta)
            }
            HittingBallMode::SeekNearestBallHolder => {
                let ball = &ctx.scoring_ball;
                let gap = |p: &Pose| p.position.distance(ball.position) - p.radius - ball.radius;
                let [one, two] = &ctx.players;
                let nearest = if gap(two) < gap(one) { two } else { one };
                Some(nearest.position - position)
            }
            HittingBallMode::SeekPlayer => self
                .target
                .map(|target| ctx.players[target.index()].position - position),
            HittingBallMode::SeekScoringBall => {
                let ball = &ctx.scoring_ball;
                let delta = ball.position - position;
                if delta.length() - self.core.radius - ball.radius <= HITTING_BALL_SCORING_BALL_ARRIVAL {
                    self.roll_mode(&CHURN_MODES, ctx.clock, ctx.rng);
                    return None;
                }
                Some(delta)
            }
            HittingBallMode::Idle => None,
        }
    }
}

impl GrabbableBall for HittingBall {
    fn core(&self) -> &BallCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BallCore {
        &mut self.core
    }

    fn can_be_grabbed_by_state(&self) -> bool {
        self.mode != HittingBallMode::SeekPlayer
    }

    fn update_movement(&mut self, ctx: &mut MovementContext<'_>, physics: &mut dyn PhysicsBackend) {
        let body = self.core.body;
        if let Some(holder) = self.core.holder {
            pin_to_holder(&self.core, &ctx.players[holder.index()], physics);
            return;
        }

        let position = physics.position(body);
        if let Some(direction) = self
            .steering_target(position, ctx)
            .map(Vec2::normalize_or_zero)
            .filter(|d| *d != Vec2::ZERO)
        {
            physics.apply_force(body, direction * HITTING_BALL_SEEKING_FORCE);

            // Turn the heading toward the target at a bounded rate, keeping speed
            let velocity = physics.linear_velocity(body);
            if let (Some(current), Some(wanted)) = (bearing(velocity), bearing(direction)) {
                let max_turn = HITTING_BALL_TURN_SPEED * ctx.dt;
                let turned = current + angle_difference(wanted, current).clamp(-max_turn, max_turn);
                physics.set_linear_velocity(body, heading(turned) * velocity.length());
            }
        }

        let velocity = physics.linear_velocity(body);
        physics.set_linear_velocity(body, velocity.clamp_length_max(HITTING_BALL_MAX_SPEED));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ControlMode;
    use crate::sim::physics::ArenaWorld;

    fn setup(disabled: bool) -> (ArenaWorld, HittingBall, MatchClock, SimRng) {
        let mut world = ArenaWorld::new();
        let clock = MatchClock::new(100.0);
        let mut rng = SimRng::new(11);
        let ball = HittingBall::new(&mut world, Vec2::new(50.0, 12.5), disabled, &clock, &mut rng);
        (world, ball, clock, rng)
    }

    fn pose(x: f32, y: f32, angle: f32) -> Pose {
        Pose {
            position: Vec2::new(x, y),
            angle,
            radius: PLAYER_RADIUS,
        }
    }

    #[test]
    fn test_starts_wandering() {
        let (_world, ball, clock, _rng) = setup(false);
        assert_eq!(ball.mode(), HittingBallMode::Random);
        let ttl = clock.remaining() - ball.mode_expires_at();
        assert!((HITTING_BALL_MIN_MODE_TIME..=HITTING_BALL_MAX_MODE_TIME).contains(&ttl));
        let p = ball.wander_point();
        assert!((10.0..=90.0).contains(&p.x) && (1.0..=49.0).contains(&p.y));
    }

    #[test]
    fn test_disabled_seeking_stays_idle() {
        let (_world, mut ball, clock, mut rng) = setup(true);
        assert_eq!(ball.mode(), HittingBallMode::Idle);
        ball.roll_mode(&CHURN_MODES, &clock, &mut rng);
        assert_eq!(ball.mode(), HittingBallMode::Idle);
        ball.on_thrown(PlayerId::ONE, &pose(25.0, 25.0, 0.0), Vec2::new(75.0, 25.0), &clock);
        assert_eq!(ball.mode(), HittingBallMode::Idle);
    }

    #[test]
    fn test_aim_assist_on_good_throw() {
        let (_world, mut ball, clock, _rng) = setup(false);
        ball.on_thrown(PlayerId::ONE, &pose(25.0, 25.0, 0.3), Vec2::new(75.0, 25.0), &clock);
        assert_eq!(ball.mode(), HittingBallMode::SeekPlayer);
        assert_eq!(ball.target(), Some(PlayerId::TWO));
        assert_eq!(ball.recent_thrower(), Some(PlayerId::ONE));
        assert!(!ball.can_be_grabbed_by_state());
        assert!((ball.mode_expires_at() - clock.after(AIM_ASSIST_SEEK_TIME)).abs() < 1e-5);
    }

    #[test]
    fn test_wild_throw_goes_idle() {
        let (_world, mut ball, clock, _rng) = setup(false);
        ball.on_thrown(PlayerId::TWO, &pose(75.0, 25.0, 0.0), Vec2::new(25.0, 25.0), &clock);
        assert_eq!(ball.mode(), HittingBallMode::Idle);
        assert_eq!(ball.target(), None);
        assert!(ball.can_be_grabbed_by_state());
    }

    #[test]
    fn test_mode_times_out() {
        let (world, mut ball, mut clock, mut rng) = setup(false);
        let first_expiry = ball.mode_expires_at();
        clock.advance(HITTING_BALL_MAX_MODE_TIME + 0.01);
        ball.update_mode_timer(&clock, &mut rng, &world);
        assert!(clock.is_active(ball.mode_expires_at()), "re-rolled with a fresh timer");
        assert!(ball.mode_expires_at() < first_expiry);
        assert!(CHURN_MODES.contains(&ball.mode()));

        ball.set_mode(HittingBallMode::SeekScoringBall, 2.0, None, &clock);
        clock.advance(HITTING_BALL_MAX_MODE_TIME + 0.01);
        ball.update_mode_timer(&clock, &mut rng, &world);
        assert_ne!(ball.mode(), HittingBallMode::SeekScoringBall);
    }

    #[test]
    fn test_strike_and_drop_roll_random() {
        let (_world, mut ball, clock, mut rng) = setup(false);
        ball.set_mode(HittingBallMode::Idle, 2.0, None, &clock);
        ball.on_player_strike(&clock, &mut rng);
        assert_eq!(ball.mode(), HittingBallMode::Random);

        ball.set_mode(HittingBallMode::Idle, 2.0, None, &clock);
        ball.on_dropped(PlayerId::ONE, &clock, &mut rng);
        assert_eq!(ball.mode(), HittingBallMode::Random);
    }

    #[test]
    fn test_thrower_immunity_ends_when_slow() {
        let (mut world, mut ball, clock, mut rng) = setup(false);
        ball.on_thrown(PlayerId::ONE, &pose(25.0, 25.0, 0.0), Vec2::new(75.0, 25.0), &clock);
        world.set_linear_velocity(ball.core().body(), Vec2::new(30.0, 0.0));
        ball.update_mode_timer(&clock, &mut rng, &world);
        assert_eq!(ball.recent_thrower(), Some(PlayerId::ONE));

        world.set_linear_velocity(ball.core().body(), Vec2::new(5.0, 0.0));
        ball.update_mode_timer(&clock, &mut rng, &world);
        assert_eq!(ball.recent_thrower(), None);
    }

    #[test]
    fn test_seek_player_excludes_target_from_eligible() {
        let (mut world, mut ball, clock, _rng) = setup(false);
        let players = vec![
            Player::new(PlayerId::ONE, ControlMode::Human, &mut world, &clock),
            Player::new(PlayerId::TWO, ControlMode::Human, &mut world, &clock),
        ];
        world.set_position(players[0].body(), Vec2::new(50.0, 15.0));
        world.set_position(players[1].body(), Vec2::new(50.0, 10.0));
        assert_eq!(
            ball.eligible_holders(&players, &world, &clock),
            vec![PlayerId::ONE, PlayerId::TWO]
        );

        ball.set_mode(HittingBallMode::SeekPlayer, 1.0, Some(PlayerId::TWO), &clock);
        assert_eq!(ball.eligible_holders(&players, &world, &clock), vec![PlayerId::ONE]);
    }

    #[test]
    fn test_steering_turn_rate_and_speed_cap() {
        let (mut world, mut ball, clock, mut rng) = setup(false);
        let body = ball.core().body();
        world.set_position(body, Vec2::new(50.0, 25.0));
        world.set_linear_velocity(body, Vec2::new(0.0, 50.0));
        ball.set_mode(HittingBallMode::SeekPlayer, 1.0, Some(PlayerId::TWO), &clock);

        let mut ctx = MovementContext {
            dt: SIM_DT,
            clock: &clock,
            players: [pose(25.0, 25.0, 0.0), pose(75.0, 25.0, 0.0)],
            scoring_ball: Pose {
                position: Vec2::new(50.0, 40.0),
                angle: 0.0,
                radius: SCORING_BALL_RADIUS,
            },
            rng: &mut rng,
        };
        ball.update_movement(&mut ctx, &mut world);

        let v = world.linear_velocity(body);
        assert!((v.length() - HITTING_BALL_MAX_SPEED).abs() < 1e-3);
        // Heading moved toward +x by at most one tick of turn rate
        let turned = std::f32::consts::FRAC_PI_2 - bearing(v).unwrap_or(0.0);
        assert!((turned - HITTING_BALL_TURN_SPEED * SIM_DT).abs() < 1e-4);
    }

    #[test]
    fn test_scoring_ball_arrival_rerolls() {
        let (mut world, mut ball, clock, mut rng) = setup(false);
        let body = ball.core().body();
        world.set_position(body, Vec2::new(50.0, 25.0));
        ball.set_mode(HittingBallMode::SeekScoringBall, 3.0, None, &clock);

        let mut ctx = MovementContext {
            dt: SIM_DT,
            clock: &clock,
            players: [pose(25.0, 25.0, 0.0), pose(75.0, 25.0, 0.0)],
            scoring_ball: Pose {
                position: Vec2::new(51.8, 25.0),
                angle: 0.0,
                radius: SCORING_BALL_RADIUS,
            },
            rng: &mut rng,
        };
        ball.update_movement(&mut ctx, &mut world);
        assert!(CHURN_MODES.contains(&ball.mode()));
    }

    fn movement_ctx<'a>(clock: &'a MatchClock, rng: &'a mut SimRng, scoring_ball: Vec2) -> MovementContext<'a> {
        MovementContext {
            dt: SIM_DT,
            clock,
            players: [pose(25.0, 25.0, 0.0), pose(75.0, 25.0, 0.0)],
            scoring_ball: Pose {
                position: scoring_ball,
                angle: 0.0,
                radius: SCORING_BALL_RADIUS,
            },
            rng,
        }
    }

    #[test]
    fn test_wander_point_arrival_rerolls() {
        let (mut world, mut ball, clock, mut rng) = setup(false);
        let body = ball.core().body();
        assert_eq!(ball.mode(), HittingBallMode::Random);
        let reached = ball.wander_point();
        world.set_position(body, reached + Vec2::new(0.5, 0.0));

        let mut ctx = movement_ctx(&clock, &mut rng, Vec2::new(50.0, 40.0));
        ball.update_movement(&mut ctx, &mut world);

        assert_ne!(ball.wander_point(), reached);
        assert!(CHURN_MODES.contains(&ball.mode()));
        assert!(clock.is_active(ball.mode_expires_at()));
        // No steering on the arrival tick
        world.step(SIM_DT, &mut crate::sim::physics::NoContacts);
        assert_eq!(world.linear_velocity(body), Vec2::ZERO);
    }

    #[test]
    fn test_seek_nearest_holder_ignores_target() {
        for (scoring_ball, toward_positive_x) in [(Vec2::new(70.0, 25.0), true), (Vec2::new(30.0, 25.0), false)] {
            let (mut world, mut ball, clock, mut rng) = setup(false);
            let body = ball.core().body();
            world.set_position(body, Vec2::new(50.0, 25.0));
            world.set_linear_velocity(body, Vec2::new(0.0, 10.0));
            // A stale target must not matter outside SeekPlayer
            let stale = if toward_positive_x { PlayerId::ONE } else { PlayerId::TWO };
            ball.set_mode(HittingBallMode::SeekNearestBallHolder, 3.0, Some(stale), &clock);

            let mut ctx = movement_ctx(&clock, &mut rng, scoring_ball);
            ball.update_movement(&mut ctx, &mut world);

            let v = world.linear_velocity(body);
            assert_eq!(v.x > 0.0, toward_positive_x, "velocity {v}");
            assert!((v.length() - 10.0).abs() < 1e-3);
            assert_eq!(ball.mode(), HittingBallMode::SeekNearestBallHolder);
        }
    }
}
