//! Built-in player controller
//!
//! Chooses a target (opponent, goal, or a ball), then steers toward it the
//! way a human would with the same intent flags. Lower difficulty adds
//! Gaussian noise to where the controller thinks it and its target are.

use glam::Vec2;

use super::clock::MatchClock;
use super::rng::SimRng;
use super::state::{BallId, Intent};
use crate::consts::*;
use crate::{angle_difference, bearing};

const DEG: f32 = std::f32::consts::PI / 180.0;

/// Release the hitting ball when aimed within this cone and range
const HITTING_THROW_CONE: f32 = 45.0 * DEG;
const HITTING_THROW_RANGE: f32 = 50.0;
/// Release the scoring ball when aimed within this cone and range
const SCORING_THROW_CONE: f32 = 5.0 * DEG;
const SCORING_THROW_RANGE: f32 = 15.0;

const TURN_DEADBAND: f32 = 1.0 * DEG;
const FORWARD_CONE: f32 = 75.0 * DEG;
const REVERSE_CONE: f32 = 145.0 * DEG;
/// When carrying, stop short of the target
const CARRY_STANDOFF: f32 = 5.0;

/// What the controller can see this tick
#[derive(Debug, Clone)]
pub struct ControllerView {
    pub position: Vec2,
    pub angle: f32,
    pub holding: Option<BallId>,
    pub opponent_position: Vec2,
    pub opponent_stunned: bool,
    pub scoring_ball: Vec2,
    pub hitting_balls: Vec<Vec2>,
    /// Centers of the goals this player scores in
    pub target_goals: Vec<Vec2>,
}

#[derive(Debug, Clone)]
pub struct CpuController {
    /// 0 (noisiest) to 1 (exact)
    difficulty: f32,
    next_noise_at: f32,
    self_noise: Vec2,
    target_noise: Vec2,
}

impl CpuController {
    pub fn new(difficulty: f32, clock: &MatchClock, rng: &mut SimRng) -> Self {
        let mut controller = Self {
            difficulty: difficulty.clamp(0.0, 1.0),
            next_noise_at: clock.remaining(),
            self_noise: Vec2::ZERO,
            target_noise: Vec2::ZERO,
        };
        controller.roll_noise(clock, rng);
        controller
    }

    pub fn difficulty(&self) -> f32 {
        self.difficulty
    }

    fn roll_noise(&mut self, clock: &MatchClock, rng: &mut SimRng) {
        let std_dev = MAX_POSITIONAL_NOISE_STD * (1.0 - self.difficulty);
        self.next_noise_at = clock.after(rng.range(MIN_CPU_NOISE_INTERVAL, MAX_CPU_NOISE_INTERVAL));
        self.self_noise = Vec2::new(rng.normal(std_dev), rng.normal(std_dev));
        self.target_noise = Vec2::new(rng.normal(std_dev), rng.normal(std_dev));
        log::trace!("Controller noise re-rolled (std {std_dev:.2})");
    }

    /// Intent for this tick
    pub fn decide(&mut self, view: &ControllerView, clock: &MatchClock, rng: &mut SimRng) -> Intent {
        if clock.is_expired(self.next_noise_at) {
            self.roll_noise(clock, rng);
        }

        let me = view.position + self.self_noise;
        let target = self.choose_target(view, me) + self.target_noise;
        let to_target = target - me;
        let distance = to_target.length();
        let error = bearing(to_target)
            .map(|b| angle_difference(b, view.angle))
            .unwrap_or(0.0);

        let release = match view.holding {
            Some(BallId::Hitting(_)) => {
                error.abs() < HITTING_THROW_CONE && distance < HITTING_THROW_RANGE
            }
            Some(BallId::Scoring) => error.abs() < SCORING_THROW_CONE && distance < SCORING_THROW_RANGE,
            None => false,
        };

        let may_drive = distance > CARRY_STANDOFF || view.holding.is_none();
        Intent {
            turn_left: error > TURN_DEADBAND,
            turn_right: error < -TURN_DEADBAND,
            forward: error.abs() < FORWARD_CONE && may_drive,
            backward: error.abs() > REVERSE_CONE && may_drive,
            grab: !release,
        }
    }

    fn choose_target(&self, view: &ControllerView, me: Vec2) -> Vec2 {
        match view.holding {
            Some(BallId::Hitting(_)) => view.opponent_position,
            Some(BallId::Scoring) => nearest(me, &view.target_goals).unwrap_or(view.scoring_ball),
            None => {
                let Some(hitting) = nearest(me, &view.hitting_balls) else {
                    return view.scoring_ball;
                };
                let opponent_farther =
                    view.opponent_position.distance(view.scoring_ball) > me.distance(view.scoring_ball);
                let opponent_close = me.distance(view.opponent_position) < me.distance(hitting);
                if opponent_farther || view.opponent_stunned || opponent_close {
                    view.scoring_ball
                } else {
                    hitting
                }
            }
        }
    }
}

fn nearest(from: Vec2, points: &[Vec2]) -> Option<Vec2> {
    points
        .iter()
        .copied()
        .min_by(|a, b| {
            a.distance(from)
                .partial_cmp(&b.distance(from))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> ControllerView {
        ControllerView {
            position: Vec2::new(25.0, 25.0),
            angle: 0.0,
            holding: None,
            opponent_position: Vec2::new(75.0, 25.0),
            opponent_stunned: false,
            scoring_ball: Vec2::new(50.0, 25.0),
            hitting_balls: vec![Vec2::new(50.0, 12.5), Vec2::new(50.0, 37.5)],
            target_goals: vec![
                Vec2::new(85.0, 5.5),
                Vec2::new(85.0, 25.0),
                Vec2::new(85.0, 44.5),
            ],
        }
    }

    fn exact() -> (CpuController, MatchClock, SimRng) {
        let clock = MatchClock::new(100.0);
        let mut rng = SimRng::new(5);
        (CpuController::new(1.0, &clock, &mut rng), clock, rng)
    }

    #[test]
    fn test_goes_for_scoring_ball_when_closer() {
        let (mut cpu, clock, mut rng) = exact();
        let mut v = view();
        v.position = Vec2::new(26.0, 25.0);
        let intent = cpu.decide(&v, &clock, &mut rng);
        assert!(intent.forward && intent.grab);
        assert!(!intent.turn_left && !intent.turn_right);
    }

    #[test]
    fn test_goes_for_hitting_ball_when_opponent_nearer_ball() {
        let (mut cpu, clock, mut rng) = exact();
        let mut v = view();
        v.opponent_position = Vec2::new(55.0, 25.0);
        // Facing the nearby hitting ball
        v.position = Vec2::new(50.0, 5.0);
        v.angle = std::f32::consts::FRAC_PI_2;
        v.hitting_balls = vec![Vec2::new(50.0, 10.0)];
        let target = cpu.choose_target(&v, v.position);
        assert_eq!(target, Vec2::new(50.0, 10.0));
        let intent = cpu.decide(&v, &clock, &mut rng);
        assert!(intent.forward);
    }

    #[test]
    fn test_stunned_opponent_means_scoring_ball() {
        let (cpu, _clock, _rng) = exact();
        let mut v = view();
        v.position = Vec2::new(50.0, 5.0);
        v.opponent_position = Vec2::new(55.0, 25.0);
        v.hitting_balls = vec![Vec2::new(50.0, 10.0)];
        v.opponent_stunned = true;
        assert_eq!(cpu.choose_target(&v, v.position), v.scoring_ball);
    }

    #[test]
    fn test_throws_hitting_ball_when_aimed() {
        let (mut cpu, clock, mut rng) = exact();
        let mut v = view();
        v.holding = Some(BallId::Hitting(0));
        v.opponent_position = Vec2::new(70.0, 25.0);
        v.angle = 0.3;
        let intent = cpu.decide(&v, &clock, &mut rng);
        assert!(!intent.grab, "releases to throw");
        assert!(intent.turn_right);

        v.opponent_position = Vec2::new(25.0, 85.0);
        let intent = cpu.decide(&v, &clock, &mut rng);
        assert!(intent.grab, "keeps holding while off target");
    }

    #[test]
    fn test_carries_scoring_ball_to_nearest_goal() {
        let (mut cpu, clock, mut rng) = exact();
        let mut v = view();
        v.holding = Some(BallId::Scoring);
        v.position = Vec2::new(78.0, 40.0);
        assert_eq!(cpu.choose_target(&v, v.position), Vec2::new(85.0, 44.5));

        // Aimed precisely at the middle goal from close range
        v.position = Vec2::new(75.0, 25.0);
        let intent = cpu.decide(&v, &clock, &mut rng);
        assert!(!intent.grab);
    }

    #[test]
    fn test_reverses_when_target_behind() {
        let (mut cpu, clock, mut rng) = exact();
        let mut v = view();
        v.position = Vec2::new(26.0, 25.0);
        v.angle = std::f32::consts::PI;
        let intent = cpu.decide(&v, &clock, &mut rng);
        assert!(intent.backward && !intent.forward);
    }

    #[test]
    fn test_noise_scales_with_difficulty() {
        let clock = MatchClock::new(100.0);
        let mut rng = SimRng::new(5);
        let sloppy = CpuController::new(0.0, &clock, &mut rng);
        assert!(sloppy.self_noise != Vec2::ZERO);

        let (exact, _, _) = exact();
        assert_eq!(exact.self_noise, Vec2::ZERO);
        assert_eq!(exact.target_noise, Vec2::ZERO);
    }

    #[test]
    fn test_noise_rerolled_on_interval() {
        let mut clock = MatchClock::new(100.0);
        let mut rng = SimRng::new(8);
        let mut cpu = CpuController::new(0.2, &clock, &mut rng);
        let first = cpu.self_noise;

        cpu.decide(&view(), &clock, &mut rng);
        assert_eq!(cpu.self_noise, first);

        clock.advance(MAX_CPU_NOISE_INTERVAL);
        cpu.decide(&view(), &clock, &mut rng);
        assert_ne!(cpu.self_noise, first);
    }
}
