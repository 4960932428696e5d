//! Ball possession protocol
//!
//! Shared by every grabbable ball. A ball's `holder` and a player's `held`
//! slot are two views of one relation and only change together, through
//! the functions in this module.

use glam::Vec2;

use super::clock::MatchClock;
use super::physics::{BodyDesc, BodyHandle, PhysicsBackend};
use super::player::Player;
use super::rng::SimRng;
use super::state::{BallId, PlayerId, Pose};
use crate::consts::*;
use crate::heading;

/// State common to all grabbable balls
#[derive(Debug, Clone)]
pub struct BallCore {
    pub(crate) body: BodyHandle,
    pub(crate) radius: f32,
    pub(crate) grab_range: f32,
    pub(crate) throw_speed: f32,
    pub(crate) holder: Option<PlayerId>,
}

impl BallCore {
    pub fn new(
        physics: &mut dyn PhysicsBackend,
        desc: &BodyDesc,
        grab_range: f32,
        throw_speed: f32,
    ) -> Self {
        let body = physics.create_body(desc);
        Self {
            body,
            radius: physics.radius(body),
            grab_range,
            throw_speed,
            holder: None,
        }
    }

    pub fn body(&self) -> BodyHandle {
        self.body
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn holder(&self) -> Option<PlayerId> {
        self.holder
    }

    pub fn is_held(&self) -> bool {
        self.holder.is_some()
    }
}

/// Per-tick inputs for ball movement
pub struct MovementContext<'a> {
    pub dt: f32,
    pub clock: &'a MatchClock,
    pub players: [Pose; 2],
    pub scoring_ball: Pose,
    pub rng: &'a mut SimRng,
}

/// A ball players can grab, throw and drop
pub trait GrabbableBall {
    fn core(&self) -> &BallCore;
    fn core_mut(&mut self) -> &mut BallCore;

    /// Veto grabs based on the ball's own state
    fn can_be_grabbed_by_state(&self) -> bool {
        true
    }

    /// Type-specific movement for this tick (pinning, steering)
    fn update_movement(&mut self, ctx: &mut MovementContext<'_>, physics: &mut dyn PhysicsBackend);
}

/// Center distance minus both radii
pub fn surface_distance(physics: &dyn PhysicsBackend, player: &Player, ball: &BallCore) -> f32 {
    physics.position(player.body()).distance(physics.position(ball.body))
        - player.radius()
        - ball.radius
}

/// Attempt to take `ball` for player `who`
pub fn try_grab<B: GrabbableBall + ?Sized>(
    ball: &mut B,
    ball_id: BallId,
    players: &mut [Player],
    who: PlayerId,
    physics: &mut dyn PhysicsBackend,
    clock: &MatchClock,
) -> bool {
    let player = &players[who.index()];
    if player.held().is_some() || !player.can_act(clock) || !ball.can_be_grabbed_by_state() {
        return false;
    }
    if surface_distance(physics, player, ball.core()) > ball.core().grab_range {
        return false;
    }

    if let Some(previous) = ball.core().holder {
        let evicted = &mut players[previous.index()];
        evicted.held = None;
        evicted.extend_cooldown(clock, PLAYER_DROP_PENALTY);
        log::debug!("Player {} lost {:?} to player {}", previous.side(), ball_id, who.side());
    }

    let core = ball.core_mut();
    core.holder = Some(who);
    physics.set_linear_velocity(core.body, Vec2::ZERO);
    physics.set_sensor(core.body, true);

    let player = &mut players[who.index()];
    player.held = Some(ball_id);
    player.extend_cooldown(clock, PLAYER_GRAB_DELAY);
    log::debug!("Player {} grabbed {:?}", who.side(), ball_id);
    true
}

/// Launch the ball along the holder's facing; returns the thrower
pub fn throw<B: GrabbableBall + ?Sized>(
    ball: &mut B,
    players: &mut [Player],
    physics: &mut dyn PhysicsBackend,
    clock: &MatchClock,
) -> Option<PlayerId> {
    let thrower = ball.core().holder?;
    let player = &players[thrower.index()];
    let facing = heading(physics.angle(player.body()));
    let offset = player.radius() + ball.core().radius + THROW_DISTANCE_FROM_PLAYER;
    let origin = physics.position(player.body());

    let core = ball.core();
    physics.set_position(core.body, origin + facing * offset);
    physics.set_linear_velocity(core.body, facing * core.throw_speed);
    release(ball, players, physics);
    players[thrower.index()].extend_cooldown(clock, PLAYER_THROW_DELAY);
    log::debug!("Player {} threw", thrower.side());
    Some(thrower)
}

/// Involuntary release; the ball keeps a fraction of the holder's velocity
pub fn drop<B: GrabbableBall + ?Sized>(
    ball: &mut B,
    players: &mut [Player],
    physics: &mut dyn PhysicsBackend,
    clock: &MatchClock,
) -> Option<PlayerId> {
    let holder = ball.core().holder?;
    let carried = physics.linear_velocity(players[holder.index()].body());
    physics.set_linear_velocity(ball.core().body, carried * BALL_DROP_VELOCITY_FRACTION);
    release(ball, players, physics);
    players[holder.index()].extend_cooldown(clock, PLAYER_DROP_PENALTY);
    log::debug!("Player {} dropped the ball", holder.side());
    Some(holder)
}

/// Clear possession on both sides and restore solid collision
pub fn release<B: GrabbableBall + ?Sized>(
    ball: &mut B,
    players: &mut [Player],
    physics: &mut dyn PhysicsBackend,
) {
    let core = ball.core_mut();
    if let Some(holder) = core.holder.take() {
        players[holder.index()].held = None;
    }
    physics.set_sensor(core.body, false);
}

/// Players in range who may grab now, plus the current holder if in range
pub fn eligible_holders(
    ball: &BallCore,
    players: &[Player],
    physics: &dyn PhysicsBackend,
    clock: &MatchClock,
) -> Vec<PlayerId> {
    players
        .iter()
        .filter(|p| surface_distance(physics, p, ball) <= ball.grab_range)
        .filter(|p| p.can_act(clock) || ball.holder == Some(p.id()))
        .map(|p| p.id())
        .collect()
}

/// Keep a held ball directly in front of its holder
pub fn pin_to_holder(ball: &BallCore, holder: &Pose, physics: &mut dyn PhysicsBackend) {
    let offset = heading(holder.angle) * (holder.radius + ball.radius);
    physics.set_linear_velocity(ball.body, Vec2::ZERO);
    physics.set_position(ball.body, holder.position + offset);
}

/// Both sides of every possession agree and held balls are sensors
pub fn is_consistent<'a>(
    players: &[Player],
    balls: impl IntoIterator<Item = (BallId, &'a BallCore)>,
    physics: &dyn PhysicsBackend,
) -> bool {
    let mut held_count = 0;
    for (id, core) in balls {
        if physics.is_sensor(core.body) != core.holder.is_some() {
            return false;
        }
        if let Some(holder) = core.holder {
            held_count += 1;
            if players[holder.index()].held() != Some(id) {
                return false;
            }
        }
    }
    held_count == players.iter().filter(|p| p.held().is_some()).count()
}
