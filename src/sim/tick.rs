//! Fixed timestep match tick
//!
//! `Match` owns the field, both players, every ball, the contact resolver
//! and the physics world. Each tick runs in a fixed order:
//!
//! 1. apply contact effects queued during the previous physics step
//! 2. run built-in controllers to produce intent
//! 3. resolve stun, bump, drop, grab and throw
//! 4. push movement into the physics world
//! 5. step physics (queueing new contact effects for the next tick)
//! 6. advance the clock
//!
//! A goal queued by the last step before time runs out is still credited,
//! even though no further tick will run.

use super::clock::MatchClock;
use super::contact::{BodyRole, ContactEffect, ContactResolver};
use super::controller::{ControllerView, CpuController};
use super::field::{self, Field};
use super::hitting_ball::HittingBall;
use super::physics::PhysicsBackend;
use super::player::{GrabAction, Player};
use super::possession::{self, BallCore, GrabbableBall, MovementContext};
use super::rapier_world::RapierWorld;
use super::rng::SimRng;
use super::scoring_ball::ScoringBall;
use super::state::{BallId, BallView, Intent, MatchSnapshot, PlayerId, PlayerView, Pose};
use crate::consts::*;
use crate::error::ConfigError;
use crate::settings::MatchSettings;

/// Every grabbable ball on the field
#[derive(Debug, Clone)]
pub struct Balls {
    pub scoring: ScoringBall,
    pub hitting: Vec<HittingBall>,
}

impl Balls {
    /// Grab precedence: scoring ball first, then hitting balls in order
    pub fn precedence(&self) -> Vec<BallId> {
        std::iter::once(BallId::Scoring)
            .chain((0..self.hitting.len()).map(BallId::Hitting))
            .collect()
    }

    pub fn get_mut(&mut self, id: BallId) -> Option<&mut dyn GrabbableBall> {
        match id {
            BallId::Scoring => Some(&mut self.scoring as &mut dyn GrabbableBall),
            BallId::Hitting(i) => self
                .hitting
                .get_mut(i)
                .map(|b| b as &mut dyn GrabbableBall),
        }
    }

    fn cores(&self) -> impl Iterator<Item = (BallId, &BallCore)> {
        std::iter::once((BallId::Scoring, self.scoring.core())).chain(
            self.hitting
                .iter()
                .enumerate()
                .map(|(i, b)| (BallId::Hitting(i), b.core())),
        )
    }
}

/// One match between two players
pub struct Match<P: PhysicsBackend = RapierWorld> {
    settings: MatchSettings,
    physics: P,
    clock: MatchClock,
    rng: SimRng,
    field: Field,
    players: [Player; 2],
    controllers: [Option<CpuController>; 2],
    balls: Balls,
    resolver: ContactResolver,
    paused: bool,
    ticks: u64,
}

impl Match<RapierWorld> {
    /// Match on the rapier2d physics world
    pub fn new(settings: MatchSettings) -> Result<Self, ConfigError> {
        Self::with_physics(settings, RapierWorld::new())
    }
}

impl<P: PhysicsBackend> Match<P> {
    /// Match on a caller-supplied physics backend (expected to be empty)
    pub fn with_physics(settings: MatchSettings, mut physics: P) -> Result<Self, ConfigError> {
        settings.validate()?;
        let clock = MatchClock::new(settings.duration_secs);
        let mut rng = SimRng::new(settings.seed);

        let field = Field::build(&mut physics);
        let players = PlayerId::ALL
            .map(|id| Player::new(id, settings.players[id.index()].control, &mut physics, &clock));
        let scoring = ScoringBall::new(&mut physics);
        let hitting = field::hitting_ball_starts()
            .into_iter()
            .map(|start| {
                HittingBall::new(
                    &mut physics,
                    start,
                    settings.disable_seeking_hitting_ball,
                    &clock,
                    &mut rng,
                )
            })
            .collect();
        let balls = Balls { scoring, hitting };

        let mut resolver = ContactResolver::new();
        for player in &players {
            resolver.register(player.body(), BodyRole::Player(player.id()));
        }
        resolver.register(balls.scoring.core().body(), BodyRole::ScoringBall);
        for (i, ball) in balls.hitting.iter().enumerate() {
            resolver.register(ball.core().body(), BodyRole::HittingBall(i));
        }
        for wall in field.walls {
            resolver.register(wall, BodyRole::Wall);
        }
        for (i, goal) in field.goals.iter().enumerate() {
            for post in goal.posts {
                resolver.register(post, BodyRole::GoalPost(i));
            }
            resolver.register(goal.sensor, BodyRole::GoalSensor(i));
        }

        let mut game = Self {
            settings,
            physics,
            clock,
            rng,
            field,
            players,
            controllers: [None, None],
            balls,
            resolver,
            paused: false,
            ticks: 0,
        };
        game.reset_match();
        log::info!(
            "Match created: {} vs {}, {}s, seed {}",
            game.settings.players[0].control,
            game.settings.players[1].control,
            game.settings.duration_secs,
            game.settings.seed
        );
        Ok(game)
    }

    /// Put every entity back to its starting state and replay from the seed
    pub fn reset_match(&mut self) {
        self.clock.reset();
        self.rng.reseed();

        for id in self.balls.precedence() {
            if let Some(ball) = self.balls.get_mut(id) {
                possession::release(ball, &mut self.players, &mut self.physics);
            }
        }
        for player in &mut self.players {
            player.reset(&mut self.physics, &self.clock);
        }
        self.balls.scoring.reset(&mut self.physics);
        for ball in &mut self.balls.hitting {
            ball.reset(&mut self.physics, &self.clock, &mut self.rng);
        }

        let mut controllers = [None, None];
        for id in PlayerId::ALL {
            controllers[id.index()] = self.settings.players[id.index()]
                .control
                .difficulty()
                .map(|d| CpuController::new(d, &self.clock, &mut self.rng));
        }
        self.controllers = controllers;

        self.resolver.drain();
        self.physics.reset_contacts();
        self.paused = false;
        self.ticks = 0;
        debug_assert!(self.possession_consistent(), "possession out of sync after reset");
        log::info!("Match reset");
    }

    /// Advance the match by one fixed timestep
    pub fn advance_tick(&mut self, dt: f32) {
        if self.paused || self.is_match_over() {
            return;
        }

        self.apply_contact_effects();
        self.run_controllers();
        self.resolve_player_state();
        self.apply_movement(dt);

        self.resolver.sync_possession(
            self.balls.scoring.core().is_held(),
            self.balls
                .hitting
                .iter()
                .map(|b| (b.core().is_held(), b.recent_thrower())),
        );
        self.physics.step(dt, &mut self.resolver);
        self.clock.advance(dt);
        self.ticks += 1;

        debug_assert!(self.possession_consistent(), "possession out of sync");
        if self.is_match_over() {
            self.settle_final_goals();
            log::info!(
                "Match over: {} - {}",
                self.players[0].score(),
                self.players[1].score()
            );
        }
    }

    pub fn is_match_over(&self) -> bool {
        self.clock.is_over()
    }

    pub fn set_paused(&mut self, paused: bool) {
        if self.paused != paused {
            log::debug!("Match {}", if paused { "paused" } else { "resumed" });
        }
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Set intent for a player; built-in controllers overwrite theirs each tick
    pub fn set_intent(&mut self, player: PlayerId, intent: Intent) {
        self.players[player.index()].set_intent(intent);
    }

    pub fn intent(&self, player: PlayerId) -> Intent {
        self.players[player.index()].intent()
    }

    pub fn score(&self, player: PlayerId) -> u32 {
        self.players[player.index()].score()
    }

    pub fn player(&self, player: PlayerId) -> &Player {
        &self.players[player.index()]
    }

    pub fn scoring_ball(&self) -> &ScoringBall {
        &self.balls.scoring
    }

    pub fn hitting_ball(&self, index: usize) -> Option<&HittingBall> {
        self.balls.hitting.get(index)
    }

    pub fn clock(&self) -> &MatchClock {
        &self.clock
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn settings(&self) -> &MatchSettings {
        &self.settings
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn physics(&self) -> &P {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut P {
        &mut self.physics
    }

    /// Players that could grab `ball` right now
    pub fn eligible_holders(&self, ball: BallId) -> Vec<PlayerId> {
        match ball {
            BallId::Scoring => possession::eligible_holders(
                self.balls.scoring.core(),
                &self.players,
                &self.physics,
                &self.clock,
            ),
            BallId::Hitting(i) => self
                .balls
                .hitting
                .get(i)
                .map(|b| b.eligible_holders(&self.players, &self.physics, &self.clock))
                .unwrap_or_default(),
        }
    }

    /// Every ball's holder points back at a player holding it, and vice versa
    pub fn possession_consistent(&self) -> bool {
        possession::is_consistent(&self.players, self.balls.cores(), &self.physics)
    }

    pub fn snapshot(&self) -> MatchSnapshot {
        let players = self
            .players
            .iter()
            .map(|p| {
                let pose = p.pose(&self.physics);
                PlayerView {
                    id: p.id(),
                    control: p.control(),
                    position: pose.position,
                    angle: pose.angle,
                    radius: pose.radius,
                    score: p.score(),
                    holding: p.held(),
                    stunned: p.is_stunned(&self.clock),
                }
            })
            .collect();

        let balls = self
            .balls
            .cores()
            .map(|(id, core)| BallView {
                id,
                position: self.physics.position(core.body()),
                angle: self.physics.angle(core.body()),
                radius: core.radius(),
                holder: core.holder(),
                eligible_holders: self.eligible_holders(id),
                mode: match id {
                    BallId::Hitting(i) => self.balls.hitting.get(i).map(|b| b.mode()),
                    BallId::Scoring => None,
                },
            })
            .collect();

        MatchSnapshot {
            remaining: self.clock.remaining(),
            scores: [self.players[0].score(), self.players[1].score()],
            players,
            balls,
            paused: self.paused,
            over: self.is_match_over(),
        }
    }

    fn apply_contact_effects(&mut self) {
        for effect in self.resolver.drain() {
            log::trace!("Contact effect: {effect:?}");
            match effect {
                ContactEffect::Goal { goal } => self.credit_goal(goal),
                ContactEffect::HittingBallStrike { player, ball } => {
                    if let Some(hitting) = self.balls.hitting.get_mut(ball) {
                        hitting.on_player_strike(&self.clock, &mut self.rng);
                    }
                    self.players[player.index()].flag_stun();
                }
                ContactEffect::Bump { player, normal } => {
                    self.players[player.index()].flag_bump(normal);
                }
            }
        }
    }

    /// Once per ball entry until the ball is reset
    fn credit_goal(&mut self, goal: usize) {
        let Some(goal) = self.field.goals.get(goal) else {
            return;
        };
        if self.balls.scoring.entered_goal() {
            return;
        }
        let scorer = &mut self.players[goal.credits.index()];
        scorer.add_score(SCORING_BALL_SCORE);
        self.balls.scoring.mark_entered_goal();
        log::info!("Player {} scored, now {}", goal.credits.side(), scorer.score());
    }

    /// The clock ran out after the last step; only goals still matter
    fn settle_final_goals(&mut self) {
        for effect in self.resolver.drain() {
            match effect {
                ContactEffect::Goal { goal } => self.credit_goal(goal),
                ContactEffect::HittingBallStrike { .. } | ContactEffect::Bump { .. } => {
                    log::trace!("Dropped after final tick: {effect:?}");
                }
            }
        }
    }

    fn controller_view(&self, id: PlayerId) -> ControllerView {
        let me = &self.players[id.index()];
        let opponent = &self.players[id.opponent().index()];
        let position_of = |core: &BallCore| self.physics.position(core.body());
        ControllerView {
            position: self.physics.position(me.body()),
            angle: self.physics.angle(me.body()),
            holding: me.held(),
            opponent_position: self.physics.position(opponent.body()),
            opponent_stunned: opponent.is_stunned(&self.clock),
            scoring_ball: position_of(self.balls.scoring.core()),
            hitting_balls: self.balls.hitting.iter().map(|b| position_of(b.core())).collect(),
            target_goals: self.field.target_goals(id).map(|g| g.center).collect(),
        }
    }

    fn run_controllers(&mut self) {
        for id in PlayerId::ALL {
            if self.controllers[id.index()].is_none() {
                continue;
            }
            let view = self.controller_view(id);
            if let Some(cpu) = self.controllers[id.index()].as_mut() {
                let intent = cpu.decide(&view, &self.clock, &mut self.rng);
                self.players[id.index()].set_intent(intent);
            }
        }
    }

    fn resolve_player_state(&mut self) {
        for ball in &mut self.balls.hitting {
            ball.update_mode_timer(&self.clock, &mut self.rng, &self.physics);
        }

        for id in PlayerId::ALL {
            if self.players[id.index()].apply_pending_effects(&mut self.physics, &self.clock) {
                self.drop_held(id);
            }
        }

        for id in PlayerId::ALL {
            match self.players[id.index()].grab_action(&self.clock) {
                GrabAction::Grab => self.grab_in_order(id),
                GrabAction::Throw => self.throw_held(id),
                GrabAction::None => {}
            }
        }
    }

    /// First ball in precedence order that accepts the grab wins
    fn grab_in_order(&mut self, id: PlayerId) {
        for ball_id in self.balls.precedence() {
            let Some(ball) = self.balls.get_mut(ball_id) else {
                continue;
            };
            if possession::try_grab(ball, ball_id, &mut self.players, id, &mut self.physics, &self.clock) {
                if let BallId::Hitting(i) = ball_id {
                    self.balls.hitting[i].on_grabbed();
                }
                return;
            }
        }
    }

    fn throw_held(&mut self, id: PlayerId) {
        let Some(ball_id) = self.players[id.index()].held() else {
            return;
        };
        if let BallId::Hitting(i) = ball_id {
            let pose = self.players[id.index()].pose(&self.physics);
            let opponent = self.physics.position(self.players[id.opponent().index()].body());
            self.balls.hitting[i].on_thrown(id, &pose, opponent, &self.clock);
        }
        if let Some(ball) = self.balls.get_mut(ball_id) {
            possession::throw(ball, &mut self.players, &mut self.physics, &self.clock);
        }
    }

    fn drop_held(&mut self, id: PlayerId) {
        let Some(ball_id) = self.players[id.index()].held() else {
            return;
        };
        if let BallId::Hitting(i) = ball_id {
            self.balls.hitting[i].on_dropped(id, &self.clock, &mut self.rng);
        }
        if let Some(ball) = self.balls.get_mut(ball_id) {
            possession::drop(ball, &mut self.players, &mut self.physics, &self.clock);
        }
    }

    fn apply_movement(&mut self, dt: f32) {
        for player in &self.players {
            player.apply_movement(&mut self.physics, &self.clock);
        }

        // A goal sends the ball back to the center
        if self.balls.scoring.entered_goal() {
            possession::release(&mut self.balls.scoring, &mut self.players, &mut self.physics);
            self.balls.scoring.reset(&mut self.physics);
        }

        let players = PlayerId::ALL.map(|id| self.players[id.index()].pose(&self.physics));
        let scoring_body = self.balls.scoring.core().body();
        let scoring_radius = self.balls.scoring.core().radius();
        let mut ctx = MovementContext {
            dt,
            clock: &self.clock,
            players,
            scoring_ball: Pose {
                position: self.physics.position(scoring_body),
                angle: self.physics.angle(scoring_body),
                radius: scoring_radius,
            },
            rng: &mut self.rng,
        };

        self.balls.scoring.update_movement(&mut ctx, &mut self.physics);
        ctx.scoring_ball.position = self.physics.position(scoring_body);
        for ball in &mut self.balls.hitting {
            ball.update_movement(&mut ctx, &mut self.physics);
        }
    }
}
