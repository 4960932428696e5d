//! Contact resolver
//!
//! Classifies physics contacts by the roles of the two bodies and queues
//! gameplay effects. Nothing is applied from inside the physics step: the
//! match drains the queue at the start of the next tick.

use std::collections::HashMap;

use glam::Vec2;

use super::physics::{BodyHandle, Contact, ContactListener};
use super::state::PlayerId;
use crate::consts::HITTING_BALL_MIN_COLLISION_SPEED;

/// What a physics body is in the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyRole {
    Player(PlayerId),
    ScoringBall,
    HittingBall(usize),
    Wall,
    GoalPost(usize),
    GoalSensor(usize),
}

impl BodyRole {
    /// Sort key so every pair is handled in one orientation
    fn rank(self) -> u8 {
        match self {
            BodyRole::Player(_) => 0,
            BodyRole::ScoringBall => 1,
            BodyRole::HittingBall(_) => 2,
            BodyRole::Wall => 3,
            BodyRole::GoalPost(_) => 4,
            BodyRole::GoalSensor(_) => 5,
        }
    }

    fn is_dynamic(self) -> bool {
        matches!(
            self,
            BodyRole::Player(_) | BodyRole::ScoringBall | BodyRole::HittingBall(_)
        )
    }
}

/// Gameplay consequence of a contact, applied next tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContactEffect {
    /// The free scoring ball entered goal `goal`
    Goal { goal: usize },
    /// A hitting ball struck a player hard enough to stun
    HittingBallStrike { player: PlayerId, ball: usize },
    /// Push the player along `normal` and face the new velocity
    Bump { player: PlayerId, normal: Vec2 },
}

/// Possession facts as of the start of the physics step
#[derive(Debug, Clone, Copy, Default)]
struct HittingBallState {
    held: bool,
    recent_thrower: Option<PlayerId>,
}

#[derive(Debug, Default)]
pub struct ContactResolver {
    roles: HashMap<BodyHandle, BodyRole>,
    scoring_ball_held: bool,
    hitting_balls: Vec<HittingBallState>,
    pending: Vec<ContactEffect>,
}

impl ContactResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, body: BodyHandle, role: BodyRole) {
        if let BodyRole::HittingBall(i) = role {
            if self.hitting_balls.len() <= i {
                self.hitting_balls.resize(i + 1, HittingBallState::default());
            }
        }
        self.roles.insert(body, role);
    }

    pub fn role(&self, body: BodyHandle) -> Option<BodyRole> {
        self.roles.get(&body).copied()
    }

    /// Record who holds what before the physics step runs
    pub fn sync_possession(
        &mut self,
        scoring_ball_held: bool,
        hitting_balls: impl IntoIterator<Item = (bool, Option<PlayerId>)>,
    ) {
        self.scoring_ball_held = scoring_ball_held;
        for (state, (held, recent_thrower)) in self.hitting_balls.iter_mut().zip(hitting_balls) {
            *state = HittingBallState {
                held,
                recent_thrower,
            };
        }
    }

    /// Effects queued since the last drain, in arrival order
    pub fn drain(&mut self) -> Vec<ContactEffect> {
        std::mem::take(&mut self.pending)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Look up both roles and order them by rank, flipping the contact to match
    fn classify(
        &self,
        a: BodyHandle,
        b: BodyHandle,
        contact: &Contact,
    ) -> Option<(BodyRole, BodyRole, Contact)> {
        let (ra, rb) = (self.role(a)?, self.role(b)?);
        if ra.rank() <= rb.rank() {
            Some((ra, rb, *contact))
        } else {
            Some((rb, ra, contact.flipped()))
        }
    }

    fn scoring_ball_in_goal(&mut self, goal: usize) {
        // A held ball cannot score
        if self.scoring_ball_held {
            return;
        }
        self.pending.push(ContactEffect::Goal { goal });
    }

    /// `contact` is oriented player first, so B is the hitting ball
    fn hitting_ball_touch(&mut self, player: PlayerId, ball: usize, contact: &Contact) {
        let Some(state) = self.hitting_balls.get(ball) else {
            return;
        };
        if state.held || state.recent_thrower == Some(player) {
            return;
        }
        // A resting ball never stuns, however fast the player runs into it
        if contact.velocity_b.length() < HITTING_BALL_MIN_COLLISION_SPEED {
            return;
        }
        self.pending
            .push(ContactEffect::HittingBallStrike { player, ball });
    }
}

impl ContactListener for ContactResolver {
    fn begin_contact(&mut self, a: BodyHandle, b: BodyHandle, contact: &Contact) {
        let Some((first, second, contact)) = self.classify(a, b, contact) else {
            return;
        };
        match (first, second) {
            (BodyRole::ScoringBall, BodyRole::GoalSensor(goal)) => self.scoring_ball_in_goal(goal),
            (BodyRole::Player(player), BodyRole::HittingBall(ball)) => {
                self.hitting_ball_touch(player, ball, &contact)
            }
            // Reserved: players touching each other only get the generic bump
            (BodyRole::Player(_), BodyRole::Player(_)) => {}
            (BodyRole::Player(_), _)
            | (BodyRole::ScoringBall, _)
            | (BodyRole::HittingBall(_), _)
            | (BodyRole::Wall, _)
            | (BodyRole::GoalPost(_), _)
            | (BodyRole::GoalSensor(_), _) => {}
        }
    }

    fn post_solve(&mut self, a: BodyHandle, b: BodyHandle, contact: &Contact) {
        let Some((first, second, contact)) = self.classify(a, b, contact) else {
            return;
        };
        if !second.is_dynamic() {
            return;
        }
        // Players rank first, so `first` is always the player if there is one
        if let BodyRole::Player(player) = first {
            self.pending.push(ContactEffect::Bump {
                player,
                normal: -contact.normal,
            });
        }
        if let BodyRole::Player(player) = second {
            self.pending.push(ContactEffect::Bump {
                player,
                normal: contact.normal,
            });
        }
    }
}
