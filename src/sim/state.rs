//! Shared simulation types
//!
//! Identifiers, per-tick intent, and the read-only snapshot handed to
//! presentation.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::hitting_ball::HittingBallMode;
use crate::error::InvalidPlayerId;
use crate::settings::ControlMode;

/// Player slot (index 0 is player 1, index 1 is player 2)
///
/// Only `ONE` and `TWO` exist; deserializing any other index fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct PlayerId(usize);

impl PlayerId {
    pub const ONE: PlayerId = PlayerId(0);
    pub const TWO: PlayerId = PlayerId(1);
    pub const ALL: [PlayerId; 2] = [PlayerId::ONE, PlayerId::TWO];

    #[inline]
    pub fn index(self) -> usize {
        self.0
    }

    /// Side number as shown to players (1 or 2)
    pub fn side(self) -> u8 {
        self.0 as u8 + 1
    }

    pub fn opponent(self) -> PlayerId {
        PlayerId(1 - self.0)
    }
}

impl TryFrom<usize> for PlayerId {
    type Error = InvalidPlayerId;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        PlayerId::ALL
            .get(index)
            .copied()
            .ok_or(InvalidPlayerId(index))
    }
}

impl From<PlayerId> for usize {
    fn from(id: PlayerId) -> usize {
        id.0
    }
}

/// Grabbable object identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BallId {
    Scoring,
    Hitting(usize),
}

impl BallId {
    pub fn is_hitting(self) -> bool {
        matches!(self, BallId::Hitting(_))
    }
}

/// Per-tick intent flags for one player
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub forward: bool,
    pub backward: bool,
    pub turn_left: bool,
    pub turn_right: bool,
    /// Held down to grab, released to throw
    pub grab: bool,
}

/// Where a body is and which way it faces
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec2,
    pub angle: f32,
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub control: ControlMode,
    pub position: Vec2,
    pub angle: f32,
    pub radius: f32,
    pub score: u32,
    pub holding: Option<BallId>,
    pub stunned: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallView {
    pub id: BallId,
    pub position: Vec2,
    pub angle: f32,
    pub radius: f32,
    pub holder: Option<PlayerId>,
    /// Players that could grab this ball right now (for highlighting)
    pub eligible_holders: Vec<PlayerId>,
    /// Seeking mode, hitting balls only
    pub mode: Option<HittingBallMode>,
}

/// Everything presentation needs to draw one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub remaining: f32,
    pub scores: [u32; 2],
    pub players: Vec<PlayerView>,
    pub balls: Vec<BallView>,
    pub paused: bool,
    pub over: bool,
}
