//! Match clock
//!
//! The single countdown every timer in the simulation is measured against.
//! Timers are stored as absolute clock values at which they expire. Because
//! the clock counts down, a timer is active while `remaining > expiry` and
//! expired once the clock has fallen to or below it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchClock {
    duration: f32,
    remaining: f32,
}

impl MatchClock {
    pub fn new(duration: f32) -> Self {
        Self {
            duration,
            remaining: duration,
        }
    }

    /// Remaining match time in seconds (negative once the match is over)
    #[inline]
    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Subtract elapsed time
    pub fn advance(&mut self, dt: f32) {
        debug_assert!(dt >= 0.0, "clock cannot run backwards");
        self.remaining -= dt.max(0.0);
    }

    /// Expiry value for a timer lasting `delay` seconds from now
    #[inline]
    pub fn after(&self, delay: f32) -> f32 {
        self.remaining - delay
    }

    /// True while a timer with this expiry has not run out
    #[inline]
    pub fn is_active(&self, expiry: f32) -> bool {
        self.remaining > expiry
    }

    #[inline]
    pub fn is_expired(&self, expiry: f32) -> bool {
        !self.is_active(expiry)
    }

    pub fn is_over(&self) -> bool {
        self.remaining < 0.0
    }

    pub fn reset(&mut self) {
        self.remaining = self.duration;
    }
}
