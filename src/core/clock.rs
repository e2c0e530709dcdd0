//! Session clock with a runtime-adjustable time scale.

use thiserror::Error;

/// Game time in seconds.
pub type Seconds = f64;

/// A point on the game-time axis, in seconds.
pub type Timestamp = f64;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ClockError {
    #[error("time scale must be finite and non-negative, got {0}")]
    InvalidScale(f64),
}

/// `elapsed(t) = accumulated + (t - last_sample) * scale`. A scale change
/// folds the open interval into `accumulated` at the old scale first.
#[derive(Debug, Clone, PartialEq)]
pub struct Clock {
    accumulated: Seconds,
    last_sample: Timestamp,
    scale: f64,
    total_length: Seconds,
}

impl Clock {
    /// Start a clock at `now` with `total_length` seconds on it and scale 1.
    pub fn start(now: Timestamp, total_length: Seconds) -> Self {
        Self {
            accumulated: 0.0,
            last_sample: now,
            scale: 1.0,
            total_length,
        }
    }

    pub fn elapsed(&self, now: Timestamp) -> Seconds {
        self.accumulated + (now - self.last_sample) * self.scale
    }

    /// Time left, clamped at zero.
    pub fn remaining(&self, now: Timestamp) -> Seconds {
        (self.total_length - self.elapsed(now)).max(0.0)
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.remaining(now) <= 0.0
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn total_length(&self) -> Seconds {
        self.total_length
    }

    /// Change the time scale at `now`. A scale of zero pauses the clock.
    pub fn set_scale(&mut self, now: Timestamp, scale: f64) -> Result<(), ClockError> {
        if !scale.is_finite() || scale < 0.0 {
            return Err(ClockError::InvalidScale(scale));
        }
        self.accumulated = self.elapsed(now);
        self.last_sample = now;
        self.scale = scale;
        Ok(())
    }

    /// Add `extra` seconds to the total length. Negative values shorten it.
    pub fn extend(&mut self, extra: Seconds) {
        self.total_length += extra;
    }
}
