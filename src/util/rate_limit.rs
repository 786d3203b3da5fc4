//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::time::Duration;

use super::time::tick_duration;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a limiter that admits one cell per `period`, with no burst
pub fn create_limiter(period: Duration) -> Limiter {
    let quota = Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
        .allow_burst(NonZeroU32::MIN);
    RateLimiter::direct(quota)
}

/// Per-connection move limiter: at most one move per tick
pub struct MoveRateLimiter {
    limiter: Limiter,
}

impl MoveRateLimiter {
    pub fn new() -> Self {
        Self::with_interval(tick_duration())
    }

    /// Limiter with a custom minimum inter-arrival time
    pub fn with_interval(min_interval: Duration) -> Self {
        Self {
            limiter: create_limiter(min_interval),
        }
    }

    /// Check if a move is allowed (returns true if allowed)
    pub fn check_move(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl Default for MoveRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
