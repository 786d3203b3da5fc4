//! Computer-controlled paddle

use crate::game::{Ball, Paddle};

/// Distance in pixels at which the heuristic reaches full speed
const FULL_SPEED_DISTANCE: f64 = 30.0;

pub trait Opponent {
    /// Desired movement for this frame in `[-1, 1]`; negative is up
    fn paddle_direction(&self, paddle: &Paddle, ball: &Ball) -> f64;
}

/// Chases the ball's height, slowing down as it closes in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeuristicOpponent {
    /// Multiplier on the top speed, in `[0, 1]`
    pub difficulty: f64,
}

impl HeuristicOpponent {
    pub fn new(difficulty: f64) -> Self {
        Self {
            difficulty: difficulty.clamp(0.0, 1.0),
        }
    }
}

impl Default for HeuristicOpponent {
    fn default() -> Self {
        Self::new(0.9)
    }
}

impl Opponent for HeuristicOpponent {
    fn paddle_direction(&self, paddle: &Paddle, ball: &Ball) -> f64 {
        let diff = ball.pos.y - paddle.center_y();
        if diff == 0.0 {
            return 0.0;
        }
        diff.signum() * (diff.abs() / FULL_SPEED_DISTANCE).min(1.0) * self.difficulty
    }
}
