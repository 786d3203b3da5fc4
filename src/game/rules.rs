//! What happens after a point is scored

use rand::Rng;

use super::board::BoardConfig;
use super::physics::{Ball, GameState, Paddle, ScoreEvent, Score};
use super::Side;

/// Caller-selected reaction to a [`ScoreEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScorePolicy {
    /// Credit the scorer, then re-serve and recenter both paddles
    #[default]
    RoundReset,
    /// Re-serve the ball only; score and paddles are left alone
    BallOnly,
}

impl ScorePolicy {
    pub fn apply<R: Rng + ?Sized>(
        self,
        state: &mut GameState,
        event: ScoreEvent,
        board: &BoardConfig,
        rng: &mut R,
    ) {
        match self {
            ScorePolicy::RoundReset => {
                state.score.credit(event.scorer);
                reset_round(state, board, rng);
            }
            ScorePolicy::BallOnly => {
                state.ball = Ball::serve(board, rng);
            }
        }
    }
}

/// Serve a new ball and recenter both paddles. Score is preserved.
pub fn reset_round<R: Rng + ?Sized>(state: &mut GameState, board: &BoardConfig, rng: &mut R) {
    state.ball = Ball::serve(board, rng);
    state.left = Paddle::new(Side::Left, board);
    state.right = Paddle::new(Side::Right, board);
}

/// Zero the score and start a fresh round
pub fn reset_match<R: Rng + ?Sized>(state: &mut GameState, board: &BoardConfig, rng: &mut R) {
    state.score = Score::default();
    reset_round(state, board, rng);
}
