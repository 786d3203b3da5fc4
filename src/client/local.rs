//! Standalone single-player match
//!
//! Runs the simulation on the client at display rate. The left paddle follows
//! the keyboard, the right paddle follows an [`Opponent`], and scoring only
//! re-serves the ball.

use std::time::Duration;

use rand::Rng;

use super::input::InputSource;
use super::opponent::Opponent;
use crate::game::physics::{self, MAX_FRAME_DELTA};
use crate::game::rules::reset_match;
use crate::game::{Ball, BoardConfig, GameState, Paddle, Score, ScoreEvent, ScorePolicy, Side};
use crate::util::time::frame_delta;

/// Borrowed view of one rendered frame
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub ball: &'a Ball,
    pub left: &'a Paddle,
    pub right: &'a Paddle,
    pub score: &'a Score,
}

/// Drawing collaborator; anything that can consume a frame
pub trait RenderSink {
    fn render(&mut self, frame: Frame<'_>);
}

pub struct LocalMatch<R> {
    board: BoardConfig,
    state: GameState,
    policy: ScorePolicy,
    rng: R,
}

impl<R: Rng> LocalMatch<R> {
    pub fn new(board: BoardConfig, mut rng: R) -> Self {
        let state = GameState::new(&board, &mut rng);
        Self {
            board,
            state,
            policy: ScorePolicy::BallOnly,
            rng,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Run one display frame that took `elapsed` of wall-clock time
    pub fn frame<I, O, S>(
        &mut self,
        elapsed: Duration,
        input: &I,
        opponent: &O,
        sink: &mut S,
    ) -> Option<ScoreEvent>
    where
        I: InputSource + ?Sized,
        O: Opponent + ?Sized,
        S: RenderSink + ?Sized,
    {
        let dt = frame_delta(elapsed).min(MAX_FRAME_DELTA);
        let step = self.board.paddle_speed * dt;

        let up_down = input.vertical_axis();
        self.state.left.shift(up_down * step, &self.board);

        let ai = opponent
            .paddle_direction(&self.state.right, &self.state.ball)
            .clamp(-1.0, 1.0);
        self.state.right.shift(ai * step, &self.board);

        let event = physics::advance(&mut self.state, &self.board, dt);
        if let Some(event) = event {
            self.policy.apply(&mut self.state, event, &self.board, &mut self.rng);
        }

        sink.render(Frame {
            ball: &self.state.ball,
            left: self.state.paddle(Side::Left),
            right: self.state.paddle(Side::Right),
            score: &self.state.score,
        });

        event
    }

    /// Restart from zero with a fresh serve
    pub fn reset(&mut self) {
        reset_match(&mut self.state, &self.board, &mut self.rng);
    }
}
