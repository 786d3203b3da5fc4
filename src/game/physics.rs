//! Ball and paddle physics
//!
//! The engine advances one ball and two paddles by one step and reports a
//! score when the ball leaves the board. It never touches the score or resets
//! the round; callers pick a [`ScorePolicy`](super::rules::ScorePolicy).

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::board::BoardConfig;
use super::Side;

/// Horizontal speed multiplier applied on every paddle hit
pub const PADDLE_SPEEDUP: f64 = 1.05;

/// Vertical velocity added at the very edge of a paddle
pub const ENGLISH_FACTOR: f64 = 2.0;

/// Largest frame-delta multiplier the scaled step accepts
pub const MAX_FRAME_DELTA: f64 = 4.0;

/// 2D vector in game-space units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ball {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f64,
}

impl Ball {
    pub fn new(pos: Vec2, vel: Vec2, radius: f64) -> Self {
        Self { pos, vel, radius }
    }

    /// Serve from the board center towards a random side
    pub fn serve<R: Rng + ?Sized>(board: &BoardConfig, rng: &mut R) -> Self {
        let (cx, cy) = board.center();
        let speed = board.ball_speed;
        let vx = if rng.gen_bool(0.5) { speed } else { -speed };
        let vy = (rng.gen::<f64>() - 0.5) * speed;
        Self::new(Vec2::new(cx, cy), Vec2::new(vx, vy), board.ball_radius)
    }
}

/// Paddle rectangle, positioned by its top-left corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paddle {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Paddle {
    /// Vertically centered paddle for `side`
    pub fn new(side: Side, board: &BoardConfig) -> Self {
        Self {
            x: board.paddle_x(side),
            y: board.center_paddle_y(),
            width: board.paddle_width,
            height: board.paddle_height,
        }
    }

    /// Move to `y`, clamped to the board
    pub fn set_y(&mut self, y: f64, board: &BoardConfig) {
        self.y = board.clamp_paddle_y(y);
    }

    /// Move by `dy`, clamped to the board
    pub fn shift(&mut self, dy: f64, board: &BoardConfig) {
        self.set_y(self.y + dy, board);
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    /// Whether `ball`, inflated by its radius, overlaps this paddle
    pub fn overlaps(&self, ball: &Ball) -> bool {
        ball.pos.x - ball.radius < self.x + self.width
            && ball.pos.x + ball.radius > self.x
            && ball.pos.y - ball.radius < self.y + self.height
            && ball.pos.y + ball.radius > self.y
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Score {
    pub left: u32,
    pub right: u32,
}

impl Score {
    pub fn credit(&mut self, side: Side) {
        match side {
            Side::Left => self.left += 1,
            Side::Right => self.right += 1,
        }
    }
}

/// The tuple every participant renders: one ball, two paddles, the score
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub ball: Ball,
    pub left: Paddle,
    pub right: Paddle,
    pub score: Score,
}

impl GameState {
    /// Fresh match state with a served ball
    pub fn new<R: Rng + ?Sized>(board: &BoardConfig, rng: &mut R) -> Self {
        Self {
            ball: Ball::serve(board, rng),
            left: Paddle::new(Side::Left, board),
            right: Paddle::new(Side::Right, board),
            score: Score::default(),
        }
    }

    pub fn paddle(&self, side: Side) -> &Paddle {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn paddle_mut(&mut self, side: Side) -> &mut Paddle {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

/// A point was scored; the ball left the board on the other side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreEvent {
    pub scorer: Side,
}

/// Advance by exactly one nominal tick
pub fn tick(state: &mut GameState, board: &BoardConfig) -> Option<ScoreEvent> {
    step(state, board, 1.0)
}

/// Advance by `frame_delta` nominal ticks, clamped to `[0, MAX_FRAME_DELTA]`.
///
/// Used by the standalone loop, whose frame timing is not fixed.
pub fn advance(state: &mut GameState, board: &BoardConfig, frame_delta: f64) -> Option<ScoreEvent> {
    let dt = if frame_delta.is_finite() {
        frame_delta.clamp(0.0, MAX_FRAME_DELTA)
    } else {
        1.0
    };
    step(state, board, dt)
}

fn step(state: &mut GameState, board: &BoardConfig, dt: f64) -> Option<ScoreEvent> {
    let ball = &mut state.ball;
    ball.pos.x += ball.vel.x * dt;
    ball.pos.y += ball.vel.y * dt;

    bounce_walls(ball, board);

    for paddle in [&state.left, &state.right] {
        if paddle.overlaps(&state.ball) {
            bounce_paddle(&mut state.ball, paddle);
        }
    }

    detect_score(&state.ball, board)
}

fn bounce_walls(ball: &mut Ball, board: &BoardConfig) {
    if ball.pos.y - ball.radius < 0.0 {
        ball.pos.y = ball.radius;
        ball.vel.y = -ball.vel.y;
    } else if ball.pos.y + ball.radius > board.height {
        ball.pos.y = board.height - ball.radius;
        ball.vel.y = -ball.vel.y;
    }
}

fn bounce_paddle(ball: &mut Ball, paddle: &Paddle) {
    let moving_right = ball.vel.x > 0.0;
    ball.vel.x *= -PADDLE_SPEEDUP;

    let half = paddle.height / 2.0;
    let hit = ((ball.pos.y - paddle.center_y()) / half).clamp(-1.0, 1.0);
    ball.vel.y += hit * ENGLISH_FACTOR;

    // Flush against the face the ball now travels away from
    ball.pos.x = if moving_right {
        paddle.x - ball.radius
    } else {
        paddle.x + paddle.width + ball.radius
    };
}

fn detect_score(ball: &Ball, board: &BoardConfig) -> Option<ScoreEvent> {
    if ball.pos.x + ball.radius < 0.0 {
        Some(ScoreEvent { scorer: Side::Right })
    } else if ball.pos.x - ball.radius > board.width {
        Some(ScoreEvent { scorer: Side::Left })
    } else {
        None
    }
}
