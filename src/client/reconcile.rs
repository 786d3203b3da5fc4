//! Merging authoritative pushes into the local view
//!
//! The owned paddle is driven only by local input and is never overwritten by
//! the server's echo of it. Everything else in a push is adopted verbatim.

use crate::game::{BoardConfig, GameState, Role, Side, Vec2};
use crate::ws::protocol::{ServerMsg, StateView};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Single-player against the local opponent; pushes do not apply
    Local,
    /// Connected to an authoritative server
    Networked,
}

/// A client's derived, possibly stale copy of the game
#[derive(Debug, Clone)]
pub struct ClientView {
    board: BoardConfig,
    state: GameState,
    mode: Mode,
    role: Option<Role>,
}

impl ClientView {
    pub fn new(board: BoardConfig, state: GameState, mode: Mode) -> Self {
        Self {
            board,
            state,
            mode,
            role: None,
        }
    }

    /// View for a networked session; state is a placeholder until the first push
    pub fn networked(board: BoardConfig) -> Self {
        let state = GameState::new(&board, &mut rand::thread_rng());
        Self::new(board, state, Mode::Networked)
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Record the role the server assigned
    pub fn set_role(&mut self, role: Role) {
        self.role = Some(role);
    }

    /// The paddle this client controls, if any
    pub fn owned_side(&self) -> Option<Side> {
        self.role.and_then(Role::side)
    }

    /// Merge a push. Returns `false` when pushes do not apply to this view.
    pub fn apply_authoritative(&mut self, push: &StateView) -> bool {
        if self.mode == Mode::Local {
            return false;
        }

        let owned = self.owned_side();
        for side in Side::BOTH {
            if owned == Some(side) {
                continue;
            }
            let y = match side {
                Side::Left => push.left.y,
                Side::Right => push.right.y,
            };
            self.state.paddle_mut(side).y = y;
        }

        self.state.ball.pos = Vec2::new(push.ball.x, push.ball.y);
        self.state.ball.vel = Vec2::new(push.ball.vx, push.ball.vy);
        self.state.score = push.score;
        true
    }

    /// Feed one server message into the view
    pub fn handle(&mut self, msg: &ServerMsg) {
        match msg {
            ServerMsg::Side { side } => self.set_role(*side),
            ServerMsg::State { state } => {
                self.apply_authoritative(state);
            }
            ServerMsg::Unknown => {}
        }
    }

    /// Apply local input to the owned paddle immediately.
    ///
    /// `direction` is clamped to `[-1, 1]`; returns the new paddle y to send
    /// to the server, or `None` when this client owns no paddle.
    pub fn predict(&mut self, direction: f64, frame_delta: f64) -> Option<f64> {
        let side = self.owned_side()?;
        let dy = direction.clamp(-1.0, 1.0) * self.board.paddle_speed * frame_delta;
        let paddle = self.state.paddle_mut(side);
        paddle.shift(dy, &self.board);
        Some(paddle.y)
    }
}
