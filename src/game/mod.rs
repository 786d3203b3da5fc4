//! Game simulation modules

pub mod board;
pub mod physics;
pub mod roles;
pub mod rules;
pub mod session;
pub mod snapshot;

pub use board::BoardConfig;
pub use physics::{Ball, GameState, Paddle, Score, ScoreEvent, Vec2};
pub use roles::{ConnectionId, Role, RoleRegistry, Side};
pub use rules::ScorePolicy;
pub use session::{GameSession, SessionCommand, SessionError, SessionHandle};
pub use snapshot::SessionStats;
