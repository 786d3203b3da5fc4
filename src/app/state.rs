//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::{GameSession, SessionHandle};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub session: SessionHandle,
}

impl AppState {
    /// Build the state and the session task that must be spawned alongside it
    pub fn new(config: Config) -> (Self, GameSession) {
        let config = Arc::new(config);

        // Initialize the authoritative session
        let (session, handle) = GameSession::new(config.board, config.match_seed);

        let state = Self {
            config,
            session: handle,
        };

        (state, session)
    }
}
