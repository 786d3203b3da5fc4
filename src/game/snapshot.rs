//! Snapshot building for network transmission

use serde::Serialize;

use crate::ws::protocol::{ServerMsg, StateView};

use super::physics::{GameState, Score};

/// Builds the per-tick `state` message
#[derive(Debug, Default)]
pub struct SnapshotBuilder;

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot of a fully mutated tick
    pub fn build(&self, state: &GameState) -> ServerMsg {
        ServerMsg::State {
            state: StateView::from(state),
        }
    }
}

/// Counters the session publishes after every tick, read by `/health`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub tick: u64,
    pub connections: usize,
    pub players: usize,
    pub score: Score,
}
