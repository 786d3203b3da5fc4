//! Authoritative session state and fixed-rate tick loop
//!
//! One task owns the [`GameState`] and the [`RoleRegistry`]. Connection
//! handlers never touch either; they enqueue [`SessionCommand`]s through a
//! [`SessionHandle`] and receive state through a broadcast channel.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::util::time::tick_duration;
use crate::ws::protocol::ServerMsg;

use super::board::BoardConfig;
use super::physics::{self, GameState, ScoreEvent};
use super::roles::{ConnectionId, Role, RoleRegistry, Side};
use super::rules::{self, ScorePolicy};
use super::snapshot::{SessionStats, SnapshotBuilder};

const COMMAND_QUEUE: usize = 256;
const STATE_QUEUE: usize = 64;

/// Requests handed to the session task
#[derive(Debug)]
pub enum SessionCommand {
    /// A transport connection was accepted; reply with its role
    Connect {
        conn_id: ConnectionId,
        reply: oneshot::Sender<Role>,
    },
    /// A transport connection is gone
    Disconnect { conn_id: ConnectionId },
    /// Move the sender's paddle to `y` on the next tick
    Move { conn_id: ConnectionId, y: f64 },
    /// Zero the score and restart the round
    ResetMatch,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Game session is not running")]
    Closed,
}

/// Cloneable front door to the session task
#[derive(Clone)]
pub struct SessionHandle {
    command_tx: mpsc::Sender<SessionCommand>,
    state_tx: broadcast::Sender<ServerMsg>,
    stats_rx: watch::Receiver<SessionStats>,
}

impl SessionHandle {
    /// Register a connection and wait for its role
    pub async fn connect(&self, conn_id: ConnectionId) -> Result<Role, SessionError> {
        let (reply, role_rx) = oneshot::channel();
        self.send(SessionCommand::Connect { conn_id, reply }).await?;
        role_rx.await.map_err(|_| SessionError::Closed)
    }

    pub async fn disconnect(&self, conn_id: ConnectionId) -> Result<(), SessionError> {
        self.send(SessionCommand::Disconnect { conn_id }).await
    }

    pub async fn submit_move(&self, conn_id: ConnectionId, y: f64) -> Result<(), SessionError> {
        self.send(SessionCommand::Move { conn_id, y }).await
    }

    pub async fn reset_match(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::ResetMatch).await
    }

    /// Receive every state broadcast from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMsg> {
        self.state_tx.subscribe()
    }

    /// Counters as of the last completed tick
    pub fn stats(&self) -> SessionStats {
        *self.stats_rx.borrow()
    }

    async fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| SessionError::Closed)
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingMove {
    conn_id: ConnectionId,
    y: f64,
}

/// The authoritative game session
pub struct GameSession {
    board: BoardConfig,
    state: GameState,
    roles: RoleRegistry,
    pending: [Option<PendingMove>; 2],
    policy: ScorePolicy,
    rng: ChaCha8Rng,
    tick: u64,
    command_rx: mpsc::Receiver<SessionCommand>,
    state_tx: broadcast::Sender<ServerMsg>,
    stats_tx: watch::Sender<SessionStats>,
    snapshot_builder: SnapshotBuilder,
}

impl GameSession {
    /// Create a session. `seed` fixes the serve sequence; `None` draws from entropy.
    pub fn new(board: BoardConfig, seed: Option<u64>) -> (Self, SessionHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
        let (state_tx, _) = broadcast::channel(STATE_QUEUE);
        let (stats_tx, stats_rx) = watch::channel(SessionStats::default());

        let mut rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let state = GameState::new(&board, &mut rng);

        let handle = SessionHandle {
            command_tx,
            state_tx: state_tx.clone(),
            stats_rx,
        };

        let session = Self {
            board,
            state,
            roles: RoleRegistry::new(),
            pending: [None, None],
            policy: ScorePolicy::RoundReset,
            rng,
            tick: 0,
            command_rx,
            state_tx,
            stats_tx,
            snapshot_builder: SnapshotBuilder::new(),
        };

        (session, handle)
    }

    /// Run the authoritative tick loop until every handle is dropped
    pub async fn run(mut self) {
        info!(
            width = self.board.width,
            height = self.board.height,
            "Game session started"
        );

        let mut tick_interval = interval(tick_duration());
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = tick_interval.tick() => {
                    self.step();
                }
                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
            }
        }

        info!(ticks = self.tick, "Game session stopped");
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn roles(&self) -> &RoleRegistry {
        &self.roles
    }

    fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Connect { conn_id, reply } => {
                let role = self.roles.assign(conn_id);
                info!(conn_id = %conn_id, role = ?role, "Connection joined");
                if reply.send(role).is_err() {
                    // The handler went away before hearing back
                    self.release(conn_id);
                }
            }
            SessionCommand::Disconnect { conn_id } => {
                self.release(conn_id);
            }
            SessionCommand::Move { conn_id, y } => {
                self.queue_move(conn_id, y);
            }
            SessionCommand::ResetMatch => {
                rules::reset_match(&mut self.state, &self.board, &mut self.rng);
                self.pending = [None, None];
                info!("Match reset");
            }
        }
    }

    fn release(&mut self, conn_id: ConnectionId) {
        if let Some(role) = self.roles.release(conn_id) {
            info!(conn_id = %conn_id, role = ?role, "Connection left");
        }
    }

    fn queue_move(&mut self, conn_id: ConnectionId, y: f64) {
        if !y.is_finite() {
            debug!(conn_id = %conn_id, "Dropping non-finite move");
            return;
        }

        let Some(side) = self.roles.role_of(conn_id).and_then(Role::side) else {
            debug!(conn_id = %conn_id, "Ignoring move from connection without a side");
            return;
        };

        // Last write wins until the next tick
        self.pending[slot(side)] = Some(PendingMove { conn_id, y });
    }

    /// Apply queued moves, advance one tick, score, broadcast
    pub fn step(&mut self) -> Option<ScoreEvent> {
        self.apply_pending_moves();

        let event = physics::tick(&mut self.state, &self.board);
        if let Some(event) = event {
            self.policy
                .apply(&mut self.state, event, &self.board, &mut self.rng);
            info!(
                scorer = ?event.scorer,
                left = self.state.score.left,
                right = self.state.score.right,
                "Point scored"
            );
        }
        self.tick += 1;

        let snapshot = self.snapshot_builder.build(&self.state);
        // No receivers just means nobody is connected
        let _ = self.state_tx.send(snapshot);

        self.stats_tx.send_replace(SessionStats {
            tick: self.tick,
            connections: self.roles.len(),
            players: self.roles.players(),
            score: self.state.score,
        });

        event
    }

    fn apply_pending_moves(&mut self) {
        for side in Side::BOTH {
            let Some(pending) = self.pending[slot(side)].take() else {
                continue;
            };

            // Ownership is checked again here: the sender may have left since queueing
            if self.roles.holder(side) != Some(pending.conn_id) {
                debug!(conn_id = %pending.conn_id, "Discarding move from former holder");
                continue;
            }

            self.state.paddle_mut(side).set_y(pending.y, &self.board);
        }
    }
}

fn slot(side: Side) -> usize {
    match side {
        Side::Left => 0,
        Side::Right => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::physics::{Ball, Score, Vec2};
    use std::time::Duration;
    use uuid::Uuid;

    fn session() -> (GameSession, SessionHandle) {
        GameSession::new(BoardConfig::default(), Some(11))
    }

    fn join(session: &mut GameSession) -> (ConnectionId, Role) {
        let conn_id = Uuid::new_v4();
        let (reply, mut role_rx) = oneshot::channel();
        session.handle_command(SessionCommand::Connect { conn_id, reply });
        let role = role_rx.try_recv().expect("session replies synchronously");
        (conn_id, role)
    }

    fn park_ball(session: &mut GameSession) {
        session.state.ball = Ball::new(Vec2::new(400.0, 300.0), Vec2::new(0.5, 0.0), 8.0);
    }

    #[test]
    fn test_last_move_before_tick_wins() {
        let (mut session, _handle) = session();
        let (left, _) = join(&mut session);

        session.handle_command(SessionCommand::Move { conn_id: left, y: 40.0 });
        session.handle_command(SessionCommand::Move { conn_id: left, y: 75.0 });
        session.step();

        assert_eq!(session.state().left.y, 75.0);
    }

    #[test]
    fn test_repeated_move_is_not_additive() {
        let (mut session, _handle) = session();
        let (left, _) = join(&mut session);

        session.handle_command(SessionCommand::Move { conn_id: left, y: 90.0 });
        session.handle_command(SessionCommand::Move { conn_id: left, y: 90.0 });
        session.step();

        assert_eq!(session.state().left.y, 90.0);
    }

    #[test]
    fn test_moves_are_clamped() {
        let (mut session, _handle) = session();
        let (left, _) = join(&mut session);
        let (right, _) = join(&mut session);
        let max = session.board.max_paddle_y();

        for (submitted, expected) in [(-30.0, 0.0), (650.0, max), (1e12, max), (499.0, 499.0)] {
            session.handle_command(SessionCommand::Move { conn_id: left, y: submitted });
            session.handle_command(SessionCommand::Move { conn_id: right, y: submitted });
            session.step();
            assert_eq!(session.state().left.y, expected);
            assert_eq!(session.state().right.y, expected);
        }
    }

    #[test]
    fn test_non_finite_moves_are_dropped() {
        let (mut session, _handle) = session();
        let (left, _) = join(&mut session);
        let before = session.state().left.y;

        for y in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            session.handle_command(SessionCommand::Move { conn_id: left, y });
            session.step();
        }

        assert_eq!(session.state().left.y, before);
    }

    #[test]
    fn test_spectator_moves_are_ignored() {
        let (mut session, _handle) = session();
        join(&mut session);
        join(&mut session);
        let (spectator, role) = join(&mut session);
        assert_eq!(role, Role::Spectator);
        let before = session.state().clone();

        session.handle_command(SessionCommand::Move { conn_id: spectator, y: 10.0 });
        session.step();

        assert_eq!(session.state().left.y, before.left.y);
        assert_eq!(session.state().right.y, before.right.y);
    }

    #[test]
    fn test_move_from_departed_holder_is_discarded() {
        let (mut session, _handle) = session();
        let (left, _) = join(&mut session);

        session.handle_command(SessionCommand::Move { conn_id: left, y: 12.0 });
        session.handle_command(SessionCommand::Disconnect { conn_id: left });
        let (newcomer, role) = join(&mut session);
        assert_eq!(role, Role::Left);
        session.step();

        assert_eq!(session.state().left.y, session.board.center_paddle_y());

        session.handle_command(SessionCommand::Move { conn_id: newcomer, y: 12.0 });
        session.step();
        assert_eq!(session.state().left.y, 12.0);
    }

    #[test]
    fn test_role_churn() {
        let (mut session, _handle) = session();
        let (left, _) = join(&mut session);
        join(&mut session);
        let (_, third) = join(&mut session);
        assert_eq!(third, Role::Spectator);

        session.handle_command(SessionCommand::Disconnect { conn_id: left });
        let (_, fourth) = join(&mut session);
        assert_eq!(fourth, Role::Left);
    }

    #[test]
    fn test_dropped_reply_releases_role() {
        let (mut session, _handle) = session();
        let conn_id = Uuid::new_v4();
        let (reply, role_rx) = oneshot::channel();
        drop(role_rx);

        session.handle_command(SessionCommand::Connect { conn_id, reply });

        assert!(session.roles().is_empty());
    }

    #[test]
    fn test_score_resets_round_and_keeps_score() {
        let (mut session, _handle) = session();
        session.state.score = Score { left: 4, right: 1 };
        session.state.left.y = 0.0;
        session.state.ball = Ball::new(Vec2::new(-10.0, 300.0), Vec2::new(-5.0, 0.0), 8.0);

        let event = session.step();

        assert_eq!(event, Some(ScoreEvent { scorer: Side::Right }));
        assert_eq!(session.state().score, Score { left: 4, right: 2 });
        assert_eq!(session.state().ball.pos, Vec2::new(400.0, 300.0));
        assert!(session.state().ball.vel.length() > 0.0);
        assert_eq!(session.state().left.y, session.board.center_paddle_y());
    }

    #[test]
    fn test_reset_match_zeroes_score() {
        let (mut session, _handle) = session();
        session.state.score = Score { left: 3, right: 3 };

        session.handle_command(SessionCommand::ResetMatch);

        assert_eq!(session.state().score, Score::default());
    }

    #[test]
    fn test_ticks_without_connections() {
        let (mut session, handle) = session();
        for _ in 0..120 {
            session.step();
        }
        assert_eq!(handle.stats().tick, 120);
        assert_eq!(handle.stats().connections, 0);
    }

    #[test]
    fn test_broadcast_carries_post_tick_state() {
        let (mut session, handle) = session();
        let mut states = handle.subscribe();
        let (left, _) = join(&mut session);
        park_ball(&mut session);

        session.handle_command(SessionCommand::Move { conn_id: left, y: 33.0 });
        session.step();

        let ServerMsg::State { state } = states.try_recv().expect("one state per tick") else {
            panic!("Expected a state message");
        };
        assert_eq!(state.left.y, 33.0);
        assert_eq!(state.ball.x, 400.5);
        assert_eq!(handle.stats().players, 1);
    }

    #[tokio::test]
    async fn test_running_session_serves_handles() {
        let (session, handle) = session();
        let task = tokio::spawn(session.run());

        let first = handle.connect(Uuid::new_v4()).await.expect("session running");
        let second_id = Uuid::new_v4();
        let second = handle.connect(second_id).await.expect("session running");
        assert_eq!((first, second), (Role::Left, Role::Right));

        let mut states = handle.subscribe();
        handle.submit_move(second_id, 5.0).await.expect("session running");

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            let msg = tokio::time::timeout_at(deadline, states.recv())
                .await
                .expect("state arrives before deadline")
                .expect("channel open");
            if let ServerMsg::State { state } = msg {
                if state.right.y == 5.0 {
                    break;
                }
            }
        }

        drop(states);
        drop(handle);
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("session stops once handles are gone")
            .expect("session task did not panic");
    }
}
