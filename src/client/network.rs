//! Networked client: connect, predict, reconcile, reconnect

use std::env;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::time::{interval, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use super::opponent::Opponent;
use super::reconcile::ClientView;
use super::reconnect::ReconnectPolicy;
use crate::config::ConfigError;
use crate::game::BoardConfig;
use crate::util::time::tick_duration;
use crate::ws::protocol::{ClientMsg, ProtocolError, ServerMsg};

/// Settings for the headless client
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Socket endpoint, e.g. `ws://127.0.0.1:8080/ws`
    pub server_url: String,
    pub token: Option<String>,
    pub log_level: String,
    pub reconnect: ReconnectPolicy,
    /// Must match the server's geometry for prediction to line up
    pub board: BoardConfig,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse_ms = |key: &'static str, default: u64| -> Result<Duration, ConfigError> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map(Duration::from_millis)
                    .map_err(|_| ConfigError::Invalid(key)),
                None => Ok(Duration::from_millis(default)),
            }
        };

        let initial = parse_ms("RECONNECT_DELAY_MS", 1000)?;
        let mut reconnect = match lookup("RECONNECT_MAX_DELAY_MS") {
            Some(_) => ReconnectPolicy::exponential(initial, parse_ms("RECONNECT_MAX_DELAY_MS", 0)?),
            None => ReconnectPolicy::fixed(initial),
        };
        if let Some(raw) = lookup("RECONNECT_MAX_ATTEMPTS") {
            let attempts = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("RECONNECT_MAX_ATTEMPTS"))?;
            reconnect = reconnect.with_max_attempts(attempts);
        }

        Ok(Self {
            server_url: lookup("PONG_SERVER_URL")
                .unwrap_or_else(|| "ws://127.0.0.1:8080/ws".to_string()),
            token: lookup("PONG_TOKEN").filter(|t| !t.is_empty()),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            reconnect,
            board: BoardConfig::default(),
        })
    }

    /// Endpoint with the access token attached, if any
    pub fn connect_url(&self) -> String {
        match &self.token {
            Some(token) => {
                let sep = if self.server_url.contains('?') { '&' } else { '?' };
                format!("{}{}token={}", self.server_url, sep, token)
            }
            None => self.server_url.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("WebSocket error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Gave up after {0} reconnect attempts")]
    GaveUp(u32),
}

/// Frames between resends of an unchanged paddle position
const RESEND_FRAMES: u32 = 30;

/// Decides when the predicted paddle position goes out.
///
/// A changed position is sent at once. An unchanged one is repeated every
/// [`RESEND_FRAMES`] so a move dropped by the server's rate limit gets corrected.
#[derive(Debug, Default)]
struct MoveOutbox {
    last_sent: Option<f64>,
    idle_frames: u32,
}

impl MoveOutbox {
    fn should_send(&mut self, y: f64) -> bool {
        if self.last_sent != Some(y) || self.idle_frames + 1 >= RESEND_FRAMES {
            self.last_sent = Some(y);
            self.idle_frames = 0;
            true
        } else {
            self.idle_frames += 1;
            false
        }
    }
}

/// Play until the reconnect policy runs out
pub async fn run<O: Opponent>(config: &BotConfig, opponent: &O) -> Result<(), ClientError> {
    let url = config.connect_url();
    let mut attempt = 0u32;

    loop {
        match connect_async(url.as_str()).await {
            Ok((socket, _)) => {
                info!(url = %config.server_url, "Connected");
                attempt = 0;
                match play(socket, config.board, opponent).await {
                    Ok(()) => info!("Server closed the connection"),
                    Err(e) => warn!(error = %e, "Connection lost"),
                }
            }
            Err(e) => warn!(error = %e, attempt, "Connect failed"),
        }

        attempt += 1;
        let Some(delay) = config.reconnect.delay_for(attempt) else {
            return Err(ClientError::GaveUp(attempt - 1));
        };
        debug!(delay_ms = delay.as_millis() as u64, attempt, "Reconnecting");
        tokio::time::sleep(delay).await;
    }
}

/// One connection's lifetime
pub async fn play<S, O>(socket: S, board: BoardConfig, opponent: &O) -> Result<(), ClientError>
where
    S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
        + futures::Sink<Message, Error = tokio_tungstenite::tungstenite::Error>
        + Unpin,
    O: Opponent + ?Sized,
{
    let (mut sink, mut stream) = socket.split();
    let mut view = ClientView::networked(board);
    let mut outbox = MoveOutbox::default();

    let mut frame = interval(tick_duration());
    frame.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let msg = ServerMsg::decode(&text)?;
                    if let ServerMsg::Side { side } = &msg {
                        info!(role = ?side, "Role assigned");
                    }
                    view.handle(&msg);
                }
                Some(Ok(Message::Ping(_))) => {
                    // The pong reply is queued by the protocol layer; push it out
                    sink.flush().await?;
                }
                Some(Ok(Message::Close(close))) => {
                    debug!(close = ?close, "Close received");
                    return Ok(());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(()),
            },
            _ = frame.tick() => {
                let Some(side) = view.owned_side() else {
                    continue;
                };
                let state = view.state();
                let direction = opponent.paddle_direction(state.paddle(side), &state.ball);
                if let Some(y) = view.predict(direction, 1.0) {
                    if outbox.should_send(y) {
                        sink.send(Message::Text(ClientMsg::Move { y }.encode()?)).await?;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<BotConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BotConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.server_url, "ws://127.0.0.1:8080/ws");
        assert_eq!(config.connect_url(), "ws://127.0.0.1:8080/ws");
        assert_eq!(config.reconnect, ReconnectPolicy::default());
    }

    #[test]
    fn test_token_is_appended() {
        let config = config_from(&[("PONG_TOKEN", "abc")]).unwrap();
        assert_eq!(config.connect_url(), "ws://127.0.0.1:8080/ws?token=abc");

        let config = config_from(&[
            ("PONG_SERVER_URL", "ws://host/ws?room=1"),
            ("PONG_TOKEN", "abc"),
        ])
        .unwrap();
        assert_eq!(config.connect_url(), "ws://host/ws?room=1&token=abc");
    }

    #[test]
    fn test_reconnect_settings() {
        let config = config_from(&[
            ("RECONNECT_DELAY_MS", "250"),
            ("RECONNECT_MAX_DELAY_MS", "4000"),
            ("RECONNECT_MAX_ATTEMPTS", "5"),
        ])
        .unwrap();
        assert_eq!(config.reconnect.delay_for(1), Some(Duration::from_millis(250)));
        assert_eq!(config.reconnect.delay_for(5), Some(Duration::from_millis(4000)));
        assert_eq!(config.reconnect.delay_for(6), None);

        assert!(matches!(
            config_from(&[("RECONNECT_MAX_ATTEMPTS", "lots")]),
            Err(ConfigError::Invalid("RECONNECT_MAX_ATTEMPTS"))
        ));
    }

    #[test]
    fn test_unchanged_position_is_resent_periodically() {
        let mut outbox = MoveOutbox::default();
        assert!(outbox.should_send(250.0));

        for _ in 1..RESEND_FRAMES {
            assert!(!outbox.should_send(250.0));
        }
        assert!(outbox.should_send(250.0));
    }

    #[test]
    fn test_changed_position_is_sent_at_once() {
        let mut outbox = MoveOutbox::default();
        assert!(outbox.should_send(250.0));
        assert!(!outbox.should_send(250.0));
        assert!(outbox.should_send(244.0));
        assert!(!outbox.should_send(244.0));
    }
}
