//! WebSocket upgrade handler

use std::time::Duration;

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval_at, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{ConnectionId, Role, SessionHandle};
use crate::http::middleware::admit;
use crate::util::rate_limit::MoveRateLimiter;
use crate::ws::protocol::{ClientMsg, ProtocolError, ServerMsg};

/// How long the writer may take to flush a final close frame
const WRITER_DRAIN: Duration = Duration::from_secs(1);

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Shared access token, required when the server has one configured
    pub token: Option<String>,
}

/// Why a connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    ClientClosed,
    ProtocolViolation,
    ProbeTimeout,
    TransportError,
    SessionGone,
}

#[derive(Debug, thiserror::Error)]
enum SendError {
    #[error("encode failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("transport failed: {0}")]
    Transport(#[from] axum::Error),
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    // Admission runs before upgrade, so a rejected peer never reaches role assignment
    if let Err(e) = admit(&headers, query.token.as_deref(), &state.config) {
        warn!(error = %e, "WebSocket admission rejected");
        return e.into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = Uuid::new_v4();
    let (mut ws_sink, ws_stream) = socket.split();

    let role = match state.session.connect(conn_id).await {
        Ok(role) => role,
        Err(e) => {
            error!(conn_id = %conn_id, error = %e, "Failed to register connection");
            return;
        }
    };
    info!(conn_id = %conn_id, role = ?role, "New WebSocket connection");

    // Subscribe before announcing the side so the first state follows it
    let state_rx = state.session.subscribe();

    let end = match send_msg(&mut ws_sink, &ServerMsg::Side { side: role }).await {
        Ok(()) => {
            run_session(
                conn_id,
                role,
                state.config.probe_interval,
                &state.session,
                ws_sink,
                ws_stream,
                state_rx,
            )
            .await
        }
        Err(e) => {
            warn!(conn_id = %conn_id, error = %e, "Failed to send side");
            SessionEnd::TransportError
        }
    };

    // Cleanup on disconnect; releasing twice is harmless
    let _ = state.session.disconnect(conn_id).await;

    info!(conn_id = %conn_id, reason = ?end, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    conn_id: ConnectionId,
    role: Role,
    probe_interval: Duration,
    session: &SessionHandle,
    ws_sink: SplitSink<WebSocket, Message>,
    mut ws_stream: SplitStream<WebSocket>,
    state_rx: broadcast::Receiver<ServerMsg>,
) -> SessionEnd {
    let rate_limiter = MoveRateLimiter::new();

    // Control frames (probes, close) share the writer with state pushes
    let (control_tx, control_rx) = mpsc::channel::<Message>(8);
    let mut writer = tokio::spawn(write_loop(conn_id, ws_sink, state_rx, control_rx));

    let mut probe = interval_at(Instant::now() + probe_interval, probe_interval);
    let mut awaiting_pong = false;

    // Reader loop: WebSocket -> session
    let end = loop {
        tokio::select! {
            frame = ws_stream.next() => match frame {
                Some(Ok(Message::Text(text))) => match ClientMsg::decode(&text) {
                    Ok(ClientMsg::Move { y }) => {
                        if !rate_limiter.check_move() {
                            debug!(conn_id = %conn_id, "Rate limited move");
                        } else if session.submit_move(conn_id, y).await.is_err() {
                            break SessionEnd::SessionGone;
                        }
                    }
                    Ok(ClientMsg::Unknown) => {
                        debug!(conn_id = %conn_id, role = ?role, "Ignoring unrecognized message type");
                    }
                    Err(e) => {
                        break protocol_violation(conn_id, &control_tx, e).await;
                    }
                },
                Some(Ok(Message::Binary(_))) => {
                    break protocol_violation(conn_id, &control_tx, ProtocolError::Binary).await;
                }
                Some(Ok(Message::Pong(_))) => {
                    debug!(conn_id = %conn_id, "Received pong");
                    awaiting_pong = false;
                }
                Some(Ok(Message::Ping(_))) => {
                    debug!(conn_id = %conn_id, "Received ping");
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!(conn_id = %conn_id, "Client initiated close");
                    break SessionEnd::ClientClosed;
                }
                Some(Err(e)) => {
                    warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                    break SessionEnd::TransportError;
                }
            },
            _ = probe.tick() => {
                if awaiting_pong {
                    warn!(conn_id = %conn_id, "Liveness probe unanswered, terminating");
                    break SessionEnd::ProbeTimeout;
                }
                awaiting_pong = true;
                if control_tx.send(Message::Ping(Vec::new())).await.is_err() {
                    break SessionEnd::TransportError;
                }
            }
        }
    };

    if end == SessionEnd::ProbeTimeout {
        writer.abort();
    } else {
        // Let the writer flush a queued close frame, then stop it
        drop(control_tx);
        if tokio::time::timeout(WRITER_DRAIN, &mut writer).await.is_err() {
            writer.abort();
        }
    }

    end
}

async fn protocol_violation(
    conn_id: ConnectionId,
    control_tx: &mpsc::Sender<Message>,
    error: ProtocolError,
) -> SessionEnd {
    warn!(conn_id = %conn_id, error = %error, "Protocol violation, closing connection");
    let frame = CloseFrame {
        code: close_code::PROTOCOL,
        reason: "malformed message".into(),
    };
    let _ = control_tx.send(Message::Close(Some(frame))).await;
    SessionEnd::ProtocolViolation
}

/// Writer task: control frames and broadcast states -> WebSocket
async fn write_loop(
    conn_id: ConnectionId,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut state_rx: broadcast::Receiver<ServerMsg>,
    mut control_rx: mpsc::Receiver<Message>,
) {
    loop {
        tokio::select! {
            biased;
            control = control_rx.recv() => match control {
                Some(msg) => {
                    let closing = matches!(msg, Message::Close(_));
                    if let Err(e) = ws_sink.send(msg).await {
                        debug!(conn_id = %conn_id, error = %e, "WebSocket send failed");
                        break;
                    }
                    if closing {
                        break;
                    }
                }
                None => break,
            },
            update = state_rx.recv() => match update {
                Ok(msg) => {
                    if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                        debug!(conn_id = %conn_id, error = %e, "WebSocket send failed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    // Slow peer: drop the missed states, keep the newest
                    warn!(conn_id = %conn_id, lagged_count = n, "Client lagged, skipping {} states", n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(conn_id = %conn_id, "State channel closed");
                    break;
                }
            },
        }
    }
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), SendError> {
    let json = msg.encode()?;
    sink.send(Message::Text(json)).await?;
    Ok(())
}
