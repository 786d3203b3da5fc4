//! End-to-end socket tests against a live router and session loop

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use pong_server::client::{network, BotConfig, ClientError, Opponent, ReconnectPolicy};
use pong_server::game::{Ball, BoardConfig, Paddle, Role};
use pong_server::http::build_router;
use pong_server::ws::{ClientMsg, ServerMsg, StateView};
use pong_server::{AppState, Config};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(2);

async fn spawn_server(vars: &[(&str, &str)]) -> SocketAddr {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();

    let (state, session) = AppState::new(config);
    tokio::spawn(session.run());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr) -> (Client, Role) {
    let (mut client, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    match next_server_msg(&mut client).await {
        ServerMsg::Side { side } => (client, side),
        other => panic!("expected side first, got {:?}", other),
    }
}

async fn next_server_msg(client: &mut Client) -> ServerMsg {
    loop {
        let frame = timeout(WAIT, client.next())
            .await
            .expect("timed out waiting for a message")
            .expect("stream ended")
            .expect("transport error");
        if let Message::Text(text) = frame {
            return ServerMsg::decode(&text).unwrap();
        }
    }
}

async fn next_state(client: &mut Client) -> StateView {
    loop {
        if let ServerMsg::State { state } = next_server_msg(client).await {
            return state;
        }
    }
}

#[tokio::test]
async fn test_roles_follow_arrival_order_and_free_on_leave() {
    let addr = spawn_server(&[]).await;

    let (mut first, role) = connect(addr).await;
    assert_eq!(role, Role::Left);
    let (_second, role) = connect(addr).await;
    assert_eq!(role, Role::Right);
    let (_third, role) = connect(addr).await;
    assert_eq!(role, Role::Spectator);

    tokio_test::assert_ok!(first.close(None).await);
    tokio::time::sleep(Duration::from_millis(200)).await;

    let (_fourth, role) = connect(addr).await;
    assert_eq!(role, Role::Left);
}

#[tokio::test]
async fn test_states_stream_and_moves_apply() {
    let addr = spawn_server(&[("MATCH_SEED", "5")]).await;
    let (mut client, role) = connect(addr).await;
    assert_eq!(role, Role::Left);

    let state = next_state(&mut client).await;
    assert!(state.ball.vx != 0.0);

    let msg = ClientMsg::Move { y: 123.0 }.encode().unwrap();
    client.send(Message::Text(msg)).await.unwrap();

    let mut seen = false;
    for _ in 0..30 {
        if next_state(&mut client).await.left.y == 123.0 {
            seen = true;
            break;
        }
    }
    assert!(seen, "move never showed up in a broadcast");
}

#[tokio::test]
async fn test_unknown_message_type_is_ignored() {
    let addr = spawn_server(&[]).await;
    let (mut client, _) = connect(addr).await;

    client
        .send(Message::Text(r#"{"type":"chat","text":"hi"}"#.to_string()))
        .await
        .unwrap();

    // Still receiving states afterwards
    next_state(&mut client).await;
    next_state(&mut client).await;
}

#[tokio::test]
async fn test_malformed_message_closes_with_protocol_error() {
    let addr = spawn_server(&[]).await;
    let (mut client, role) = connect(addr).await;
    assert_eq!(role, Role::Left);

    client
        .send(Message::Text("not json".to_string()))
        .await
        .unwrap();

    let close = loop {
        let frame = timeout(WAIT, client.next())
            .await
            .expect("timed out waiting for close")
            .expect("stream ended before close")
            .expect("transport error");
        if let Message::Close(close) = frame {
            break close;
        }
    };
    assert_eq!(close.map(|c| c.code), Some(CloseCode::Protocol));

    tokio::time::sleep(Duration::from_millis(200)).await;
    let (_next, role) = connect(addr).await;
    assert_eq!(role, Role::Left);
}

#[tokio::test]
async fn test_token_admission() {
    let addr = spawn_server(&[("ACCESS_TOKEN", "s3cret")]).await;

    match connect_async(format!("ws://{}/ws", addr)).await {
        Err(tungstenite::Error::Http(response)) => assert_eq!(response.status(), 401),
        other => panic!("expected 401 rejection, got {:?}", other.map(|_| ())),
    }
    match connect_async(format!("ws://{}/ws?token=wrong", addr)).await {
        Err(tungstenite::Error::Http(response)) => assert_eq!(response.status(), 401),
        other => panic!("expected 401 rejection, got {:?}", other.map(|_| ())),
    }

    let (mut client, _) = connect_async(format!("ws://{}/ws?token=s3cret", addr))
        .await
        .unwrap();
    // A rejected attempt never took a paddle
    assert_eq!(
        next_server_msg(&mut client).await,
        ServerMsg::Side { side: Role::Left }
    );
}

#[tokio::test]
async fn test_silent_peer_is_terminated_and_releases_role() {
    let addr = spawn_server(&[("PROBE_INTERVAL_SECS", "1")]).await;

    // Never polled again, so the server's ping goes unanswered
    let (_silent, role) = connect(addr).await;
    assert_eq!(role, Role::Left);

    tokio::time::sleep(Duration::from_millis(2600)).await;

    let (_next, role) = connect(addr).await;
    assert_eq!(role, Role::Left);
}

/// Always pushes the paddle to the top
struct Climb;

impl Opponent for Climb {
    fn paddle_direction(&self, _paddle: &Paddle, _ball: &Ball) -> f64 {
        -1.0
    }
}

#[tokio::test]
async fn test_headless_client_moves_authoritative_paddle() {
    let addr = spawn_server(&[]).await;

    let (socket, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    let bot = tokio::spawn(async move {
        network::play(socket, BoardConfig::default(), &Climb).await
    });

    // Watch from the other paddle; the bot holds whichever one is left over
    let (mut observer, role) = connect(addr).await;
    assert!(matches!(role, Role::Left | Role::Right));

    let reached_top = timeout(Duration::from_secs(5), async {
        loop {
            let state = next_state(&mut observer).await;
            let bot_y = if role == Role::Left { state.right.y } else { state.left.y };
            if bot_y == 0.0 {
                break;
            }
        }
    })
    .await;
    assert!(reached_top.is_ok(), "predicted moves never reached the server");

    bot.abort();
}

#[tokio::test]
async fn test_headless_client_gives_up_after_max_attempts() {
    // Bind then drop to get a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = BotConfig {
        server_url: format!("ws://{}/ws", addr),
        token: None,
        log_level: "info".to_string(),
        reconnect: ReconnectPolicy::fixed(Duration::from_millis(10)).with_max_attempts(2),
        board: BoardConfig::default(),
    };

    let result = timeout(WAIT, network::run(&config, &Climb))
        .await
        .expect("run should stop once attempts are exhausted");
    assert!(matches!(result, Err(ClientError::GaveUp(2))));
}
