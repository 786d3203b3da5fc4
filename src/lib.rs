//! Pong Server - authoritative two-player pong over WebSockets
//!
//! - `game`: simulation engine, role registry and the authoritative session loop
//! - `ws`: wire protocol and per-connection handling
//! - `http`: router, health and admission checks
//! - `client`: client-side reconciliation, local play and reconnect policy

pub mod app;
pub mod client;
pub mod config;
pub mod game;
pub mod http;
pub mod util;
pub mod ws;

pub use app::AppState;
pub use config::Config;
