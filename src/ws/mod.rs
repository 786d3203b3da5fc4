//! WebSocket transport

pub mod handler;
pub mod protocol;

pub use protocol::{ClientMsg, ProtocolError, ServerMsg, StateView};
