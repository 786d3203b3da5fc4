//! Client-side game layer
//!
//! Local prediction and authoritative-state merging for networked play, the
//! standalone single-player loop, and the collaborator traits both consume.

pub mod input;
pub mod local;
pub mod network;
pub mod opponent;
pub mod reconcile;
pub mod reconnect;

pub use input::{InputSource, Key, KeyState};
pub use local::{Frame, LocalMatch, RenderSink};
pub use network::{BotConfig, ClientError};
pub use opponent::{HeuristicOpponent, Opponent};
pub use reconcile::{ClientView, Mode};
pub use reconnect::ReconnectPolicy;
