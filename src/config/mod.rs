//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::game::BoardConfig;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Origins allowed to open a game socket. Empty allows any origin.
    pub allowed_origins: Vec<String>,
    /// Shared secret clients must present as `?token=`. `None` disables the check.
    pub access_token: Option<String>,

    /// Interval between liveness probes on each connection
    pub probe_interval: Duration,
    /// Seed for the serve sequence; `None` seeds from entropy
    pub match_seed: Option<u64>,

    /// Board geometry, fixed for the process lifetime
    pub board: BoardConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // PORT wins when the host provides one, then SERVER_ADDR, then the default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        let defaults = BoardConfig::default();
        let board = BoardConfig {
            width: parse_or(&lookup, "BOARD_WIDTH", defaults.width)?,
            height: parse_or(&lookup, "BOARD_HEIGHT", defaults.height)?,
            ball_speed: parse_or(&lookup, "BALL_SPEED", defaults.ball_speed)?,
            ..defaults
        };
        if !board.width.is_finite() || board.width <= 2.0 * (board.paddle_inset + board.paddle_width) {
            return Err(ConfigError::Invalid("BOARD_WIDTH"));
        }
        if !board.height.is_finite() || board.height <= board.paddle_height {
            return Err(ConfigError::Invalid("BOARD_HEIGHT"));
        }
        if !board.ball_speed.is_finite() || board.ball_speed <= 0.0 {
            return Err(ConfigError::Invalid("BALL_SPEED"));
        }

        let probe_secs: u64 = parse_or(&lookup, "PROBE_INTERVAL_SECS", 30)?;
        if probe_secs == 0 {
            return Err(ConfigError::Invalid("PROBE_INTERVAL_SECS"));
        }

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),

            allowed_origins: lookup("ALLOWED_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            access_token: lookup("ACCESS_TOKEN").filter(|t| !t.is_empty()),

            probe_interval: Duration::from_secs(probe_secs),
            match_seed: lookup("MATCH_SEED")
                .map(|s| s.parse().map_err(|_| ConfigError::Invalid("MATCH_SEED")))
                .transpose()?,

            board,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
