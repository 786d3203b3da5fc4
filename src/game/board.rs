//! Static board geometry, fixed for the lifetime of the process

use serde::{Deserialize, Serialize};

use super::Side;

/// Board and entity dimensions in logical game-space units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Board width
    pub width: f64,
    /// Board height
    pub height: f64,
    /// Paddle width
    pub paddle_width: f64,
    /// Paddle height
    pub paddle_height: f64,
    /// Gap between a side wall and the outer edge of its paddle
    pub paddle_inset: f64,
    /// Paddle travel per nominal frame at full input
    pub paddle_speed: f64,
    /// Ball radius
    pub ball_radius: f64,
    /// Horizontal ball speed on serve
    pub ball_speed: f64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            paddle_width: 12.0,
            paddle_height: 100.0,
            paddle_inset: 30.0,
            paddle_speed: 6.0,
            ball_radius: 8.0,
            ball_speed: 5.0,
        }
    }
}

impl BoardConfig {
    /// X coordinate of a paddle's top-left corner. Fixed per side.
    pub fn paddle_x(&self, side: Side) -> f64 {
        match side {
            Side::Left => self.paddle_inset,
            Side::Right => self.width - self.paddle_inset - self.paddle_width,
        }
    }

    /// Largest legal paddle y
    pub fn max_paddle_y(&self) -> f64 {
        (self.height - self.paddle_height).max(0.0)
    }

    /// Clamp a paddle y into `[0, height - paddle_height]`
    pub fn clamp_paddle_y(&self, y: f64) -> f64 {
        y.clamp(0.0, self.max_paddle_y())
    }

    /// Paddle y that vertically centers the paddle
    pub fn center_paddle_y(&self) -> f64 {
        self.height / 2.0 - self.paddle_height / 2.0
    }

    /// Board center point
    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }
}
