//! Role assignment for live connections
//!
//! Exactly one connection may hold each play side. The registry is owned by
//! the session task and only mutated from its command path.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identity of one transport connection
pub type ConnectionId = Uuid;

/// A play side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];
}

/// What a connection may do in the match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Left,
    Right,
    Spectator,
}

impl Role {
    /// The paddle this role controls, if any
    pub fn side(self) -> Option<Side> {
        match self {
            Role::Left => Some(Side::Left),
            Role::Right => Some(Side::Right),
            Role::Spectator => None,
        }
    }
}

impl From<Side> for Role {
    fn from(side: Side) -> Self {
        match side {
            Side::Left => Role::Left,
            Side::Right => Role::Right,
        }
    }
}

#[derive(Debug, Default)]
pub struct RoleRegistry {
    left: Option<ConnectionId>,
    right: Option<ConnectionId>,
    spectators: HashSet<ConnectionId>,
}

impl RoleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the first free side, else spectator.
    /// A connection that already has a role keeps it.
    pub fn assign(&mut self, conn: ConnectionId) -> Role {
        if let Some(role) = self.role_of(conn) {
            return role;
        }

        if self.left.is_none() {
            self.left = Some(conn);
            Role::Left
        } else if self.right.is_none() {
            self.right = Some(conn);
            Role::Right
        } else {
            self.spectators.insert(conn);
            Role::Spectator
        }
    }

    /// Forget a connection. Returns the role it held; calling twice is a no-op.
    pub fn release(&mut self, conn: ConnectionId) -> Option<Role> {
        if self.left == Some(conn) {
            self.left = None;
            Some(Role::Left)
        } else if self.right == Some(conn) {
            self.right = None;
            Some(Role::Right)
        } else if self.spectators.remove(&conn) {
            Some(Role::Spectator)
        } else {
            None
        }
    }

    pub fn role_of(&self, conn: ConnectionId) -> Option<Role> {
        if self.left == Some(conn) {
            Some(Role::Left)
        } else if self.right == Some(conn) {
            Some(Role::Right)
        } else if self.spectators.contains(&conn) {
            Some(Role::Spectator)
        } else {
            None
        }
    }

    /// Current holder of a side
    pub fn holder(&self, side: Side) -> Option<ConnectionId> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    /// Number of connections holding a side
    pub fn players(&self) -> usize {
        usize::from(self.left.is_some()) + usize::from(self.right.is_some())
    }

    /// Number of registered connections, players included
    pub fn len(&self) -> usize {
        self.players() + self.spectators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
