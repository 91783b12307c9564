/// The coarse phase of a proxied connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkMode {
    Handshake,
    Status,
    Login,
    Game,
}

impl NetworkMode {
    /// Mode requested by the `next_state` field of the handshake.
    pub fn from_handshake_next(next: i32) -> Option<Self> {
        match next {
            1 => Some(NetworkMode::Status),
            2 => Some(NetworkMode::Login),
            _ => None,
        }
    }
}

/// Which way a packet travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Client to server.
    Serverbound,
    /// Server to client.
    Clientbound,
}
