use strata_types::{BlockPos, ChunkPos, Dimension, Vec3d, WorldHeight};

/// Semantic packet kinds the proxy recognises. Everything else is relayed
/// as an opaque frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    // Handshake
    Handshake,

    // Status
    StatusRequest,
    StatusResponse,
    Ping,
    Pong,

    // Login
    LoginStart,
    LoginDisconnect,
    EncryptionRequest,
    EncryptionResponse,
    LoginSuccess,
    SetCompression,
    LoginPluginRequest,
    LoginPluginResponse,

    // Game
    JoinGame,
    Respawn,
    PlayerPositionSync,
    ChunkData,
    UnloadChunk,
    BlockChange,
    MultiBlockChange,
    MovePlayerPosition,
    MovePlayerPositionRotation,
}

/// Optional trailer of the 1.19 and 1.19.2 encryption response, which signs
/// the verify token with the player's chat key instead of echoing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedNonce {
    pub salt: i64,
    pub signature: Vec<u8>,
}

/// Version-independent view of the packets the proxy inspects.
/// Protocol tables convert between wire format and these.
#[derive(Debug, Clone, PartialEq)]
pub enum InternalPacket {
    // === Handshake (serverbound) ===
    Handshake {
        protocol_version: i32,
        server_address: String,
        server_port: u16,
        next_state: i32,
    },

    // === Login (clientbound) ===
    EncryptionRequest {
        server_id: String,
        public_key: Vec<u8>,
        verify_token: Vec<u8>,
    },
    SetCompression {
        threshold: i32,
    },
    LoginSuccess,

    // === Login (serverbound) ===
    EncryptionResponse {
        shared_secret: Vec<u8>,
        verify_token: Option<Vec<u8>>,
        signed_nonce: Option<SignedNonce>,
    },

    // === Game (clientbound) ===
    JoinGame {
        dimension: Dimension,
        /// Announced through the dimension type from 1.17 onwards.
        world_height: Option<WorldHeight>,
        /// Biome registry from the dimension codec, indexed by network id (1.18+).
        biome_names: Option<Vec<String>>,
        /// Heights of every dimension type in the codec, for respawns that
        /// only name their type (1.19+).
        dimension_types: Vec<(String, WorldHeight)>,
    },
    Respawn {
        dimension: Dimension,
        /// Dimension type identifier when the height has to be looked up.
        dimension_type: Option<String>,
        world_height: Option<WorldHeight>,
    },
    PlayerPositionSync {
        position: Vec3d,
        /// Bits 0..2 mark x, y and z as relative to the current position.
        relative: u8,
    },
    /// Only the column coordinate is read on the relay path.
    ChunkData {
        pos: ChunkPos,
    },
    UnloadChunk {
        pos: ChunkPos,
    },
    BlockChange {
        pos: BlockPos,
        state: i32,
    },
    MultiBlockChange {
        changes: Vec<(BlockPos, i32)>,
    },

    // === Game (serverbound) ===
    MovePlayer {
        position: Vec3d,
    },

    /// A recognised packet the proxy has no need to look inside.
    Opaque {
        kind: PacketKind,
    },
}

impl InternalPacket {
    pub fn name(&self) -> &'static str {
        match self {
            InternalPacket::Handshake { .. } => "handshake",
            InternalPacket::EncryptionRequest { .. } => "encryption request",
            InternalPacket::SetCompression { .. } => "set compression",
            InternalPacket::LoginSuccess => "login success",
            InternalPacket::EncryptionResponse { .. } => "encryption response",
            InternalPacket::JoinGame { .. } => "join game",
            InternalPacket::Respawn { .. } => "respawn",
            InternalPacket::PlayerPositionSync { .. } => "player position sync",
            InternalPacket::ChunkData { .. } => "chunk data",
            InternalPacket::UnloadChunk { .. } => "unload chunk",
            InternalPacket::BlockChange { .. } => "block change",
            InternalPacket::MultiBlockChange { .. } => "multi block change",
            InternalPacket::MovePlayer { .. } => "move player",
            InternalPacket::Opaque { .. } => "opaque",
        }
    }
}
