use crate::ids;
use crate::login;
use crate::play;
use bytes::BytesMut;
use std::sync::Arc;
use strata_protocol_core::*;

fn opaque(kind: PacketKind) -> Result<InternalPacket, DecodeError> {
    Ok(InternalPacket::Opaque { kind })
}

/// Table for the handshake, which is identical in every version.
pub struct HandshakeTable {
    ids: PacketIdMap,
}

impl HandshakeTable {
    pub fn new() -> Self {
        Self {
            ids: ids::handshake_ids(),
        }
    }
}

impl Default for HandshakeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolTable for HandshakeTable {
    fn mode(&self) -> NetworkMode {
        NetworkMode::Handshake
    }

    fn protocol_version(&self) -> i32 {
        0
    }

    fn kind(&self, direction: Direction, id: i32) -> Option<PacketKind> {
        self.ids.kind(direction, id)
    }

    fn packet_id(&self, direction: Direction, kind: PacketKind) -> Option<i32> {
        self.ids.id(direction, kind)
    }

    fn decode(
        &self,
        _direction: Direction,
        kind: PacketKind,
        data: &mut BytesMut,
    ) -> Result<InternalPacket, DecodeError> {
        match kind {
            PacketKind::Handshake => login::decode_handshake(data),
            other => opaque(other),
        }
    }

    fn encode(&self, _direction: Direction, packet: &InternalPacket) -> Result<BytesMut, DecodeError> {
        login::encode_handshake(packet)
    }
}

/// Server list ping. Nothing in it is inspected.
pub struct StatusTable {
    protocol: i32,
    ids: PacketIdMap,
}

impl StatusTable {
    pub fn new(protocol: i32) -> Self {
        Self {
            protocol,
            ids: ids::status_ids(),
        }
    }
}

impl ProtocolTable for StatusTable {
    fn mode(&self) -> NetworkMode {
        NetworkMode::Status
    }

    fn protocol_version(&self) -> i32 {
        self.protocol
    }

    fn kind(&self, direction: Direction, id: i32) -> Option<PacketKind> {
        self.ids.kind(direction, id)
    }

    fn packet_id(&self, direction: Direction, kind: PacketKind) -> Option<i32> {
        self.ids.id(direction, kind)
    }

    fn decode(
        &self,
        _direction: Direction,
        kind: PacketKind,
        _data: &mut BytesMut,
    ) -> Result<InternalPacket, DecodeError> {
        opaque(kind)
    }

    fn encode(&self, _direction: Direction, packet: &InternalPacket) -> Result<BytesMut, DecodeError> {
        Err(DecodeError::Unencodable(packet.name()))
    }
}

pub struct LoginTable {
    protocol: i32,
    ids: PacketIdMap,
}

impl LoginTable {
    pub fn new(protocol: i32) -> Self {
        Self {
            protocol,
            ids: ids::login_ids(protocol),
        }
    }
}

impl ProtocolTable for LoginTable {
    fn mode(&self) -> NetworkMode {
        NetworkMode::Login
    }

    fn protocol_version(&self) -> i32 {
        self.protocol
    }

    fn kind(&self, direction: Direction, id: i32) -> Option<PacketKind> {
        self.ids.kind(direction, id)
    }

    fn packet_id(&self, direction: Direction, kind: PacketKind) -> Option<i32> {
        self.ids.id(direction, kind)
    }

    fn decode(
        &self,
        _direction: Direction,
        kind: PacketKind,
        data: &mut BytesMut,
    ) -> Result<InternalPacket, DecodeError> {
        match kind {
            PacketKind::EncryptionRequest => login::decode_encryption_request(data),
            PacketKind::EncryptionResponse => login::decode_encryption_response(self.protocol, data),
            PacketKind::SetCompression => Ok(InternalPacket::SetCompression {
                threshold: read_varint(data)?,
            }),
            PacketKind::LoginSuccess => Ok(InternalPacket::LoginSuccess),
            other => opaque(other),
        }
    }

    fn encode(&self, _direction: Direction, packet: &InternalPacket) -> Result<BytesMut, DecodeError> {
        login::encode_login(self.protocol, packet)
    }
}

/// GAME mode table for one resolved version.
pub struct GameTable {
    version: GameVersion,
    ids: PacketIdMap,
}

impl GameTable {
    pub fn new(version: GameVersion) -> Self {
        Self {
            version,
            ids: ids::game_id_map(version.protocol),
        }
    }

    pub fn version(&self) -> GameVersion {
        self.version
    }
}

impl ProtocolTable for GameTable {
    fn mode(&self) -> NetworkMode {
        NetworkMode::Game
    }

    fn protocol_version(&self) -> i32 {
        self.version.protocol
    }

    fn kind(&self, direction: Direction, id: i32) -> Option<PacketKind> {
        self.ids.kind(direction, id)
    }

    fn packet_id(&self, direction: Direction, kind: PacketKind) -> Option<i32> {
        self.ids.id(direction, kind)
    }

    fn decode(
        &self,
        _direction: Direction,
        kind: PacketKind,
        data: &mut BytesMut,
    ) -> Result<InternalPacket, DecodeError> {
        let protocol = self.version.protocol;
        match kind {
            PacketKind::JoinGame => play::decode_join_game(protocol, data),
            PacketKind::Respawn => play::decode_respawn(protocol, data),
            PacketKind::PlayerPositionSync => play::decode_position_sync(data),
            PacketKind::MovePlayerPosition | PacketKind::MovePlayerPositionRotation => {
                play::decode_move_player(data)
            }
            PacketKind::ChunkData => Ok(InternalPacket::ChunkData {
                pos: play::decode_column(data)?,
            }),
            PacketKind::UnloadChunk => Ok(InternalPacket::UnloadChunk {
                pos: play::decode_column(data)?,
            }),
            PacketKind::BlockChange => play::decode_block_change(&self.version, data),
            PacketKind::MultiBlockChange => play::decode_multi_block_change(&self.version, data),
            other => opaque(other),
        }
    }

    fn encode(&self, _direction: Direction, packet: &InternalPacket) -> Result<BytesMut, DecodeError> {
        // GAME traffic is always relayed verbatim.
        Err(DecodeError::Unencodable(packet.name()))
    }
}

/// Table for a mode. `version` is only consulted for LOGIN and GAME.
pub fn table_for(mode: NetworkMode, version: GameVersion) -> Arc<dyn ProtocolTable> {
    match mode {
        NetworkMode::Handshake => Arc::new(HandshakeTable::new()),
        NetworkMode::Status => Arc::new(StatusTable::new(version.protocol)),
        NetworkMode::Login => Arc::new(LoginTable::new(version.protocol)),
        NetworkMode::Game => Arc::new(GameTable::new(version)),
    }
}
