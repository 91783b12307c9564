use crate::error::DecodeError;
use crate::framing::{packet_bytes, Frame};
use crate::mode::{Direction, NetworkMode};
use crate::packets::{InternalPacket, PacketKind};
use crate::table::ProtocolTable;
use bytes::BytesMut;
use std::sync::Arc;

/// Turns frames travelling in one direction into typed packets using the
/// table of the current mode. A builder is swapped out wholesale whenever the
/// mode changes, so it never has to track mode itself.
#[derive(Clone)]
pub struct PacketBuilder {
    direction: Direction,
    table: Arc<dyn ProtocolTable>,
}

impl PacketBuilder {
    pub fn new(direction: Direction, table: Arc<dyn ProtocolTable>) -> Self {
        Self { direction, table }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn mode(&self) -> NetworkMode {
        self.table.mode()
    }

    pub fn protocol_version(&self) -> i32 {
        self.table.protocol_version()
    }

    pub fn table(&self) -> &Arc<dyn ProtocolTable> {
        &self.table
    }

    pub fn classify(&self, id: i32) -> Option<PacketKind> {
        self.table.kind(self.direction, id)
    }

    /// Decode a frame. Unknown ids are reported so the caller can relay the
    /// frame untouched.
    pub fn build(&self, frame: &Frame) -> Result<InternalPacket, DecodeError> {
        let kind = self.classify(frame.id).ok_or(DecodeError::UnknownPacket {
            direction: self.direction,
            mode: self.mode(),
            id: frame.id,
        })?;
        let mut body = frame.body.clone();
        self.table.decode(self.direction, kind, &mut body)
    }

    /// Encode a packet back to `id + body`, ready for framing.
    pub fn encode(&self, packet: &InternalPacket) -> Result<BytesMut, DecodeError> {
        let kind = packet_kind(packet);
        let id = self
            .table
            .packet_id(self.direction, kind)
            .ok_or(DecodeError::Unencodable(packet.name()))?;
        let body = self.table.encode(self.direction, packet)?;
        Ok(packet_bytes(id, &body))
    }
}

impl std::fmt::Debug for PacketBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketBuilder")
            .field("direction", &self.direction)
            .field("mode", &self.table.mode())
            .field("protocol", &self.table.protocol_version())
            .finish()
    }
}

/// The kind a typed packet is sent as.
pub fn packet_kind(packet: &InternalPacket) -> PacketKind {
    match packet {
        InternalPacket::Handshake { .. } => PacketKind::Handshake,
        InternalPacket::EncryptionRequest { .. } => PacketKind::EncryptionRequest,
        InternalPacket::SetCompression { .. } => PacketKind::SetCompression,
        InternalPacket::LoginSuccess => PacketKind::LoginSuccess,
        InternalPacket::EncryptionResponse { .. } => PacketKind::EncryptionResponse,
        InternalPacket::JoinGame { .. } => PacketKind::JoinGame,
        InternalPacket::Respawn { .. } => PacketKind::Respawn,
        InternalPacket::PlayerPositionSync { .. } => PacketKind::PlayerPositionSync,
        InternalPacket::ChunkData { .. } => PacketKind::ChunkData,
        InternalPacket::UnloadChunk { .. } => PacketKind::UnloadChunk,
        InternalPacket::BlockChange { .. } => PacketKind::BlockChange,
        InternalPacket::MultiBlockChange { .. } => PacketKind::MultiBlockChange,
        InternalPacket::MovePlayer { .. } => PacketKind::MovePlayerPosition,
        InternalPacket::Opaque { kind } => *kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{read_varint, write_varint};
    use crate::table::PacketIdMap;
    use bytes::Bytes;

    struct TestTable {
        ids: PacketIdMap,
    }

    impl ProtocolTable for TestTable {
        fn mode(&self) -> NetworkMode {
            NetworkMode::Login
        }

        fn protocol_version(&self) -> i32 {
            763
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
                PacketKind::SetCompression => Ok(InternalPacket::SetCompression {
                    threshold: read_varint(data)?,
                }),
                other => Ok(InternalPacket::Opaque { kind: other }),
            }
        }

        fn encode(
            &self,
            _direction: Direction,
            packet: &InternalPacket,
        ) -> Result<BytesMut, DecodeError> {
            match packet {
                InternalPacket::SetCompression { threshold } => {
                    let mut buf = BytesMut::new();
                    write_varint(&mut buf, *threshold);
                    Ok(buf)
                }
                other => Err(DecodeError::Unencodable(other.name())),
            }
        }
    }

    fn builder() -> PacketBuilder {
        let table = TestTable {
            ids: PacketIdMap::new()
                .clientbound(0x03, PacketKind::SetCompression)
                .clientbound(0x02, PacketKind::LoginSuccess),
        };
        PacketBuilder::new(Direction::Clientbound, Arc::new(table))
    }

    fn frame(id: i32, body: &[u8]) -> Frame {
        Frame {
            id,
            body: BytesMut::from(body),
            raw: Bytes::new(),
        }
    }

    #[test]
    fn test_build_known_packet() {
        let b = builder();
        let packet = b.build(&frame(0x03, &[0x80, 0x02])).unwrap();
        assert_eq!(packet, InternalPacket::SetCompression { threshold: 256 });
    }

    #[test]
    fn test_unknown_id_reported() {
        let b = builder();
        let err = b.build(&frame(0x7F, &[])).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownPacket { id: 0x7F, .. }));
    }

    #[test]
    fn test_encode_prefixes_id() {
        let b = builder();
        let bytes = b
            .encode(&InternalPacket::SetCompression { threshold: 256 })
            .unwrap();
        assert_eq!(&bytes[..], &[0x03, 0x80, 0x02]);
        assert!(b.encode(&InternalPacket::LoginSuccess).is_err());
    }
}
