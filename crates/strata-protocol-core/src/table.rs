use crate::error::DecodeError;
use crate::mode::{Direction, NetworkMode};
use crate::packets::{InternalPacket, PacketKind};
use bytes::BytesMut;
use std::collections::HashMap;

/// Immutable mapping between wire packet ids and packet kinds for one network
/// mode of one protocol version, together with the body codec for the kinds
/// the proxy inspects.
pub trait ProtocolTable: Send + Sync {
    /// The mode this table serves.
    fn mode(&self) -> NetworkMode;

    /// The protocol version the ids belong to.
    fn protocol_version(&self) -> i32;

    /// Classify a numeric packet id.
    fn kind(&self, direction: Direction, id: i32) -> Option<PacketKind>;

    /// Reverse lookup used when a packet has to be re-encoded.
    fn packet_id(&self, direction: Direction, kind: PacketKind) -> Option<i32>;

    /// Decode a packet body (after the id) of the given kind.
    fn decode(
        &self,
        direction: Direction,
        kind: PacketKind,
        data: &mut BytesMut,
    ) -> Result<InternalPacket, DecodeError>;

    /// Encode a packet body (without the id).
    fn encode(&self, direction: Direction, packet: &InternalPacket) -> Result<BytesMut, DecodeError>;
}

/// Bidirectional id table for one mode, one map per direction.
#[derive(Debug, Default, Clone)]
pub struct PacketIdMap {
    serverbound: HashMap<i32, PacketKind>,
    clientbound: HashMap<i32, PacketKind>,
}

impl PacketIdMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serverbound(mut self, id: i32, kind: PacketKind) -> Self {
        self.serverbound.insert(id, kind);
        self
    }

    pub fn clientbound(mut self, id: i32, kind: PacketKind) -> Self {
        self.clientbound.insert(id, kind);
        self
    }

    fn side(&self, direction: Direction) -> &HashMap<i32, PacketKind> {
        match direction {
            Direction::Serverbound => &self.serverbound,
            Direction::Clientbound => &self.clientbound,
        }
    }

    pub fn kind(&self, direction: Direction, id: i32) -> Option<PacketKind> {
        self.side(direction).get(&id).copied()
    }

    pub fn id(&self, direction: Direction, kind: PacketKind) -> Option<i32> {
        self.side(direction)
            .iter()
            .find(|(_, k)| **k == kind)
            .map(|(id, _)| *id)
    }

    pub fn len(&self) -> usize {
        self.serverbound.len() + self.clientbound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
