use strata_protocol_core::{PacketIdMap, PacketKind};

// Handshake serverbound
pub const HANDSHAKE: i32 = 0x00;

// Status
pub const STATUS_REQUEST: i32 = 0x00;
pub const STATUS_PING: i32 = 0x01;
pub const STATUS_RESPONSE: i32 = 0x00;
pub const STATUS_PONG: i32 = 0x01;

// Login clientbound
pub const LOGIN_DISCONNECT: i32 = 0x00;
pub const ENCRYPTION_REQUEST: i32 = 0x01;
pub const LOGIN_SUCCESS: i32 = 0x02;
pub const SET_COMPRESSION: i32 = 0x03;
pub const LOGIN_PLUGIN_REQUEST: i32 = 0x04;

// Login serverbound
pub const LOGIN_START: i32 = 0x00;
pub const ENCRYPTION_RESPONSE: i32 = 0x01;
pub const LOGIN_PLUGIN_RESPONSE: i32 = 0x02;

/// Ids of the GAME packets the proxy looks at. They move around in nearly
/// every release.
#[derive(Debug, Clone, Copy)]
struct GameIds {
    chunk_data: i32,
    unload_chunk: i32,
    block_change: i32,
    multi_block_change: i32,
    join_game: i32,
    respawn: i32,
    position_sync: i32,
    move_position: i32,
    move_position_rotation: i32,
}

fn game_ids(protocol: i32) -> GameIds {
    let (cb, sb): ([i32; 7], [i32; 2]) = match protocol {
        p if p >= 762 => ([0x24, 0x1E, 0x0A, 0x43, 0x28, 0x41, 0x3C], [0x14, 0x15]),
        761 => ([0x20, 0x1B, 0x09, 0x3F, 0x24, 0x3D, 0x38], [0x13, 0x14]),
        760 => ([0x21, 0x1C, 0x09, 0x40, 0x25, 0x3E, 0x39], [0x14, 0x15]),
        759 => ([0x1F, 0x1A, 0x09, 0x3D, 0x23, 0x3B, 0x36], [0x13, 0x14]),
        p if p >= 755 => ([0x22, 0x1D, 0x0C, 0x3F, 0x26, 0x3D, 0x38], [0x11, 0x12]),
        p if p >= 751 => ([0x20, 0x1C, 0x0B, 0x3B, 0x24, 0x39, 0x34], [0x12, 0x13]),
        p if p >= 735 => ([0x21, 0x1D, 0x0B, 0x0F, 0x25, 0x3A, 0x35], [0x12, 0x13]),
        p if p >= 573 => ([0x22, 0x1E, 0x0C, 0x10, 0x26, 0x3B, 0x36], [0x11, 0x12]),
        p if p >= 477 => ([0x21, 0x1D, 0x0B, 0x0F, 0x25, 0x3A, 0x35], [0x11, 0x12]),
        p if p >= 393 => ([0x22, 0x1F, 0x0B, 0x0F, 0x25, 0x38, 0x32], [0x10, 0x11]),
        _ => ([0x20, 0x1D, 0x0B, 0x10, 0x23, 0x35, 0x2F], [0x0D, 0x0E]),
    };
    GameIds {
        chunk_data: cb[0],
        unload_chunk: cb[1],
        block_change: cb[2],
        multi_block_change: cb[3],
        join_game: cb[4],
        respawn: cb[5],
        position_sync: cb[6],
        move_position: sb[0],
        move_position_rotation: sb[1],
    }
}

pub fn handshake_ids() -> PacketIdMap {
    PacketIdMap::new().serverbound(HANDSHAKE, PacketKind::Handshake)
}

pub fn status_ids() -> PacketIdMap {
    PacketIdMap::new()
        .serverbound(STATUS_REQUEST, PacketKind::StatusRequest)
        .serverbound(STATUS_PING, PacketKind::Ping)
        .clientbound(STATUS_RESPONSE, PacketKind::StatusResponse)
        .clientbound(STATUS_PONG, PacketKind::Pong)
}

pub fn login_ids(protocol: i32) -> PacketIdMap {
    let ids = PacketIdMap::new()
        .serverbound(LOGIN_START, PacketKind::LoginStart)
        .serverbound(ENCRYPTION_RESPONSE, PacketKind::EncryptionResponse)
        .clientbound(LOGIN_DISCONNECT, PacketKind::LoginDisconnect)
        .clientbound(ENCRYPTION_REQUEST, PacketKind::EncryptionRequest)
        .clientbound(LOGIN_SUCCESS, PacketKind::LoginSuccess)
        .clientbound(SET_COMPRESSION, PacketKind::SetCompression);
    // Plugin channels during login arrived with 1.13.
    if protocol >= 393 {
        ids.serverbound(LOGIN_PLUGIN_RESPONSE, PacketKind::LoginPluginResponse)
            .clientbound(LOGIN_PLUGIN_REQUEST, PacketKind::LoginPluginRequest)
    } else {
        ids
    }
}

pub fn game_id_map(protocol: i32) -> PacketIdMap {
    let ids = game_ids(protocol);
    PacketIdMap::new()
        .clientbound(ids.chunk_data, PacketKind::ChunkData)
        .clientbound(ids.unload_chunk, PacketKind::UnloadChunk)
        .clientbound(ids.block_change, PacketKind::BlockChange)
        .clientbound(ids.multi_block_change, PacketKind::MultiBlockChange)
        .clientbound(ids.join_game, PacketKind::JoinGame)
        .clientbound(ids.respawn, PacketKind::Respawn)
        .clientbound(ids.position_sync, PacketKind::PlayerPositionSync)
        .serverbound(ids.move_position, PacketKind::MovePlayerPosition)
        .serverbound(ids.move_position_rotation, PacketKind::MovePlayerPositionRotation)
}
