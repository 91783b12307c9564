//! The transparent relay: one loop per direction, sharing the session.
//!
//! Each loop reads from one socket, cuts frames, inspects the ones it cares
//! about and writes them on to the other socket. Outgoing bytes are built and
//! encrypted while the session lock is held, and only then are ciphers or
//! compression switched on, so the packet that triggers a switch still goes
//! out under the old settings.

use crate::config::ProxyConfig;
use crate::keyexchange::{join_session, KeyExchange};
use crate::reconstruction::{RawChunkPacket, WorldEvent};
use crate::session::NetworkSession;
use anyhow::{bail, Context, Result};
use bytes::BytesMut;
use std::sync::{Arc, Mutex, MutexGuard};
use strata_protocol_core::{
    encode_frame, DecodeError, Direction, Frame, FrameReader, InternalPacket, NetworkMode,
};
use strata_registry::{RegistryHandle, RegistryLoader};
use strata_types::{ChunkPos, Vec3d};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

const READ_CHUNK: usize = 8192;

/// Everything a connection needs from the process.
pub struct ProxyContext {
    pub config: Arc<ProxyConfig>,
    pub loader: Arc<RegistryLoader>,
    pub keys: KeyExchange,
    /// Absent when nothing consumes world updates.
    pub world_tx: Option<mpsc::Sender<WorldEvent>>,
    /// Registry failures for a version in play end the process.
    pub fatal_tx: mpsc::Sender<anyhow::Error>,
    pub session: Arc<Mutex<NetworkSession>>,
}

impl ProxyContext {
    pub fn new(
        config: Arc<ProxyConfig>,
        loader: Arc<RegistryLoader>,
        keys: KeyExchange,
        world_tx: Option<mpsc::Sender<WorldEvent>>,
        fatal_tx: mpsc::Sender<anyhow::Error>,
    ) -> Self {
        let session = Arc::new(Mutex::new(NetworkSession::new(loader.clone())));
        Self {
            config,
            loader,
            keys,
            world_tx,
            fatal_tx,
            session,
        }
    }
}

/// Bytes ready for the wire, plus a session join that has to finish before
/// they may be sent.
struct Outgoing {
    bytes: BytesMut,
    join_hash: Option<String>,
}

fn lock(session: &Mutex<NetworkSession>) -> MutexGuard<'_, NetworkSession> {
    match session.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Proxy one client until either side closes. The session is reset and the
/// world queue told about the disconnect however the connection ends.
pub async fn serve_connection(client: TcpStream, ctx: Arc<ProxyContext>) -> Result<()> {
    let remote = (ctx.config.remote_host.as_str(), ctx.config.remote_port);
    let server = TcpStream::connect(remote)
        .await
        .with_context(|| format!("connecting to {}:{}", remote.0, remote.1))?;
    client.set_nodelay(true)?;
    server.set_nodelay(true)?;
    info!("Relaying to {}:{}", remote.0, remote.1);

    let (client_read, client_write) = client.into_split();
    let (server_read, server_write) = server.into_split();

    let result = tokio::select! {
        r = relay_loop(Direction::Serverbound, client_read, server_write, &ctx) => r,
        r = relay_loop(Direction::Clientbound, server_read, client_write, &ctx) => r,
    };

    lock(&ctx.session).reset();
    if let Some(tx) = &ctx.world_tx {
        let _ = tx.send(WorldEvent::Disconnected).await;
    }
    result
}

async fn relay_loop(
    direction: Direction,
    mut src: OwnedReadHalf,
    mut dst: OwnedWriteHalf,
    ctx: &ProxyContext,
) -> Result<()> {
    let mut reader = FrameReader::new();
    let mut chunk = vec![0u8; READ_CHUNK];
    let mut outgoing = Vec::new();

    loop {
        let n = src.read(&mut chunk).await?;
        if n == 0 {
            debug!("{:?} stream closed", direction);
            return Ok(());
        }
        reader.push(&chunk[..n]);

        {
            let mut session = lock(&ctx.session);
            drain_frames(direction, &mut reader, &mut session, ctx, &mut outgoing)?;
        }

        for out in outgoing.drain(..) {
            if let Some(hash) = out.join_hash {
                if let Some(auth) = &ctx.config.auth {
                    join_session(auth, &hash).await?;
                }
            }
            dst.write_all(&out.bytes).await?;
        }
    }
}

/// Handle every complete frame in `reader`.
fn drain_frames(
    direction: Direction,
    reader: &mut FrameReader,
    session: &mut NetworkSession,
    ctx: &ProxyContext,
    out: &mut Vec<Outgoing>,
) -> Result<()> {
    loop {
        let cipher = match direction {
            Direction::Serverbound => &mut session.client_cipher,
            Direction::Clientbound => &mut session.server_cipher,
        };
        let Some(frame) = reader.next_frame(cipher, &session.compression)? else {
            return Ok(());
        };
        handle_frame(direction, frame, session, ctx, out)?;
    }
}

/// Encrypt for the socket the bytes are travelling to.
fn seal(session: &mut NetworkSession, direction: Direction, mut bytes: BytesMut) -> BytesMut {
    match direction {
        Direction::Serverbound => session.server_cipher.encrypt(&mut bytes),
        Direction::Clientbound => session.client_cipher.encrypt(&mut bytes),
    }
    bytes
}

fn forward_raw(session: &mut NetworkSession, direction: Direction, frame: &Frame, out: &mut Vec<Outgoing>) {
    let bytes = seal(session, direction, BytesMut::from(&frame.raw[..]));
    out.push(Outgoing {
        bytes,
        join_hash: None,
    });
}

/// Encode a rewritten packet with the current builder and framing settings.
fn forward_packet(
    session: &mut NetworkSession,
    direction: Direction,
    packet: &InternalPacket,
    join_hash: Option<String>,
    out: &mut Vec<Outgoing>,
) -> Result<()> {
    let body = session.builder(direction).encode(packet)?;
    let frame = encode_frame(&body, &session.compression)?;
    let bytes = seal(session, direction, frame);
    out.push(Outgoing { bytes, join_hash });
    Ok(())
}

fn handle_frame(
    direction: Direction,
    frame: Frame,
    session: &mut NetworkSession,
    ctx: &ProxyContext,
    out: &mut Vec<Outgoing>,
) -> Result<()> {
    let packet = match session.builder(direction).build(&frame) {
        Ok(packet) => packet,
        Err(DecodeError::UnknownPacket { .. }) => {
            forward_raw(session, direction, &frame, out);
            return Ok(());
        }
        Err(e) => {
            debug!("Relaying undecodable {:?} frame 0x{:02X}: {}", direction, frame.id, e);
            forward_raw(session, direction, &frame, out);
            return Ok(());
        }
    };
    trace!("{:?} {}", direction, packet.name());

    match (session.mode(), packet) {
        (
            NetworkMode::Handshake,
            InternalPacket::Handshake {
                protocol_version,
                next_state,
                ..
            },
        ) => {
            let rewritten = InternalPacket::Handshake {
                protocol_version,
                server_address: ctx.config.remote_host.clone(),
                server_port: ctx.config.remote_port,
                next_state,
            };
            forward_packet(session, direction, &rewritten, None, out)?;
            session.set_protocol(protocol_version);
            match NetworkMode::from_handshake_next(next_state) {
                Some(mode) => {
                    info!("Client protocol {}, entering {:?}", protocol_version, mode);
                    session.set_mode(mode);
                }
                None => warn!("Handshake asks for unknown state {}", next_state),
            }
        }

        (
            NetworkMode::Login,
            InternalPacket::EncryptionRequest {
                server_id,
                public_key,
                verify_token,
            },
        ) => {
            let (request, pending) = ctx
                .keys
                .intercept_request(&server_id, &public_key, &verify_token)?;
            forward_packet(session, direction, &request, None, out)?;
            session.pending_login = Some(pending);
        }

        (
            NetworkMode::Login,
            InternalPacket::EncryptionResponse {
                shared_secret,
                verify_token,
                signed_nonce,
            },
        ) => {
            let Some(pending) = session.pending_login.take() else {
                bail!("encryption response without a pending request");
            };
            let done = ctx.keys.complete(
                &pending,
                &shared_secret,
                verify_token.as_deref(),
                signed_nonce.as_ref(),
            )?;
            let join_hash = ctx.config.auth.as_ref().map(|_| done.server_hash.clone());
            if join_hash.is_none() {
                warn!("No [auth] configured; online-mode servers will reject this login");
            }
            forward_packet(session, direction, &done.response, join_hash, out)?;
            session.client_cipher.enable(&done.secret);
            session.server_cipher.enable(&done.secret);
            debug!("Encryption enabled on both sockets");
        }

        (NetworkMode::Login, InternalPacket::SetCompression { threshold }) => {
            forward_raw(session, direction, &frame, out);
            session.compression.enable(threshold);
            debug!("Compression threshold {}", threshold);
        }

        (NetworkMode::Login, InternalPacket::LoginSuccess) => {
            forward_raw(session, direction, &frame, out);
            if let Some(handle) = session.set_mode(NetworkMode::Game) {
                watch_registries(handle, ctx.fatal_tx.clone());
            }
        }

        (NetworkMode::Game, packet) => {
            forward_raw(session, direction, &frame, out);
            observe_game(packet, &frame, session, ctx);
        }

        _ => forward_raw(session, direction, &frame, out),
    }
    Ok(())
}

/// Update the session from a GAME packet and fork world updates off to the
/// reconstruction queue. The frame itself has already been relayed.
fn observe_game(packet: InternalPacket, frame: &Frame, session: &mut NetworkSession, ctx: &ProxyContext) {
    match packet {
        InternalPacket::JoinGame {
            dimension,
            world_height,
            biome_names,
            dimension_types,
        } => {
            if !dimension_types.is_empty() {
                session.set_dimension_types(dimension_types);
            }
            if let Some(names) = biome_names {
                session.set_biome_names(names);
            }
            session.set_world(dimension, world_height, None);
        }
        InternalPacket::Respawn {
            dimension,
            dimension_type,
            world_height,
        } => session.set_world(dimension, world_height, dimension_type.as_deref()),
        InternalPacket::PlayerPositionSync { position, relative } => {
            let current = session.position;
            session.position = Vec3d::new(
                if relative & 0x01 != 0 { current.x + position.x } else { position.x },
                if relative & 0x02 != 0 { current.y + position.y } else { position.y },
                if relative & 0x04 != 0 { current.z + position.z } else { position.z },
            );
            player_moved(session, ctx);
        }
        InternalPacket::MovePlayer { position } => {
            let before: ChunkPos = session.player_chunk();
            session.position = position;
            if session.player_chunk() != before {
                player_moved(session, ctx);
            }
        }
        InternalPacket::ChunkData { .. } => {
            if let Some(context) = session.snapshot() {
                enqueue(
                    ctx,
                    WorldEvent::Chunk(RawChunkPacket {
                        body: frame.body.clone(),
                        context,
                    }),
                );
            }
        }
        InternalPacket::UnloadChunk { pos } => enqueue(
            ctx,
            WorldEvent::Unload {
                dimension: session.dimension().clone(),
                pos,
            },
        ),
        InternalPacket::BlockChange { pos, state } => enqueue(
            ctx,
            WorldEvent::BlockChanges {
                dimension: session.dimension().clone(),
                changes: vec![(pos, state)],
            },
        ),
        InternalPacket::MultiBlockChange { changes } => enqueue(
            ctx,
            WorldEvent::BlockChanges {
                dimension: session.dimension().clone(),
                changes,
            },
        ),
        _ => {}
    }
}

fn player_moved(session: &NetworkSession, ctx: &ProxyContext) {
    enqueue(
        ctx,
        WorldEvent::PlayerMoved {
            dimension: session.dimension().clone(),
            position: session.position.block_pos(),
        },
    );
}

/// Never blocks the relay; a full queue costs the update, not the connection.
fn enqueue(ctx: &ProxyContext, event: WorldEvent) {
    let Some(tx) = &ctx.world_tx else {
        return;
    };
    match tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => warn!("World queue full, dropping update"),
        Err(mpsc::error::TrySendError::Closed(_)) => debug!("World queue closed"),
    }
}

/// Registries that cannot be loaded for the version in play are fatal.
fn watch_registries(handle: RegistryHandle, fatal_tx: mpsc::Sender<anyhow::Error>) {
    tokio::spawn(async move {
        if let Err(e) = handle.wait_ready().await {
            error!("Registries unavailable: {}", e);
            let _ = fatal_tx.send(e.into()).await;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_protocol_core::framing::packet_bytes;
    use strata_protocol_core::{read_string, read_varint, write_string, write_varint, CompressionCodec};
    use strata_types::Dimension;

    fn context(world_tx: Option<mpsc::Sender<WorldEvent>>) -> ProxyContext {
        let (fatal_tx, _fatal_rx) = mpsc::channel(1);
        let config = ProxyConfig {
            remote_host: "play.example.net".into(),
            remote_port: 25570,
            ..Default::default()
        };
        ProxyContext::new(
            Arc::new(config),
            Arc::new(RegistryLoader::new("/nonexistent")),
            KeyExchange::generate().unwrap(),
            world_tx,
            fatal_tx,
        )
    }

    fn wire(id: i32, payload: &[u8]) -> BytesMut {
        encode_frame(&packet_bytes(id, payload), &CompressionCodec::new()).unwrap()
    }

    fn handshake(protocol: i32, host: &str, port: u16, next: i32) -> BytesMut {
        let mut body = BytesMut::new();
        write_varint(&mut body, protocol);
        write_string(&mut body, host);
        body.extend_from_slice(&port.to_be_bytes());
        write_varint(&mut body, next);
        wire(0x00, &body)
    }

    fn run(ctx: &ProxyContext, direction: Direction, bytes: &[u8]) -> Vec<BytesMut> {
        let mut reader = FrameReader::new();
        reader.push(bytes);
        let mut out = Vec::new();
        let mut session = lock(&ctx.session);
        drain_frames(direction, &mut reader, &mut session, ctx, &mut out).unwrap();
        out.into_iter().map(|o| o.bytes).collect()
    }

    #[tokio::test]
    async fn test_handshake_rewritten_to_remote() {
        let ctx = context(None);
        let out = run(&ctx, Direction::Serverbound, &handshake(578, "localhost", 25565, 2));
        assert_eq!(out.len(), 1);

        let mut frame = out[0].clone();
        let _len = read_varint(&mut frame).unwrap();
        assert_eq!(read_varint(&mut frame).unwrap(), 0x00);
        assert_eq!(read_varint(&mut frame).unwrap(), 578);
        let host = read_string(&mut frame, 255).unwrap();
        assert_eq!(host, "play.example.net");
        assert_eq!(&frame[..2], &25570u16.to_be_bytes());

        let session = lock(&ctx.session);
        assert_eq!(session.mode(), NetworkMode::Login);
        assert_eq!(session.version().name, "1.15.2");
    }

    #[tokio::test]
    async fn test_status_ping_relayed_verbatim() {
        let ctx = context(None);
        run(&ctx, Direction::Serverbound, &handshake(340, "localhost", 25565, 1));
        let ping = wire(0x01, &42i64.to_be_bytes());
        let out = run(&ctx, Direction::Serverbound, &ping);
        assert_eq!(out, vec![ping]);
        assert_eq!(lock(&ctx.session).mode(), NetworkMode::Status);
    }

    #[tokio::test]
    async fn test_compression_applies_after_set_compression() {
        let ctx = context(None);
        run(&ctx, Direction::Serverbound, &handshake(340, "localhost", 25565, 2));

        let mut threshold = BytesMut::new();
        write_varint(&mut threshold, 256);
        let set_compression = wire(0x03, &threshold);
        let out = run(&ctx, Direction::Clientbound, &set_compression);
        // The packet itself still travels uncompressed.
        assert_eq!(out, vec![set_compression]);
        assert_eq!(lock(&ctx.session).compression.threshold(), Some(256));
    }

    #[tokio::test]
    async fn test_login_success_enters_game() {
        let ctx = context(None);
        run(&ctx, Direction::Serverbound, &handshake(340, "localhost", 25565, 2));
        let mut body = BytesMut::new();
        write_string(&mut body, "069a79f4-44e9-4726-a5be-fca90e38aaf5");
        write_string(&mut body, "Notch");
        let success = wire(0x02, &body);
        let out = run(&ctx, Direction::Clientbound, &success);
        assert_eq!(out, vec![success]);
        assert_eq!(lock(&ctx.session).mode(), NetworkMode::Game);
    }

    #[tokio::test]
    async fn test_unknown_game_packets_relayed() {
        let (tx, mut rx) = mpsc::channel(8);
        let ctx = context(Some(tx));
        {
            let mut session = lock(&ctx.session);
            session.set_protocol(340);
            session.set_mode(NetworkMode::Game);
        }
        let unknown = wire(0x7E, &[1, 2, 3]);
        let out = run(&ctx, Direction::Clientbound, &unknown);
        assert_eq!(out, vec![unknown]);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_full_world_queue_does_not_stall() {
        let (tx, mut rx) = mpsc::channel(1);
        let ctx = context(Some(tx));
        {
            let mut session = lock(&ctx.session);
            session.set_protocol(340);
            session.set_mode(NetworkMode::Game);
            session.set_world(Dimension::Overworld, None, None);
        }
        // 1.12.2 unload chunk: two ints.
        let mut body = BytesMut::new();
        body.extend_from_slice(&3i32.to_be_bytes());
        body.extend_from_slice(&(-4i32).to_be_bytes());
        let unload = wire(0x1D, &body);

        let mut both = unload.clone();
        both.extend_from_slice(&unload);
        let out = run(&ctx, Direction::Clientbound, &both);
        assert_eq!(out.len(), 2);

        match rx.try_recv().unwrap() {
            WorldEvent::Unload { pos, .. } => assert_eq!(pos, ChunkPos::new(3, -4)),
            other => panic!("unexpected {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }
}
