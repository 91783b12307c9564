//! Chunk reconstruction: decodes queued chunk packets off the relay path and
//! keeps the columns around the player in memory so block changes and
//! partial updates can be applied before saving.

use crate::save::{SaveMessage, SaveRequest};
use crate::session::WorldContext;
use bytes::BytesMut;
use std::collections::HashMap;
use std::sync::Arc;
use strata_types::{BlockPos, ChunkPos, Dimension};
use strata_world::level::LevelInfo;
use strata_world::{decode_chunk, Chunk};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// A chunk data body (after the packet id) and the context it arrived in.
#[derive(Debug)]
pub struct RawChunkPacket {
    pub body: BytesMut,
    pub context: Arc<WorldContext>,
}

/// Work forked off the relay path.
#[derive(Debug)]
pub enum WorldEvent {
    Chunk(RawChunkPacket),
    Unload {
        dimension: Dimension,
        pos: ChunkPos,
    },
    BlockChanges {
        dimension: Dimension,
        changes: Vec<(BlockPos, i32)>,
    },
    PlayerMoved {
        dimension: Dimension,
        position: BlockPos,
    },
    Disconnected,
}

#[derive(Debug, Clone)]
pub struct ReconstructionSettings {
    /// Columns further than this (in chunks) from the player are evicted.
    pub cache_radius: i32,
    pub level_name: String,
    pub seed: i64,
    pub world_gen: bool,
}

struct CachedChunk {
    chunk: Chunk,
    context: Arc<WorldContext>,
}

/// In-memory world of the active connection.
pub struct Reconstruction {
    settings: ReconstructionSettings,
    save_tx: Option<mpsc::Sender<SaveMessage>>,
    cache: HashMap<(Dimension, ChunkPos), CachedChunk>,
    player: Option<(Dimension, BlockPos)>,
    /// Version whose level.dat was last requested.
    level_version: Option<i32>,
    last_context: Option<Arc<WorldContext>>,
}

impl Reconstruction {
    pub fn new(settings: ReconstructionSettings, save_tx: Option<mpsc::Sender<SaveMessage>>) -> Self {
        Self {
            settings,
            save_tx,
            cache: HashMap::new(),
            player: None,
            level_version: None,
            last_context: None,
        }
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    pub fn get(&self, dimension: &Dimension, pos: ChunkPos) -> Option<&Chunk> {
        self.cache.get(&(dimension.clone(), pos)).map(|c| &c.chunk)
    }

    pub fn handle(&mut self, event: WorldEvent) {
        match event {
            WorldEvent::Chunk(packet) => self.on_chunk(packet),
            WorldEvent::Unload { dimension, pos } => {
                if self.cache.remove(&(dimension, pos)).is_some() {
                    debug!("Unloaded column {}", pos);
                }
            }
            WorldEvent::BlockChanges { dimension, changes } => self.on_block_changes(dimension, changes),
            WorldEvent::PlayerMoved { dimension, position } => {
                self.player = Some((dimension, position));
                self.evict();
            }
            WorldEvent::Disconnected => {
                info!("Connection closed, dropping {} cached columns", self.cache.len());
                self.request_level();
                if let Some(tx) = &self.save_tx {
                    let _ = tx.blocking_send(SaveMessage::SessionEnded);
                }
                self.cache.clear();
                self.player = None;
                self.level_version = None;
                self.last_context = None;
            }
        }
    }

    fn on_chunk(&mut self, packet: RawChunkPacket) {
        let RawChunkPacket { mut body, context } = packet;
        let update = match decode_chunk(&mut body, &context.decode) {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!("Dropping chunk in {}: {}", context.dimension(), e);
                return;
            }
        };

        let key = (update.dimension.clone(), update.pos);
        let chunk = match self.cache.remove(&key) {
            Some(mut cached) if !update.full && !update.ignore_old_data => {
                cached.chunk.merge_update(update);
                cached.chunk
            }
            _ => update,
        };

        self.last_context = Some(context.clone());
        if self.level_version != Some(context.version().protocol) {
            self.level_version = Some(context.version().protocol);
            self.request_level();
        }

        self.save(&chunk, &context);
        self.cache.insert(key, CachedChunk { chunk, context });
    }

    fn on_block_changes(&mut self, dimension: Dimension, changes: Vec<(BlockPos, i32)>) {
        let mut touched: Vec<ChunkPos> = Vec::new();
        for (pos, state) in changes {
            let column = pos.chunk_pos();
            let Some(cached) = self.cache.get_mut(&(dimension.clone(), column)) else {
                continue;
            };
            let (x, y, z) = pos.local();
            match cached.chunk.set_block(x, y, z, state) {
                Some(old) if old != state => {
                    cached.chunk.remove_block_entity(pos);
                    if !touched.contains(&column) {
                        touched.push(column);
                    }
                }
                Some(_) => {}
                None => debug!("Block change outside world at {:?}", pos),
            }
        }
        for column in touched {
            if let Some(cached) = self.cache.get(&(dimension.clone(), column)) {
                self.save(&cached.chunk, &cached.context);
            }
        }
    }

    fn evict(&mut self) {
        let Some((dimension, position)) = &self.player else {
            return;
        };
        let center = position.chunk_pos();
        let radius = self.settings.cache_radius;
        let before = self.cache.len();
        self.cache
            .retain(|(dim, pos), _| dim == dimension && pos.distance(&center) <= radius);
        if self.cache.len() != before {
            debug!("Evicted {} columns around {}", before - self.cache.len(), center);
        }
    }

    fn save(&self, chunk: &Chunk, context: &Arc<WorldContext>) {
        let Some(tx) = &self.save_tx else {
            return;
        };
        let request = SaveRequest {
            chunk: chunk.clone(),
            context: context.clone(),
        };
        if let Err(mpsc::error::TrySendError::Full(_)) = tx.try_send(SaveMessage::Chunk(request)) {
            warn!("Save queue full, dropping column {}", chunk.pos);
        }
    }

    fn request_level(&self) {
        let (Some(tx), Some(context)) = (&self.save_tx, &self.last_context) else {
            return;
        };
        let spawn = self
            .player
            .as_ref()
            .map(|(_, pos)| *pos)
            .unwrap_or_else(|| BlockPos::new(0, 64, 0));
        let info = LevelInfo {
            version: context.version(),
            name: self.settings.level_name.clone(),
            seed: self.settings.seed,
            spawn,
            world_gen: self.settings.world_gen,
        };
        if tx.try_send(SaveMessage::Level(info)).is_err() {
            warn!("Save queue full, level.dat not updated");
        }
    }
}

/// Worker loop. Runs on a blocking thread until every sender is gone.
pub fn run_reconstruction(
    mut rx: mpsc::Receiver<WorldEvent>,
    save_tx: Option<mpsc::Sender<SaveMessage>>,
    settings: ReconstructionSettings,
) {
    let mut world = Reconstruction::new(settings, save_tx);
    while let Some(event) = rx.blocking_recv() {
        world.handle(event);
    }
    debug!("Reconstruction worker stopped");
}
