//! World save service.
//!
//! A single writer drains the save queue. Requests for a column that is
//! still waiting replace the waiting request, so each column has at most one
//! write in flight and the last update always wins.

use crate::config::{ExistingChunks, ProxyConfig};
use crate::session::WorldContext;
use crate::storage::ChunkStore;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use strata_types::{ChunkPos, Dimension};
use strata_world::level::LevelInfo;
use strata_world::{chunk_to_nbt, mark_new, merge_stored, storage_pos, AnvilContext, Chunk};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

/// A decoded column handed to the save service, which owns it from here on.
#[derive(Debug)]
pub struct SaveRequest {
    pub chunk: Chunk,
    pub context: Arc<WorldContext>,
}

#[derive(Debug)]
pub enum SaveMessage {
    Chunk(SaveRequest),
    Level(LevelInfo),
    /// The connection that produced the preceding columns is gone.
    SessionEnded,
}

#[derive(Debug, Clone)]
pub struct SaveSettings {
    pub existing: ExistingChunks,
    pub mark_new_chunks: bool,
    pub center_x: i32,
    pub center_z: i32,
    pub mask_bedrock: bool,
    pub write_attempts: u32,
}

impl SaveSettings {
    pub fn from_config(config: &ProxyConfig) -> Self {
        Self {
            existing: config.existing_chunks,
            mark_new_chunks: config.mark_new_chunks,
            center_x: config.center_x,
            center_z: config.center_z,
            mask_bedrock: config.mask_bedrock,
            write_attempts: config.write_attempts.max(1),
        }
    }
}

type ColumnKey = (Dimension, ChunkPos);

#[derive(Debug)]
enum Queued {
    Column(ColumnKey),
    SessionEnd,
}

pub struct SaveService<S> {
    store: S,
    settings: SaveSettings,
    runtime: Handle,
    pending: HashMap<ColumnKey, SaveRequest>,
    order: VecDeque<Queued>,
    level: Option<LevelInfo>,
    /// Columns this session wrote that were not in storage before. Anything
    /// else found in storage predates the session.
    created: HashSet<ColumnKey>,
    written: u64,
}

impl<S: ChunkStore> SaveService<S> {
    pub fn new(store: S, settings: SaveSettings, runtime: Handle) -> Self {
        Self {
            store,
            settings,
            runtime,
            pending: HashMap::new(),
            order: VecDeque::new(),
            level: None,
            created: HashSet::new(),
            written: 0,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn is_idle(&self) -> bool {
        self.order.is_empty() && self.level.is_none()
    }

    pub fn enqueue(&mut self, message: SaveMessage) {
        match message {
            SaveMessage::Chunk(request) => {
                let key = (request.chunk.dimension.clone(), request.chunk.pos);
                if self.pending.insert(key.clone(), request).is_some() {
                    trace!("Superseded queued save of {}", key.1);
                } else {
                    self.order.push_back(Queued::Column(key));
                }
            }
            SaveMessage::Level(info) => self.level = Some(info),
            SaveMessage::SessionEnded => self.order.push_back(Queued::SessionEnd),
        }
    }

    /// Perform one write. Returns false when nothing was waiting.
    pub fn write_next(&mut self) -> bool {
        if let Some(info) = self.level.take() {
            self.write_level(&info);
            return true;
        }
        match self.order.pop_front() {
            Some(Queued::Column(key)) => {
                if let Some(request) = self.pending.remove(&key) {
                    self.persist(request);
                }
                true
            }
            Some(Queued::SessionEnd) => {
                debug!("Session ended, forgetting {} new columns", self.created.len());
                self.created.clear();
                true
            }
            None => false,
        }
    }

    fn write_level(&mut self, info: &LevelInfo) {
        let result = info.to_bytes().and_then(|bytes| self.store.write_level(&bytes));
        match result {
            Ok(()) => info!("Wrote level.dat for {}", info.version.name),
            Err(e) => warn!("Failed to write level.dat: {}", e),
        }
    }

    fn persist(&mut self, request: SaveRequest) {
        let SaveRequest { chunk, context } = request;
        let registries = match self.runtime.block_on(context.registries.wait_ready()) {
            Ok(registries) => registries,
            Err(e) => {
                error!("Cannot save column {}: {}", chunk.pos, e);
                return;
            }
        };

        let dimension = chunk.dimension.clone();
        let Some(target) = storage_pos(chunk.pos, self.settings.center_x, self.settings.center_z)
        else {
            warn!("Column {} cannot be shifted by the center offset, not saving", chunk.pos);
            return;
        };
        let stored_now = match self.store.contains(&dimension, target) {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Cannot check column {} in storage: {}", target, e);
                false
            }
        };
        let key = (dimension.clone(), target);
        let preexisting = stored_now && !self.created.contains(&key);

        if preexisting && self.settings.existing == ExistingChunks::Skip {
            debug!("Skipping column {} already in storage", target);
            return;
        }

        let ctx = AnvilContext {
            registries: &registries,
            biome_names: &context.biome_names,
            mask_bedrock: self.settings.mask_bedrock,
        };
        let mut nbt = chunk_to_nbt(&chunk, target, &ctx, 0);

        if stored_now && self.settings.existing == ExistingChunks::Merge && !chunk.ignore_old_data {
            match self.store.load(&dimension, target) {
                Ok(Some(stored)) => nbt = merge_stored(&stored, nbt),
                Ok(None) => {}
                Err(e) => warn!("Cannot read column {} for merging: {}", target, e),
            }
        }
        if !preexisting && self.settings.mark_new_chunks {
            mark_new(&mut nbt);
        }

        let attempts = self.settings.write_attempts;
        for attempt in 1..=attempts {
            match self.store.store(&dimension, target, &nbt) {
                Ok(()) => {
                    if !preexisting {
                        self.created.insert(key);
                    }
                    self.written += 1;
                    trace!("Saved column {} in {}", target, dimension);
                    return;
                }
                Err(e) if attempt < attempts => {
                    warn!("Write of column {} failed ({}), retrying", target, e);
                }
                Err(e) => {
                    error!("Dropping column {} after {} attempts: {}", target, attempts, e);
                }
            }
        }
    }
}

/// Worker loop. Runs on a blocking thread; waits on `runtime` for registries.
pub fn run_save_worker<S: ChunkStore>(
    mut rx: mpsc::Receiver<SaveMessage>,
    store: S,
    settings: SaveSettings,
    runtime: Handle,
) {
    let mut service = SaveService::new(store, settings, runtime);
    loop {
        if service.is_idle() {
            match rx.blocking_recv() {
                Some(message) => service.enqueue(message),
                None => break,
            }
        }
        while let Ok(message) = rx.try_recv() {
            service.enqueue(message);
        }
        service.write_next();
    }
    info!("Save worker stopped after {} writes", service.written());
}
