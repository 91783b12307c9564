use crate::keyexchange::PendingLogin;
use std::sync::Arc;
use strata_protocol_core::{
    CipherStream, CompressionCodec, Direction, GameVersion, NetworkMode, PacketBuilder,
};
use strata_protocol_versions::{resolve, table_for, VERSIONS};
use strata_registry::{RegistryHandle, RegistryLoader};
use strata_types::{ChunkPos, Dimension, Vec3d, WorldHeight};
use strata_world::DecodeContext;
use tracing::{debug, info};

/// Everything background workers need to interpret a packet, captured when
/// the packet is queued. Replaced, never mutated, when the session changes.
#[derive(Debug, Clone)]
pub struct WorldContext {
    pub decode: DecodeContext,
    pub registries: RegistryHandle,
    /// Biome names by network id (1.18+), empty before.
    pub biome_names: Arc<Vec<String>>,
}

impl WorldContext {
    pub fn version(&self) -> GameVersion {
        self.decode.version
    }

    pub fn dimension(&self) -> &Dimension {
        &self.decode.dimension
    }
}

/// State of one proxied connection. Owned by the relay; workers only ever
/// see [`WorldContext`] snapshots.
pub struct NetworkSession {
    mode: NetworkMode,
    protocol: i32,
    version: GameVersion,
    serverbound: PacketBuilder,
    clientbound: PacketBuilder,
    loader: Arc<RegistryLoader>,
    registries: Option<RegistryHandle>,

    pub position: Vec3d,
    dimension: Dimension,
    height: WorldHeight,
    biome_names: Arc<Vec<String>>,
    dimension_types: Vec<(String, WorldHeight)>,
    snapshot: Option<Arc<WorldContext>>,

    /// Decrypts what the client sends, encrypts what we send it.
    pub client_cipher: CipherStream,
    /// Decrypts what the server sends, encrypts what we send it.
    pub server_cipher: CipherStream,
    /// Both sockets always share one threshold.
    pub compression: CompressionCodec,
    pub pending_login: Option<PendingLogin>,
}

impl NetworkSession {
    pub fn new(loader: Arc<RegistryLoader>) -> Self {
        let version = VERSIONS[0];
        Self {
            mode: NetworkMode::Handshake,
            protocol: 0,
            version,
            serverbound: PacketBuilder::new(
                Direction::Serverbound,
                table_for(NetworkMode::Handshake, version),
            ),
            clientbound: PacketBuilder::new(
                Direction::Clientbound,
                table_for(NetworkMode::Handshake, version),
            ),
            loader,
            registries: None,
            position: Vec3d::new(0.0, 0.0, 0.0),
            dimension: Dimension::Overworld,
            height: WorldHeight::default(),
            biome_names: Arc::new(Vec::new()),
            dimension_types: Vec::new(),
            snapshot: None,
            client_cipher: CipherStream::new(),
            server_cipher: CipherStream::new(),
            compression: CompressionCodec::new(),
            pending_login: None,
        }
    }

    pub fn mode(&self) -> NetworkMode {
        self.mode
    }

    pub fn protocol(&self) -> i32 {
        self.protocol
    }

    pub fn version(&self) -> GameVersion {
        self.version
    }

    pub fn builder(&self, direction: Direction) -> &PacketBuilder {
        match direction {
            Direction::Serverbound => &self.serverbound,
            Direction::Clientbound => &self.clientbound,
        }
    }

    pub fn dimension(&self) -> &Dimension {
        &self.dimension
    }

    pub fn height(&self) -> WorldHeight {
        self.height
    }

    pub fn player_chunk(&self) -> ChunkPos {
        self.position.chunk_pos()
    }

    /// Record the protocol announced in the handshake.
    pub fn set_protocol(&mut self, protocol: i32) {
        self.protocol = protocol;
        self.version = resolve(protocol);
    }

    /// Swap both builders for `mode`. Entering GAME resolves the version
    /// table and starts loading registries without waiting for them; the new
    /// handle is returned so the caller can watch it.
    pub fn set_mode(&mut self, mode: NetworkMode) -> Option<RegistryHandle> {
        let table = table_for(mode, self.version);
        self.serverbound = PacketBuilder::new(Direction::Serverbound, table.clone());
        self.clientbound = PacketBuilder::new(Direction::Clientbound, table);
        debug!("Mode {:?} -> {:?}", self.mode, mode);
        self.mode = mode;

        if mode != NetworkMode::Game {
            return None;
        }
        info!(
            "Game version {} (protocol {}, data version {})",
            self.version.name, self.version.protocol, self.version.data_version
        );
        self.height = self.dimension.default_height(false);
        self.snapshot = None;
        let handle = self.loader.load(self.version);
        self.registries = Some(handle.clone());
        Some(handle)
    }

    /// Return to a fresh HANDSHAKE session. Snapshots already handed to
    /// workers are unaffected.
    pub fn reset(&mut self) {
        *self = Self::new(self.loader.clone());
    }

    /// Apply the world a join game or respawn announced.
    pub fn set_world(
        &mut self,
        dimension: Dimension,
        height: Option<WorldHeight>,
        dimension_type: Option<&str>,
    ) {
        let height = height
            .or_else(|| {
                dimension_type.and_then(|name| {
                    self.dimension_types
                        .iter()
                        .find(|(n, _)| n == name)
                        .map(|(_, h)| *h)
                })
            })
            .unwrap_or_else(|| dimension.default_height(self.version.protocol >= 757));
        debug!("World {} with height {:?}", dimension, height);
        self.dimension = dimension;
        self.height = height;
        self.snapshot = None;
    }

    pub fn set_dimension_types(&mut self, types: Vec<(String, WorldHeight)>) {
        self.dimension_types = types;
    }

    pub fn set_biome_names(&mut self, names: Vec<String>) {
        self.biome_names = Arc::new(names);
        self.snapshot = None;
    }

    /// The current world context, or `None` before GAME mode.
    pub fn snapshot(&mut self) -> Option<Arc<WorldContext>> {
        if self.mode != NetworkMode::Game {
            return None;
        }
        if self.snapshot.is_none() {
            let registries = self.registries.clone()?;
            self.snapshot = Some(Arc::new(WorldContext {
                decode: DecodeContext {
                    version: self.version,
                    dimension: self.dimension.clone(),
                    height: self.height,
                },
                registries,
                biome_names: self.biome_names.clone(),
            }));
        }
        self.snapshot.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> NetworkSession {
        NetworkSession::new(Arc::new(RegistryLoader::new("/nonexistent")))
    }

    #[tokio::test]
    async fn test_reset_from_every_mode() {
        for mode in [NetworkMode::Status, NetworkMode::Login, NetworkMode::Game] {
            let mut s = session();
            s.set_protocol(340);
            s.set_mode(mode);
            s.client_cipher.enable(&[3; 16]);
            s.server_cipher.enable(&[3; 16]);
            s.compression.enable(256);
            s.reset();
            assert_eq!(s.mode(), NetworkMode::Handshake);
            assert!(!s.client_cipher.is_enabled());
            assert!(!s.server_cipher.is_enabled());
            assert!(!s.compression.is_enabled());
            assert_eq!(s.builder(Direction::Serverbound).mode(), NetworkMode::Handshake);
        }
    }

    #[tokio::test]
    async fn test_game_mode_binds_version_table() {
        let mut s = session();
        s.set_protocol(578);
        assert!(s.set_mode(NetworkMode::Login).is_none());
        assert_eq!(s.builder(Direction::Clientbound).protocol_version(), 578);
        let handle = s.set_mode(NetworkMode::Game).unwrap();
        assert_eq!(handle.version().name, "1.15.2");
        assert_eq!(s.builder(Direction::Serverbound).mode(), NetworkMode::Game);
    }

    #[tokio::test]
    async fn test_snapshot_survives_reset() {
        let mut s = session();
        s.set_protocol(340);
        assert!(s.snapshot().is_none());
        s.set_mode(NetworkMode::Game);
        s.set_world(Dimension::Nether, None, None);
        let before = s.snapshot().unwrap();
        assert!(Arc::ptr_eq(&before, &s.snapshot().unwrap()));
        s.reset();
        assert!(s.snapshot().is_none());
        assert_eq!(before.dimension(), &Dimension::Nether);
        assert_eq!(before.version().protocol, 340);
    }

    #[tokio::test]
    async fn test_respawn_height_from_dimension_types() {
        let mut s = session();
        s.set_protocol(763);
        s.set_mode(NetworkMode::Game);
        s.set_dimension_types(vec![("minecraft:overworld".into(), WorldHeight::new(-64, 384))]);
        s.set_world(Dimension::Overworld, None, Some("minecraft:overworld"));
        assert_eq!(s.height(), WorldHeight::new(-64, 384));
        s.set_world(Dimension::End, None, Some("minecraft:the_end"));
        assert_eq!(s.height(), WorldHeight::new(0, 256));
    }
}
