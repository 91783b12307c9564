use crate::error::RegistryError;
use crate::palette::{GlobalPalette, NameTable};
use crate::reports::{
    Reports, BLOCK_ENTITY_REGISTRY, ENTITY_REGISTRY, ITEM_REGISTRY, MENU_REGISTRY,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use strata_protocol_core::GameVersion;
use tokio::sync::watch;
use tracing::{error, info};

/// Lookup tables for one game version.
#[derive(Debug, Clone)]
pub struct Registries {
    pub version: GameVersion,
    pub blocks: GlobalPalette,
    pub entities: NameTable,
    pub menus: NameTable,
    pub items: NameTable,
    pub block_entities: NameTable,
}

impl Registries {
    /// Tables for a version whose block ids are numeric (before 1.13).
    pub fn legacy(version: GameVersion) -> Self {
        Self {
            version,
            blocks: GlobalPalette::new(),
            entities: NameTable::new(),
            menus: NameTable::new(),
            items: NameTable::new(),
            block_entities: NameTable::new(),
        }
    }

    /// Parse the reports of `version` below `root` and build every table.
    pub fn load(root: &Path, version: GameVersion) -> Result<Self, RegistryError> {
        if !version.is_flattened() {
            return Ok(Self::legacy(version));
        }
        let mut reports = Reports::read(&Reports::report_dir(root, version.name))?;
        let registries = Self {
            version,
            blocks: reports.block_palette(),
            entities: reports.names(ENTITY_REGISTRY),
            menus: reports.names(MENU_REGISTRY),
            items: reports.names(ITEM_REGISTRY),
            block_entities: reports.names(BLOCK_ENTITY_REGISTRY),
        };
        reports.clean();
        Ok(registries)
    }
}

/// Readiness of a version's registries.
#[derive(Debug, Clone)]
pub enum RegistryState {
    Pending,
    Ready(Arc<Registries>),
    Failed(String),
}

/// Read side of an asynchronous registry load. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct RegistryHandle {
    version: GameVersion,
    rx: watch::Receiver<RegistryState>,
}

impl RegistryHandle {
    /// A handle that is already resolved.
    pub fn ready(registries: Registries) -> Self {
        let version = registries.version;
        let (_tx, rx) = watch::channel(RegistryState::Ready(Arc::new(registries)));
        Self { version, rx }
    }

    pub fn version(&self) -> GameVersion {
        self.version
    }

    pub fn state(&self) -> RegistryState {
        self.rx.borrow().clone()
    }

    /// The tables, if loading has finished.
    pub fn current(&self) -> Option<Arc<Registries>> {
        match &*self.rx.borrow() {
            RegistryState::Ready(registries) => Some(registries.clone()),
            _ => None,
        }
    }

    /// Wait until loading has finished one way or the other.
    pub async fn wait_ready(&self) -> Result<Arc<Registries>, RegistryError> {
        let mut rx = self.rx.clone();
        let state = rx
            .wait_for(|s| !matches!(s, RegistryState::Pending))
            .await
            .map_err(|_| RegistryError::Abandoned(self.version.name.to_string()))?
            .clone();
        match state {
            RegistryState::Ready(registries) => Ok(registries),
            RegistryState::Failed(reason) => {
                Err(RegistryError::Failed(self.version.name.to_string(), reason))
            }
            RegistryState::Pending => Err(RegistryError::Abandoned(self.version.name.to_string())),
        }
    }
}

/// Loads registries in the background and remembers them per version, so a
/// reconnect with the same client does not parse the reports again.
#[derive(Debug)]
pub struct RegistryLoader {
    root: PathBuf,
    cache: Mutex<HashMap<i32, RegistryHandle>>,
}

impl RegistryLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Startup check: the report root must exist.
    pub fn verify(&self) -> Result<(), RegistryError> {
        if !self.root.is_dir() {
            return Err(RegistryError::MissingRoot(self.root.clone()));
        }
        Ok(())
    }

    /// Start loading `version` without blocking the caller. Must be called
    /// from within a tokio runtime.
    pub fn load(&self, version: GameVersion) -> RegistryHandle {
        let mut cache = match self.cache.lock() {
            Ok(cache) => cache,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(handle) = cache.get(&version.protocol) {
            if !matches!(handle.state(), RegistryState::Failed(_)) {
                return handle.clone();
            }
        }

        let (tx, rx) = watch::channel(RegistryState::Pending);
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || {
            let state = match Registries::load(&root, version) {
                Ok(registries) => {
                    info!(
                        "Registries for {} ready ({} block states)",
                        version.name,
                        registries.blocks.len()
                    );
                    RegistryState::Ready(Arc::new(registries))
                }
                Err(e) => {
                    error!("Failed to load registries for {}: {}", version.name, e);
                    RegistryState::Failed(e.to_string())
                }
            };
            let _ = tx.send(state);
        });

        let handle = RegistryHandle { version, rx };
        cache.insert(version.protocol, handle.clone());
        handle
    }
}
