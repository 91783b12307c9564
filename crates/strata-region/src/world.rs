use crate::region_file::RegionStorage;
use bytes::BytesMut;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use strata_nbt::{read_named_root, NbtValue};
use strata_types::{ChunkPos, Dimension};
use tracing::debug;

/// An exported world: one region directory per dimension plus `level.dat`.
pub struct WorldStorage {
    root: PathBuf,
    dimensions: HashMap<Dimension, RegionStorage>,
}

impl WorldStorage {
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            dimensions: HashMap::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `region/` directory of a dimension below the world root.
    pub fn region_dir(root: &Path, dimension: &Dimension) -> PathBuf {
        let save_path = dimension.save_path();
        if save_path.is_empty() {
            root.join("region")
        } else {
            root.join(save_path).join("region")
        }
    }

    fn regions(&mut self, dimension: &Dimension) -> io::Result<&mut RegionStorage> {
        if !self.dimensions.contains_key(dimension) {
            let dir = Self::region_dir(&self.root, dimension);
            debug!("Opening region directory {}", dir.display());
            self.dimensions.insert(dimension.clone(), RegionStorage::new(dir)?);
        }
        self.dimensions
            .get_mut(dimension)
            .ok_or_else(|| io::Error::other("region storage vanished"))
    }

    pub fn contains(&mut self, dimension: &Dimension, pos: ChunkPos) -> io::Result<bool> {
        self.regions(dimension)?.contains(pos)
    }

    /// Read a stored column's NBT.
    pub fn load(&mut self, dimension: &Dimension, pos: ChunkPos) -> io::Result<Option<NbtValue>> {
        let Some(bytes) = self.regions(dimension)?.read_chunk(pos)? else {
            return Ok(None);
        };
        let (_, nbt) = read_named_root(&mut &bytes[..])
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        Ok(Some(nbt))
    }

    pub fn store(&mut self, dimension: &Dimension, pos: ChunkPos, nbt: &NbtValue) -> io::Result<()> {
        let mut buf = BytesMut::new();
        nbt.write_root_named("", &mut buf);
        self.regions(dimension)?.write_chunk(pos, &buf)
    }

    /// Replace `level.dat`, going through a temporary file so a crash never
    /// leaves a truncated one behind.
    pub fn write_level_dat(&self, bytes: &[u8]) -> io::Result<()> {
        let tmp = self.root.join("level.dat_new");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, self.root.join("level.dat"))
    }
}
