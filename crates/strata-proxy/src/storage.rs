use std::io;
use strata_nbt::NbtValue;
use strata_region::WorldStorage;
use strata_types::{ChunkPos, Dimension};

/// Where the save service puts columns.
pub trait ChunkStore: Send {
    fn contains(&mut self, dimension: &Dimension, pos: ChunkPos) -> io::Result<bool>;

    fn load(&mut self, dimension: &Dimension, pos: ChunkPos) -> io::Result<Option<NbtValue>>;

    fn store(&mut self, dimension: &Dimension, pos: ChunkPos, nbt: &NbtValue) -> io::Result<()>;

    fn write_level(&mut self, bytes: &[u8]) -> io::Result<()>;
}

impl ChunkStore for WorldStorage {
    fn contains(&mut self, dimension: &Dimension, pos: ChunkPos) -> io::Result<bool> {
        WorldStorage::contains(self, dimension, pos)
    }

    fn load(&mut self, dimension: &Dimension, pos: ChunkPos) -> io::Result<Option<NbtValue>> {
        WorldStorage::load(self, dimension, pos)
    }

    fn store(&mut self, dimension: &Dimension, pos: ChunkPos, nbt: &NbtValue) -> io::Result<()> {
        WorldStorage::store(self, dimension, pos, nbt)
    }

    fn write_level(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_level_dat(bytes)
    }
}
