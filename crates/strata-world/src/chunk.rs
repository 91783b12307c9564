use std::collections::BTreeMap;
use strata_nbt::NbtValue;
use strata_protocol_core::ChunkFormat;
use strata_types::{BlockPos, ChunkPos, Dimension, WorldHeight};

/// Blocks in one 16x16x16 section.
pub const SECTION_VOLUME: usize = 4096;
/// Biome cells in one section from 1.18 (4x4x4).
pub const SECTION_BIOME_VOLUME: usize = 64;
/// Bytes of one nibble light array.
pub const LIGHT_LEN: usize = 2048;

/// Index of a block inside a section: `y << 8 | z << 4 | x`.
pub fn block_index(x: usize, y: usize, z: usize) -> usize {
    (y << 8) | (z << 4) | x
}

/// A 16x16x16 section. Blocks are kept unpacked as global state ids so that
/// updates and merges never have to repack.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkSection {
    /// Vertical section index; negative below y=0 from 1.18.
    pub y: i32,
    /// Global block-state ids, [`block_index`] order.
    pub blocks: Vec<i32>,
    pub block_light: Option<Vec<u8>>,
    pub sky_light: Option<Vec<u8>>,
    /// Raw biome ids of the 4x4x4 cells (1.18+), `y << 4 | z << 2 | x` order.
    pub biomes: Option<Vec<i32>>,
}

impl ChunkSection {
    pub fn new(y: i32, blocks: Vec<i32>) -> Self {
        Self {
            y,
            blocks,
            block_light: None,
            sky_light: None,
            biomes: None,
        }
    }

    /// Section filled with one state.
    pub fn filled(y: i32, state: i32) -> Self {
        Self::new(y, vec![state; SECTION_VOLUME])
    }

    pub fn get_block(&self, x: usize, y: usize, z: usize) -> i32 {
        self.blocks[block_index(x, y, z)]
    }

    /// Returns the previous state.
    pub fn set_block(&mut self, x: usize, y: usize, z: usize, state: i32) -> i32 {
        std::mem::replace(&mut self.blocks[block_index(x, y, z)], state)
    }

    pub fn non_air_count(&self, is_air: impl Fn(i32) -> bool) -> usize {
        self.blocks.iter().filter(|&&s| !is_air(s)).count()
    }

    pub fn is_uniform(&self) -> bool {
        self.blocks.windows(2).all(|w| w[0] == w[1])
    }
}

/// Column-level biomes of the layouts that do not store them per section.
#[derive(Debug, Clone, PartialEq)]
pub enum Biomes {
    /// Not sent (partial chunk update).
    Absent,
    /// One id per column, 16x16 (up to 1.14).
    Flat(Vec<i32>),
    /// One id per 4x4x4 cell over the whole height (1.15 to 1.17).
    Volume(Vec<i32>),
    /// Carried by each section (1.18+).
    PerSection,
}

impl Biomes {
    pub fn is_present(&self) -> bool {
        !matches!(self, Biomes::Absent)
    }
}

/// A block entity as sent in chunk data.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockEntity {
    pub pos: BlockPos,
    /// Registry id of the block entity type (1.18+); earlier versions keep the
    /// type name in the NBT's `id` tag.
    pub kind: Option<i32>,
    pub nbt: NbtValue,
}

/// Canonical chunk column, independent of the layout it was decoded from.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub pos: ChunkPos,
    pub dimension: Dimension,
    /// Layout the column was received in; decides how it is persisted.
    pub format: ChunkFormat,
    pub data_version: i32,
    pub height: WorldHeight,
    /// Keyed by section index, which keeps indices unique.
    pub sections: BTreeMap<i32, ChunkSection>,
    pub biomes: Biomes,
    pub heightmaps: Option<NbtValue>,
    pub block_entities: Vec<BlockEntity>,
    /// Whether the packet described the whole column. Partial updates only
    /// replace the sections they carry.
    pub full: bool,
    /// The server asked for previously known data of this column to be dropped.
    pub ignore_old_data: bool,
}

impl Chunk {
    pub fn new(
        pos: ChunkPos,
        dimension: Dimension,
        format: ChunkFormat,
        data_version: i32,
        height: WorldHeight,
    ) -> Self {
        Self {
            pos,
            dimension,
            format,
            data_version,
            height,
            sections: BTreeMap::new(),
            biomes: Biomes::Absent,
            heightmaps: None,
            block_entities: Vec::new(),
            full: true,
            ignore_old_data: false,
        }
    }

    fn section_coords(&self, world_y: i32) -> Option<(i32, usize)> {
        let max_y = self.height.min_y + self.height.height;
        if world_y < self.height.min_y || world_y >= max_y {
            return None;
        }
        Some((world_y >> 4, (world_y & 15) as usize))
    }

    /// State at chunk-local x/z and world y. Missing sections read as air (0).
    pub fn get_block(&self, local_x: usize, world_y: i32, local_z: usize) -> i32 {
        self.section_coords(world_y)
            .and_then(|(sy, ly)| self.sections.get(&sy).map(|s| s.get_block(local_x, ly, local_z)))
            .unwrap_or(0)
    }

    /// Set a state, creating an air section if needed. Returns the previous
    /// state, or `None` if `world_y` is outside the world.
    pub fn set_block(&mut self, local_x: usize, world_y: i32, local_z: usize, state: i32) -> Option<i32> {
        let (sy, ly) = self.section_coords(world_y)?;
        let section = self
            .sections
            .entry(sy)
            .or_insert_with(|| ChunkSection::filled(sy, 0));
        Some(section.set_block(local_x, ly, local_z, state))
    }

    /// Apply an update received for this column. A full update or one that
    /// asks to ignore old data replaces everything; a partial update only
    /// replaces the sections it carries.
    pub fn merge_update(&mut self, update: Chunk) {
        if update.full || update.ignore_old_data {
            *self = update;
            return;
        }
        for (y, section) in update.sections {
            self.sections.insert(y, section);
        }
        if update.biomes.is_present() {
            self.biomes = update.biomes;
        }
        if update.heightmaps.is_some() {
            self.heightmaps = update.heightmaps;
        }
        for entity in update.block_entities {
            self.block_entities.retain(|e| e.pos != entity.pos);
            self.block_entities.push(entity);
        }
    }

    /// Drop block entities whose block no longer matches, after a block change.
    pub fn remove_block_entity(&mut self, pos: BlockPos) {
        self.block_entities.retain(|e| e.pos != pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(full: bool) -> Chunk {
        let mut c = Chunk::new(
            ChunkPos::new(0, 0),
            Dimension::Overworld,
            ChunkFormat::Biome115,
            2230,
            WorldHeight::default(),
        );
        c.full = full;
        c
    }

    #[test]
    fn test_get_set_block() {
        let mut c = chunk(true);
        assert_eq!(c.get_block(1, 70, 2), 0);
        assert_eq!(c.set_block(1, 70, 2, 33), Some(0));
        assert_eq!(c.get_block(1, 70, 2), 33);
        assert!(c.sections.contains_key(&4));
        assert_eq!(c.set_block(0, 256, 0, 1), None);
        assert_eq!(c.set_block(0, -1, 0, 1), None);
    }

    #[test]
    fn test_negative_sections() {
        let mut c = chunk(true);
        c.height = WorldHeight::new(-64, 384);
        c.set_block(15, -64, 15, 7);
        assert_eq!(c.sections.keys().copied().collect::<Vec<_>>(), vec![-4]);
        assert_eq!(c.get_block(15, -64, 15), 7);
    }

    #[test]
    fn test_partial_merge_keeps_other_sections() {
        let mut cached = chunk(true);
        cached.sections.insert(0, ChunkSection::filled(0, 1));
        cached.sections.insert(1, ChunkSection::filled(1, 1));
        cached.biomes = Biomes::Volume(vec![1; 1024]);

        let mut update = chunk(false);
        update.sections.insert(1, ChunkSection::filled(1, 2));
        cached.merge_update(update);

        assert_eq!(cached.sections[&0].blocks[0], 1);
        assert_eq!(cached.sections[&1].blocks[0], 2);
        assert!(cached.biomes.is_present());
        assert!(cached.full);
    }

    #[test]
    fn test_ignore_old_data_replaces() {
        let mut cached = chunk(true);
        cached.sections.insert(0, ChunkSection::filled(0, 1));
        let mut update = chunk(false);
        update.ignore_old_data = true;
        update.sections.insert(3, ChunkSection::filled(3, 5));
        cached.merge_update(update);
        assert_eq!(cached.sections.len(), 1);
        assert!(cached.ignore_old_data);
    }

    #[test]
    fn test_uniform() {
        let mut s = ChunkSection::filled(0, 1);
        assert!(s.is_uniform());
        s.set_block(0, 0, 1, 2);
        assert!(!s.is_uniform());
        assert_eq!(s.non_air_count(|id| id == 0), 4096);
    }
}
