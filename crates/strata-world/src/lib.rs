pub mod anvil;
pub mod chunk;
pub mod decoder;
pub mod level;
pub mod palette;

pub use anvil::{chunk_to_nbt, mark_new, merge_stored, storage_pos, AnvilContext, NEW_CHUNK_TAG};
pub use chunk::{Biomes, BlockEntity, Chunk, ChunkSection, SECTION_VOLUME};
pub use decoder::{decode_chunk, DecodeContext};
pub use level::{level_dat, LevelInfo};
pub use palette::Palette;
