//! Chunk data packet decoding, one pure function per wire layout.
//!
//! The layout is picked once from the game version ([`ChunkFormat`]) and the
//! whole column is read under its rules. All layouts share the palette and
//! section helpers below.

use crate::chunk::{
    BlockEntity, Biomes, Chunk, ChunkSection, LIGHT_LEN, SECTION_BIOME_VOLUME, SECTION_VOLUME,
};
use crate::palette::{
    self, Palette, MAX_INDEXED_BIOME_BITS, MAX_INDEXED_BLOCK_BITS, MIN_INDEXED_BLOCK_BITS,
};
use bytes::{Buf, BytesMut};
use strata_nbt::{read_named_root, NbtValue};
use strata_protocol_core::*;
use strata_types::{BlockPos, ChunkPos, Dimension, WorldHeight};

/// Sections addressed by the 16-bit masks used up to 1.16.
const LEGACY_SECTIONS: usize = 16;
/// Upper bound for palette and array capacity reservations.
const MAX_RESERVE: usize = SECTION_VOLUME;

/// Everything a chunk decode needs besides the packet body. Captured when the
/// packet is queued, so later session changes do not affect it.
#[derive(Debug, Clone)]
pub struct DecodeContext {
    pub version: GameVersion,
    pub dimension: Dimension,
    pub height: WorldHeight,
}

impl DecodeContext {
    pub fn format(&self) -> ChunkFormat {
        self.version.chunk_format()
    }
}

/// Decode a chunk data packet body (after the packet id).
pub fn decode_chunk(data: &mut BytesMut, ctx: &DecodeContext) -> Result<Chunk, DecodeError> {
    match ctx.format() {
        ChunkFormat::Legacy112 => decode_legacy_112(data, ctx),
        ChunkFormat::Flattened113 => decode_flattened_113(data, ctx),
        ChunkFormat::Heightmap114 => decode_heightmap_114(data, ctx),
        ChunkFormat::Biome115 => decode_biome_115(data, ctx),
        ChunkFormat::IgnoreOldData116 => decode_ignore_old_data_116(data, ctx),
        ChunkFormat::VarBiome1162 => decode_var_biome_1162(data, ctx),
        ChunkFormat::Bitset117 => decode_bitset_117(data, ctx),
        ChunkFormat::Paletted118 { trust_edges } => decode_paletted_118(data, ctx, trust_edges),
    }
}

// === Shared helpers ===

fn new_chunk(data: &mut BytesMut, ctx: &DecodeContext) -> Result<Chunk, DecodeError> {
    let x = read_i32(data)?;
    let z = read_i32(data)?;
    Ok(Chunk::new(
        ChunkPos::new(x, z),
        ctx.dimension.clone(),
        ctx.format(),
        ctx.version.data_version,
        ctx.height,
    ))
}

fn insert_section(chunk: &mut Chunk, section: ChunkSection) -> Result<(), DecodeError> {
    let y = section.y;
    if chunk.sections.insert(y, section).is_some() {
        return Err(DecodeError::DuplicateSection(y));
    }
    Ok(())
}

fn read_nbt(data: &mut BytesMut) -> Result<NbtValue, DecodeError> {
    read_named_root(data)
        .map(|(_, value)| value)
        .map_err(|e| DecodeError::Nbt(e.to_string()))
}

fn read_id_list(data: &mut BytesMut, len: usize) -> Result<Vec<i32>, DecodeError> {
    let mut ids = Vec::with_capacity(len.min(MAX_RESERVE));
    for _ in 0..len {
        ids.push(read_varint(data)?);
    }
    Ok(ids)
}

fn read_int_array(data: &mut BytesMut, len: usize) -> Result<Vec<i32>, DecodeError> {
    ensure(data, len.saturating_mul(4))?;
    Ok((0..len).map(|_| data.get_i32()).collect())
}

fn read_light(data: &mut BytesMut) -> Result<Vec<u8>, DecodeError> {
    ensure(data, LIGHT_LEN)?;
    Ok(data.split_to(LIGHT_LEN).to_vec())
}

/// The section data blob is length-prefixed; parse it from its own buffer.
fn read_section_blob(data: &mut BytesMut) -> Result<BytesMut, DecodeError> {
    let size = read_length(data)?;
    ensure(data, size)?;
    Ok(data.split_to(size))
}

/// Sections present according to a legacy 16-bit mask.
fn legacy_mask_sections(mask: i32) -> Result<Vec<i32>, DecodeError> {
    if (mask as u32) >> LEGACY_SECTIONS != 0 {
        return Err(DecodeError::Malformed(format!(
            "section mask 0x{:X} has bits above section 15",
            mask
        )));
    }
    Ok((0..LEGACY_SECTIONS as i32).filter(|i| mask & (1 << i) != 0).collect())
}

/// Block states of one section before 1.18: bit width, palette, packed longs.
fn read_block_states(data: &mut BytesMut, format: ChunkFormat) -> Result<Vec<i32>, DecodeError> {
    let declared = read_u8(data)?;
    let indexed = declared <= MAX_INDEXED_BLOCK_BITS;

    let palette = if format == ChunkFormat::Legacy112 {
        // The length is written even for direct palettes, where it is 0.
        let len = read_length(data)?;
        let ids = read_id_list(data, len)?;
        if indexed {
            Palette::Indexed(ids)
        } else {
            Palette::Direct
        }
    } else if indexed {
        let len = read_length(data)?;
        Palette::Indexed(read_id_list(data, len)?)
    } else {
        Palette::Direct
    };

    let bits = if indexed {
        declared.max(MIN_INDEXED_BLOCK_BITS)
    } else {
        declared
    };
    let words_len = read_length(data)?;
    let words = read_long_array(data, words_len)?;
    palette::decode(&palette, bits, &words, SECTION_VOLUME, format.aligned_packing())
}

fn read_block_entities(data: &mut BytesMut) -> Result<Vec<BlockEntity>, DecodeError> {
    let count = read_length(data)?;
    let mut entities = Vec::with_capacity(count.min(MAX_RESERVE));
    for _ in 0..count {
        let nbt = read_nbt(data)?;
        let coord = |key: &str| nbt.get(key).and_then(|v| v.as_i32()).unwrap_or(0);
        let pos = BlockPos::new(coord("x"), coord("y"), coord("z"));
        entities.push(BlockEntity {
            pos,
            kind: None,
            nbt,
        });
    }
    Ok(entities)
}

/// Sections of the 1.12 to 1.16.5 layouts, selected by a 16-bit mask.
fn read_masked_sections(
    blob: &mut BytesMut,
    chunk: &mut Chunk,
    mask: i32,
    ctx: &DecodeContext,
) -> Result<(), DecodeError> {
    let format = ctx.format();
    for y in legacy_mask_sections(mask)? {
        if format.has_block_count() {
            let _block_count = read_i16(blob)?;
        }
        let blocks = read_block_states(blob, format)?;
        let mut section = ChunkSection::new(y, blocks);
        if format.light_inline() {
            section.block_light = Some(read_light(blob)?);
            if ctx.dimension.has_skylight() {
                section.sky_light = Some(read_light(blob)?);
            }
        }
        insert_section(chunk, section)?;
    }
    Ok(())
}

// === Layouts ===

/// 1.12: full flag, 16-bit mask, inline light, one biome byte per column.
fn decode_legacy_112(data: &mut BytesMut, ctx: &DecodeContext) -> Result<Chunk, DecodeError> {
    let mut chunk = new_chunk(data, ctx)?;
    chunk.full = read_bool(data)?;
    let mask = read_varint(data)?;
    let mut blob = read_section_blob(data)?;
    read_masked_sections(&mut blob, &mut chunk, mask, ctx)?;
    if chunk.full {
        ensure(&blob, 256)?;
        chunk.biomes = Biomes::Flat(blob.split_to(256).iter().map(|&b| b as i32).collect());
    }
    chunk.block_entities = read_block_entities(data)?;
    Ok(chunk)
}

/// 1.13: as 1.12, but direct palettes have no length and biomes are ints.
fn decode_flattened_113(data: &mut BytesMut, ctx: &DecodeContext) -> Result<Chunk, DecodeError> {
    let mut chunk = new_chunk(data, ctx)?;
    chunk.full = read_bool(data)?;
    let mask = read_varint(data)?;
    let mut blob = read_section_blob(data)?;
    read_masked_sections(&mut blob, &mut chunk, mask, ctx)?;
    if chunk.full {
        chunk.biomes = Biomes::Flat(read_int_array(&mut blob, 256)?);
    }
    chunk.block_entities = read_block_entities(data)?;
    Ok(chunk)
}

/// 1.14: heightmaps, per-section block counts, light sent separately.
fn decode_heightmap_114(data: &mut BytesMut, ctx: &DecodeContext) -> Result<Chunk, DecodeError> {
    let mut chunk = new_chunk(data, ctx)?;
    chunk.full = read_bool(data)?;
    let mask = read_varint(data)?;
    chunk.heightmaps = Some(read_nbt(data)?);
    let mut blob = read_section_blob(data)?;
    read_masked_sections(&mut blob, &mut chunk, mask, ctx)?;
    if chunk.full {
        chunk.biomes = Biomes::Flat(read_int_array(&mut blob, 256)?);
    }
    chunk.block_entities = read_block_entities(data)?;
    Ok(chunk)
}

/// 1.15: 1024 biome cells ahead of the section data.
fn decode_biome_115(data: &mut BytesMut, ctx: &DecodeContext) -> Result<Chunk, DecodeError> {
    let mut chunk = new_chunk(data, ctx)?;
    chunk.full = read_bool(data)?;
    let mask = read_varint(data)?;
    chunk.heightmaps = Some(read_nbt(data)?);
    if chunk.full {
        chunk.biomes = Biomes::Volume(read_int_array(data, 1024)?);
    }
    let mut blob = read_section_blob(data)?;
    read_masked_sections(&mut blob, &mut chunk, mask, ctx)?;
    chunk.block_entities = read_block_entities(data)?;
    Ok(chunk)
}

/// 1.16 and 1.16.1: the ignore-old-data flag follows the full flag.
fn decode_ignore_old_data_116(
    data: &mut BytesMut,
    ctx: &DecodeContext,
) -> Result<Chunk, DecodeError> {
    let mut chunk = new_chunk(data, ctx)?;
    chunk.full = read_bool(data)?;
    chunk.ignore_old_data = read_bool(data)?;
    let mask = read_varint(data)?;
    chunk.heightmaps = Some(read_nbt(data)?);
    if chunk.full {
        chunk.biomes = Biomes::Volume(read_int_array(data, 1024)?);
    }
    let mut blob = read_section_blob(data)?;
    read_masked_sections(&mut blob, &mut chunk, mask, ctx)?;
    chunk.block_entities = read_block_entities(data)?;
    Ok(chunk)
}

/// 1.16.2 to 1.16.5: biomes become a length-prefixed VarInt array.
fn decode_var_biome_1162(data: &mut BytesMut, ctx: &DecodeContext) -> Result<Chunk, DecodeError> {
    let mut chunk = new_chunk(data, ctx)?;
    chunk.full = read_bool(data)?;
    let mask = read_varint(data)?;
    chunk.heightmaps = Some(read_nbt(data)?);
    if chunk.full {
        let len = read_length(data)?;
        chunk.biomes = Biomes::Volume(read_id_list(data, len)?);
    }
    let mut blob = read_section_blob(data)?;
    read_masked_sections(&mut blob, &mut chunk, mask, ctx)?;
    chunk.block_entities = read_block_entities(data)?;
    Ok(chunk)
}

/// 1.17: always a full column; the mask is a BitSet over the world height.
fn decode_bitset_117(data: &mut BytesMut, ctx: &DecodeContext) -> Result<Chunk, DecodeError> {
    let mut chunk = new_chunk(data, ctx)?;
    let mask = read_bitset(data)?;
    chunk.heightmaps = Some(read_nbt(data)?);
    let biome_len = read_length(data)?;
    chunk.biomes = Biomes::Volume(read_id_list(data, biome_len)?);

    let count = ctx.height.section_count();
    if (count..mask.len() * 64).any(|i| bitset_get(&mask, i)) {
        return Err(DecodeError::Malformed(format!(
            "section mask exceeds {} sections",
            count
        )));
    }

    let mut blob = read_section_blob(data)?;
    let min_section = ctx.height.min_section();
    for i in (0..count).filter(|&i| bitset_get(&mask, i)) {
        let _block_count = read_i16(&mut blob)?;
        let blocks = read_block_states(&mut blob, ChunkFormat::Bitset117)?;
        insert_section(&mut chunk, ChunkSection::new(min_section + i as i32, blocks))?;
    }
    chunk.block_entities = read_block_entities(data)?;
    Ok(chunk)
}

/// One paletted container of the 1.18 layout.
fn read_container(
    data: &mut BytesMut,
    volume: usize,
    max_indexed: u8,
    min_indexed: u8,
) -> Result<Vec<i32>, DecodeError> {
    let declared = read_u8(data)?;
    let (palette, bits) = if declared == 0 {
        (Palette::Indexed(vec![read_varint(data)?]), 0)
    } else if declared <= max_indexed {
        let len = read_length(data)?;
        (
            Palette::Indexed(read_id_list(data, len)?),
            declared.max(min_indexed),
        )
    } else {
        (Palette::Direct, declared)
    };
    let words_len = read_length(data)?;
    let words = read_long_array(data, words_len)?;
    palette::decode(&palette, bits, &words, volume, true)
}

/// Light arrays of the 1.18 layout, keyed by the mask bit they belong to.
fn read_light_arrays(data: &mut BytesMut, mask: &[i64]) -> Result<Vec<(usize, Vec<u8>)>, DecodeError> {
    let count = read_length(data)?;
    let bits = (0..mask.len() * 64).filter(|&i| bitset_get(mask, i));
    let mut arrays = Vec::with_capacity(count.min(64));
    for bit in bits.take(count) {
        let array = read_byte_array(data)?;
        if array.len() != LIGHT_LEN {
            return Err(DecodeError::Malformed(format!(
                "light array of {} bytes",
                array.len()
            )));
        }
        arrays.push((bit, array));
    }
    if arrays.len() != count {
        return Err(DecodeError::Malformed(
            "more light arrays than mask bits".into(),
        ));
    }
    Ok(arrays)
}

/// 1.18 onwards: every section present, paletted biomes per section, block
/// entities with packed positions, light embedded at the end.
fn decode_paletted_118(
    data: &mut BytesMut,
    ctx: &DecodeContext,
    trust_edges: bool,
) -> Result<Chunk, DecodeError> {
    let mut chunk = new_chunk(data, ctx)?;
    chunk.heightmaps = Some(read_nbt(data)?);
    chunk.biomes = Biomes::PerSection;

    let mut blob = read_section_blob(data)?;
    let min_section = ctx.height.min_section();
    for i in 0..ctx.height.section_count() {
        let _block_count = read_i16(&mut blob)?;
        let blocks = read_container(
            &mut blob,
            SECTION_VOLUME,
            MAX_INDEXED_BLOCK_BITS,
            MIN_INDEXED_BLOCK_BITS,
        )?;
        let biomes = read_container(&mut blob, SECTION_BIOME_VOLUME, MAX_INDEXED_BIOME_BITS, 1)?;
        let mut section = ChunkSection::new(min_section + i as i32, blocks);
        section.biomes = Some(biomes);
        insert_section(&mut chunk, section)?;
    }

    let count = read_length(data)?;
    for _ in 0..count {
        let packed_xz = read_u8(data)? as i32;
        let y = read_i16(data)? as i32;
        let kind = read_varint(data)?;
        let nbt = read_nbt(data)?;
        chunk.block_entities.push(BlockEntity {
            pos: chunk.pos.block(packed_xz >> 4, y, packed_xz & 15),
            kind: Some(kind),
            nbt,
        });
    }

    if trust_edges {
        let _trust_edges = read_bool(data)?;
    }
    let sky_mask = read_bitset(data)?;
    let block_mask = read_bitset(data)?;
    let _empty_sky_mask = read_bitset(data)?;
    let _empty_block_mask = read_bitset(data)?;
    let sky = read_light_arrays(data, &sky_mask)?;
    let block = read_light_arrays(data, &block_mask)?;

    // Light masks start one section below the world.
    let light_y = |bit: usize| min_section - 1 + bit as i32;
    for (bit, array) in sky {
        if let Some(section) = chunk.sections.get_mut(&light_y(bit)) {
            section.sky_light = Some(array);
        }
    }
    for (bit, array) in block {
        if let Some(section) = chunk.sections.get_mut(&light_y(bit)) {
            section.block_light = Some(array);
        }
    }
    Ok(chunk)
}
