//! Conversion of decoded chunks to the Anvil chunk NBT of their data version.
//!
//! Three layouts exist: numeric `Blocks`/`Add`/`Data` arrays before the
//! flattening, a `Level` compound with name palettes from 1.13, and the flat
//! root with `block_states`/`biomes` containers from 1.18.

use crate::chunk::{Biomes, Chunk, ChunkSection, LIGHT_LEN, SECTION_VOLUME};
use crate::palette::{bits_for, index_states, pack, MIN_INDEXED_BLOCK_BITS};
use strata_nbt::{nbt_compound, NbtValue};
use strata_protocol_core::ChunkFormat;
use strata_registry::Registries;
use strata_types::ChunkPos;
use tracing::debug;

const AIR: &str = "minecraft:air";
const BEDROCK: &str = "minecraft:bedrock";
const STONE: &str = "minecraft:stone";
const FALLBACK_BIOME: &str = "minecraft:plains";
const LEGACY_BEDROCK: i32 = 7;
const LEGACY_STONE: i32 = 1;
/// Root tag added to columns that did not exist in storage before.
pub const NEW_CHUNK_TAG: &str = "strata:NewChunk";
/// First data version that uses the `full` status name (19w11a).
const FULL_STATUS_DATA_VERSION: i32 = 1901;

/// Lookups and options used while converting one chunk.
#[derive(Debug, Clone, Copy)]
pub struct AnvilContext<'a> {
    pub registries: &'a Registries,
    /// Biome names by network id, from the dimension codec (1.18+).
    pub biome_names: &'a [String],
    pub mask_bedrock: bool,
}

/// Column coordinate a chunk is stored under once the center offset applies,
/// or `None` when that falls outside the coordinate range.
pub fn storage_pos(pos: ChunkPos, center_x: i32, center_z: i32) -> Option<ChunkPos> {
    pos.minus_blocks(center_x, center_z)
}

/// Convert `chunk` to the Anvil NBT of its data version, stored at `target`.
pub fn chunk_to_nbt(chunk: &Chunk, target: ChunkPos, ctx: &AnvilContext, last_update: i64) -> NbtValue {
    match chunk.format {
        ChunkFormat::Legacy112 => legacy_to_nbt(chunk, target, ctx, last_update),
        ChunkFormat::Paletted118 { .. } => modern_to_nbt(chunk, target, ctx, last_update),
        _ => level_to_nbt(chunk, target, ctx, last_update),
    }
}

fn light_or_default(light: &Option<Vec<u8>>, fill: u8) -> NbtValue {
    let bytes = match light {
        Some(l) => l.iter().map(|&b| b as i8).collect(),
        None => vec![fill as i8; LIGHT_LEN],
    };
    NbtValue::ByteArray(bytes)
}

fn block_entities(chunk: &Chunk, target: ChunkPos, ctx: &AnvilContext) -> NbtValue {
    let dx = target.x.saturating_sub(chunk.pos.x).saturating_mul(16);
    let dz = target.z.saturating_sub(chunk.pos.z).saturating_mul(16);
    let entities = chunk
        .block_entities
        .iter()
        .map(|entity| {
            let mut nbt = match &entity.nbt {
                NbtValue::Compound(_) => entity.nbt.clone(),
                _ => NbtValue::Compound(Vec::new()),
            };
            if let Some(name) = entity.kind.and_then(|k| ctx.registries.block_entities.get(k)) {
                nbt.insert("id", NbtValue::String(name.to_string()));
            }
            nbt.insert("x", NbtValue::Int(entity.pos.x.saturating_add(dx)));
            nbt.insert("y", NbtValue::Int(entity.pos.y));
            nbt.insert("z", NbtValue::Int(entity.pos.z.saturating_add(dz)));
            nbt
        })
        .collect();
    NbtValue::List(entities)
}

// === Before 1.13 ===

fn set_nibble(array: &mut [i8], index: usize, value: u8) {
    let byte = &mut array[index >> 1];
    let value = (value & 0xF) as i8;
    if index & 1 == 0 {
        *byte = (*byte & 0xF0u8 as i8) | value;
    } else {
        *byte = (*byte & 0x0F) | (value << 4);
    }
}

/// Highest non-air block + 1 for each of the 256 columns, `z << 4 | x` order.
fn legacy_heightmap(chunk: &Chunk) -> Vec<i32> {
    let mut heights = vec![0i32; 256];
    for x in 0..16 {
        for z in 0..16 {
            'scan: for (sy, section) in chunk.sections.iter().rev() {
                for ly in (0..16).rev() {
                    if section.get_block(x, ly, z) != 0 {
                        heights[(z << 4) | x] = sy * 16 + ly as i32 + 1;
                        break 'scan;
                    }
                }
            }
        }
    }
    heights
}

fn legacy_section(section: &ChunkSection, ctx: &AnvilContext, sky: bool) -> NbtValue {
    let mut blocks = vec![0i8; SECTION_VOLUME];
    let mut data = vec![0i8; SECTION_VOLUME / 2];
    let mut add = vec![0i8; SECTION_VOLUME / 2];
    let mut has_add = false;

    for (i, &state) in section.blocks.iter().enumerate() {
        let mut id = state >> 4;
        let mut meta = (state & 0xF) as u8;
        if ctx.mask_bedrock && id == LEGACY_BEDROCK {
            id = LEGACY_STONE;
            meta = 0;
        }
        blocks[i] = (id & 0xFF) as u8 as i8;
        if id > 0xFF {
            has_add = true;
            set_nibble(&mut add, i, (id >> 8) as u8);
        }
        set_nibble(&mut data, i, meta);
    }

    let mut nbt = nbt_compound! {
        "Y" => NbtValue::Byte(section.y as i8),
        "Blocks" => NbtValue::ByteArray(blocks),
        "Data" => NbtValue::ByteArray(data),
        "BlockLight" => light_or_default(&section.block_light, 0)
    };
    if has_add {
        nbt.insert("Add", NbtValue::ByteArray(add));
    }
    if sky {
        nbt.insert("SkyLight", light_or_default(&section.sky_light, 0xFF));
    }
    nbt
}

fn legacy_to_nbt(chunk: &Chunk, target: ChunkPos, ctx: &AnvilContext, last_update: i64) -> NbtValue {
    let sky = chunk.dimension.has_skylight();
    let sections: Vec<NbtValue> = chunk
        .sections
        .values()
        .map(|s| legacy_section(s, ctx, sky))
        .collect();
    let biomes = match &chunk.biomes {
        Biomes::Flat(ids) => ids.iter().map(|&b| b as i8).collect(),
        _ => vec![1i8; 256],
    };

    nbt_compound! {
        "DataVersion" => NbtValue::Int(chunk.data_version),
        "Level" => nbt_compound! {
            "xPos" => NbtValue::Int(target.x),
            "zPos" => NbtValue::Int(target.z),
            "LastUpdate" => NbtValue::Long(last_update),
            "InhabitedTime" => NbtValue::Long(0),
            "TerrainPopulated" => NbtValue::Byte(1),
            "LightPopulated" => NbtValue::Byte(1),
            "Biomes" => NbtValue::ByteArray(biomes),
            "HeightMap" => NbtValue::IntArray(legacy_heightmap(chunk)),
            "Sections" => NbtValue::List(sections),
            "Entities" => NbtValue::List(Vec::new()),
            "TileEntities" => block_entities(chunk, target, ctx)
        }
    }
}

// === Name palettes (1.13+) ===

/// Palette entry for a global id. Unknown ids become air.
fn state_entry(id: i32, ctx: &AnvilContext) -> NbtValue {
    let Some(state) = ctx.registries.blocks.get(id) else {
        debug!("Unknown block state {}, saving as air", id);
        return nbt_compound! { "Name" => NbtValue::String(AIR.into()) };
    };
    if ctx.mask_bedrock && state.name == BEDROCK {
        return nbt_compound! { "Name" => NbtValue::String(STONE.into()) };
    }
    let mut entry = nbt_compound! { "Name" => NbtValue::String(state.name.clone()) };
    if !state.properties.is_empty() {
        let props = state
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), NbtValue::String(v.clone())))
            .collect();
        entry.insert("Properties", NbtValue::Compound(props));
    }
    entry
}

/// Name palette and packed indices for one section's blocks.
fn block_palette(section: &ChunkSection, ctx: &AnvilContext, aligned: bool, always_data: bool) -> (NbtValue, Option<Vec<i64>>) {
    let (ids, indices) = index_states(&section.blocks);
    let palette = NbtValue::List(ids.iter().map(|&id| state_entry(id, ctx)).collect());
    if ids.len() == 1 && !always_data {
        return (palette, None);
    }
    let bits = bits_for(ids.len()).max(MIN_INDEXED_BLOCK_BITS);
    (palette, Some(pack(&indices, bits, aligned)))
}

fn column_biomes(chunk: &Chunk) -> Option<Vec<i32>> {
    match &chunk.biomes {
        Biomes::Flat(ids) | Biomes::Volume(ids) => Some(ids.clone()),
        _ => None,
    }
}

fn level_to_nbt(chunk: &Chunk, target: ChunkPos, ctx: &AnvilContext, last_update: i64) -> NbtValue {
    let aligned = chunk.format.aligned_packing();
    let sky = chunk.dimension.has_skylight();
    let mut has_light = false;

    let sections: Vec<NbtValue> = chunk
        .sections
        .values()
        .map(|section| {
            let (palette, states) = block_palette(section, ctx, aligned, true);
            let mut nbt = nbt_compound! {
                "Y" => NbtValue::Byte(section.y as i8),
                "Palette" => palette
            };
            if let Some(states) = states {
                nbt.insert("BlockStates", NbtValue::LongArray(states));
            }
            if section.block_light.is_some() || section.sky_light.is_some() {
                has_light = true;
                nbt.insert("BlockLight", light_or_default(&section.block_light, 0));
                if sky {
                    nbt.insert("SkyLight", light_or_default(&section.sky_light, 0xFF));
                }
            }
            nbt
        })
        .collect();

    let status = if chunk.data_version >= FULL_STATUS_DATA_VERSION {
        "full"
    } else {
        "postprocessed"
    };

    let mut level = nbt_compound! {
        "xPos" => NbtValue::Int(target.x),
        "zPos" => NbtValue::Int(target.z),
        "LastUpdate" => NbtValue::Long(last_update),
        "InhabitedTime" => NbtValue::Long(0),
        "Status" => NbtValue::String(status.into()),
        "Sections" => NbtValue::List(sections),
        "Entities" => NbtValue::List(Vec::new()),
        "TileEntities" => block_entities(chunk, target, ctx)
    };
    if let Some(biomes) = column_biomes(chunk) {
        level.insert("Biomes", NbtValue::IntArray(biomes));
    }
    if let Some(heightmaps) = &chunk.heightmaps {
        level.insert("Heightmaps", heightmaps.clone());
    }
    if chunk.data_version >= FULL_STATUS_DATA_VERSION {
        level.insert("isLightOn", NbtValue::Byte(has_light as i8));
    }

    nbt_compound! {
        "DataVersion" => NbtValue::Int(chunk.data_version),
        "Level" => level
    }
}

// === 1.18+ ===

fn biome_container(section: &ChunkSection, ctx: &AnvilContext) -> NbtValue {
    let cells = section.biomes.clone().unwrap_or_else(|| vec![0; 64]);
    let (ids, indices) = index_states(&cells);
    let palette = ids
        .iter()
        .map(|&id| {
            let name = usize::try_from(id)
                .ok()
                .and_then(|i| ctx.biome_names.get(i))
                .map(|s| s.as_str())
                .unwrap_or(FALLBACK_BIOME);
            NbtValue::String(name.to_string())
        })
        .collect();
    let mut container = nbt_compound! { "palette" => NbtValue::List(palette) };
    let bits = bits_for(ids.len());
    if bits > 0 {
        container.insert("data", NbtValue::LongArray(pack(&indices, bits, true)));
    }
    container
}

fn modern_to_nbt(chunk: &Chunk, target: ChunkPos, ctx: &AnvilContext, last_update: i64) -> NbtValue {
    let sky = chunk.dimension.has_skylight();
    let mut has_light = false;
    let sections: Vec<NbtValue> = chunk
        .sections
        .values()
        .map(|section| {
            let (palette, states) = block_palette(section, ctx, true, false);
            let mut block_states = nbt_compound! { "palette" => palette };
            if let Some(states) = states {
                block_states.insert("data", NbtValue::LongArray(states));
            }
            let mut nbt = nbt_compound! {
                "Y" => NbtValue::Byte(section.y as i8),
                "block_states" => block_states,
                "biomes" => biome_container(section, ctx)
            };
            if let Some(light) = &section.block_light {
                has_light = true;
                nbt.insert("BlockLight", NbtValue::ByteArray(light.iter().map(|&b| b as i8).collect()));
            }
            if sky {
                if let Some(light) = &section.sky_light {
                    has_light = true;
                    nbt.insert("SkyLight", NbtValue::ByteArray(light.iter().map(|&b| b as i8).collect()));
                }
            }
            nbt
        })
        .collect();

    let mut root = nbt_compound! {
        "DataVersion" => NbtValue::Int(chunk.data_version),
        "xPos" => NbtValue::Int(target.x),
        "zPos" => NbtValue::Int(target.z),
        "yPos" => NbtValue::Int(chunk.height.min_section()),
        "Status" => NbtValue::String("full".into()),
        "LastUpdate" => NbtValue::Long(last_update),
        "InhabitedTime" => NbtValue::Long(0),
        "isLightOn" => NbtValue::Byte(has_light as i8),
        "sections" => NbtValue::List(sections),
        "block_entities" => block_entities(chunk, target, ctx)
    };
    if let Some(heightmaps) = &chunk.heightmaps {
        root.insert("Heightmaps", heightmaps.clone());
    }
    root
}

// === Stored chunk helpers ===

/// The section list of a stored chunk, wherever its layout keeps it.
fn section_list_mut(nbt: &mut NbtValue) -> Option<&mut Vec<NbtValue>> {
    if nbt.get("Level").is_some() {
        nbt.get_mut("Level")?.get_mut("Sections")?.as_list_mut()
    } else {
        nbt.get_mut("sections")?.as_list_mut()
    }
}

fn section_list(nbt: &NbtValue) -> Option<&[NbtValue]> {
    match nbt.get("Level") {
        Some(level) => level.get("Sections")?.as_list(),
        None => nbt.get("sections")?.as_list(),
    }
}

fn section_y(section: &NbtValue) -> Option<i8> {
    section.get("Y")?.as_byte()
}

/// Merge a freshly converted chunk over a stored one: sections the new chunk
/// lacks are carried over from storage. Layouts must match; a stored chunk of
/// another layout is simply replaced.
pub fn merge_stored(stored: &NbtValue, mut fresh: NbtValue) -> NbtValue {
    let same_layout = stored.get("Level").is_some() == fresh.get("Level").is_some();
    let Some(old_sections) = section_list(stored).filter(|_| same_layout) else {
        return fresh;
    };
    let Some(new_sections) = section_list_mut(&mut fresh) else {
        return fresh;
    };
    let present: Vec<i8> = new_sections.iter().filter_map(section_y).collect();
    for section in old_sections {
        if let Some(y) = section_y(section) {
            if !present.contains(&y) {
                new_sections.push(section.clone());
            }
        }
    }
    new_sections.sort_by_key(|s| section_y(s).unwrap_or(i8::MIN));
    fresh
}

/// Tag a column as one that did not exist before this session.
pub fn mark_new(nbt: &mut NbtValue) {
    nbt.insert(NEW_CHUNK_TAG, NbtValue::Byte(1));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkSection;
    use crate::palette::unpack;
    use strata_protocol_core::GameVersion;
    use strata_registry::{BlockState, GlobalPalette};
    use strata_types::{Dimension, WorldHeight};

    fn registries(protocol: i32) -> Registries {
        let mut r = Registries::legacy(GameVersion::new(protocol, "test", 0));
        let mut blocks = GlobalPalette::new();
        blocks.insert(0, BlockState::new("minecraft:air"), true);
        blocks.insert(1, BlockState::new("minecraft:stone"), true);
        blocks.insert(33, BlockState::new("minecraft:bedrock"), true);
        blocks.insert(40, BlockState::new("minecraft:oak_log").with_property("axis", "y"), true);
        r.blocks = blocks;
        r
    }

    fn chunk(format: ChunkFormat, data_version: i32) -> Chunk {
        let height = if let ChunkFormat::Paletted118 { .. } = format {
            WorldHeight::new(-64, 384)
        } else {
            WorldHeight::default()
        };
        Chunk::new(ChunkPos::new(3, 4), Dimension::Overworld, format, data_version, height)
    }

    fn ctx<'a>(registries: &'a Registries, names: &'a [String], mask: bool) -> AnvilContext<'a> {
        AnvilContext {
            registries,
            biome_names: names,
            mask_bedrock: mask,
        }
    }

    #[test]
    fn test_legacy_layout() {
        let r = registries(340);
        let mut c = chunk(ChunkFormat::Legacy112, 1343);
        let mut section = ChunkSection::filled(0, 1 << 4);
        section.set_block(0, 0, 0, 7 << 4);
        section.set_block(1, 0, 0, (17 << 4) | 2);
        c.sections.insert(0, section);
        c.biomes = Biomes::Flat(vec![4; 256]);

        let nbt = chunk_to_nbt(&c, ChunkPos::new(3, 4), &ctx(&r, &[], true), 0);
        let level = nbt.get("Level").unwrap();
        assert_eq!(level.get("xPos").unwrap().as_i32(), Some(3));
        let sections = level.get("Sections").unwrap().as_list().unwrap();
        let blocks = match sections[0].get("Blocks").unwrap() {
            NbtValue::ByteArray(b) => b.clone(),
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(blocks[0], 1, "bedrock masked to stone");
        assert_eq!(blocks[1], 17);
        let data = match sections[0].get("Data").unwrap() {
            NbtValue::ByteArray(d) => d.clone(),
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(data[0] as u8, 0x20);
        assert!(sections[0].get("Add").is_none());
        assert_eq!(level.get("HeightMap").and_then(|h| match h {
            NbtValue::IntArray(v) => Some(v[0]),
            _ => None,
        }), Some(16));
    }

    #[test]
    fn test_level_layout_spanning_before_1_16() {
        let r = registries(578);
        let mut c = chunk(ChunkFormat::Biome115, 2230);
        let mut section = ChunkSection::filled(2, 1);
        for i in 0..17 {
            section.blocks[i] = if i % 2 == 0 { 40 } else { 33 };
        }
        c.sections.insert(2, section);
        c.biomes = Biomes::Volume(vec![1; 1024]);

        let nbt = chunk_to_nbt(&c, ChunkPos::new(0, 0), &ctx(&r, &[], false), 0);
        let level = nbt.get("Level").unwrap();
        let section = &level.get("Sections").unwrap().as_list().unwrap()[0];
        let palette = section.get("Palette").unwrap().as_list().unwrap();
        assert_eq!(palette.len(), 3);
        assert_eq!(palette[0].get("Name").unwrap().as_str(), Some("minecraft:oak_log"));
        assert_eq!(
            palette[0].get("Properties").unwrap().get("axis").unwrap().as_str(),
            Some("y")
        );
        let states = section.get("BlockStates").unwrap().as_long_array().unwrap();
        assert_eq!(states.len(), 256);
        let indices = unpack(states, 4, 4096, false).unwrap();
        assert_eq!(&indices[..3], &[0, 1, 0]);
        assert_eq!(level.get("Status").unwrap().as_str(), Some("full"));
    }

    #[test]
    fn test_modern_layout() {
        let r = registries(763);
        let names = vec!["minecraft:ocean".to_string(), "minecraft:desert".to_string()];
        let mut c = chunk(ChunkFormat::Paletted118 { trust_edges: false }, 3465);
        let mut section = ChunkSection::filled(-4, 1);
        section.biomes = Some((0..64).map(|i| i % 2).collect());
        section.sky_light = Some(vec![0xFF; LIGHT_LEN]);
        c.sections.insert(-4, section);
        c.sections.insert(-3, ChunkSection::filled(-3, 0));

        let nbt = chunk_to_nbt(&c, ChunkPos::new(3, 4), &ctx(&r, &names, false), 7);
        assert_eq!(nbt.get("yPos").unwrap().as_i32(), Some(-4));
        let sections = nbt.get("sections").unwrap().as_list().unwrap();
        assert_eq!(sections.len(), 2);

        let states = sections[0].get("block_states").unwrap();
        assert!(states.get("data").is_none(), "single-state sections omit data");
        let biomes = sections[0].get("biomes").unwrap();
        let biome_palette = biomes.get("palette").unwrap().as_list().unwrap();
        assert_eq!(biome_palette[1].as_str(), Some("minecraft:desert"));
        assert_eq!(biomes.get("data").unwrap().as_long_array().unwrap().len(), 1);
        assert_eq!(nbt.get("isLightOn").unwrap().as_byte(), Some(1));
    }

    #[test]
    fn test_unknown_state_saved_as_air() {
        let r = registries(763);
        let mut c = chunk(ChunkFormat::Paletted118 { trust_edges: false }, 3465);
        c.sections.insert(0, ChunkSection::filled(0, 9999));
        let nbt = chunk_to_nbt(&c, ChunkPos::new(0, 0), &ctx(&r, &[], false), 0);
        let palette = nbt.get("sections").unwrap().as_list().unwrap()[0]
            .get("block_states")
            .unwrap()
            .get("palette")
            .unwrap()
            .as_list()
            .unwrap();
        assert_eq!(palette[0].get("Name").unwrap().as_str(), Some("minecraft:air"));
    }

    #[test]
    fn test_merge_keeps_stored_sections() {
        let r = registries(578);
        let mut old = chunk(ChunkFormat::Biome115, 2230);
        old.sections.insert(0, ChunkSection::filled(0, 1));
        old.sections.insert(5, ChunkSection::filled(5, 1));
        let mut new = chunk(ChunkFormat::Biome115, 2230);
        new.sections.insert(5, ChunkSection::filled(5, 40));
        let c = ctx(&r, &[], false);

        let stored = chunk_to_nbt(&old, ChunkPos::new(0, 0), &c, 0);
        let fresh = chunk_to_nbt(&new, ChunkPos::new(0, 0), &c, 1);
        let merged = merge_stored(&stored, fresh);
        let sections = merged.get("Level").unwrap().get("Sections").unwrap().as_list().unwrap();
        let ys: Vec<i8> = sections.iter().filter_map(section_y).collect();
        assert_eq!(ys, vec![0, 5]);
        let palette = sections[1].get("Palette").unwrap().as_list().unwrap();
        assert_eq!(palette[0].get("Name").unwrap().as_str(), Some("minecraft:oak_log"));
    }

    #[test]
    fn test_storage_pos_and_mark() {
        assert_eq!(storage_pos(ChunkPos::new(10, -2), 160, -32), Some(ChunkPos::new(0, 0)));
        assert_eq!(storage_pos(ChunkPos::new(i32::MIN, 0), 16, 0), None);
        let mut nbt = NbtValue::Compound(Vec::new());
        mark_new(&mut nbt);
        assert_eq!(nbt.get(NEW_CHUNK_TAG).unwrap().as_byte(), Some(1));
    }

    #[test]
    fn test_block_entity_shifted() {
        let r = registries(763);
        let mut c = chunk(ChunkFormat::Paletted118 { trust_edges: false }, 3465);
        c.block_entities.push(crate::chunk::BlockEntity {
            pos: strata_types::BlockPos::new(50, 64, 66),
            kind: None,
            nbt: NbtValue::Compound(Vec::new()),
        });
        let nbt = chunk_to_nbt(&c, ChunkPos::new(0, 0), &ctx(&r, &[], false), 0);
        let entity = &nbt.get("block_entities").unwrap().as_list().unwrap()[0];
        assert_eq!(entity.get("x").unwrap().as_i32(), Some(50 - 48));
        assert_eq!(entity.get("z").unwrap().as_i32(), Some(66 - 64));
    }

    #[test]
    fn test_extreme_column_shift_saturates() {
        let r = registries(763);
        let mut c = chunk(ChunkFormat::Paletted118 { trust_edges: false }, 3465);
        c.pos = ChunkPos::new(i32::MAX, i32::MIN);
        c.block_entities.push(crate::chunk::BlockEntity {
            pos: strata_types::BlockPos::new(-5, 64, 5),
            kind: None,
            nbt: NbtValue::Compound(Vec::new()),
        });
        let nbt = chunk_to_nbt(&c, ChunkPos::new(0, 0), &ctx(&r, &[], false), 0);
        let entity = &nbt.get("block_entities").unwrap().as_list().unwrap()[0];
        assert_eq!(entity.get("x").unwrap().as_i32(), Some(i32::MIN));
        assert_eq!(entity.get("z").unwrap().as_i32(), Some(i32::MAX));
    }
}
