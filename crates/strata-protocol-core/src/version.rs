use strata_types::PositionLayout;

/// A resolved game version: the protocol number announced in the handshake,
/// its release name and the world data version it persists with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GameVersion {
    pub protocol: i32,
    pub name: &'static str,
    pub data_version: i32,
}

impl GameVersion {
    pub const fn new(protocol: i32, name: &'static str, data_version: i32) -> Self {
        Self {
            protocol,
            name,
            data_version,
        }
    }

    pub fn chunk_format(&self) -> ChunkFormat {
        ChunkFormat::for_protocol(self.protocol)
    }

    pub fn position_layout(&self) -> PositionLayout {
        if self.protocol >= 477 {
            PositionLayout::Xzy
        } else {
            PositionLayout::Xyz
        }
    }

    /// Block states are a flat name-keyed palette from 1.13 (the flattening).
    pub fn is_flattened(&self) -> bool {
        self.protocol >= 393
    }
}

/// The closed set of chunk packet layouts. One is chosen per version and the
/// whole chunk is decoded under that layout's rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkFormat {
    /// 1.12: light inline per section, one biome byte per column, palette length
    /// always written, entries may span words.
    Legacy112,
    /// 1.13: direct palettes carry no length, biomes are 256 ints inside the data.
    Flattened113,
    /// 1.14: per-section block count, heightmaps, light moved to its own packet.
    Heightmap114,
    /// 1.15: 1024 three-dimensional biome cells sent before the section data.
    Biome115,
    /// 1.16 and 1.16.1: ignore-old-data flag, entries no longer span words.
    IgnoreOldData116,
    /// 1.16.2 to 1.16.5: biomes become a VarInt array, flag removed.
    VarBiome1162,
    /// 1.17: section mask is a BitSet, variable world height, always full.
    Bitset117,
    /// 1.18 onwards: every section present, per-section paletted biomes,
    /// single-value palettes and embedded light.
    Paletted118 { trust_edges: bool },
}

impl ChunkFormat {
    pub fn for_protocol(protocol: i32) -> Self {
        match protocol {
            p if p >= 757 => ChunkFormat::Paletted118 {
                trust_edges: p < 763,
            },
            p if p >= 755 => ChunkFormat::Bitset117,
            p if p >= 751 => ChunkFormat::VarBiome1162,
            p if p >= 735 => ChunkFormat::IgnoreOldData116,
            p if p >= 573 => ChunkFormat::Biome115,
            p if p >= 477 => ChunkFormat::Heightmap114,
            p if p >= 393 => ChunkFormat::Flattened113,
            _ => ChunkFormat::Legacy112,
        }
    }

    /// Entries never straddle two longs (1.16+).
    pub fn aligned_packing(&self) -> bool {
        !matches!(
            self,
            ChunkFormat::Legacy112
                | ChunkFormat::Flattened113
                | ChunkFormat::Heightmap114
                | ChunkFormat::Biome115
        )
    }

    /// Sections carry their own block and sky light arrays.
    pub fn light_inline(&self) -> bool {
        matches!(self, ChunkFormat::Legacy112 | ChunkFormat::Flattened113)
    }

    /// Sections start with a non-air block count.
    pub fn has_block_count(&self) -> bool {
        !self.light_inline()
    }

    pub fn has_heightmaps(&self) -> bool {
        !self.light_inline()
    }

    /// Biomes are sent per section rather than per column.
    pub fn biomes_per_section(&self) -> bool {
        matches!(self, ChunkFormat::Paletted118 { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_boundaries() {
        assert_eq!(ChunkFormat::for_protocol(340), ChunkFormat::Legacy112);
        assert_eq!(ChunkFormat::for_protocol(404), ChunkFormat::Flattened113);
        assert_eq!(ChunkFormat::for_protocol(498), ChunkFormat::Heightmap114);
        assert_eq!(ChunkFormat::for_protocol(578), ChunkFormat::Biome115);
        assert_eq!(ChunkFormat::for_protocol(736), ChunkFormat::IgnoreOldData116);
        assert_eq!(ChunkFormat::for_protocol(754), ChunkFormat::VarBiome1162);
        assert_eq!(ChunkFormat::for_protocol(756), ChunkFormat::Bitset117);
        assert_eq!(
            ChunkFormat::for_protocol(758),
            ChunkFormat::Paletted118 { trust_edges: true }
        );
        assert_eq!(
            ChunkFormat::for_protocol(763),
            ChunkFormat::Paletted118 { trust_edges: false }
        );
    }

    #[test]
    fn test_format_capabilities() {
        assert!(!ChunkFormat::Biome115.aligned_packing());
        assert!(ChunkFormat::IgnoreOldData116.aligned_packing());
        assert!(ChunkFormat::Legacy112.light_inline());
        assert!(ChunkFormat::Heightmap114.has_block_count());
        assert!(ChunkFormat::Paletted118 { trust_edges: false }.biomes_per_section());
    }

    #[test]
    fn test_position_layout() {
        assert_eq!(
            GameVersion::new(404, "1.13.2", 1631).position_layout(),
            PositionLayout::Xyz
        );
        assert_eq!(
            GameVersion::new(498, "1.14.4", 1976).position_layout(),
            PositionLayout::Xzy
        );
    }
}
