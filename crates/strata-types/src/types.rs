use serde::{Deserialize, Serialize};
use std::fmt;

/// Bit layout of a packed block position. The axis order changed in 1.14.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionLayout {
    /// x: 26 bits, y: 12 bits, z: 26 bits (up to 1.13.2).
    Xyz,
    /// x: 26 bits, z: 26 bits, y: 12 bits (1.14 onwards).
    Xzy,
}

/// A block position in the world (x, y, z integers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Encode as a 64-bit long in the given wire layout.
    pub fn encode(&self, layout: PositionLayout) -> u64 {
        let x = self.x as u64 & 0x3FFFFFF;
        let y = self.y as u64 & 0xFFF;
        let z = self.z as u64 & 0x3FFFFFF;
        match layout {
            PositionLayout::Xyz => (x << 38) | (y << 26) | z,
            PositionLayout::Xzy => (x << 38) | (z << 12) | y,
        }
    }

    pub fn decode(val: u64, layout: PositionLayout) -> Self {
        let val = val as i64;
        match layout {
            PositionLayout::Xyz => Self {
                x: (val >> 38) as i32,
                y: ((val << 26) >> 52) as i32,
                z: ((val << 38) >> 38) as i32,
            },
            PositionLayout::Xzy => Self {
                x: (val >> 38) as i32,
                y: ((val << 52) >> 52) as i32,
                z: ((val << 26) >> 38) as i32,
            },
        }
    }

    pub fn chunk_pos(&self) -> ChunkPos {
        ChunkPos {
            x: self.x >> 4,
            z: self.z >> 4,
        }
    }

    /// Position inside the owning chunk column: (0..16, world y, 0..16).
    pub fn local(&self) -> (usize, i32, usize) {
        (
            self.x.rem_euclid(16) as usize,
            self.y,
            self.z.rem_euclid(16) as usize,
        )
    }
}

/// A chunk column position (x, z).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Chebyshev distance in chunks, the metric view distance is measured in.
    /// Saturates at `i32::MAX` for columns at opposite ends of the range.
    pub fn distance(&self, other: &ChunkPos) -> i32 {
        let dx = (i64::from(self.x) - i64::from(other.x)).abs();
        let dz = (i64::from(self.z) - i64::from(other.z)).abs();
        i32::try_from(dx.max(dz)).unwrap_or(i32::MAX)
    }

    /// Shift this column back by a block offset, rounding the shift down to
    /// whole chunks. `None` when the result leaves the i32 range.
    pub fn minus_blocks(&self, dx: i32, dz: i32) -> Option<ChunkPos> {
        let shift = |coord: i32, by: i32| {
            i32::try_from(i64::from(coord) + ((-i64::from(by)) >> 4)).ok()
        };
        Some(ChunkPos {
            x: shift(self.x, dx)?,
            z: shift(self.z, dz)?,
        })
    }

    /// A block inside this column. Coordinates saturate rather than wrap.
    pub fn block(&self, local_x: i32, y: i32, local_z: i32) -> BlockPos {
        BlockPos::new(
            self.x.saturating_mul(16).saturating_add(local_x),
            y,
            self.z.saturating_mul(16).saturating_add(local_z),
        )
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.z)
    }
}

/// A 16x16x16 section position, as carried by section block updates (1.16.2+).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SectionPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl SectionPos {
    /// x: 22 bits, z: 22 bits, y: 20 bits.
    pub fn decode(val: u64) -> Self {
        let val = val as i64;
        Self {
            x: (val >> 42) as i32,
            y: ((val << 44) >> 44) as i32,
            z: ((val << 22) >> 42) as i32,
        }
    }

    pub fn encode(&self) -> u64 {
        ((self.x as u64 & 0x3FFFFF) << 42) | ((self.z as u64 & 0x3FFFFF) << 20) | (self.y as u64 & 0xFFFFF)
    }

    pub fn chunk_pos(&self) -> ChunkPos {
        ChunkPos::new(self.x, self.z)
    }

    pub fn block(&self, local_x: i32, local_y: i32, local_z: i32) -> BlockPos {
        BlockPos::new(self.x * 16 + local_x, self.y * 16 + local_y, self.z * 16 + local_z)
    }
}

/// A 3D position with double precision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3d {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3d {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn chunk_pos(&self) -> ChunkPos {
        ChunkPos {
            x: (self.x.floor() as i32) >> 4,
            z: (self.z.floor() as i32) >> 4,
        }
    }

    pub fn block_pos(&self) -> BlockPos {
        BlockPos::new(self.x.floor() as i32, self.y.floor() as i32, self.z.floor() as i32)
    }
}

/// The dimension a column belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Overworld,
    Nether,
    End,
    /// Datapack dimension, keyed by its identifier.
    Custom(String),
}

impl Dimension {
    /// Numeric dimension id used by join game and respawn up to 1.15.
    pub fn from_legacy_id(id: i32) -> Self {
        match id {
            -1 => Dimension::Nether,
            1 => Dimension::End,
            _ => Dimension::Overworld,
        }
    }

    /// World identifier used from 1.16 onwards (e.g. `minecraft:the_nether`).
    pub fn from_identifier(name: &str) -> Self {
        match name {
            "minecraft:overworld" | "overworld" => Dimension::Overworld,
            "minecraft:the_nether" | "the_nether" => Dimension::Nether,
            "minecraft:the_end" | "the_end" => Dimension::End,
            other => Dimension::Custom(other.to_string()),
        }
    }

    pub fn identifier(&self) -> String {
        match self {
            Dimension::Overworld => "minecraft:overworld".into(),
            Dimension::Nether => "minecraft:the_nether".into(),
            Dimension::End => "minecraft:the_end".into(),
            Dimension::Custom(name) => name.clone(),
        }
    }

    /// Folder below the world root holding this dimension's `region/` directory.
    pub fn save_path(&self) -> String {
        match self {
            Dimension::Overworld => String::new(),
            Dimension::Nether => "DIM-1".into(),
            Dimension::End => "DIM1".into(),
            Dimension::Custom(name) => {
                let (ns, path) = name.split_once(':').unwrap_or(("minecraft", name.as_str()));
                format!("dimensions/{}/{}", ns, path)
            }
        }
    }

    /// Whether sections in this dimension carry sky light.
    pub fn has_skylight(&self) -> bool {
        !matches!(self, Dimension::Nether | Dimension::End)
    }

    /// Default (min_y, height) for a dimension when the server did not announce one.
    pub fn default_height(&self, tall_overworld: bool) -> WorldHeight {
        match self {
            Dimension::Overworld if tall_overworld => WorldHeight::new(-64, 384),
            _ => WorldHeight::new(0, 256),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier())
    }
}

/// Vertical extent of a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldHeight {
    pub min_y: i32,
    pub height: i32,
}

impl WorldHeight {
    pub fn new(min_y: i32, height: i32) -> Self {
        Self { min_y, height }
    }

    pub fn min_section(&self) -> i32 {
        self.min_y >> 4
    }

    pub fn section_count(&self) -> usize {
        (self.height / 16).max(0) as usize
    }
}

impl Default for WorldHeight {
    fn default() -> Self {
        Self::new(0, 256)
    }
}
