use std::collections::HashMap;
use strata_protocol_core::DecodeError;

/// Indexed palettes are used up to this many bits per block entry.
pub const MAX_INDEXED_BLOCK_BITS: u8 = 8;
/// Smallest width an indexed block palette is sent with.
pub const MIN_INDEXED_BLOCK_BITS: u8 = 4;
/// Indexed biome palettes (1.18+) are used up to this width.
pub const MAX_INDEXED_BIOME_BITS: u8 = 3;
/// Longest packed entry we accept.
pub const MAX_BITS: u8 = 32;

/// How a section maps its packed entries to global ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Palette {
    /// Entries are global ids.
    Direct,
    /// Entries index this list of global ids. A single entry with zero bits
    /// describes a section made of one state.
    Indexed(Vec<i32>),
}

impl Palette {
    /// Global id of one packed entry.
    pub fn resolve(&self, entry: u32) -> Result<i32, DecodeError> {
        match self {
            Palette::Direct => Ok(entry as i32),
            Palette::Indexed(ids) => ids
                .get(entry as usize)
                .copied()
                .ok_or(DecodeError::PaletteIndex {
                    index: entry,
                    len: ids.len(),
                }),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Palette::Direct => 0,
            Palette::Indexed(ids) => ids.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Smallest width able to index `len` distinct values. Zero for one value.
pub fn bits_for(len: usize) -> u8 {
    if len <= 1 {
        0
    } else {
        (usize::BITS - (len - 1).leading_zeros()) as u8
    }
}

/// Number of longs a packed array of `volume` entries occupies.
///
/// Before 1.16 entries are laid end to end and may straddle two longs. From
/// 1.16 each long holds `64 / bits` whole entries and the remainder is padding.
pub fn packed_len(volume: usize, bits: u8, aligned: bool) -> usize {
    if bits == 0 {
        return 0;
    }
    if aligned {
        let per_word = 64 / bits as usize;
        volume.div_ceil(per_word)
    } else {
        (volume * bits as usize).div_ceil(64)
    }
}

fn check_bits(bits: u8) -> Result<(), DecodeError> {
    if bits > MAX_BITS {
        return Err(DecodeError::BitWidth(bits));
    }
    Ok(())
}

/// Unpack `volume` entries of `bits` each.
pub fn unpack(words: &[i64], bits: u8, volume: usize, aligned: bool) -> Result<Vec<u32>, DecodeError> {
    check_bits(bits)?;
    if bits == 0 {
        return Ok(vec![0; volume]);
    }
    let expected = packed_len(volume, bits, aligned);
    if words.len() != expected {
        return Err(DecodeError::PackedLength {
            bits,
            volume,
            expected,
            actual: words.len(),
        });
    }

    let bits = bits as usize;
    let mask = (1u64 << bits) - 1;
    let mut out = Vec::with_capacity(volume);

    if aligned {
        let per_word = 64 / bits;
        for i in 0..volume {
            let word = words[i / per_word] as u64;
            let shift = (i % per_word) * bits;
            out.push(((word >> shift) & mask) as u32);
        }
    } else {
        for i in 0..volume {
            let bit = i * bits;
            let index = bit / 64;
            let offset = bit % 64;
            let mut value = (words[index] as u64) >> offset;
            if offset + bits > 64 {
                value |= (words[index + 1] as u64) << (64 - offset);
            }
            out.push((value & mask) as u32);
        }
    }
    Ok(out)
}

/// Inverse of [`unpack`].
pub fn pack(values: &[u32], bits: u8, aligned: bool) -> Vec<i64> {
    if bits == 0 {
        return Vec::new();
    }
    let bits = bits as usize;
    let mask = if bits == 64 { u64::MAX } else { (1u64 << bits) - 1 };
    let mut words = vec![0u64; packed_len(values.len(), bits as u8, aligned)];

    if aligned {
        let per_word = 64 / bits;
        for (i, &v) in values.iter().enumerate() {
            words[i / per_word] |= (v as u64 & mask) << ((i % per_word) * bits);
        }
    } else {
        for (i, &v) in values.iter().enumerate() {
            let bit = i * bits;
            let index = bit / 64;
            let offset = bit % 64;
            let v = v as u64 & mask;
            words[index] |= v << offset;
            if offset + bits > 64 {
                words[index + 1] |= v >> (64 - offset);
            }
        }
    }
    words.into_iter().map(|w| w as i64).collect()
}

/// Decode a packed section into global ids.
pub fn decode(
    palette: &Palette,
    bits: u8,
    words: &[i64],
    volume: usize,
    aligned: bool,
) -> Result<Vec<i32>, DecodeError> {
    unpack(words, bits, volume, aligned)?
        .into_iter()
        .map(|entry| palette.resolve(entry))
        .collect()
}

/// Build an indexed palette for `states` in first-seen order, returning the
/// palette ids and the per-entry indices.
pub fn index_states(states: &[i32]) -> (Vec<i32>, Vec<u32>) {
    let mut ids = Vec::new();
    let mut lookup = HashMap::new();
    let indices = states
        .iter()
        .map(|&state| {
            *lookup.entry(state).or_insert_with(|| {
                ids.push(state);
                (ids.len() - 1) as u32
            })
        })
        .collect();
    (ids, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(bits: u8, volume: usize) -> Vec<u32> {
        let max = if bits == 32 { u32::MAX as u64 } else { (1u64 << bits) - 1 };
        (0..volume as u64)
            .map(|i| ((i * 2654435761) % (max + 1)) as u32)
            .collect()
    }

    #[test]
    fn test_pack_unpack_all_widths() {
        for bits in 1..=32u8 {
            for aligned in [false, true] {
                for volume in [1usize, 64, 4096] {
                    let values = sample(bits, volume);
                    let words = pack(&values, bits, aligned);
                    assert_eq!(words.len(), packed_len(volume, bits, aligned));
                    assert_eq!(unpack(&words, bits, volume, aligned).unwrap(), values);
                }
            }
        }
    }

    #[test]
    fn test_spanning_crosses_word_boundary() {
        // 5 bits: entry 12 occupies bits 60..65.
        let mut values = vec![0u32; 64];
        values[12] = 0b10111;
        let words = pack(&values, 5, false);
        assert_eq!(words.len(), 5);
        assert_eq!((words[0] as u64) >> 60, 0b0111);
        assert_eq!(words[1] & 1, 1);
        assert_eq!(unpack(&words, 5, 64, false).unwrap()[12], 0b10111);
    }

    #[test]
    fn test_aligned_leaves_padding() {
        // 5 bits: 12 entries per long, the top 4 bits unused.
        assert_eq!(packed_len(4096, 5, true), 342);
        assert_eq!(packed_len(4096, 5, false), 320);
        let values = vec![31u32; 12];
        let words = pack(&values, 5, true);
        assert_eq!(words.len(), 1);
        assert_eq!((words[0] as u64) >> 60, 0);
    }

    #[test]
    fn test_length_mismatch_is_error() {
        let err = unpack(&[0; 10], 4, 4096, true).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::PackedLength {
                expected: 256,
                actual: 10,
                ..
            }
        ));
        assert!(matches!(unpack(&[], 33, 16, true), Err(DecodeError::BitWidth(33))));
    }

    #[test]
    fn test_indexed_resolution() {
        let palette = Palette::Indexed(vec![1, 0]);
        let words = vec![0i64; 256];
        let ids = decode(&palette, 4, &words, 4096, true).unwrap();
        assert!(ids.iter().all(|&id| id == 1));

        let mut values = vec![0u32; 4096];
        values[100] = 5;
        let words = pack(&values, 4, true);
        let err = decode(&palette, 4, &words, 4096, true).unwrap_err();
        assert!(matches!(err, DecodeError::PaletteIndex { index: 5, len: 2 }));
    }

    #[test]
    fn test_single_value() {
        let palette = Palette::Indexed(vec![9]);
        let ids = decode(&palette, 0, &[], 64, true).unwrap();
        assert_eq!(ids, vec![9; 64]);
    }

    #[test]
    fn test_bits_for() {
        assert_eq!(bits_for(1), 0);
        assert_eq!(bits_for(2), 1);
        assert_eq!(bits_for(16), 4);
        assert_eq!(bits_for(17), 5);
    }

    #[test]
    fn test_index_states() {
        let (ids, indices) = index_states(&[7, 7, 3, 7, 9]);
        assert_eq!(ids, vec![7, 3, 9]);
        assert_eq!(indices, vec![0, 0, 1, 0, 2]);
    }
}
