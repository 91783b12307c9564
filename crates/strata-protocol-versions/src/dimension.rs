//! Inspection of the dimension codec sent with join game from 1.16 onwards.

use strata_nbt::NbtValue;
use strata_types::WorldHeight;

const DIMENSION_TYPE_REGISTRY: &str = "minecraft:dimension_type";
const BIOME_REGISTRY: &str = "minecraft:worldgen/biome";
const FALLBACK_BIOME: &str = "minecraft:plains";

/// Entries of one registry in the codec: `{ type, value: [{ name, id, element }] }`.
fn registry_entries<'a>(codec: &'a NbtValue, registry: &str) -> &'a [NbtValue] {
    codec
        .get(registry)
        .and_then(|r| r.get("value"))
        .and_then(|v| v.as_list())
        .unwrap_or(&[])
}

/// Height of one dimension type compound. Only present from 1.17.
pub fn dimension_height(element: &NbtValue) -> Option<WorldHeight> {
    let min_y = element.get("min_y")?.as_i32()?;
    let height = element.get("height")?.as_i32()?;
    Some(WorldHeight::new(min_y, height))
}

/// Every dimension type in the codec with its height.
pub fn dimension_types(codec: &NbtValue) -> Vec<(String, WorldHeight)> {
    registry_entries(codec, DIMENSION_TYPE_REGISTRY)
        .iter()
        .filter_map(|entry| {
            let name = entry.get("name")?.as_str()?;
            let height = dimension_height(entry.get("element")?)?;
            Some((name.to_string(), height))
        })
        .collect()
}

/// Biome names indexed by their network id. Gaps are filled with plains so
/// that every id the server may send resolves to something.
pub fn biome_names(codec: &NbtValue) -> Vec<String> {
    let entries: Vec<(usize, &str)> = registry_entries(codec, BIOME_REGISTRY)
        .iter()
        .filter_map(|entry| {
            let id = entry.get("id")?.as_i32()?;
            let name = entry.get("name")?.as_str()?;
            (id >= 0).then_some((id as usize, name))
        })
        .collect();

    let len = entries.iter().map(|(id, _)| id + 1).max().unwrap_or(0);
    let mut names = vec![FALLBACK_BIOME.to_string(); len];
    for (id, name) in entries {
        names[id] = name.to_string();
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_nbt::{nbt_compound, nbt_list};

    fn codec() -> NbtValue {
        nbt_compound! {
            "minecraft:dimension_type" => nbt_compound! {
                "type" => NbtValue::String("minecraft:dimension_type".into()),
                "value" => nbt_list![
                    nbt_compound! {
                        "name" => NbtValue::String("minecraft:overworld".into()),
                        "id" => NbtValue::Int(0),
                        "element" => nbt_compound! {
                            "min_y" => NbtValue::Int(-64),
                            "height" => NbtValue::Int(384)
                        }
                    },
                    nbt_compound! {
                        "name" => NbtValue::String("minecraft:the_nether".into()),
                        "id" => NbtValue::Int(1),
                        "element" => nbt_compound! {
                            "min_y" => NbtValue::Int(0),
                            "height" => NbtValue::Int(256)
                        }
                    }
                ]
            },
            "minecraft:worldgen/biome" => nbt_compound! {
                "type" => NbtValue::String("minecraft:worldgen/biome".into()),
                "value" => nbt_list![
                    nbt_compound! {
                        "name" => NbtValue::String("minecraft:ocean".into()),
                        "id" => NbtValue::Int(0)
                    },
                    nbt_compound! {
                        "name" => NbtValue::String("minecraft:desert".into()),
                        "id" => NbtValue::Int(2)
                    }
                ]
            }
        }
    }

    #[test]
    fn test_dimension_types() {
        let types = dimension_types(&codec());
        assert_eq!(types.len(), 2);
        assert_eq!(types[0], ("minecraft:overworld".into(), WorldHeight::new(-64, 384)));
    }

    #[test]
    fn test_biome_names_fill_gaps() {
        let names = biome_names(&codec());
        assert_eq!(names, vec!["minecraft:ocean", "minecraft:plains", "minecraft:desert"]);
    }

    #[test]
    fn test_empty_codec() {
        let empty = NbtValue::Compound(Vec::new());
        assert!(dimension_types(&empty).is_empty());
        assert!(biome_names(&empty).is_empty());
    }
}
