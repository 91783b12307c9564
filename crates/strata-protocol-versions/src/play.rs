use crate::dimension::{biome_names, dimension_height, dimension_types};
use bytes::BytesMut;
use strata_nbt::{read_named_root, NbtValue};
use strata_protocol_core::*;
use strata_types::{BlockPos, ChunkPos, Dimension, SectionPos, Vec3d, WorldHeight};

fn read_nbt(data: &mut BytesMut) -> Result<NbtValue, DecodeError> {
    read_named_root(data)
        .map(|(_, value)| value)
        .map_err(|e| DecodeError::Nbt(e.to_string()))
}

fn read_identifier(data: &mut BytesMut) -> Result<String, DecodeError> {
    Ok(read_string(data, 32767)?)
}

fn skip_world_names(data: &mut BytesMut) -> Result<(), DecodeError> {
    let count = read_length(data)?;
    for _ in 0..count {
        read_identifier(data)?;
    }
    Ok(())
}

fn lookup_height(types: &[(String, WorldHeight)], name: &str) -> Option<WorldHeight> {
    types.iter().find(|(n, _)| n == name).map(|(_, h)| *h)
}

pub fn decode_join_game(protocol: i32, data: &mut BytesMut) -> Result<InternalPacket, DecodeError> {
    let _entity_id = read_i32(data)?;

    if protocol < 735 {
        let _gamemode = read_u8(data)?;
        let dimension = read_i32(data)?;
        return Ok(InternalPacket::JoinGame {
            dimension: Dimension::from_legacy_id(dimension),
            world_height: None,
            biome_names: None,
            dimension_types: Vec::new(),
        });
    }

    if protocol >= 751 {
        let _hardcore = read_bool(data)?;
    }
    let _gamemode = read_u8(data)?;
    let _previous_gamemode = read_u8(data)?;
    skip_world_names(data)?;
    let codec = read_nbt(data)?;

    match protocol {
        735..=736 => {
            let _dimension_type = read_identifier(data)?;
            let world = read_identifier(data)?;
            Ok(InternalPacket::JoinGame {
                dimension: Dimension::from_identifier(&world),
                world_height: None,
                biome_names: None,
                dimension_types: Vec::new(),
            })
        }
        751..=758 => {
            let dimension_type = read_nbt(data)?;
            let world = read_identifier(data)?;
            Ok(InternalPacket::JoinGame {
                dimension: Dimension::from_identifier(&world),
                world_height: dimension_height(&dimension_type),
                biome_names: (protocol >= 757).then(|| biome_names(&codec)),
                dimension_types: Vec::new(),
            })
        }
        _ => {
            let dimension_type = read_identifier(data)?;
            let world = read_identifier(data)?;
            let types = dimension_types(&codec);
            Ok(InternalPacket::JoinGame {
                dimension: Dimension::from_identifier(&world),
                world_height: lookup_height(&types, &dimension_type),
                biome_names: Some(biome_names(&codec)),
                dimension_types: types,
            })
        }
    }
}

pub fn decode_respawn(protocol: i32, data: &mut BytesMut) -> Result<InternalPacket, DecodeError> {
    match protocol {
        p if p < 735 => {
            let dimension = read_i32(data)?;
            Ok(InternalPacket::Respawn {
                dimension: Dimension::from_legacy_id(dimension),
                dimension_type: None,
                world_height: None,
            })
        }
        751..=758 => {
            let dimension_type = read_nbt(data)?;
            let world = read_identifier(data)?;
            Ok(InternalPacket::Respawn {
                dimension: Dimension::from_identifier(&world),
                dimension_type: None,
                world_height: dimension_height(&dimension_type),
            })
        }
        _ => {
            let dimension_type = read_identifier(data)?;
            let world = read_identifier(data)?;
            Ok(InternalPacket::Respawn {
                dimension: Dimension::from_identifier(&world),
                // 1.16 and 1.16.1 name the type but every type is 256 high.
                dimension_type: (protocol >= 759).then_some(dimension_type),
                world_height: None,
            })
        }
    }
}

pub fn decode_position_sync(data: &mut BytesMut) -> Result<InternalPacket, DecodeError> {
    let x = read_f64(data)?;
    let y = read_f64(data)?;
    let z = read_f64(data)?;
    let _yaw = read_f32(data)?;
    let _pitch = read_f32(data)?;
    let relative = read_u8(data)?;
    Ok(InternalPacket::PlayerPositionSync {
        position: Vec3d::new(x, y, z),
        relative,
    })
}

pub fn decode_move_player(data: &mut BytesMut) -> Result<InternalPacket, DecodeError> {
    let x = read_f64(data)?;
    let y = read_f64(data)?;
    let z = read_f64(data)?;
    Ok(InternalPacket::MovePlayer {
        position: Vec3d::new(x, y, z),
    })
}

/// Chunk data and unload both open with the column coordinate.
pub fn decode_column(data: &mut BytesMut) -> Result<ChunkPos, DecodeError> {
    let x = read_i32(data)?;
    let z = read_i32(data)?;
    Ok(ChunkPos::new(x, z))
}

pub fn decode_block_change(
    version: &GameVersion,
    data: &mut BytesMut,
) -> Result<InternalPacket, DecodeError> {
    let pos = BlockPos::decode(read_i64(data)? as u64, version.position_layout());
    let state = read_varint(data)?;
    Ok(InternalPacket::BlockChange { pos, state })
}

pub fn decode_multi_block_change(
    version: &GameVersion,
    data: &mut BytesMut,
) -> Result<InternalPacket, DecodeError> {
    let protocol = version.protocol;

    if protocol < 751 {
        let column = decode_column(data)?;
        let count = read_length(data)?;
        ensure(data, count.saturating_mul(3))?;
        let mut changes = Vec::with_capacity(count);
        for _ in 0..count {
            let horizontal = read_u8(data)? as i32;
            let y = read_u8(data)? as i32;
            let state = read_varint(data)?;
            let pos = column.block(horizontal >> 4, y, horizontal & 0xF);
            changes.push((pos, state));
        }
        return Ok(InternalPacket::MultiBlockChange { changes });
    }

    let section = SectionPos::decode(read_i64(data)? as u64);
    if protocol < 763 {
        let _trust_edges = read_bool(data)?;
    }
    let count = read_length(data)?;
    ensure(data, count)?;
    let mut changes = Vec::with_capacity(count);
    for _ in 0..count {
        let entry = read_varlong(data)?;
        let state = (entry >> 12) as i32;
        let x = ((entry >> 8) & 0xF) as i32;
        let z = ((entry >> 4) & 0xF) as i32;
        let y = (entry & 0xF) as i32;
        changes.push((section.block(x, y, z), state));
    }
    Ok(InternalPacket::MultiBlockChange { changes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::resolve;
    use bytes::BufMut;
    use strata_nbt::{nbt_compound, nbt_list};
    use strata_types::PositionLayout;

    fn codec_1_19() -> NbtValue {
        nbt_compound! {
            "minecraft:dimension_type" => nbt_compound! {
                "type" => NbtValue::String("minecraft:dimension_type".into()),
                "value" => nbt_list![nbt_compound! {
                    "name" => NbtValue::String("minecraft:overworld".into()),
                    "id" => NbtValue::Int(0),
                    "element" => nbt_compound! {
                        "min_y" => NbtValue::Int(-64),
                        "height" => NbtValue::Int(384)
                    }
                }]
            },
            "minecraft:worldgen/biome" => nbt_compound! {
                "type" => NbtValue::String("minecraft:worldgen/biome".into()),
                "value" => nbt_list![nbt_compound! {
                    "name" => NbtValue::String("minecraft:plains".into()),
                    "id" => NbtValue::Int(0)
                }]
            }
        }
    }

    #[test]
    fn test_join_game_legacy() {
        let mut data = BytesMut::new();
        data.put_i32(42);
        data.put_u8(1);
        data.put_i32(-1);
        data.put_u8(2);
        let packet = decode_join_game(340, &mut data).unwrap();
        assert!(matches!(
            packet,
            InternalPacket::JoinGame {
                dimension: Dimension::Nether,
                world_height: None,
                ..
            }
        ));
    }

    #[test]
    fn test_join_game_1_19_resolves_height() {
        let mut data = BytesMut::new();
        data.put_i32(7);
        data.put_u8(0); // hardcore
        data.put_u8(1);
        data.put_u8(255);
        write_varint(&mut data, 1);
        write_string(&mut data, "minecraft:overworld");
        codec_1_19().write_root_named("", &mut data);
        write_string(&mut data, "minecraft:overworld");
        write_string(&mut data, "minecraft:overworld");
        data.put_i64(0);

        match decode_join_game(760, &mut data).unwrap() {
            InternalPacket::JoinGame {
                dimension,
                world_height,
                biome_names,
                dimension_types,
            } => {
                assert_eq!(dimension, Dimension::Overworld);
                assert_eq!(world_height, Some(WorldHeight::new(-64, 384)));
                assert_eq!(biome_names, Some(vec!["minecraft:plains".to_string()]));
                assert_eq!(dimension_types.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_join_game_1_17_dimension_nbt() {
        let mut data = BytesMut::new();
        data.put_i32(7);
        data.put_u8(0);
        data.put_u8(1);
        data.put_u8(255);
        write_varint(&mut data, 0);
        codec_1_19().write_root_named("", &mut data);
        nbt_compound! {
            "min_y" => NbtValue::Int(0),
            "height" => NbtValue::Int(256)
        }
        .write_root_named("", &mut data);
        write_string(&mut data, "minecraft:the_end");

        match decode_join_game(756, &mut data).unwrap() {
            InternalPacket::JoinGame {
                dimension,
                world_height,
                biome_names,
                ..
            } => {
                assert_eq!(dimension, Dimension::End);
                assert_eq!(world_height, Some(WorldHeight::new(0, 256)));
                assert!(biome_names.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_respawn_by_type_name() {
        let mut data = BytesMut::new();
        write_string(&mut data, "minecraft:overworld");
        write_string(&mut data, "minecraft:overworld");
        let packet = decode_respawn(763, &mut data).unwrap();
        assert_eq!(
            packet,
            InternalPacket::Respawn {
                dimension: Dimension::Overworld,
                dimension_type: Some("minecraft:overworld".into()),
                world_height: None,
            }
        );
    }

    #[test]
    fn test_block_change_layouts() {
        let pos = BlockPos::new(-5, 70, 123);
        for protocol in [340, 763] {
            let version = resolve(protocol);
            let mut data = BytesMut::new();
            data.put_i64(pos.encode(version.position_layout()) as i64);
            write_varint(&mut data, 1);
            let packet = decode_block_change(&version, &mut data).unwrap();
            assert_eq!(packet, InternalPacket::BlockChange { pos, state: 1 });
        }
        assert_eq!(resolve(340).position_layout(), PositionLayout::Xyz);
    }

    #[test]
    fn test_multi_block_change_legacy() {
        let mut data = BytesMut::new();
        data.put_i32(-1);
        data.put_i32(2);
        write_varint(&mut data, 1);
        data.put_u8(0x3A);
        data.put_u8(64);
        write_varint(&mut data, 9);
        let packet = decode_multi_block_change(&resolve(404), &mut data).unwrap();
        assert_eq!(
            packet,
            InternalPacket::MultiBlockChange {
                changes: vec![(BlockPos::new(-16 + 3, 64, 32 + 10), 9)]
            }
        );
    }

    #[test]
    fn test_multi_block_change_sections() {
        let section = SectionPos { x: 1, y: -2, z: 3 };
        for protocol in [754, 763] {
            let mut data = BytesMut::new();
            data.put_i64(section.encode() as i64);
            if protocol < 763 {
                data.put_u8(1);
            }
            write_varint(&mut data, 1);
            write_varlong(&mut data, (33 << 12) | (4 << 8) | (5 << 4) | 6);
            let packet = decode_multi_block_change(&resolve(protocol), &mut data).unwrap();
            assert_eq!(
                packet,
                InternalPacket::MultiBlockChange {
                    changes: vec![(BlockPos::new(16 + 4, -32 + 6, 48 + 5), 33)]
                }
            );
        }
    }

    #[test]
    fn test_truncated_position() {
        let mut data = BytesMut::from(&[0u8; 10][..]);
        assert!(decode_position_sync(&mut data).is_err());
    }
}
