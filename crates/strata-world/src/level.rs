//! `level.dat` for exported worlds.

use std::time::{SystemTime, UNIX_EPOCH};
use strata_nbt::{nbt_compound, nbt_list, NbtValue};
use strata_protocol_core::GameVersion;
use strata_types::BlockPos;

/// Anvil format version stored in every level.dat since 1.2.
const ANVIL_VERSION: i32 = 19133;
/// Legacy superflat preset of a single air layer.
const LEGACY_VOID_PRESET: &str = "3;minecraft:air;127;decoration";
/// Protocols from here store generator settings in `WorldGenSettings` (1.16).
const WORLD_GEN_SETTINGS_PROTOCOL: i32 = 735;
/// Multi-noise overworld biome source (1.18).
const MULTI_NOISE_PROTOCOL: i32 = 757;
/// Generators stop carrying their own seed (1.19).
const SEEDLESS_GENERATOR_PROTOCOL: i32 = 759;

/// What the exported world's level.dat describes.
#[derive(Debug, Clone)]
pub struct LevelInfo {
    pub version: GameVersion,
    pub name: String,
    pub seed: i64,
    pub spawn: BlockPos,
    /// Vanilla terrain generation beyond the exported area; void otherwise.
    pub world_gen: bool,
}

impl LevelInfo {
    /// Gzip-compressed level.dat bytes.
    pub fn to_bytes(&self) -> std::io::Result<Vec<u8>> {
        level_dat(self).to_gzip_file_bytes("")
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

fn void_layers() -> NbtValue {
    nbt_list![nbt_compound! {
        "block" => NbtValue::String("minecraft:air".into()),
        "height" => NbtValue::Int(1)
    }]
}

fn flat_settings(protocol: i32) -> NbtValue {
    let mut settings = nbt_compound! {
        "layers" => void_layers(),
        "biome" => NbtValue::String("minecraft:the_void".into())
    };
    if protocol >= SEEDLESS_GENERATOR_PROTOCOL {
        settings.insert("features", NbtValue::Byte(0));
        settings.insert("lakes", NbtValue::Byte(0));
        settings.insert("structure_overrides", NbtValue::List(Vec::new()));
    } else {
        settings.insert(
            "structures",
            nbt_compound! { "structures" => NbtValue::Compound(Vec::new()) },
        );
    }
    settings
}

fn with_seed(mut nbt: NbtValue, info: &LevelInfo) -> NbtValue {
    if info.version.protocol < SEEDLESS_GENERATOR_PROTOCOL {
        nbt.insert("seed", NbtValue::Long(info.seed));
    }
    nbt
}

fn noise_generator(info: &LevelInfo, settings: &str, biome_source: NbtValue) -> NbtValue {
    with_seed(
        nbt_compound! {
            "type" => NbtValue::String("minecraft:noise".into()),
            "settings" => NbtValue::String(settings.into()),
            "biome_source" => biome_source
        },
        info,
    )
}

fn multi_noise(info: &LevelInfo, preset: &str) -> NbtValue {
    let source = nbt_compound! {
        "type" => NbtValue::String("minecraft:multi_noise".into()),
        "preset" => NbtValue::String(preset.into())
    };
    // Before 1.18 the multi-noise source is only used for the nether and
    // carries its own seed.
    if info.version.protocol < MULTI_NOISE_PROTOCOL {
        with_seed(source, info)
    } else {
        source
    }
}

fn dimension_generator(info: &LevelInfo, dimension: &str) -> NbtValue {
    if !info.world_gen {
        return nbt_compound! {
            "type" => NbtValue::String("minecraft:flat".into()),
            "settings" => flat_settings(info.version.protocol)
        };
    }
    match dimension {
        "the_nether" => noise_generator(info, "minecraft:nether", multi_noise(info, "minecraft:nether")),
        "the_end" => noise_generator(
            info,
            "minecraft:end",
            with_seed(nbt_compound! { "type" => NbtValue::String("minecraft:the_end".into()) }, info),
        ),
        _ if info.version.protocol >= MULTI_NOISE_PROTOCOL => {
            noise_generator(info, "minecraft:overworld", multi_noise(info, "minecraft:overworld"))
        }
        _ => noise_generator(
            info,
            "minecraft:overworld",
            with_seed(
                nbt_compound! {
                    "type" => NbtValue::String("minecraft:vanilla_layered".into()),
                    "large_biomes" => NbtValue::Byte(0)
                },
                info,
            ),
        ),
    }
}

fn world_gen_settings(info: &LevelInfo) -> NbtValue {
    let dimensions = ["overworld", "the_nether", "the_end"]
        .into_iter()
        .map(|dim| {
            let entry = nbt_compound! {
                "type" => NbtValue::String(format!("minecraft:{}", dim)),
                "generator" => dimension_generator(info, dim)
            };
            (format!("minecraft:{}", dim), entry)
        })
        .collect();
    nbt_compound! {
        "seed" => NbtValue::Long(info.seed),
        "generate_features" => NbtValue::Byte(info.world_gen as i8),
        "bonus_chest" => NbtValue::Byte(0),
        "dimensions" => NbtValue::Compound(dimensions)
    }
}

/// The full level.dat tree (root compound holding `Data`).
pub fn level_dat(info: &LevelInfo) -> NbtValue {
    let protocol = info.version.protocol;
    let mut data = nbt_compound! {
        "DataVersion" => NbtValue::Int(info.version.data_version),
        "version" => NbtValue::Int(ANVIL_VERSION),
        "LevelName" => NbtValue::String(info.name.clone()),
        "Version" => nbt_compound! {
            "Id" => NbtValue::Int(info.version.data_version),
            "Name" => NbtValue::String(info.version.name.into()),
            "Snapshot" => NbtValue::Byte(0)
        },
        "SpawnX" => NbtValue::Int(info.spawn.x),
        "SpawnY" => NbtValue::Int(info.spawn.y),
        "SpawnZ" => NbtValue::Int(info.spawn.z),
        "GameType" => NbtValue::Int(1),
        "Difficulty" => NbtValue::Byte(1),
        "hardcore" => NbtValue::Byte(0),
        "allowCommands" => NbtValue::Byte(1),
        "initialized" => NbtValue::Byte(1),
        "LastPlayed" => NbtValue::Long(now_millis()),
        "Time" => NbtValue::Long(0),
        "DayTime" => NbtValue::Long(6000),
        "raining" => NbtValue::Byte(0),
        "thundering" => NbtValue::Byte(0),
        "GameRules" => nbt_compound! {
            "doDaylightCycle" => NbtValue::String("false".into()),
            "doWeatherCycle" => NbtValue::String("false".into()),
            "doMobSpawning" => NbtValue::String("false".into())
        }
    };

    if protocol >= WORLD_GEN_SETTINGS_PROTOCOL {
        data.insert("WorldGenSettings", world_gen_settings(info));
    } else {
        data.insert("RandomSeed", NbtValue::Long(info.seed));
        data.insert("MapFeatures", NbtValue::Byte(info.world_gen as i8));
        if info.world_gen {
            data.insert("generatorName", NbtValue::String("default".into()));
        } else {
            data.insert("generatorName", NbtValue::String("flat".into()));
            let options = if info.version.is_flattened() {
                flat_settings(protocol)
            } else {
                NbtValue::String(LEGACY_VOID_PRESET.into())
            };
            data.insert("generatorOptions", options);
        }
    }

    nbt_compound! { "Data" => data }
}
