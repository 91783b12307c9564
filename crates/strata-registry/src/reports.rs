use crate::error::RegistryError;
use crate::palette::{BlockState, GlobalPalette, NameTable};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ENTITY_REGISTRY: &str = "minecraft:entity_type";
pub const MENU_REGISTRY: &str = "minecraft:menu";
pub const ITEM_REGISTRY: &str = "minecraft:item";
pub const BLOCK_ENTITY_REGISTRY: &str = "minecraft:block_entity_type";

#[derive(Debug, Deserialize)]
struct BlockReport {
    #[serde(default)]
    states: Vec<StateReport>,
}

#[derive(Debug, Deserialize)]
struct StateReport {
    id: i32,
    #[serde(default)]
    default: bool,
    #[serde(default)]
    properties: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RegistryReport {
    #[serde(default)]
    entries: HashMap<String, RegistryEntry>,
}

#[derive(Debug, Deserialize)]
struct RegistryEntry {
    protocol_id: i32,
}

/// The parsed data-generator reports of one version
/// (`<root>/<version>/reports/{blocks,registries}.json`).
#[derive(Debug, Default)]
pub struct Reports {
    blocks: Option<HashMap<String, BlockReport>>,
    registries: Option<HashMap<String, RegistryReport>>,
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, RegistryError> {
    let bytes = std::fs::read(path).map_err(|source| RegistryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| RegistryError::Json {
        path: path.to_path_buf(),
        source,
    })
}

impl Reports {
    pub fn report_dir(root: &Path, version_name: &str) -> PathBuf {
        root.join(version_name).join("reports")
    }

    /// Read and parse both reports.
    pub fn read(dir: &Path) -> Result<Self, RegistryError> {
        let blocks = read_json(&dir.join("blocks.json"))?;
        let registries = read_json(&dir.join("registries.json"))?;
        debug!("Parsed reports in {}", dir.display());
        Ok(Self {
            blocks: Some(blocks),
            registries: Some(registries),
        })
    }

    pub fn block_palette(&self) -> GlobalPalette {
        let mut palette = GlobalPalette::new();
        for (name, block) in self.blocks.iter().flatten() {
            for state in &block.states {
                palette.insert(
                    state.id,
                    BlockState {
                        name: name.clone(),
                        properties: state.properties.clone(),
                    },
                    state.default,
                );
            }
        }
        palette
    }

    /// Name table for one registry; registries a version lacks come back empty
    /// (menus only exist from 1.14).
    pub fn names(&self, registry: &str) -> NameTable {
        let mut table = NameTable::new();
        if let Some(report) = self.registries.as_ref().and_then(|r| r.get(registry)) {
            for (name, entry) in &report.entries {
                table.insert(entry.protocol_id, name.clone());
            }
        }
        table
    }

    /// Release the parsed documents once the tables have been built.
    pub fn clean(&mut self) {
        self.blocks = None;
        self.registries = None;
    }

    pub fn is_clean(&self) -> bool {
        self.blocks.is_none() && self.registries.is_none()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn write_reports(dir: &Path) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(
            dir.join("blocks.json"),
            r#"{
                "minecraft:air": { "states": [ { "id": 0, "default": true } ] },
                "minecraft:stone": { "states": [ { "id": 1, "default": true } ] },
                "minecraft:oak_log": {
                    "properties": { "axis": ["x", "y", "z"] },
                    "states": [
                        { "id": 2, "properties": { "axis": "x" } },
                        { "id": 3, "default": true, "properties": { "axis": "y" } },
                        { "id": 4, "properties": { "axis": "z" } }
                    ]
                }
            }"#,
        )
        .unwrap();
        std::fs::write(
            dir.join("registries.json"),
            r#"{
                "minecraft:entity_type": { "protocol_id": 6, "entries": { "minecraft:pig": { "protocol_id": 90 } } },
                "minecraft:item": { "entries": { "minecraft:stone": { "protocol_id": 1 } } },
                "minecraft:block_entity_type": { "entries": { "minecraft:chest": { "protocol_id": 1 } } }
            }"#,
        )
        .unwrap();
    }

    #[test]
    fn test_read_reports() {
        let tmp = tempfile::tempdir().unwrap();
        write_reports(tmp.path());
        let mut reports = Reports::read(tmp.path()).unwrap();

        let palette = reports.block_palette();
        assert_eq!(palette.len(), 5);
        assert_eq!(palette.get(1).unwrap().name, "minecraft:stone");
        assert_eq!(palette.default_id("minecraft:oak_log"), Some(3));
        assert_eq!(palette.get(4).unwrap().properties["axis"], "z");

        assert_eq!(reports.names(ENTITY_REGISTRY).get(90), Some("minecraft:pig"));
        assert!(reports.names(MENU_REGISTRY).is_empty());

        reports.clean();
        assert!(reports.is_clean());
        assert!(reports.block_palette().is_empty());
    }

    #[test]
    fn test_missing_report() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            Reports::read(tmp.path()),
            Err(RegistryError::Io { .. })
        ));
    }

    #[test]
    fn test_malformed_report() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("blocks.json"), "{ not json").unwrap();
        std::fs::write(tmp.path().join("registries.json"), "{}").unwrap();
        assert!(matches!(
            Reports::read(tmp.path()),
            Err(RegistryError::Json { .. })
        ));
    }
}
