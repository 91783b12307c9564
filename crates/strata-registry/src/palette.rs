use std::collections::{BTreeMap, HashMap};

/// One block state of the global palette.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockState {
    pub name: String,
    /// Sorted by property name, as the anvil palette expects them.
    pub properties: BTreeMap<String, String>,
}

impl BlockState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn is_air(&self) -> bool {
        matches!(
            self.name.as_str(),
            "minecraft:air" | "minecraft:cave_air" | "minecraft:void_air"
        )
    }
}

/// Global block-state id to state. Empty for versions before the flattening,
/// whose ids are `block << 4 | meta` and need no lookup.
#[derive(Debug, Clone, Default)]
pub struct GlobalPalette {
    states: Vec<Option<BlockState>>,
    defaults: HashMap<String, i32>,
}

impl GlobalPalette {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: i32, state: BlockState, default: bool) {
        if id < 0 {
            return;
        }
        let idx = id as usize;
        if self.states.len() <= idx {
            self.states.resize(idx + 1, None);
        }
        if default || !self.defaults.contains_key(&state.name) {
            self.defaults.insert(state.name.clone(), id);
        }
        self.states[idx] = Some(state);
    }

    pub fn get(&self, id: i32) -> Option<&BlockState> {
        if id < 0 {
            return None;
        }
        self.states.get(id as usize).and_then(|s| s.as_ref())
    }

    /// Id of the default state of a block.
    pub fn default_id(&self, name: &str) -> Option<i32> {
        self.defaults.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.states.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.defaults.is_empty()
    }
}

/// Numeric protocol id to registry name (entities, menus, items).
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    names: HashMap<i32, String>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: i32, name: impl Into<String>) {
        self.names.insert(id, name.into());
    }

    pub fn get(&self, id: i32) -> Option<&str> {
        self.names.get(&id).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_defaults() {
        let mut palette = GlobalPalette::new();
        palette.insert(0, BlockState::new("minecraft:air"), true);
        palette.insert(10, BlockState::new("minecraft:oak_log").with_property("axis", "x"), false);
        palette.insert(11, BlockState::new("minecraft:oak_log").with_property("axis", "y"), true);

        assert_eq!(palette.len(), 3);
        assert_eq!(palette.default_id("minecraft:oak_log"), Some(11));
        assert!(palette.get(0).unwrap().is_air());
        assert!(palette.get(5).is_none());
        assert!(palette.get(-1).is_none());
        assert_eq!(palette.get(10).unwrap().properties["axis"], "x");
    }

    #[test]
    fn test_name_table() {
        let mut names = NameTable::new();
        names.insert(5, "minecraft:pig");
        assert_eq!(names.get(5), Some("minecraft:pig"));
        assert_eq!(names.get(6), None);
    }
}
