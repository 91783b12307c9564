use serde::Deserialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// What to do with a column that was already in storage before this session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExistingChunks {
    Skip,
    Merge,
    Overwrite,
}

/// Session-server identity used to join on behalf of the player.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub access_token: String,
    pub profile_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_registry_dir")]
    pub registry_dir: PathBuf,
    #[serde(default)]
    pub enable_world_gen: bool,
    #[serde(default = "default_render_distance")]
    pub render_distance: i32,
    #[serde(default)]
    pub mark_new_chunks: bool,
    #[serde(default = "default_existing_chunks")]
    pub existing_chunks: ExistingChunks,
    #[serde(default = "default_true")]
    pub write_chunks: bool,
    #[serde(default)]
    pub seed: i64,
    #[serde(default)]
    pub center_x: i32,
    #[serde(default)]
    pub center_z: i32,
    #[serde(default)]
    pub mask_bedrock: bool,
    #[serde(default = "default_port")]
    pub local_port: u16,
    #[serde(default = "default_remote_host")]
    pub remote_host: String,
    #[serde(default = "default_port")]
    pub remote_port: u16,
    #[serde(default = "default_chunk_queue")]
    pub chunk_queue: usize,
    #[serde(default = "default_save_queue")]
    pub save_queue: usize,
    #[serde(default = "default_write_attempts")]
    pub write_attempts: u32,
    #[serde(default)]
    pub auth: Option<AuthConfig>,
}

fn default_output_dir() -> PathBuf {
    "world".into()
}

fn default_registry_dir() -> PathBuf {
    "registries".into()
}

fn default_render_distance() -> i32 {
    12
}

fn default_existing_chunks() -> ExistingChunks {
    ExistingChunks::Merge
}

fn default_true() -> bool {
    true
}

fn default_port() -> u16 {
    25565
}

fn default_remote_host() -> String {
    "localhost".into()
}

fn default_chunk_queue() -> usize {
    1024
}

fn default_save_queue() -> usize {
    256
}

fn default_write_attempts() -> u32 {
    2
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            registry_dir: default_registry_dir(),
            enable_world_gen: false,
            render_distance: default_render_distance(),
            mark_new_chunks: false,
            existing_chunks: default_existing_chunks(),
            write_chunks: true,
            seed: 0,
            center_x: 0,
            center_z: 0,
            mask_bedrock: false,
            local_port: default_port(),
            remote_host: default_remote_host(),
            remote_port: default_port(),
            chunk_queue: default_chunk_queue(),
            save_queue: default_save_queue(),
            write_attempts: default_write_attempts(),
            auth: None,
        }
    }
}

impl ProxyConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: ProxyConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::info!("No config file found at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Columns further than this from the player are dropped from memory.
    pub fn cache_radius(&self) -> i32 {
        self.render_distance + 2
    }
}
