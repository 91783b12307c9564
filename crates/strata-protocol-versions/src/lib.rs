mod catalog;
mod dimension;
mod ids;
mod login;
mod play;
mod tables;

pub use catalog::{lookup, resolve, VERSIONS};
pub use dimension::{biome_names, dimension_height, dimension_types};
pub use tables::{table_for, GameTable, HandshakeTable, LoginTable, StatusTable};
