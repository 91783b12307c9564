mod nbt;
mod reader;

pub use nbt::*;
pub use reader::*;
