mod region_file;
mod world;

pub use region_file::RegionStorage;
pub use world::WorldStorage;
