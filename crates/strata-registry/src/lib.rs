mod error;
mod loader;
mod palette;
mod reports;

pub use error::RegistryError;
pub use loader::{Registries, RegistryHandle, RegistryLoader, RegistryState};
pub use palette::{BlockState, GlobalPalette, NameTable};
pub use reports::Reports;
