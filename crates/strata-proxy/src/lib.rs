pub mod config;
pub mod keyexchange;
pub mod reconstruction;
pub mod relay;
pub mod save;
pub mod session;
pub mod storage;
