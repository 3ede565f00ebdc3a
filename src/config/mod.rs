pub mod cli;
pub mod registry;

pub use cli::{Cli, Command, LogLevel};
pub use registry::{ConnectionRecord, Registry, RegistryError};
