pub mod commands;
pub mod config;
pub mod repl;

pub use commands::{Command, CommandError};
pub use config::Config;
pub use repl::{CommandResult, Repl};
