pub mod cli;
pub mod console;

pub use cli::{build_cli_command, Cli, Commands};
