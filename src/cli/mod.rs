//! CLI command implementations

pub mod error;
pub mod sync;

pub use error::CliError;
pub use sync::{Cli, Commands, OutputFormat};
