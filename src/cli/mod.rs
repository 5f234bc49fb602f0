//! Command-line interface for clausewise.

mod commands;
pub mod progress;

pub use commands::{is_verbose, run};
