//! Command line frontend

pub mod args;
pub mod output;

pub use args::Args;
pub use output::OutputFormatter;
