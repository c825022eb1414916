//! The `utopia-scale` binary: the process-role discriminator's home, the CLI
//! surface for the supervisor, and a minimal demonstration worker server.

#![deny(unsafe_code)]

pub mod cli;
pub mod worker;

pub use cli::Cli;
