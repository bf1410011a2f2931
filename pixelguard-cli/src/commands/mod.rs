//! Subcommand implementations.

pub mod detect;
pub mod embed;
pub mod extract;
pub mod lookup;
pub mod model;
pub mod protect;
pub mod strip;
pub mod verify;
