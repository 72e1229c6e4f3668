//! CLI command implementations

pub mod alternatives;
pub mod score;
pub mod status;
