//! CLI commands

pub mod copy;
pub mod extract;
pub mod info;
pub mod sync;
