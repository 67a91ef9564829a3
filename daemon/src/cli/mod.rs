//! CLI command implementations.

pub mod run;
pub mod send;
pub mod status;
