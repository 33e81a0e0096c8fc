//! Configuration file model and per-run settings resolution.

pub mod model;
pub mod resolve;
