//! Color management: the engine seam and the transform selector.

pub mod engine;
pub mod select;
