//! Image sequence discovery.

pub mod discover;
