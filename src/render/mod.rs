//! Per-frame image operations and the sequence render loop.

/// Loading, cropping, resizing and pixel conversion of single frames.
pub mod frame;
/// Ordered processing of a sequence into a frame sink.
pub mod pipeline;
