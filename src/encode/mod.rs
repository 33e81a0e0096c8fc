//! Encoder sinks: ordered frame delivery to ffmpeg, still images or memory.

pub mod ffmpeg;
pub mod sink;
