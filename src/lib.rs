//! Dailies renders review movies from still-image sequences.
//!
//! An invocation discovers image sequences on disk, then renders each one:
//!
//! - Resolve the effective settings for the run (globals merged with the codec profile)
//! - Load, color convert, crop and resize every frame
//! - Composite the profile's burned-in text overlays
//! - Stream the frames in order into an encoder [`FrameSink`]
#![forbid(unsafe_code)]

mod foundation;

/// Color engine seam and transform selection.
pub mod color;
/// Configuration file schema and per-run settings.
pub mod config;
/// Frame sinks: ffmpeg, still images, memory.
pub mod encode;
/// Console and per-run log output.
pub mod logging;
/// Text overlays and cropmask.
pub mod overlay;
/// Frame operations and the sequence pipeline.
pub mod render;
/// Image sequence discovery.
pub mod sequence;
/// Invocation orchestration.
pub mod session;

pub use crate::foundation::core::{ColorRgba, FrameIndex, Resolution, Timecode};
pub use crate::foundation::error::{DailiesError, DailiesResult};

pub use crate::color::engine::{ColorEngine, TransferCurveEngine};
pub use crate::color::select::ColorTransform;
pub use crate::config::model::DailiesConfig;
pub use crate::config::resolve::RunSettings;
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
pub use crate::encode::sink::{FrameSink, InMemorySink, SinkConfig, StillImageSink};
pub use crate::overlay::compositor::OverlayCompositor;
pub use crate::render::pipeline::{RenderStats, RunContext, run_sequence};
pub use crate::sequence::discover::{Frame, ImageSequence, discover_sequences};
pub use crate::session::{InvocationRequest, SequenceReport, run_invocation};
