use std::path::{Path, PathBuf};

use image::{Rgb32FImage, RgbImage};

use crate::foundation::core::FrameIndex;
use crate::foundation::error::{DailiesError, DailiesResult};
use crate::render::frame::to_rgb8;

/// JPEG quality used for the image-pipe codec and debug stills.
pub const JPEG_QUALITY: u8 = 90;

/// Configuration provided to a [`FrameSink`] at the start of a sequence run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SinkConfig {
    pub width: u32,
    pub height: u32,
    pub framerate: f64,
    /// Delivery bit depth; 10 and above selects 16-bit samples.
    pub bitdepth: u8,
}

/// Sink contract for consuming finished frames in sequence order.
///
/// Ordering contract: `push_frame` is called in strictly increasing `FrameIndex` order. Skipped
/// frames leave gaps in the indices.
pub trait FrameSink: Send {
    fn begin(&mut self, cfg: SinkConfig) -> DailiesResult<()>;
    fn push_frame(&mut self, idx: FrameIndex, frame: &Rgb32FImage) -> DailiesResult<()>;
    fn end(&mut self) -> DailiesResult<()>;
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    /// Frames in delivery order.
    pub frames: Vec<(FrameIndex, Rgb32FImage)>,
    pub ended: bool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> DailiesResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.ended = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &Rgb32FImage) -> DailiesResult<()> {
        check_order(self.frames.last().map(|(i, _)| *i), idx)?;
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> DailiesResult<()> {
        self.ended = true;
        Ok(())
    }
}

/// Debug-mode sink: writes each frame as `<movie stem>.<index + 1, 5 digits>.jpg` beside the
/// movie path instead of running an encoder.
#[derive(Debug)]
pub struct StillImageSink {
    movie_path: PathBuf,
    last_idx: Option<FrameIndex>,
    written: Vec<PathBuf>,
}

impl StillImageSink {
    pub fn new(movie_path: impl Into<PathBuf>) -> Self {
        Self {
            movie_path: movie_path.into(),
            last_idx: None,
            written: Vec::new(),
        }
    }

    /// Still image path for delivery index `idx`.
    pub fn still_path(&self, idx: FrameIndex) -> PathBuf {
        still_path_for(&self.movie_path, idx)
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

pub fn still_path_for(movie_path: &Path, idx: FrameIndex) -> PathBuf {
    let stem = movie_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frame".to_string());
    movie_path.with_file_name(format!("{stem}.{:05}.jpg", idx.0 + 1))
}

impl FrameSink for StillImageSink {
    fn begin(&mut self, _cfg: SinkConfig) -> DailiesResult<()> {
        crate::config::resolve::ensure_parent_dir(&self.movie_path)?;
        self.last_idx = None;
        self.written.clear();
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &Rgb32FImage) -> DailiesResult<()> {
        check_order(self.last_idx, idx)?;
        self.last_idx = Some(idx);

        let path = self.still_path(idx);
        let bytes = encode_jpeg(&to_rgb8(frame))?;
        std::fs::write(&path, bytes).map_err(|e| {
            DailiesError::delivery(format!("failed to write still '{}': {e}", path.display()))
        })?;
        tracing::debug!(path = %path.display(), "wrote debug still");
        self.written.push(path);
        Ok(())
    }

    fn end(&mut self) -> DailiesResult<()> {
        tracing::info!(
            stills = self.written.len(),
            dir = %self.movie_path.parent().unwrap_or(Path::new(".")).display(),
            "debug stills written"
        );
        Ok(())
    }
}

/// Encode an RGB8 frame as a baseline JPEG at [`JPEG_QUALITY`].
pub fn encode_jpeg(rgb: &RgbImage) -> DailiesResult<Vec<u8>> {
    let mut out = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    rgb.write_with_encoder(encoder)
        .map_err(|e| DailiesError::delivery(format!("jpeg encoding failed: {e}")))?;
    Ok(out)
}

pub(crate) fn check_order(last: Option<FrameIndex>, idx: FrameIndex) -> DailiesResult<()> {
    match last {
        Some(last) if idx <= last => Err(DailiesError::delivery(format!(
            "out-of-order frame index {} after {}",
            idx.0, last.0
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
