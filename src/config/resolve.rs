use std::path::{Component, Path, PathBuf};

use anyhow::Context as _;

use crate::config::model::{
    CodecProfile, CropAmount, DEFAULT_FRAMERATE, DailiesConfig, OutputSettings, non_empty,
};
use crate::foundation::core::{Resolution, Timecode};
use crate::foundation::error::{DailiesError, DailiesResult};
use crate::render::frame::ResizeFilter;
use crate::sequence::discover::ImageSequence;

/// Codec name that switches the encoder to JPEG frames over an image pipe.
pub const JPEG_CONTAINER_CODEC: &str = "mjpeg";

/// Effective, frozen settings for one sequence run.
#[derive(Clone, Debug)]
pub struct RunSettings {
    /// Key of the selected `output_codecs` entry.
    pub codec_key: String,
    /// `name` of the codec profile, falling back to its key.
    pub codec_name: String,
    pub codec: CodecProfile,
    /// Output size, computed once from the first frame when unset.
    pub resolution: Resolution,
    pub fit: bool,
    pub cropwidth: Option<CropAmount>,
    pub cropheight: Option<CropAmount>,
    /// Explicit resize filter; `None` selects by enlarge/reduce.
    pub filter: Option<ResizeFilter>,
    pub framerate: f64,
    pub bitdepth: u8,
    pub movie_path: PathBuf,
    pub start_timecode: Timecode,
    /// Write numbered stills instead of invoking the encoder.
    pub debug_stills: bool,
    /// Per-run log level is debug rather than info.
    pub verbose: bool,
}

impl RunSettings {
    pub fn is_jpeg_container(&self) -> bool {
        self.codec_name == JPEG_CONTAINER_CODEC
    }

    /// Path of the per-run log file beside the movie.
    pub fn log_path(&self) -> PathBuf {
        self.movie_path.with_extension("log")
    }
}

/// Inputs to [`resolve_run`] that come from the command line rather than the config file.
#[derive(Clone, Debug, Default)]
pub struct RunRequest<'a> {
    pub codec_key: &'a str,
    pub output_dir: Option<&'a Path>,
    pub debug: bool,
}

/// Build the effective settings for `seq`: merge globals with the codec's overrides, freeze the
/// output resolution and resolve the movie path (creating its directory).
pub fn resolve_run(
    config: &DailiesConfig,
    request: &RunRequest<'_>,
    seq: &ImageSequence,
) -> DailiesResult<RunSettings> {
    let codec = config.codec(request.codec_key)?.clone();
    let merged = merge_output_settings(&config.globals.output, &codec.overrides);

    let resolution = resolve_resolution(merged.width, merged.height, || {
        let first = seq.first().ok_or_else(|| {
            DailiesError::discovery(format!("sequence '{}' has no frames", seq.display_name()))
        })?;
        image::image_dimensions(&first.path).map_err(|e| {
            DailiesError::discovery(format!(
                "could not read resolution of first frame '{}': {e}",
                first.path.display()
            ))
        })
    })?;

    let filter = match non_empty(&merged.filter) {
        Some(name) => Some(ResizeFilter::from_name(&name).ok_or_else(|| {
            DailiesError::configuration(format!("unknown resize filter '{name}'"))
        })?),
        None => None,
    };

    let framerate = merged.framerate.unwrap_or(DEFAULT_FRAMERATE);
    let start_frame = seq.first().map(|f| f.number).unwrap_or(0);
    let start_timecode = Timecode::from_frame_number(start_frame, framerate)?;

    let codec_name = non_empty(&codec.name).unwrap_or_else(|| request.codec_key.to_string());
    let file_name = movie_file_name(
        &seq.basename(),
        &codec_name,
        merged.movie_append_codec.unwrap_or(true),
        merged.movie_ext.as_deref().unwrap_or("mov"),
    );

    let location = match request.output_dir {
        Some(dir) => dir.to_string_lossy().into_owned(),
        None => merged.movie_location.clone().unwrap_or_else(|| ".".into()),
    };
    let movie_path = resolve_movie_path(&location, &seq.directory, &file_name, dirs::home_dir());
    ensure_parent_dir(&movie_path)?;

    Ok(RunSettings {
        codec_key: request.codec_key.to_string(),
        codec_name,
        bitdepth: codec.bitdepth(),
        codec,
        resolution,
        fit: merged.fit.unwrap_or(false),
        cropwidth: merged.cropwidth,
        cropheight: merged.cropheight,
        filter,
        framerate,
        movie_path,
        start_timecode,
        debug_stills: request.debug,
        verbose: request.debug || config.globals.debug,
    })
}

/// Values that are present but empty never clobber the other layer.
trait Unset {
    fn is_unset(&self) -> bool;
}

impl Unset for u32 {
    fn is_unset(&self) -> bool {
        *self == 0
    }
}

impl Unset for f64 {
    fn is_unset(&self) -> bool {
        *self == 0.0
    }
}

impl Unset for bool {
    fn is_unset(&self) -> bool {
        false
    }
}

impl Unset for String {
    fn is_unset(&self) -> bool {
        self.trim().is_empty()
    }
}

impl Unset for CropAmount {
    fn is_unset(&self) -> bool {
        self.is_zero()
    }
}

fn pick<T: Clone + Unset>(global: &Option<T>, codec: &Option<T>) -> Option<T> {
    match codec {
        Some(v) if !v.is_unset() => Some(v.clone()),
        _ => global.as_ref().filter(|v| !v.is_unset()).cloned(),
    }
}

/// Overlay the codec's non-empty values on the global defaults. Empty values on either side
/// resolve to `None`.
pub fn merge_output_settings(globals: &OutputSettings, codec: &OutputSettings) -> OutputSettings {
    OutputSettings {
        width: pick(&globals.width, &codec.width),
        height: pick(&globals.height, &codec.height),
        fit: pick(&globals.fit, &codec.fit),
        cropwidth: pick(&globals.cropwidth, &codec.cropwidth),
        cropheight: pick(&globals.cropheight, &codec.cropheight),
        filter: pick(&globals.filter, &codec.filter),
        framerate: pick(&globals.framerate, &codec.framerate),
        movie_location: pick(&globals.movie_location, &codec.movie_location),
        movie_ext: pick(&globals.movie_ext, &codec.movie_ext),
        movie_append_codec: pick(&globals.movie_append_codec, &codec.movie_append_codec),
    }
}

/// Fill a missing output dimension from the native size, preserving its aspect ratio.
///
/// `native` is only consulted when a dimension is missing.
pub fn resolve_resolution(
    width: Option<u32>,
    height: Option<u32>,
    native: impl FnOnce() -> DailiesResult<(u32, u32)>,
) -> DailiesResult<Resolution> {
    if let (Some(w), Some(h)) = (width, height) {
        return Resolution::new(w, h);
    }
    let (nw, nh) = native()?;
    let native = Resolution::new(nw, nh).map_err(|_| {
        DailiesError::discovery(format!("first frame has a zero dimension ({nw}x{nh})"))
    })?;
    let aspect = native.aspect();
    let (w, h) = match (width, height) {
        (Some(w), None) => (w, (f64::from(w) / aspect).round() as u32),
        (None, Some(h)) => ((f64::from(h) * aspect).round() as u32, h),
        _ => (native.width, native.height),
    };
    Resolution::new(w.max(1), h.max(1))
}

/// `<basename>[_<codec>].<ext>`
pub fn movie_file_name(basename: &str, codec_name: &str, append_codec: bool, ext: &str) -> String {
    let ext = ext.trim().trim_start_matches('.');
    if append_codec && !codec_name.is_empty() {
        format!("{basename}_{codec_name}.{ext}")
    } else {
        format!("{basename}.{ext}")
    }
}

/// Resolve the movie location: absolute, home-relative (`~`), or relative to the sequence
/// directory. The result is lexically normalized.
pub fn resolve_movie_path(
    location: &str,
    sequence_dir: &Path,
    file_name: &str,
    home: Option<PathBuf>,
) -> PathBuf {
    let location = location.trim();
    let dir = if let Some(rest) = location
        .strip_prefix("~/")
        .or_else(|| (location == "~").then_some(""))
    {
        home.unwrap_or_else(|| PathBuf::from("/")).join(rest)
    } else if Path::new(location).is_absolute() {
        PathBuf::from(location)
    } else {
        sequence_dir.join(location)
    };
    normalize_path(&dir.join(file_name))
}

/// Remove `.` segments and fold `..` into the preceding segment without touching the disk.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for part in path.components() {
        match part {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> DailiesResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/config/resolve.rs"]
mod tests;
