use std::io::{Read, Write as _};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};

use image::Rgb32FImage;

use crate::config::model::{CodecProfile, ParamValue};
use crate::config::resolve::{RunSettings, ensure_parent_dir};
use crate::encode::sink::{FrameSink, SinkConfig, check_order, encode_jpeg};
use crate::foundation::core::{FrameIndex, Timecode};
use crate::foundation::error::{DailiesError, DailiesResult};
use crate::render::frame::{to_rgb8, to_rgb24, to_rgb48le};

/// Byte format written to ffmpeg's stdin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipeFormat {
    Rgb24,
    Rgb48le,
    /// One JPEG image per frame over `image2pipe`.
    Jpeg,
}

impl PipeFormat {
    pub fn for_run(jpeg: bool, bitdepth: u8) -> Self {
        if jpeg {
            Self::Jpeg
        } else if bitdepth >= 10 {
            Self::Rgb48le
        } else {
            Self::Rgb24
        }
    }

    pub fn pixel_format(self) -> Option<&'static str> {
        match self {
            Self::Rgb24 => Some("rgb24"),
            Self::Rgb48le => Some("rgb48le"),
            Self::Jpeg => None,
        }
    }
}

/// Options for [`FfmpegSink`].
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    pub out_path: PathBuf,
    pub codec: CodecProfile,
    /// Send JPEG frames instead of raw pixels.
    pub jpeg: bool,
    pub start_timecode: Timecode,
}

impl FfmpegSinkOpts {
    pub fn from_settings(settings: &RunSettings) -> Self {
        Self {
            out_path: settings.movie_path.clone(),
            codec: settings.codec.clone(),
            jpeg: settings.is_jpeg_container(),
            start_timecode: settings.start_timecode,
        }
    }
}

/// Full ffmpeg argument list (without the program name) for one run.
///
/// Codec parameters that are unset or empty are omitted.
pub fn build_ffmpeg_args(cfg: &SinkConfig, opts: &FfmpegSinkOpts) -> Vec<String> {
    let format = PipeFormat::for_run(opts.jpeg, cfg.bitdepth);
    let rate = format_rate(cfg.framerate);
    let mut args: Vec<String> = ["-hide_banner", "-loglevel", "error", "-y"]
        .into_iter()
        .map(String::from)
        .collect();

    match format.pixel_format() {
        Some(pix) => args.extend([
            "-f".into(),
            "rawvideo".into(),
            "-pixel_format".into(),
            pix.into(),
            "-video_size".into(),
            format!("{}x{}", cfg.width, cfg.height),
        ]),
        None => args.extend(["-f".into(), "image2pipe".into()]),
    }
    args.extend([
        "-framerate".into(),
        rate.clone(),
        "-i".into(),
        "pipe:0".into(),
        "-timecode".into(),
        opts.start_timecode.to_string(),
    ]);

    let c = &opts.codec;
    let params: [(&str, &Option<ParamValue>); 9] = [
        ("-c:v", &c.codec),
        ("-profile:v", &c.profile),
        ("-qscale:v", &c.qscale),
        ("-preset", &c.preset),
        ("-g", &c.keyint),
        ("-bf", &c.bframes),
        ("-tune", &c.tune),
        ("-crf", &c.crf),
        ("-pix_fmt", &c.pix_fmt),
    ];
    push_params(&mut args, &params);
    args.extend(["-r".into(), rate]);
    push_params(
        &mut args,
        &[
            ("-vf", &c.vf),
            ("-vendor", &c.vendor),
            ("-metadata:s", &c.metadata_s),
            ("-b:v", &c.bitrate),
        ],
    );

    args.push(opts.out_path.to_string_lossy().replace('\\', "/"));
    args
}

fn push_params(args: &mut Vec<String>, params: &[(&str, &Option<ParamValue>)]) {
    for (flag, value) in params {
        if let Some(v) = value.as_ref().filter(|v| v.is_set()) {
            args.push((*flag).to_string());
            args.push(v.to_string());
        }
    }
}

fn format_rate(fps: f64) -> String {
    if fps.fract() == 0.0 {
        format!("{}", fps as i64)
    } else {
        format!("{fps}")
    }
}

/// Sink that spawns the system `ffmpeg` and streams frames to its stdin.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,

    format: PipeFormat,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
}

impl FfmpegSink {
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stderr_drain: None,
            format: PipeFormat::Rgb24,
            cfg: None,
            last_idx: None,
        }
    }

    fn frame_bytes(&self, frame: &Rgb32FImage) -> DailiesResult<Vec<u8>> {
        match self.format {
            PipeFormat::Rgb24 => Ok(to_rgb24(frame)),
            PipeFormat::Rgb48le => Ok(to_rgb48le(frame)),
            PipeFormat::Jpeg => encode_jpeg(&to_rgb8(frame)),
        }
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> DailiesResult<()> {
        if !cfg.framerate.is_finite() || cfg.framerate <= 0.0 {
            return Err(DailiesError::delivery("framerate must be positive"));
        }
        if cfg.width == 0 || cfg.height == 0 {
            return Err(DailiesError::delivery(
                "ffmpeg sink width/height must be non-zero",
            ));
        }
        ensure_parent_dir(&self.opts.out_path)?;

        if !is_ffmpeg_on_path() {
            return Err(DailiesError::delivery(
                "ffmpeg is required for movie encoding, but was not found on PATH",
            ));
        }

        let args = build_ffmpeg_args(&cfg, &self.opts);
        tracing::info!(command = %format!("ffmpeg {}", args.join(" ")), "starting encoder");

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                DailiesError::delivery(format!(
                    "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DailiesError::delivery("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| DailiesError::delivery("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        self.format = PipeFormat::for_run(self.opts.jpeg, cfg.bitdepth);
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &Rgb32FImage) -> DailiesResult<()> {
        let cfg = self
            .cfg
            .ok_or_else(|| DailiesError::delivery("ffmpeg sink not started"))?;
        check_order(self.last_idx, idx)?;
        self.last_idx = Some(idx);

        if frame.dimensions() != (cfg.width, cfg.height) {
            return Err(DailiesError::delivery(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width(),
                frame.height(),
                cfg.width,
                cfg.height
            )));
        }

        let bytes = self.frame_bytes(frame)?;
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(DailiesError::delivery("ffmpeg sink is already finalized"));
        };
        stdin.write_all(&bytes).map_err(|e| {
            DailiesError::delivery(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        Ok(())
    }

    fn end(&mut self) -> DailiesResult<()> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| DailiesError::delivery("ffmpeg sink not started"))?;

        let status = child.wait().map_err(|e| {
            DailiesError::delivery(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| DailiesError::delivery("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| DailiesError::delivery(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };
        let stderr = String::from_utf8_lossy(&stderr_bytes);

        if !status.success() {
            return Err(DailiesError::delivery(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        if !stderr.trim().is_empty() {
            tracing::debug!(output = %stderr.trim(), "ffmpeg output");
        }
        tracing::info!(movie = %self.opts.out_path.display(), "encoder finished");

        self.cfg = None;
        Ok(())
    }
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
