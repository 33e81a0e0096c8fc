use std::sync::mpsc;
use std::time::Instant;

use image::Rgb32FImage;

use crate::color::engine::ColorEngine;
use crate::color::select::ColorTransform;
use crate::config::resolve::RunSettings;
use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
use crate::encode::sink::{FrameSink, SinkConfig, StillImageSink};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{DailiesError, DailiesResult};
use crate::overlay::compositor::OverlayCompositor;
use crate::render::frame::{crop_frame, load_frame, resize_frame};
use crate::sequence::discover::{Frame, ImageSequence};

/// Finished frames waiting for the sink. A full queue blocks the pipeline.
pub const DELIVERY_QUEUE_CAPACITY: usize = 2;

/// Everything one sequence run reads. Built once before the first frame and never mutated.
#[derive(Clone, Copy, Debug)]
pub struct RunContext<'a> {
    pub sequence: &'a ImageSequence,
    pub settings: &'a RunSettings,
    pub color: &'a ColorTransform,
}

impl RunContext<'_> {
    pub fn sink_config(&self) -> SinkConfig {
        SinkConfig {
            width: self.settings.resolution.width,
            height: self.settings.resolution.height,
            framerate: self.settings.framerate,
            bitdepth: self.settings.bitdepth,
        }
    }
}

/// Counters for one sequence run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub frames_total: u64,
    pub frames_delivered: u64,
    pub frames_skipped: u64,
    pub delivery_failures: u64,
    /// A delivery or encoder failure happened; delivered frames are kept.
    pub degraded: bool,
}

/// Sink for a run: numbered stills in debug mode, otherwise an ffmpeg subprocess.
pub fn sink_for_run(settings: &RunSettings) -> Box<dyn FrameSink> {
    if settings.debug_stills {
        Box::new(StillImageSink::new(&settings.movie_path))
    } else {
        Box::new(FfmpegSink::new(FfmpegSinkOpts::from_settings(settings)))
    }
}

/// Load, color convert, crop/resize and overlay one frame.
pub fn process_frame(
    ctx: &RunContext<'_>,
    engine: &dyn ColorEngine,
    overlay: &mut OverlayCompositor,
    frame: &Frame,
) -> DailiesResult<Rgb32FImage> {
    let n = frame.number;
    let mut pixels = load_frame(&frame.path).map_err(|e| DailiesError::frame(n, e))?;
    engine
        .convert(&mut pixels, &ctx.color.source, &ctx.color.destination)
        .map_err(|e| DailiesError::frame(n, format!("color transform failed: {e}")))?;

    let s = ctx.settings;
    let pixels = crop_frame(pixels, s.cropwidth, s.cropheight);
    let mut pixels = resize_frame(pixels, s.resolution, s.fit, s.filter)
        .map_err(|e| DailiesError::frame(n, format!("resize failed: {e}")))?;

    overlay
        .apply(&mut pixels, n)
        .map_err(|e| DailiesError::frame(n, format!("overlay failed: {e}")))?;
    Ok(pixels)
}

struct FrameMsg {
    idx: FrameIndex,
    number: i64,
    frame: Rgb32FImage,
}

#[derive(Default)]
struct DeliveryReport {
    delivered: u64,
    failures: u64,
    encoder_failed: bool,
    start_error: Option<DailiesError>,
}

/// Run every frame of the sequence through the pipeline and deliver the results to `sink`.
///
/// Frames are processed one at a time in sequence order. A frame that fails to load, convert,
/// resize or composite is logged and skipped. Delivery happens on a separate thread fed through
/// a bounded channel; per-frame delivery failures and a failing encoder mark the run degraded.
/// Only a sink that cannot start fails the whole run.
pub fn run_sequence(
    ctx: &RunContext<'_>,
    engine: &mut dyn ColorEngine,
    overlay: &mut OverlayCompositor,
    sink: &mut dyn FrameSink,
) -> DailiesResult<RenderStats> {
    if let Err(e) = engine.set_config(ctx.color.config_path.as_deref()) {
        tracing::warn!(error = %e, "color config rejected, continuing without it");
        let _ = engine.set_config(None);
    }

    let frames = ctx.sequence.frames();
    let total = frames.len();
    let cfg = ctx.sink_config();
    let run_start = Instant::now();

    std::thread::scope(|scope| -> DailiesResult<RenderStats> {
        let (tx, rx) = mpsc::sync_channel::<FrameMsg>(DELIVERY_QUEUE_CAPACITY);
        let sink_ref: &mut dyn FrameSink = sink;
        let dispatch = tracing::dispatcher::get_default(|d| d.clone());

        let delivery = scope.spawn(move || -> DeliveryReport {
            let _log = tracing::dispatcher::set_default(&dispatch);
            let mut report = DeliveryReport::default();
            if let Err(e) = sink_ref.begin(cfg) {
                report.start_error = Some(e);
                return report;
            }
            for msg in rx {
                match sink_ref.push_frame(msg.idx, &msg.frame) {
                    Ok(()) => report.delivered += 1,
                    Err(e) => {
                        tracing::error!(frame = msg.number, error = %e, "frame delivery failed");
                        report.failures += 1;
                    }
                }
            }
            if let Err(e) = sink_ref.end() {
                tracing::error!(error = %e, "encoder failed");
                report.encoder_failed = true;
            }
            report
        });

        let mut stats = RenderStats {
            frames_total: total as u64,
            ..RenderStats::default()
        };
        let engine: &dyn ColorEngine = engine;
        for (i, frame) in frames.iter().enumerate() {
            let frame_start = Instant::now();
            tracing::info!(
                frame = frame.number,
                "processing frame {} of {total}",
                i + 1
            );
            match process_frame(ctx, engine, overlay, frame) {
                Ok(pixels) => {
                    let msg = FrameMsg {
                        idx: FrameIndex(i as u64),
                        number: frame.number,
                        frame: pixels,
                    };
                    if tx.send(msg).is_err() {
                        tracing::error!("encoder is not accepting frames, stopping");
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(frame = frame.number, error = %e, "skipping frame");
                    stats.frames_skipped += 1;
                }
            }
            tracing::info!(
                frame = frame.number,
                elapsed_ms = frame_start.elapsed().as_millis() as u64,
                "frame processed"
            );
        }
        drop(tx);

        let report = delivery
            .join()
            .map_err(|_| DailiesError::delivery("delivery thread panicked"))?;
        if let Some(e) = report.start_error {
            return Err(e);
        }

        stats.frames_delivered = report.delivered;
        stats.delivery_failures = report.failures;
        stats.degraded = report.failures > 0 || report.encoder_failed;
        tracing::info!(
            delivered = stats.frames_delivered,
            skipped = stats.frames_skipped,
            degraded = stats.degraded,
            elapsed_s = run_start.elapsed().as_secs_f64(),
            "sequence finished"
        );
        Ok(stats)
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
