//! One invocation of the tool: load configuration, discover sequences and render each one.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;

use chrono::{DateTime, Local};

use crate::color::engine::TransferCurveEngine;
use crate::color::select::{ColorTransform, select_color_transform};
use crate::config::model::{
    DEFAULT_CODEC, DEFAULT_DAILIES_PROFILE, DailiesConfig, DailiesProfile, non_empty,
};
use crate::config::resolve::{RunRequest, RunSettings, resolve_run};
use crate::foundation::error::DailiesResult;
use crate::logging::RunLog;
use crate::overlay::compositor::OverlayCompositor;
use crate::overlay::layout::{DATETIME, parse_text_overrides};
use crate::render::pipeline::{RenderStats, RunContext, run_sequence, sink_for_run};
use crate::sequence::discover::{ImageSequence, discover_sequences};

const ISO_SECONDS: &str = "%Y-%m-%dT%H:%M:%S";

/// Command-line level inputs of one invocation.
#[derive(Clone, Debug, Default)]
pub struct InvocationRequest {
    /// Directory, frame file or sequence pattern.
    pub input: PathBuf,
    pub codec: Option<String>,
    pub profile: Option<String>,
    /// Output directory overriding the configured movie location.
    pub output: Option<PathBuf>,
    /// `"key: value | key2: value2"` text element values.
    pub text: Option<String>,
    pub color_transform: Option<String>,
    /// Write stills instead of a movie and log at debug level.
    pub debug: bool,
    /// Explicit configuration file.
    pub config: Option<PathBuf>,
}

/// Outcome of one discovered sequence.
#[derive(Debug)]
pub struct SequenceReport {
    pub sequence: String,
    /// `None` when the run failed before its output path was resolved.
    pub movie_path: Option<PathBuf>,
    pub outcome: DailiesResult<RenderStats>,
}

impl SequenceReport {
    /// The run failed, or finished degraded.
    pub fn is_failure(&self) -> bool {
        match &self.outcome {
            Ok(stats) => stats.degraded,
            Err(_) => true,
        }
    }
}

/// Locate and load the configuration, then render every sequence found at the input.
pub fn run_invocation(request: &InvocationRequest) -> DailiesResult<Vec<SequenceReport>> {
    let path = DailiesConfig::locate(request.config.as_deref())?;
    tracing::debug!(config = %path.display(), "loading configuration");
    let config = DailiesConfig::from_path(&path)?;
    run_with_config(&config, request, Local::now())
}

/// Render every sequence found at the input with an already loaded configuration.
///
/// Codec, profile and color transform are checked before discovery. A sequence that fails is
/// reported and the remaining sequences still render.
pub fn run_with_config(
    config: &DailiesConfig,
    request: &InvocationRequest,
    now: DateTime<Local>,
) -> DailiesResult<Vec<SequenceReport>> {
    let codec_key = select_codec_key(config, request.codec.as_deref());
    config.codec(&codec_key)?;
    let profile = select_profile(config, request.profile.as_deref())?;
    let color = select_color_transform(config, request.color_transform.as_deref())?;
    let values = text_values(request.text.as_deref(), profile, now);

    let sequences = discover_sequences(&request.input, &config.allowed_extensions())?;
    tracing::info!(
        count = sequences.len(),
        input = %request.input.display(),
        "found image sequences"
    );

    let run_request = RunRequest {
        codec_key: &codec_key,
        output_dir: request.output.as_deref(),
        debug: request.debug,
    };
    let job = Job {
        config,
        request: &run_request,
        profile,
        values: &values,
        color: &color,
    };
    Ok(sequences.iter().map(|seq| job.render(seq)).collect())
}

/// `--codec`, else `globals.output_codec`, else the built-in default.
pub fn select_codec_key(config: &DailiesConfig, requested: Option<&str>) -> String {
    requested
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| non_empty(&config.globals.output_codec))
        .unwrap_or_else(|| DEFAULT_CODEC.to_string())
}

/// An explicitly requested profile must exist. An implicit default that is missing renders
/// without overlays.
pub fn select_profile<'c>(
    config: &'c DailiesConfig,
    requested: Option<&str>,
) -> DailiesResult<Option<&'c DailiesProfile>> {
    if let Some(name) = requested.map(str::trim).filter(|s| !s.is_empty()) {
        return config.dailies_profile(name).map(Some);
    }
    let name = non_empty(&config.globals.dailies_profile)
        .unwrap_or_else(|| DEFAULT_DAILIES_PROFILE.to_string());
    match config.dailies_profiles.get(&name) {
        Some(profile) => Ok(Some(profile)),
        None => {
            tracing::warn!(profile = %name, "dailies profile not found, rendering without overlays");
            Ok(None)
        }
    }
}

/// Text element values for the run: parsed overrides plus the render `datetime`.
pub fn text_values(
    overrides: Option<&str>,
    profile: Option<&DailiesProfile>,
    now: DateTime<Local>,
) -> BTreeMap<String, String> {
    let mut values = overrides.map(parse_text_overrides).unwrap_or_default();
    let format = profile
        .and_then(|p| p.text_elements.get(DATETIME))
        .and_then(|e| non_empty(&e.datetime_format));
    values.insert(DATETIME.to_string(), format_datetime(now, format.as_deref()));
    values
}

/// strftime-format `now`; an invalid format falls back to ISO-8601 with seconds.
pub fn format_datetime(now: DateTime<Local>, format: Option<&str>) -> String {
    if let Some(format) = format {
        let mut out = String::new();
        if write!(out, "{}", now.format(format)).is_ok() {
            return out;
        }
        tracing::warn!(format, "invalid datetime_format, using ISO-8601");
    }
    now.format(ISO_SECONDS).to_string()
}

/// Invocation-wide state shared by every sequence run.
struct Job<'a> {
    config: &'a DailiesConfig,
    request: &'a RunRequest<'a>,
    profile: Option<&'a DailiesProfile>,
    values: &'a BTreeMap<String, String>,
    color: &'a ColorTransform,
}

impl Job<'_> {
    fn render(&self, seq: &ImageSequence) -> SequenceReport {
        let name = seq.display_name();
        let settings = match resolve_run(self.config, self.request, seq) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(sequence = %name, error = %e, "skipping sequence");
                return SequenceReport {
                    sequence: name,
                    movie_path: None,
                    outcome: Err(e),
                };
            }
        };

        let outcome = match RunLog::create(&settings.log_path(), settings.verbose) {
            Ok(log) => log.in_scope(|| self.render_with(seq, &settings)),
            Err(e) => {
                tracing::warn!(error = %e, "per-run log unavailable");
                self.render_with(seq, &settings)
            }
        };
        SequenceReport {
            sequence: name,
            movie_path: Some(settings.movie_path),
            outcome,
        }
    }

    fn render_with(&self, seq: &ImageSequence, settings: &RunSettings) -> DailiesResult<RenderStats> {
        tracing::info!(
            sequence = %seq.display_name(),
            frames = seq.len(),
            movie = %settings.movie_path.display(),
            codec = %settings.codec_name,
            resolution = %settings.resolution,
            "rendering sequence"
        );
        let outcome = self.render_frames(seq, settings);
        match &outcome {
            Ok(stats) if stats.degraded => {
                tracing::warn!(movie = %settings.movie_path.display(), "movie finished degraded")
            }
            Ok(_) => tracing::info!(movie = %settings.movie_path.display(), "movie finished"),
            Err(e) => tracing::error!(error = %e, "sequence failed"),
        }
        outcome
    }

    fn render_frames(
        &self,
        seq: &ImageSequence,
        settings: &RunSettings,
    ) -> DailiesResult<RenderStats> {
        let mut overlay = OverlayCompositor::prepare(self.profile, self.values, settings.resolution)?;
        let mut engine = TransferCurveEngine::new();
        let mut sink = sink_for_run(settings);
        let ctx = RunContext {
            sequence: seq,
            settings,
            color: self.color,
        };
        run_sequence(&ctx, &mut engine, &mut overlay, sink.as_mut())
    }
}

/// Exit status for a finished invocation: non-zero when any sequence failed.
pub fn exit_code(reports: &[SequenceReport]) -> i32 {
    i32::from(reports.iter().any(SequenceReport::is_failure))
}

#[cfg(test)]
#[path = "../tests/unit/session.rs"]
mod tests;
