use std::path::PathBuf;

use crate::config::model::{DailiesConfig, join_keys, non_empty};
use crate::foundation::error::{DailiesError, DailiesResult};

/// Source and destination used when no color profile is requested or configured.
pub const DEFAULT_TRANSFORM: (&str, &str) = ("scene_linear", "sRGB");

/// Environment variable naming the color-management config file.
pub const COLOR_CONFIG_ENV_VAR: &str = "OCIO";

/// Concrete color conversion for a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColorTransform {
    pub source: String,
    pub destination: String,
    /// Process-wide engine config, applied once before the first frame.
    pub config_path: Option<PathBuf>,
}

/// Resolve the color transform for a run.
///
/// `requested` wins, then `globals.ocio_default_transform`, then [`DEFAULT_TRANSFORM`]. A name
/// that is not an `ocio_profiles` key is a configuration error listing the valid keys.
pub fn select_color_transform(
    config: &DailiesConfig,
    requested: Option<&str>,
) -> DailiesResult<ColorTransform> {
    let config_path = resolve_color_config(
        config.globals.ocioconfig.as_deref(),
        std::env::var(COLOR_CONFIG_ENV_VAR).ok(),
    );

    let name = requested
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| non_empty(&config.globals.ocio_default_transform));

    let (source, destination) = match name {
        Some(name) => {
            let profile = config.ocio_profiles.get(&name).ok_or_else(|| {
                DailiesError::configuration(format!(
                    "invalid color transform '{name}'. Possible options are: {}",
                    join_keys(&config.ocio_profiles)
                ))
            })?;
            let [src, dst] = &profile.ociocolorconvert;
            (src.clone(), dst.clone())
        }
        None => (
            DEFAULT_TRANSFORM.0.to_string(),
            DEFAULT_TRANSFORM.1.to_string(),
        ),
    };

    tracing::debug!(%source, %destination, config = ?config_path, "selected color transform");
    Ok(ColorTransform {
        source,
        destination,
        config_path,
    })
}

/// Configured path, else the environment value. A path that does not exist is dropped with a
/// warning.
pub fn resolve_color_config(configured: Option<&str>, env: Option<String>) -> Option<PathBuf> {
    let candidate = configured
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .or_else(|| env.filter(|s| !s.trim().is_empty()).map(PathBuf::from))?;
    if candidate.is_file() {
        Some(candidate)
    } else {
        tracing::warn!(
            path = %candidate.display(),
            "color config not found, running without one"
        );
        None
    }
}

#[cfg(test)]
#[path = "../../tests/unit/color/select.rs"]
mod tests;
