use std::path::{Path, PathBuf};

use image::Rgb32FImage;

/// Color-management engine consulted by the frame pipeline.
///
/// The config file is process-wide state applied once per run, before the first conversion.
/// Failures are reported as plain error strings; the pipeline turns them into frame errors.
pub trait ColorEngine: Send {
    fn set_config(&mut self, config: Option<&Path>) -> Result<(), String>;

    /// Convert `pixels` in place from colorspace `source` to `destination`.
    fn convert(&self, pixels: &mut Rgb32FImage, source: &str, destination: &str)
    -> Result<(), String>;
}

/// Transfer curve of a display or scene colorspace. Primaries are not converted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferCurve {
    Linear,
    Srgb,
    Rec709,
    Gamma22,
    Gamma24,
    /// Pass-through; data is not color managed.
    Raw,
}

impl TransferCurve {
    /// Resolve a colorspace name, case-insensitively. Spaces, dots and dashes are ignored.
    pub fn from_name(name: &str) -> Option<Self> {
        let key: String = name
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| !matches!(c, ' ' | '.' | '-'))
            .collect();
        Some(match key.as_str() {
            "linear" | "scene_linear" | "lin" | "linsrgb" | "lin_srgb" | "linrec709"
            | "lin_rec709" | "scenelinear" => Self::Linear,
            "srgb" | "srgb_texture" | "srgbdisplay" | "srgb_display" | "color_picking" => {
                Self::Srgb
            }
            "rec709" | "bt709" | "rec709_display" | "rec709display" => Self::Rec709,
            "gamma22" | "g22" | "gamma22_rec709" => Self::Gamma22,
            "gamma24" | "g24" | "bt1886" | "rec1886" => Self::Gamma24,
            "raw" | "data" | "none" | "passthrough" => Self::Raw,
            _ => return None,
        })
    }

    /// Curve-encoded value to linear light.
    pub fn decode(self, v: f32) -> f32 {
        match self {
            Self::Linear | Self::Raw => v,
            Self::Srgb => {
                if v <= 0.040_45 {
                    v / 12.92
                } else {
                    ((v + 0.055) / 1.055).powf(2.4)
                }
            }
            Self::Rec709 => {
                if v < 0.081 {
                    v / 4.5
                } else {
                    ((v + 0.099) / 1.099).powf(1.0 / 0.45)
                }
            }
            Self::Gamma22 => v.max(0.0).powf(2.2),
            Self::Gamma24 => v.max(0.0).powf(2.4),
        }
    }

    /// Linear light to curve-encoded value.
    pub fn encode(self, v: f32) -> f32 {
        match self {
            Self::Linear | Self::Raw => v,
            Self::Srgb => {
                let v = v.max(0.0);
                if v <= 0.003_130_8 {
                    v * 12.92
                } else {
                    1.055 * v.powf(1.0 / 2.4) - 0.055
                }
            }
            Self::Rec709 => {
                let v = v.max(0.0);
                if v < 0.018 {
                    v * 4.5
                } else {
                    1.099 * v.powf(0.45) - 0.099
                }
            }
            Self::Gamma22 => v.max(0.0).powf(1.0 / 2.2),
            Self::Gamma24 => v.max(0.0).powf(1.0 / 2.4),
        }
    }
}

/// Built-in engine: converts between transfer curves named by [`TransferCurve::from_name`].
#[derive(Debug, Default)]
pub struct TransferCurveEngine {
    config: Option<PathBuf>,
}

impl TransferCurveEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> Option<&Path> {
        self.config.as_deref()
    }
}

impl ColorEngine for TransferCurveEngine {
    fn set_config(&mut self, config: Option<&Path>) -> Result<(), String> {
        if let Some(path) = config
            && !path.is_file()
        {
            return Err(format!("color config '{}' is not a file", path.display()));
        }
        self.config = config.map(Path::to_path_buf);
        Ok(())
    }

    fn convert(
        &self,
        pixels: &mut Rgb32FImage,
        source: &str,
        destination: &str,
    ) -> Result<(), String> {
        let src = TransferCurve::from_name(source)
            .ok_or_else(|| format!("unknown source colorspace '{source}'"))?;
        let dst = TransferCurve::from_name(destination)
            .ok_or_else(|| format!("unknown destination colorspace '{destination}'"))?;
        if src == dst || src == TransferCurve::Raw || dst == TransferCurve::Raw {
            return Ok(());
        }
        for px in pixels.pixels_mut() {
            for c in px.0.iter_mut() {
                let v = dst.encode(src.decode(*c));
                *c = if v.is_finite() { v } else { 0.0 };
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/color/engine.rs"]
mod tests;
