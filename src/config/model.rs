use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};

use crate::foundation::core::ColorRgba;
use crate::foundation::error::{DailiesError, DailiesResult};
use crate::render::frame::ResizeFilter;

/// Environment variable overriding the configuration file location.
pub const CONFIG_ENV_VAR: &str = "DAILIES_CONFIG";
/// File name searched beside the executable and in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "dailies-config.json";
/// Codec used when neither the command line nor `globals.output_codec` names one.
pub const DEFAULT_CODEC: &str = "avchq";
/// Dailies profile used when neither the command line nor `globals.dailies_profile` names one.
pub const DEFAULT_DAILIES_PROFILE: &str = "delivery";
/// Frame rate used when no configuration layer sets one.
pub const DEFAULT_FRAMERATE: f64 = 24.0;

const ALLOWED_BITDEPTHS: [u8; 4] = [8, 10, 12, 16];

/// Whole configuration document: globals, dailies profiles, codec profiles, color profiles.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct DailiesConfig {
    pub globals: GlobalsConfig,
    pub dailies_profiles: BTreeMap<String, DailiesProfile>,
    pub output_codecs: BTreeMap<String, CodecProfile>,
    pub ocio_profiles: BTreeMap<String, OcioProfile>,
}

/// Settings shared by `globals` and codec profiles. A codec profile's non-empty value wins.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    #[serde(deserialize_with = "optional_dimension")]
    pub width: Option<u32>,
    #[serde(deserialize_with = "optional_dimension")]
    pub height: Option<u32>,
    pub fit: Option<bool>,
    pub cropwidth: Option<CropAmount>,
    pub cropheight: Option<CropAmount>,
    pub filter: Option<String>,
    #[serde(deserialize_with = "optional_number")]
    pub framerate: Option<f64>,
    pub movie_location: Option<String>,
    pub movie_ext: Option<String>,
    pub movie_append_codec: Option<bool>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct GlobalsConfig {
    /// Color-management config file path. Falls back to `$OCIO`.
    pub ocioconfig: Option<String>,
    /// Name of the `ocio_profiles` entry used when none is requested.
    pub ocio_default_transform: Option<String>,
    /// Allowed input extensions (without the dot). Empty means `["exr"]`.
    pub input_image_formats: Vec<String>,
    pub output_codec: Option<String>,
    pub dailies_profile: Option<String>,
    /// Raise the per-run log level to debug.
    pub debug: bool,
    #[serde(flatten)]
    pub output: OutputSettings,
}

/// One encoder profile under `output_codecs`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct CodecProfile {
    /// Codec name used for movie naming and the JPEG-container special case.
    pub name: Option<String>,
    pub bitdepth: Option<u8>,
    pub codec: Option<ParamValue>,
    pub profile: Option<ParamValue>,
    pub qscale: Option<ParamValue>,
    pub preset: Option<ParamValue>,
    pub keyint: Option<ParamValue>,
    pub bframes: Option<ParamValue>,
    pub tune: Option<ParamValue>,
    pub crf: Option<ParamValue>,
    pub pix_fmt: Option<ParamValue>,
    pub vf: Option<ParamValue>,
    pub vendor: Option<ParamValue>,
    pub metadata_s: Option<ParamValue>,
    pub bitrate: Option<ParamValue>,
    #[serde(flatten)]
    pub overrides: OutputSettings,
}

impl CodecProfile {
    pub fn bitdepth(&self) -> u8 {
        self.bitdepth.unwrap_or(8)
    }
}

/// Scalar encoder parameter as written in the config (`crf: 13`, `bitrate: "5M"`).
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Empty strings count as unset; numbers are always concrete.
    pub fn is_set(&self) -> bool {
        match self {
            Self::Text(s) => !s.trim().is_empty(),
            Self::Int(_) | Self::Float(_) => true,
        }
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v.trim()),
        }
    }
}

/// Text style fields that a text element inherits from its profile when unset.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TextStyle {
    /// Font file path.
    pub font: Option<String>,
    /// Font size as a fraction of output width.
    pub font_size: Option<f64>,
    pub font_color: Option<ColorRgba>,
    pub justify: Option<String>,
    /// Inter-line spacing as a fraction of font size.
    pub leading: Option<f64>,
}

impl TextStyle {
    /// Fill every unset (or empty) field from `parent`.
    pub fn inherit(&self, parent: &TextStyle) -> TextStyle {
        TextStyle {
            font: non_empty(&self.font).or_else(|| non_empty(&parent.font)),
            font_size: self.font_size.or(parent.font_size),
            font_color: self.font_color.or(parent.font_color),
            justify: non_empty(&self.justify).or_else(|| non_empty(&parent.justify)),
            leading: self.leading.or(parent.leading),
        }
    }
}

/// One entry of a profile's `text_elements`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TextElementConfig {
    #[serde(flatten)]
    pub style: TextStyle,
    /// `[left, bottom, right, top]` as fractions of the frame, lower-left origin.
    #[serde(rename = "box")]
    pub bbox: Option<[f64; 4]>,
    pub prefix: Option<String>,
    /// Zero-padding width of the frame counter.
    pub padding: Option<usize>,
    /// strftime format of the `datetime` element.
    pub datetime_format: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CropmaskConfig {
    pub enable: bool,
    /// Aspect ratio of the unmasked area.
    pub aspect: Option<f64>,
    /// Opacity of the mask bars.
    pub opacity: Option<f32>,
}

/// One entry of `dailies_profiles`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DailiesProfile {
    #[serde(flatten)]
    pub style: TextStyle,
    pub text_elements: BTreeMap<String, TextElementConfig>,
    pub cropmask: Option<CropmaskConfig>,
}

/// One entry of `ocio_profiles`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct OcioProfile {
    /// `[source colorspace, destination colorspace]`.
    pub ociocolorconvert: [String; 2],
}

/// Edge crop given in pixels or as a percentage of the input extent (`"10%"`).
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(try_from = "CropAmountRepr")]
pub enum CropAmount {
    Pixels(u32),
    Percent(f64),
}

impl CropAmount {
    pub fn is_zero(self) -> bool {
        match self {
            Self::Pixels(px) => px == 0,
            Self::Percent(p) => p == 0.0,
        }
    }

    /// Total pixels to remove from an axis of `extent` pixels.
    pub fn pixels_of(self, extent: u32) -> u32 {
        let px = match self {
            Self::Pixels(px) => px,
            Self::Percent(p) => (p / 100.0 * f64::from(extent)) as u32,
        };
        px.min(extent.saturating_sub(1))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CropAmountRepr {
    Pixels(u32),
    Text(String),
}

impl TryFrom<CropAmountRepr> for CropAmount {
    type Error = String;

    fn try_from(repr: CropAmountRepr) -> Result<Self, Self::Error> {
        match repr {
            CropAmountRepr::Pixels(px) => Ok(Self::Pixels(px)),
            CropAmountRepr::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return Ok(Self::Pixels(0));
                }
                let parsed = match s.strip_suffix('%') {
                    Some(pct) => pct.trim().parse::<f64>().map(Self::Percent),
                    None => s.parse::<f64>().map(|px| Self::Pixels(px.max(0.0) as u32)),
                };
                match parsed {
                    Ok(Self::Percent(p)) if !(0.0..100.0).contains(&p) => {
                        Err(format!("crop percentage out of range: '{s}'"))
                    }
                    Ok(v) => Ok(v),
                    Err(_) => Err(format!("invalid crop amount '{s}'")),
                }
            }
        }
    }
}

/// A number, or a string holding one. Blank strings mean unset.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberRepr {
    Number(f64),
    Text(String),
}

fn optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberRepr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberRepr::Number(v)) => Ok(Some(v)),
        Some(NumberRepr::Text(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            s.parse::<f64>()
                .map(Some)
                .map_err(|_| serde::de::Error::custom(format!("expected a number, got '{s}'")))
        }
    }
}

fn optional_dimension<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(v) = optional_number(deserializer)? else {
        return Ok(None);
    };
    if v.fract() != 0.0 || !(0.0..=f64::from(u32::MAX)).contains(&v) {
        return Err(serde::de::Error::custom(format!(
            "expected a whole number of pixels, got {v}"
        )));
    }
    Ok(Some(v as u32))
}

impl DailiesConfig {
    /// Find the configuration file: explicit path, then `$DAILIES_CONFIG`, then beside the
    /// executable, then the working directory.
    pub fn locate(explicit: Option<&Path>) -> DailiesResult<PathBuf> {
        if let Some(p) = explicit {
            return Ok(p.to_path_buf());
        }
        if let Some(p) = std::env::var_os(CONFIG_ENV_VAR).filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(p));
        }
        let beside_exe = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_CONFIG_FILE)));
        if let Some(p) = beside_exe.filter(|p| p.is_file()) {
            return Ok(p);
        }
        Ok(PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Read, parse and validate a configuration file.
    pub fn from_path(path: &Path) -> DailiesResult<Self> {
        if !path.is_file() {
            return Err(DailiesError::configuration(format!(
                "could not find config file '{}'",
                path.display()
            )));
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            DailiesError::configuration(format!(
                "could not read config file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_json_str(&text).map_err(|e| match e {
            DailiesError::Configuration(msg) => {
                DailiesError::configuration(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    pub fn from_json_str(text: &str) -> DailiesResult<Self> {
        let cfg: Self = serde_json::from_str(text)
            .map_err(|e| DailiesError::configuration(format!("invalid config document: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Single validation pass over every section.
    pub fn validate(&self) -> DailiesResult<()> {
        validate_output_settings("globals", &self.globals.output)?;

        for (key, codec) in &self.output_codecs {
            let scope = format!("output_codecs.{key}");
            validate_output_settings(&scope, &codec.overrides)?;
            if let Some(depth) = codec.bitdepth
                && !ALLOWED_BITDEPTHS.contains(&depth)
            {
                return Err(DailiesError::configuration(format!(
                    "{scope}.bitdepth must be one of {ALLOWED_BITDEPTHS:?}, got {depth}"
                )));
            }
        }

        for (key, profile) in &self.dailies_profiles {
            let scope = format!("dailies_profiles.{key}");
            validate_style(&scope, &profile.style)?;
            for (name, element) in &profile.text_elements {
                let scope = format!("{scope}.text_elements.{name}");
                validate_style(&scope, &element.style)?;
                if let Some(b) = element.bbox
                    && b.iter().any(|v| !v.is_finite())
                {
                    return Err(DailiesError::configuration(format!(
                        "{scope}.box must contain finite numbers"
                    )));
                }
            }
            if let Some(mask) = profile.cropmask.as_ref().filter(|m| m.enable) {
                let aspect_ok = mask.aspect.is_some_and(|a| a.is_finite() && a > 0.0);
                let opacity_ok = mask
                    .opacity
                    .is_some_and(|o| o.is_finite() && (0.0..=1.0).contains(&o) && o > 0.0);
                if !aspect_ok || !opacity_ok {
                    return Err(DailiesError::configuration(format!(
                        "{scope}.cropmask is enabled but aspect/opacity are missing or invalid"
                    )));
                }
            }
        }

        for (key, profile) in &self.ocio_profiles {
            if profile.ociocolorconvert.iter().any(|s| s.trim().is_empty()) {
                return Err(DailiesError::configuration(format!(
                    "ocio_profiles.{key}.ociocolorconvert must name two colorspaces"
                )));
            }
        }

        Ok(())
    }

    /// Look up a codec profile by key.
    pub fn codec(&self, key: &str) -> DailiesResult<&CodecProfile> {
        self.output_codecs.get(key).ok_or_else(|| {
            DailiesError::configuration(format!(
                "invalid codec '{key}'. Possible options are: {}",
                join_keys(&self.output_codecs)
            ))
        })
    }

    /// Look up a dailies profile by key.
    pub fn dailies_profile(&self, key: &str) -> DailiesResult<&DailiesProfile> {
        self.dailies_profiles.get(key).ok_or_else(|| {
            DailiesError::configuration(format!(
                "invalid dailies profile '{key}'. Possible options are: {}",
                join_keys(&self.dailies_profiles)
            ))
        })
    }

    /// Lower-cased allowed input extensions; `exr` when unconfigured.
    pub fn allowed_extensions(&self) -> Vec<String> {
        let exts: Vec<String> = self
            .globals
            .input_image_formats
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        if exts.is_empty() {
            vec!["exr".to_string()]
        } else {
            exts
        }
    }
}

pub(crate) fn join_keys<V>(map: &BTreeMap<String, V>) -> String {
    map.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
}

pub(crate) fn non_empty(s: &Option<String>) -> Option<String> {
    s.as_ref()
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.to_string())
}

fn validate_output_settings(scope: &str, s: &OutputSettings) -> DailiesResult<()> {
    if let Some(fps) = s.framerate
        && fps != 0.0
        && (!fps.is_finite() || fps < 0.0)
    {
        return Err(DailiesError::configuration(format!(
            "{scope}.framerate must be positive, got {fps}"
        )));
    }
    if let Some(name) = non_empty(&s.filter)
        && ResizeFilter::from_name(&name).is_none()
    {
        return Err(DailiesError::configuration(format!(
            "{scope}.filter '{name}' is not a known resize filter ({})",
            ResizeFilter::NAMES.join(", ")
        )));
    }
    if let Some(ext) = non_empty(&s.movie_ext)
        && ext.contains(['/', '\\'])
    {
        return Err(DailiesError::configuration(format!(
            "{scope}.movie_ext must be a bare extension, got '{ext}'"
        )));
    }
    Ok(())
}

fn validate_style(scope: &str, style: &TextStyle) -> DailiesResult<()> {
    if let Some(size) = style.font_size
        && (!size.is_finite() || size < 0.0)
    {
        return Err(DailiesError::configuration(format!(
            "{scope}.font_size must be a non-negative fraction of width"
        )));
    }
    if let Some(color) = style.font_color
        && !color.is_valid()
    {
        return Err(DailiesError::configuration(format!(
            "{scope}.font_color channels must be within 0..1"
        )));
    }
    if let Some(leading) = style.leading
        && !leading.is_finite()
    {
        return Err(DailiesError::configuration(format!(
            "{scope}.leading must be finite"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/config/model.rs"]
mod tests;
