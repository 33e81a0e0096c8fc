use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::model::{TextElementConfig, TextStyle, non_empty};
use crate::foundation::core::{ColorRgba, Resolution};

/// Name of the element re-rendered on every frame with the frame number.
pub const FRAME_COUNTER: &str = "framecounter";
/// Name of the element whose value is the render date and time.
pub const DATETIME: &str = "datetime";

/// Horizontal placement of each line inside its box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Justify {
    #[default]
    Left,
    Center,
}

impl Justify {
    /// Anything other than exactly `left` or `center` is treated as `left`.
    pub fn from_name(name: Option<&str>) -> Self {
        match name {
            Some("center") => Self::Center,
            _ => Self::Left,
        }
    }
}

/// Text box in pixel coordinates with an upper-left origin.
///
/// `bottom` is the larger y value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelBox {
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
    pub top: i32,
}

impl PixelBox {
    /// Convert `[left, bottom, right, top]` frame fractions (lower-left origin) to pixels,
    /// flipping y: `pixel_y = height - fraction_y * height`.
    pub fn from_fractions(b: [f64; 4], res: Resolution) -> Self {
        let w = f64::from(res.width);
        let h = f64::from(res.height);
        let left = (b[0] * w) as i32;
        let bottom = (b[1] * h) as i32;
        let right = (b[2] * w) as i32;
        let top = (b[3] * h) as i32;
        Self {
            left,
            bottom: res.height as i32 - bottom,
            right,
            top: res.height as i32 - top,
        }
    }

    pub fn lower_left(self) -> (i32, i32) {
        (self.left, self.bottom)
    }

    pub fn upper_right(self) -> (i32, i32) {
        (self.right, self.top)
    }

    pub fn width(self) -> i32 {
        self.right - self.left
    }
}

/// A text element with every field inherited, converted to pixels and checked.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedTextElement {
    pub name: String,
    pub font: PathBuf,
    /// Font size in pixels.
    pub font_px: f32,
    pub color: ColorRgba,
    pub justify: Justify,
    /// Extra line spacing as a fraction of the font size.
    pub leading: f32,
    pub bbox: PixelBox,
    pub prefix: Option<String>,
    /// Frame counter zero-padding width.
    pub padding: usize,
}

impl ResolvedTextElement {
    /// Inherit unset fields from `profile`, then convert to pixels for `res`.
    ///
    /// Fails on a missing font file or a missing size or box; the caller logs and skips such
    /// elements.
    pub fn resolve(
        name: &str,
        element: &TextElementConfig,
        profile: &TextStyle,
        res: Resolution,
    ) -> Result<Self, String> {
        let style = element.style.inherit(profile);
        let font = style
            .font
            .map(PathBuf::from)
            .ok_or_else(|| format!("text element '{name}' has no font"))?;
        if !font.is_file() {
            return Err(format!(
                "font '{}' for text element '{name}' does not exist",
                font.display()
            ));
        }
        let font_size = style
            .font_size
            .filter(|s| s.is_finite() && *s > 0.0)
            .ok_or_else(|| format!("text element '{name}' has no positive font_size"))?;
        let bbox = element
            .bbox
            .ok_or_else(|| format!("text element '{name}' has no box"))?;

        Ok(Self {
            name: name.to_string(),
            font,
            font_px: (font_size * f64::from(res.width)) as i32 as f32,
            color: style.font_color.unwrap_or(ColorRgba::WHITE),
            justify: Justify::from_name(style.justify.as_deref()),
            leading: style.leading.unwrap_or(0.0) as f32,
            bbox: PixelBox::from_fractions(bbox, res),
            prefix: non_empty(&element.prefix),
            padding: element.padding.unwrap_or(0),
        })
    }

    pub fn is_frame_counter(&self) -> bool {
        self.name == FRAME_COUNTER
    }

    /// The element's text: its value from `values`, after its prefix. `None` when the value
    /// is missing or empty.
    pub fn content(&self, values: &BTreeMap<String, String>) -> Option<String> {
        let value = values.get(&self.name).filter(|v| !v.is_empty())?;
        Some(match &self.prefix {
            Some(prefix) => format!("{prefix}{value}"),
            None => value.clone(),
        })
    }

    /// Frame counter text for source frame `frame`, after the prefix.
    pub fn counter_content(&self, frame: i64) -> String {
        let digits = frame_counter_text(frame, self.padding);
        match &self.prefix {
            Some(prefix) => format!("{prefix}{digits}"),
            None => digits,
        }
    }

    /// Vertical step between line bottoms.
    pub fn line_advance(&self) -> f32 {
        self.font_px + self.font_px * self.leading
    }
}

/// Zero-padded frame counter text, e.g. `7` with width 4 → `0007`.
pub fn frame_counter_text(frame: i64, padding: usize) -> String {
    format!("{frame:0padding$}")
}

/// Greedy word wrap.
///
/// Text that fits stays a single line. Otherwise words are accumulated and a line is closed
/// as soon as adding the next word would exceed `max_width`. Word order is preserved.
pub fn wrap_lines(text: &str, max_width: f32, mut measure: impl FnMut(&str) -> f32) -> Vec<String> {
    if measure(text) <= max_width {
        return vec![text.to_string()];
    }
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{current} {word}");
        if measure(&candidate) > max_width {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Top-left corner of each line's layout, in reading order.
///
/// Lines are placed bottom-to-top: the last line has its bottom at `bbox.bottom + text_height`
/// and each earlier line sits `element.line_advance()` higher. `widths` are the measured line
/// widths in reading order.
pub fn line_origins(
    element: &ResolvedTextElement,
    widths: &[f32],
    line_height: f32,
    text_height: f32,
) -> Vec<(f32, f32)> {
    let mut y_bottom = element.bbox.bottom as f32 + text_height;
    let box_width = element.bbox.width() as f32;
    let mut out = Vec::with_capacity(widths.len());
    for &w in widths.iter().rev() {
        let x = match element.justify {
            Justify::Left => element.bbox.left as f32,
            Justify::Center => element.bbox.left as f32 + (box_width - w) / 2.0,
        };
        out.push((x, y_bottom - line_height));
        y_bottom = (y_bottom - element.line_advance()).trunc();
    }
    out.reverse();
    out
}

/// Parse `"key: value | key2: value2"`. Items without a key are ignored.
pub fn parse_text_overrides(text: &str) -> BTreeMap<String, String> {
    text.split('|')
        .filter_map(|item| {
            let (k, v) = item.split_once(':')?;
            let k = k.trim();
            (!k.is_empty()).then(|| (k.to_string(), v.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/layout.rs"]
mod tests;
