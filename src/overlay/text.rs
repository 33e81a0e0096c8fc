use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::foundation::core::ColorRgba;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
pub struct TextBrushRgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl From<ColorRgba> for TextBrushRgba8 {
    fn from(c: ColorRgba) -> Self {
        let [r, g, b, a] = c.to_rgba8();
        Self { r, g, b, a }
    }
}

pub type TextLayout = parley::Layout<TextBrushRgba8>;

struct LoadedFont {
    family: String,
    data: vello_cpu::peniko::FontData,
}

/// Shapes single-line text with fonts loaded from disk and draws it into a `vello_cpu` context.
///
/// Fonts are read and registered once per path.
pub struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    fonts: HashMap<PathBuf, LoadedFont>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            fonts: HashMap::new(),
        }
    }

    fn font(&mut self, path: &Path) -> Result<&LoadedFont, String> {
        if !self.fonts.contains_key(path) {
            let bytes = std::fs::read(path)
                .map_err(|e| format!("failed to read font '{}': {e}", path.display()))?;
            let families = self
                .font_ctx
                .collection
                .register_fonts(parley::fontique::Blob::from(bytes.clone()), None);
            let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
                format!("no font families registered from '{}'", path.display())
            })?;
            let family = self
                .font_ctx
                .collection
                .family_name(family_id)
                .ok_or_else(|| format!("font '{}' has no family name", path.display()))?
                .to_string();
            let data = vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(bytes), 0);
            self.fonts
                .insert(path.to_path_buf(), LoadedFont { family, data });
        }
        self.fonts
            .get(path)
            .ok_or_else(|| format!("font '{}' was not loaded", path.display()))
    }

    /// Lay out `text` on a single line.
    pub fn layout(
        &mut self,
        text: &str,
        font: &Path,
        size_px: f32,
        brush: TextBrushRgba8,
    ) -> Result<TextLayout, String> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(format!("font size must be finite and > 0, got {size_px}"));
        }
        let family = self.font(font)?.family.clone();

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: TextLayout = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }

    /// Width and height of `text` laid out on one line.
    pub fn measure(&mut self, text: &str, font: &Path, size_px: f32) -> Result<(f32, f32), String> {
        let layout = self.layout(text, font, size_px, TextBrushRgba8::default())?;
        Ok((layout.width(), layout.height()))
    }

    /// Fill the glyphs of `layout` with its brush, the layout's top-left corner at `origin`.
    pub fn draw(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        layout: &TextLayout,
        font: &Path,
        origin: (f32, f32),
    ) -> Result<(), String> {
        let font = self.font(font)?.data.clone();
        ctx.set_transform(vello_cpu::kurbo::Affine::translate((
            f64::from(origin.0),
            f64::from(origin.1),
        )));
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };

                let brush = run.style().brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));

                let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/text.rs"]
mod tests;
