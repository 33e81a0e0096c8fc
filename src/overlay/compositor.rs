use std::collections::BTreeMap;

use image::Rgb32FImage;

use crate::config::model::{CropmaskConfig, DailiesProfile};
use crate::foundation::core::Resolution;
use crate::foundation::error::{DailiesError, DailiesResult};
use crate::foundation::math::mul_div255_u8;
use crate::overlay::layout::{ResolvedTextElement, line_origins, wrap_lines};
use crate::overlay::text::{TextBrushRgba8, TextLayoutEngine};

pub type PremulRgba8 = [u8; 4];

/// Source-over for premultiplied RGBA8.
pub fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    if src[3] == 0 {
        return dst;
    }
    if src[3] == 255 {
        return src;
    }
    let inv = 255u16 - u16::from(src[3]);
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = src[i].saturating_add(mul_div255_u8(u16::from(dst[i]), inv));
    }
    out
}

pub fn over_in_place(dst: &mut [u8], src: &[u8]) -> Result<(), String> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err("over_in_place expects equal-length rgba8 buffers".to_string());
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]]);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Blend a premultiplied RGBA8 overlay onto opaque float RGB pixels.
pub fn composite_onto(frame: &mut Rgb32FImage, overlay: &[u8]) -> Result<(), String> {
    let expected = frame.as_raw().len() / 3 * 4;
    if overlay.len() != expected {
        return Err(format!(
            "overlay has {} bytes, frame {}x{} needs {expected}",
            overlay.len(),
            frame.width(),
            frame.height()
        ));
    }
    for (px, o) in frame.pixels_mut().zip(overlay.chunks_exact(4)) {
        if o[3] == 0 {
            continue;
        }
        let inv = 1.0 - f32::from(o[3]) / 255.0;
        for c in 0..3 {
            px.0[c] = f32::from(o[c]) / 255.0 + px.0[c] * inv;
        }
    }
    Ok(())
}

/// Per-run overlay state.
///
/// Cropmask bars and every text element except the frame counter are rendered once into a
/// static layer. The frame counter is drawn per frame onto a copy of that layer.
pub struct OverlayCompositor {
    width: u16,
    height: u16,
    engine: TextLayoutEngine,
    static_layer: Vec<u8>,
    static_is_empty: bool,
    frame_counter: Option<ResolvedTextElement>,
    scratch: Vec<u8>,
}

impl OverlayCompositor {
    /// Build the static layer for `profile` at `res`.
    ///
    /// Elements that cannot be resolved or drawn are logged and skipped, as are elements
    /// without a value in `values`.
    pub fn prepare(
        profile: Option<&DailiesProfile>,
        values: &BTreeMap<String, String>,
        res: Resolution,
    ) -> DailiesResult<Self> {
        let too_large = || {
            DailiesError::Other(anyhow::anyhow!(
                "output resolution {res} exceeds the overlay limit of 65535 pixels"
            ))
        };
        let width: u16 = res.width.try_into().map_err(|_| too_large())?;
        let height: u16 = res.height.try_into().map_err(|_| too_large())?;

        let mut engine = TextLayoutEngine::new();
        let mut ctx = vello_cpu::RenderContext::new(width, height);
        let mut frame_counter = None;

        if let Some(profile) = profile {
            if let Some(mask) = profile.cropmask.as_ref().filter(|m| m.enable) {
                draw_cropmask(&mut ctx, mask, res);
            }

            for (name, cfg) in &profile.text_elements {
                let element = match ResolvedTextElement::resolve(name, cfg, &profile.style, res) {
                    Ok(e) => e,
                    Err(e) => {
                        tracing::error!(element = %name, error = %e, "skipping text element");
                        continue;
                    }
                };
                if element.is_frame_counter() {
                    frame_counter = Some(element);
                    continue;
                }
                let Some(text) = element.content(values) else {
                    tracing::warn!(element = %name, "no text specified for text element");
                    continue;
                };
                tracing::debug!(element = %name, text = %text, "rendering text element");
                if let Err(e) = draw_element(&mut engine, &mut ctx, &element, &text) {
                    tracing::error!(element = %name, error = %e, "failed to render text element");
                }
            }
        }

        let static_layer = render_layer(&mut ctx, width, height);
        let static_is_empty = static_layer.chunks_exact(4).all(|px| px[3] == 0);
        Ok(Self {
            width,
            height,
            engine,
            static_is_empty,
            scratch: Vec::with_capacity(static_layer.len()),
            static_layer,
            frame_counter,
        })
    }

    /// Premultiplied RGBA8 static layer.
    pub fn static_layer(&self) -> &[u8] {
        &self.static_layer
    }

    pub fn has_frame_counter(&self) -> bool {
        self.frame_counter.is_some()
    }

    /// Overlay for source frame `frame`: the static layer, plus the frame counter if any.
    pub fn frame_overlay(&mut self, frame: i64) -> Result<&[u8], String> {
        let Some(counter) = self.frame_counter.as_ref() else {
            return Ok(&self.static_layer);
        };
        let mut ctx = vello_cpu::RenderContext::new(self.width, self.height);
        draw_element(&mut self.engine, &mut ctx, counter, &counter.counter_content(frame))?;
        let counter_layer = render_layer(&mut ctx, self.width, self.height);

        self.scratch.clear();
        self.scratch.extend_from_slice(&self.static_layer);
        over_in_place(&mut self.scratch, &counter_layer)?;
        Ok(&self.scratch)
    }

    /// Composite the overlay for source frame `frame` onto `pixels`.
    pub fn apply(&mut self, pixels: &mut Rgb32FImage, frame: i64) -> Result<(), String> {
        if pixels.dimensions() != (u32::from(self.width), u32::from(self.height)) {
            return Err(format!(
                "frame is {}x{} but the overlay is {}x{}",
                pixels.width(),
                pixels.height(),
                self.width,
                self.height
            ));
        }
        if self.static_is_empty && self.frame_counter.is_none() {
            return Ok(());
        }
        let overlay = self.frame_overlay(frame)?;
        composite_onto(pixels, overlay)
    }
}

/// Height in pixels of each of the two bars masking outside `aspect`; zero when the frame is
/// already wider than the mask.
pub fn cropmask_bar_height(aspect: f64, res: Resolution) -> u32 {
    let visible = (f64::from(res.width) / aspect).round();
    ((f64::from(res.height) - visible) / 2.0).max(0.0) as u32
}

fn draw_cropmask(ctx: &mut vello_cpu::RenderContext, mask: &CropmaskConfig, res: Resolution) {
    let (Some(aspect), Some(opacity)) = (mask.aspect, mask.opacity) else {
        tracing::error!("cropmask enabled without aspect and opacity, skipping");
        return;
    };
    let bar = cropmask_bar_height(aspect, res);
    tracing::debug!(aspect, bar, "cropmask");
    if bar == 0 {
        return;
    }
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    let (w, h, bar) = (f64::from(res.width), f64::from(res.height), f64::from(bar));
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(0, 0, 0, alpha));
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, w, bar));
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, h - bar, w, h));
}

/// Wrap `text` to the element's box and draw its lines bottom-to-top.
fn draw_element(
    engine: &mut TextLayoutEngine,
    ctx: &mut vello_cpu::RenderContext,
    element: &ResolvedTextElement,
    text: &str,
) -> Result<(), String> {
    let (_, text_height) = engine.measure(text, &element.font, element.font_px)?;
    let box_width = element.bbox.width() as f32;
    let lines = wrap_lines(text, box_width, |s| {
        engine
            .measure(s, &element.font, element.font_px)
            .map_or(f32::INFINITY, |(w, _)| w)
    });

    let brush = TextBrushRgba8::from(element.color);
    let layouts = lines
        .iter()
        .map(|line| engine.layout(line, &element.font, element.font_px, brush))
        .collect::<Result<Vec<_>, _>>()?;
    let widths: Vec<f32> = layouts.iter().map(|l| l.width()).collect();
    let origins = line_origins(element, &widths, text_height, text_height);

    for (layout, origin) in layouts.iter().zip(origins) {
        engine.draw(ctx, layout, &element.font, origin)?;
    }
    Ok(())
}

fn render_layer(ctx: &mut vello_cpu::RenderContext, width: u16, height: u16) -> Vec<u8> {
    let mut pixmap = vello_cpu::Pixmap::new(width, height);
    ctx.flush();
    ctx.render_to_pixmap(&mut pixmap);
    pixmap.data_as_u8_slice().to_vec()
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/compositor.rs"]
mod tests;
