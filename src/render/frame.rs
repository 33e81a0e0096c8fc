use std::path::Path;

use image::imageops::{self, FilterType};
use image::{Rgb, Rgb32FImage, RgbImage};

use crate::config::model::CropAmount;
use crate::foundation::core::{Resolution, unit_to_u8};

/// Resize kernel applied when the output size differs from the source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl ResizeFilter {
    /// Canonical config names.
    pub const NAMES: [&'static str; 5] = ["nearest", "triangle", "catmullrom", "gaussian", "lanczos3"];

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.trim().to_ascii_lowercase().as_str() {
            "nearest" | "box" | "point" => Self::Nearest,
            "triangle" | "bilinear" | "linear" => Self::Triangle,
            "catmullrom" | "catmull-rom" | "cubic" | "bicubic" => Self::CatmullRom,
            "gaussian" | "blackman-harris" => Self::Gaussian,
            "lanczos3" | "lanczos" => Self::Lanczos3,
            _ => return None,
        })
    }

    /// Sharper kernel when enlarging, softer anti-aliasing kernel when reducing.
    pub fn for_scale(enlarging: bool) -> Self {
        if enlarging { Self::Lanczos3 } else { Self::Gaussian }
    }

    fn filter_type(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Triangle => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Gaussian => FilterType::Gaussian,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Decode a frame file into float RGB, dropping alpha.
pub fn load_frame(path: &Path) -> Result<Rgb32FImage, String> {
    let img = image::open(path).map_err(|e| format!("failed to read '{}': {e}", path.display()))?;
    Ok(img.into_rgb32f())
}

/// Trim `cropwidth`/`cropheight` symmetrically from the frame edges.
pub fn crop_frame(
    img: Rgb32FImage,
    cropwidth: Option<CropAmount>,
    cropheight: Option<CropAmount>,
) -> Rgb32FImage {
    let (w, h) = img.dimensions();
    let dx = cropwidth.map_or(0, |c| c.pixels_of(w));
    let dy = cropheight.map_or(0, |c| c.pixels_of(h));
    if dx == 0 && dy == 0 {
        return img;
    }
    imageops::crop_imm(&img, dx / 2, dy / 2, w - dx, h - dy).to_image()
}

/// Bring the frame to `target`.
///
/// With `fit` the frame is scaled to the target width keeping its aspect, then centered and
/// either padded with black or cropped to the target height. Without `fit` it is scaled to the
/// exact target size. `filter` overrides the enlarge/reduce default.
pub fn resize_frame(
    img: Rgb32FImage,
    target: Resolution,
    fit: bool,
    filter: Option<ResizeFilter>,
) -> Result<Rgb32FImage, String> {
    let (sw, sh) = img.dimensions();
    if sw == 0 || sh == 0 {
        return Err(format!("cannot resize an empty {sw}x{sh} frame"));
    }
    if (sw, sh) == (target.width, target.height) {
        return Ok(img);
    }

    let (rw, rh) = if fit {
        let scale = f64::from(target.width) / f64::from(sw);
        let h = (f64::from(sh) * scale).round().max(1.0) as u32;
        (target.width, h)
    } else {
        (target.width, target.height)
    };

    let filter = filter.unwrap_or_else(|| ResizeFilter::for_scale(rw > sw || rh > sh));
    tracing::trace!(from = %format!("{sw}x{sh}"), to = %format!("{rw}x{rh}"), ?filter, "resize");
    let resized = if (rw, rh) == (sw, sh) {
        img
    } else {
        imageops::resize(&img, rw, rh, filter.filter_type())
    };

    if rh == target.height {
        return Ok(resized);
    }
    if rh < target.height {
        let mut canvas = Rgb32FImage::from_pixel(target.width, target.height, Rgb([0.0; 3]));
        let top = i64::from((target.height - rh) / 2);
        imageops::replace(&mut canvas, &resized, 0, top);
        Ok(canvas)
    } else {
        let top = (rh - target.height) / 2;
        Ok(imageops::crop_imm(&resized, 0, top, target.width, target.height).to_image())
    }
}

/// Quantize to 8-bit RGB, clamping to `0..=1`.
pub fn to_rgb8(img: &Rgb32FImage) -> RgbImage {
    let (w, h) = img.dimensions();
    RgbImage::from_fn(w, h, |x, y| {
        let p = img.get_pixel(x, y).0;
        Rgb([unit_to_u8(p[0]), unit_to_u8(p[1]), unit_to_u8(p[2])])
    })
}

/// Interleaved little-endian 16-bit RGB bytes (`rgb48le`).
pub fn to_rgb48le(img: &Rgb32FImage) -> Vec<u8> {
    let mut out = Vec::with_capacity(img.as_raw().len() * 2);
    for &c in img.as_raw() {
        let v = (c.clamp(0.0, 1.0) * 65535.0).round() as u16;
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

/// Interleaved 8-bit RGB bytes (`rgb24`).
pub fn to_rgb24(img: &Rgb32FImage) -> Vec<u8> {
    img.as_raw().iter().map(|&c| unit_to_u8(c)).collect()
}

#[cfg(test)]
#[path = "../../tests/unit/render/frame.rs"]
mod tests;
