//! Pixel compositing shared by both animation variants.

use std::borrow::Cow;
use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::RgbaImage;

/// Rendered frame handed to consumers. Cloning shares the pixels.
pub type FrameBuffer = Arc<RgbaImage>;

/// Size of a preview at `ratio`, never smaller than one pixel per side.
#[inline]
pub fn scaled_size(width: u32, height: u32, ratio: f64) -> (u32, u32) {
    (scale_dim(width, ratio), scale_dim(height, ratio))
}

#[inline]
fn scale_dim(v: u32, ratio: f64) -> u32 {
    ((f64::from(v) * ratio).round() as u32).max(1)
}

/// Alpha-composite `source`, scaled by `ratio` and placed at `offset * ratio`,
/// over `backdrop` (or over a transparent canvas) of `width` x `height`.
///
/// Scaling uses nearest-neighbour sampling so previews stay crisp and cheap.
pub fn normal_blend(
    width: u32,
    height: u32,
    backdrop: Option<&RgbaImage>,
    source: &RgbaImage,
    ratio: f64,
    offset: (i32, i32),
) -> RgbaImage {
    let mut out = match backdrop {
        Some(b) if b.dimensions() == (width, height) => b.clone(),
        Some(b) => {
            let mut canvas = RgbaImage::new(width, height);
            imageops::overlay(&mut canvas, b, 0, 0);
            canvas
        }
        None => RgbaImage::new(width, height),
    };

    let scaled: Cow<'_, RgbaImage> = if (ratio - 1.0).abs() < f64::EPSILON {
        Cow::Borrowed(source)
    } else {
        let (w, h) = scaled_size(source.width(), source.height(), ratio);
        Cow::Owned(imageops::resize(source, w, h, FilterType::Nearest))
    };

    let x = (f64::from(offset.0) * ratio).round() as i64;
    let y = (f64::from(offset.1) * ratio).round() as i64;
    imageops::overlay(&mut out, scaled.as_ref(), x, y);
    out
}
