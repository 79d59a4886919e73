use anyhow::{Context, Result};
use fast_image_resize as fir;
use image::RgbaImage;

/// Downscales `source` so neither side exceeds `max_dim`, keeping the aspect ratio.
///
/// Images already within bounds are returned untouched.
pub fn limit_max_dim(source: RgbaImage, max_dim: u32) -> Result<RgbaImage> {
    let max_dim = max_dim.max(1);
    let (w, h) = source.dimensions();
    if w <= max_dim && h <= max_dim {
        return Ok(source);
    }
    let scale = f64::from(max_dim) / f64::from(w.max(h));
    let target_w = ((f64::from(w) * scale).round() as u32).clamp(1, max_dim);
    let target_h = ((f64::from(h) * scale).round() as u32).clamp(1, max_dim);
    resize_rgba(&source, target_w, target_h)
}

pub fn resize_rgba(source: &RgbaImage, target_w: u32, target_h: u32) -> Result<RgbaImage> {
    if target_w == 0 || target_h == 0 {
        anyhow::bail!("resize dimensions must be positive");
    }
    if source.width() == target_w && source.height() == target_h {
        return Ok(source.clone());
    }

    let src_view = fir::images::ImageRef::new(
        source.width(),
        source.height(),
        source.as_raw(),
        fir::PixelType::U8x4,
    )
    .context("failed to create source view for asset resize")?;
    let mut dst_image = fir::images::Image::new(target_w, target_h, fir::PixelType::U8x4);
    let options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::CatmullRom));
    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_view, &mut dst_image, Some(&options))
        .context("asset resize failed")?;
    RgbaImage::from_raw(target_w, target_h, dst_image.into_vec())
        .ok_or_else(|| anyhow::anyhow!("failed to construct resized RGBA image"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_images_pass_through() {
        let img = RgbaImage::new(64, 32);
        let out = limit_max_dim(img, 128).unwrap();
        assert_eq!(out.dimensions(), (64, 32));
    }

    #[test]
    fn large_images_keep_aspect() {
        let img = RgbaImage::from_pixel(400, 100, image::Rgba([9, 9, 9, 255]));
        let out = limit_max_dim(img, 100).unwrap();
        assert_eq!(out.dimensions(), (100, 25));
        assert_eq!(out.get_pixel(50, 12).0, [9, 9, 9, 255]);
    }
}
