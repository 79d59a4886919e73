//! CPU drawing surface the engine composites into.
//!
//! Layers are rasterized with `vello_cpu`: every asset is a bilinear image
//! paint filling its own rectangle under an affine transform, so fractional
//! pan offsets and zoom factors land between pixels instead of snapping.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use image::{Rgba, RgbaImage};
use vello_cpu::kurbo::{Affine, Rect};
use vello_cpu::peniko::color::PremulRgba8;
use vello_cpu::peniko::{Color, ImageQuality, ImageSampler};
use vello_cpu::{Image, ImageSource, Pixmap, RenderContext};

/// Where and how large an asset lands on the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Asset center in surface pixels.
    pub center_x: f64,
    pub center_y: f64,
    /// Uniform scale from asset pixels to surface pixels.
    pub scale: f64,
}

impl Placement {
    /// Maps asset pixel space onto the surface: scale about the origin, then
    /// move the top-left corner so the asset center lands on `center`.
    fn transform(&self, width: u32, height: u32) -> Affine {
        let left = self.center_x - f64::from(width) * self.scale / 2.0;
        let top = self.center_y - f64::from(height) * self.scale / 2.0;
        Affine::translate((left, top)) * Affine::scale(self.scale)
    }
}

/// A decoded asset in the form the rasterizer samples from.
#[derive(Clone)]
pub struct Texture {
    width: u32,
    height: u32,
    paint: Image,
}

impl Texture {
    /// Premultiplies `rgba` into a pixmap behind a bilinear sampler.
    pub fn from_rgba(rgba: &RgbaImage) -> Result<Self> {
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            bail!("asset has no pixels");
        }
        let (Ok(w), Ok(h)) = (u16::try_from(width), u16::try_from(height)) else {
            bail!("asset {width}x{height} exceeds the rasterizer limit of {}", u16::MAX);
        };

        let mut translucent = false;
        let pixels: Vec<PremulRgba8> = rgba
            .pixels()
            .map(|p| {
                let [r, g, b, a] = p.0;
                translucent |= a != 255;
                PremulRgba8 {
                    r: premul(r, a),
                    g: premul(g, a),
                    b: premul(b, a),
                    a,
                }
            })
            .collect();
        let pixmap = Pixmap::from_parts_with_opacity(pixels, w, h, translucent);

        Ok(Self {
            width,
            height,
            paint: Image {
                image: ImageSource::Pixmap(Arc::new(pixmap)),
                sampler: ImageSampler {
                    quality: ImageQuality::Medium,
                    ..ImageSampler::default()
                },
            },
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// RGBA8 frame buffer sized to the viewport. Pixels are kept opaque.
pub struct Surface {
    target: Pixmap,
    pixels: RgbaImage,
}

impl Surface {
    /// Dimensions are clamped to `1..=u16::MAX`.
    pub fn new(width: u32, height: u32) -> Self {
        let (w, h) = clamp_dims(width, height);
        Self {
            target: Pixmap::new(w, h),
            pixels: RgbaImage::from_pixel(u32::from(w), u32::from(h), Rgba([0, 0, 0, 255])),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        let (w, h) = clamp_dims(width, height);
        if self.pixels.dimensions() != (u32::from(w), u32::from(h)) {
            *self = Self::new(width, height);
        }
    }

    pub fn clear(&mut self, rgb: [u8; 3]) {
        let fill = Rgba([rgb[0], rgb[1], rgb[2], 255]);
        for pixel in self.pixels.pixels_mut() {
            *pixel = fill;
        }
    }

    /// Starts a frame painted over an opaque `background`.
    pub fn begin(&mut self, background: [u8; 3]) -> Canvas<'_> {
        let (w, h) = (self.target.width(), self.target.height());
        let mut ctx = RenderContext::new(w, h);
        let bounds = Rect::new(0.0, 0.0, f64::from(w), f64::from(h));
        ctx.set_paint(Color::from_rgba8(background[0], background[1], background[2], 255));
        ctx.fill_rect(&bounds);
        Canvas {
            surface: self,
            ctx,
            bounds,
        }
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.pixels
            .save_with_format(path, image::ImageFormat::Png)
            .with_context(|| format!("failed to write snapshot {}", path.display()))
    }

    fn read_back(&mut self) {
        let src = self.target.data_as_u8_slice();
        for (dst, px) in self.pixels.pixels_mut().zip(src.chunks_exact(4)) {
            dst.0 = unpremul([px[0], px[1], px[2], px[3]]);
        }
    }
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish_non_exhaustive()
    }
}

/// One frame being recorded; nothing reaches the surface until [`Canvas::finish`].
pub struct Canvas<'a> {
    surface: &'a mut Surface,
    ctx: RenderContext,
    bounds: Rect,
}

impl Canvas<'_> {
    /// Draws `texture` at `placement`, blended at `opacity`.
    pub fn draw(&mut self, texture: &Texture, placement: Placement, opacity: f32) {
        let opacity = opacity.clamp(0.0, 1.0);
        if opacity <= 0.0 || !(placement.scale > 0.0) {
            return;
        }
        self.ctx
            .set_transform(placement.transform(texture.width, texture.height));
        self.ctx.set_paint_transform(Affine::IDENTITY);
        self.ctx.set_paint(texture.paint.clone());
        let layered = opacity < 1.0;
        if layered {
            self.ctx.push_opacity_layer(opacity);
        }
        self.ctx.fill_rect(&Rect::new(
            0.0,
            0.0,
            f64::from(texture.width),
            f64::from(texture.height),
        ));
        if layered {
            self.ctx.pop_layer();
        }
        self.ctx.set_transform(Affine::IDENTITY);
    }

    /// Blends a flat color over the whole frame.
    pub fn tint(&mut self, rgb: [u8; 3], alpha: f32) {
        let alpha = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
        if alpha == 0 {
            return;
        }
        self.ctx.set_transform(Affine::IDENTITY);
        self.ctx.set_paint(Color::from_rgba8(rgb[0], rgb[1], rgb[2], alpha));
        self.ctx.fill_rect(&self.bounds);
    }

    pub fn finish(self) {
        let Canvas { surface, mut ctx, .. } = self;
        ctx.flush();
        ctx.render_to_pixmap(&mut surface.target);
        surface.read_back();
    }
}

fn clamp_dims(width: u32, height: u32) -> (u16, u16) {
    let clamp = |v: u32| u16::try_from(v.max(1)).unwrap_or(u16::MAX);
    (clamp(width), clamp(height))
}

fn premul(c: u8, a: u8) -> u8 {
    ((u16::from(c) * u16::from(a) + 127) / 255) as u8
}

fn unpremul([r, g, b, a]: [u8; 4]) -> [u8; 4] {
    if a == 0 {
        return [0, 0, 0, 0];
    }
    let a16 = u16::from(a);
    let un = |c: u8| ((u16::from(c) * 255 + a16 / 2) / a16).min(255) as u8;
    [un(r), un(g), un(b), a]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, rgb: [u8; 3]) -> Texture {
        Texture::from_rgba(&RgbaImage::from_pixel(w, h, Rgba([rgb[0], rgb[1], rgb[2], 255])))
            .unwrap()
    }

    fn close(actual: [u8; 4], expected: [u8; 4]) -> bool {
        actual
            .iter()
            .zip(expected)
            .all(|(a, e)| a.abs_diff(e) <= 2)
    }

    fn paint(surface: &mut Surface, texture: &Texture, placement: Placement) {
        let mut canvas = surface.begin([0, 0, 0]);
        canvas.draw(texture, placement, 1.0);
        canvas.finish();
    }

    #[test]
    fn premultiply_round_trips_opaque_and_clears_transparent() {
        assert_eq!(premul(200, 255), 200);
        assert_eq!(premul(200, 0), 0);
        assert_eq!(premul(255, 128), 128);
        assert_eq!(unpremul([100, 50, 0, 255]), [100, 50, 0, 255]);
        assert_eq!(unpremul([9, 9, 9, 0]), [0, 0, 0, 0]);
        assert_eq!(unpremul([64, 0, 0, 128]), [128, 0, 0, 128]);
    }

    #[test]
    fn texture_rejects_empty_and_oversized_assets() {
        assert!(Texture::from_rgba(&RgbaImage::new(0, 4)).is_err());
        assert!(Texture::from_rgba(&RgbaImage::new(70_000, 1)).is_err());
        assert_eq!(solid(3, 2, [1, 2, 3]).dimensions(), (3, 2));
    }

    #[test]
    fn draw_scales_around_center() {
        let mut surface = Surface::new(8, 8);
        let texture = solid(2, 2, [255, 255, 255]);
        let placement = Placement {
            center_x: 4.0,
            center_y: 4.0,
            scale: 2.0,
        };
        paint(&mut surface, &texture, placement);
        let img = surface.image();
        assert!(close(img.get_pixel(2, 2).0, [255, 255, 255, 255]));
        assert!(close(img.get_pixel(5, 5).0, [255, 255, 255, 255]));
        assert!(close(img.get_pixel(1, 1).0, [0, 0, 0, 255]));
        assert!(close(img.get_pixel(6, 6).0, [0, 0, 0, 255]));
    }

    #[test]
    fn draw_clips_offscreen_assets() {
        let mut surface = Surface::new(4, 4);
        let texture = solid(4, 4, [9, 9, 9]);
        let placement = Placement {
            center_x: -100.0,
            center_y: 2.0,
            scale: 1.0,
        };
        paint(&mut surface, &texture, placement);
        assert!(surface.image().pixels().all(|p| p.0 == [0, 0, 0, 255]));
    }

    #[test]
    fn fractional_offsets_are_filtered_between_pixels() {
        // 2px stripes: a third of a pixel of travel must move every edge
        let stripes = RgbaImage::from_fn(40, 8, |x, _| {
            let v = if (x / 2) % 2 == 0 { 255 } else { 0 };
            Rgba([v, v, v, 255])
        });
        let texture = Texture::from_rgba(&stripes).unwrap();
        let mut frames = Vec::new();
        for step in 0..3 {
            let mut surface = Surface::new(16, 8);
            let placement = Placement {
                center_x: 8.0 + f64::from(step) / 3.0,
                center_y: 4.0,
                scale: 1.0,
            };
            paint(&mut surface, &texture, placement);
            frames.push(surface.image().clone());
        }
        assert_ne!(frames[0], frames[1]);
        assert_ne!(frames[1], frames[2]);

        // an edge pixel takes an intermediate value rather than snapping
        let edge = frames[1]
            .pixels()
            .any(|p| p.0[0] > 40 && p.0[0] < 215);
        assert!(edge);
    }

    #[test]
    fn half_opacity_mixes() {
        let mut surface = Surface::new(2, 2);
        let mut canvas = surface.begin([0, 0, 0]);
        canvas.tint([200, 100, 0], 0.5);
        canvas.finish();
        assert!(close(surface.image().get_pixel(0, 0).0, [100, 50, 0, 255]));
    }

    #[test]
    fn translucent_layer_blends_over_background() {
        let mut surface = Surface::new(4, 4);
        let texture = solid(4, 4, [0, 0, 200]);
        let mut canvas = surface.begin([200, 0, 0]);
        canvas.draw(
            &texture,
            Placement {
                center_x: 2.0,
                center_y: 2.0,
                scale: 1.0,
            },
            0.5,
        );
        canvas.finish();
        assert!(close(surface.image().get_pixel(1, 1).0, [100, 0, 100, 255]));
    }

    #[test]
    fn resize_keeps_minimum_size() {
        let mut surface = Surface::new(0, 0);
        assert_eq!((surface.width(), surface.height()), (1, 1));
        surface.resize(3, 2);
        assert_eq!(surface.image().dimensions(), (3, 2));
        surface.clear([5, 6, 7]);
        assert!(surface.image().pixels().all(|p| p.0 == [5, 6, 7, 255]));
    }
}
