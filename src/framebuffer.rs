//! Offscreen RGB framebuffer
//!
//! A plain row-major pixel buffer that implements `embedded_graphics::DrawTarget`,
//! so every primitive, polyline and font in embedded-graphics can draw into it.
//! It backs both the cached static layer and the per-frame composition buffer.
//!
//! embedded-graphics has no alpha channel. [`AlphaLayer`] wraps a framebuffer and
//! blends each incoming pixel source-over with a fixed opacity, which is how the
//! glow passes, gradient fill and fading dashes are drawn.

use core::convert::Infallible;
use embedded_graphics::{
    pixelcolor::{Rgb888, RgbColor},
    prelude::*,
    primitives::Rectangle,
};

use crate::theme::mix;

/// Row-major RGB pixel buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    pixels: Vec<Rgb888>,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32, background: Rgb888) -> Self {
        Self {
            width,
            height,
            pixels: vec![background; (width as usize) * (height as usize)],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Rgb888] {
        &self.pixels
    }

    /// Resize, discarding contents, if the dimensions differ.
    pub fn resize(&mut self, width: u32, height: u32, background: Rgb888) {
        if self.width != width || self.height != height {
            *self = Self::new(width, height, background);
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb888> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgb888) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = color;
        }
    }

    /// Source-over blend of `color` at opacity `alpha` onto the existing pixel.
    pub fn blend_pixel(&mut self, x: u32, y: u32, color: Rgb888, alpha: f32) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = mix(self.pixels[i], color, alpha);
        }
    }

    /// Translucent draw target over this buffer.
    pub fn layer(&mut self, alpha: f32) -> AlphaLayer<'_> {
        AlphaLayer {
            target: self,
            alpha: alpha.clamp(0.0, 1.0),
        }
    }

    /// Copy a target-sized region starting at column `src_x` onto `target`.
    ///
    /// Columns outside this buffer are filled with `background`, so a shifted
    /// source never leaves stale pixels on the target.
    pub fn blit_into<D>(&self, target: &mut D, src_x: i32, background: Rgb888) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb888>,
    {
        let area = target.bounding_box();
        let (w, h) = (area.size.width as i64, area.size.height as i64);
        let colors = (0..h).flat_map(move |y| {
            (0..w).map(move |x| {
                let sx = src_x as i64 + x;
                if sx < 0 || y >= self.height as i64 || sx >= self.width as i64 {
                    background
                } else {
                    self.pixels[(y as usize) * (self.width as usize) + sx as usize]
                }
            })
        });
        target.fill_contiguous(&area, colors)
    }

    /// Mean luminance (0-255) of a rectangular cell, used for previews.
    pub fn cell_luma(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> f32 {
        let (mut sum, mut count) = (0.0f32, 0u32);
        for y in y0..y1.min(self.height) {
            for x in x0..x1.min(self.width) {
                let c = self.pixels[(y as usize) * (self.width as usize) + x as usize];
                sum += 0.299 * c.r() as f32 + 0.587 * c.g() as f32 + 0.114 * c.b() as f32;
                count += 1;
            }
        }
        if count == 0 {
            0.0
        } else {
            sum / count as f32
        }
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y as usize) * (self.width as usize) + x as usize)
    }
}

impl OriginDimensions for Framebuffer {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for Framebuffer {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x >= 0 && point.y >= 0 {
                self.set_pixel(point.x as u32, point.y as u32, color);
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let area = area.intersection(&self.bounding_box());
        if let Some(bottom_right) = area.bottom_right() {
            for y in area.top_left.y..=bottom_right.y {
                let row = (y as usize) * (self.width as usize);
                let start = row + area.top_left.x as usize;
                let end = row + bottom_right.x as usize + 1;
                self.pixels[start..end].fill(color);
            }
        }
        Ok(())
    }
}

/// Draw target that blends into a [`Framebuffer`] at a fixed opacity.
pub struct AlphaLayer<'a> {
    target: &'a mut Framebuffer,
    alpha: f32,
}

impl OriginDimensions for AlphaLayer<'_> {
    fn size(&self) -> Size {
        self.target.size()
    }
}

impl DrawTarget for AlphaLayer<'_> {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x >= 0 && point.y >= 0 {
                self.target
                    .blend_pixel(point.x as u32, point.y as u32, color, self.alpha);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::{Line, PrimitiveStyle};

    const BLACK: Rgb888 = Rgb888::new(0, 0, 0);
    const WHITE: Rgb888 = Rgb888::new(255, 255, 255);

    #[test]
    fn out_of_bounds_writes_are_ignored() {
        let mut fb = Framebuffer::new(4, 3, BLACK);
        fb.set_pixel(4, 0, WHITE);
        fb.set_pixel(0, 3, WHITE);
        assert!(fb.pixels().iter().all(|&p| p == BLACK));
        assert_eq!(fb.pixel(9, 9), None);
    }

    #[test]
    fn primitives_draw_into_buffer() {
        let mut fb = Framebuffer::new(10, 10, BLACK);
        Line::new(Point::new(0, 5), Point::new(9, 5))
            .into_styled(PrimitiveStyle::with_stroke(WHITE, 1))
            .draw(&mut fb)
            .ok();
        for x in 0..10 {
            assert_eq!(fb.pixel(x, 5), Some(WHITE));
        }
        assert_eq!(fb.pixel(0, 4), Some(BLACK));
    }

    #[test]
    fn fill_solid_clips_to_buffer() {
        let mut fb = Framebuffer::new(5, 5, BLACK);
        fb.fill_solid(&Rectangle::new(Point::new(3, 3), Size::new(10, 10)), WHITE)
            .ok();
        assert_eq!(fb.pixel(4, 4), Some(WHITE));
        assert_eq!(fb.pixel(3, 3), Some(WHITE));
        assert_eq!(fb.pixel(2, 2), Some(BLACK));
    }

    #[test]
    fn alpha_layer_blends() {
        let mut fb = Framebuffer::new(2, 1, BLACK);
        Pixel(Point::new(0, 0), WHITE).draw(&mut fb.layer(0.5)).ok();
        assert_eq!(fb.pixel(0, 0), Some(Rgb888::new(128, 128, 128)));
        assert_eq!(fb.pixel(1, 0), Some(BLACK));
    }

    #[test]
    fn blit_shifts_source_and_fills_uncovered_columns() {
        let mut src = Framebuffer::new(6, 1, BLACK);
        for x in 0..6 {
            src.set_pixel(x, 0, Rgb888::new(x as u8 * 10, 0, 0));
        }
        let mut dst = Framebuffer::new(4, 1, WHITE);

        src.blit_into(&mut dst, 1, WHITE).ok();
        let reds: Vec<u8> = dst.pixels().iter().map(|p| p.r()).collect();
        assert_eq!(reds, vec![10, 20, 30, 40]);

        src.blit_into(&mut dst, 4, WHITE).ok();
        assert_eq!(dst.pixel(0, 0), Some(Rgb888::new(40, 0, 0)));
        assert_eq!(dst.pixel(2, 0), Some(WHITE));

        src.blit_into(&mut dst, -2, WHITE).ok();
        assert_eq!(dst.pixel(1, 0), Some(WHITE));
        assert_eq!(dst.pixel(2, 0), Some(BLACK));
    }
}
