//! Terminal preview of a rendered frame.
//!
//! Each character cell averages a block of pixels and picks a glyph by how far
//! its luminance is from the background, so the preview reads the same on the
//! dark and the light theme.

use embedded_graphics::pixelcolor::{Rgb888, RgbColor};

use crate::framebuffer::Framebuffer;

/// Glyphs from "same as background" to "strongest contrast".
const RAMP: &[u8] = b" .:-=+*#%@";

fn luma(c: Rgb888) -> f32 {
    0.299 * c.r() as f32 + 0.587 * c.g() as f32 + 0.114 * c.b() as f32
}

/// Render `fb` as `rows` lines of `columns` characters.
pub fn to_ascii(fb: &Framebuffer, columns: u32, rows: u32, background: Rgb888) -> String {
    if columns == 0 || rows == 0 || fb.width() == 0 || fb.height() == 0 {
        return String::new();
    }
    let base = luma(background);
    let mut out = String::with_capacity(((columns + 1) * rows) as usize);

    for row in 0..rows {
        let y0 = row * fb.height() / rows;
        let y1 = ((row + 1) * fb.height() / rows).max(y0 + 1);
        for col in 0..columns {
            let x0 = col * fb.width() / columns;
            let x1 = ((col + 1) * fb.width() / columns).max(x0 + 1);
            let contrast = ((fb.cell_luma(x0, y0, x1, y1) - base).abs() / 255.0).clamp(0.0, 1.0);
            // Boost faint detail so thin strokes survive the averaging
            let index = (contrast.sqrt() * (RAMP.len() - 1) as f32).round() as usize;
            out.push(RAMP[index.min(RAMP.len() - 1)] as char);
        }
        out.push('\n');
    }
    out
}

/// Print the preview to stdout.
pub fn draw_ascii(fb: &Framebuffer, columns: u32, rows: u32, background: Rgb888) {
    print!("{}", to_ascii(fb, columns, rows, background));
}
