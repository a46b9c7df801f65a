//! Raster drawing for the social and share cards.
//!
//! Text uses the 8×8 bitmap glyphs from `font8x8`, scaled by whole pixels.
//! All drawing coordinates are logical; a [`Canvas`] multiplies them by its
//! scale factor so the same layout can be rendered at 1× or 2×.

pub mod share;
pub mod social;

use std::io::Cursor;

use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use image::{ImageFormat, Rgba, RgbaImage};

use crate::{Error, Result};

pub use share::{
    join_share_card, render_share_card, share_card_png, spawn_share_card, ShareCard,
    ShareCardOptions, ShareImage, DEFAULT_PIXEL_BUDGET, SHARE_HEIGHT, SHARE_WIDTH,
};
pub use social::{
    render_social_card, render_social_card_png, social_card_png, SocialCard, DEFAULT_SOCIAL_AUTHOR,
    DEFAULT_SOCIAL_QUOTE, MAX_SOCIAL_QUOTE_CHARS, SOCIAL_HEIGHT, SOCIAL_WIDTH,
};

/// Side length of one glyph cell before scaling.
pub const GLYPH_SIZE: u32 = 8;

/// Opaque colour from a `0xRRGGBB` literal.
#[must_use]
pub const fn rgb(hex: u32) -> Rgba<u8> {
    Rgba([(hex >> 16) as u8, (hex >> 8) as u8, hex as u8, 255])
}

/// Colour with an alpha channel in `0.0..=1.0`.
#[must_use]
pub fn with_alpha(color: Rgba<u8>, alpha: f32) -> Rgba<u8> {
    let alpha = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgba([color[0], color[1], color[2], alpha])
}

/// A scaled RGBA drawing surface.
#[derive(Debug, Clone)]
pub struct Canvas {
    image: RgbaImage,
    scale: u32,
}

impl Canvas {
    /// Allocate a `width`×`height` logical canvas at `scale`.
    ///
    /// Fails when the physical size would exceed `pixel_budget` pixels.
    pub fn new(width: u32, height: u32, scale: u32, pixel_budget: u64) -> Result<Self> {
        if width == 0 || height == 0 || scale == 0 {
            return Err(Error::Render("Canvas dimensions must be non-zero".to_string()));
        }
        let physical_width = width
            .checked_mul(scale)
            .ok_or_else(|| Error::Render("Canvas width overflow".to_string()))?;
        let physical_height = height
            .checked_mul(scale)
            .ok_or_else(|| Error::Render("Canvas height overflow".to_string()))?;
        let pixels = u64::from(physical_width) * u64::from(physical_height);
        if pixels > pixel_budget {
            return Err(Error::Render(format!(
                "{physical_width}x{physical_height} canvas exceeds the {pixel_budget} pixel budget"
            )));
        }

        Ok(Self {
            image: RgbaImage::new(physical_width, physical_height),
            scale,
        })
    }

    #[must_use]
    pub fn logical_width(&self) -> u32 {
        self.image.width() / self.scale
    }

    #[must_use]
    pub fn logical_height(&self) -> u32 {
        self.image.height() / self.scale
    }

    #[must_use]
    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn fill(&mut self, color: Rgba<u8>) {
        for pixel in self.image.pixels_mut() {
            *pixel = color;
        }
    }

    /// 135° linear gradient from the top-left to the bottom-right corner.
    pub fn fill_diagonal_gradient(&mut self, from: Rgba<u8>, to: Rgba<u8>) {
        let span = f64::from(self.image.width() + self.image.height()).max(1.0);
        for (x, y, pixel) in self.image.enumerate_pixels_mut() {
            let t = f64::from(x + y) / span;
            *pixel = lerp_color(from, to, t);
        }
    }

    /// Soft white highlight fading to nothing at `radius` (logical units).
    pub fn radial_glow(&mut self, center_x: f64, center_y: f64, radius: f64, alpha: f32) {
        let scale = f64::from(self.scale);
        let (cx, cy, radius) = (center_x * scale, center_y * scale, radius * scale);
        if radius <= 0.0 {
            return;
        }
        let white = rgb(0xFF_FF_FF);
        for (x, y, pixel) in self.image.enumerate_pixels_mut() {
            let distance = (f64::from(x) - cx).hypot(f64::from(y) - cy);
            if distance < radius {
                let strength = (1.0 - distance / radius) as f32 * alpha;
                *pixel = blend(*pixel, with_alpha(white, strength));
            }
        }
    }

    /// Alpha-blend a filled rectangle.
    pub fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, color: Rgba<u8>) {
        self.fill_rounded_rect(x, y, width, height, 0, color);
    }

    /// Alpha-blend a filled rectangle with rounded corners.
    pub fn fill_rounded_rect(
        &mut self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        radius: u32,
        color: Rgba<u8>,
    ) {
        let s = self.scale;
        let (x0, y0, w, h) = (x * s, y * s, width * s, height * s);
        let r = (radius * s).min(w / 2).min(h / 2);
        let x_end = (x0 + w).min(self.image.width());
        let y_end = (y0 + h).min(self.image.height());

        for py in y0..y_end {
            for px in x0..x_end {
                if r > 0 && outside_corner(px - x0, py - y0, w, h, r) {
                    continue;
                }
                let pixel = self.image.get_pixel_mut(px, py);
                *pixel = blend(*pixel, color);
            }
        }
    }

    /// Filled circle with a diagonal two-colour gradient.
    pub fn fill_gradient_circle(
        &mut self,
        center_x: u32,
        center_y: u32,
        radius: u32,
        from: Rgba<u8>,
        to: Rgba<u8>,
    ) {
        let s = self.scale;
        let (cx, cy, r) = (
            i64::from(center_x * s),
            i64::from(center_y * s),
            i64::from(radius * s),
        );
        if r == 0 {
            return;
        }
        let width = i64::from(self.image.width());
        let height = i64::from(self.image.height());
        for py in (cy - r).max(0)..(cy + r).min(height) {
            for px in (cx - r).max(0)..(cx + r).min(width) {
                let (dx, dy) = (px - cx, py - cy);
                if dx * dx + dy * dy > r * r {
                    continue;
                }
                let t = (dx + dy + 2 * r) as f64 / (4 * r) as f64;
                // px and py are clamped to the image bounds above.
                let pixel = self.image.get_pixel_mut(px as u32, py as u32);
                *pixel = blend(*pixel, lerp_color(from, to, t));
            }
        }
    }

    /// Draw `text` with its top-left corner at (`x`, `y`).
    ///
    /// `glyph_scale` is the logical size of one font pixel.
    pub fn draw_text(&mut self, x: u32, y: u32, text: &str, glyph_scale: u32, color: Rgba<u8>) {
        let cell = GLYPH_SIZE * glyph_scale * self.scale;
        let dot = glyph_scale * self.scale;
        let mut pen_x = x * self.scale;
        let pen_y = y * self.scale;

        for ch in text.chars() {
            let rows = glyph(ch);
            for (row_index, row) in (0_u32..).zip(rows) {
                for bit in 0..GLYPH_SIZE {
                    if row & (1 << bit) == 0 {
                        continue;
                    }
                    self.fill_physical(pen_x + bit * dot, pen_y + row_index * dot, dot, color);
                }
            }
            pen_x += cell;
        }
    }

    /// Draw `text` horizontally centred on `center_x`.
    pub fn draw_text_centered(
        &mut self,
        center_x: u32,
        y: u32,
        text: &str,
        glyph_scale: u32,
        color: Rgba<u8>,
    ) {
        let width = text_width(text, glyph_scale);
        self.draw_text(center_x.saturating_sub(width / 2), y, text, glyph_scale, color);
    }

    fn fill_physical(&mut self, x: u32, y: u32, size: u32, color: Rgba<u8>) {
        let x_end = (x + size).min(self.image.width());
        let y_end = (y + size).min(self.image.height());
        for py in y..y_end {
            for px in x..x_end {
                let pixel = self.image.get_pixel_mut(px, py);
                *pixel = blend(*pixel, color);
            }
        }
    }
}

/// Logical width of `text` at `glyph_scale`.
#[must_use]
pub fn text_width(text: &str, glyph_scale: u32) -> u32 {
    u32::try_from(text.chars().count())
        .unwrap_or(u32::MAX)
        .saturating_mul(GLYPH_SIZE * glyph_scale)
}

/// Greedy word wrap to at most `max_chars` characters per line.
///
/// Words longer than a line are split.
#[must_use]
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word = word.chars().collect::<Vec<_>>();
        while word.len() > max_chars {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }

        let needed = if current_len == 0 {
            word.len()
        } else {
            current_len + 1 + word.len()
        };
        if needed > max_chars && current_len > 0 {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word.iter());
        current_len += word.len();
    }

    if current_len > 0 {
        lines.push(current);
    }
    lines
}

/// Wrapped text block at the largest glyph scale that fits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub glyph_scale: u32,
    pub line_height: u32,
}

impl TextBlock {
    /// Try each scale from largest to smallest until the block fits the box.
    ///
    /// At the smallest scale the block is clipped to the box and the last
    /// visible line ends with `...`.
    #[must_use]
    pub fn fit(text: &str, max_width: u32, max_height: u32, scales: &[u32]) -> Self {
        let mut fallback = None;
        for &glyph_scale in scales {
            let glyph_scale = glyph_scale.max(1);
            let line_height = line_height(glyph_scale);
            let max_chars = (max_width / (GLYPH_SIZE * glyph_scale)).max(1) as usize;
            let lines = wrap_text(text, max_chars);
            let height = line_height * u32::try_from(lines.len()).unwrap_or(u32::MAX);
            if height <= max_height {
                return Self {
                    lines,
                    glyph_scale,
                    line_height,
                };
            }
            fallback = Some((lines, glyph_scale, line_height, max_chars));
        }

        let Some((mut lines, glyph_scale, line_height, max_chars)) = fallback else {
            return Self {
                lines: Vec::new(),
                glyph_scale: 1,
                line_height: line_height(1),
            };
        };
        let visible = (max_height / line_height).max(1) as usize;
        if lines.len() > visible {
            lines.truncate(visible);
            if let Some(last) = lines.last_mut() {
                let keep = max_chars.saturating_sub(3);
                *last = format!("{}...", last.chars().take(keep).collect::<String>());
            }
        }
        Self {
            lines,
            glyph_scale,
            line_height,
        }
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.line_height * u32::try_from(self.lines.len()).unwrap_or(u32::MAX)
    }

    /// Draw every line centred on `center_x`, starting at `top`.
    pub fn draw_centered(&self, canvas: &mut Canvas, center_x: u32, top: u32, color: Rgba<u8>) {
        let inset = (self.line_height - GLYPH_SIZE * self.glyph_scale) / 2;
        for (index, line) in (0_u32..).zip(&self.lines) {
            let y = top + index * self.line_height + inset;
            canvas.draw_text_centered(center_x, y, line, self.glyph_scale, color);
        }
    }
}

/// Line pitch of roughly 1.5× the glyph height.
const fn line_height(glyph_scale: u32) -> u32 {
    GLYPH_SIZE * glyph_scale * 3 / 2
}

/// Encode an RGBA buffer as PNG.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    image
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|error| Error::Render(format!("Failed to encode PNG: {error}")))?;
    Ok(cursor.into_inner())
}

/// Replace typographic punctuation the bitmap font lacks with ASCII.
#[must_use]
pub fn normalize_for_glyphs(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\u{201C}' | '\u{201D}' | '\u{201E}' => normalized.push('"'),
            '\u{2018}' | '\u{2019}' | '\u{201A}' => normalized.push('\''),
            '\u{2013}' | '\u{2014}' => normalized.push('-'),
            '\u{2026}' => normalized.push_str("..."),
            ch if ch.is_whitespace() => normalized.push(' '),
            ch => normalized.push(ch),
        }
    }
    normalized
}

fn glyph(ch: char) -> [u8; 8] {
    BASIC_FONTS
        .get(ch)
        .or_else(|| LATIN_FONTS.get(ch))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

fn outside_corner(x: u32, y: u32, width: u32, height: u32, radius: u32) -> bool {
    let corner_x = if x < radius {
        radius - x
    } else if x >= width - radius {
        x + radius + 1 - width
    } else {
        return false;
    };
    let corner_y = if y < radius {
        radius - y
    } else if y >= height - radius {
        y + radius + 1 - height
    } else {
        return false;
    };
    corner_x * corner_x + corner_y * corner_y > radius * radius
}

fn lerp_color(from: Rgba<u8>, to: Rgba<u8>, t: f64) -> Rgba<u8> {
    let t = t.clamp(0.0, 1.0);
    let channel = |index: usize| {
        let start = f64::from(from[index]);
        let end = f64::from(to[index]);
        (end - start).mul_add(t, start).round() as u8
    };
    Rgba([channel(0), channel(1), channel(2), channel(3)])
}

/// Source-over compositing of `src` onto `dst`.
fn blend(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let src_alpha = f32::from(src[3]) / 255.0;
    if src_alpha >= 1.0 {
        return src;
    }
    if src_alpha <= 0.0 {
        return dst;
    }
    let dst_alpha = f32::from(dst[3]) / 255.0;
    let out_alpha = dst_alpha.mul_add(1.0 - src_alpha, src_alpha);
    let channel = |index: usize| {
        let src_c = f32::from(src[index]) * src_alpha;
        let dst_c = f32::from(dst[index]) * dst_alpha * (1.0 - src_alpha);
        ((src_c + dst_c) / out_alpha).round() as u8
    };
    Rgba([
        channel(0),
        channel(1),
        channel(2),
        (out_alpha * 255.0).round() as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn wrap_text_breaks_on_words() {
        let lines = wrap_text("the quick brown fox jumps over the lazy dog", 10);
        assert_eq!(
            lines,
            vec!["the quick", "brown fox", "jumps over", "the lazy", "dog"]
        );
        assert!(lines.iter().all(|line| line.chars().count() <= 10));
    }

    #[test]
    fn wrap_text_splits_long_words() {
        let lines = wrap_text("a supercalifragilistic word", 8);
        assert_eq!(lines, vec!["a", "supercal", "ifragili", "stic", "word"]);
    }

    #[test]
    fn wrap_text_of_blank_input_is_empty() {
        assert!(wrap_text("   ", 10).is_empty());
    }

    #[test]
    fn text_block_falls_back_to_smaller_scale() {
        let text = "word ".repeat(40);
        let block = TextBlock::fit(&text, 400, 120, &[4, 2, 1]);
        assert!(block.glyph_scale < 4);
        assert!(block.height() <= 120);
    }

    #[test]
    fn text_block_clips_with_ellipsis_at_smallest_scale() {
        let text = "word ".repeat(200);
        let block = TextBlock::fit(&text, 80, 24, &[1]);
        assert_eq!(block.lines.len(), 2);
        assert!(block.lines[1].ends_with("..."));
    }

    #[test]
    fn canvas_respects_pixel_budget() {
        assert!(Canvas::new(800, 600, 2, 1_000_000).is_err());
        let canvas = Canvas::new(800, 600, 2, 2_000_000).unwrap();
        assert_eq!(canvas.logical_width(), 800);
        let image = canvas.into_image();
        assert_eq!((image.width(), image.height()), (1600, 1200));
    }

    #[test]
    fn draw_text_sets_pixels() {
        let mut canvas = Canvas::new(16, 8, 1, u64::MAX).unwrap();
        canvas.fill(rgb(0x00_00_00));
        canvas.draw_text(0, 0, "H", 1, rgb(0xFF_FF_FF));
        let image = canvas.into_image();
        let lit = image.pixels().filter(|pixel| pixel[0] == 255).count();
        assert!(lit > 0);
        // Nothing is drawn in the second, empty cell.
        assert!((8..16).all(|x| (0..8).all(|y| image.get_pixel(x, y)[0] == 0)));
    }

    #[test]
    fn blend_respects_alpha() {
        let dst = rgb(0x00_00_00);
        let half_white = with_alpha(rgb(0xFF_FF_FF), 0.5);
        let out = blend(dst, half_white);
        assert!((126..=129).contains(&out[0]));
        assert_eq!(out[3], 255);
    }

    #[test]
    fn typographic_punctuation_is_normalized() {
        assert_eq!(
            normalize_for_glyphs("\u{201C}Hi\u{201D} \u{2014} it\u{2019}s\u{2026}"),
            "\"Hi\" - it's..."
        );
    }

    #[test]
    fn encode_png_produces_png_signature() {
        let canvas = Canvas::new(4, 4, 1, u64::MAX).unwrap();
        let bytes = encode_png(&canvas.into_image()).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }
}
