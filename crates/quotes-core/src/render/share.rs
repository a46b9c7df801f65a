//! 800×600 share card for a single quote.

use image::{Rgba, RgbaImage};
use tokio::task::JoinHandle;

use super::{encode_png, normalize_for_glyphs, rgb, text_width, Canvas, TextBlock, GLYPH_SIZE};
use crate::models::{CategoryStyle, Quote};
use crate::share::download_file_name;
use crate::{Error, Result};

pub const SHARE_WIDTH: u32 = 800;
pub const SHARE_HEIGHT: u32 = 600;

/// Pixel ceiling for one render; a 2× card needs 1.92M pixels.
pub const DEFAULT_PIXEL_BUDGET: u64 = 4_000_000;

const PADDING: u32 = 80;
const CONTENT_MAX_WIDTH: u32 = 640;
const CONTENT_MAX_HEIGHT: u32 = 220;
const CONTENT_SCALES: [u32; 3] = [4, 3, 2];
const ICON_SCALE: u32 = 8;
const AUTHOR_SCALE: u32 = 3;
const BADGE_SCALE: u32 = 2;
const BRAND_SCALE: u32 = 2;

/// The quote fields drawn on the card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareCard {
    pub content: String,
    pub author: String,
    pub category: Option<String>,
}

impl From<&Quote> for ShareCard {
    fn from(quote: &Quote) -> Self {
        Self {
            content: quote.content.clone(),
            author: quote.author.clone(),
            category: quote.category.clone(),
        }
    }
}

/// Render settings for one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShareCardOptions {
    /// Device pixel ratio.
    pub scale: u32,
    /// Colour behind the card, if any.
    pub backdrop: Option<Rgba<u8>>,
    pub pixel_budget: u64,
}

impl ShareCardOptions {
    /// High-resolution attempt on a black backdrop.
    #[must_use]
    pub const fn primary(pixel_budget: u64) -> Self {
        Self {
            scale: 2,
            backdrop: Some(rgb(0x00_00_00)),
            pixel_budget,
        }
    }
}

impl Default for ShareCardOptions {
    /// Reduced settings used for the retry.
    fn default() -> Self {
        Self {
            scale: 1,
            backdrop: None,
            pixel_budget: DEFAULT_PIXEL_BUDGET,
        }
    }
}

/// A rendered share card ready to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub file_name: String,
}

/// Rasterize `card` with the given options.
pub fn render_share_card(card: &ShareCard, options: ShareCardOptions) -> Result<RgbaImage> {
    let mut canvas = Canvas::new(SHARE_WIDTH, SHARE_HEIGHT, options.scale, options.pixel_budget)?;
    if let Some(backdrop) = options.backdrop {
        canvas.fill(backdrop);
    }
    canvas.fill_rect(0, 0, SHARE_WIDTH, SHARE_HEIGHT, rgb(0xFF_FF_FF));

    let content = normalize_for_glyphs(card.content.trim());
    let block = TextBlock::fit(&content, CONTENT_MAX_WIDTH, CONTENT_MAX_HEIGHT, &CONTENT_SCALES);
    if block.lines.is_empty() {
        return Err(Error::Render("Quote content is empty".to_string()));
    }

    let icon_height = GLYPH_SIZE * ICON_SCALE;
    let author_height = GLYPH_SIZE * AUTHOR_SCALE;
    let badge_height = GLYPH_SIZE * BADGE_SCALE + 16;
    let category = card
        .category
        .as_deref()
        .map(str::trim)
        .filter(|category| !category.is_empty());

    let mut total = icon_height + 32 + block.height() + 32 + author_height;
    if category.is_some() {
        total += 40 + badge_height;
    }
    let center_x = SHARE_WIDTH / 2;
    let mut y = PADDING.max(SHARE_HEIGHT.saturating_sub(total) / 2);

    canvas.draw_text_centered(center_x, y, "\"", ICON_SCALE, rgb(0xD1_D5_DB));
    y += icon_height + 32;

    block.draw_centered(&mut canvas, center_x, y, rgb(0x1F_29_37));
    y += block.height() + 32;

    let author = format!("- {}", normalize_for_glyphs(card.author.trim()));
    canvas.draw_text_centered(center_x, y, &author, AUTHOR_SCALE, rgb(0x4B_55_63));
    y += author_height + 40;

    if let Some(category) = category {
        draw_badge(&mut canvas, center_x, y, category);
    }

    let brand = "Quote Explorer";
    let brand_x = SHARE_WIDTH - 40 - text_width(brand, BRAND_SCALE);
    let brand_y = SHARE_HEIGHT - 40 - GLYPH_SIZE * BRAND_SCALE;
    canvas.draw_text(brand_x, brand_y, brand, BRAND_SCALE, rgb(0x6B_72_80));

    Ok(canvas.into_image())
}

fn draw_badge(canvas: &mut Canvas, center_x: u32, top: u32, category: &str) {
    let label = normalize_for_glyphs(category);
    let (background, text) = CategoryStyle::for_category(Some(category)).badge_colors();
    let label_width = text_width(&label, BADGE_SCALE).min(SHARE_WIDTH - 2 * PADDING);
    let badge_width = label_width + 32;
    let badge_height = GLYPH_SIZE * BADGE_SCALE + 16;
    canvas.fill_rounded_rect(
        center_x.saturating_sub(badge_width / 2),
        top,
        badge_width,
        badge_height,
        badge_height / 2,
        Rgba([background[0], background[1], background[2], 255]),
    );
    canvas.draw_text_centered(
        center_x,
        top + 8,
        &label,
        BADGE_SCALE,
        Rgba([text[0], text[1], text[2], 255]),
    );
}

/// Render the card, retrying once at 1× with default options on failure.
pub fn share_card_png(card: &ShareCard, pixel_budget: u64) -> Result<ShareImage> {
    let image = match render_share_card(card, ShareCardOptions::primary(pixel_budget)) {
        Ok(image) => image,
        Err(error) => {
            tracing::warn!("Share card render failed, retrying at 1x: {}", error);
            render_share_card(card, ShareCardOptions::default())?
        }
    };

    Ok(ShareImage {
        png: encode_png(&image)?,
        width: image.width(),
        height: image.height(),
        file_name: download_file_name(&card.author),
    })
}

/// Start rendering on the blocking pool and return immediately.
pub fn spawn_share_card(card: ShareCard, pixel_budget: u64) -> JoinHandle<Result<ShareImage>> {
    tokio::task::spawn_blocking(move || share_card_png(&card, pixel_budget))
}

/// Await a spawned render, mapping a worker panic to [`Error::Render`].
pub async fn join_share_card(handle: JoinHandle<Result<ShareImage>>) -> Result<ShareImage> {
    handle
        .await
        .map_err(|error| Error::Render(format!("Share card worker failed: {error}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn card(category: Option<&str>) -> ShareCard {
        ShareCard {
            content: "In the middle of difficulty lies opportunity.".to_string(),
            author: "Albert Einstein".to_string(),
            category: category.map(str::to_string),
        }
    }

    #[test]
    fn primary_render_is_double_resolution() {
        let image = share_card_png(&card(Some("Wisdom")), DEFAULT_PIXEL_BUDGET).unwrap();
        assert_eq!((image.width, image.height), (1600, 1200));
        assert_eq!(image.file_name, "quote-albert-einstein.png");
    }

    #[test]
    fn falls_back_to_single_scale_when_budget_exceeded() {
        let image = share_card_png(&card(None), 1_000_000).unwrap();
        assert_eq!((image.width, image.height), (800, 600));
        assert_eq!(&image.png[..4], b"\x89PNG");
    }

    #[test]
    fn fails_when_both_attempts_fail() {
        let empty = ShareCard {
            content: "   ".to_string(),
            author: "Nobody".to_string(),
            category: None,
        };
        assert!(share_card_png(&empty, DEFAULT_PIXEL_BUDGET).is_err());
    }

    #[test]
    fn badge_uses_category_palette() {
        let image = render_share_card(&card(Some("life")), ShareCardOptions::default()).unwrap();
        let (background, _) = CategoryStyle::Life.badge_colors();
        let found = image
            .pixels()
            .any(|pixel| pixel[0] == background[0] && pixel[1] == background[1] && pixel[2] == background[2]);
        assert!(found);
    }

    #[tokio::test]
    async fn spawned_render_completes_off_thread() {
        let handle = spawn_share_card(card(Some("life")), DEFAULT_PIXEL_BUDGET);
        let image = join_share_card(handle).await.unwrap();
        assert_eq!(image.width, 1600);
    }
}
